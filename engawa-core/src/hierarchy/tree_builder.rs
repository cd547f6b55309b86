//! Main loop of the cluster-tree stage.
//!
//! Edges are consumed from the heaviest downward. All edges tied at the
//! current weight are removed together, then every cluster that lost an edge
//! is re-explored from its affected points:
//!
//! - one surviving component of admissible size means the cluster merely
//!   shrank and keeps its label;
//! - two or more admissible components mean a true split, and each component
//!   becomes a new cluster (the first one found is reserved and only fully
//!   explored once a second confirms the split);
//! - components below `min_points`, or isolated points with no traversed
//!   edge, fall off as noise against the cluster they last belonged to.
//!
//! A hierarchy level is recorded for every batch unless a compact hierarchy
//! was requested and nothing significant happened at the previous level.

use std::collections::BTreeSet;

use tracing::debug;

use crate::{
    cluster::Cluster,
    error::{EngawaError, Result},
    graph::Graph,
    hierarchy::{Hierarchy, HierarchyEntry},
};

/// Output of the cluster-tree stage.
#[derive(Clone, Debug)]
pub(crate) struct ClusterTree {
    pub(crate) clusters: Vec<Option<Cluster>>,
    pub(crate) hierarchy: Hierarchy,
    pub(crate) point_noise_levels: Vec<f64>,
    pub(crate) point_last_clusters: Vec<usize>,
}

pub(crate) struct ClusterTreeBuilder<'a> {
    graph: &'a mut Graph,
    min_points: usize,
    compact_hierarchy: bool,
    num_points: usize,
    previous_labels: Vec<usize>,
    current_labels: Vec<usize>,
    clusters: Vec<Option<Cluster>>,
    hierarchy: Hierarchy,
    point_noise_levels: Vec<f64>,
    point_last_clusters: Vec<usize>,
    next_cluster_label: usize,
    line_count: i64,
}

impl<'a> ClusterTreeBuilder<'a> {
    pub(crate) fn new(graph: &'a mut Graph, min_points: usize, compact_hierarchy: bool) -> Self {
        let num_points = graph.num_vertices();
        // Every point starts in the root cluster, labelled 1; index 0 stays
        // reserved for noise.
        let clusters = vec![
            None,
            Some(Cluster::new(1, None, f64::NAN, num_points as i64)),
        ];
        Self {
            graph,
            min_points,
            compact_hierarchy,
            num_points,
            previous_labels: vec![1; num_points],
            current_labels: vec![1; num_points],
            clusters,
            hierarchy: Hierarchy::new(),
            point_noise_levels: vec![0.0; num_points],
            point_last_clusters: vec![0; num_points],
            next_cluster_label: 2,
            line_count: 0,
        }
    }

    pub(crate) fn build(mut self) -> Result<ClusterTree> {
        let mut next_level_significant = true;
        let mut affected_cluster_labels: BTreeSet<usize> = BTreeSet::new();
        let mut affected_vertices: BTreeSet<usize> = BTreeSet::new();
        // Edges at [0, cursor) are still unprocessed; the heaviest is next.
        let mut cursor = self.graph.num_edges();

        while cursor > 0 {
            let current_weight = self.graph.edge_weight(cursor - 1);
            let mut new_clusters: Vec<usize> = Vec::new();

            // Remove all edges tied at the current weight, collecting the
            // touched vertices and cluster labels.
            while cursor > 0 && self.graph.edge_weight(cursor - 1) == current_weight {
                let (first, second) = self.graph.edge_endpoints(cursor - 1);
                self.graph.remove_edge(first, second);
                cursor -= 1;

                if self.current_labels[first] == 0 {
                    continue;
                }
                affected_vertices.insert(first);
                if second < self.num_points {
                    affected_vertices.insert(second);
                }
                affected_cluster_labels.insert(self.current_labels[first]);
            }

            if affected_cluster_labels.is_empty() {
                continue;
            }

            while let Some(examined_label) = affected_cluster_labels.pop_last() {
                self.examine_cluster(
                    examined_label,
                    current_weight,
                    &mut affected_vertices,
                    &mut new_clusters,
                )?;
            }

            if !self.compact_hierarchy || next_level_significant || !new_clusters.is_empty() {
                self.line_count += 1;
                self.hierarchy.insert(
                    self.line_count,
                    HierarchyEntry::new(current_weight, self.previous_labels.clone()),
                );
            }
            for &label in &new_clusters {
                if let Some(cluster) = self.clusters[label].as_mut() {
                    cluster.set_offset(self.line_count);
                }
            }

            self.previous_labels.copy_from_slice(&self.current_labels);
            next_level_significant = !new_clusters.is_empty();
        }

        // Terminal level: every point has dissolved to noise.
        self.hierarchy
            .insert(0, HierarchyEntry::new(0.0, vec![0; self.num_points]));

        debug!(
            levels = self.hierarchy.len(),
            clusters = self.clusters.len() - 1,
            "cluster tree constructed"
        );
        Ok(ClusterTree {
            clusters: self.clusters,
            hierarchy: self.hierarchy,
            point_noise_levels: self.point_noise_levels,
            point_last_clusters: self.point_last_clusters,
        })
    }

    /// Re-explores one affected cluster and resolves each of its surviving
    /// components as shrinkage, a split child, or noise fall-off.
    fn examine_cluster(
        &mut self,
        examined_label: usize,
        weight: f64,
        affected_vertices: &mut BTreeSet<usize>,
        new_clusters: &mut Vec<usize>,
    ) -> Result<()> {
        // Pull out the affected vertices that belong to this cluster.
        let mut examined_vertices: BTreeSet<usize> = BTreeSet::new();
        let members: Vec<usize> = affected_vertices
            .iter()
            .copied()
            .filter(|&v| self.current_labels[v] == examined_label)
            .collect();
        for vertex in members {
            affected_vertices.remove(&vertex);
            examined_vertices.insert(vertex);
        }

        let mut first_child: BTreeSet<usize> = BTreeSet::new();
        let mut unexplored_first_child: BTreeSet<usize> = BTreeSet::new();
        let mut num_child_clusters = 0_usize;

        while let Some(root_vertex) = examined_vertices.pop_last() {
            let mut constructing: BTreeSet<usize> = BTreeSet::new();
            let mut frontier: Vec<usize> = Vec::new();
            constructing.insert(root_vertex);
            frontier.push(root_vertex);
            let mut any_edges = false;
            let mut counted = false;

            while let Some(vertex) = frontier.pop() {
                for &neighbor in self.graph.neighbors(vertex) {
                    any_edges = true;
                    if constructing.insert(neighbor) {
                        frontier.push(neighbor);
                        examined_vertices.remove(&neighbor);
                    }
                }

                if !counted && constructing.len() >= self.min_points && any_edges {
                    counted = true;
                    num_child_clusters += 1;

                    // The first admissible component is reserved: defer the
                    // rest of its exploration until a second one confirms a
                    // split, so a mere shrink costs no extra traversal.
                    if first_child.is_empty() {
                        first_child.extend(constructing.iter().copied());
                        unexplored_first_child.extend(frontier.iter().copied());
                        break;
                    }
                }
            }

            if num_child_clusters >= 2 && constructing.len() >= self.min_points && any_edges {
                // Guard against re-exploring the reserved first child from a
                // seed inside its unexplored remainder.
                let same_as_first = first_child
                    .iter()
                    .next_back()
                    .is_some_and(|member| constructing.contains(member));
                if same_as_first {
                    num_child_clusters -= 1;
                } else {
                    let label = self.next_cluster_label;
                    self.next_cluster_label += 1;
                    self.create_cluster(&constructing, examined_label, label, weight)?;
                    new_clusters.push(label);
                }
            } else if constructing.len() < self.min_points || !any_edges {
                self.create_cluster(&constructing, examined_label, 0, weight)?;
                for &point in &constructing {
                    self.point_noise_levels[point] = weight;
                    self.point_last_clusters[point] = examined_label;
                }
            }
        }

        // A confirmed split leaves the reserved first child still carrying
        // the parent label; finish exploring it and label it now.
        let first_member = first_child.iter().next().copied();
        let split_pending = num_child_clusters >= 2
            && first_member.is_some_and(|member| self.current_labels[member] == examined_label);
        if split_pending {
            while let Some(vertex) = unexplored_first_child.pop_last() {
                for &neighbor in self.graph.neighbors(vertex) {
                    if first_child.insert(neighbor) {
                        unexplored_first_child.insert(neighbor);
                    }
                }
            }
            let label = self.next_cluster_label;
            self.next_cluster_label += 1;
            self.create_cluster(&first_child, examined_label, label, weight)?;
            new_clusters.push(label);
        }
        Ok(())
    }

    /// Relabels the points, detaches them from the parent, and either records
    /// a new cluster node or books the points as the parent's virtual noise
    /// children when `label` is 0.
    fn create_cluster(
        &mut self,
        points: &BTreeSet<usize>,
        parent_label: usize,
        label: usize,
        edge_weight: f64,
    ) -> Result<()> {
        for &point in points {
            self.current_labels[point] = label;
        }
        {
            let parent = self.clusters[parent_label].as_mut().ok_or(
                EngawaError::InvalidState {
                    detail: "examined cluster is missing from the tree",
                },
            )?;
            parent.detach_points(points.len() as i64, edge_weight)?;
            if label == 0 {
                parent.add_virtual_child_points(points.iter().copied());
            } else {
                parent.mark_has_children();
            }
        }
        if label != 0 {
            debug_assert_eq!(self.clusters.len(), label);
            self.clusters.push(Some(Cluster::new(
                label,
                Some(parent_label),
                edge_weight,
                points.len() as i64,
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetView, ElementBuffer};
    use crate::distance::{DistanceEngine, Metric};
    use crate::mst::build_mst;

    fn tree_for(values: &[f64], min_points: usize) -> ClusterTree {
        let view = DatasetView::new(ElementBuffer::F64(values), values.len(), 1, true)
            .expect("valid view");
        let distance = DistanceEngine::compute(&view, Metric::Euclidean, min_points - 1);
        let mut graph = build_mst(&distance, true).expect("MST must build");
        graph.sort_by_edge_weight();
        ClusterTreeBuilder::new(&mut graph, min_points, false)
            .build()
            .expect("tree must build")
    }

    #[test]
    fn a_clean_gap_produces_a_two_way_split() {
        let tree = tree_for(&[0.0, 1.0, 2.0, 100.0, 101.0, 102.0], 2);
        // Root plus two split children.
        assert_eq!(tree.clusters.len(), 4);
        let root = tree.clusters[1].as_ref().expect("root must exist");
        assert!(root.has_children());
        for label in [2, 3] {
            let child = tree.clusters[label].as_ref().expect("child must exist");
            assert_eq!(child.parent(), Some(1));
            assert!(child.death_level() > 0.0);
        }
    }

    #[test]
    fn uniform_spacing_never_splits() {
        let values: Vec<f64> = (0..20).map(f64::from).collect();
        let tree = tree_for(&values, 3);
        assert_eq!(tree.clusters.len(), 2);
        let root = tree.clusters[1].as_ref().expect("root must exist");
        assert!(!root.has_children());
        // Every non-terminal level still shows the single root cluster.
        for (&line, entry) in &tree.hierarchy {
            if line > 0 {
                assert!(entry.labels().iter().all(|&l| l == 1 || l == 0));
            }
        }
    }

    #[test]
    fn every_point_ends_as_noise_with_a_recorded_level() {
        let tree = tree_for(&[0.0, 1.0, 2.0, 50.0, 51.0, 52.0, 53.0], 2);
        let terminal = tree.hierarchy.get(&0).expect("terminal level must exist");
        assert_eq!(terminal.edge_weight(), 0.0);
        assert!(terminal.labels().iter().all(|&l| l == 0));
        assert!(tree.point_noise_levels.iter().all(|&level| level > 0.0));
        assert!(tree.point_last_clusters.iter().all(|&c| c > 0));
    }

    #[test]
    fn hierarchy_lines_count_up_from_one() {
        let tree = tree_for(&[0.0, 1.0, 2.0, 100.0, 101.0, 102.0], 2);
        let keys: Vec<i64> = tree.hierarchy.keys().copied().collect();
        assert_eq!(keys[0], 0);
        for (expected, &key) in (1..).zip(&keys[1..]) {
            assert_eq!(key, expected);
        }
    }

    #[test]
    fn split_children_record_their_birth_line() {
        let tree = tree_for(&[0.0, 1.0, 2.0, 100.0, 101.0, 102.0], 2);
        for label in [2, 3] {
            let child = tree.clusters[label].as_ref().expect("child must exist");
            assert_eq!(child.offset(), 1);
        }
    }
}
