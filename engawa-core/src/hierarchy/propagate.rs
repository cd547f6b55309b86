//! Bottom-up stability propagation over the cluster tree.
//!
//! Labels are assigned in creation order, so every child's label exceeds its
//! parent's. Draining a sorted worklist from the largest label therefore
//! guarantees that all of a cluster's descendants have been folded in before
//! the cluster itself propagates into its parent.

use std::collections::BTreeSet;

use crate::cluster::Cluster;

/// Propagates stability from the leaves to the root and returns whether any
/// cluster accumulated infinite stability.
pub(crate) fn propagate_tree(clusters: &mut [Option<Cluster>]) -> bool {
    let mut to_examine: BTreeSet<usize> = BTreeSet::new();
    let mut queued = vec![false; clusters.len()];
    let mut infinite_stability = false;

    for cluster in clusters.iter().flatten() {
        if !cluster.has_children() {
            to_examine.insert(cluster.label());
            queued[cluster.label()] = true;
        }
    }

    while let Some(label) = to_examine.pop_last() {
        let parent_label = {
            let Some(cluster) = clusters[label].as_mut() else {
                continue;
            };
            cluster.settle_lowest_child_death_level();
            if cluster.stability().is_infinite() {
                infinite_stability = true;
            }
            cluster.parent()
        };

        let Some(parent_label) = parent_label else {
            continue;
        };
        let Some(child) = clusters[label].take() else {
            continue;
        };
        if let Some(parent) = clusters[parent_label].as_mut() {
            child.propagate_into(parent);
            if !queued[parent_label] {
                to_examine.insert(parent_label);
                queued[parent_label] = true;
            }
        }
        clusters[label] = Some(child);
    }

    infinite_stability
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn node(label: usize, parent: usize, birth: f64, points: i64) -> Option<Cluster> {
        Some(Cluster::new(label, Some(parent), birth, points))
    }

    #[test]
    fn leaves_fold_their_stability_into_the_root() {
        let mut clusters = vec![
            None,
            Some(Cluster::new(1, None, f64::NAN, 6)),
            node(2, 1, 4.0, 3),
            node(3, 1, 4.0, 3),
        ];
        for label in [2, 3] {
            let cluster = clusters[label].as_mut().expect("cluster exists");
            cluster.detach_points(3, 1.0).expect("detach must succeed");
        }
        clusters[1]
            .as_mut()
            .expect("root exists")
            .mark_has_children();

        let infinite = propagate_tree(&mut clusters);
        assert!(!infinite);

        let root = clusters[1].as_ref().expect("root exists");
        let mut descendants = root.propagated_descendants().to_vec();
        descendants.sort_unstable();
        assert_eq!(descendants, [2, 3]);
        assert!((root.propagated_stability() - 2.0 * 3.0 * 0.75).abs() < 1e-12);
        assert_eq!(root.propagated_lowest_child_death_level(), 1.0);
    }

    #[rstest]
    #[case(0.5, 2.0, vec![2])]
    #[case(2.0, 0.5, vec![3])]
    fn ties_between_a_cluster_and_its_descendants_go_to_the_stronger_side(
        #[case] middle_detach_level: f64,
        #[case] leaf_detach_level: f64,
        #[case] expected: Vec<usize>,
    ) {
        // Root 1 <- middle 2 <- leaf 3; constraint counts are all zero, so
        // the stability comparison decides which side the root keeps.
        let mut clusters = vec![
            None,
            Some(Cluster::new(1, None, f64::NAN, 8)),
            node(2, 1, 8.0, 8),
            node(3, 2, 4.0, 4),
        ];
        clusters[1]
            .as_mut()
            .expect("root exists")
            .mark_has_children();
        {
            let middle = clusters[2].as_mut().expect("middle exists");
            middle.mark_has_children();
            middle
                .detach_points(8, middle_detach_level)
                .expect("detach must succeed");
        }
        clusters[3]
            .as_mut()
            .expect("leaf exists")
            .detach_points(4, leaf_detach_level)
            .expect("detach must succeed");

        propagate_tree(&mut clusters);
        let root = clusters[1].as_ref().expect("root exists");
        assert_eq!(root.propagated_descendants(), expected.as_slice());
    }

    #[test]
    fn infinite_stability_is_reported() {
        let mut clusters = vec![
            None,
            Some(Cluster::new(1, None, f64::NAN, 4)),
            node(2, 1, 2.0, 4),
        ];
        clusters[1]
            .as_mut()
            .expect("root exists")
            .mark_has_children();
        clusters[2]
            .as_mut()
            .expect("leaf exists")
            .detach_points(4, 0.0)
            .expect("detach must succeed");

        assert!(propagate_tree(&mut clusters));
    }

    #[test]
    fn a_childless_root_settles_its_own_death_level() {
        let mut clusters = vec![None, Some(Cluster::new(1, None, f64::NAN, 5))];
        clusters[1]
            .as_mut()
            .expect("root exists")
            .detach_points(5, 0.75)
            .expect("detach must succeed");

        propagate_tree(&mut clusters);
        let root = clusters[1].as_ref().expect("root exists");
        assert_eq!(root.propagated_lowest_child_death_level(), 0.75);
    }
}
