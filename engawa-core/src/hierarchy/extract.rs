//! Flat extraction: prominent clusters, per-point labels and outlier scores.

use std::collections::BTreeMap;

use crate::{cluster::Cluster, hierarchy::Hierarchy, outlier::OutlierScore};

/// Reads the flat partition chosen by propagation out of the hierarchy.
///
/// The root's propagated descendants are grouped by the hierarchy line on
/// which each was born; the level just below that line carries the labels the
/// descendants' members held right after the birth, which become the final
/// per-point labels. Points covered by no chosen cluster stay noise (0).
pub(crate) fn find_prominent_clusters(
    clusters: &[Option<Cluster>],
    hierarchy: &Hierarchy,
    num_points: usize,
) -> Vec<usize> {
    let mut labels = vec![0_usize; num_points];
    let Some(root) = clusters.get(1).and_then(Option::as_ref) else {
        return labels;
    };

    let mut significant: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for &label in root.propagated_descendants() {
        if let Some(cluster) = clusters.get(label).and_then(Option::as_ref) {
            significant.entry(cluster.offset()).or_default().push(label);
        }
    }

    for (&offset, chosen) in &significant {
        let Some(entry) = hierarchy.get(&(offset + 1)) else {
            continue;
        };
        for (point, &level_label) in entry.labels().iter().enumerate() {
            if chosen.contains(&level_label) {
                labels[point] = level_label;
            }
        }
    }
    labels
}

/// Scores each point by how early it fell off its last cluster relative to
/// the lowest level at which that cluster's descendants survived.
pub(crate) fn compute_outlier_scores(
    clusters: &[Option<Cluster>],
    point_noise_levels: &[f64],
    point_last_clusters: &[usize],
    core_distances: &[f64],
) -> Vec<OutlierScore> {
    let mut scores = Vec::with_capacity(point_noise_levels.len());
    for (point, (&epsilon, &last_cluster)) in point_noise_levels
        .iter()
        .zip(point_last_clusters)
        .enumerate()
    {
        let epsilon_max = clusters
            .get(last_cluster)
            .and_then(Option::as_ref)
            .map_or(f64::MAX, Cluster::propagated_lowest_child_death_level);
        let score = if epsilon == 0.0 {
            0.0
        } else {
            1.0 - epsilon_max / epsilon
        };
        scores.push(OutlierScore::new(point, score, core_distances[point]));
    }
    scores.sort_unstable();
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyEntry;

    fn propagated_fixture() -> (Vec<Option<Cluster>>, Hierarchy) {
        let mut clusters = vec![
            None,
            Some(Cluster::new(1, None, f64::NAN, 6)),
            Some(Cluster::new(2, Some(1), 98.0, 3)),
            Some(Cluster::new(3, Some(1), 98.0, 3)),
        ];
        clusters[1]
            .as_mut()
            .expect("root exists")
            .mark_has_children();
        for label in [2, 3] {
            let cluster = clusters[label].as_mut().expect("cluster exists");
            cluster.set_offset(1);
            cluster.detach_points(3, 1.0).expect("detach must succeed");
        }
        crate::hierarchy::propagate_tree(&mut clusters);

        let mut hierarchy = Hierarchy::new();
        hierarchy.insert(1, HierarchyEntry::new(98.0, vec![1, 1, 1, 1, 1, 1]));
        hierarchy.insert(2, HierarchyEntry::new(1.0, vec![2, 2, 2, 3, 3, 3]));
        hierarchy.insert(0, HierarchyEntry::new(0.0, vec![0, 0, 0, 0, 0, 0]));
        (clusters, hierarchy)
    }

    #[test]
    fn chosen_clusters_label_their_members_from_the_birth_line() {
        let (clusters, hierarchy) = propagated_fixture();
        let labels = find_prominent_clusters(&clusters, &hierarchy, 6);
        assert_eq!(labels, [2, 2, 2, 3, 3, 3]);
    }

    #[test]
    fn an_empty_tree_labels_everything_noise() {
        let clusters = vec![None, Some(Cluster::new(1, None, f64::NAN, 4))];
        let labels = find_prominent_clusters(&clusters, &Hierarchy::new(), 4);
        assert_eq!(labels, [0, 0, 0, 0]);
    }

    #[test]
    fn scores_are_zero_exactly_for_zero_noise_levels() {
        let (clusters, _) = propagated_fixture();
        let noise_levels = [2.0, 0.0, 4.0];
        let last_clusters = [2, 2, 3];
        let core = [0.5, 0.1, 0.9];
        let scores = compute_outlier_scores(&clusters, &noise_levels, &last_clusters, &core);

        for score in &scores {
            assert!(score.score() >= 0.0 && score.score() <= 1.0);
        }
        let zero_scored: Vec<usize> = scores
            .iter()
            .filter(|s| s.score() == 0.0)
            .map(OutlierScore::id)
            .collect();
        assert!(zero_scored.contains(&1));
    }

    #[test]
    fn scores_sort_by_score_then_core_distance_then_id() {
        let clusters = vec![None, Some(Cluster::new(1, None, f64::NAN, 3))];
        // With an absent last cluster every score falls back to the same
        // formula inputs, so ordering is decided by the tie-break chain.
        let noise_levels = [0.0, 0.0, 0.0];
        let last_clusters = [0, 0, 0];
        let core = [0.3, 0.1, 0.3];
        let scores = compute_outlier_scores(&clusters, &noise_levels, &last_clusters, &core);
        let ids: Vec<usize> = scores.iter().map(OutlierScore::id).collect();
        assert_eq!(ids, [1, 0, 2]);
    }
}
