//! Per-point outlier scores.

use std::cmp::Ordering;

/// GLOSH-style outlier score for a single point.
///
/// Scores lie in `[0, 1]`; a score of 0 marks either a point that stayed
/// clustered to the densest level or the sentinel for points removed at a
/// zero density threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutlierScore {
    id: usize,
    score: f64,
    core_distance: f64,
}

impl OutlierScore {
    pub(crate) const fn new(id: usize, score: f64, core_distance: f64) -> Self {
        Self {
            id,
            score,
            core_distance,
        }
    }

    /// Returns the point index this score belongs to.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Returns the outlier score.
    #[must_use]
    pub const fn score(&self) -> f64 {
        self.score
    }

    /// Returns the point's core distance.
    #[must_use]
    pub const fn core_distance(&self) -> f64 {
        self.core_distance
    }
}

impl Eq for OutlierScore {}

impl Ord for OutlierScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.core_distance.total_cmp(&other.core_distance))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for OutlierScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_prefers_score_then_core_distance_then_id() {
        let low = OutlierScore::new(3, 0.1, 0.5);
        let mid = OutlierScore::new(2, 0.4, 0.2);
        let tied_core = OutlierScore::new(1, 0.4, 0.9);
        let tied_all = OutlierScore::new(4, 0.4, 0.9);

        let mut scores = vec![tied_all, tied_core, mid, low];
        scores.sort_unstable();
        let ids: Vec<usize> = scores.iter().map(OutlierScore::id).collect();
        assert_eq!(ids, [3, 2, 1, 4]);
    }
}
