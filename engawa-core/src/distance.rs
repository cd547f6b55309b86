//! Pairwise distance storage and core-distance derivation.
//!
//! Pairwise distances are held as the strict upper triangle of the full
//! matrix, packed row-major into a flat array of length `n * (n - 1) / 2`.
//! Core distances are derived from the packed store with a per-point sorted
//! window so only the smallest `num_neighbors + 1` distances are ever kept.
//!
//! Both hot loops are data-parallel over points: each row of the triangle is
//! a disjoint slice of the store, and each core-distance window is private to
//! its point.

use rayon::prelude::*;
use tracing::debug;

use crate::dataset::DatasetView;

/// Distance metric applied to dataset points.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Metric {
    /// Straight-line distance over the point coordinates.
    #[default]
    Euclidean,
}

impl Metric {
    fn evaluate(self, view: &DatasetView<'_>, left: usize, right: usize) -> f64 {
        match self {
            Self::Euclidean => euclidean(view, left, right),
        }
    }
}

fn euclidean(view: &DatasetView<'_>, left: usize, right: usize) -> f64 {
    let mut sum = 0.0_f64;
    for axis in 0..view.dimensions() {
        let diff = view.coordinate(left, axis) - view.coordinate(right, axis);
        sum += diff * diff;
    }
    sum.sqrt()
}

const fn triangular(m: usize) -> usize {
    m * (m + 1) / 2
}

/// Packed pairwise distances plus the derived per-point core distances.
#[derive(Clone, Debug)]
pub struct DistanceEngine {
    num_points: usize,
    num_neighbors: usize,
    metric: Metric,
    distances: Vec<f64>,
    core_distances: Vec<f64>,
}

impl DistanceEngine {
    /// Computes all pairwise distances and the core distances for
    /// `num_neighbors` nearest neighbours (self excluded from the count).
    #[must_use]
    pub fn compute(view: &DatasetView<'_>, metric: Metric, num_neighbors: usize) -> Self {
        let num_points = view.num_points();
        let mut distances = vec![0.0_f64; num_points * num_points.saturating_sub(1) / 2];

        // Row i owns the cells for pairs (i, i+1..n); the rows are disjoint
        // slices of the packed triangle, so they fill in parallel.
        let mut rows: Vec<(usize, &mut [f64])> = Vec::with_capacity(num_points);
        let mut rest = distances.as_mut_slice();
        for i in 0..num_points.saturating_sub(1) {
            let (head, tail) = rest.split_at_mut(num_points - 1 - i);
            rows.push((i, head));
            rest = tail;
        }
        rows.into_par_iter().for_each(|(i, row)| {
            for (offset, cell) in row.iter_mut().enumerate() {
                let j = i + 1 + offset;
                *cell = metric.evaluate(view, i, j);
            }
        });

        let mut engine = Self {
            num_points,
            num_neighbors,
            metric,
            distances,
            core_distances: Vec::new(),
        };
        engine.recompute_core_distances(num_neighbors);
        debug!(
            points = num_points,
            pairs = engine.distances.len(),
            "pairwise distances computed"
        );
        engine
    }

    /// Returns the number of points the engine was computed over.
    #[must_use]
    pub const fn num_points(&self) -> usize {
        self.num_points
    }

    /// Returns the neighbour count the current core distances were derived
    /// with.
    #[must_use]
    pub const fn num_neighbors(&self) -> usize {
        self.num_neighbors
    }

    /// Returns the configured metric.
    #[must_use]
    pub const fn metric(&self) -> Metric {
        self.metric
    }

    /// Looks up the distance between two points.
    ///
    /// The packed triangle stores each unordered pair once; lookups for
    /// `row > col` swap the indices and `row == col` is zero by definition.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if row == col {
            return 0.0;
        }
        let (lo, hi) = if row < col { (row, col) } else { (col, row) };
        let idx = lo * self.num_points + hi - triangular(lo + 1);
        self.distances[idx]
    }

    /// Returns the per-point core distances.
    #[must_use]
    pub fn core_distances(&self) -> &[f64] {
        &self.core_distances
    }

    /// Recomputes core distances for a new neighbour count without touching
    /// the pairwise store.
    pub fn recompute_core_distances(&mut self, num_neighbors: usize) {
        self.num_neighbors = num_neighbors;
        let core = {
            let this: &Self = self;
            (0..this.num_points)
                .into_par_iter()
                .map(|point| this.core_distance_of(point))
                .collect()
        };
        self.core_distances = core;
    }

    /// Maintains a sorted window of the `num_neighbors + 1` smallest
    /// distances seen so far; the self distance of zero enters like any other
    /// candidate, so the window tail ends up as the `num_neighbors + 1`-th
    /// order statistic of the point's distance row.
    fn core_distance_of(&self, point: usize) -> f64 {
        let len = self.num_neighbors + 1;
        let mut window = vec![f64::MAX; len];
        for other in 0..self.num_points {
            let candidate = self.get(point, other);
            // A candidate matching the tail would only displace an equal
            // value, so it is skipped along with anything larger.
            if candidate >= window[len - 1] {
                continue;
            }
            let mut low = 0;
            let mut high = len;
            while low < high {
                let mid = low + (high - low) / 2;
                if window[mid] > candidate {
                    high = mid;
                } else if window[mid] == candidate {
                    low = mid;
                    break;
                } else {
                    low = mid + 1;
                }
            }
            if low < len {
                window.copy_within(low..len - 1, low + 1);
                window[low] = candidate;
            }
        }
        window[len - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetView, ElementBuffer};
    use proptest::prelude::*;
    use rstest::rstest;

    fn engine_1d(values: &[f64], num_neighbors: usize) -> DistanceEngine {
        let view = DatasetView::new(ElementBuffer::F64(values), values.len(), 1, true)
            .expect("valid view");
        DistanceEngine::compute(&view, Metric::Euclidean, num_neighbors)
    }

    #[test]
    fn computes_euclidean_pairs() {
        let values = [0.0_f64, 0.0, 3.0, 4.0, 6.0, 8.0];
        let view = DatasetView::new(ElementBuffer::F64(&values), 3, 2, true).expect("valid view");
        let engine = DistanceEngine::compute(&view, Metric::Euclidean, 1);
        assert!((engine.get(0, 1) - 5.0).abs() < 1e-12);
        assert!((engine.get(1, 2) - 5.0).abs() < 1e-12);
        assert!((engine.get(0, 2) - 10.0).abs() < 1e-12);
        assert_eq!(engine.get(2, 2), 0.0);
        assert_eq!(engine.get(2, 0), engine.get(0, 2));
    }

    #[rstest]
    #[case(1, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0])]
    #[case(2, vec![2.0, 1.0, 2.0, 2.0, 1.0, 2.0])]
    fn core_distances_track_the_neighbor_count(
        #[case] num_neighbors: usize,
        #[case] expected: Vec<f64>,
    ) {
        let engine = engine_1d(&[0.0, 1.0, 2.0, 100.0, 101.0, 102.0], num_neighbors);
        assert_eq!(engine.core_distances(), expected.as_slice());
    }

    #[test]
    fn duplicate_points_have_zero_core_distance() {
        let engine = engine_1d(&[5.0, 5.0, 5.0, 5.0], 2);
        assert_eq!(engine.core_distances(), [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn recompute_matches_a_fresh_engine() {
        let values = [0.0, 1.5, 3.0, 9.0, 9.5, 20.0];
        let mut engine = engine_1d(&values, 1);
        engine.recompute_core_distances(3);
        let fresh = engine_1d(&values, 3);
        assert_eq!(engine.core_distances(), fresh.core_distances());
        assert_eq!(engine.num_neighbors(), 3);
    }

    proptest! {
        #[test]
        fn lookups_are_symmetric_with_zero_diagonal(
            values in prop::collection::vec(-100.0_f64..100.0, 2..12),
        ) {
            let engine = engine_1d(&values, 1);
            for i in 0..values.len() {
                prop_assert_eq!(engine.get(i, i), 0.0);
                for j in 0..values.len() {
                    prop_assert_eq!(engine.get(i, j), engine.get(j, i));
                }
            }
        }

        #[test]
        fn core_distance_is_the_min_points_order_statistic(
            values in prop::collection::vec(-50.0_f64..50.0, 5..12),
            min_points in 2_usize..5,
        ) {
            let engine = engine_1d(&values, min_points - 1);
            for (point, _) in values.iter().enumerate() {
                let mut row: Vec<f64> =
                    (0..values.len()).map(|other| engine.get(point, other)).collect();
                row.sort_by(f64::total_cmp);
                prop_assert_eq!(engine.core_distances()[point], row[min_points - 1]);
            }
        }
    }
}
