//! Orchestration of the four-stage HDBSCAN* pipeline.
//!
//! [`Engawa::run`] drives the stages in order: pairwise and core distances,
//! the mutual-reachability spanning tree, the cluster tree with its recorded
//! hierarchy, and finally stability propagation with flat extraction. All
//! stage outputs stay cached on the engine so the read accessors and
//! [`Engawa::rerun`] (which reuses the pairwise store) can serve them without
//! recomputation.

use tracing::{debug, instrument, warn};

use crate::{
    dataset::DatasetView,
    distance::{DistanceEngine, Metric},
    error::{EngawaError, Result},
    graph::Graph,
    hierarchy::{
        ClusterTree, ClusterTreeBuilder, Hierarchy, compute_outlier_scores,
        find_prominent_clusters, propagate_tree,
    },
    mst::build_mst,
    outlier::OutlierScore,
};

/// Summary of one completed clustering run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunSummary {
    num_points: usize,
    num_clusters: usize,
    num_noise: usize,
    infinite_stability: bool,
}

impl RunSummary {
    /// Returns the number of points that were clustered.
    #[must_use]
    pub const fn num_points(&self) -> usize {
        self.num_points
    }

    /// Returns the number of distinct non-noise clusters in the flat
    /// partition.
    #[must_use]
    pub const fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// Returns the number of points labelled noise.
    #[must_use]
    pub const fn num_noise(&self) -> usize {
        self.num_noise
    }

    /// Returns whether any cluster accumulated infinite stability.
    #[must_use]
    pub const fn infinite_stability(&self) -> bool {
        self.infinite_stability
    }
}

#[derive(Debug)]
struct RunState {
    distance: DistanceEngine,
    mst: Graph,
    hierarchy: Hierarchy,
    labels: Vec<usize>,
    outlier_scores: Vec<OutlierScore>,
    infinite_stability: bool,
}

/// Entry point for running the clustering pipeline.
///
/// # Examples
/// ```
/// use engawa_core::{DatasetView, ElementBuffer, EngawaBuilder};
///
/// let values = [0.0_f64, 1.0, 2.0, 100.0, 101.0, 102.0];
/// let view = DatasetView::new(ElementBuffer::F64(&values), 6, 1, true)?;
/// let mut engine = EngawaBuilder::new().with_min_points(2).build()?;
/// let summary = engine.run(&view)?;
/// assert_eq!(summary.num_points(), 6);
/// assert_eq!(summary.num_clusters(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Engawa {
    min_points: usize,
    self_edges: bool,
    state: Option<RunState>,
}

impl Engawa {
    pub(crate) const fn new(min_points: usize, self_edges: bool) -> Self {
        Self {
            min_points,
            self_edges,
            state: None,
        }
    }

    /// Returns the minimum points parameter of the most recent configuration.
    #[must_use]
    pub const fn min_points(&self) -> usize {
        self.min_points
    }

    /// Executes the full pipeline against the dataset.
    ///
    /// # Errors
    /// Returns [`EngawaError::InsufficientPoints`] when the dataset holds
    /// fewer points than `min_points`, and [`EngawaError::MstFailure`] when
    /// the spanning tree cannot be built.
    #[instrument(
        name = "engawa.run",
        err,
        skip_all,
        fields(points = dataset.num_points(), min_points = self.min_points),
    )]
    pub fn run(&mut self, dataset: &DatasetView<'_>) -> Result<RunSummary> {
        let points = dataset.num_points();
        if points < self.min_points {
            return Err(EngawaError::InsufficientPoints {
                points,
                min_points: self.min_points,
            });
        }
        let distance = DistanceEngine::compute(dataset, Metric::Euclidean, self.min_points - 1);
        self.finish_run(distance)
    }

    /// Re-clusters with a new minimum points parameter, reusing the cached
    /// pairwise distances from the previous run.
    ///
    /// # Errors
    /// Returns [`EngawaError::InvalidState`] when no run has completed yet,
    /// [`EngawaError::InvalidMinPoints`] when `min_points < 2`, and
    /// [`EngawaError::InsufficientPoints`] when the cached dataset is too
    /// small for the new parameter.
    #[instrument(name = "engawa.rerun", err, skip(self), fields(min_points))]
    pub fn rerun(&mut self, min_points: usize) -> Result<RunSummary> {
        if min_points < 2 {
            return Err(EngawaError::InvalidMinPoints { got: min_points });
        }
        let state = self.state.take().ok_or(EngawaError::InvalidState {
            detail: "rerun requires a completed run",
        })?;
        let points = state.distance.num_points();
        if points < min_points {
            self.state = Some(state);
            return Err(EngawaError::InsufficientPoints { points, min_points });
        }

        self.min_points = min_points;
        let mut distance = state.distance;
        distance.recompute_core_distances(min_points - 1);
        self.finish_run(distance)
    }

    /// Stages two to four: spanning tree, cluster tree, propagation and flat
    /// extraction.
    fn finish_run(&mut self, distance: DistanceEngine) -> Result<RunSummary> {
        let num_points = distance.num_points();
        let mut mst = build_mst(&distance, self.self_edges)?;
        mst.sort_by_edge_weight();

        let tree = ClusterTreeBuilder::new(&mut mst, self.min_points, false).build()?;
        let ClusterTree {
            mut clusters,
            hierarchy,
            point_noise_levels,
            point_last_clusters,
        } = tree;

        // Points removed at a zero threshold are the duplicate-data anomaly
        // the stability warning exists for, even when no cluster's
        // accumulator overflowed.
        let infinite_stability = propagate_tree(&mut clusters)
            || point_noise_levels.iter().any(|&level| level == 0.0);
        if infinite_stability {
            warn!(
                "stability is infinite for some clusters, typically from duplicate points; \
                 the flat extraction may be unreliable at this min_points"
            );
        }

        let labels = find_prominent_clusters(&clusters, &hierarchy, num_points);
        let outlier_scores = compute_outlier_scores(
            &clusters,
            &point_noise_levels,
            &point_last_clusters,
            distance.core_distances(),
        );

        let num_noise = labels.iter().filter(|&&label| label == 0).count();
        let mut distinct: Vec<usize> = labels.iter().copied().filter(|&l| l != 0).collect();
        distinct.sort_unstable();
        distinct.dedup();
        let summary = RunSummary {
            num_points,
            num_clusters: distinct.len(),
            num_noise,
            infinite_stability,
        };
        debug!(
            clusters = summary.num_clusters,
            noise = summary.num_noise,
            levels = hierarchy.len(),
            "clustering pipeline completed"
        );

        self.state = Some(RunState {
            distance,
            mst,
            hierarchy,
            labels,
            outlier_scores,
            infinite_stability,
        });
        Ok(summary)
    }

    fn state(&self) -> Result<&RunState> {
        self.state.as_ref().ok_or(EngawaError::InvalidState {
            detail: "no clustering has been computed yet",
        })
    }

    /// Returns the flat per-point labels; 0 marks noise.
    ///
    /// # Errors
    /// Returns [`EngawaError::InvalidState`] before the first run.
    pub fn labels(&self) -> Result<&[usize]> {
        Ok(&self.state()?.labels)
    }

    /// Returns the outlier scores, ascending by score.
    ///
    /// # Errors
    /// Returns [`EngawaError::InvalidState`] before the first run.
    pub fn outlier_scores(&self) -> Result<&[OutlierScore]> {
        Ok(&self.state()?.outlier_scores)
    }

    /// Returns the recorded hierarchy levels.
    ///
    /// # Errors
    /// Returns [`EngawaError::InvalidState`] before the first run.
    pub fn hierarchy(&self) -> Result<&Hierarchy> {
        Ok(&self.state()?.hierarchy)
    }

    /// Returns the mutual-reachability spanning tree. Its adjacency lists are
    /// drained by tree construction, but the edge arrays stay intact.
    ///
    /// # Errors
    /// Returns [`EngawaError::InvalidState`] before the first run.
    pub fn mst(&self) -> Result<&Graph> {
        Ok(&self.state()?.mst)
    }

    /// Returns the per-point core distances.
    ///
    /// # Errors
    /// Returns [`EngawaError::InvalidState`] before the first run.
    pub fn core_distances(&self) -> Result<&[f64]> {
        Ok(self.state()?.distance.core_distances())
    }

    /// Returns the distance engine backing the most recent run.
    ///
    /// # Errors
    /// Returns [`EngawaError::InvalidState`] before the first run.
    pub fn distances(&self) -> Result<&DistanceEngine> {
        Ok(&self.state()?.distance)
    }

    /// Returns whether the most recent run saw infinite stability.
    ///
    /// # Errors
    /// Returns [`EngawaError::InvalidState`] before the first run.
    pub fn infinite_stability(&self) -> Result<bool> {
        Ok(self.state()?.infinite_stability)
    }
}
