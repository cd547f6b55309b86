//! Cluster hierarchy construction, stability propagation and flat extraction.
//!
//! The hierarchy is built by peeling the heaviest mutual-reachability edges
//! off the spanning tree: each batch of tied weights is removed at once, the
//! touched components are re-explored, and a level is recorded whenever the
//! partition changed in a significant way. Stability then propagates from the
//! leaves upward, and the most stable set of clusters is flattened into
//! per-point labels and outlier scores.

mod extract;
mod propagate;
mod tree_builder;

use std::collections::BTreeMap;

pub(crate) use self::extract::{compute_outlier_scores, find_prominent_clusters};
pub(crate) use self::propagate::propagate_tree;
pub(crate) use self::tree_builder::{ClusterTree, ClusterTreeBuilder};

/// One recorded density level: the edge weight at which it was written and
/// the cluster id of every point just before the edges at that weight were
/// removed.
#[derive(Clone, Debug, PartialEq)]
pub struct HierarchyEntry {
    edge_weight: f64,
    labels: Vec<usize>,
}

impl HierarchyEntry {
    /// Creates an entry from a level weight and per-point labels.
    #[must_use]
    pub fn new(edge_weight: f64, labels: Vec<usize>) -> Self {
        Self {
            edge_weight,
            labels,
        }
    }

    /// Returns the mutual-reachability threshold of this level.
    #[must_use]
    pub const fn edge_weight(&self) -> f64 {
        self.edge_weight
    }

    /// Returns the per-point cluster ids recorded at this level.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }
}

/// Hierarchy levels keyed by line number. Lines count up from 1 in peeling
/// order; the terminal all-noise level is keyed 0.
pub type Hierarchy = BTreeMap<i64, HierarchyEntry>;
