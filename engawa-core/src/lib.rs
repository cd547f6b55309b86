//! Engawa core library: hierarchical density-based clustering (HDBSCAN*).
//!
//! Given an `N x D` numeric dataset and a minimum points parameter, the
//! engine produces a condensed cluster hierarchy indexed by density
//! threshold, a flat partition labelling each point with a cluster id or
//! noise, per-point outlier scores, and summary statistics for judging
//! clustering validity.

mod builder;
mod cluster;
mod dataset;
mod distance;
mod engine;
mod error;
mod graph;
mod hierarchy;
mod mst;
mod outlier;
mod primes;
mod stats;

pub use crate::{
    builder::EngawaBuilder,
    dataset::{DatasetView, ElementBuffer, ElementKind},
    distance::{DistanceEngine, Metric},
    engine::{Engawa, RunSummary},
    error::{DatasetError, DatasetErrorCode, EngawaError, EngawaErrorCode, Result},
    graph::Graph,
    hierarchy::{Hierarchy, HierarchyEntry},
    outlier::OutlierScore,
    primes::find_prime_less_than,
    stats::{
        ClusteringStats, DistanceKind, DistanceValues, StatsValues, analyse_stats,
        calculate_stats, create_cluster_map, min_max_distances, sort_by_length,
        sort_by_similarity,
    },
};
