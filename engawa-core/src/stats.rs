//! Per-cluster distance statistics and clustering validity analysis.
//!
//! The per-cluster summaries track the minimum and maximum core distance over
//! members and the minimum and maximum pairwise distance between members.
//! Aggregate statistics are computed over the max/min ratio of each cluster,
//! one value per cluster, using the sample variance and the spreadsheet
//! skewness and kurtosis formulations.

use std::collections::BTreeMap;

use crate::distance::DistanceEngine;

/// Min/max distance summary for one cluster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceValues {
    /// Smallest non-zero core distance over the cluster's members.
    pub min_cr: f64,
    /// Largest core distance over the cluster's members.
    pub max_cr: f64,
    /// Confidence percentage for the core-distance ratio.
    pub cr_confidence: f64,
    /// Smallest non-zero pairwise distance between members.
    pub min_dr: f64,
    /// Largest pairwise distance between members.
    pub max_dr: f64,
    /// Confidence percentage for the intra-cluster distance ratio.
    pub dr_confidence: f64,
}

impl Default for DistanceValues {
    fn default() -> Self {
        Self {
            min_cr: f64::MAX,
            max_cr: 0.0,
            cr_confidence: 0.0,
            min_dr: f64::MAX,
            max_dr: 0.0,
            dr_confidence: 0.0,
        }
    }
}

/// Aggregate moments over one family of per-cluster ratios.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatsValues {
    /// Mean of the ratios.
    pub mean: f64,
    /// Largest ratio.
    pub max: f64,
    /// Sample variance of the ratios.
    pub variance: f64,
    /// Sample standard deviation of the ratios.
    pub standard_dev: f64,
    /// Spreadsheet-form skewness; NaN when fewer than two clusters exist.
    pub skewness: f64,
    /// Spreadsheet-form kurtosis; NaN when fewer than four clusters exist.
    pub kurtosis: f64,
}

/// Aggregate statistics over both ratio families.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClusteringStats {
    /// Number of clusters the statistics were computed over.
    pub count: usize,
    /// Moments of the core-distance ratios.
    pub core_distance_values: StatsValues,
    /// Moments of the intra-cluster distance ratios.
    pub intra_distance_values: StatsValues,
}

/// Which per-cluster confidence a similarity sort should use.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DistanceKind {
    /// Sort by the core-distance confidence.
    Core,
    /// Sort by the intra-cluster distance confidence.
    Intra,
}

/// Groups point indices in `[begin, end)` by their cluster label.
#[must_use]
pub fn create_cluster_map(
    labels: &[usize],
    begin: usize,
    end: usize,
) -> BTreeMap<usize, Vec<usize>> {
    let mut map: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for point in begin..end.min(labels.len()) {
        map.entry(labels[point]).or_default().push(point);
    }
    map
}

/// Computes the per-cluster min/max core and intra-cluster distances.
///
/// Zero distances are excluded from the minimum comparisons so duplicate
/// points do not collapse the ratios.
#[must_use]
pub fn min_max_distances(
    distance: &DistanceEngine,
    cluster_map: &BTreeMap<usize, Vec<usize>>,
) -> BTreeMap<usize, DistanceValues> {
    let core = distance.core_distances();
    let mut map = BTreeMap::new();
    for (&label, members) in cluster_map {
        let mut values = DistanceValues::default();
        for (position, &a) in members.iter().enumerate() {
            let core_distance = core[a];
            if core_distance != 0.0 && core_distance < values.min_cr {
                values.min_cr = core_distance;
            }
            if core_distance > values.max_cr {
                values.max_cr = core_distance;
            }
            for &b in members.iter().skip(position + 1) {
                let d = distance.get(a, b);
                if d != 0.0 && d < values.min_dr {
                    values.min_dr = d;
                }
                if d > values.max_dr {
                    values.max_dr = d;
                }
            }
        }
        map.insert(label, values);
    }
    map
}

fn describe(ratios: &[f64]) -> StatsValues {
    if ratios.is_empty() {
        return StatsValues::default();
    }
    let count = ratios.len();
    let n = count as f64;

    let mut total = 0.0;
    let mut max = ratios[0];
    for &ratio in ratios {
        total += ratio;
        if ratio > max {
            max = ratio;
        }
    }
    let mean = total / n;

    let mut squared = 0.0;
    let mut cubed = 0.0;
    let mut fourth = 0.0;
    for &ratio in ratios {
        let diff = ratio - mean;
        squared += diff * diff;
        cubed += diff.powi(3);
        fourth += diff.powi(4);
    }
    let variance = squared / (n - 1.0);
    let standard_dev = variance.sqrt();

    let skewness = if count >= 2 {
        (n / ((n - 1.0) * (n - 2.0))) * (cubed / standard_dev.powi(3))
    } else {
        f64::NAN
    };
    let kurtosis = if count >= 4 {
        (n * (n + 1.0) / ((n - 1.0) * (n - 2.0) * (n - 3.0))) * (fourth / standard_dev.powi(4))
            - 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0))
    } else {
        f64::NAN
    };

    StatsValues {
        mean,
        max,
        variance,
        standard_dev,
        skewness,
        kurtosis,
    }
}

/// Computes aggregate statistics over the per-cluster max/min ratios and
/// writes each cluster's confidence percentages back into the map.
pub fn calculate_stats(distance_map: &mut BTreeMap<usize, DistanceValues>) -> ClusteringStats {
    let core_ratios: Vec<f64> = distance_map.values().map(|v| v.max_cr / v.min_cr).collect();
    let intra_ratios: Vec<f64> = distance_map.values().map(|v| v.max_dr / v.min_dr).collect();

    let stats = ClusteringStats {
        count: distance_map.len(),
        core_distance_values: describe(&core_ratios),
        intra_distance_values: describe(&intra_ratios),
    };

    for values in distance_map.values_mut() {
        let core_ratio = values.max_cr / values.min_cr;
        let intra_ratio = values.max_dr / values.min_dr;
        values.cr_confidence =
            (stats.core_distance_values.max - core_ratio) / stats.core_distance_values.max * 100.0;
        values.dr_confidence = (stats.intra_distance_values.max - intra_ratio)
            / stats.intra_distance_values.max
            * 100.0;
    }
    stats
}

/// Scores the clustering from the signs of skewness and kurtosis, summed over
/// both ratio families. The result lies in `[-2, 4]`.
#[must_use]
pub fn analyse_stats(stats: &ClusteringStats) -> i32 {
    let mut validity = 0;
    for values in [&stats.intra_distance_values, &stats.core_distance_values] {
        validity += if values.skewness > 0.0 && values.kurtosis > 0.0 {
            2
        } else if values.skewness < 0.0 && values.kurtosis > 0.0 {
            1
        } else if values.skewness > 0.0 && values.kurtosis < 0.0 {
            0
        } else {
            -1
        };
    }
    validity
}

/// Sorts cluster labels ascending by confidence. An empty `clusters` slice
/// sorts every cluster in the map.
#[must_use]
pub fn sort_by_similarity(
    distance_map: &BTreeMap<usize, DistanceValues>,
    clusters: &[usize],
    kind: DistanceKind,
) -> Vec<usize> {
    let mut entries: Vec<(usize, f64)> = if clusters.is_empty() {
        distance_map
            .iter()
            .map(|(&label, values)| (label, confidence(values, kind)))
            .collect()
    } else {
        clusters
            .iter()
            .filter_map(|&label| {
                distance_map
                    .get(&label)
                    .map(|values| (label, confidence(values, kind)))
            })
            .collect()
    };
    entries.sort_by(|left, right| left.1.total_cmp(&right.1));
    entries.into_iter().map(|(label, _)| label).collect()
}

const fn confidence(values: &DistanceValues, kind: DistanceKind) -> f64 {
    match kind {
        DistanceKind::Core => values.cr_confidence,
        DistanceKind::Intra => values.dr_confidence,
    }
}

/// Sorts cluster labels ascending by member count. An empty `clusters` slice
/// sorts every cluster in the map.
#[must_use]
pub fn sort_by_length(
    cluster_map: &BTreeMap<usize, Vec<usize>>,
    clusters: &[usize],
) -> Vec<usize> {
    let mut entries: Vec<(usize, usize)> = if clusters.is_empty() {
        cluster_map
            .iter()
            .map(|(&label, members)| (label, members.len()))
            .collect()
    } else {
        clusters
            .iter()
            .filter_map(|&label| cluster_map.get(&label).map(|members| (label, members.len())))
            .collect()
    };
    entries.sort_by_key(|&(_, len)| len);
    entries.into_iter().map(|(label, _)| label).collect()
}
