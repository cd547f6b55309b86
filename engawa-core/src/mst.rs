//! Prim construction of the mutual-reachability minimum spanning tree.
//!
//! The tree is grown over the implicit complete graph whose edge weights are
//! mutual reachability distances: the maximum of the two endpoints' core
//! distances and their pairwise distance. Expansion starts from the last
//! point; each round scans every unattached point, tightening its best
//! attachment distance against the freshly attached point, and then attaches
//! the unattached point with the smallest distance (lowest index on ties).
//!
//! When self-edges are enabled, one `(v, v)` loop per point carrying the
//! point's core distance is appended after the real edges. These loops give
//! every point a recorded weight at which it stands alone, so singletons
//! dissolve at their own density threshold during tree construction.

use tracing::debug;

use crate::{distance::DistanceEngine, error::EngawaError, graph::Graph};

pub(crate) fn build_mst(distance: &DistanceEngine, self_edges: bool) -> Result<Graph, EngawaError> {
    let size = distance.num_points();
    if size == 0 {
        return Err(EngawaError::MstFailure {
            reason: "no points to span",
        });
    }
    let core = distance.core_distances();
    let self_edge_capacity = if self_edges { size } else { 0 };

    let mut attached = vec![false; size];
    let mut nearest_neighbors = vec![0_usize; size];
    let mut nearest_distances = vec![f64::MAX; size];

    // Expansion starts with the last point already in the tree.
    let mut current_point = size - 1;
    attached[size - 1] = true;

    for _ in 1..size {
        let mut nearest_point = usize::MAX;
        let mut nearest_distance = f64::MAX;

        for neighbor in 0..size {
            if neighbor == current_point || attached[neighbor] {
                continue;
            }

            let mut mutual_reachability = distance.get(neighbor, current_point);
            if core[current_point] > mutual_reachability {
                mutual_reachability = core[current_point];
            }
            if core[neighbor] > mutual_reachability {
                mutual_reachability = core[neighbor];
            }

            if mutual_reachability < nearest_distances[neighbor] {
                nearest_distances[neighbor] = mutual_reachability;
                nearest_neighbors[neighbor] = current_point;
            }

            // Strict comparison: the lowest-index point wins on ties.
            if nearest_distances[neighbor] < nearest_distance {
                nearest_distance = nearest_distances[neighbor];
                nearest_point = neighbor;
            }
        }

        if nearest_point == usize::MAX {
            return Err(EngawaError::MstFailure {
                reason: "no unattached point could be reached",
            });
        }
        attached[nearest_point] = true;
        current_point = nearest_point;
    }

    // Each point's attachment edge lives at the slot of its own index; the
    // starting point has none.
    let total = size - 1 + self_edge_capacity;
    let mut vertices_a = Vec::with_capacity(total);
    let mut vertices_b = Vec::with_capacity(total);
    let mut weights = Vec::with_capacity(total);
    for vertex in 0..size - 1 {
        vertices_a.push(nearest_neighbors[vertex]);
        vertices_b.push(vertex);
        weights.push(nearest_distances[vertex]);
    }
    if self_edges {
        for vertex in 0..size {
            vertices_a.push(vertex);
            vertices_b.push(vertex);
            weights.push(core[vertex]);
        }
    }

    debug!(
        points = size,
        edges = total,
        self_edges,
        "minimum spanning tree constructed"
    );
    Ok(Graph::new(size, vertices_a, vertices_b, weights))
}
