//! Edge building: turns a prepared minutia sequence into a sorted list of
//! invariant edge descriptors.

use crate::consts::{
    MAX_MINUTIA_DISTANCE, MAX_MINUTIA_DISTANCE_SQUARED, MAX_NUMBER_OF_EDGES, MIN_NUMBER_OF_EDGES,
};
use crate::math::{are_angles_opposite, atan2_round_degree, normalize_angle};
use crate::types::{BetaOrder, Edge, Format, Minutia};

/// Emits an edge for every minutia pair within the distance cutoff and
/// sorts the result by `(distance_squared, min_beta, max_beta)`.
///
/// Relies on `minutiae` being sorted by `(x, y)`: once the x gap alone
/// exceeds the cutoff, no later partner can qualify.
pub fn find_edges(minutiae: &[Minutia], edges: &mut Vec<Edge>, format: Format) {
    assert!(!minutiae.is_empty());

    'outer: for k in 0..minutiae.len() - 1 {
        for j in k + 1..minutiae.len() {
            if are_angles_opposite(minutiae[k].theta, minutiae[j].theta) {
                continue;
            }

            let dx = minutiae[j].x - minutiae[k].x;
            let dy = minutiae[j].y - minutiae[k].y;
            let distance_squared = dx * dx + dy * dy;
            if distance_squared > MAX_MINUTIA_DISTANCE * MAX_MINUTIA_DISTANCE {
                if dx > MAX_MINUTIA_DISTANCE {
                    break;
                }
                continue;
            }

            let theta_kj = atan2_round_degree(
                dx,
                match format {
                    Format::NistInternal => dy,
                    Format::Ansi => -dy,
                },
            );

            let beta_k = normalize_angle(theta_kj - minutiae[k].theta);
            let beta_j = normalize_angle(theta_kj - minutiae[j].theta + 180);
            let (min_beta, max_beta, beta_order) = if beta_k < beta_j {
                (beta_k, beta_j, BetaOrder::KJ)
            } else {
                (beta_j, beta_k, BetaOrder::JK)
            };

            edges.push(Edge {
                distance_squared,
                min_beta,
                max_beta,
                endpoint_k: k.into(),
                endpoint_j: j.into(),
                theta_kj,
                beta_order,
            });
            if edges.len() == MAX_NUMBER_OF_EDGES - 1 {
                break 'outer;
            }
        }
    }

    // sort_by_key is stable, which keeps equal keys in emission order
    edges.sort_by_key(|edge| (edge.distance_squared, edge.min_beta, edge.max_beta));
}

/// Number of edges to keep from a sorted edge list: the prefix found by the
/// length search, but never fewer than `MIN_NUMBER_OF_EDGES` when more
/// edges are available.
pub fn limit_edges(edges: &[Edge]) -> usize {
    let calculated = limit_edges_by_length(edges);
    if calculated >= MIN_NUMBER_OF_EDGES {
        calculated
    } else {
        edges.len().min(MIN_NUMBER_OF_EDGES)
    }
}

/// Binary search for the length cutoff in a sorted edge list.
///
/// When the list extends beyond the cutoff the result lands one past the
/// qualifying prefix; that off-by-one is inherited from the reference
/// search and kept for score parity.
pub(crate) fn limit_edges_by_length(edges: &[Edge]) -> usize {
    let mut lower = 0;
    let mut upper = edges.len() + 1;
    let mut current = 1;

    while upper - lower > 1 {
        let midpoint = (lower + upper) / 2;
        if edges[midpoint - 1].distance_squared > MAX_MINUTIA_DISTANCE_SQUARED {
            upper = midpoint;
        } else {
            lower = midpoint;
            current = midpoint + 1;
        }
    }

    current.min(edges.len())
}
