//! Joins probe edges with gallery edges of similar length and beta angles
//! into candidate minutia-pair correspondences.

use crate::consts::FACTOR;
use crate::math::{are_angles_equal_with_tolerance, normalize_angle};
use crate::pair_holder::PairHolder;
use crate::types::{Edge, Minutia, Pair};

/// Scans the two sorted edge lists and pushes every geometrically
/// compatible probe/gallery edge combination into `pairs`.
///
/// Both lists are sorted by squared length, so the gallery scan keeps a
/// moving start index: gallery edges that are too short for the current
/// probe edge are too short for every later one as well. The last probe
/// edge is never considered; this matches the reference scan and is part
/// of the scoring contract.
pub fn match_edges_into_pairs(
    probe_edges: &[Edge],
    probe_minutiae: &[Minutia],
    gallery_edges: &[Edge],
    gallery_minutiae: &[Minutia],
    pairs: &mut PairHolder,
) {
    if probe_edges.is_empty() || gallery_edges.is_empty() {
        return;
    }

    let mut start = 0;
    for probe in &probe_edges[..probe_edges.len() - 1] {
        for (j, gallery) in gallery_edges.iter().enumerate().skip(start) {
            let dz = gallery.distance_squared - probe.distance_squared;
            let fi = 2.0 * FACTOR * (gallery.distance_squared + probe.distance_squared) as f32;
            if dz.abs() as f32 > fi {
                if dz < 0 {
                    start = j + 1;
                    continue;
                }
                break;
            }

            if !(are_angles_equal_with_tolerance(probe.min_beta, gallery.min_beta)
                && are_angles_equal_with_tolerance(probe.max_beta, gallery.max_beta))
            {
                continue;
            }

            let mut delta_theta = probe.theta_kj - gallery.theta_kj;
            if probe.beta_order != gallery.beta_order {
                delta_theta -= 180;
            }

            let (gallery_k, gallery_j) = if probe.beta_order == gallery.beta_order {
                (gallery.endpoint_k, gallery.endpoint_j)
            } else {
                (gallery.endpoint_j, gallery.endpoint_k)
            };

            let points = calculate_points(
                &probe_minutiae[probe.endpoint_k.index()],
                &probe_minutiae[probe.endpoint_j.index()],
                &gallery_minutiae[gallery_k.index()],
                &gallery_minutiae[gallery_j.index()],
            );

            pairs.push(Pair {
                delta_theta: normalize_angle(delta_theta),
                probe_k: probe.endpoint_k,
                probe_j: probe.endpoint_j,
                gallery_k,
                gallery_j,
                points,
            });
        }
    }
}

/// 1 point per pair, plus 1 per endpoint whose minutia kind matches; kinds
/// only count when all four are known.
fn calculate_points(
    probe_k: &Minutia,
    probe_j: &Minutia,
    gallery_k: &Minutia,
    gallery_j: &Minutia,
) -> u32 {
    match (probe_k.kind, probe_j.kind, gallery_k.kind, gallery_j.kind) {
        (Some(pk), Some(pj), Some(gk), Some(gj)) => 1 + (pk == gk) as u32 + (pj == gj) as u32,
        _ => 1,
    }
}
