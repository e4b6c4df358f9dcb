//! Cluster bookkeeping: pair-to-cluster assignment, per-cluster summary
//! data, pairwise compatibility and the final clique search.

use fixedbitset::FixedBitSet;

use crate::consts::{FACTOR, MAX_BOZORTH_MINUTIAE, MAX_NUMBER_OF_PAIRS};
use crate::math::{
    are_angles_equal_with_tolerance, average_angles, calculate_slope_in_degrees, normalize_angle,
    AngleAverager,
};
use crate::types::{Format, Minutia, Pair};

/// Marks a pair that was once pulled into a cluster attempt and then
/// dropped again. The slot is deliberately nonzero, so the pair still
/// reports a (nonexistent) cluster and is never used as a seed again.
const MARKER_RESTORED: u32 = u32::MAX;

/// Maps pair index -> cluster index, 1-based with 0 meaning unassigned.
pub(crate) struct ClusterAssigner {
    cluster_by_pair: Box<[u32]>,
}

impl ClusterAssigner {
    pub(crate) fn new() -> Self {
        ClusterAssigner {
            cluster_by_pair: vec![0; MAX_NUMBER_OF_PAIRS].into_boxed_slice(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.cluster_by_pair.fill(0);
    }

    #[inline]
    pub(crate) fn get_cluster(&self, pair_index: u32) -> Option<u32> {
        match self.cluster_by_pair[pair_index as usize] {
            0 => None,
            value => Some(value - 1),
        }
    }

    #[inline]
    pub(crate) fn has_cluster(&self, pair_index: u32, cluster: u32) -> bool {
        self.cluster_by_pair[pair_index as usize] == cluster + 1
    }

    #[inline]
    pub(crate) fn assign(&mut self, pair_index: u32, cluster: u32) {
        self.cluster_by_pair[pair_index as usize] = cluster + 1;
    }

    #[inline]
    pub(crate) fn restore(&mut self, pair_index: u32) {
        self.cluster_by_pair[pair_index as usize] = MARKER_RESTORED;
    }
}

/// Mean rotation and centroid summary of a cluster's pairs.
pub(crate) struct ClusterAverages {
    pub(crate) delta_theta: i32,
    pub(crate) probe_x: i32,
    pub(crate) probe_y: i32,
    pub(crate) gallery_x: i32,
    pub(crate) gallery_y: i32,
}

/// Bitsets of the minutia indices a cluster touches, for cheap
/// disjointness checks between clusters.
pub(crate) struct ClusterEndpoints {
    pub(crate) probe: FixedBitSet,
    pub(crate) gallery: FixedBitSet,
}

pub(crate) struct Cluster {
    /// Sum of the member pairs' points.
    pub(crate) points: u32,
    /// `points` plus the points of every compatible cluster. Used as an
    /// upper bound to prune the clique search.
    pub(crate) points_from_compatible: u32,
    /// Indices of later clusters compatible with this one, ascending.
    pub(crate) compatible: Vec<u32>,
}

/// Column-wise cluster storage; the three vectors run in parallel.
pub struct Clusters {
    pub(crate) clusters: Vec<Cluster>,
    pub(crate) averages: Vec<ClusterAverages>,
    pub(crate) endpoints: Vec<ClusterEndpoints>,
}

impl Clusters {
    pub(crate) fn new() -> Self {
        Clusters {
            clusters: Vec::new(),
            averages: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn push(
        &mut self,
        cluster: Cluster,
        averages: ClusterAverages,
        endpoints: ClusterEndpoints,
    ) {
        self.clusters.push(cluster);
        self.averages.push(averages);
        self.endpoints.push(endpoints);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.clusters.clear();
        self.averages.clear();
        self.endpoints.clear();
    }
}

/// Summarizes the selected pairs: fixed-precision mean of `delta_theta`
/// plus integer-mean centroids of the K endpoints on both fingerprints.
pub(crate) fn calculate_averages(
    probe_minutiae: &[Minutia],
    gallery_minutiae: &[Minutia],
    pairs: &[Pair],
    selected_pairs: &[u32],
) -> ClusterAverages {
    let mut averages = ClusterAverages {
        delta_theta: 0,
        probe_x: 0,
        probe_y: 0,
        gallery_x: 0,
        gallery_y: 0,
    };
    let mut averager = AngleAverager::new();

    for &pair_index in selected_pairs {
        let pair = &pairs[pair_index as usize];
        averager.push(pair.delta_theta);

        let probe = &probe_minutiae[pair.probe_k.index()];
        averages.probe_x += probe.x;
        averages.probe_y += probe.y;

        let gallery = &gallery_minutiae[pair.gallery_k.index()];
        averages.gallery_x += gallery.x;
        averages.gallery_y += gallery.y;
    }

    let count = selected_pairs.len() as i32;
    averages.delta_theta = averager.average();
    averages.probe_x /= count;
    averages.probe_y /= count;
    averages.gallery_x /= count;
    averages.gallery_y /= count;
    averages
}

/// Collects the minutia indices touched by the selected pairs, both K and J
/// endpoints, on both fingerprints.
pub(crate) fn encode_endpoints(pairs: &[Pair], selected_pairs: &[u32]) -> ClusterEndpoints {
    let mut probe = FixedBitSet::with_capacity(MAX_BOZORTH_MINUTIAE);
    let mut gallery = FixedBitSet::with_capacity(MAX_BOZORTH_MINUTIAE);
    for &pair_index in selected_pairs {
        let pair = &pairs[pair_index as usize];
        probe.insert(pair.probe_k.index());
        probe.insert(pair.probe_j.index());
        gallery.insert(pair.gallery_k.index());
        gallery.insert(pair.gallery_j.index());
    }
    ClusterEndpoints { probe, gallery }
}

fn have_common_endpoints(first: &ClusterEndpoints, second: &ClusterEndpoints) -> bool {
    !first.probe.is_disjoint(&second.probe) || !first.gallery.is_disjoint(&second.gallery)
}

/// Two clusters are compatible when their rotations agree, their centroid
/// offsets have near-equal length on both fingerprints, and the direction
/// of those offsets agrees with the rotation.
fn are_clusters_compatible(
    averages1: &ClusterAverages,
    averages2: &ClusterAverages,
    format: Format,
) -> bool {
    if !are_angles_equal_with_tolerance(averages2.delta_theta, averages1.delta_theta) {
        return false;
    }

    let probe_dx = averages2.probe_x - averages1.probe_x;
    let probe_dy = averages2.probe_y - averages1.probe_y;
    let gallery_dx = averages2.gallery_x - averages1.gallery_x;
    let gallery_dy = averages2.gallery_y - averages1.gallery_y;

    let probe_distance_squared = (probe_dx * probe_dx + probe_dy * probe_dy) as f32;
    let gallery_distance_squared = (gallery_dx * gallery_dx + gallery_dy * gallery_dy) as f32;

    let tolerance = 2.0 * FACTOR * (probe_distance_squared + gallery_distance_squared);
    if (probe_distance_squared - gallery_distance_squared).abs() > tolerance {
        return false;
    }

    let average = average_angles(averages1.delta_theta, averages2.delta_theta);
    let difference = match format {
        Format::NistInternal => {
            calculate_slope_in_degrees(probe_dx, probe_dy)
                - calculate_slope_in_degrees(gallery_dx, gallery_dy)
        }
        Format::Ansi => {
            calculate_slope_in_degrees(probe_dx, -probe_dy)
                - calculate_slope_in_degrees(gallery_dx, -gallery_dy)
        }
    };

    are_angles_equal_with_tolerance(average, normalize_angle(difference))
}

/// For every cluster, finds the later clusters it is compatible and
/// endpoint-disjoint with, and accumulates their points into
/// `points_from_compatible`.
pub(crate) fn merge_compatible_clusters(clusters: &mut Clusters, format: Format) {
    for cluster in 0..clusters.len() {
        let mut points_from_others = 0;
        let mut compatible = Vec::new();

        for other in cluster + 1..clusters.len() {
            if have_common_endpoints(&clusters.endpoints[cluster], &clusters.endpoints[other]) {
                continue;
            }
            if !are_clusters_compatible(
                &clusters.averages[cluster],
                &clusters.averages[other],
                format,
            ) {
                continue;
            }

            points_from_others += clusters.clusters[other].points;
            compatible.push(other as u32);
        }

        clusters.clusters[cluster].points_from_compatible =
            clusters.clusters[cluster].points + points_from_others;
        clusters.clusters[cluster].compatible = compatible;
    }
}

/// Intersection of two ascending index lists.
fn intersection_of_sorted(first: &[u32], second: &[u32]) -> Vec<u32> {
    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < first.len() && j < second.len() {
        match first[i].cmp(&second[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                result.push(first[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result
}

/// Maximum-weight clique over the compatibility graph, by bounded DFS.
///
/// Each stack frame narrows the set of clusters still connected to the
/// whole path; an empty set means the path is a maximal clique and gets
/// scored. Start clusters whose `points_from_compatible` cannot beat the
/// best score so far are skipped, which keeps the search tractable on
/// large templates.
pub(crate) fn combine_clusters(clusters: &[Cluster]) -> u32 {
    struct Frame {
        cluster: u32,
        index: usize,
        connected: Vec<u32>,
    }

    let mut frames: Vec<Frame> = Vec::new();
    let mut best_score = 0;

    for (cluster_index, cluster) in clusters.iter().enumerate() {
        if best_score >= cluster.points_from_compatible {
            continue;
        }

        frames.push(Frame {
            cluster: cluster_index as u32,
            index: 0,
            connected: cluster.compatible.clone(),
        });

        while let Some(last) = frames.last() {
            if last.index < last.connected.len() {
                let next_cluster = last.connected[last.index];
                let connected = intersection_of_sorted(
                    &last.connected,
                    &clusters[next_cluster as usize].compatible,
                );
                frames.push(Frame {
                    cluster: next_cluster,
                    index: 0,
                    connected,
                });
            } else {
                if last.connected.is_empty() {
                    let score = frames
                        .iter()
                        .map(|frame| clusters[frame.cluster as usize].points)
                        .sum();
                    if score > best_score {
                        best_score = score;
                    }
                }

                frames.pop();
                if let Some(previous) = frames.last_mut() {
                    previous.index += 1;
                }
            }
        }
    }

    best_score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigner_encoding_and_restore_sentinel() {
        let mut assigner = ClusterAssigner::new();
        assert_eq!(assigner.get_cluster(5), None);

        assigner.assign(5, 0);
        assert_eq!(assigner.get_cluster(5), Some(0));
        assert!(assigner.has_cluster(5, 0));
        assert!(!assigner.has_cluster(5, 1));

        // a restored pair no longer claims any real cluster, but still
        // reads as assigned so it cannot seed a new cluster
        assigner.restore(5);
        assert!(assigner.get_cluster(5).is_some());
        assert!(!assigner.has_cluster(5, 0));

        assigner.clear();
        assert_eq!(assigner.get_cluster(5), None);
    }

    #[test]
    fn sorted_intersection() {
        assert_eq!(intersection_of_sorted(&[1, 3, 5, 7], &[2, 3, 4, 7]), vec![3, 7]);
        assert_eq!(intersection_of_sorted(&[], &[1, 2]), Vec::<u32>::new());
        assert_eq!(intersection_of_sorted(&[1, 2], &[3, 4]), Vec::<u32>::new());
    }

    fn cluster(points: u32, compatible: Vec<u32>) -> Cluster {
        Cluster {
            points,
            points_from_compatible: 0,
            compatible,
        }
    }

    #[test]
    fn clique_search_picks_the_heaviest_clique() {
        // 0 is compatible with 1, 2 and 3; only {1, 2} are compatible with
        // each other, so the best clique is {0, 1, 2} even though 3 alone
        // is heavier than either
        let mut clusters = vec![
            cluster(4, vec![1, 2, 3]),
            cluster(5, vec![2]),
            cluster(5, vec![]),
            cluster(8, vec![]),
        ];
        let totals = [22, 10, 5, 8];
        for (cluster, total) in clusters.iter_mut().zip(totals) {
            cluster.points_from_compatible = total;
        }

        assert_eq!(combine_clusters(&clusters), 14);
    }

    #[test]
    fn clique_search_of_isolated_clusters() {
        let mut clusters = vec![cluster(6, vec![]), cluster(9, vec![])];
        clusters[0].points_from_compatible = 6;
        clusters[1].points_from_compatible = 9;
        assert_eq!(combine_clusters(&clusters), 9);
    }

    #[test]
    fn disjointness_check_sees_both_sides() {
        let make = |probe_bits: &[usize], gallery_bits: &[usize]| {
            let mut probe = FixedBitSet::with_capacity(MAX_BOZORTH_MINUTIAE);
            let mut gallery = FixedBitSet::with_capacity(MAX_BOZORTH_MINUTIAE);
            for &bit in probe_bits {
                probe.insert(bit);
            }
            for &bit in gallery_bits {
                gallery.insert(bit);
            }
            ClusterEndpoints { probe, gallery }
        };

        let a = make(&[1, 2], &[10, 11]);
        assert!(have_common_endpoints(&a, &make(&[2, 3], &[12, 13])));
        assert!(have_common_endpoints(&a, &make(&[3, 4], &[11, 12])));
        assert!(!have_common_endpoints(&a, &make(&[3, 4], &[12, 13])));
    }
}
