//! Cluster growth and scoring: the heart of the matcher.
//!
//! Starting from each not-yet-clustered pair, growth explores pairs that
//! share endpoints under an injective probe <-> gallery endpoint
//! association. Ambiguous endpoints are parked in backtracking groups and
//! every conflict-free combination of their alternatives is tried before
//! the seed is abandoned. Surviving clusters are then merged and combined
//! into the final score.

use log::trace;

use crate::associations::EndpointAssociator;
use crate::clusters::{
    calculate_averages, combine_clusters, encode_endpoints, merge_compatible_clusters, Cluster,
    ClusterAssigner, Clusters,
};
use crate::consts::{
    MAX_NUMBER_OF_CLUSTERS, MAX_NUMBER_OF_GROUPS, MIN_COMPUTABLE_MINUTIAE,
    MIN_NUMBER_OF_PAIRS_TO_CLUSTER, SCORE_THRESHOLD,
};
use crate::groups::{advance_ambiguous_endpoints, merge_into_group, EndpointGroup, EndpointType};
use crate::match_edges::match_edges_into_pairs;
use crate::math::{are_angles_equal_with_tolerance, AngleAverager};
use crate::pair_holder::PairHolder;
use crate::template::Template;
use crate::types::{Endpoint, Format, Minutia};

/// Per-match scratch state. Allocate once per worker and reuse; `clear`
/// runs at the start of every match.
pub struct BozorthState {
    pub(crate) clusters: Clusters,
    associator: EndpointAssociator,
    assigner: ClusterAssigner,
    groups: Vec<EndpointGroup>,
    selected_pairs: Vec<u32>,
}

impl Default for BozorthState {
    fn default() -> Self {
        Self::new()
    }
}

impl BozorthState {
    pub fn new() -> Self {
        BozorthState {
            clusters: Clusters::new(),
            associator: EndpointAssociator::new(),
            assigner: ClusterAssigner::new(),
            groups: Vec::new(),
            selected_pairs: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.clusters.clear();
        self.associator.clear();
        self.assigner.clear();
        self.groups.clear();
        self.selected_pairs.clear();
    }
}

/// Tries to pull the pair at `pair_index` into the cluster under
/// construction, given the endpoints it would associate.
///
/// Three cases: both endpoints free (associate them, select the pair),
/// already mutually associated (select the pair if new), or conflicting
/// (park the alternatives in a backtracking group).
fn assign_cluster_to_endpoints(
    cluster: u32,
    pair_index: u32,
    probe_endpoint: Endpoint,
    gallery_endpoint: Endpoint,
    state: &mut BozorthState,
    visited: &mut Vec<(Endpoint, Endpoint)>,
) {
    let associated_gallery = state.associator.gallery_for(probe_endpoint);
    let associated_probe = state.associator.probe_for(gallery_endpoint);

    if associated_gallery.is_none() && associated_probe.is_none() {
        if !state.assigner.has_cluster(pair_index, cluster) {
            state.selected_pairs.push(pair_index);
            state.assigner.assign(pair_index, cluster);
        }
        visited.push((probe_endpoint, gallery_endpoint));
        state.associator.associate(probe_endpoint, gallery_endpoint);
        return;
    }

    if associated_gallery == Some(gallery_endpoint) {
        if state.assigner.has_cluster(pair_index, cluster) {
            return;
        }
        state.selected_pairs.push(pair_index);
        state.assigner.assign(pair_index, cluster);
        // the membership probe compares against the pair index, not the
        // endpoint; changing this changes scores
        if visited
            .iter()
            .all(|&(endpoint, _)| endpoint.index() != pair_index as usize)
        {
            visited.push((probe_endpoint, gallery_endpoint));
        }
        return;
    }

    if state.groups.len() >= MAX_NUMBER_OF_GROUPS {
        return;
    }

    if let Some(existing) = associated_gallery {
        merge_into_group(
            &mut state.groups,
            EndpointType::Probe,
            probe_endpoint,
            existing,
            gallery_endpoint,
        );
    }
    if let Some(existing) = associated_probe {
        merge_into_group(
            &mut state.groups,
            EndpointType::Gallery,
            gallery_endpoint,
            existing,
            probe_endpoint,
        );
    }
}

/// Grows a candidate pair set from the seed by walking the pair holder.
///
/// First every pair sharing the seed's left endpoint is considered; the
/// endpoints newly associated along the way are then expanded in turn,
/// scanning pairs by second and by first endpoint from the index just past
/// the seed's own range. All associations made here are undone at the end;
/// only the seed association survives for the outer loop's bookkeeping.
fn find_pairs(pairs: &PairHolder, start_pair: u32, cluster_index: u32, state: &mut BozorthState) {
    let mut visited: Vec<(Endpoint, Endpoint)> = Vec::new();
    let start = *pairs.get(start_pair as usize);

    let (found, next_not_connected) =
        pairs.find_pairs_by_first_endpoint(start_pair as usize, start.probe_k, start.gallery_k);
    for (index, probe_j, gallery_j) in found {
        assign_cluster_to_endpoints(
            cluster_index,
            index as u32,
            probe_j,
            gallery_j,
            state,
            &mut visited,
        );
    }

    let mut cursor = 0;
    while cursor < visited.len() {
        let (probe_endpoint, gallery_endpoint) = visited[cursor];
        cursor += 1;

        let found =
            pairs.find_pairs_by_second_endpoint(next_not_connected, probe_endpoint, gallery_endpoint);
        for (index, probe_k, gallery_k) in found {
            // pairs that would close a cycle through the seed's endpoints
            // are skipped
            if probe_k != start.probe_k && gallery_k != start.gallery_k {
                assign_cluster_to_endpoints(
                    cluster_index,
                    index as u32,
                    probe_k,
                    gallery_k,
                    state,
                    &mut visited,
                );
            }
        }

        let (found, _) =
            pairs.find_pairs_by_first_endpoint(next_not_connected, probe_endpoint, gallery_endpoint);
        for (index, probe_j, gallery_j) in found {
            assign_cluster_to_endpoints(
                cluster_index,
                index as u32,
                probe_j,
                gallery_j,
                state,
                &mut visited,
            );
        }
    }

    for &(probe_endpoint, _) in &visited {
        state.associator.clear_by_probe(probe_endpoint);
    }
}

fn average_delta_theta(selected_pairs: &[u32], pairs: &PairHolder) -> i32 {
    let mut averager = AngleAverager::new();
    for &pair_index in selected_pairs {
        averager.push(pairs.get(pair_index as usize).delta_theta);
    }
    averager.average()
}

/// Drops selected pairs whose rotation estimate strays from the average.
fn filter_selected(selected_pairs: &mut Vec<u32>, pairs: &PairHolder) {
    let average = average_delta_theta(selected_pairs, pairs);
    selected_pairs.retain(|&pair_index| {
        are_angles_equal_with_tolerance(pairs.get(pair_index as usize).delta_theta, average)
    });
}

/// Computes the similarity score for a prepared pair holder.
///
/// Every pair except the last seeds one growth attempt, plus one attempt
/// per surviving combination of ambiguous-endpoint alternatives. Skipping
/// the last pair mirrors the reference loop bound and is part of the
/// scoring contract.
pub fn match_score(
    pairs: &PairHolder,
    probe_minutiae: &[Minutia],
    gallery_minutiae: &[Minutia],
    format: Format,
    state: &mut BozorthState,
) -> u32 {
    if pairs.is_empty() {
        return 0;
    }
    state.clear();

    for pair_index in 0..pairs.len() - 1 {
        if state.assigner.get_cluster(pair_index as u32).is_some() {
            continue;
        }

        let seed = *pairs.get(pair_index);
        state.associator.associate(seed.probe_k, seed.gallery_k);
        state.groups.clear();

        loop {
            let groups_before = state.groups.len();
            let cluster_index = state.clusters.len() as u32;

            state.selected_pairs.clear();
            find_pairs(pairs, pair_index as u32, cluster_index, state);

            if state.selected_pairs.len() >= MIN_NUMBER_OF_PAIRS_TO_CLUSTER {
                filter_selected(&mut state.selected_pairs, pairs);
            }

            if state.selected_pairs.len() < MIN_NUMBER_OF_PAIRS_TO_CLUSTER {
                for &pair in &state.selected_pairs {
                    state.assigner.restore(pair);
                }
            } else {
                let points = state
                    .selected_pairs
                    .iter()
                    .map(|&pair| pairs.get(pair as usize).points)
                    .sum();
                state.clusters.push(
                    Cluster {
                        points,
                        points_from_compatible: points,
                        compatible: Vec::new(),
                    },
                    calculate_averages(
                        probe_minutiae,
                        gallery_minutiae,
                        pairs.pairs(),
                        &state.selected_pairs,
                    ),
                    encode_endpoints(pairs.pairs(), &state.selected_pairs),
                );
            }

            if state.clusters.len() > MAX_NUMBER_OF_CLUSTERS - 1 {
                break;
            }

            // only the groups that existed before this attempt have made
            // associations to roll back
            for group in &state.groups[..groups_before] {
                group.rollback_association(&mut state.associator);
            }

            if !advance_ambiguous_endpoints(&mut state.groups, &mut state.associator) {
                break;
            }
        }

        if state.clusters.len() > MAX_NUMBER_OF_CLUSTERS - 1 {
            break;
        }
        state.associator.clear_by_probe(seed.probe_k);
    }

    merge_compatible_clusters(&mut state.clusters, format);

    let best = state
        .clusters
        .clusters
        .iter()
        .map(|cluster| cluster.points_from_compatible)
        .max()
        .unwrap_or(0);

    trace!(
        "{} pairs grew {} clusters, best accumulation {}",
        pairs.len(),
        state.clusters.len(),
        best
    );

    if best < SCORE_THRESHOLD {
        return best;
    }
    combine_clusters(&state.clusters.clusters)
}

/// Full pipeline for two prepared templates: edge join, pair indexing and
/// scoring, reusing the caller's scratch.
///
/// Short templates (fewer than 10 minutiae on either side) and template
/// combinations with no compatible edges score 0 without running the
/// pipeline.
pub fn match_templates(
    probe: &Template,
    gallery: &Template,
    format: Format,
    pairs: &mut PairHolder,
    state: &mut BozorthState,
) -> u32 {
    if probe.minutiae().len() < MIN_COMPUTABLE_MINUTIAE
        || gallery.minutiae().len() < MIN_COMPUTABLE_MINUTIAE
    {
        return 0;
    }

    pairs.clear();
    match_edges_into_pairs(
        probe.edges(),
        probe.minutiae(),
        gallery.edges(),
        gallery.minutiae(),
        pairs,
    );
    if pairs.is_empty() {
        return 0;
    }
    pairs.prepare();

    match_score(pairs, probe.minutiae(), gallery.minutiae(), format, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::RawMinutia;

    fn grid_template() -> Template {
        let mut raw = Vec::new();
        for row in 0..6i32 {
            for col in 0..8i32 {
                raw.push(RawMinutia {
                    x: 40 + col * 40,
                    y: 40 + row * 40,
                    t: (col * 37 + row * 23) % 140 - 60,
                    q: row * 8 + col + 1,
                    kind: None,
                });
            }
        }
        Template::from_raw(raw, 200, Format::NistInternal)
    }

    #[test]
    fn self_match_clusters_hold_their_invariants() {
        let template = grid_template();
        let mut pairs = PairHolder::new();
        let mut state = BozorthState::new();
        let score = match_templates(
            &template,
            &template,
            Format::NistInternal,
            &mut pairs,
            &mut state,
        );
        assert!(score > 0);
        assert!(!state.clusters.is_empty());

        for (index, cluster) in state.clusters.clusters.iter().enumerate() {
            // kinds are unknown here, so points count the member pairs and
            // the cluster size threshold shows through them
            assert!(cluster.points >= MIN_NUMBER_OF_PAIRS_TO_CLUSTER as u32);
            assert!(cluster.points_from_compatible >= cluster.points);

            for &other in &cluster.compatible {
                assert!(other as usize > index);
                let first = &state.clusters.endpoints[index];
                let second = &state.clusters.endpoints[other as usize];
                assert!(first.probe.is_disjoint(&second.probe));
                assert!(first.gallery.is_disjoint(&second.gallery));
            }
        }
    }

    #[test]
    fn empty_template_scores_zero() {
        let template = grid_template();
        let empty = Template::from_raw(Vec::new(), 200, Format::NistInternal);
        let mut pairs = PairHolder::new();
        let mut state = BozorthState::new();
        assert_eq!(
            match_templates(&template, &empty, Format::NistInternal, &mut pairs, &mut state),
            0
        );
    }
}
