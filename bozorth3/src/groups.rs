//! Backtracking frames for ambiguous endpoints.
//!
//! When cluster growth runs into an endpoint that is already associated to
//! a different partner, the alternatives are recorded in an
//! [`EndpointGroup`]. After each growth attempt the group stack is advanced
//! to the next combination of alternatives that associates without
//! conflict, which restarts growth from the same seed.

use crate::associations::EndpointAssociator;
use crate::types::Endpoint;

/// Which fingerprint the group's fixed endpoint belongs to.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub(crate) enum EndpointType {
    Probe,
    Gallery,
}

/// One endpoint with several candidate partners on the other fingerprint.
pub(crate) struct EndpointGroup {
    /// The fixed endpoint.
    endpoint: Endpoint,
    /// Fingerprint the fixed endpoint belongs to; `endpoints` are from the
    /// other one.
    endpoint_type: EndpointType,
    /// Candidate partners, in discovery order.
    endpoints: Vec<Endpoint>,
    /// Currently selected candidate.
    endpoint_index: usize,
    /// Probe endpoint whose association must be undone when this group's
    /// selection is rolled back.
    to_clear: Option<Endpoint>,
}

impl EndpointGroup {
    /// The `(probe, gallery)` combination the group currently selects.
    fn current_selection(&self) -> (Endpoint, Endpoint) {
        match self.endpoint_type {
            EndpointType::Probe => (self.endpoint, self.endpoints[self.endpoint_index]),
            EndpointType::Gallery => (self.endpoints[self.endpoint_index], self.endpoint),
        }
    }

    pub(crate) fn rollback_association(&self, associator: &mut EndpointAssociator) {
        if let Some(probe) = self.to_clear {
            associator.clear_by_probe(probe);
        }
    }
}

/// Records `new_endpoint` as another alternative for `endpoint`. Appends to
/// the existing group for that endpoint if one exists, otherwise opens a
/// new group seeded with the previously associated partner.
pub(crate) fn merge_into_group(
    groups: &mut Vec<EndpointGroup>,
    endpoint_type: EndpointType,
    endpoint: Endpoint,
    existing_endpoint: Endpoint,
    new_endpoint: Endpoint,
) {
    debug_assert_ne!(existing_endpoint, new_endpoint);

    let existing_group = groups
        .iter_mut()
        .find(|group| group.endpoint_type == endpoint_type && group.endpoint == endpoint);

    match existing_group {
        Some(group) => {
            if !group.endpoints.contains(&new_endpoint) {
                group.endpoints.push(new_endpoint);
            }
        }
        None => groups.push(EndpointGroup {
            endpoint,
            endpoint_type,
            endpoints: vec![existing_endpoint, new_endpoint],
            endpoint_index: 0,
            to_clear: None,
        }),
    }
}

/// Associates every group's current selection, back to front. On the first
/// conflict all selections made by this call are rolled back and `false` is
/// returned.
fn associate_all_groups(
    groups: &mut [EndpointGroup],
    associator: &mut EndpointAssociator,
) -> bool {
    for index in (0..groups.len()).rev() {
        let (probe, gallery) = groups[index].current_selection();

        if associator.are_clear_or_mutually_associated(probe, gallery) {
            associator.associate(probe, gallery);
            groups[index].to_clear = Some(probe);
        } else {
            for later in groups[index + 1..].iter_mut() {
                if let Some(old_probe) = later.to_clear.take() {
                    associator.clear_by_probe(old_probe);
                }
            }
            return false;
        }
    }
    true
}

/// Advances the group stack to the next conflict-free combination of
/// alternatives and associates it. Scanning runs from the last group
/// backwards; an exhausted group resets its index and yields to the group
/// before it. Returns `false` once every combination has been tried.
///
/// The scan order is part of the scoring contract: reordering it changes
/// which clusters get built.
pub(crate) fn advance_ambiguous_endpoints(
    groups: &mut Vec<EndpointGroup>,
    associator: &mut EndpointAssociator,
) -> bool {
    let mut position = groups.len() as isize - 1;
    while position >= 0 {
        let group = &mut groups[position as usize];
        if group.endpoint_index + 1 < group.endpoints.len() {
            group.endpoint_index += 1;
            if associate_all_groups(groups, associator) {
                return true;
            }
            position = groups.len() as isize - 1;
        } else {
            group.endpoint_index = 0;
            position -= 1;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merging_extends_an_existing_group() {
        let mut groups = Vec::new();
        merge_into_group(
            &mut groups,
            EndpointType::Probe,
            Endpoint(1),
            Endpoint(10),
            Endpoint(11),
        );
        merge_into_group(
            &mut groups,
            EndpointType::Probe,
            Endpoint(1),
            Endpoint(10),
            Endpoint(12),
        );
        // same endpoint on the other fingerprint opens a separate group
        merge_into_group(
            &mut groups,
            EndpointType::Gallery,
            Endpoint(1),
            Endpoint(20),
            Endpoint(21),
        );

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].endpoints, vec![Endpoint(10), Endpoint(11), Endpoint(12)]);
        assert_eq!(groups[1].endpoints, vec![Endpoint(20), Endpoint(21)]);
    }

    #[test]
    fn duplicate_alternatives_are_not_recorded() {
        let mut groups = Vec::new();
        merge_into_group(
            &mut groups,
            EndpointType::Probe,
            Endpoint(1),
            Endpoint(10),
            Endpoint(11),
        );
        merge_into_group(
            &mut groups,
            EndpointType::Probe,
            Endpoint(1),
            Endpoint(10),
            Endpoint(11),
        );
        assert_eq!(groups[0].endpoints, vec![Endpoint(10), Endpoint(11)]);
    }

    #[test]
    fn advancing_walks_every_combination() {
        let mut associator = EndpointAssociator::new();
        let mut groups = Vec::new();
        // probe 1 can pair with gallery 10 or 11; probe 2 with 20 or 21
        merge_into_group(
            &mut groups,
            EndpointType::Probe,
            Endpoint(1),
            Endpoint(10),
            Endpoint(11),
        );
        merge_into_group(
            &mut groups,
            EndpointType::Probe,
            Endpoint(2),
            Endpoint(20),
            Endpoint(21),
        );

        let mut selections = Vec::new();
        while advance_ambiguous_endpoints(&mut groups, &mut associator) {
            selections.push((
                associator.gallery_for(Endpoint(1)).unwrap(),
                associator.gallery_for(Endpoint(2)).unwrap(),
            ));
            for group in groups.iter() {
                group.rollback_association(&mut associator);
            }
        }

        // the last group spins fastest
        assert_eq!(
            selections,
            vec![
                (Endpoint(10), Endpoint(21)),
                (Endpoint(11), Endpoint(20)),
                (Endpoint(11), Endpoint(21)),
            ]
        );
    }

    #[test]
    fn conflicting_combinations_are_skipped() {
        let mut associator = EndpointAssociator::new();
        let mut groups = Vec::new();
        // both probes compete for gallery 10
        merge_into_group(
            &mut groups,
            EndpointType::Probe,
            Endpoint(1),
            Endpoint(10),
            Endpoint(11),
        );
        merge_into_group(
            &mut groups,
            EndpointType::Probe,
            Endpoint(2),
            Endpoint(10),
            Endpoint(11),
        );

        let mut selections = Vec::new();
        while advance_ambiguous_endpoints(&mut groups, &mut associator) {
            selections.push((
                associator.gallery_for(Endpoint(1)).unwrap(),
                associator.gallery_for(Endpoint(2)).unwrap(),
            ));
            for group in groups.iter() {
                group.rollback_association(&mut associator);
            }
        }

        // only the disjoint assignments survive
        assert_eq!(
            selections,
            vec![
                (Endpoint(10), Endpoint(11)),
                (Endpoint(11), Endpoint(10)),
            ]
        );
    }
}
