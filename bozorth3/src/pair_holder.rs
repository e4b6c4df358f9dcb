//! Storage for candidate pairs with two sorted views and per-endpoint
//! range indexes for O(1) lookup during cluster growth.

use std::ops::Range;

use crate::consts::{MAX_BOZORTH_MINUTIAE, MAX_NUMBER_OF_PAIRS};
use crate::types::{Endpoint, Pair};

/// Half-open `[start, end)` range packed into two u32 slots; `u32::MAX` in
/// both marks an absent range.
#[derive(Clone, Copy)]
struct PackedRange {
    start: u32,
    end: u32,
}

const MARKER_EMPTY: u32 = u32::MAX;

impl PackedRange {
    const fn empty() -> Self {
        PackedRange {
            start: MARKER_EMPTY,
            end: MARKER_EMPTY,
        }
    }

    #[inline]
    fn get(&self) -> Option<Range<usize>> {
        if self.start == MARKER_EMPTY && self.end == MARKER_EMPTY {
            None
        } else {
            Some(self.start as usize..self.end as usize)
        }
    }
}

/// Candidate pairs in two sorted orders:
///
/// - `forward` holds the pairs sorted by `(probe_k, gallery_k, probe_j)`;
/// - `backward` holds indices into `forward` sorted by
///   `(probe_j, gallery_j, forward index)`.
///
/// `forward_ranges[pk * 200 + gk]` is the `forward` range of all pairs with
/// first endpoint `(pk, gk)`; `backward_ranges` is the analogous index into
/// `backward` keyed by the second endpoint. Both tables are rebuilt by
/// `prepare` and sized once per holder, so a holder is cheap to reuse
/// across match calls.
pub struct PairHolder {
    forward: Vec<Pair>,
    backward: Vec<u32>,
    forward_ranges: Box<[PackedRange]>,
    backward_ranges: Box<[PackedRange]>,
    dirty: bool,
}

impl Default for PairHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl PairHolder {
    pub fn new() -> Self {
        let table_size = MAX_BOZORTH_MINUTIAE * MAX_BOZORTH_MINUTIAE;
        PairHolder {
            forward: Vec::with_capacity(MAX_NUMBER_OF_PAIRS),
            backward: Vec::with_capacity(MAX_NUMBER_OF_PAIRS),
            forward_ranges: vec![PackedRange::empty(); table_size].into_boxed_slice(),
            backward_ranges: vec![PackedRange::empty(); table_size].into_boxed_slice(),
            dirty: false,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    #[inline]
    pub fn pairs(&self) -> &[Pair] {
        &self.forward
    }

    #[inline]
    pub fn get(&self, index: usize) -> &Pair {
        &self.forward[index]
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.backward.clear();
        self.forward_ranges.fill(PackedRange::empty());
        self.backward_ranges.fill(PackedRange::empty());
        self.dirty = false;
    }

    /// Stores another candidate pair. Pairs beyond the scratch capacity are
    /// dropped rather than reported; truncation limits are not errors.
    #[inline]
    pub(crate) fn push(&mut self, pair: Pair) {
        if self.forward.len() == MAX_NUMBER_OF_PAIRS {
            return;
        }
        self.forward.push(pair);
        self.dirty = true;
    }

    /// Runs the two sorts and fills both range tables. Must be called after
    /// the last `push` and before any lookup.
    pub fn prepare(&mut self) {
        if !self.dirty {
            return;
        }

        self.forward
            .sort_by_key(|pair| (pair.probe_k, pair.gallery_k, pair.probe_j));

        self.backward.clear();
        self.backward.extend(0..self.forward.len() as u32);
        {
            let forward = &self.forward;
            self.backward.sort_by_key(|&index| {
                let pair = &forward[index as usize];
                (pair.probe_j, pair.gallery_j)
            });
        }

        fill_range_table(&self.forward, &mut self.forward_ranges, |pair| {
            pair.probe_k.index() * MAX_BOZORTH_MINUTIAE + pair.gallery_k.index()
        });
        {
            let forward = &self.forward;
            fill_range_table(&self.backward, &mut self.backward_ranges, |&index| {
                let pair = &forward[index as usize];
                pair.probe_j.index() * MAX_BOZORTH_MINUTIAE + pair.gallery_j.index()
            });
        }

        self.dirty = false;
    }

    /// Iterates pairs whose first endpoint is `(probe, gallery)` and whose
    /// `forward` index is at least `offset`, yielding
    /// `(index, probe_j, gallery_j)`. Also returns the exclusive upper
    /// bound of the scanned range, which callers reuse as the offset for
    /// follow-up scans.
    #[inline]
    pub fn find_pairs_by_first_endpoint(
        &self,
        offset: usize,
        probe: Endpoint,
        gallery: Endpoint,
    ) -> (
        impl Iterator<Item = (usize, Endpoint, Endpoint)> + '_,
        usize,
    ) {
        debug_assert!(!self.dirty);

        let slot = probe.index() * MAX_BOZORTH_MINUTIAE + gallery.index();
        let range = self.forward_ranges[slot]
            .get()
            .unwrap_or(offset..offset);
        let range = trim_range_start(range, offset);
        let end = range.end;
        let iterator = range
            .clone()
            .zip(self.forward[range].iter())
            .map(|(index, pair)| (index, pair.probe_j, pair.gallery_j));
        (iterator, end)
    }

    /// Iterates pairs whose second endpoint is `(probe, gallery)` and whose
    /// `forward` index is at least `offset`, yielding
    /// `(index, probe_k, gallery_k)`.
    #[inline]
    pub fn find_pairs_by_second_endpoint(
        &self,
        offset: usize,
        probe: Endpoint,
        gallery: Endpoint,
    ) -> impl Iterator<Item = (usize, Endpoint, Endpoint)> + '_ {
        debug_assert!(!self.dirty);

        let slot = probe.index() * MAX_BOZORTH_MINUTIAE + gallery.index();
        let range = self.backward_ranges[slot].get().unwrap_or(0..0);
        self.backward[range]
            .iter()
            .filter(move |&&index| index as usize >= offset)
            .map(move |&index| {
                let pair = &self.forward[index as usize];
                (index as usize, pair.probe_k, pair.gallery_k)
            })
    }
}

fn fill_range_table<T, F>(items: &[T], table: &mut [PackedRange], slot_of: F)
where
    F: Fn(&T) -> usize,
{
    let mut previous: Option<usize> = None;
    let mut range_start = 0;
    for (i, item) in items.iter().enumerate() {
        let current = slot_of(item);
        match previous {
            Some(slot) if slot != current => {
                table[slot] = PackedRange {
                    start: range_start as u32,
                    end: i as u32,
                };
                previous = Some(current);
                range_start = i;
            }
            Some(_) => {}
            None => previous = Some(current),
        }
    }
    if let Some(slot) = previous {
        table[slot] = PackedRange {
            start: range_start as u32,
            end: items.len() as u32,
        };
    }
}

#[inline]
fn trim_range_start(range: Range<usize>, offset: usize) -> Range<usize> {
    if offset >= range.start && offset < range.end {
        offset..range.end
    } else if offset >= range.end {
        range.end..range.end
    } else {
        range
    }
}
