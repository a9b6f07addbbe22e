//! Flat address-to-row index built once per session
//!
//! The index holds one slot per address in `[global_low, global_high)`.
//! Building it decodes every unit's line table once; afterwards a lookup is
//! a single array access.
//!
//! Units claim addresses in discovery order: an address covered by an
//! earlier unit's declared range is never filled from a later unit, which
//! mirrors per-query resolution stopping at the first containing unit.

use log::{debug, info};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::time::Instant;

use super::line_table::LineTable;
use super::ranges::{global_bounds, UnitSpan};
use crate::domain::{AddressRange, IndexError, LineRecord};
use crate::session::DebugInfo;

/// Precomputed address-to-row table
pub struct BatchIndex {
    span: AddressRange,
    /// Row index + 1 into `records`, `None` for unattributed addresses
    slots: Vec<Option<NonZeroU32>>,
    /// Rows of every decoded unit, concatenated
    records: Vec<LineRecord>,
    /// Number of units whose tables are retained
    unit_count: usize,
}

impl BatchIndex {
    /// Build the index over every unit of `info`
    ///
    /// `max_span` caps the number of addresses the index may cover.
    ///
    /// # Errors
    /// Returns a soft error when no unit declares an address range, the span
    /// exceeds `max_span` or the slot array cannot be allocated; returns
    /// [`IndexError::Session`] if a line table is malformed
    pub fn build<D: DebugInfo + ?Sized>(info: &D, max_span: u64) -> Result<Self, IndexError> {
        let started = Instant::now();
        let units = info.units();

        let span = global_bounds(units).ok_or(IndexError::NoAddressBounds)?;
        if span.len() > max_span {
            return Err(IndexError::SpanTooLarge { span: span.len(), limit: max_span });
        }
        info!("Building batch index over {span} ({} addresses)", span.len());

        let mut slots = allocate_slots(span)?;
        let mut records = Vec::new();
        let mut claimed = ClaimedSpans::default();

        for unit in units {
            let mut pieces: Vec<AddressRange> = UnitSpan::of(unit)
                .pieces()
                .flat_map(|piece| claimed.claim(piece))
                .collect();
            if pieces.is_empty() {
                continue;
            }
            pieces.sort_by_key(|piece| piece.start);

            let table = LineTable::decode(info, unit)?;
            let base = records.len();
            if base + table.records().len() >= u32::MAX as usize {
                return Err(IndexError::TooManyRecords(base + table.records().len()));
            }

            table.for_each_interval(|range, row| {
                let id = NonZeroU32::new(u32::try_from(base + row + 1).unwrap_or(u32::MAX));
                for piece in overlapping(&pieces, range) {
                    for address in piece.start..piece.end {
                        let slot = &mut slots[slot_index(span, address)];
                        if slot.is_none() {
                            *slot = id;
                        }
                    }
                }
            });
            records.extend(table.into_records());
        }

        let unit_count = units.len();
        debug!(
            "Batch index built in {:?}: {} rows from {unit_count} units",
            started.elapsed(),
            records.len()
        );
        Ok(Self { span, slots, records, unit_count })
    }

    /// Row describing `address`, if any
    #[must_use]
    pub fn lookup(&self, address: u64) -> Option<&LineRecord> {
        if !self.span.contains(address) {
            return None;
        }
        let id = self.slots[slot_index(self.span, address)]?;
        self.records.get(id.get() as usize - 1)
    }

    /// Addresses covered by the index
    #[must_use]
    pub fn span(&self) -> AddressRange {
        self.span
    }

    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.unit_count
    }
}

impl Drop for BatchIndex {
    fn drop(&mut self) {
        debug!(
            "Releasing batch index: {} slots, {} rows from {} units",
            self.slots.len(),
            self.records.len(),
            self.unit_count
        );
    }
}

fn allocate_slots(span: AddressRange) -> Result<Vec<Option<NonZeroU32>>, IndexError> {
    let len = usize::try_from(span.len()).map_err(|_| IndexError::Allocation { span: span.len() })?;
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(len)
        .map_err(|_| IndexError::Allocation { span: span.len() })?;
    slots.resize(len, None);
    Ok(slots)
}

// Callers only pass addresses inside `span`, whose length fits in usize
#[allow(clippy::cast_possible_truncation)]
fn slot_index(span: AddressRange, address: u64) -> usize {
    (address - span.start) as usize
}

/// Parts of `range` covered by `pieces` (sorted by start, disjoint)
fn overlapping(
    pieces: &[AddressRange],
    range: AddressRange,
) -> impl Iterator<Item = AddressRange> + '_ {
    let first = pieces.partition_point(|piece| piece.end <= range.start);
    pieces[first..]
        .iter()
        .take_while(move |piece| piece.start < range.end)
        .filter_map(move |piece| piece.intersect(&range))
}

/// Disjoint set of address ranges already owned by some unit
#[derive(Default)]
struct ClaimedSpans {
    /// start -> end
    spans: BTreeMap<u64, u64>,
}

impl ClaimedSpans {
    /// Claim `range`, returning the parts that were not yet claimed
    fn claim(&mut self, range: AddressRange) -> Vec<AddressRange> {
        if range.is_empty() {
            return Vec::new();
        }

        let from = self
            .spans
            .range(..=range.start)
            .next_back()
            .map_or(range.start, |(&start, _)| start);
        let mut fresh = Vec::new();
        let mut cursor = range.start;

        for (&start, &end) in self.spans.range(from..range.end) {
            if end <= cursor {
                continue;
            }
            if start > cursor {
                fresh.push(AddressRange::new(cursor, start));
            }
            cursor = end;
            if cursor >= range.end {
                break;
            }
        }
        if cursor < range.end {
            fresh.push(AddressRange::new(cursor, range.end));
        }

        for piece in &fresh {
            self.spans.insert(piece.start, piece.end);
        }
        fresh
    }
}
