//! Compilation-unit address coverage
//!
//! Decides whether an address belongs to a unit, from `DW_AT_low_pc`,
//! `DW_AT_high_pc` and the normalized `DW_AT_ranges` list.
//!
//! A discontiguous unit is approximated by its bounding envelope (lowest
//! start, highest end over all sub-ranges). Addresses in a gap between two
//! sub-ranges are therefore reported as contained.

use crate::domain::AddressRange;
use crate::session::{CompilationUnit, LegacyRangeEntry, RangeEncoding, RangeListEntry};

/// Ranges decoded from either wire encoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRanges {
    /// Non-empty `[start, end)` intervals in list order
    pub ranges: Vec<AddressRange>,
    /// Base address in effect after the last entry
    pub base: u64,
}

impl NormalizedRanges {
    /// Bounding envelope of all intervals
    #[must_use]
    pub fn envelope(&self) -> Option<AddressRange> {
        self.ranges.iter().copied().reduce(|acc, range| acc.hull(&range))
    }

    fn push(&mut self, start: u64, end: u64) {
        let range = AddressRange::new(start, end);
        if !range.is_empty() {
            self.ranges.push(range);
        }
    }
}

/// Normalize a range list; `unit_low` is the initial base address
#[must_use]
pub fn normalize(encoding: &RangeEncoding, unit_low: Option<u64>) -> NormalizedRanges {
    match encoding {
        RangeEncoding::Legacy(entries) => normalize_legacy(entries, unit_low),
        RangeEncoding::V5(entries) => normalize_range_list(entries, unit_low),
    }
}

/// `.debug_ranges`: pairs are offsets from the current base, a selection
/// entry replaces the base, and an end entry resets it to the unit's low pc
fn normalize_legacy(entries: &[LegacyRangeEntry], unit_low: Option<u64>) -> NormalizedRanges {
    let initial = unit_low.unwrap_or(0);
    let mut normalized = NormalizedRanges { ranges: Vec::new(), base: initial };

    for entry in entries {
        match *entry {
            LegacyRangeEntry::Range { begin, end } => {
                let base = normalized.base;
                normalized.push(base.wrapping_add(begin), base.wrapping_add(end));
            }
            LegacyRangeEntry::BaseAddress(addr) => normalized.base = addr,
            LegacyRangeEntry::End => normalized.base = initial,
        }
    }

    normalized
}

/// `.debug_rnglists`: base-address entries only update bookkeeping, every
/// other kind produces one interval
fn normalize_range_list(entries: &[RangeListEntry], unit_low: Option<u64>) -> NormalizedRanges {
    let mut normalized = NormalizedRanges { ranges: Vec::new(), base: unit_low.unwrap_or(0) };

    for entry in entries {
        match *entry {
            RangeListEntry::EndOfList => {}
            RangeListEntry::BaseAddress(addr) | RangeListEntry::BaseAddressx(addr) => {
                normalized.base = addr;
            }
            RangeListEntry::OffsetPair { begin, end } => {
                let base = normalized.base;
                normalized.push(base.wrapping_add(begin), base.wrapping_add(end));
            }
            RangeListEntry::StartEnd { begin, end } | RangeListEntry::StartxEndx { begin, end } => {
                normalized.push(begin, end);
            }
            RangeListEntry::StartLength { begin, length }
            | RangeListEntry::StartxLength { begin, length } => {
                normalized.push(begin, begin.wrapping_add(length));
            }
        }
    }

    normalized
}

/// Everything a unit declares about the addresses it covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnitSpan {
    /// `DW_AT_low_pc`, contained unless it is `u64::MAX`
    pub low: Option<u64>,
    /// `[low, high)` when both attributes are present
    pub contiguous: Option<AddressRange>,
    /// Bounding envelope of `DW_AT_ranges`
    pub envelope: Option<AddressRange>,
}

impl UnitSpan {
    #[must_use]
    pub fn of(unit: &CompilationUnit) -> Self {
        let contiguous = unit
            .low
            .zip(unit.high)
            .map(|(low, high)| AddressRange::new(low, high.resolve(low)))
            .filter(|range| !range.is_empty());
        let envelope =
            unit.ranges.as_ref().and_then(|encoding| normalize(encoding, unit.low).envelope());

        Self { low: unit.low, contiguous, envelope }
    }

    /// Containment test, in order: exact low pc, `[low, high)`, envelope
    ///
    /// Half-open ranges cannot reach `u64::MAX`, so no unit contains it.
    #[must_use]
    pub fn contains(&self, address: u64) -> bool {
        if address == u64::MAX {
            return false;
        }
        if self.low == Some(address) {
            return true;
        }
        if self.contiguous.is_some_and(|range| range.contains(address)) {
            return true;
        }
        self.envelope.is_some_and(|range| range.contains(address))
    }

    /// Intervals whose union is exactly the set of contained addresses
    pub fn pieces(&self) -> impl Iterator<Item = AddressRange> {
        let exact_low =
            self.low.and_then(|low| low.checked_add(1).map(|end| AddressRange::new(low, end)));
        exact_low.into_iter().chain(self.contiguous).chain(self.envelope)
    }

    /// Smallest range covering every contained address
    #[must_use]
    pub fn bounds(&self) -> Option<AddressRange> {
        self.pieces().reduce(|acc, range| acc.hull(&range))
    }
}

/// Whether `address` falls inside the code range declared by `unit`
#[must_use]
pub fn contains(unit: &CompilationUnit, address: u64) -> bool {
    UnitSpan::of(unit).contains(address)
}

/// Bounds over all units, `None` when no unit declares any address
pub fn global_bounds<'a>(
    units: impl IntoIterator<Item = &'a CompilationUnit>,
) -> Option<AddressRange> {
    units
        .into_iter()
        .filter_map(|unit| UnitSpan::of(unit).bounds())
        .reduce(|acc, range| acc.hull(&range))
}
