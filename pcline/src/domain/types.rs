//! Domain types for address resolution
//!
//! All address intervals are half-open: `[start, end)`.

use std::fmt;
use std::rc::Rc;

/// A program counter value (an address inside the object file's code)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl From<u64> for Address {
    fn from(addr: u64) -> Self {
        Address(addr)
    }
}

/// Half-open address interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    pub start: u64,
    pub end: u64,
}

impl AddressRange {
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Check if an address falls within this range
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Number of addresses covered (0 for empty or inverted ranges)
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Intersection of two ranges, `None` when they do not overlap
    #[must_use]
    pub fn intersect(&self, other: &AddressRange) -> Option<AddressRange> {
        let range = AddressRange::new(self.start.max(other.start), self.end.min(other.end));
        (!range.is_empty()).then_some(range)
    }

    /// Smallest range covering both `self` and `other`
    #[must_use]
    pub fn hull(&self, other: &AddressRange) -> AddressRange {
        AddressRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}-0x{:x}", self.start, self.end)
    }
}

/// One row of a compilation unit's line-number program
///
/// Records are kept in program order. A record with `end_sequence` set
/// terminates a run of code and is never itself a resolvable location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    pub address: Address,
    /// Source file path, shared by every record of the same table and file
    pub file: Rc<str>,
    /// Source line, 0 when the program does not attribute a line
    pub line: u64,
    pub end_sequence: bool,
}

impl LineRecord {
    pub fn new(address: u64, file: impl Into<Rc<str>>, line: u64) -> Self {
        Self { address: Address(address), file: file.into(), line, end_sequence: false }
    }

    /// Sequence terminator at `address`
    pub fn end_of_sequence(address: u64, file: impl Into<Rc<str>>) -> Self {
        Self { address: Address(address), file: file.into(), line: 0, end_sequence: true }
    }
}

impl fmt::Display for LineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
