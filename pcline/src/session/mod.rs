//! # Debug-Info Sessions
//!
//! A session is the boundary between the resolution engine and the library
//! that decodes raw debug sections. The engine never touches DWARF bytes; it
//! sees compilation units as plain values and asks the session to decode a
//! unit's line-number program on demand.
//!
//! ## Unit Materialization
//!
//! DWARF readers expose units through a forward-only cursor. A session walks
//! that cursor exactly once when it is opened and keeps the result as an
//! indexable list, so resolution can scan units any number of times without
//! restarting or draining iteration.
//!
//! ## Address Ranges
//!
//! A unit describes the code it covers with `DW_AT_low_pc`/`DW_AT_high_pc`
//! (one contiguous block) and/or `DW_AT_ranges` (a list of blocks). The list
//! comes in two wire encodings:
//!
//! ```text
//! DWARF 2-4  .debug_ranges    (begin, end) pairs, base-address selection, (0, 0) end
//! DWARF 5    .debug_rnglists  DW_RLE_* entries: offset_pair, start_end, start_length,
//!                             startx_endx, startx_length, base_address(x), end_of_list
//! ```
//!
//! Both are carried verbatim as a [`RangeEncoding`] and normalized by
//! [`crate::resolution::ranges`]. Indexed (`x`) forms are already resolved to
//! addresses by the session.
//!
//! ## Module Structure
//!
//! - **`dwarf`**: [`DwarfSession`], the gimli/object implementation of
//!   [`DebugInfo`]

pub mod dwarf;
#[cfg(test)]
pub(crate) mod fake;

pub use dwarf::DwarfSession;

use crate::domain::{LineRecord, SessionError};

/// Access to the compilation units of one object file
pub trait DebugInfo {
    /// All compilation units, in discovery order
    fn units(&self) -> &[CompilationUnit];

    /// Decode the line-number program of `unit` into program-ordered records
    ///
    /// # Errors
    /// Returns an error if the line program is malformed
    fn decode_line_program(&self, unit: &CompilationUnit) -> Result<LineProgram, SessionError>;
}

/// Address-space descriptor of one compilation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    /// Position in discovery order
    pub index: usize,
    /// DWARF version of the unit header
    pub version: u16,
    pub name: Option<String>,
    /// `DW_AT_low_pc`
    pub low: Option<u64>,
    /// `DW_AT_high_pc`
    pub high: Option<HighAddress>,
    /// `DW_AT_ranges`
    pub ranges: Option<RangeEncoding>,
}

impl CompilationUnit {
    /// A unit with no address attributes
    #[must_use]
    pub fn new(index: usize, version: u16) -> Self {
        Self { index, version, name: None, low: None, high: None, ranges: None }
    }

    /// Display label used in log messages
    #[must_use]
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("#{} ({name})", self.index),
            None => format!("#{}", self.index),
        }
    }
}

/// `DW_AT_high_pc`, which is either an address or an offset from the low pc
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighAddress {
    /// Address form class
    Absolute(u64),
    /// Constant form class, relative to `DW_AT_low_pc`
    Offset(u64),
}

impl HighAddress {
    /// Absolute end address given the unit's low pc
    #[must_use]
    pub fn resolve(self, low: u64) -> u64 {
        match self {
            HighAddress::Absolute(addr) => addr,
            HighAddress::Offset(delta) => low.wrapping_add(delta),
        }
    }
}

/// Discontiguous ranges as encoded on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeEncoding {
    /// Pre-version-5 `.debug_ranges` entries
    Legacy(Vec<LegacyRangeEntry>),
    /// Version-5 `.debug_rnglists` entries
    V5(Vec<RangeListEntry>),
}

/// One `.debug_ranges` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyRangeEntry {
    /// Offsets from the current base address
    Range { begin: u64, end: u64 },
    /// Base-address selection entry
    BaseAddress(u64),
    /// End of list
    End,
}

/// One `.debug_rnglists` entry, indexed addresses already resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeListEntry {
    EndOfList,
    BaseAddress(u64),
    BaseAddressx(u64),
    OffsetPair { begin: u64, end: u64 },
    StartEnd { begin: u64, end: u64 },
    StartxEndx { begin: u64, end: u64 },
    StartxLength { begin: u64, length: u64 },
    StartLength { begin: u64, length: u64 },
}

/// Outcome of decoding a unit's line-number program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineProgram {
    /// The unit has no `DW_AT_stmt_list`
    Absent,
    /// The program uses a layout this tool does not decode, e.g. the
    /// two-level (logicals/actuals) tables
    Unsupported { version: u16 },
    Records(Vec<LineRecord>),
}
