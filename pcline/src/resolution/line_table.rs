//! Line tables and the address-to-row matching rule
//!
//! A table is the program-ordered list of [`LineRecord`]s of one unit. Rows
//! between two sequence terminators form a run; a non-terminator row owns
//! the addresses from its own address up to the next row's address.

use log::debug;
use std::collections::HashMap;

use crate::domain::{AddressRange, LineRecord, SessionError};
use crate::session::{CompilationUnit, DebugInfo, LineProgram};

/// Why a table has (or lacks) rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Decoded,
    NoLineProgram,
    Unsupported { version: u16 },
}

/// Decoded line-number program of one compilation unit
#[derive(Debug, Clone)]
pub struct LineTable {
    records: Vec<LineRecord>,
    status: TableStatus,
}

impl LineTable {
    #[must_use]
    pub fn new(records: Vec<LineRecord>) -> Self {
        Self { records, status: TableStatus::Decoded }
    }

    /// Decode the line program of `unit`
    ///
    /// Units without a program, or with one in an unsupported layout, give
    /// an empty table whose [`status`](Self::status) says which.
    ///
    /// # Errors
    /// Returns an error if the session reports malformed line data
    pub fn decode<D: DebugInfo + ?Sized>(
        info: &D,
        unit: &CompilationUnit,
    ) -> Result<Self, SessionError> {
        let table = match info.decode_line_program(unit)? {
            LineProgram::Records(records) => Self::new(records),
            LineProgram::Absent => Self { records: Vec::new(), status: TableStatus::NoLineProgram },
            LineProgram::Unsupported { version } => {
                debug!(
                    "Unit {} has an unsupported line table (version 0x{version:x})",
                    unit.label()
                );
                Self { records: Vec::new(), status: TableStatus::Unsupported { version } }
            }
        };
        Ok(table)
    }

    #[must_use]
    pub fn status(&self) -> TableStatus {
        self.status
    }

    #[must_use]
    pub fn records(&self) -> &[LineRecord] {
        &self.records
    }

    pub(crate) fn into_records(self) -> Vec<LineRecord> {
        self.records
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find the row that describes `address`
    ///
    /// Rows are scanned in program order and the first one to decide wins:
    /// - a row at exactly `address` answers with the last non-terminator row
    ///   at that address anywhere after it
    /// - otherwise, if the previous row of the current run lies strictly
    ///   below `address` and this row strictly above, the previous row answers
    ///
    /// Terminators never answer and end the current run.
    #[must_use]
    pub fn find(&self, address: u64) -> Option<&LineRecord> {
        let mut prev: Option<&LineRecord> = None;

        for (idx, record) in self.records.iter().enumerate() {
            if !record.end_sequence && record.address.0 == address {
                return self.records[idx..]
                    .iter()
                    .rev()
                    .find(|later| !later.end_sequence && later.address.0 == address);
            }
            if let Some(prev_record) = prev {
                if prev_record.address.0 < address && address < record.address.0 {
                    return Some(prev_record);
                }
            }
            prev = if record.end_sequence { None } else { Some(record) };
        }

        None
    }

    /// Address intervals decided by each row, in the order [`find`](Self::find)
    /// would decide them
    ///
    /// `visit` receives a non-empty range and the index of the answering row.
    /// Claiming each address on its first visit reproduces `find` for every
    /// address.
    pub fn for_each_interval(&self, mut visit: impl FnMut(AddressRange, usize)) {
        let mut last_at: HashMap<u64, usize> = HashMap::new();
        for (idx, record) in self.records.iter().enumerate() {
            if !record.end_sequence {
                last_at.insert(record.address.0, idx);
            }
        }

        let mut prev: Option<usize> = None;
        for (idx, record) in self.records.iter().enumerate() {
            let address = record.address.0;

            if !record.end_sequence {
                if let (Some(&owner), Some(end)) = (last_at.get(&address), address.checked_add(1)) {
                    visit(AddressRange::new(address, end), owner);
                }
            }
            if let Some(prev_idx) = prev {
                let start = self.records[prev_idx].address.0.saturating_add(1);
                let between = AddressRange::new(start, address);
                if !between.is_empty() {
                    visit(between, prev_idx);
                }
            }

            prev = if record.end_sequence { None } else { Some(idx) };
        }
    }
}
