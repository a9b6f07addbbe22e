//! In-memory [`DebugInfo`] for unit tests

use super::{CompilationUnit, DebugInfo, HighAddress, LineProgram};
use crate::domain::{LineRecord, SessionError};
use std::cell::Cell;

pub(crate) struct FakeDebugInfo {
    units: Vec<CompilationUnit>,
    programs: Vec<LineProgram>,
    pub decodes: Cell<usize>,
}

impl FakeDebugInfo {
    pub(crate) fn new() -> Self {
        Self { units: Vec::new(), programs: Vec::new(), decodes: Cell::new(0) }
    }

    /// Add a unit; its index is assigned from discovery order
    pub(crate) fn with_unit(mut self, mut unit: CompilationUnit, program: LineProgram) -> Self {
        unit.index = self.units.len();
        self.units.push(unit);
        self.programs.push(program);
        self
    }

    /// Add a contiguous `[low, high)` unit with the given rows
    pub(crate) fn with_contiguous(self, low: u64, high: u64, records: Vec<LineRecord>) -> Self {
        let mut unit = CompilationUnit::new(0, 4);
        unit.low = Some(low);
        unit.high = Some(HighAddress::Absolute(high));
        self.with_unit(unit, LineProgram::Records(records))
    }
}

impl DebugInfo for FakeDebugInfo {
    fn units(&self) -> &[CompilationUnit] {
        &self.units
    }

    fn decode_line_program(&self, unit: &CompilationUnit) -> Result<LineProgram, SessionError> {
        self.decodes.set(self.decodes.get() + 1);
        Ok(self.programs[unit.index].clone())
    }
}

/// Rows of `file` at `(address, line)`, closed by a terminator at `end`
pub(crate) fn run(file: &str, rows: &[(u64, u64)], end: u64) -> Vec<LineRecord> {
    let mut records: Vec<LineRecord> =
        rows.iter().map(|&(address, line)| LineRecord::new(address, file, line)).collect();
    records.push(LineRecord::end_of_sequence(end, file));
    records
}
