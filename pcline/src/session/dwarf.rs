use gimli::{AttributeValue, EndianRcSlice, RawRngListEntry, Reader as _, RunTimeEndian};
use log::{debug, info, trace, warn};
use object::{Object, ObjectSection};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{
    CompilationUnit, DebugInfo, HighAddress, LegacyRangeEntry, LineProgram, RangeEncoding,
    RangeListEntry,
};
use crate::domain::{ErrorContext, LineRecord, SessionError};

type Reader = EndianRcSlice<RunTimeEndian>;

/// File name used for rows whose file index has no entry in the header
const UNKNOWN_FILE: &str = "??";

/// Parsed unit kept alongside its [`CompilationUnit`] description
enum UnitEntry {
    Parsed(Box<gimli::Unit<Reader>>),
    /// gimli rejected the line program header with this version
    Unsupported { line_version: u16 },
}

/// DWARF session over one object file
///
/// Loads every debug section once and materializes all compilation units of
/// `.debug_info` at open time.
pub struct DwarfSession {
    context: ErrorContext,
    dwarf: gimli::Dwarf<Reader>,
    units: Vec<CompilationUnit>,
    entries: Vec<UnitEntry>,
}

impl DwarfSession {
    /// Open an object file and read its compilation units
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if a unit
    /// header or its root entry is malformed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let context = ErrorContext::file(path);

        let binary_data = fs::read(path)
            .map_err(|source| SessionError::Open { path: path.to_path_buf(), source })?;
        let obj_file = object::File::parse(&*binary_data)
            .map_err(|source| SessionError::Object { path: path.to_path_buf(), source })?;

        let endian =
            if obj_file.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };

        let load_section = |id: gimli::SectionId| -> Result<Reader, gimli::Error> {
            let data = obj_file
                .section_by_name(id.name())
                .and_then(|section| section.uncompressed_data().ok())
                .unwrap_or(std::borrow::Cow::Borrowed(&[][..]));
            Ok(EndianRcSlice::new(Rc::from(&*data), endian))
        };

        let dwarf = gimli::Dwarf::load(&load_section)
            .map_err(|source| SessionError::Dwarf { context: context.clone(), source })?;

        Self::from_dwarf(context, dwarf)
    }

    /// Session over already loaded sections
    fn from_dwarf(
        context: ErrorContext,
        dwarf: gimli::Dwarf<Reader>,
    ) -> Result<Self, SessionError> {
        let mut session = Self { context, dwarf, units: Vec::new(), entries: Vec::new() };
        session.materialize_units()?;

        info!(
            "Opened {}: {} compilation units",
            session.context.path.display(),
            session.units.len()
        );
        Ok(session)
    }

    /// Path of the object file this session reads
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.context.path
    }

    fn materialize_units(&mut self) -> Result<(), SessionError> {
        let mut headers = self.dwarf.units();

        loop {
            let index = self.units.len();
            let header = match headers.next() {
                Ok(Some(header)) => header,
                Ok(None) => break,
                Err(source) => return Err(self.error_in(index, source)),
            };

            let description = describe_unit(&self.dwarf, &header, index)
                .map_err(|source| self.error_in(index, source))?;
            trace!(
                "Unit {}: low={:?} high={:?}",
                description.label(),
                description.low,
                description.high
            );

            let entry = match self.dwarf.unit(header) {
                Ok(unit) => UnitEntry::Parsed(Box::new(unit)),
                Err(gimli::Error::UnknownVersion(line_version)) => {
                    let line_version = u16::try_from(line_version).unwrap_or(u16::MAX);
                    warn!(
                        "Unit {} in {} has an unsupported line table (version 0x{line_version:x})",
                        description.label(),
                        self.context.path.display()
                    );
                    UnitEntry::Unsupported { line_version }
                }
                Err(source) => return Err(self.error_in(index, source)),
            };

            self.units.push(description);
            self.entries.push(entry);
        }

        Ok(())
    }

    fn error_in(&self, unit: usize, source: gimli::Error) -> SessionError {
        SessionError::Dwarf { context: self.context.in_unit(unit), source }
    }

    fn decode_rows(&self, unit: &gimli::Unit<Reader>) -> gimli::Result<LineProgram> {
        let Some(program) = unit.line_program.clone() else {
            return Ok(LineProgram::Absent);
        };

        let mut files: HashMap<u64, Rc<str>> = HashMap::new();
        let mut records = Vec::new();
        let mut rows = program.rows();

        while let Some((header, row)) = rows.next_row()? {
            let file = match files.entry(row.file_index()) {
                Entry::Occupied(entry) => Rc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    let name = self.file_name(unit, header, row.file_index())?;
                    Rc::clone(entry.insert(name))
                }
            };

            records.push(LineRecord {
                address: row.address().into(),
                file,
                line: row.line().map_or(0, NonZeroU64::get),
                end_sequence: row.end_sequence(),
            });
        }

        Ok(LineProgram::Records(records))
    }

    /// Full path of a line-table file entry: compilation directory, include
    /// directory and file name, each replacing the prefix when absolute
    fn file_name(
        &self,
        unit: &gimli::Unit<Reader>,
        header: &gimli::LineProgramHeader<Reader>,
        file_index: u64,
    ) -> gimli::Result<Rc<str>> {
        let Some(file) = header.file(file_index) else {
            return Ok(Rc::from(UNKNOWN_FILE));
        };

        let mut path = PathBuf::new();
        if let Some(ref comp_dir) = unit.comp_dir {
            path.push(comp_dir.to_string_lossy()?.as_ref());
        }
        if let Some(directory) = file.directory(header) {
            let directory = self.dwarf.attr_string(unit, directory)?;
            path.push(directory.to_string_lossy()?.as_ref());
        }
        let name = self.dwarf.attr_string(unit, file.path_name())?;
        path.push(name.to_string_lossy()?.as_ref());

        Ok(Rc::from(path.to_string_lossy().as_ref()))
    }
}

impl DebugInfo for DwarfSession {
    fn units(&self) -> &[CompilationUnit] {
        &self.units
    }

    fn decode_line_program(&self, unit: &CompilationUnit) -> Result<LineProgram, SessionError> {
        match &self.entries[unit.index] {
            UnitEntry::Unsupported { line_version } => {
                Ok(LineProgram::Unsupported { version: *line_version })
            }
            UnitEntry::Parsed(parsed) => {
                let program =
                    self.decode_rows(parsed).map_err(|source| self.error_in(unit.index, source))?;
                if let LineProgram::Records(ref records) = program {
                    debug!("Decoded {} line records for unit {}", records.len(), unit.label());
                }
                Ok(program)
            }
        }
    }
}

/// Root-entry attributes of one unit, read from the unit header alone
///
/// Nothing here depends on the line program, so a unit whose line table
/// cannot be parsed still reports the addresses it covers.
struct RootAttributes<'a> {
    dwarf: &'a gimli::Dwarf<Reader>,
    header: &'a gimli::UnitHeader<Reader>,
    low: Option<AttributeValue<Reader>>,
    high: Option<AttributeValue<Reader>>,
    ranges: Option<AttributeValue<Reader>>,
    name: Option<AttributeValue<Reader>>,
    addr_base: gimli::DebugAddrBase<usize>,
    rnglists_base: gimli::DebugRngListsBase<usize>,
    str_offsets_base: gimli::DebugStrOffsetsBase<usize>,
}

impl<'a> RootAttributes<'a> {
    /// Collect the attributes of the unit's first entry, `None` for an
    /// empty unit
    fn read(
        dwarf: &'a gimli::Dwarf<Reader>,
        header: &'a gimli::UnitHeader<Reader>,
    ) -> gimli::Result<Option<Self>> {
        let abbreviations = dwarf.abbreviations(header)?;
        let mut entries = header.entries(&abbreviations);
        let Some((_, root)) = entries.next_dfs()? else {
            return Ok(None);
        };

        let mut root_attrs = Self {
            dwarf,
            header,
            low: None,
            high: None,
            ranges: None,
            name: None,
            addr_base: gimli::DebugAddrBase(0),
            rnglists_base: gimli::DebugRngListsBase::default_for_encoding_and_file(
                header.encoding(),
                dwarf.file_type,
            ),
            str_offsets_base: gimli::DebugStrOffsetsBase::default_for_encoding_and_file(
                header.encoding(),
                dwarf.file_type,
            ),
        };

        let mut attrs = root.attrs();
        while let Some(attr) = attrs.next()? {
            match (attr.name(), attr.value()) {
                (gimli::constants::DW_AT_low_pc, value) => root_attrs.low = Some(value),
                (gimli::constants::DW_AT_high_pc, value) => root_attrs.high = Some(value),
                (gimli::constants::DW_AT_ranges, value) => root_attrs.ranges = Some(value),
                (gimli::constants::DW_AT_name, value) => root_attrs.name = Some(value),
                (_, AttributeValue::DebugAddrBase(base)) => root_attrs.addr_base = base,
                (_, AttributeValue::DebugRngListsBase(base)) => root_attrs.rnglists_base = base,
                (_, AttributeValue::DebugStrOffsetsBase(base)) => {
                    root_attrs.str_offsets_base = base;
                }
                _ => {}
            }
        }

        Ok(Some(root_attrs))
    }

    fn indexed_address(&self, index: gimli::DebugAddrIndex<usize>) -> gimli::Result<u64> {
        self.dwarf.debug_addr.get_address(self.header.address_size(), self.addr_base, index)
    }

    fn address(&self, value: &AttributeValue<Reader>) -> gimli::Result<Option<u64>> {
        match *value {
            AttributeValue::Addr(addr) => Ok(Some(addr)),
            AttributeValue::DebugAddrIndex(index) => self.indexed_address(index).map(Some),
            _ => Ok(None),
        }
    }

    /// `DW_AT_high_pc`: address forms are absolute, constants are offsets
    fn high(&self) -> gimli::Result<Option<HighAddress>> {
        let Some(ref value) = self.high else {
            return Ok(None);
        };
        match value {
            AttributeValue::Addr(_) | AttributeValue::DebugAddrIndex(_) => {
                Ok(self.address(value)?.map(HighAddress::Absolute))
            }
            constant => Ok(constant.udata_value().map(HighAddress::Offset)),
        }
    }

    fn ranges_offset(&self) -> gimli::Result<Option<gimli::RangeListsOffset<usize>>> {
        match self.ranges {
            Some(AttributeValue::RangeListsRef(raw)) => Ok(Some(gimli::RangeListsOffset(raw.0))),
            Some(AttributeValue::DebugRngListsIndex(index)) => self
                .dwarf
                .ranges
                .get_offset(self.header.encoding(), self.rnglists_base, index)
                .map(Some),
            _ => Ok(None),
        }
    }

    fn string(&self, value: AttributeValue<Reader>) -> gimli::Result<Option<Reader>> {
        match value {
            AttributeValue::String(string) => Ok(Some(string)),
            AttributeValue::DebugStrRef(offset) => self.dwarf.debug_str.get_str(offset).map(Some),
            AttributeValue::DebugLineStrRef(offset) => {
                self.dwarf.debug_line_str.get_str(offset).map(Some)
            }
            AttributeValue::DebugStrOffsetsIndex(index) => {
                let offset = self.dwarf.debug_str_offsets.get_str_offset(
                    self.header.format(),
                    self.str_offsets_base,
                    index,
                )?;
                self.dwarf.debug_str.get_str(offset).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// `DW_AT_name`, which only labels log lines; unreadable names are dropped
    fn name(&self, index: usize) -> Option<String> {
        let value = self.name.clone()?;
        let decoded = self.string(value).and_then(|name| match name {
            Some(name) => name.to_string_lossy().map(|name| Some(name.into_owned())),
            None => Ok(None),
        });
        decoded.unwrap_or_else(|e| {
            debug!("Unit #{index} has an unreadable name: {e}");
            None
        })
    }
}

/// Read the address attributes of a unit's root entry
fn describe_unit(
    dwarf: &gimli::Dwarf<Reader>,
    header: &gimli::UnitHeader<Reader>,
    index: usize,
) -> gimli::Result<CompilationUnit> {
    let mut description = CompilationUnit::new(index, header.version());
    let Some(root) = RootAttributes::read(dwarf, header)? else {
        return Ok(description);
    };

    description.name = root.name(index);
    description.low = match root.low {
        Some(ref value) => root.address(value)?,
        None => None,
    };
    description.high = root.high()?;
    description.ranges = read_ranges(&root)?;

    Ok(description)
}

/// Read the raw `DW_AT_ranges` entries in the unit's wire encoding
fn read_ranges(root: &RootAttributes<'_>) -> gimli::Result<Option<RangeEncoding>> {
    let Some(offset) = root.ranges_offset()? else {
        return Ok(None);
    };
    let mut raw = root.dwarf.ranges.raw_ranges(offset, root.header.encoding())?;

    if root.header.version() < 5 {
        let mut entries = Vec::new();
        while let Some(entry) = raw.next()? {
            match convert_entry(root, entry)? {
                RangeListEntry::OffsetPair { begin, end } => {
                    entries.push(LegacyRangeEntry::Range { begin, end });
                }
                RangeListEntry::BaseAddress(addr) => {
                    entries.push(LegacyRangeEntry::BaseAddress(addr));
                }
                other => trace!("Ignoring {other:?} in a pre-DWARF-5 range list"),
            }
        }
        entries.push(LegacyRangeEntry::End);
        Ok(Some(RangeEncoding::Legacy(entries)))
    } else {
        let mut entries = Vec::new();
        while let Some(entry) = raw.next()? {
            entries.push(convert_entry(root, entry)?);
        }
        entries.push(RangeListEntry::EndOfList);
        Ok(Some(RangeEncoding::V5(entries)))
    }
}

fn convert_entry(
    root: &RootAttributes<'_>,
    entry: RawRngListEntry<usize>,
) -> gimli::Result<RangeListEntry> {
    Ok(match entry {
        RawRngListEntry::AddressOrOffsetPair { begin, end }
        | RawRngListEntry::OffsetPair { begin, end } => RangeListEntry::OffsetPair { begin, end },
        RawRngListEntry::BaseAddress { addr } => RangeListEntry::BaseAddress(addr),
        RawRngListEntry::BaseAddressx { addr } => {
            RangeListEntry::BaseAddressx(root.indexed_address(addr)?)
        }
        RawRngListEntry::StartxEndx { begin, end } => RangeListEntry::StartxEndx {
            begin: root.indexed_address(begin)?,
            end: root.indexed_address(end)?,
        },
        RawRngListEntry::StartxLength { begin, length } => {
            RangeListEntry::StartxLength { begin: root.indexed_address(begin)?, length }
        }
        RawRngListEntry::StartEnd { begin, end } => RangeListEntry::StartEnd { begin, end },
        RawRngListEntry::StartLength { begin, length } => {
            RangeListEntry::StartLength { begin, length }
        }
    })
}
