//! Query entry point and mode selection
//!
//! A [`Resolver`] answers queries either from a [`BatchIndex`] or by scanning
//! units for every query. The choice is made once, from the
//! [`ResolverConfig`] and how addresses are supplied.

use log::{debug, info, warn};
use std::fmt;

use super::batch_index::BatchIndex;
use super::line_table::{LineTable, TableStatus};
use super::ranges;
use crate::domain::{IndexError, LineRecord, SessionError};
use crate::session::DebugInfo;

/// Up-front address count above which the batch index pays off
pub const DEFAULT_BATCH_THRESHOLD: usize = 100;

/// Default cap on the number of addresses a batch index may span
pub const DEFAULT_MAX_INDEX_SPAN: u64 = 1 << 28;

/// User override of the mode heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeOverride {
    #[default]
    Auto,
    ForceBatch,
    ForceNoBatch,
}

impl ModeOverride {
    /// `force_no_batch` wins when both flags are set
    #[must_use]
    pub fn from_flags(force_batch: bool, force_no_batch: bool) -> Self {
        match (force_batch, force_no_batch) {
            (_, true) => ModeOverride::ForceNoBatch,
            (true, false) => ModeOverride::ForceBatch,
            (false, false) => ModeOverride::Auto,
        }
    }
}

/// Resolver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    pub batch_threshold: usize,
    pub max_index_span: u64,
    pub mode: ModeOverride,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
            max_index_span: DEFAULT_MAX_INDEX_SPAN,
            mode: ModeOverride::Auto,
        }
    }
}

/// How queries reach the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    /// Open-ended input, query count unknown
    Stream,
    /// A known number of addresses given up front
    Listed(usize),
}

/// Resolution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Batch,
    PerQuery,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Batch => write!(f, "batch"),
            Mode::PerQuery => write!(f, "per-query"),
        }
    }
}

/// Pick a mode: the index costs one pass over every line table, a per-query
/// scan costs a pass over the containing unit's table for each address
#[must_use]
pub fn select_mode(config: &ResolverConfig, source: QuerySource) -> Mode {
    match (config.mode, source) {
        (ModeOverride::ForceNoBatch, _) => Mode::PerQuery,
        (ModeOverride::ForceBatch, _) | (ModeOverride::Auto, QuerySource::Stream) => Mode::Batch,
        (ModeOverride::Auto, QuerySource::Listed(count)) if count > config.batch_threshold => {
            Mode::Batch
        }
        (ModeOverride::Auto, QuerySource::Listed(_)) => Mode::PerQuery,
    }
}

/// Why a query found nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    /// Batch mode: no row covers the address
    NotIndexed,
    /// No unit declares the address
    NoContainingUnit,
    NoLineProgram { unit: usize },
    UnsupportedLineProgram { unit: usize, version: u16 },
    /// The containing unit's rows do not cover the address
    NoMatchingRow { unit: usize },
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Miss::NotIndexed => write!(f, "not covered by the batch index"),
            Miss::NoContainingUnit => write!(f, "no compilation unit contains the address"),
            Miss::NoLineProgram { unit } => write!(f, "unit #{unit} has no line table"),
            Miss::UnsupportedLineProgram { unit, version } => {
                write!(f, "unit #{unit} has an unsupported line table (version 0x{version:x})")
            }
            Miss::NoMatchingRow { unit } => write!(f, "no row of unit #{unit} covers the address"),
        }
    }
}

/// Result of one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(LineRecord),
    NotFound(Miss),
}

impl Resolution {
    #[must_use]
    pub fn into_record(self) -> Option<LineRecord> {
        match self {
            Resolution::Found(record) => Some(record),
            Resolution::NotFound(_) => None,
        }
    }
}

/// Address resolver over one debug-info session
pub struct Resolver<'s, D: DebugInfo + ?Sized> {
    info: &'s D,
    index: Option<BatchIndex>,
}

impl<'s, D: DebugInfo + ?Sized> Resolver<'s, D> {
    /// Resolver that scans units for every query
    pub fn per_query(info: &'s D) -> Self {
        Self { info, index: None }
    }

    /// Resolver answering from a prebuilt index
    pub fn with_index(info: &'s D, index: BatchIndex) -> Self {
        Self { info, index: Some(index) }
    }

    /// Select a mode and build the index if batch mode is chosen
    ///
    /// A soft index failure falls back to per-query mode unless batch mode
    /// was forced.
    ///
    /// # Errors
    /// Returns an error if batch mode is forced and the index cannot be
    /// built, or if the debug info is malformed
    pub fn new(
        info: &'s D,
        config: &ResolverConfig,
        source: QuerySource,
    ) -> Result<Self, IndexError> {
        let mode = select_mode(config, source);
        info!("Resolution mode: {mode} ({source:?}, {:?})", config.mode);

        if mode == Mode::PerQuery {
            return Ok(Self::per_query(info));
        }

        match BatchIndex::build(info, config.max_index_span) {
            Ok(index) => Ok(Self::with_index(info, index)),
            Err(e) if e.is_soft() && config.mode != ModeOverride::ForceBatch => {
                warn!("Batch index unavailable ({e}), falling back to per-query resolution");
                Ok(Self::per_query(info))
            }
            Err(e) => Err(e),
        }
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        if self.index.is_some() {
            Mode::Batch
        } else {
            Mode::PerQuery
        }
    }

    /// Resolve `address` to its line record, `None` when unresolved
    ///
    /// # Errors
    /// Returns an error if the debug info is malformed
    pub fn resolve(&self, address: u64) -> Result<Option<LineRecord>, SessionError> {
        Ok(self.resolve_detailed(address)?.into_record())
    }

    /// Resolve `address`, reporting why nothing was found
    ///
    /// # Errors
    /// Returns an error if the debug info is malformed
    pub fn resolve_detailed(&self, address: u64) -> Result<Resolution, SessionError> {
        if let Some(ref index) = self.index {
            return Ok(match index.lookup(address) {
                Some(record) => Resolution::Found(record.clone()),
                None => Resolution::NotFound(Miss::NotIndexed),
            });
        }

        let Some(unit) = self.info.units().iter().find(|unit| ranges::contains(unit, address))
        else {
            return Ok(Resolution::NotFound(Miss::NoContainingUnit));
        };
        debug!("0x{address:x} is in unit {}", unit.label());

        let table = LineTable::decode(self.info, unit)?;
        let resolution = match (table.find(address), table.status()) {
            (Some(record), _) => Resolution::Found(record.clone()),
            (None, TableStatus::Decoded) => {
                Resolution::NotFound(Miss::NoMatchingRow { unit: unit.index })
            }
            (None, TableStatus::NoLineProgram) => {
                Resolution::NotFound(Miss::NoLineProgram { unit: unit.index })
            }
            (None, TableStatus::Unsupported { version }) => {
                Resolution::NotFound(Miss::UnsupportedLineProgram { unit: unit.index, version })
            }
        };
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::fake::{run, FakeDebugInfo};
    use crate::session::{CompilationUnit, HighAddress, LineProgram};

    fn sample() -> FakeDebugInfo {
        let mut records =
            run("foo.c", &[(0x1000, 3), (0x1004, 4), (0x1004, 5), (0x1010, 6)], 0x1018);
        records.extend(run("foo.c", &[(0x1020, 9), (0x1028, 10)], 0x1030));
        FakeDebugInfo::new().with_contiguous(0x1000, 0x1030, records).with_contiguous(
            0x2000,
            0x2020,
            run("main.c", &[(0x2000, 1), (0x2008, 2)], 0x2020),
        )
    }

    fn forced(mode: ModeOverride) -> ResolverConfig {
        ResolverConfig { mode, ..ResolverConfig::default() }
    }

    fn batch_resolver(info: &FakeDebugInfo) -> Resolver<'_, FakeDebugInfo> {
        Resolver::new(info, &forced(ModeOverride::ForceBatch), QuerySource::Stream).unwrap()
    }

    #[test]
    fn test_mode_selection() {
        let auto = ResolverConfig::default();
        let threshold = DEFAULT_BATCH_THRESHOLD;
        let force_batch = forced(ModeOverride::ForceBatch);
        let force_no_batch = forced(ModeOverride::ForceNoBatch);

        assert_eq!(select_mode(&auto, QuerySource::Stream), Mode::Batch);
        assert_eq!(select_mode(&auto, QuerySource::Listed(1)), Mode::PerQuery);
        assert_eq!(select_mode(&auto, QuerySource::Listed(threshold)), Mode::PerQuery);
        assert_eq!(select_mode(&auto, QuerySource::Listed(threshold + 1)), Mode::Batch);
        assert_eq!(select_mode(&force_batch, QuerySource::Listed(1)), Mode::Batch);
        assert_eq!(select_mode(&force_no_batch, QuerySource::Stream), Mode::PerQuery);
    }

    #[test]
    fn test_force_no_batch_wins() {
        assert_eq!(ModeOverride::from_flags(true, true), ModeOverride::ForceNoBatch);
        assert_eq!(ModeOverride::from_flags(true, false), ModeOverride::ForceBatch);
        assert_eq!(ModeOverride::from_flags(false, false), ModeOverride::Auto);
    }

    #[test]
    fn test_modes_agree() {
        let info = sample();
        let batch = batch_resolver(&info);
        let scan = Resolver::per_query(&info);
        assert_eq!(batch.mode(), Mode::Batch);
        assert_eq!(scan.mode(), Mode::PerQuery);

        for address in 0x0F00..0x2100 {
            assert_eq!(
                batch.resolve(address).unwrap(),
                scan.resolve(address).unwrap(),
                "address 0x{address:x}"
            );
        }
    }

    #[test]
    fn test_modes_agree_at_top_of_address_space() {
        let mut top = CompilationUnit::new(0, 4);
        top.low = Some(u64::MAX);
        let info = FakeDebugInfo::new()
            .with_contiguous(0x1000, 0x1010, run("a.c", &[(0x1000, 1)], 0x1010))
            .with_unit(top, LineProgram::Records(run("top.c", &[(u64::MAX, 7)], u64::MAX)));

        let batch = batch_resolver(&info);
        let scan = Resolver::per_query(&info);

        assert_eq!(batch.resolve(u64::MAX).unwrap(), None);
        assert_eq!(scan.resolve(u64::MAX).unwrap(), None);
        assert_eq!(
            scan.resolve_detailed(u64::MAX).unwrap(),
            Resolution::NotFound(Miss::NoContainingUnit)
        );
    }

    #[test]
    fn test_per_query_resolution() {
        let info = sample();
        let resolver = Resolver::per_query(&info);
        let line = |address| resolver.resolve(address).unwrap().map(|record| record.line);

        assert_eq!(line(0x1000), Some(3));
        assert_eq!(line(0x1004), Some(5));
        assert_eq!(line(0x100F), Some(5));
        assert_eq!(line(0x1018), None);
        assert_eq!(line(0x2008), Some(2));
        assert_eq!(line(0x2020), None);
        assert_eq!(line(0x3000), None);
    }

    #[test]
    fn test_miss_reasons() {
        let mut bare = CompilationUnit::new(0, 4);
        bare.low = Some(0x5000);
        bare.high = Some(HighAddress::Offset(0x10));
        let info = sample().with_unit(bare.clone(), LineProgram::Absent).with_unit(
            CompilationUnit { low: Some(0x6000), ..bare },
            LineProgram::Unsupported { version: 0xf006 },
        );
        let resolver = Resolver::per_query(&info);

        assert_eq!(
            resolver.resolve_detailed(0x1018).unwrap(),
            Resolution::NotFound(Miss::NoMatchingRow { unit: 0 })
        );
        assert_eq!(
            resolver.resolve_detailed(0x4000).unwrap(),
            Resolution::NotFound(Miss::NoContainingUnit)
        );
        assert_eq!(
            resolver.resolve_detailed(0x5004).unwrap(),
            Resolution::NotFound(Miss::NoLineProgram { unit: 2 })
        );
        assert_eq!(
            resolver.resolve_detailed(0x6004).unwrap(),
            Resolution::NotFound(Miss::UnsupportedLineProgram { unit: 3, version: 0xf006 })
        );
    }

    #[test]
    fn test_unsupported_unit_keeps_its_addresses() {
        let mut unsupported = CompilationUnit::new(0, 5);
        unsupported.low = Some(0x1000);
        unsupported.high = Some(HighAddress::Offset(0x40));
        let info = FakeDebugInfo::new()
            .with_unit(unsupported, LineProgram::Unsupported { version: 0xf006 })
            .with_contiguous(0x1000, 0x1040, run("later.c", &[(0x1000, 2)], 0x1040));

        let batch = batch_resolver(&info);
        let scan = Resolver::per_query(&info);

        for address in [0x1000, 0x1020, 0x103F] {
            assert_eq!(batch.resolve(address).unwrap(), None, "address 0x{address:x}");
            assert_eq!(
                scan.resolve_detailed(address).unwrap(),
                Resolution::NotFound(Miss::UnsupportedLineProgram { unit: 0, version: 0xf006 })
            );
        }
    }

    #[test]
    fn test_soft_failure_falls_back_unless_forced() {
        let info = FakeDebugInfo::new().with_unit(
            CompilationUnit::new(0, 4),
            LineProgram::Records(run("a.c", &[(0x10, 1)], 0x20)),
        );

        let resolver =
            Resolver::new(&info, &ResolverConfig::default(), QuerySource::Stream).unwrap();
        assert_eq!(resolver.mode(), Mode::PerQuery);

        let forced_result =
            Resolver::new(&info, &forced(ModeOverride::ForceBatch), QuerySource::Stream);
        assert!(matches!(forced_result, Err(IndexError::NoAddressBounds)));
    }

    #[test]
    fn test_repeated_queries_are_stable() {
        let info = sample();
        let resolver = Resolver::per_query(&info);
        let addresses = [0x1006, 0x2004, 0x1006, 0x3000, 0x2004, 0x1006];

        let first: Vec<_> = addresses.iter().map(|&a| resolver.resolve(a).unwrap()).collect();
        let second: Vec<_> =
            addresses.iter().rev().map(|&a| resolver.resolve(a).unwrap()).collect();

        assert_eq!(first, second.into_iter().rev().collect::<Vec<_>>());
        assert_eq!(first[0], first[2]);
    }
}
