//! Structured error types for pcline
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where a debug-info error happened: the object file and, when known, the
/// compilation unit being read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub path: PathBuf,
    pub unit: Option<usize>,
}

impl ErrorContext {
    pub fn file(path: &Path) -> Self {
        Self { path: path.to_path_buf(), unit: None }
    }

    #[must_use]
    pub fn in_unit(&self, unit: usize) -> Self {
        Self { path: self.path.clone(), unit: Some(unit) }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{} (unit #{unit})", self.path.display()),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// Fatal errors raised while opening or reading debug information
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{} not found or unreadable: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse object file {}: {source}", .path.display())]
    Object {
        path: PathBuf,
        #[source]
        source: object::read::Error,
    },

    #[error("Malformed debug info in {context}: {source}")]
    Dwarf {
        context: ErrorContext,
        #[source]
        source: gimli::Error,
    },
}

/// Errors raised while building the batch index
///
/// Everything except [`IndexError::Session`] is soft: the caller may fall
/// back to per-query resolution.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("No compilation unit declares an address range")]
    NoAddressBounds,

    #[error("Index would span {span} addresses, limit is {limit}")]
    SpanTooLarge { span: u64, limit: u64 },

    #[error("Failed to allocate index for {span} addresses")]
    Allocation { span: u64 },

    #[error("Too many line records to index: {0}")]
    TooManyRecords(usize),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl IndexError {
    /// True when per-query resolution can still answer queries
    #[must_use]
    pub fn is_soft(&self) -> bool {
        !matches!(self, IndexError::Session(_))
    }
}
