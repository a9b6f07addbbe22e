//! Domain model for pcline
//!
//! Core value types shared by the debug-info session, the resolution engine
//! and the driver, plus the structured error types.

pub mod errors;
pub mod types;

pub use errors::{ErrorContext, IndexError, SessionError};
pub use types::{Address, AddressRange, LineRecord};
