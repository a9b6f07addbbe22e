//! # pcline - Program Counter to Source Line
//!
//! pcline resolves raw code addresses to the `file:line` that produced them,
//! using the DWARF line-number programs embedded in an object file. It is
//! meant for crash symbolication, profilers and debuggers that collect
//! addresses and need human-readable locations.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      pcline (binary)                         │
//! │   args / stdin  ──▶  parse_address  ──▶  write_record        │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ resolve(address)
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Resolver                              │
//! │   ┌──────────────┐          ┌──────────────────────────┐     │
//! │   │  BatchIndex  │    or    │ ranges::contains +       │     │
//! │   │ (flat array) │          │ LineTable::find per query│     │
//! │   └──────────────┘          └──────────────────────────┘     │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ DebugInfo trait
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │              DwarfSession (gimli + object)                   │
//! │   units materialized at open, line programs decoded on demand│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`session`]: the debug-info boundary; [`session::DebugInfo`] and its
//!   gimli implementation [`session::DwarfSession`]
//! - [`resolution`]: unit containment, line tables, the batch index and the
//!   [`resolution::Resolver`]
//! - [`domain`]: addresses, ranges, line records and error types
//! - [`cli`]: command-line arguments
//! - [`report`]: address parsing and output formatting
//!
//! ## Typical Usage
//!
//! ```bash
//! # Resolve a few addresses
//! pcline -e ./app 401136 40114a
//!
//! # Stream addresses through stdin (batch index is built once)
//! cat pcs.txt | pcline -e ./app --addresses
//! ```
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! let session = DwarfSession::open("./app")?;
//! let resolver = Resolver::new(&session, &ResolverConfig::default(), QuerySource::Listed(1))?;
//! if let Some(record) = resolver.resolve(0x401136)? {
//!     println!("{record}");
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod report;
pub mod resolution;
pub mod session;
