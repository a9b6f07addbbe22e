//! # Address Resolution
//!
//! This module turns a program counter into the source location that
//! produced the machine code at that address, using a unit's DWARF
//! line-number program.
//!
//! ## Resolution Flow
//!
//! ```text
//! 1. Find the compilation unit covering the address
//!    unit #0  low_pc=0x1129 high_pc=+0x5c   → contains 0x1139
//!
//! 2. Decode the unit's line table (program order)
//!    0x1129  sample.c:3
//!    0x1139  sample.c:4
//!    0x1145  sample.c:5
//!    0x1185  <end of sequence>
//!
//! 3. Match the address
//!    exact row at 0x1139              → sample.c:4
//!    0x1140 is between 0x1139, 0x1145 → sample.c:4
//!    0x1185 is a terminator           → not found
//! ```
//!
//! ## Key Rules
//!
//! - **Half-open ranges**: `[low, high)` everywhere; `high` itself is outside.
//! - **Duplicate addresses**: several rows at one address resolve to the
//!   last of them in program order.
//! - **Sequence terminators**: never an answer; they close the current run,
//!   so addresses past the end of a run are unresolved until the next run.
//! - **Discontiguous units**: containment uses the bounding envelope of the
//!   unit's range list, so gaps between sub-ranges count as contained.
//!
//! ## Modes
//!
//! - **Per-query**: scan units for each address and decode only the
//!   containing unit's table. Cheap for a handful of addresses.
//! - **Batch**: decode every table once into a flat [`BatchIndex`] covering
//!   the union of all unit spans, then answer by array lookup. Chosen for
//!   stdin input or more than [`resolver::DEFAULT_BATCH_THRESHOLD`] addresses.
//!
//! Both modes give the same answer for every address.
//!
//! ## Module Structure
//!
//! - **`ranges`**: unit containment and range-list normalization
//! - **`line_table`**: decoded tables and the row matching rule
//! - **`batch_index`**: the flat index
//! - **`resolver`**: mode selection and the query entry point

pub mod batch_index;
pub mod line_table;
pub mod ranges;
pub mod resolver;

pub use batch_index::BatchIndex;
pub use line_table::{LineTable, TableStatus};
pub use resolver::{
    select_mode, Miss, Mode, ModeOverride, QuerySource, Resolution, Resolver, ResolverConfig,
};
