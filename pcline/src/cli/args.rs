//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::resolution::resolver::{DEFAULT_BATCH_THRESHOLD, DEFAULT_MAX_INDEX_SPAN};
use crate::resolution::{ModeOverride, QuerySource, ResolverConfig};

#[derive(Parser, Debug)]
#[command(
    name = "pcline",
    about = "Resolve program addresses to source file and line using DWARF line tables",
    after_help = "\
EXAMPLES:
    pcline -e ./app 401136 40114a         Resolve two addresses
    nm ./app | cut -d' ' -f1 | pcline -e ./app -a
                                          Resolve addresses read from stdin"
)]
pub struct Args {
    /// Addresses to resolve, in hexadecimal (read from stdin, one per line, when omitted)
    #[arg(value_name = "ADDRESS")]
    pub addresses: Vec<String>,

    /// Object file with debug information
    #[arg(short, long, value_name = "FILE", default_value = "a.out")]
    pub exe: PathBuf,

    /// Print each address before its location
    #[arg(short = 'a', long = "addresses")]
    pub print_addresses: bool,

    /// Always build the batch index (fail if it cannot be built)
    #[arg(short = 'b', long)]
    pub force_batch: bool,

    /// Never build the batch index (takes precedence over --force-batch)
    #[arg(short = 'n', long)]
    pub force_no_batch: bool,

    /// Number of addresses above which the batch index is built
    #[arg(long, value_name = "N", default_value_t = DEFAULT_BATCH_THRESHOLD)]
    pub batch_threshold: usize,

    /// Largest address span the batch index may cover
    #[arg(long, value_name = "ADDRESSES", default_value_t = DEFAULT_MAX_INDEX_SPAN)]
    pub max_index_span: u64,
}

impl Args {
    #[must_use]
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            batch_threshold: self.batch_threshold,
            max_index_span: self.max_index_span,
            mode: ModeOverride::from_flags(self.force_batch, self.force_no_batch),
        }
    }

    /// Stdin when no address was given on the command line
    #[must_use]
    pub fn query_source(&self) -> QuerySource {
        if self.addresses.is_empty() {
            QuerySource::Stream
        } else {
            QuerySource::Listed(self.addresses.len())
        }
    }
}
