//! # pcline - Main Entry Point
//!
//! Reads addresses from the command line or stdin and prints one
//! `file:line` (or `??:0`) per address.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::io::{self, BufRead, BufWriter, Write};

use pcline::cli::Args;
use pcline::domain::SessionError;
use pcline::report::{parse_address, write_record};
use pcline::resolution::{QuerySource, Resolution, Resolver};
use pcline::session::{DebugInfo, DwarfSession};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_NOINPUT: i32 = 66;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<SessionError>() {
        Some(SessionError::Open { .. }) => EXIT_NOINPUT,
        _ => EXIT_ERROR,
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let session = DwarfSession::open(&args.exe)
        .with_context(|| format!("Failed to load debug info from {}", args.exe.display()))?;

    let source = args.query_source();
    let resolver = Resolver::new(&session, &args.resolver_config(), source)
        .context("Failed to build batch index")?;
    info!("Resolving in {} mode", resolver.mode());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match source {
        QuerySource::Listed(_) => {
            for input in &args.addresses {
                emit(&resolver, &mut out, input, args.print_addresses)?;
            }
        }
        QuerySource::Stream => {
            for line in io::stdin().lock().lines() {
                let line = line.context("Failed to read address from stdin")?;
                emit(&resolver, &mut out, &line, args.print_addresses)?;
                // Keep output in step with input when driven through a pipe
                out.flush()?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

/// Resolve one input string and print exactly one record for it
fn emit<D: DebugInfo + ?Sized, W: Write>(
    resolver: &Resolver<'_, D>,
    out: &mut W,
    input: &str,
    print_address: bool,
) -> Result<()> {
    let Some(address) = parse_address(input) else {
        debug!("Not a hexadecimal address: {input:?}");
        write_record(out, 0, None, print_address)?;
        return Ok(());
    };

    let record = match resolver.resolve_detailed(address)? {
        Resolution::Found(record) => Some(record),
        Resolution::NotFound(miss) => {
            debug!("0x{address:x} unresolved: {miss}");
            None
        }
    };
    write_record(out, address, record.as_ref(), print_address)?;
    Ok(())
}
