//! Address parsing and output formatting for the command-line driver

use std::io::{self, Write};

use crate::domain::{Address, LineRecord};

/// Printed in place of `file:line` for unresolved addresses
pub const UNRESOLVED: &str = "??:0";

/// Parse a hexadecimal address
///
/// Leading whitespace and a `0x` prefix are skipped and the longest run of
/// hex digits is taken; trailing text is ignored. Values that do not fit in
/// 64 bits saturate. Returns `None` when no digit is found.
#[must_use]
pub fn parse_address(input: &str) -> Option<u64> {
    let trimmed = input.trim_start();
    let digits = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_hexdigit()) => rest,
        // "0x" with no digits after it reads as the leading zero
        Some(_) => return Some(0),
        None => trimmed,
    };

    let mut value: Option<u64> = None;
    for digit in digits.chars().map_while(|c| c.to_digit(16)) {
        let shifted =
            value.unwrap_or(0).checked_mul(16).and_then(|v| v.checked_add(u64::from(digit)));
        value = Some(shifted.unwrap_or(u64::MAX));
    }
    value
}

/// Write one output record: the optional address line, then `file:line`
///
/// # Errors
/// Returns an error if writing to `out` fails
pub fn write_record<W: Write>(
    out: &mut W,
    address: u64,
    record: Option<&LineRecord>,
    print_address: bool,
) -> io::Result<()> {
    if print_address {
        writeln!(out, "{}", Address(address))?;
    }
    match record {
        Some(record) => writeln!(out, "{record}"),
        None => writeln!(out, "{UNRESOLVED}"),
    }
}
