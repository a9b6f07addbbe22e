//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

/// A defined text symbol as reported by `nm -S`
#[derive(Debug, Clone)]
pub struct TextSymbol {
    pub address: u64,
    pub size: u64,
    pub name: String,
}

/// Text symbols of `binary` with a known size, or `None` if `nm` is unavailable
pub fn text_symbols(binary: &Path) -> Option<Vec<TextSymbol>> {
    let output = Command::new("nm").args(["-S", "--defined-only"]).arg(binary).output().ok()?;
    if !output.status.success() {
        return None;
    }

    let symbols = String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 4 || !matches!(parts[2], "T" | "t") {
                return None;
            }
            Some(TextSymbol {
                address: u64::from_str_radix(parts[0], 16).ok()?,
                size: u64::from_str_radix(parts[1], 16).ok()?,
                name: parts[3].to_string(),
            })
        })
        .collect();
    Some(symbols)
}
