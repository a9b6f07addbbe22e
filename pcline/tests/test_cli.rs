mod common;

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

const OUTSIDE: &str = "ffffffffffffff00";

fn pcline() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pcline"))
}

fn own_binary() -> &'static str {
    env!("CARGO_BIN_EXE_pcline")
}

#[test]
fn test_missing_object_file_fails() {
    let output = pcline()
        .args(["-e", "/nonexistent/pcline-test-binary", "1000"])
        .output()
        .expect("Failed to run pcline");

    assert_eq!(output.status.code(), Some(66));
    assert!(output.stdout.is_empty(), "no partial output expected");
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn test_unparsable_object_file_is_a_runtime_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("not-an-object");
    std::fs::write(&path, "plain text, no ELF header\n").expect("Failed to write file");

    let output = pcline()
        .arg("-e")
        .arg(&path)
        .arg("1000")
        .output()
        .expect("Failed to run pcline");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty(), "no partial output expected");
}

#[test]
fn test_unresolved_addresses_print_marker() {
    let output = pcline()
        .args(["-e", own_binary(), "-n", OUTSIDE, "not-an-address"])
        .output()
        .expect("Failed to run pcline");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "??:0\n??:0\n");
}

#[test]
fn test_address_echo() {
    let output = pcline()
        .args(["-e", own_binary(), "-a", "-n", OUTSIDE])
        .output()
        .expect("Failed to run pcline");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "0xffffffffffffff00\n??:0\n");
}

#[test]
fn test_reads_addresses_from_stdin() {
    let mut child = pcline()
        .args(["-e", own_binary(), "--force-no-batch"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to spawn pcline");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(format!("{OUTSIDE}\n\n0x{OUTSIDE}\n").as_bytes())
        .expect("Failed to write addresses");
    let output = child.wait_with_output().expect("Failed to wait for pcline");

    assert!(output.status.success());
    // One record per input line, including the empty one
    assert_eq!(String::from_utf8_lossy(&output.stdout), "??:0\n??:0\n??:0\n");
}

#[test]
fn test_resolves_own_function() {
    let Some(symbols) = common::text_symbols(Path::new(own_binary())) else {
        println!("nm not available, skipping");
        return;
    };
    let addresses: Vec<String> = symbols
        .iter()
        .filter(|symbol| symbol.name.contains("6pcline"))
        .take(10)
        .map(|symbol| format!("{:x}", symbol.address))
        .collect();
    assert!(!addresses.is_empty(), "no pcline symbols found");

    let output = pcline()
        .args(["-e", own_binary()])
        .args(&addresses)
        .output()
        .expect("Failed to run pcline");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), addresses.len());
    assert!(
        stdout.lines().any(|line| line.contains(".rs:")),
        "no address resolved to a Rust source line:\n{stdout}"
    );
}
