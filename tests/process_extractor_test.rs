//! Integration tests for the subprocess extractor, driven by `/bin/sh` scripts.

#![cfg(unix)]

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use untable::extractor::{ExtractorOptions, Flavor, ProcessExtractor, TableExtractor};
use untable::model::{BoundingBox, Page};
use untable::{detect_page_tables, parse_output, Error};

/// Extractor running `script` under `/bin/sh -c`; flags and path become `$1..`.
fn shell(script: &str) -> ProcessExtractor {
    ProcessExtractor::new("/bin/sh").with_args(["-c", script, "extractor"])
}

#[test]
fn test_payload_read_from_stdout() {
    let mut document = NamedTempFile::new().unwrap();
    write!(
        document,
        r#"[{{"page": 1, "region": [0, 0, 100, 20], "cells": [{{"bbox": [0, 0, 100, 20], "text": "hi"}}]}}]"#
    )
    .unwrap();

    // the "document" holds the payload, so the script prints the file it is given
    let output = shell(r#"cat "$1""#).read_tables(document.path(), &ExtractorOptions::default());

    assert!(output.is_success(), "{:?}", output);
    let parsed = parse_output(&output).unwrap();
    assert_eq!(parsed.descriptors.len(), 1);
    assert_eq!(parsed.descriptors[0].cells[0].text, "hi");
}

#[test]
fn test_options_passed_as_flags() {
    let options = ExtractorOptions::default()
        .with_page(2)
        .with_flavor(Flavor::Lattice)
        .with_line_scale(40);
    let output = shell(r#"echo "$@" >&2; echo '[]'"#).read_tables(Path::new("in.pdf"), &options);

    assert_eq!(output.exit_status, 0);
    assert_eq!(
        output.diagnostics.trim(),
        "--pages 2 --flavor lattice --line-scale 40 in.pdf"
    );
    assert_eq!(output.payload.trim(), "[]");
}

#[test]
fn test_environment_is_set() {
    let extractor = shell(r#"printf '[]'; printf '%s' "$UNTABLE_MODE" >&2"#)
        .with_env("UNTABLE_MODE", "strict");
    let output = extractor.read_tables(Path::new("in.pdf"), &ExtractorOptions::default());
    assert_eq!(output.diagnostics, "strict");
    assert_eq!(output.payload, "[]");
}

#[test]
fn test_nonzero_exit_status() {
    let output = shell("echo 'detector crashed' >&2; exit 3")
        .read_tables(Path::new("in.pdf"), &ExtractorOptions::default());

    assert_eq!(output.exit_status, 3);
    assert_eq!(output.diagnostics.trim(), "detector crashed");

    let err = parse_output(&output).unwrap_err();
    assert!(matches!(err, Error::ExtractionFailed { status: 3, .. }));
}

#[test]
fn test_timeout_kills_process() {
    let options = ExtractorOptions::default().with_timeout(Duration::from_millis(200));
    let started = Instant::now();

    let output = shell("sleep 10; echo late").read_tables(Path::new("in.pdf"), &options);

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(output.exit_status, -1);
    assert_eq!(output.diagnostics, "timeout");
}

#[test]
fn test_output_kept_when_background_process_holds_pipe() {
    let started = Instant::now();

    let output = shell("echo '[]'; sleep 1 &")
        .read_tables(Path::new("in.pdf"), &ExtractorOptions::default());

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(output.exit_status, 0);
    assert_eq!(output.payload.trim(), "[]");
    assert!(parse_output(&output).unwrap().is_empty());
}

#[test]
fn test_lingering_background_process_killed_at_deadline() {
    let options = ExtractorOptions::default().with_timeout(Duration::from_millis(500));
    let started = Instant::now();

    let output = shell("echo '[]'; sleep 30 &").read_tables(Path::new("in.pdf"), &options);

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(output.exit_status, 0);
    assert_eq!(output.payload.trim(), "[]");
}

/// True once `pid` is gone or only a zombie waiting to be reaped.
#[cfg(target_os = "linux")]
fn is_dead(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .map(|rest| rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        Err(_) => true,
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_timeout_kills_child_processes() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("child.pid");
    let extractor = shell(r#"sleep 30 & echo $! > "$PID_FILE"; wait"#)
        .with_env("PID_FILE", pid_file.to_string_lossy());
    let options = ExtractorOptions::default().with_timeout(Duration::from_millis(300));

    let output = extractor.read_tables(Path::new("in.pdf"), &options);
    assert_eq!(output.diagnostics, "timeout");

    let pid: u32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    let deadline = Instant::now() + Duration::from_secs(2);
    while !is_dead(pid) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(is_dead(pid), "background process {pid} survived the timeout");
}

#[test]
fn test_missing_program_reports_failure() {
    let extractor = ProcessExtractor::new("/nonexistent/table-detector");
    let mut page = Page::letter(1);
    page.add_text(BoundingBox::new(0.0, 0.0, 10.0, 10.0), "x");
    let before = page.clone();

    let err = detect_page_tables("in.pdf", &mut page, Arc::new(extractor)).unwrap_err();
    assert!(matches!(err, Error::ExtractionFailed { status: -1, .. }));
    assert_eq!(page, before);
}
