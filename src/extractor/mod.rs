//! Table extractor gateway.
//!
//! Table geometry comes from an external detection tool. The tool is
//! reached through the [`TableExtractor`] capability so the rest of the
//! crate never deals with processes directly and can be driven by a
//! deterministic stub.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use untable::extractor::{ExtractorOptions, ProcessExtractor, TableExtractor};
//!
//! let extractor = ProcessExtractor::new("python3").with_arg("detect_tables.py");
//! let output = extractor.read_tables(Path::new("report.pdf"), &ExtractorOptions::new().with_page(1));
//! if !output.is_success() {
//!     eprintln!("detection failed: {}", output.diagnostics);
//! }
//! ```

mod options;
mod process;

pub use options::{ExtractorOptions, Flavor, PageSelection, DEFAULT_TIMEOUT};
pub use process::ProcessExtractor;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Exit status used when the tool never produced one (timeout, spawn failure).
pub const NO_EXIT_STATUS: i32 = -1;

/// Normalized result of one extractor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorOutput {
    /// Process exit status (0 = success)
    pub exit_status: i32,

    /// Diagnostic text (stderr)
    pub diagnostics: String,

    /// Raw output payload (stdout)
    pub payload: String,
}

impl ExtractorOutput {
    /// A successful run with the given payload.
    pub fn success(payload: impl Into<String>) -> Self {
        Self {
            exit_status: 0,
            diagnostics: String::new(),
            payload: payload.into(),
        }
    }

    /// A failed run.
    pub fn failure(exit_status: i32, diagnostics: impl Into<String>) -> Self {
        Self {
            exit_status,
            diagnostics: diagnostics.into(),
            payload: String::new(),
        }
    }

    /// A run that was killed after exceeding its time limit.
    pub fn timed_out() -> Self {
        Self::failure(NO_EXIT_STATUS, "timeout")
    }

    pub fn is_success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Capability that runs table detection on a document.
///
/// Implementations never fail: a nonzero exit, a timeout or a tool that
/// cannot be started are all reported through [`ExtractorOutput`], and the
/// caller decides what to do with them.
pub trait TableExtractor: Send + Sync {
    /// Run detection on the document at `path`.
    fn read_tables(&self, path: &Path, options: &ExtractorOptions) -> ExtractorOutput;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        "extractor"
    }
}

/// Extractor that replays a fixed output.
///
/// Records how often it was called and with which options.
#[derive(Debug)]
pub struct StaticExtractor {
    output: ExtractorOutput,
    calls: AtomicUsize,
    last_call: Mutex<Option<(PathBuf, ExtractorOptions)>>,
}

impl StaticExtractor {
    /// Replay the given output on every call.
    pub fn new(output: ExtractorOutput) -> Self {
        Self {
            output,
            calls: AtomicUsize::new(0),
            last_call: Mutex::new(None),
        }
    }

    /// Replay a successful run with the given payload.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self::new(ExtractorOutput::success(payload))
    }

    /// Replay a run that detected no tables.
    pub fn empty() -> Self {
        Self::with_payload("[]")
    }

    /// Number of calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Arguments of the most recent call.
    pub fn last_call(&self) -> Option<(PathBuf, ExtractorOptions)> {
        self.last_call.lock().ok().and_then(|guard| guard.clone())
    }
}

impl TableExtractor for StaticExtractor {
    fn read_tables(&self, path: &Path, options: &ExtractorOptions) -> ExtractorOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_call.lock() {
            *last = Some((path.to_path_buf(), options.clone()));
        }
        self.output.clone()
    }

    fn name(&self) -> &str {
        "static"
    }
}
