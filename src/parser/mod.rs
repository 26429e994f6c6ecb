//! Extractor result parsing.
//!
//! Turns an [`ExtractorOutput`] into validated [`TableDescriptor`]s. The
//! payload is a JSON sequence with one entry per detected table:
//!
//! ```json
//! [{"page": 1,
//!   "region": {"left": 50, "top": 100, "right": 550, "bottom": 300},
//!   "cells": [{"bbox": [50, 100, 150, 150], "text": "Name"}]}]
//! ```

mod descriptor;

pub use descriptor::{RawCell, TableDescriptor};

use serde_json::Value;

use crate::error::{Dropped, Error, Result};
use crate::extractor::ExtractorOutput;

/// Descriptors decoded from one extractor run.
#[derive(Debug, Clone, Default)]
pub struct ParsedOutput {
    /// Descriptors in payload order (page order of detected tables)
    pub descriptors: Vec<TableDescriptor>,

    /// Entries and cells discarded while decoding
    pub dropped: Vec<Dropped>,
}

impl ParsedOutput {
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Parse an extractor result.
///
/// A nonzero exit status fails with [`Error::ExtractionFailed`] whatever the
/// payload holds. A payload that is not a JSON sequence fails with
/// [`Error::MalformedOutput`]. An empty sequence means no tables and is not
/// an error. Entries lacking geometry are dropped with a warning.
pub fn parse_output(output: &ExtractorOutput) -> Result<ParsedOutput> {
    if !output.is_success() {
        return Err(Error::ExtractionFailed {
            status: output.exit_status,
            diagnostics: output.diagnostics.trim().to_string(),
        });
    }

    let value: Value = serde_json::from_str(&output.payload)
        .map_err(|e| Error::MalformedOutput(e.to_string()))?;

    let entries = match value {
        Value::Array(entries) => entries,
        other => {
            return Err(Error::MalformedOutput(format!(
                "expected a sequence of tables, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut parsed = ParsedOutput::default();
    for (index, entry) in entries.iter().enumerate() {
        match descriptor::decode_entry(index, entry) {
            Ok(decoded) => {
                for (cell, reason) in decoded.dropped_cells {
                    let dropped = Dropped::cell(index, cell, reason);
                    dropped.warn();
                    parsed.dropped.push(dropped);
                }
                parsed.descriptors.push(decoded.descriptor);
            }
            Err(reason) => {
                let dropped = Dropped::table(index, reason);
                dropped.warn();
                parsed.dropped.push(dropped);
            }
        }
    }

    log::debug!(
        "parse_output: {} descriptors, {} drops from {} entries",
        parsed.descriptors.len(),
        parsed.dropped.len(),
        entries.len()
    );

    Ok(parsed)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
