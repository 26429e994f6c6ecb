//! Error types for untable library.

use std::io;
use thiserror::Error;

/// Result type alias for untable operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during table detection.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading files or talking to the extractor process.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The external extractor exited with a nonzero status or timed out.
    #[error("Table extraction failed (status {status}): {diagnostics}")]
    ExtractionFailed {
        /// Exit status reported by the extractor (-1 for timeout or spawn failure)
        status: i32,
        /// Diagnostic text (stderr) from the extractor
        diagnostics: String,
    },

    /// The extractor succeeded but its payload could not be parsed.
    #[error("Malformed extractor output: {0}")]
    MalformedOutput(String),

    /// A recognized extractor option carried a value of the wrong type.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error only affects the page being processed.
    ///
    /// Pages that fail this way keep their original elements; the pipeline
    /// moves on to the next page.
    pub fn is_page_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ExtractionFailed { .. } | Error::MalformedOutput(_)
        )
    }
}

/// Why a table descriptor or a single cell was discarded.
///
/// Drops are never surfaced as [`Error`]s; they only shrink the output and
/// are logged as warnings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DropReason {
    /// A required geometry field was absent.
    #[error("missing geometry field `{0}`")]
    MissingGeometry(&'static str),

    /// A bounding box was non-finite or inverted.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The descriptor had no usable cells.
    #[error("descriptor has no cells")]
    NoCells,

    /// Edge clustering produced zero bands on an axis.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A cell collides with a cell already placed in the grid.
    #[error("cell overlaps an already placed cell at row {row}, column {column}")]
    OverlappingCell {
        /// Grid row of the first occupied slot
        row: usize,
        /// Grid column of the first occupied slot
        column: usize,
    },

    /// The table region overlaps another region detected in the same pass.
    #[error("table region overlaps table {0} of the same pass")]
    OverlappingRegion(usize),

    /// The table region already holds a synthesized table.
    #[error("region already contains a detected table")]
    AlreadyDetected,

    /// The descriptor belongs to another page.
    #[error("descriptor belongs to page {found}, expected page {expected}")]
    WrongPage {
        /// Page being processed
        expected: u32,
        /// Page named by the descriptor
        found: u32,
    },
}

/// A record of something dropped during detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Dropped {
    /// Index of the table descriptor in payload order
    pub table: usize,
    /// Index of the cell within the descriptor, if only a cell was dropped
    pub cell: Option<usize>,
    /// Why it was dropped
    pub reason: DropReason,
}

impl Dropped {
    /// A whole table descriptor was dropped.
    pub fn table(table: usize, reason: DropReason) -> Self {
        Self {
            table,
            cell: None,
            reason,
        }
    }

    /// A single cell of a descriptor was dropped.
    pub fn cell(table: usize, cell: usize, reason: DropReason) -> Self {
        Self {
            table,
            cell: Some(cell),
            reason,
        }
    }

    /// Log the drop at warning level.
    pub(crate) fn warn(&self) {
        match self.cell {
            Some(cell) => log::warn!(
                "dropped cell {} of table {}: {}",
                cell,
                self.table,
                self.reason
            ),
            None => log::warn!("dropped table {}: {}", self.table, self.reason),
        }
    }
}
