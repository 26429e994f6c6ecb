//! # untable
//!
//! Table detection and table structure synthesis for extracted documents.
//!
//! A document arrives as pages of positioned elements (text runs, images,
//! rules) with no notion of tables. This library runs an external table
//! detector over the source PDF, recovers each table's row and column grid
//! from the cell boxes it reports, and replaces the elements lying inside
//! each table with a single structured [`Table`] element.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use untable::{detect_tables, Document, ProcessExtractor};
//!
//! fn main() -> untable::Result<()> {
//!     let mut document = Document::new("report.pdf");
//!     // ... fill pages from a text extraction pass ...
//!
//!     let extractor = Arc::new(ProcessExtractor::new("camelot-json"));
//!     let report = detect_tables(&mut document, extractor);
//!     println!("{} tables found", report.tables_inserted());
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - [`extractor`]: runs the detector and captures status, stderr and stdout
//! - [`parser`]: validates the JSON payload into table descriptors
//! - [`grid`]: clusters cell edges into grid lines and derives spans
//! - [`integrate`]: splices tables into pages and drives whole documents

pub mod error;
pub mod extractor;
pub mod grid;
pub mod integrate;
pub mod model;
pub mod parser;

// Re-export commonly used types
pub use error::{DropReason, Dropped, Error, Result};
pub use extractor::{
    ExtractorOptions, ExtractorOutput, Flavor, PageSelection, ProcessExtractor, StaticExtractor,
    TableExtractor,
};
pub use grid::{GridConfig, GridReconstructor};
pub use integrate::{DocumentReport, IntegrationConfig, PageReport, TableDetection};
pub use model::{
    BoundingBox, Document, Element, ElementId, ElementKind, ElementTag, Page, Table, TableCell,
    TableRow,
};
pub use parser::{parse_output, TableDescriptor};

use std::path::Path;
use std::sync::Arc;

/// Detect tables on every page of a document with default settings.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use untable::{detect_tables, Document, StaticExtractor};
///
/// let mut document = Document::new("report.pdf");
/// let report = detect_tables(&mut document, Arc::new(StaticExtractor::empty()));
/// assert!(report.is_complete());
/// ```
pub fn detect_tables(document: &mut Document, extractor: Arc<dyn TableExtractor>) -> DocumentReport {
    TableDetection::new(extractor).detect_document(document)
}

/// Detect tables on a single page with default settings.
///
/// The page is left unchanged when detection fails.
pub fn detect_page_tables<P: AsRef<Path>>(
    path: P,
    page: &mut Page,
    extractor: Arc<dyn TableExtractor>,
) -> Result<PageReport> {
    TableDetection::new(extractor).detect_page(path.as_ref(), page)
}
