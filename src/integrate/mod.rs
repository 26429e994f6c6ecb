//! Table detection pass over pages and documents.
//!
//! [`TableDetection`] ties the pieces together: it asks a
//! [`TableExtractor`] for the tables of one page, parses the result,
//! reconstructs each table's grid and splices the tables into the page.

mod splice;

pub use splice::{integrate, Integration, IntegrationConfig, PlacedTable};

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{DropReason, Dropped, Error, Result};
use crate::extractor::{ExtractorOptions, ExtractorOutput, TableExtractor};
use crate::grid::{GridConfig, GridReconstructor};
use crate::model::{Document, ElementId, Page};
use crate::parser::{parse_output, ParsedOutput};

/// Outcome of detection on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageReport {
    /// Page number (1-indexed)
    pub page: u32,

    /// Number of tables added to the page
    pub tables_inserted: usize,

    /// Ids of the table elements added, in page order of detection
    pub inserted: Vec<ElementId>,

    /// Number of page elements moved into tables
    pub elements_consumed: usize,

    /// Tables and cells that were discarded
    pub dropped: Vec<Dropped>,
}

/// Outcome of detection on a whole document.
#[derive(Debug, Default)]
pub struct DocumentReport {
    /// Reports of the pages that were processed
    pub pages: Vec<PageReport>,

    /// Pages that failed, with the error; these pages are unchanged
    pub failures: Vec<(u32, Error)>,
}

impl DocumentReport {
    /// Numbers of the pages that failed.
    pub fn failed_pages(&self) -> Vec<u32> {
        self.failures.iter().map(|(page, _)| *page).collect()
    }

    /// Total number of tables added across the document.
    pub fn tables_inserted(&self) -> usize {
        self.pages.iter().map(|p| p.tables_inserted).sum()
    }

    /// Check if every page was processed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Table detection driver.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use untable::extractor::ProcessExtractor;
/// use untable::integrate::TableDetection;
/// use untable::model::Document;
///
/// let extractor = Arc::new(ProcessExtractor::new("camelot-json"));
/// let detection = TableDetection::new(extractor).with_max_attempts(2);
///
/// let mut document = Document::new("report.pdf");
/// let report = detection.detect_document(&mut document);
/// println!("{} tables", report.tables_inserted());
/// ```
pub struct TableDetection {
    extractor: Arc<dyn TableExtractor>,
    options: ExtractorOptions,
    grid: GridReconstructor,
    integration: IntegrationConfig,
    max_attempts: u32,
    parallel: bool,
}

impl TableDetection {
    /// Create a detection pass with default configuration.
    pub fn new(extractor: Arc<dyn TableExtractor>) -> Self {
        Self {
            extractor,
            options: ExtractorOptions::default(),
            grid: GridReconstructor::new(),
            integration: IntegrationConfig::default(),
            max_attempts: 1,
            parallel: true,
        }
    }

    /// Set the options handed to the extractor.
    ///
    /// The page selection is narrowed to the page being processed.
    pub fn with_options(mut self, options: ExtractorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_grid_config(mut self, config: GridConfig) -> Self {
        self.grid = GridReconstructor::with_config(config);
        self
    }

    pub fn with_integration_config(mut self, config: IntegrationConfig) -> Self {
        self.integration = config;
        self
    }

    /// Run the extractor up to `attempts` times when it fails (at least once).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Process pages one after the other.
    pub fn sequential(self) -> Self {
        self.with_parallel(false)
    }

    /// Detect the tables of one page and splice them in.
    ///
    /// On error the page is left unchanged.
    pub fn detect_page(&self, path: &Path, page: &mut Page) -> Result<PageReport> {
        if !self.options.pages.includes(page.number) {
            log::debug!("detect_page: page {} not selected", page.number);
            return Ok(PageReport {
                page: page.number,
                ..Default::default()
            });
        }
        let options = self.options.clone().with_page(page.number);

        let parsed = self.extract(path, &options, page.number)?;
        let mut dropped = parsed.dropped;

        let mut placed = Vec::with_capacity(parsed.descriptors.len());
        for descriptor in &parsed.descriptors {
            if let Some(found) = descriptor.page {
                if found != page.number {
                    let record = Dropped::table(
                        descriptor.index,
                        DropReason::WrongPage {
                            expected: page.number,
                            found,
                        },
                    );
                    record.warn();
                    dropped.push(record);
                    continue;
                }
            }

            match self.grid.reconstruct(descriptor) {
                Ok(reconstruction) => {
                    for (cell, reason) in reconstruction.dropped_cells {
                        let record = Dropped::cell(descriptor.index, cell, reason);
                        record.warn();
                        dropped.push(record);
                    }
                    placed.push(PlacedTable {
                        source: descriptor.index,
                        region: descriptor.region,
                        table: reconstruction.table,
                    });
                }
                Err(reason) => {
                    let record = Dropped::table(descriptor.index, reason);
                    record.warn();
                    dropped.push(record);
                }
            }
        }

        let integration = integrate(page, placed, &self.integration);
        dropped.extend(integration.dropped);
        page.elements = integration.elements;

        log::info!(
            "page {}: {} tables inserted, {} elements consumed, {} dropped",
            page.number,
            integration.inserted.len(),
            integration.consumed,
            dropped.len()
        );

        Ok(PageReport {
            page: page.number,
            tables_inserted: integration.inserted.len(),
            inserted: integration.inserted,
            elements_consumed: integration.consumed,
            dropped,
        })
    }

    /// Detect tables on every page of a document.
    ///
    /// Pages are independent: a failing page is recorded in the report and
    /// left unchanged while the others are processed.
    pub fn detect_document(&self, document: &mut Document) -> DocumentReport {
        let path = document.source.clone();
        let run = |page: &mut Page| (page.number, self.detect_page(&path, page));

        let results: Vec<(u32, Result<PageReport>)> = if self.parallel {
            document.pages.par_iter_mut().map(run).collect()
        } else {
            document.pages.iter_mut().map(run).collect()
        };

        let mut report = DocumentReport::default();
        for (number, result) in results {
            match result {
                Ok(page) => report.pages.push(page),
                Err(e) => {
                    log::error!("page {}: table detection failed: {}", number, e);
                    report.failures.push((number, e));
                }
            }
        }
        report
    }

    /// Run the extractor with retries and parse its output.
    fn extract(&self, path: &Path, options: &ExtractorOptions, page: u32) -> Result<ParsedOutput> {
        let mut attempt = 1;
        loop {
            let output: ExtractorOutput = self.extractor.read_tables(path, options);
            match parse_output(&output) {
                Ok(parsed) => return Ok(parsed),
                Err(e @ Error::ExtractionFailed { .. }) if attempt < self.max_attempts => {
                    log::warn!(
                        "page {}: {} attempt {}/{} failed: {}",
                        page,
                        self.extractor.name(),
                        attempt,
                        self.max_attempts,
                        e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{PageSelection, StaticExtractor};
    use crate::model::{BoundingBox, ElementTag};

    fn page_with_words() -> Page {
        let mut page = Page::letter(1);
        page.add_text(BoundingBox::new(50.0, 20.0, 300.0, 40.0), "Title");
        page.add_text(BoundingBox::new(60.0, 105.0, 90.0, 115.0), "A");
        page.add_text(BoundingBox::new(160.0, 105.0, 190.0, 115.0), "B");
        page
    }

    const ONE_TABLE: &str = r#"[{
        "page": 1,
        "region": [50, 100, 250, 120],
        "cells": [
            {"bbox": [50, 100, 150, 120], "text": "A"},
            {"bbox": [150, 100, 250, 120], "text": "B"}
        ]
    }]"#;

    #[test]
    fn test_detect_page_inserts_table() {
        let extractor = Arc::new(StaticExtractor::with_payload(ONE_TABLE));
        let detection = TableDetection::new(extractor.clone());
        let mut page = page_with_words();

        let report = detection.detect_page(Path::new("doc.pdf"), &mut page).unwrap();
        assert_eq!(report.tables_inserted, 1);
        assert_eq!(report.elements_consumed, 2);
        assert_eq!(page.elements.len(), 2);
        assert_eq!(page.elements[1].tag(), ElementTag::Table);

        let (path, options) = extractor.last_call().unwrap();
        assert_eq!(path, Path::new("doc.pdf"));
        assert_eq!(options.pages, PageSelection::Pages(vec![1]));
    }

    #[test]
    fn test_failure_leaves_page_unchanged() {
        let extractor = Arc::new(StaticExtractor::new(ExtractorOutput::failure(2, "boom")));
        let detection = TableDetection::new(extractor.clone()).with_max_attempts(3);
        let mut page = page_with_words();
        let before = page.clone();

        let err = detection.detect_page(Path::new("doc.pdf"), &mut page).unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed { status: 2, .. }));
        assert_eq!(page, before);
        assert_eq!(extractor.calls(), 3);
    }

    #[test]
    fn test_malformed_output_is_not_retried() {
        let extractor = Arc::new(StaticExtractor::with_payload("garbage"));
        let detection = TableDetection::new(extractor.clone()).with_max_attempts(3);
        let mut page = page_with_words();

        let err = detection.detect_page(Path::new("doc.pdf"), &mut page).unwrap_err();
        assert!(matches!(err, Error::MalformedOutput(_)));
        assert_eq!(extractor.calls(), 1);
    }

    #[test]
    fn test_wrong_page_descriptor_dropped() {
        let extractor = Arc::new(StaticExtractor::with_payload(ONE_TABLE));
        let detection = TableDetection::new(extractor);
        let mut page = page_with_words();
        page.number = 2;
        let before = page.elements.clone();

        let report = detection.detect_page(Path::new("doc.pdf"), &mut page).unwrap();
        assert_eq!(report.tables_inserted, 0);
        assert_eq!(page.elements, before);
        assert_eq!(
            report.dropped,
            vec![Dropped::table(
                0,
                DropReason::WrongPage {
                    expected: 2,
                    found: 1
                }
            )]
        );
    }

    #[test]
    fn test_unselected_page_skips_extractor() {
        let extractor = Arc::new(StaticExtractor::with_payload(ONE_TABLE));
        let options = ExtractorOptions::default().with_pages(PageSelection::Range(3..=4));
        let detection = TableDetection::new(extractor.clone()).with_options(options);
        let mut page = page_with_words();

        let report = detection.detect_page(Path::new("doc.pdf"), &mut page).unwrap();
        assert_eq!(report.tables_inserted, 0);
        assert_eq!(extractor.calls(), 0);
    }

    #[test]
    fn test_document_report_counts() {
        let mut report = DocumentReport::default();
        report.pages.push(PageReport {
            page: 1,
            tables_inserted: 2,
            ..Default::default()
        });
        report.failures.push((2, Error::Other("x".to_string())));
        assert_eq!(report.tables_inserted(), 2);
        assert_eq!(report.failed_pages(), vec![2]);
        assert!(!report.is_complete());
    }
}
