//! Integration tests for table detection on pages and documents.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use untable::extractor::{ExtractorOptions, ExtractorOutput, PageSelection, TableExtractor};
use untable::integrate::TableDetection;
use untable::model::{BoundingBox, Document, ElementKind, ElementTag, Page};
use untable::{detect_page_tables, detect_tables, DropReason, Error, StaticExtractor};

const ONE_TABLE: &str = include_str!("fixtures/table-detection-one-table.json");

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Page laid out like the fixture: a title, one word per table cell, a footer.
fn report_page() -> Page {
    let mut page = Page::letter(1);
    page.add_text(BoundingBox::new(50.0, 40.0, 400.0, 60.0), "Quarterly report");

    let rows = [
        vec!["Region", "Q1", "Q2", "Q3", "Total"],
        vec!["", "Sales", "Sales", "Sales", "Units", "Revenue"],
        vec!["North", "120", "135", "150", "405", "40,500"],
        vec!["South", "98", "110", "101", "309", "30,900"],
    ];
    for (r, words) in rows.iter().enumerate() {
        let top = 100.0 + 20.0 * r as f32;
        for (c, word) in words.iter().enumerate() {
            if word.is_empty() {
                continue;
            }
            let left = 55.0 + 80.0 * c as f32;
            page.add_text(BoundingBox::new(left, top + 4.0, left + 40.0, top + 14.0), *word);
        }
    }

    page.add_text(BoundingBox::new(50.0, 700.0, 300.0, 715.0), "Page 1");
    page
}

fn table_of(page: &Page) -> Option<&untable::Table> {
    page.elements.iter().find_map(|e| e.as_table())
}

/// Extractor that fails a fixed number of times before succeeding.
struct FlakyExtractor {
    failures: usize,
    calls: AtomicUsize,
    payload: String,
}

impl TableExtractor for FlakyExtractor {
    fn read_tables(&self, _path: &Path, _options: &ExtractorOptions) -> ExtractorOutput {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            ExtractorOutput::failure(1, "transient failure")
        } else {
            ExtractorOutput::success(self.payload.clone())
        }
    }
}

/// Extractor that fails for one page and finds nothing elsewhere.
struct FailingPageExtractor {
    failing_page: u32,
}

impl TableExtractor for FailingPageExtractor {
    fn read_tables(&self, _path: &Path, options: &ExtractorOptions) -> ExtractorOutput {
        if options.pages == PageSelection::Pages(vec![self.failing_page]) {
            ExtractorOutput::failure(3, "cannot read page")
        } else {
            ExtractorOutput::success("[]")
        }
    }
}

#[test]
fn test_no_table_detected() {
    let mut page = report_page();
    let before = page.clone();

    let report = detect_page_tables("report.pdf", &mut page, Arc::new(StaticExtractor::empty()))
        .unwrap();

    assert_eq!(report.tables_inserted, 0);
    assert!(table_of(&page).is_none());
    assert_eq!(page, before);
}

#[test]
fn test_one_table_detected() {
    init_logging();
    let mut page = report_page();
    let extractor = Arc::new(StaticExtractor::with_payload(ONE_TABLE));

    let report = detect_page_tables("report.pdf", &mut page, extractor).unwrap();
    assert_eq!(report.tables_inserted, 1);
    assert!(report.dropped.is_empty());

    let table = table_of(&page).expect("table should be detected");
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.column_count(), 6);
    assert!(table.occupancy().is_some());
}

#[test]
fn test_first_row_cell_with_row_span() {
    let mut page = report_page();
    let extractor = Arc::new(StaticExtractor::with_payload(ONE_TABLE));
    detect_page_tables("report.pdf", &mut page, extractor).unwrap();

    let table = table_of(&page).unwrap();
    assert_eq!(table.rows[0].cells[0].rowspan, 2);
    assert_eq!(table.rows[0].cells[0].text, "Region");
    // the covered slot is not emitted again
    assert_eq!(table.rows[1].cells.len(), 5);
    assert_eq!(table.rows[1].cells[0].text, "Sales");
}

#[test]
fn test_first_row_last_cell_with_col_span() {
    let mut page = report_page();
    let extractor = Arc::new(StaticExtractor::with_payload(ONE_TABLE));
    detect_page_tables("report.pdf", &mut page, extractor).unwrap();

    let table = table_of(&page).unwrap();
    assert_eq!(table.rows[0].cells.len(), 5);
    assert_eq!(table.rows[0].cells[4].colspan, 2);
    assert_eq!(table.rows[0].cells[4].text, "Total");
}

#[test]
fn test_table_takes_place_of_consumed_elements() {
    let mut page = report_page();
    let word_count = page.elements.len() - 2;
    let extractor = Arc::new(StaticExtractor::with_payload(ONE_TABLE));

    let report = detect_page_tables("report.pdf", &mut page, extractor).unwrap();
    assert_eq!(report.elements_consumed, word_count);

    let tags: Vec<ElementTag> = page.elements.iter().map(|e| e.tag()).collect();
    assert_eq!(tags, vec![ElementTag::Text, ElementTag::Table, ElementTag::Text]);
    assert_eq!(page.elements[0].plain_text(), "Quarterly report");
    assert_eq!(page.elements[2].plain_text(), "Page 1");
    assert_eq!(page.elements[1].bbox, BoundingBox::new(50.0, 100.0, 530.0, 180.0));
    assert_eq!(page.elements[1].id, report.inserted[0]);

    // consumed words end up inside the cells
    let table = table_of(&page).unwrap();
    let north = &table.rows[2].cells[0];
    assert_eq!(north.content.len(), 1);
    assert_eq!(north.content[0].plain_text(), "North");
}

#[test]
fn test_detection_is_idempotent() {
    init_logging();
    let mut page = report_page();
    let extractor = Arc::new(StaticExtractor::with_payload(ONE_TABLE));
    let detection = TableDetection::new(extractor);

    detection.detect_page(Path::new("report.pdf"), &mut page).unwrap();
    let once = page.clone();

    let report = detection.detect_page(Path::new("report.pdf"), &mut page).unwrap();
    assert_eq!(page, once);
    assert_eq!(report.tables_inserted, 0);
    assert_eq!(report.dropped[0].reason, DropReason::AlreadyDetected);
}

#[test]
fn test_empty_rerun_keeps_synthesized_table() {
    let mut page = report_page();
    detect_page_tables(
        "report.pdf",
        &mut page,
        Arc::new(StaticExtractor::with_payload(ONE_TABLE)),
    )
    .unwrap();
    let once = page.clone();

    let report =
        detect_page_tables("report.pdf", &mut page, Arc::new(StaticExtractor::empty())).unwrap();
    assert_eq!(report.tables_inserted, 0);
    assert!(report.dropped.is_empty());
    assert_eq!(page, once);
}

#[test]
fn test_extraction_failure_leaves_page_unchanged() {
    let mut page = report_page();
    let before = page.clone();
    let extractor = Arc::new(StaticExtractor::new(ExtractorOutput {
        exit_status: 1,
        diagnostics: "Traceback: ghostscript not found".to_string(),
        payload: ONE_TABLE.to_string(),
    }));

    let err = detect_page_tables("report.pdf", &mut page, extractor).unwrap_err();
    match err {
        Error::ExtractionFailed {
            status,
            diagnostics,
        } => {
            assert_eq!(status, 1);
            assert!(diagnostics.contains("ghostscript"));
        }
        other => panic!("expected ExtractionFailed, got {:?}", other),
    }
    assert_eq!(page, before);
}

#[test]
fn test_malformed_output_leaves_page_unchanged() {
    let mut page = report_page();
    let before = page.clone();
    let extractor = Arc::new(StaticExtractor::with_payload("Usage: camelot [OPTIONS]"));

    let err = detect_page_tables("report.pdf", &mut page, extractor).unwrap_err();
    assert!(matches!(err, Error::MalformedOutput(_)));
    assert_eq!(page, before);
}

#[test]
fn test_retry_after_transient_failure() {
    init_logging();
    let extractor = Arc::new(FlakyExtractor {
        failures: 2,
        calls: AtomicUsize::new(0),
        payload: ONE_TABLE.to_string(),
    });
    let detection = TableDetection::new(extractor.clone()).with_max_attempts(3);
    let mut page = report_page();

    let report = detection.detect_page(Path::new("report.pdf"), &mut page).unwrap();
    assert_eq!(report.tables_inserted, 1);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_document_with_failing_page() {
    init_logging();
    let mut document = Document::new("report.pdf");
    for number in 1..=3 {
        let mut page = report_page();
        page.number = number;
        for element in &mut page.elements {
            element.page = number;
        }
        document.add_page(page);
    }
    let before = document.pages.clone();

    let report = detect_tables(&mut document, Arc::new(FailingPageExtractor { failing_page: 2 }));

    assert!(!report.is_complete());
    assert_eq!(report.failed_pages(), vec![2]);
    assert_eq!(report.pages.len(), 2);
    assert_eq!(document.pages, before);
}

#[test]
fn test_sequential_document_detection() {
    let mut document = Document::new("report.pdf");
    document.add_page(report_page());

    let detection =
        TableDetection::new(Arc::new(StaticExtractor::with_payload(ONE_TABLE))).sequential();
    let report = detection.detect_document(&mut document);

    assert!(report.is_complete());
    assert_eq!(report.tables_inserted(), 1);
    let page = document.get_page(1).unwrap();
    assert!(matches!(
        page.elements[1].kind,
        ElementKind::Table(ref t) if t.rows.len() == 4
    ));
}
