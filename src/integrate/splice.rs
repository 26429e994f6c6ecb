//! Splicing synthesized tables into a page's element sequence.

use crate::error::{DropReason, Dropped};
use crate::model::{BoundingBox, Element, ElementId, ElementTag, Page, Table};

/// Configuration for page integration.
#[derive(Debug, Clone)]
pub struct IntegrationConfig {
    /// Share of an element's area that must lie inside a table region for
    /// the element to be consumed by the table
    pub containment_ratio: f32,

    /// Share of the smaller region a new table may share with another
    /// table, new or already on the page, before it is dropped
    pub overlap_tolerance: f32,

    /// Move consumed elements into the cells they fall in
    pub distribute_content: bool,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            containment_ratio: 0.5,
            overlap_tolerance: 0.05,
            distribute_content: true,
        }
    }
}

impl IntegrationConfig {
    pub fn with_containment_ratio(mut self, ratio: f32) -> Self {
        self.containment_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn with_overlap_tolerance(mut self, tolerance: f32) -> Self {
        self.overlap_tolerance = tolerance.clamp(0.0, 1.0);
        self
    }

    pub fn with_distribute_content(mut self, distribute: bool) -> Self {
        self.distribute_content = distribute;
        self
    }
}

/// A reconstructed table waiting to be placed on its page.
#[derive(Debug, Clone)]
pub struct PlacedTable {
    /// Position of the descriptor in the payload
    pub source: usize,
    /// Region the detector reported for the table
    pub region: BoundingBox,
    /// The table itself
    pub table: Table,
}

/// New element sequence of a page plus bookkeeping.
#[derive(Debug, Clone)]
pub struct Integration {
    /// The page's elements with the tables spliced in
    pub elements: Vec<Element>,
    /// Ids of the inserted table elements, in payload order
    pub inserted: Vec<ElementId>,
    /// Number of page elements moved into tables
    pub consumed: usize,
    /// Tables that were not placed
    pub dropped: Vec<Dropped>,
}

struct Accepted {
    placed: PlacedTable,
    /// Index of the element the table is inserted in front of
    position: usize,
    consumed: Vec<usize>,
}

/// Splice tables into a page, returning the new element sequence.
///
/// The page itself is not modified. Each table consumes the elements lying
/// inside its region and takes the position of the first of them; every
/// other element keeps its relative order. Tables are handled in the given
/// order and must not overlap each other or a table already on the page.
pub fn integrate(page: &Page, tables: Vec<PlacedTable>, config: &IntegrationConfig) -> Integration {
    let elements = &page.elements;
    let mut owner: Vec<Option<usize>> = vec![None; elements.len()];
    let mut accepted: Vec<Accepted> = Vec::new();
    let mut dropped = Vec::new();

    for placed in tables {
        if let Some(reason) = conflict(page, &accepted, &placed.region, config) {
            let record = Dropped::table(placed.source, reason);
            record.warn();
            dropped.push(record);
            continue;
        }

        if placed.table.cell_count() == 0 {
            let record = Dropped::table(
                placed.source,
                DropReason::DegenerateGeometry("table has no cells".to_string()),
            );
            record.warn();
            dropped.push(record);
            continue;
        }

        let consumed: Vec<usize> = elements
            .iter()
            .enumerate()
            .filter(|(i, e)| {
                owner[*i].is_none()
                    && !e.is(ElementTag::Table)
                    && e.bbox.is_inside(&placed.region, config.containment_ratio)
            })
            .map(|(i, _)| i)
            .collect();

        let position = match consumed.first() {
            Some(&first) => first,
            None => reading_position(elements, &owner, &placed.region),
        };

        let slot = accepted.len();
        for &i in &consumed {
            owner[i] = Some(slot);
        }
        log::debug!(
            "integrate: table {} consumes {} elements, inserted at {}",
            placed.source,
            consumed.len(),
            position
        );
        accepted.push(Accepted {
            placed,
            position,
            consumed,
        });
    }

    if accepted.is_empty() {
        return Integration {
            elements: elements.clone(),
            inserted: Vec::new(),
            consumed: 0,
            dropped,
        };
    }

    let mut next_id = page.next_element_id().0;
    let mut table_elements: Vec<Option<Element>> = Vec::with_capacity(accepted.len());
    let mut inserted = Vec::with_capacity(accepted.len());
    let mut consumed_total = 0;

    for entry in &mut accepted {
        let mut table = std::mem::take(&mut entry.placed.table);
        if config.distribute_content {
            let content: Vec<&Element> = entry.consumed.iter().map(|&i| &elements[i]).collect();
            distribute(&mut table, &content, config.containment_ratio);
        }
        consumed_total += entry.consumed.len();

        let id = ElementId(next_id);
        next_id += 1;
        inserted.push(id);
        table_elements.push(Some(Element::table(
            id,
            page.number,
            entry.placed.region,
            table,
        )));
    }

    // Tables grouped by the element they precede; `elements.len()` = at the end.
    let mut before: Vec<Vec<usize>> = vec![Vec::new(); elements.len() + 1];
    for (slot, entry) in accepted.iter().enumerate() {
        before[entry.position].push(slot);
    }

    let mut output = Vec::with_capacity(elements.len() + accepted.len() - consumed_total);
    for (i, group) in before.iter().enumerate() {
        for &slot in group {
            if let Some(table) = table_elements[slot].take() {
                output.push(table);
            }
        }
        if let Some(element) = elements.get(i) {
            if owner[i].is_none() {
                output.push(element.clone());
            }
        }
    }

    Integration {
        elements: output,
        inserted,
        consumed: consumed_total,
        dropped,
    }
}

/// Check a candidate region against existing and already accepted tables.
fn conflict(
    page: &Page,
    accepted: &[Accepted],
    region: &BoundingBox,
    config: &IntegrationConfig,
) -> Option<DropReason> {
    let already_detected = page
        .elements_of(ElementTag::Table)
        .any(|existing| overlaps(region, &existing.bbox, config));
    if already_detected {
        return Some(DropReason::AlreadyDetected);
    }

    accepted
        .iter()
        .find(|other| overlaps(region, &other.placed.region, config))
        .map(|other| DropReason::OverlappingRegion(other.placed.source))
}

/// Two regions overlap when they share more than `overlap_tolerance` of the
/// smaller one. Zero-area regions fall back to the containment test.
fn overlaps(a: &BoundingBox, b: &BoundingBox, config: &IntegrationConfig) -> bool {
    let smaller = a.area().min(b.area());
    if smaller > 0.0 {
        a.intersection_area(b) / smaller > config.overlap_tolerance
    } else {
        a.is_inside(b, config.containment_ratio) || b.is_inside(a, config.containment_ratio)
    }
}

/// Where a table that consumed nothing goes: before the first remaining
/// element starting at or below the region's top edge.
fn reading_position(elements: &[Element], owner: &[Option<usize>], region: &BoundingBox) -> usize {
    elements
        .iter()
        .enumerate()
        .find(|(i, e)| owner[*i].is_none() && e.bbox.top >= region.top)
        .map(|(i, _)| i)
        .unwrap_or(elements.len())
}

/// Move consumed elements into the cell containing them, else the nearest cell.
fn distribute(table: &mut Table, content: &[&Element], containment_ratio: f32) {
    let boxes: Vec<Option<BoundingBox>> = table
        .rows
        .iter()
        .flat_map(|r| r.cells.iter().map(|c| c.bbox))
        .collect();
    if boxes.is_empty() {
        return;
    }

    let mut buckets: Vec<Vec<Element>> = vec![Vec::new(); boxes.len()];
    for element in content {
        let containing = boxes.iter().position(|b| {
            b.map(|b| element.bbox.is_inside(&b, containment_ratio))
                .unwrap_or(false)
        });
        let target = containing.unwrap_or_else(|| {
            boxes
                .iter()
                .enumerate()
                .filter_map(|(i, b)| b.map(|b| (i, element.bbox.center_distance_sq(&b))))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i)
                .unwrap_or(0)
        });
        buckets[target].push((*element).clone());
    }

    for (cell, bucket) in table.cells_mut().zip(buckets) {
        cell.content.extend(bucket);
    }
}
