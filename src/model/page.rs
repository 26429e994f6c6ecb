//! Page-level types.

use super::{BoundingBox, Element, ElementId, ElementKind, ElementTag, Table};
use serde::{Deserialize, Serialize};

/// A single page in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Elements on the page, in reading order
    pub elements: Vec<Element>,
}

impl Page {
    /// Create a new page with the given dimensions.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            elements: Vec::new(),
        }
    }

    /// Create a new page with standard Letter size (8.5 x 11 inches).
    pub fn letter(number: u32) -> Self {
        Self::new(number, 612.0, 792.0) // 8.5 * 72, 11 * 72
    }

    /// Create a new page with standard A4 size (210 x 297 mm).
    pub fn a4(number: u32) -> Self {
        Self::new(number, 595.0, 842.0) // 210mm * 2.834, 297mm * 2.834
    }

    /// Next unused element id on this page.
    ///
    /// Ids of elements nested inside table cells are taken into account.
    pub fn next_element_id(&self) -> ElementId {
        fn max_id(elements: &[Element]) -> u64 {
            elements
                .iter()
                .map(|e| {
                    let nested = e
                        .as_table()
                        .map(|t| {
                            t.rows
                                .iter()
                                .flat_map(|r| &r.cells)
                                .map(|c| max_id(&c.content))
                                .max()
                                .unwrap_or(0)
                        })
                        .unwrap_or(0);
                    e.id.0.max(nested)
                })
                .max()
                .unwrap_or(0)
        }

        if self.elements.is_empty() {
            ElementId(1)
        } else {
            ElementId(max_id(&self.elements) + 1)
        }
    }

    /// Add an element of the given kind, allocating its id.
    ///
    /// Allocation scans the page; use [`Page::add_elements`] to add many.
    pub fn add_element(&mut self, bbox: BoundingBox, kind: ElementKind) -> ElementId {
        let id = self.next_element_id();
        self.elements.push(Element::new(id, self.number, bbox, kind));
        id
    }

    /// Add a batch of elements in order, allocating consecutive ids.
    pub fn add_elements(
        &mut self,
        elements: impl IntoIterator<Item = (BoundingBox, ElementKind)>,
    ) -> Vec<ElementId> {
        let first = self.next_element_id().0;
        let number = self.number;
        let start = self.elements.len();
        self.elements.extend(
            elements
                .into_iter()
                .zip(first..)
                .map(|((bbox, kind), id)| Element::new(ElementId(id), number, bbox, kind)),
        );
        self.elements[start..].iter().map(|e| e.id).collect()
    }

    /// Add a text element.
    pub fn add_text(&mut self, bbox: BoundingBox, text: impl Into<String>) -> ElementId {
        self.add_element(
            bbox,
            ElementKind::Text {
                text: text.into(),
                font_size: None,
            },
        )
    }

    /// Add an image element.
    pub fn add_image(&mut self, bbox: BoundingBox, resource_id: impl Into<String>) -> ElementId {
        self.add_element(
            bbox,
            ElementKind::Image {
                resource_id: resource_id.into(),
                alt_text: None,
            },
        )
    }

    /// Add a rule (drawn line).
    pub fn add_rule(&mut self, bbox: BoundingBox) -> ElementId {
        self.add_element(bbox, ElementKind::Rule)
    }

    /// Elements of one variant, in page order.
    pub fn elements_of(&self, tag: ElementTag) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(move |e| e.is(tag))
    }

    /// Tables on the page, in page order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.elements.iter().filter_map(|e| e.as_table())
    }

    pub fn table_count(&self) -> usize {
        self.tables().count()
    }

    /// Element ids in page order.
    pub fn element_ids(&self) -> Vec<ElementId> {
        self.elements.iter().map(|e| e.id).collect()
    }

    /// Get plain text content of the page.
    pub fn plain_text(&self) -> String {
        self.elements
            .iter()
            .map(|e| e.plain_text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check if the page is empty (no elements).
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Page bounds as a box.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, self.width, self.height)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::letter(1)
    }
}
