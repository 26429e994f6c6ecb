//! Page elements.

use super::{BoundingBox, Table};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of an element within its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A positioned element on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Identity used for removal and bookkeeping
    pub id: ElementId,

    /// Page number the element belongs to (1-indexed)
    pub page: u32,

    /// Position on the page
    pub bbox: BoundingBox,

    /// What kind of element this is
    pub kind: ElementKind,
}

impl Element {
    /// Create a new element.
    pub fn new(id: ElementId, page: u32, bbox: BoundingBox, kind: ElementKind) -> Self {
        Self {
            id,
            page,
            bbox,
            kind,
        }
    }

    /// Create a text element.
    pub fn text(id: ElementId, page: u32, bbox: BoundingBox, text: impl Into<String>) -> Self {
        Self::new(
            id,
            page,
            bbox,
            ElementKind::Text {
                text: text.into(),
                font_size: None,
            },
        )
    }

    /// Create a table element.
    pub fn table(id: ElementId, page: u32, bbox: BoundingBox, table: Table) -> Self {
        Self::new(id, page, bbox, ElementKind::Table(table))
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Variant tag of this element.
    pub fn tag(&self) -> ElementTag {
        self.kind.tag()
    }

    /// Check if this element is of the given variant.
    pub fn is(&self, tag: ElementTag) -> bool {
        self.tag() == tag
    }

    /// Borrow the table if this element is one.
    pub fn as_table(&self) -> Option<&Table> {
        match &self.kind {
            ElementKind::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Get plain text content of the element.
    pub fn plain_text(&self) -> String {
        match &self.kind {
            ElementKind::Text { text, .. } => text.clone(),
            ElementKind::Image { alt_text, .. } => alt_text.clone().unwrap_or_default(),
            ElementKind::Rule => String::new(),
            ElementKind::Table(t) => t.plain_text(),
        }
    }
}

/// Element variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    /// A run of text
    Text {
        /// Text content
        text: String,
        /// Font size in points
        font_size: Option<f32>,
    },

    /// An image reference
    Image {
        /// Resource ID for the image
        resource_id: String,
        /// Alternative text
        alt_text: Option<String>,
    },

    /// A drawn line or separator
    Rule,

    /// A synthesized table
    Table(Table),
}

impl ElementKind {
    pub fn tag(&self) -> ElementTag {
        match self {
            ElementKind::Text { .. } => ElementTag::Text,
            ElementKind::Image { .. } => ElementTag::Image,
            ElementKind::Rule => ElementTag::Rule,
            ElementKind::Table(_) => ElementTag::Table,
        }
    }
}

/// Names the element variants for typed queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementTag {
    Text,
    Image,
    Rule,
    Table,
}
