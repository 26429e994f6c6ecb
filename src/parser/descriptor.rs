//! Table descriptors decoded from the extractor payload.

use serde::Deserialize;
use serde_json::Value;

use crate::error::DropReason;
use crate::model::BoundingBox;

/// One detected table's raw geometry, before grid reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    /// Position of the entry in the payload
    pub index: usize,

    /// Page the detector attributed the table to, if it said so
    pub page: Option<u32>,

    /// Bounding region of the whole table
    pub region: BoundingBox,

    /// Cell geometries, in payload order
    pub cells: Vec<RawCell>,
}

/// A cell as reported by the detector: geometry and text, no spans yet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCell {
    /// Cell bounding box
    pub bbox: BoundingBox,

    /// Cell text (may be empty)
    pub text: String,
}

impl RawCell {
    pub fn new(bbox: BoundingBox, text: impl Into<String>) -> Self {
        Self {
            bbox,
            text: text.into(),
        }
    }
}

/// Result of decoding one payload entry.
pub(crate) struct DecodedEntry {
    pub descriptor: TableDescriptor,
    /// Cells dropped from the entry, by index
    pub dropped_cells: Vec<(usize, DropReason)>,
}

/// A table entry as written by the detector.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default, alias = "bbox")]
    region: Option<BoxNotation>,
    /// Cells stay raw so a bad cell only drops itself
    #[serde(default)]
    cells: Option<Vec<Value>>,
}

/// A cell record as written by the detector.
#[derive(Debug, Deserialize)]
struct RawCellEntry {
    #[serde(default)]
    bbox: Option<BoxNotation>,
    /// Opaque; only string text is kept
    #[serde(default, alias = "content")]
    text: Option<Value>,
}

/// Box notations accepted in the payload.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum BoxNotation {
    /// `[left, top, right, bottom]`
    Edges([f32; 4]),
    /// `{"left", "top", "right", "bottom"}`
    Sides {
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    },
    /// `{"x", "y", "width", "height"}`
    Extent { x: f32, y: f32, width: f32, height: f32 },
}

impl From<BoxNotation> for BoundingBox {
    fn from(notation: BoxNotation) -> Self {
        match notation {
            BoxNotation::Edges([left, top, right, bottom]) => {
                BoundingBox::new(left, top, right, bottom)
            }
            BoxNotation::Sides {
                left,
                top,
                right,
                bottom,
            } => BoundingBox::new(left, top, right, bottom),
            BoxNotation::Extent {
                x,
                y,
                width,
                height,
            } => BoundingBox::from_xywh(x, y, width, height),
        }
    }
}

/// Decode one payload entry into a descriptor.
///
/// Cells without usable geometry are dropped individually; the entry as a
/// whole is rejected when its region is missing or no cell survives.
pub(crate) fn decode_entry(index: usize, entry: &Value) -> Result<DecodedEntry, DropReason> {
    let raw = RawEntry::deserialize(entry)
        .map_err(|e| DropReason::InvalidGeometry(format!("table entry: {e}")))?;

    let region: BoundingBox = raw.region.ok_or(DropReason::MissingGeometry("region"))?.into();
    if !region.is_valid() {
        return Err(DropReason::InvalidGeometry(format!(
            "table region {region:?}"
        )));
    }

    let raw_cells = raw.cells.ok_or(DropReason::MissingGeometry("cells"))?;

    let mut cells = Vec::with_capacity(raw_cells.len());
    let mut dropped_cells = Vec::new();
    for (cell_index, value) in raw_cells.iter().enumerate() {
        match decode_cell(value) {
            Ok(cell) => cells.push(cell),
            Err(reason) => dropped_cells.push((cell_index, reason)),
        }
    }

    if cells.is_empty() {
        return Err(DropReason::NoCells);
    }

    Ok(DecodedEntry {
        descriptor: TableDescriptor {
            index,
            page: raw.page,
            region,
            cells,
        },
        dropped_cells,
    })
}

fn decode_cell(value: &Value) -> Result<RawCell, DropReason> {
    let raw = RawCellEntry::deserialize(value)
        .map_err(|e| DropReason::InvalidGeometry(format!("cell: {e}")))?;

    let bbox: BoundingBox = raw.bbox.ok_or(DropReason::MissingGeometry("bbox"))?.into();
    if !bbox.is_valid() {
        return Err(DropReason::InvalidGeometry(format!("cell box {bbox:?}")));
    }

    let text = raw.text.as_ref().and_then(Value::as_str).unwrap_or_default();
    Ok(RawCell::new(bbox, text))
}
