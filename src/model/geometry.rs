//! Page geometry.

use serde::{Deserialize, Serialize};

/// An axis-aligned box in page points.
///
/// The origin is the top-left corner of the page and y grows downward, so
/// `top <= bottom` for a well-formed box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge (x of the left side)
    pub left: f32,
    /// Top edge (y of the upper side)
    pub top: f32,
    /// Right edge
    pub right: f32,
    /// Bottom edge
    pub bottom: f32,
}

impl BoundingBox {
    /// Create a box from its four edges.
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a box from an origin and a size.
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Centre point as `(x, y)`.
    pub fn center(&self) -> (f32, f32) {
        (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Check that every edge is finite and the box is not inverted.
    pub fn is_valid(&self) -> bool {
        [self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite())
            && self.right >= self.left
            && self.bottom >= self.top
    }

    /// The overlapping part of two boxes, if they overlap at all.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);

        if right > left && bottom > top {
            Some(BoundingBox::new(left, top, right, bottom))
        } else {
            None
        }
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        self.intersection(other).map(|b| b.area()).unwrap_or(0.0)
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// Check if a point lies inside the box (edges included).
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    /// Check if `other` lies fully inside this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.top >= self.top
            && other.bottom <= self.bottom
    }

    /// Share of this box's area that lies inside `other` (0.0 to 1.0).
    ///
    /// Zero-area boxes (points, hairlines) count as 1.0 when their centre is
    /// inside `other`, else 0.0.
    pub fn overlap_ratio(&self, other: &BoundingBox) -> f32 {
        let area = self.area();
        if area <= f32::EPSILON {
            let (x, y) = self.center();
            return if other.contains_point(x, y) { 1.0 } else { 0.0 };
        }
        self.intersection_area(other) / area
    }

    /// Containment test used when consuming elements into tables.
    ///
    /// True when the box is fully inside `other`, or when more than
    /// `majority` of its area is.
    pub fn is_inside(&self, other: &BoundingBox, majority: f32) -> bool {
        other.contains(self) || self.overlap_ratio(other) > majority
    }

    /// Squared distance between the centres of two boxes.
    pub fn center_distance_sq(&self, other: &BoundingBox) -> f32 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        (ax - bx).powi(2) + (ay - by).powi(2)
    }
}
