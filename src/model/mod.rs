//! Document model types for reconstructed page content.
//!
//! Pages own an ordered sequence of positioned elements. Tables synthesized
//! by the detection stage are ordinary elements of that sequence.

mod document;
mod element;
mod geometry;
mod page;
mod table;

pub use document::Document;
pub use element::{Element, ElementId, ElementKind, ElementTag};
pub use geometry::BoundingBox;
pub use page::Page;
pub use table::{Table, TableCell, TableRow};
