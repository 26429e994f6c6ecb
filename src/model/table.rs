//! Table types.

use super::{BoundingBox, Element};
use serde::{Deserialize, Serialize};

/// A table structure.
///
/// Rows hold only the cells anchored on them. A cell spanning several rows
/// appears once, on its top row; occupancy is rebuilt from the spans (see
/// [`Table::occupancy`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Rows in the table, top to bottom
    pub rows: Vec<TableRow>,

    /// Column widths in points (optional)
    pub column_widths: Option<Vec<f32>>,

    /// Row heights in points (optional)
    pub row_heights: Option<Vec<f32>>,
}

impl Table {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            column_widths: None,
            row_heights: None,
        }
    }

    /// Add a row to the table.
    pub fn add_row(&mut self, row: TableRow) {
        self.rows.push(row);
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns (sum of first-row colspans).
    pub fn column_count(&self) -> usize {
        self.rows
            .first()
            .map(|r| r.cells.iter().map(|c| c.colspan as usize).sum())
            .unwrap_or(0)
    }

    /// Total number of emitted cells.
    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).sum()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get plain text representation of the table.
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check if the table has complex structure (merged cells).
    pub fn has_merged_cells(&self) -> bool {
        self.rows
            .iter()
            .flat_map(|r| &r.cells)
            .any(|c| c.is_merged())
    }

    /// Rebuild the grid occupancy from row/column spans.
    ///
    /// Each slot holds `(row, index)` of the cell covering it, where `index`
    /// is the cell's position within `rows[row].cells`. Returns `None` when
    /// the spans do not tile a `row_count() x column_count()` grid: a cell
    /// overlaps another, sticks out of the grid, or a slot stays uncovered.
    pub fn occupancy(&self) -> Option<Vec<Vec<(usize, usize)>>> {
        let rows = self.row_count();
        let cols = self.column_count();
        let mut grid: Vec<Vec<Option<(usize, usize)>>> = vec![vec![None; cols]; rows];

        for (r, row) in self.rows.iter().enumerate() {
            let mut col = 0;
            for (i, cell) in row.cells.iter().enumerate() {
                while col < cols && grid[r][col].is_some() {
                    col += 1;
                }
                let row_end = r + cell.rowspan as usize;
                let col_end = col + cell.colspan as usize;
                if row_end > rows || col_end > cols {
                    return None;
                }
                for slot_row in grid.iter_mut().take(row_end).skip(r) {
                    for slot in slot_row.iter_mut().take(col_end).skip(col) {
                        if slot.is_some() {
                            return None;
                        }
                        *slot = Some((r, i));
                    }
                }
                col = col_end;
            }
        }

        grid.into_iter()
            .map(|row| row.into_iter().collect::<Option<Vec<_>>>())
            .collect()
    }

    /// Get the cell covering a grid slot, if the spans tile the grid.
    pub fn cell_at(&self, row: usize, column: usize) -> Option<&TableCell> {
        let grid = self.occupancy()?;
        let (r, i) = *grid.get(row)?.get(column)?;
        self.rows.get(r)?.cells.get(i)
    }

    /// Mutable access to every emitted cell, in row-major order.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut TableCell> {
        self.rows.iter_mut().flat_map(|r| r.cells.iter_mut())
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRow {
    /// Cells anchored in the row, left to right
    pub cells: Vec<TableCell>,
}

impl TableRow {
    /// Create a new row with cells.
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self { cells }
    }

    /// Create a row from text values.
    pub fn from_strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(values.into_iter().map(TableCell::text).collect())
    }

    /// Get plain text representation.
    pub fn plain_text(&self) -> String {
        self.cells
            .iter()
            .map(|c| c.plain_text())
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    /// Text reported by the detector for this cell
    pub text: String,

    /// Page elements that fell inside the cell
    pub content: Vec<Element>,

    /// Cell geometry on the page
    pub bbox: Option<BoundingBox>,

    /// Number of rows this cell spans
    pub rowspan: u32,

    /// Number of columns this cell spans
    pub colspan: u32,
}

impl TableCell {
    /// Create a new cell with text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::empty()
        }
    }

    /// Create an empty cell.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            content: Vec::new(),
            bbox: None,
            rowspan: 1,
            colspan: 1,
        }
    }

    /// Set colspan and return self.
    pub fn colspan(mut self, span: u32) -> Self {
        self.colspan = span.max(1);
        self
    }

    /// Set rowspan and return self.
    pub fn rowspan(mut self, span: u32) -> Self {
        self.rowspan = span.max(1);
        self
    }

    /// Set geometry and return self.
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Get plain text content.
    ///
    /// Falls back to the text of the contained elements when the detector
    /// gave none.
    pub fn plain_text(&self) -> String {
        if !self.text.is_empty() {
            return self.text.clone();
        }
        self.content
            .iter()
            .map(|e| e.plain_text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Check if the cell is empty.
    pub fn is_empty(&self) -> bool {
        self.plain_text().trim().is_empty()
    }

    /// Check if this cell spans multiple rows or columns.
    pub fn is_merged(&self) -> bool {
        self.rowspan > 1 || self.colspan > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementId;

    #[test]
    fn test_table_new() {
        let table = Table::new();
        assert!(table.is_empty());
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn test_table_with_data() {
        let mut table = Table::new();
        table.add_row(TableRow::from_strings(["Name", "Age"]));
        table.add_row(TableRow::from_strings(["Alice", "30"]));
        table.add_row(TableRow::from_strings(["Bob", "25"]));

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.cell_count(), 6);
        assert_eq!(table.plain_text(), "Name\tAge\nAlice\t30\nBob\t25");
    }

    #[test]
    fn test_merged_cells() {
        let mut table = Table::new();
        table.add_row(TableRow::new(vec![TableCell::text("Merged").colspan(2)]));

        assert!(table.has_merged_cells());
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_occupancy_with_rowspan() {
        // +---+---+
        // | A | B |
        // |   +---+
        // |   | C |
        // +---+---+
        let mut table = Table::new();
        table.add_row(TableRow::new(vec![
            TableCell::text("A").rowspan(2),
            TableCell::text("B"),
        ]));
        table.add_row(TableRow::new(vec![TableCell::text("C")]));

        let grid = table.occupancy().expect("spans tile the grid");
        assert_eq!(grid[0], vec![(0, 0), (0, 1)]);
        assert_eq!(grid[1], vec![(0, 0), (1, 0)]);
        assert_eq!(table.cell_at(1, 0).map(|c| c.text.as_str()), Some("A"));
        assert_eq!(table.cell_at(1, 1).map(|c| c.text.as_str()), Some("C"));
    }

    #[test]
    fn test_occupancy_rejects_bad_spans() {
        let mut table = Table::new();
        table.add_row(TableRow::from_strings(["A", "B"]));
        table.add_row(TableRow::new(vec![TableCell::text("C")]));
        // second row leaves a hole
        assert!(table.occupancy().is_none());

        let mut table = Table::new();
        table.add_row(TableRow::new(vec![TableCell::text("A").rowspan(3)]));
        // rowspan sticks out of the grid
        assert!(table.occupancy().is_none());
    }

    #[test]
    fn test_cell_text_falls_back_to_content() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let mut cell = TableCell::empty();
        assert!(cell.is_empty());

        cell.content.push(Element::text(ElementId(1), 1, bbox, "12"));
        cell.content.push(Element::text(ElementId(2), 1, bbox, "kg"));
        assert_eq!(cell.plain_text(), "12 kg");

        let cell = TableCell::text("detector").rowspan(0);
        assert_eq!(cell.plain_text(), "detector");
        assert_eq!(cell.rowspan, 1);
    }
}
