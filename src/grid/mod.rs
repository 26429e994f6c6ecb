//! Grid reconstruction from raw cell geometry.
//!
//! Detectors report cells as loose boxes. This module recovers the row and
//! column lines those boxes share, derives each cell's row/column span from
//! the lines it covers, and lays the cells out as rows of anchored cells.

mod lines;

pub use lines::GridLines;

use unicode_normalization::UnicodeNormalization;

use crate::error::DropReason;
use crate::model::{BoundingBox, Table, TableCell, TableRow};
use crate::parser::{RawCell, TableDescriptor};

/// Grid reconstruction configuration.
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Edges closer than this (points) are treated as the same grid line
    pub edge_tolerance: f32,
    /// Fill slots no cell covers with empty cells
    pub fill_gaps: bool,
    /// Largest grid (rows x columns) accepted; noisier geometry is dropped
    pub max_slots: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            edge_tolerance: 3.0,
            fill_gaps: true,
            max_slots: 250_000,
        }
    }
}

impl GridConfig {
    /// Set the edge clustering tolerance.
    pub fn with_edge_tolerance(mut self, tolerance: f32) -> Self {
        self.edge_tolerance = tolerance.max(0.0);
        self
    }

    /// Enable or disable gap filling.
    pub fn with_fill_gaps(mut self, fill: bool) -> Self {
        self.fill_gaps = fill;
        self
    }

    /// Set the largest grid size accepted.
    pub fn with_max_slots(mut self, slots: usize) -> Self {
        self.max_slots = slots;
        self
    }
}

/// A reconstructed table and the cells left out of it.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// The table, rows top to bottom
    pub table: Table,
    /// Cells dropped by index into the descriptor's cell list
    pub dropped_cells: Vec<(usize, DropReason)>,
}

/// A cell resolved against the grid lines.
#[derive(Debug, Clone, Copy)]
struct Placement {
    /// Descriptor cell, `None` for a filled gap
    index: Option<usize>,
    row: usize,
    column: usize,
    rowspan: usize,
    colspan: usize,
}

/// Builds table rows from raw cell boxes.
#[derive(Debug, Clone)]
pub struct GridReconstructor {
    config: GridConfig,
}

impl GridReconstructor {
    /// Create a new reconstructor with default configuration.
    pub fn new() -> Self {
        Self {
            config: GridConfig::default(),
        }
    }

    /// Create a new reconstructor with custom configuration.
    pub fn with_config(config: GridConfig) -> Self {
        Self { config }
    }

    /// Reconstruct the grid of one table descriptor.
    ///
    /// Fails with a [`DropReason`] when the geometry does not describe any
    /// grid; individual cells that cannot be placed are reported in
    /// [`Reconstruction::dropped_cells`].
    pub fn reconstruct(&self, descriptor: &TableDescriptor) -> Result<Reconstruction, DropReason> {
        let cells = &descriptor.cells;
        if cells.is_empty() {
            return Err(DropReason::NoCells);
        }

        let tolerance = self.config.edge_tolerance;
        let row_lines = GridLines::cluster(
            cells.iter().flat_map(|c| [c.bbox.top, c.bbox.bottom]),
            tolerance,
        );
        let column_lines = GridLines::cluster(
            cells.iter().flat_map(|c| [c.bbox.left, c.bbox.right]),
            tolerance,
        );

        let rows = row_lines.band_count();
        let columns = column_lines.band_count();
        log::debug!(
            "GridReconstructor: {} cells, {} row lines, {} column lines",
            cells.len(),
            row_lines.positions().len(),
            column_lines.positions().len()
        );

        if rows == 0 || columns == 0 {
            return Err(DropReason::DegenerateGeometry(format!(
                "{rows} row bands, {columns} column bands"
            )));
        }
        if rows.saturating_mul(columns) > self.config.max_slots {
            return Err(DropReason::DegenerateGeometry(format!(
                "{rows}x{columns} grid exceeds {} slots",
                self.config.max_slots
            )));
        }

        let (placements, dropped_cells) = self.place_cells(cells, &row_lines, &column_lines);
        if placements.iter().all(|p| p.index.is_none()) {
            return Err(DropReason::DegenerateGeometry(
                "no cell could be placed on the grid".to_string(),
            ));
        }

        let table = self.build_table(cells, &placements, &row_lines, &column_lines);
        log::debug!(
            "GridReconstructor: built {}x{} table with {} cells ({} dropped)",
            table.row_count(),
            columns,
            table.cell_count(),
            dropped_cells.len()
        );

        Ok(Reconstruction {
            table,
            dropped_cells,
        })
    }

    /// Snap cells onto the grid and resolve anchor collisions.
    ///
    /// Cells are visited by (top, left) ascending; the first cell to claim
    /// a slot keeps it.
    fn place_cells(
        &self,
        cells: &[RawCell],
        row_lines: &GridLines,
        column_lines: &GridLines,
    ) -> (Vec<Placement>, Vec<(usize, DropReason)>) {
        let rows = row_lines.band_count();
        let columns = column_lines.band_count();

        let mut order: Vec<usize> = (0..cells.len()).collect();
        order.sort_by(|&a, &b| {
            let (a_box, b_box) = (&cells[a].bbox, &cells[b].bbox);
            a_box
                .top
                .total_cmp(&b_box.top)
                .then(a_box.left.total_cmp(&b_box.left))
                .then(a.cmp(&b))
        });

        let mut occupied = vec![false; rows * columns];
        let mut placements = Vec::with_capacity(cells.len());
        let mut dropped = Vec::new();

        for index in order {
            let bbox = &cells[index].bbox;
            let snapped = (
                row_lines.nearest(bbox.top),
                row_lines.nearest(bbox.bottom),
                column_lines.nearest(bbox.left),
                column_lines.nearest(bbox.right),
            );
            let (top, bottom, left, right) = match snapped {
                (Some(t), Some(b), Some(l), Some(r)) if b > t && r > l => (t, b, l, r),
                _ => {
                    log::warn!(
                        "GridReconstructor: dropping cell {}: box {:?} covers no grid band",
                        index,
                        bbox
                    );
                    dropped.push((
                        index,
                        DropReason::DegenerateGeometry("cell covers no grid band".to_string()),
                    ));
                    continue;
                }
            };

            let collision = (top..bottom)
                .flat_map(|r| (left..right).map(move |c| (r, c)))
                .find(|&(r, c)| occupied[r * columns + c]);
            if let Some((row, column)) = collision {
                log::warn!(
                    "GridReconstructor: dropping cell {}: overlaps placed cell at ({}, {})",
                    index,
                    row,
                    column
                );
                dropped.push((index, DropReason::OverlappingCell { row, column }));
                continue;
            }

            for r in top..bottom {
                for c in left..right {
                    occupied[r * columns + c] = true;
                }
            }
            placements.push(Placement {
                index: Some(index),
                row: top,
                column: left,
                rowspan: bottom - top,
                colspan: right - left,
            });
        }

        if self.config.fill_gaps {
            for r in 0..rows {
                for c in 0..columns {
                    if !occupied[r * columns + c] {
                        placements.push(Placement {
                            index: None,
                            row: r,
                            column: c,
                            rowspan: 1,
                            colspan: 1,
                        });
                    }
                }
            }
        }

        (placements, dropped)
    }

    /// Emit rows holding the cells anchored on them, in column order.
    fn build_table(
        &self,
        cells: &[RawCell],
        placements: &[Placement],
        row_lines: &GridLines,
        column_lines: &GridLines,
    ) -> Table {
        let mut anchored: Vec<Vec<&Placement>> = vec![Vec::new(); row_lines.band_count()];
        for placement in placements {
            anchored[placement.row].push(placement);
        }

        let mut table = Table::new();
        for row in anchored.iter_mut() {
            row.sort_by_key(|p| p.column);
            let row_cells = row
                .iter()
                .map(|p| {
                    let cell = match p.index.and_then(|i| cells.get(i)) {
                        Some(raw) => TableCell::text(normalize_text(&raw.text)).with_bbox(raw.bbox),
                        None => {
                            let mut cell = TableCell::empty();
                            if let (Some((left, right)), Some((top, bottom))) = (
                                column_lines.span(p.column, p.column + 1),
                                row_lines.span(p.row, p.row + 1),
                            ) {
                                cell = cell.with_bbox(BoundingBox::new(left, top, right, bottom));
                            }
                            cell
                        }
                    };
                    cell.rowspan(p.rowspan as u32).colspan(p.colspan as u32)
                })
                .collect();
            table.add_row(TableRow::new(row_cells));
        }

        table.column_widths = Some(column_lines.band_sizes());
        table.row_heights = Some(row_lines.band_sizes());
        table
    }
}

impl Default for GridReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize detector text: NFC, whitespace runs collapsed, trimmed.
fn normalize_text(text: &str) -> String {
    let composed: String = text.nfc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}
