//! Table region detection.
//!
//! Scans forward from the row below the header until one of:
//! - the item cell matches a stop or totals marker (`Total Cost`,
//!   `Total Budget`, `Expenses`, ...); the region ends on the row above it;
//! - `empty_row_run` consecutive rows are blank across every mapped column;
//!   the region ends on the last row with content;
//! - the grid runs out; the region ends on the last row with content.

use super::text::{matches_marker, normalize_cell};
use crate::config::ParserConfig;
use crate::models::{BudgetColumns, Grid, StopReason, TableRegion};

/// True when every mapped column of `row` is blank (the whole row if none are mapped).
pub fn row_is_empty(grid: &Grid, row: usize, columns: &BudgetColumns) -> bool {
    let mapped = columns.mapped_indices();
    if mapped.is_empty() {
        return grid.row(row).iter().all(|c| c.is_blank());
    }
    mapped.iter().all(|col| grid.cell(row, *col).is_blank())
}

/// Whether the item cell of `row` is one of `markers`.
pub fn item_matches(grid: &Grid, row: usize, columns: &BudgetColumns, markers: &[String]) -> bool {
    columns
        .item
        .map(|col| matches_marker(&normalize_cell(grid.cell(row, col)), markers))
        .unwrap_or(false)
}

/// Find the rows holding line items below `header_row`.
pub fn detect_region(
    grid: &Grid,
    header_row: usize,
    columns: &BudgetColumns,
    config: &ParserConfig,
) -> TableRegion {
    let start_row = header_row + 1;
    // `header_row` doubles as "no content yet": end_row < start_row is an empty table.
    let mut last_content = header_row;
    let mut empty_run = 0;

    for row in start_row..grid.len() {
        if item_matches(grid, row, columns, &config.stop_markers)
            || item_matches(grid, row, columns, &config.total_markers)
        {
            return TableRegion {
                start_row,
                end_row: row - 1,
                stop_reason: StopReason::StopMarkerMatched,
                stop_row: Some(row),
            };
        }

        if row_is_empty(grid, row, columns) {
            empty_run += 1;
            if empty_run >= config.empty_row_run {
                return TableRegion {
                    start_row,
                    end_row: last_content,
                    stop_reason: StopReason::ConsecutiveEmptyRows,
                    stop_row: None,
                };
            }
        } else {
            empty_run = 0;
            last_content = row;
        }
    }

    TableRegion {
        start_row,
        end_row: last_content,
        stop_reason: StopReason::EndOfGrid,
        stop_row: None,
    }
}
