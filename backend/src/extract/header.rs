//! Header row detection.
//!
//! Scores each of the first `header_scan_rows` rows and keeps the best one.
//! Per cell:
//!
//! | Cell                                   | Score |
//! |----------------------------------------|-------|
//! | matches an item/description synonym    | +5    |
//! | matches a cost column synonym          | +3    |
//! | number, or currency-looking text       | −2    |
//!
//! Ties go to the earliest row. A best score below `min_header_score` fails
//! the whole extraction with [`ExtractionError::HeaderNotFound`].

use serde::Serialize;

use super::text::{looks_like_value, match_synonyms, normalize_cell};
use crate::config::ParserConfig;
use crate::error::{ExtractResult, ExtractionError};
use crate::models::{Cell, ColumnRole, Grid};

const ITEM_SCORE: i32 = 5;
const COST_SCORE: i32 = 3;
const VALUE_PENALTY: i32 = -2;

/// Score of one candidate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderCandidate {
    pub row: usize,
    pub score: i32,
}

/// Score a single row as a header candidate.
pub fn score_row(cells: &[Cell], config: &ParserConfig) -> i32 {
    let cost_roles: Vec<ColumnRole> = ColumnRole::ALL
        .into_iter()
        .filter(ColumnRole::is_cost_like)
        .collect();

    cells
        .iter()
        .map(|cell| {
            if looks_like_value(cell) {
                return VALUE_PENALTY;
            }
            let text = normalize_cell(cell);
            if match_synonyms(&text, config.synonyms.for_role(ColumnRole::Item)).is_some() {
                ITEM_SCORE
            } else if cost_roles
                .iter()
                .any(|role| match_synonyms(&text, config.synonyms.for_role(*role)).is_some())
            {
                COST_SCORE
            } else {
                0
            }
        })
        .sum()
}

/// Scores for every row in the scan window, in row order.
pub fn score_rows(grid: &Grid, config: &ParserConfig) -> Vec<HeaderCandidate> {
    grid.rows()
        .iter()
        .take(config.header_scan_rows)
        .enumerate()
        .map(|(row, cells)| HeaderCandidate {
            row,
            score: score_row(cells, config),
        })
        .collect()
}

/// Pick the header row, earliest row winning ties.
pub fn detect_header(grid: &Grid, config: &ParserConfig) -> ExtractResult<usize> {
    let candidates = score_rows(grid, config);

    let best = candidates
        .iter()
        .fold(None::<HeaderCandidate>, |best, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(*c),
        });

    match best {
        Some(b) if b.score >= config.min_header_score => Ok(b.row),
        _ => Err(ExtractionError::HeaderNotFound {
            rows_scanned: candidates.len(),
            best_score: best.map(|b| b.score).unwrap_or(0),
        }),
    }
}
