//! Orchestration of the extraction stages.
//!
//! ```text
//! Grid ─▶ header ─▶ columns ─▶ region ─▶ line items ─▶ totals ─▶ ExtractionResult
//! ```
//!
//! Pure and synchronous: the same grid and config always produce the same
//! result. Only a missing header or a missing item column fails; everything
//! else becomes a warning on the result.
//!
//! # Example
//!
//! ```rust,ignore
//! use budget_import::{extract_file, ParserConfig};
//!
//! let result = extract_file("budget.csv", &ParserConfig::default())?;
//! println!("{} items, total cost {}", result.items.len(), result.total_cost);
//! ```

use std::path::Path;

use super::columns::{ensure_required, map_columns};
use super::header::detect_header;
use super::line_items::extract_line_items;
use super::region::detect_region;
use super::totals::validate_totals;
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::ParserConfig;
use crate::error::{ExtractResult, PipelineResult};
use crate::models::{ExtractionResult, Grid, StopReason};
use crate::parser::{parse_grid_bytes, parse_grid_file, ParsedGrid};

/// Warning added when a region yields nothing.
pub const NO_ITEMS_WARNING: &str = "no line items were extracted";

/// Run every stage over `grid`.
pub fn extract(grid: &Grid, config: &ParserConfig) -> ExtractResult<ExtractionResult> {
    let header_row = detect_header(grid, config)?;
    log_success(format!("Header found at row {}", header_row + 1));

    let mapping = map_columns(grid, header_row, config);
    ensure_required(&mapping, header_row)?;
    log_success(format!(
        "Mapped {} columns (confidence {:.2})",
        mapping.columns.mapped_indices().len(),
        mapping.confidence
    ));

    let region = detect_region(grid, header_row, &mapping.columns, config);
    if region.is_empty() {
        log_info("Item table is empty");
    } else {
        log_info(format!(
            "Item table spans rows {}-{}",
            region.start_row + 1,
            region.end_row + 1
        ));
    }
    if let (StopReason::StopMarkerMatched, Some(stop)) = (region.stop_reason, region.stop_row) {
        log_info_indent(format!("stopped at marker row {}", stop + 1), 1);
    }

    let lines = extract_line_items(grid, &mapping.columns, &region, config);
    log_success(format!(
        "Extracted {} items ({} compound rows split)",
        lines.items.len(),
        lines.compound_rows_split
    ));

    let totals = validate_totals(&lines.items, grid, &mapping.columns, &region, config);
    match totals.sheet_total {
        Some(stated) if totals.warnings.is_empty() => {
            log_success(format!("Totals match the sheet ({})", stated))
        }
        Some(_) => log_warning("Totals do not match the sheet"),
        None => log_info(format!("Total cost {}", totals.total_cost)),
    }

    let mut warnings = mapping.warnings;
    warnings.extend(lines.warnings);
    warnings.extend(totals.warnings);
    if lines.items.is_empty() {
        warnings.push(NO_ITEMS_WARNING.to_string());
    }
    if mapping.confidence < config.low_confidence_threshold {
        warnings.push(format!(
            "column mapping confidence {:.2} is below {:.2}; review the mapped columns",
            mapping.confidence, config.low_confidence_threshold
        ));
    }

    if !warnings.is_empty() {
        log_warning(format!("{} warnings", warnings.len()));
    }

    Ok(ExtractionResult {
        items: lines.items,
        warnings,
        header_row_index: header_row,
        region,
        columns: mapping.columns,
        mapping_confidence: mapping.confidence,
        compound_rows_split: lines.compound_rows_split,
        total_cost: totals.total_cost,
        total_price: totals.total_price,
    })
}

/// Load CSV bytes and extract.
pub fn extract_bytes(bytes: &[u8], config: &ParserConfig) -> PipelineResult<ExtractionResult> {
    let parsed = parse_grid_bytes(bytes)?;
    extract_parsed(&parsed, config)
}

/// Load a CSV file and extract.
pub fn extract_file<P: AsRef<Path>>(path: P, config: &ParserConfig) -> PipelineResult<ExtractionResult> {
    log_info(format!("Reading {}", path.as_ref().display()));
    let parsed = parse_grid_file(path)?;
    extract_parsed(&parsed, config)
}

/// Extract from an already loaded grid, logging how it was read.
pub fn extract_parsed(parsed: &ParsedGrid, config: &ParserConfig) -> PipelineResult<ExtractionResult> {
    log_success(format!(
        "Read {} rows (encoding {}, separator '{}')",
        parsed.grid.len(),
        parsed.encoding,
        format_delimiter(parsed.delimiter)
    ));
    Ok(extract(&parsed.grid, config)?)
}

pub fn format_delimiter(c: char) -> String {
    match c {
        '\t' => "\\t".to_string(),
        _ => c.to_string(),
    }
}
