//! Deterministic budget extraction: grid in, priced line items out.
//!
//! - [`header`] - Header row detection
//! - [`columns`] - Column role mapping
//! - [`region`] - Item table bounds
//! - [`line_items`] - Row expansion, categories and pricing
//! - [`totals`] - Sums and the totals-row cross-check
//! - [`pipeline`] - Orchestration

pub mod columns;
pub mod header;
pub mod line_items;
pub mod pipeline;
pub mod region;
pub mod text;
pub mod totals;

pub use columns::{ensure_required, map_columns};
pub use header::{detect_header, score_row, score_rows, HeaderCandidate};
pub use line_items::{extract_line_items, LineItemExtraction, ManagementMatcher, ManagementSignal};
pub use pipeline::{extract, extract_bytes, extract_file, extract_parsed, NO_ITEMS_WARNING};
pub use region::detect_region;
pub use totals::{validate_totals, TotalsCheck};
