//! # Budget Import - deterministic line item extraction from budget spreadsheets
//!
//! Turns vendor and estimator budget sheets (CSV exports with shifting
//! header rows, misspelled column names, footer totals and compound rows)
//! into priced, categorized estimate line items. Rule based and
//! reproducible: the same sheet and configuration always give the same
//! items and totals.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐    ┌──────────┐    ┌──────────────────────────────┐    ┌──────────────┐
//! │ CSV File  │───▶│  Parser  │───▶│ header → columns → region →  │───▶│  Extraction  │
//! │(ISO/UTF8) │    │(auto-enc)│    │ line items → totals          │    │    Result    │
//! └───────────┘    └──────────┘    └──────────────────────────────┘    └──────┬───────┘
//!                                                                             │ optional
//!                                                                      ┌──────▼───────┐
//!                                                                      │  Classifier  │
//!                                                                      │ (relabel only)│
//!                                                                      └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use budget_import::{extract_file, ParserConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = extract_file("budget.csv", &ParserConfig::default())?;
//!     println!("{} items, total cost {}", result.items.len(), result.total_cost);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Grid, column roles, regions, money, line items
//! - [`config`] - Synonyms, markers, markups and thresholds
//! - [`parser`] - CSV loading with auto-detection
//! - [`extract`] - The extraction stages and pipeline
//! - [`enrich`] - Optional classifier boundary
//! - [`validation`] - JSON Schema validation
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Extraction
pub mod extract;

// Enrichment
pub mod enrich;

// Validation
pub mod validation;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AiError, ConfigError, ExtractionError, GridError, PipelineError, PipelineResult, ServerError,
};

// =============================================================================
// Re-exports - Models & config
// =============================================================================

pub use config::{EnrichmentConfig, ManagementRule, MarkupRates, ParserConfig, RoleSynonyms};
pub use models::{
    BudgetColumns, Category, Cell, ColumnMappingResult, ColumnRole, ExtractedLineItem,
    ExtractionResult, Grid, Money, StopReason, TableRegion,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_grid, parse_grid_bytes,
    parse_grid_file, ParsedGrid,
};

// =============================================================================
// Re-exports - Extraction
// =============================================================================

pub use extract::{
    detect_header, detect_region, ensure_required, extract, extract_bytes, extract_file,
    extract_line_items, extract_parsed, map_columns, score_rows, validate_totals,
};

// =============================================================================
// Re-exports - Enrichment
// =============================================================================

pub use enrich::{
    apply_classifications, enrich, enrich_with_config, AiClassifier, ClassificationInput,
    ClassificationOutput, Classifier,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    is_valid, is_valid_classification_response, is_valid_extraction_result, validate,
    validate_classification_response, validate_extraction_result,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ExtractResponse, ResponseMetadata, ResponseStatus};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
