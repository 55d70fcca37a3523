//! Error types for the budget import pipeline.
//!
//! Only two conditions abort an extraction ([`ExtractionError`]); everything
//! else the pipeline can recover from is reported as a warning string on the
//! result instead. The remaining enums cover the surfaces around the core:
//!
//! - [`GridError`] - loading a CSV into a grid
//! - [`ExtractionError`] - hard failures of the parsing core
//! - [`ConfigError`] - parser configuration loading and validation
//! - [`AiError`] - the optional classification collaborator
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP surface
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Grid Loading Errors
// =============================================================================

/// Errors while turning raw CSV bytes into a grid.
#[derive(Debug, Error)]
pub enum GridError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the byte content.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Malformed CSV record.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Nothing to parse.
    #[error("Input is empty")]
    Empty,
}

// =============================================================================
// Extraction Errors (hard failures)
// =============================================================================

/// The only two ways an extraction can fail outright.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractionError {
    /// No row in the scanned window looked enough like a header.
    #[error("No header row found in the first {rows_scanned} rows (best score {best_score})")]
    HeaderNotFound { rows_scanned: usize, best_score: i32 },

    /// The item/description column could not be mapped.
    #[error("Required columns missing in header row {header_row}: {}", missing.join(", "))]
    RequiredColumnsMissing {
        header_row: usize,
        missing: Vec<String>,
    },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors loading or validating a [`crate::config::ParserConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error.
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Semantically invalid value.
    #[error("Invalid config value for '{field}': {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// AI Client Errors
// =============================================================================

/// Errors from the optional classification collaborator.
#[derive(Debug, Error)]
pub enum AiError {
    /// Missing API key.
    #[error("Missing ANTHROPIC_API_KEY environment variable")]
    MissingApiKey,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Non-success answer from the API.
    #[error("API error: {0}")]
    Api(String),

    /// Response body was not the JSON we asked for.
    #[error("Invalid AI response: {0}")]
    InvalidResponse(String),

    /// Response tried to touch fields the classifier may not influence.
    #[error("Classifier contract violation: {0}")]
    ContractViolation(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::extract::pipeline::extract_file`]
/// and friends. It wraps all lower-level errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Grid loading error.
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    /// Hard extraction failure.
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Classifier error.
    #[error("AI error: {0}")]
    Ai(#[from] AiError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Could not bind or serve.
    #[error("Internal server error: {0}")]
    Internal(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for grid loading.
pub type GridResult<T> = Result<T, GridError>;

/// Result type for the parsing core.
pub type ExtractResult<T> = Result<T, ExtractionError>;

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for AI operations.
pub type AiResult<T> = Result<T, AiError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // GridError -> PipelineError
        let grid_err = GridError::Empty;
        let pipeline_err: PipelineError = grid_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // ExtractionError -> PipelineError -> ServerError
        let extract_err = ExtractionError::RequiredColumnsMissing {
            header_row: 2,
            missing: vec!["item".into()],
        };
        let pipeline_err: PipelineError = extract_err.into();
        let server_err: ServerError = pipeline_err.into();
        assert!(server_err.to_string().contains("item"));
    }

    #[test]
    fn test_header_not_found_format() {
        let err = ExtractionError::HeaderNotFound {
            rows_scanned: 20,
            best_score: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("20 rows"));
        assert!(msg.contains("best score 3"));
    }

    #[test]
    fn test_config_error_format() {
        let err = ConfigError::invalid("markup_percent.materials", "must not be negative");
        let msg = err.to_string();
        assert!(msg.contains("markup_percent.materials"));
        assert!(msg.contains("must not be negative"));
    }
}
