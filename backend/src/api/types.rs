//! REST API types for frontend integration.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::ExtractionResult;
use crate::parser::ParsedGrid;

/// Overall outcome shown to the reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ready,
    Warning,
    Error,
}

/// Response sent to the frontend after an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub job_id: String,
    pub status: ResponseStatus,
    pub result: ExtractionResult,
    pub metadata: ResponseMetadata,
}

/// How the file was read and what came out of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub file_name: Option<String>,
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub item_count: usize,
    pub warning_count: usize,
    /// Items relabeled by the classifier, when it ran.
    pub relabeled: Option<usize>,
}

impl ExtractResponse {
    /// Wrap a result. `warning` when anything needs review.
    pub fn new(
        result: ExtractionResult,
        parsed: &ParsedGrid,
        file_name: Option<String>,
        low_confidence_threshold: f64,
        relabeled: Option<usize>,
    ) -> Self {
        let status = if result.warnings.is_empty() && result.mapping_confidence >= low_confidence_threshold {
            ResponseStatus::Ready
        } else {
            ResponseStatus::Warning
        };

        let metadata = ResponseMetadata {
            file_name,
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter.to_string(),
            row_count: parsed.grid.len(),
            item_count: result.items.len(),
            warning_count: result.warnings.len(),
            relabeled,
        };

        Self {
            job_id: Uuid::new_v4().to_string(),
            status,
            result,
            metadata,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": ResponseStatus::Error,
        "error": error,
        "result": null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::extract::extract_parsed;
    use crate::parser::parse_grid_bytes;

    fn respond(csv: &str) -> ExtractResponse {
        let parsed = parse_grid_bytes(csv.as_bytes()).unwrap();
        let config = ParserConfig::default();
        let result = extract_parsed(&parsed, &config).unwrap();
        ExtractResponse::new(result, &parsed, Some("budget.csv".to_string()), config.low_confidence_threshold, None)
    }

    #[test]
    fn test_clean_sheet_is_ready() {
        let response = respond(
            "Item,Qty,Unit,Labor,Material,Sub,Equipment,Total,Price\nDemo,1,ls,100,0,0,0,100,125\n",
        );

        assert_eq!(response.status, ResponseStatus::Ready, "{:?}", response.result.warnings);
        assert_eq!(response.metadata.item_count, 1);
        assert_eq!(response.metadata.row_count, 2);
        assert_eq!(response.metadata.delimiter, ",");
    }

    #[test]
    fn test_warnings_downgrade_status() {
        let response = respond("Item,Labor\nDemo,100\n");

        assert_eq!(response.status, ResponseStatus::Warning);
        assert_eq!(response.metadata.warning_count, response.result.warnings.len());
    }

    #[test]
    fn test_response_shape() {
        let json = serde_json::to_value(respond("Item,Labor\nDemo,100\n")).unwrap();

        assert_eq!(json["status"], "warning");
        assert!(json["jobId"].is_string());
        assert_eq!(json["result"]["items"][0]["cost"], "100.00");
        assert_eq!(json["metadata"]["fileName"], "budget.csv");
    }

    #[test]
    fn test_error_response() {
        let json = error_response("No header row found");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "No header row found");
        assert!(json["result"].is_null());
    }
}
