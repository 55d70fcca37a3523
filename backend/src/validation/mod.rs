//! JSON Schema validation for classifier responses and extraction results.
//!
//! Schemas (Draft 7) are embedded at compile time from `schemas/`:
//! - `classification-response.json` - what the classifier may send back
//! - `extraction-result.json` - the serialized [`crate::models::ExtractionResult`]
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use budget_import::validation::validate_classification_response;
//!
//! let ok = json!({ "classifications": [{ "index": 0, "category": "materials" }] });
//! assert!(validate_classification_response(&ok).is_ok());
//!
//! // amounts are never accepted
//! let bad = json!({ "classifications": [{ "index": 0, "cost": "1.00" }] });
//! assert!(validate_classification_response(&bad).is_err());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static CLASSIFICATION_RESPONSE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/classification-response.json"))
        .expect("Invalid embedded schema")
});

static EXTRACTION_RESULT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/extraction-result.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every error otherwise
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use budget_import::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": { "name": { "type": "string" } }
/// });
///
/// assert!(validate(&schema, &json!({ "name": "test" })).is_ok());
/// assert!(validate(&schema, &json!({ "age": 42 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a classifier response body.
pub fn validate_classification_response(data: &Value) -> Result<(), Vec<String>> {
    validate(&CLASSIFICATION_RESPONSE_SCHEMA, data)
}

pub fn is_valid_classification_response(data: &Value) -> bool {
    is_valid(&CLASSIFICATION_RESPONSE_SCHEMA, data)
}

/// Validate a serialized extraction result.
pub fn validate_extraction_result(data: &Value) -> Result<(), Vec<String>> {
    validate(&EXTRACTION_RESULT_SCHEMA, data)
}

pub fn is_valid_extraction_result(data: &Value) -> bool {
    is_valid(&EXTRACTION_RESULT_SCHEMA, data)
}
