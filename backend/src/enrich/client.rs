//! Anthropic-backed classifier.

use std::env;

use serde::Deserialize;
use serde_json::Value;

use super::{prompt, ClassificationInput, ClassificationOutput, Classifier};
use crate::api::logs::{log_info_indent, log_warning};
use crate::config::EnrichmentConfig;
use crate::error::{AiError, AiResult};
use crate::validation::validate_classification_response;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Default number of retries
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// Anthropic API client
#[derive(Clone)]
pub struct AiClassifier {
    api_key: String,
    model: String,
    max_tokens: u32,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ClassificationResponse {
    classifications: Vec<ClassificationOutput>,
}

impl AiClassifier {
    pub fn new(api_key: String) -> Self {
        let defaults = EnrichmentConfig::default();
        Self {
            api_key,
            model: defaults.model,
            max_tokens: defaults.max_tokens,
            http: reqwest::Client::new(),
        }
    }

    /// Create a client from `ANTHROPIC_API_KEY` (a `.env` file is honoured).
    pub fn from_env() -> AiResult<Self> {
        let _ = dotenvy::dotenv();

        let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| AiError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Client from the environment key and the model settings in `config`.
    pub fn from_config(config: &EnrichmentConfig) -> AiResult<Self> {
        Ok(Self::from_env()?
            .with_model(&config.model)
            .with_max_tokens(config.max_tokens))
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn classify_with_retries(&self, items: &[ClassificationInput]) -> AiResult<Vec<ClassificationOutput>> {
        let mut last_error = None;

        for attempt in 1..=DEFAULT_MAX_RETRIES {
            match self.try_classify(items).await {
                Ok(outputs) => return Ok(outputs),
                // retrying does not fix a missing key
                Err(AiError::MissingApiKey) => return Err(AiError::MissingApiKey),
                Err(e) => {
                    log_warning(format!("Attempt {}/{} failed: {}", attempt, DEFAULT_MAX_RETRIES, e));
                    last_error = Some(e);

                    if attempt < DEFAULT_MAX_RETRIES {
                        log_info_indent(format!("Retrying in {}ms...", RETRY_DELAY_MS), 1);
                        tokio::time::sleep(tokio::time::Duration::from_millis(RETRY_DELAY_MS)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AiError::Api("Unknown error".to_string())))
    }

    async fn try_classify(&self, items: &[ClassificationInput]) -> AiResult<Vec<ClassificationOutput>> {
        let text = self.call_api(items).await?;
        parse_classification_response(&text)
    }

    async fn call_api(&self, items: &[ClassificationInput]) -> AiResult<String> {
        log_info_indent(format!("Calling Anthropic API ({})", self.model), 1);

        let request_body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0,
            "system": prompt::system_prompt(),
            "messages": prompt::build_messages(items)
        });

        let response = self
            .http
            .post(API_URL)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<AnthropicError>(&body) {
                return Err(AiError::Api(error.error.message));
            }
            return Err(AiError::Api(format!("HTTP {}: {}", status, body)));
        }

        let response: AnthropicResponse =
            serde_json::from_str(&body).map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        let text = response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(AiError::InvalidResponse("Empty response".to_string()));
        }

        log_info_indent(format!("Received {} bytes", text.len()), 1);
        Ok(text)
    }
}

impl Classifier for AiClassifier {
    async fn classify(&self, items: &[ClassificationInput]) -> AiResult<Vec<ClassificationOutput>> {
        self.classify_with_retries(items).await
    }
}

/// Parse and contract-check a classifier reply.
///
/// Replies carrying anything beyond `index`, `category` and `description`
/// (amounts in particular) are rejected whole.
pub fn parse_classification_response(text: &str) -> AiResult<Vec<ClassificationOutput>> {
    let json_str = extract_json(text);
    let value: Value = serde_json::from_str(&json_str).map_err(|e| {
        AiError::InvalidResponse(format!(
            "{}. Response was: {}",
            e,
            text.chars().take(500).collect::<String>()
        ))
    })?;

    validate_classification_response(&value).map_err(|errors| AiError::ContractViolation(errors.join("; ")))?;

    let response: ClassificationResponse =
        serde_json::from_value(value).map_err(|e| AiError::InvalidResponse(e.to_string()))?;
    Ok(response.classifications)
}

/// Extract JSON from a response that may contain markdown code blocks
pub fn extract_json(text: &str) -> String {
    if let Some(start) = text.find("```json") {
        let json_start = start + "```json".len();
        if let Some(end) = text[json_start..].find("```") {
            return text[json_start..json_start + end].trim().to_string();
        }
    }

    if let Some(start) = text.find("```") {
        let after_start = start + 3;
        // skip a language tag
        let content_start = text[after_start..]
            .find('\n')
            .map(|i| after_start + i + 1)
            .unwrap_or(after_start);

        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.to_string()
}
