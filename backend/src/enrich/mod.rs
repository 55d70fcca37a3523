//! Optional classification and cleanup of extracted items.
//!
//! The classifier only ever sees `{index, description, category, cost}` and
//! may only answer with new categories and descriptions. Amounts and totals
//! are owned by extraction and are never touched here:
//!
//! - a category change keeps the item's price as extracted;
//! - nobody but extraction assigns or removes `management`;
//! - unknown indices are dropped with a warning.
//!
//! ```rust,ignore
//! use budget_import::enrich::{enrich, AiClassifier};
//!
//! let classifier = AiClassifier::from_env()?;
//! let relabeled = enrich(&mut result, &classifier).await?;
//! ```

pub mod client;
pub mod prompt;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::api::logs::{log_info, log_success, log_warning};
use crate::config::EnrichmentConfig;
use crate::error::AiResult;
use crate::models::{Category, ExtractionResult, Money};

pub use client::{extract_json, parse_classification_response, AiClassifier};

/// The only data handed to a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationInput {
    pub index: usize,
    pub description: String,
    pub category: Category,
    pub cost: Money,
}

/// A proposed relabel for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOutput {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Anything that can propose relabels for a batch of items.
pub trait Classifier {
    fn classify(
        &self,
        items: &[ClassificationInput],
    ) -> impl Future<Output = AiResult<Vec<ClassificationOutput>>> + Send;
}

/// Project a result onto classifier inputs.
pub fn classification_inputs(result: &ExtractionResult) -> Vec<ClassificationInput> {
    result
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| ClassificationInput {
            index,
            description: item.description.clone(),
            category: item.category,
            cost: item.cost,
        })
        .collect()
}

/// Apply relabels in place. Returns how many items changed.
pub fn apply_classifications(result: &mut ExtractionResult, outputs: &[ClassificationOutput]) -> usize {
    let mut changed = 0;

    for output in outputs {
        let Some(item) = result.items.get_mut(output.index) else {
            result.warnings.push(format!(
                "classifier referenced unknown item {}; ignored",
                output.index
            ));
            continue;
        };

        let mut touched = false;

        if let Some(category) = output.category.filter(|c| *c != item.category) {
            if category == Category::Management || item.category == Category::Management {
                result.warnings.push(format!(
                    "classifier tried to change '{}' from {} to {}; management is set by pricing rules, ignored",
                    item.description, item.category, category
                ));
            } else {
                item.category = category;
                touched = true;
            }
        }

        if let Some(description) = output.description.as_deref().map(str::trim) {
            if !description.is_empty() && description != item.description {
                item.description = description.to_string();
                touched = true;
            }
        }

        if touched {
            changed += 1;
        }
    }

    changed
}

/// Run `classifier` over `result` and apply what it proposes.
pub async fn enrich<C: Classifier>(result: &mut ExtractionResult, classifier: &C) -> AiResult<usize> {
    if result.items.is_empty() {
        return Ok(0);
    }

    let inputs = classification_inputs(result);
    log_info(format!("Classifying {} items...", inputs.len()));

    let outputs = classifier.classify(&inputs).await?;
    let changed = apply_classifications(result, &outputs);

    log_success(format!("Classifier relabeled {} items", changed));
    Ok(changed)
}

/// Best-effort enrichment with the Anthropic classifier.
///
/// Failures never fail the extraction: they are logged and recorded as a
/// warning on `result`, which is left as extracted. Returns the number of
/// relabeled items when the classifier ran.
pub async fn enrich_with_config(result: &mut ExtractionResult, config: &EnrichmentConfig) -> Option<usize> {
    let outcome = match AiClassifier::from_config(config) {
        Ok(classifier) => enrich(result, &classifier).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(changed) => Some(changed),
        Err(e) => {
            log_warning(format!("Enrichment skipped: {}", e));
            result.warnings.push(format!("enrichment skipped: {}", e));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::error::AiError;
    use crate::extract::extract;
    use crate::models::Grid;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeClassifier {
        outputs: Vec<ClassificationOutput>,
        seen: Mutex<Vec<ClassificationInput>>,
    }

    impl FakeClassifier {
        fn new(outputs: Vec<ClassificationOutput>) -> Self {
            Self {
                outputs,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Classifier for FakeClassifier {
        async fn classify(&self, items: &[ClassificationInput]) -> AiResult<Vec<ClassificationOutput>> {
            self.seen.lock().unwrap().extend_from_slice(items);
            Ok(self.outputs.clone())
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        async fn classify(&self, _items: &[ClassificationInput]) -> AiResult<Vec<ClassificationOutput>> {
            Err(AiError::Api("overloaded".to_string()))
        }
    }

    fn sample() -> ExtractionResult {
        let grid = Grid::from_value(json!([
            ["Item", "Labor", "Material", "Sub"],
            ["Drywal", 0, 1200, 0],
            ["Dumpster rental", 0, 0, 450],
            ["Supervision (RCG) 0%", 0, 0, 3000],
        ]))
        .unwrap();
        extract(&grid, &ParserConfig::default()).unwrap()
    }

    fn relabel(index: usize, category: Option<Category>, description: Option<&str>) -> ClassificationOutput {
        ClassificationOutput {
            index,
            category,
            description: description.map(String::from),
        }
    }

    #[test]
    fn test_relabel_keeps_amounts() {
        let mut result = sample();
        let before = result.clone();

        let changed = apply_classifications(
            &mut result,
            &[
                relabel(0, None, Some("Drywall")),
                relabel(1, Some(Category::Equipment), None),
            ],
        );

        assert_eq!(changed, 2);
        assert_eq!(result.items[0].description, "Drywall");
        assert_eq!(result.items[1].category, Category::Equipment);
        assert_eq!(result.items[1].price, before.items[1].price);
        assert_eq!(result.total_cost, before.total_cost);
        assert_eq!(result.total_price, before.total_price);
    }

    #[test]
    fn test_management_is_not_negotiable() {
        let mut result = sample();
        assert_eq!(result.items[2].category, Category::Management);

        let changed = apply_classifications(
            &mut result,
            &[
                relabel(0, Some(Category::Management), None),
                relabel(2, Some(Category::Subcontractor), None),
            ],
        );

        assert_eq!(changed, 0);
        assert_eq!(result.items[0].category, Category::Materials);
        assert_eq!(result.items[2].category, Category::Management);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_unknown_index_dropped() {
        let mut result = sample();
        let changed = apply_classifications(&mut result, &[relabel(99, Some(Category::Other), None)]);

        assert_eq!(changed, 0);
        assert!(result.warnings.last().unwrap().contains("unknown item 99"));
    }

    #[test]
    fn test_blank_description_ignored() {
        let mut result = sample();
        let changed = apply_classifications(&mut result, &[relabel(0, None, Some("   "))]);

        assert_eq!(changed, 0);
        assert_eq!(result.items[0].description, "Drywal");
    }

    #[tokio::test]
    async fn test_enrich_with_fake_classifier() {
        let mut result = sample();
        let classifier = FakeClassifier::new(vec![relabel(0, None, Some("Drywall"))]);

        let changed = enrich(&mut result, &classifier).await.unwrap();

        assert_eq!(changed, 1);
        let seen = classifier.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].cost, Money::from_cents(300_000));
    }

    #[tokio::test]
    async fn test_enrich_skips_empty_result() {
        let grid = Grid::from_value(json!([["Item", "Labor"]])).unwrap();
        let mut result = extract(&grid, &ParserConfig::default()).unwrap();
        let classifier = FakeClassifier::new(Vec::new());

        assert_eq!(enrich(&mut result, &classifier).await.unwrap(), 0);
        assert!(classifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enrich_error_leaves_result_alone() {
        let mut result = sample();
        let before = result.clone();

        assert!(enrich(&mut result, &FailingClassifier).await.is_err());
        assert_eq!(result, before);
    }
}
