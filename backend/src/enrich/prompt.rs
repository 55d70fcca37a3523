//! Prompt building for line item classification.

use serde_json::{json, Value};

use super::ClassificationInput;

const RESPONSE_SCHEMA: &str = include_str!("../../schemas/classification-response.json");

/// System prompt: what the classifier may and may not change.
pub fn system_prompt() -> String {
    format!(
        r#"You review line items extracted from a construction budget spreadsheet.

Each item has an index, a description, a category and a cost. The costs are final
and were read directly from the sheet. You cannot change them.

## Your task

For each item whose category looks wrong, or whose description is unclear,
propose a correction:
- `category`: one of "subcontractor", "materials", "labor_internal", "equipment", "other"
- `description`: a short, clean description (fix typos, expand obvious abbreviations)

Leave out items that need no change. Never output "management": that category is
decided by pricing rules, not by you.

## Categories

- subcontractor: work performed by an outside trade (plumbing sub, electrician, roofer)
- materials: goods purchased (lumber, drywall, fixtures, paint)
- labor_internal: the builder's own crews
- equipment: rentals and machinery (dumpster, lift, excavator)
- other: permits, fees, allowances, anything else

## Output format

Return ONLY a JSON object matching this schema, with no explanation:

```json
{schema}
```"#,
        schema = RESPONSE_SCHEMA
    )
}

/// User prompt listing the items to review.
pub fn user_prompt(items: &[ClassificationInput]) -> String {
    let listing = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Here are the {} extracted items:\n\n```json\n{}\n```\n\nReturn the classifications JSON.",
        items.len(),
        listing
    )
}

/// Messages array for the Anthropic Messages API.
pub fn build_messages(items: &[ClassificationInput]) -> Value {
    json!([
        {
            "role": "user",
            "content": user_prompt(items)
        }
    ])
}
