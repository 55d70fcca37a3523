//! Parser configuration.
//!
//! Every business rule the pipeline applies lives here rather than in the
//! algorithm: synonym tables per column role, stop markers, markup rates per
//! category, the management override, and the numeric thresholds. A config is
//! immutable once loaded and is passed by reference into every stage.
//!
//! ```rust,ignore
//! use budget_import::ParserConfig;
//!
//! let config = ParserConfig::from_file("rules.json")?;
//! let result = budget_import::extract(&grid, &config)?;
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::models::{Category, ColumnRole, Money};

/// Environment variable naming a config file for the CLI and server.
pub const CONFIG_ENV_VAR: &str = "BUDGET_IMPORT_CONFIG";

/// Complete rule set for one extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Header synonyms per column role.
    pub synonyms: RoleSynonyms,

    /// Item-column labels that end the line item table.
    pub stop_markers: Vec<String>,

    /// Item-column labels recognised as a totals row. These also end the table.
    pub total_markers: Vec<String>,

    /// Item-column labels of in-table section subtotals, skipped without ending the table.
    pub subtotal_markers: Vec<String>,

    /// Markup per category, in percent. Management is always billed at cost.
    pub markup_percent: MarkupRates,

    /// Signals for the management / zero-markup override.
    pub management: ManagementRule,

    /// Only this many leading rows are considered as header candidates.
    pub header_scan_rows: usize,

    /// Minimum header score for a row to be accepted.
    pub min_header_score: i32,

    /// Consecutive empty rows that end the table.
    pub empty_row_run: usize,

    /// Allowed difference between the computed and the sheet total.
    pub total_tolerance: Money,

    /// Confidence below which a warning is added.
    pub low_confidence_threshold: f64,

    /// Unit used when the sheet has none.
    pub default_unit: String,

    /// Optional classification collaborator.
    pub enrichment: EnrichmentConfig,
}

/// Synonym lists, one per [`ColumnRole`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleSynonyms {
    pub item: Vec<String>,
    pub labor_cost: Vec<String>,
    pub material_cost: Vec<String>,
    pub subcontractor_cost: Vec<String>,
    pub equipment_cost: Vec<String>,
    pub unit: Vec<String>,
    pub quantity: Vec<String>,
    pub total_cost: Vec<String>,
    pub total_price: Vec<String>,
}

/// Markup percentages for the categories that carry one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupRates {
    pub subcontractor: f64,
    pub materials: f64,
    pub labor_internal: f64,
    pub equipment: f64,
    pub other: f64,
}

/// Override rule: rows naming an internal company token together with a
/// zero-markup indicator are management lines billed at cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementRule {
    /// Internal company abbreviations, matched as whole words, case-insensitive.
    pub company_tokens: Vec<String>,
    /// Case-insensitive regular expressions marking a 0% markup.
    pub zero_markup_patterns: Vec<String>,
}

/// Settings for the optional classification step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub model: String,
    pub max_tokens: u32,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Default for RoleSynonyms {
    fn default() -> Self {
        Self {
            item: strings(&[
                "item", "items", "description", "desc", "scope", "line item", "scope of work",
                "work item", "item description", "task", "activity", "trade", "budget item",
                "cost item",
            ]),
            labor_cost: strings(&[
                "labor", "labour", "labor cost", "labour cost", "labor total", "install",
                "installation", "in house labor",
            ]),
            material_cost: strings(&[
                "material", "materials", "material cost", "materials cost", "mat", "matl",
                "supplies",
            ]),
            subcontractor_cost: strings(&[
                "sub", "subs", "subcontractor", "subcontractors", "subcontract", "sub cost",
                "subcontractor cost", "trade partner",
            ]),
            equipment_cost: strings(&[
                "equipment", "equip", "equipment cost", "rental", "equipment rental",
                "machinery",
            ]),
            unit: strings(&["unit", "units", "uom", "u/m", "unit of measure"]),
            quantity: strings(&["qty", "quantity", "quant", "count", "no of units"]),
            total_cost: strings(&[
                "total", "total cost", "cost", "line total", "extended cost", "ext cost", "sum",
                "budget", "amount",
            ]),
            total_price: strings(&[
                "total price", "price", "sell price", "client price", "contract price",
                "extended price",
            ]),
        }
    }
}

impl RoleSynonyms {
    pub fn for_role(&self, role: ColumnRole) -> &[String] {
        match role {
            ColumnRole::Item => &self.item,
            ColumnRole::LaborCost => &self.labor_cost,
            ColumnRole::MaterialCost => &self.material_cost,
            ColumnRole::SubcontractorCost => &self.subcontractor_cost,
            ColumnRole::EquipmentCost => &self.equipment_cost,
            ColumnRole::Unit => &self.unit,
            ColumnRole::Quantity => &self.quantity,
            ColumnRole::TotalCost => &self.total_cost,
            ColumnRole::TotalPrice => &self.total_price,
        }
    }
}

impl Default for MarkupRates {
    fn default() -> Self {
        Self {
            subcontractor: 15.0,
            materials: 15.0,
            labor_internal: 25.0,
            equipment: 15.0,
            other: 15.0,
        }
    }
}

impl MarkupRates {
    /// Markup for a category in basis points (1% = 100).
    pub fn basis_points(&self, category: Category) -> i64 {
        let percent = match category {
            Category::Management => return 0,
            Category::Subcontractor => self.subcontractor,
            Category::Materials => self.materials,
            Category::LaborInternal => self.labor_internal,
            Category::Equipment => self.equipment,
            Category::Other => self.other,
        };
        (percent * 100.0).round() as i64
    }

    fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("subcontractor", self.subcontractor),
            ("materials", self.materials),
            ("labor_internal", self.labor_internal),
            ("equipment", self.equipment),
            ("other", self.other),
        ]
    }
}

impl Default for ManagementRule {
    fn default() -> Self {
        Self {
            company_tokens: strings(&["RCG"]),
            zero_markup_patterns: strings(&[
                r"(^|[^\d.])0+(\.0+)?\s*%",
                r"\bno\s+mark-?up\b",
                r"\bat\s+cost\b",
            ]),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            synonyms: RoleSynonyms::default(),
            stop_markers: strings(&[
                "total", "totals", "total cost", "total costs", "grand total", "project total",
                "total budget", "expenses", "summary", "overhead and profit", "overhead & profit",
                "contractor fee",
            ]),
            total_markers: strings(&[
                "total", "totals", "total cost", "total costs", "grand total", "project total",
                "total budget",
            ]),
            subtotal_markers: strings(&["subtotal", "section total", "phase total"]),
            markup_percent: MarkupRates::default(),
            management: ManagementRule::default(),
            header_scan_rows: 20,
            min_header_score: 5,
            empty_row_run: 3,
            total_tolerance: Money::from_cents(100),
            low_confidence_threshold: 0.75,
            default_unit: "ea".to_string(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

impl ParserConfig {
    /// Parse and validate a config from JSON. Missing keys take defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: ParserConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Load from the file named by `BUDGET_IMPORT_CONFIG`, or the defaults.
    pub fn from_env() -> ConfigResult<Self> {
        // Try loading .env file
        let _ = dotenvy::dotenv();

        match env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check every value the pipeline relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.synonyms.item.is_empty() {
            return Err(ConfigError::invalid("synonyms.item", "must not be empty"));
        }
        if self.synonyms.labor_cost.is_empty()
            && self.synonyms.material_cost.is_empty()
            && self.synonyms.subcontractor_cost.is_empty()
        {
            return Err(ConfigError::invalid(
                "synonyms",
                "at least one of laborCost, materialCost, subcontractorCost needs synonyms",
            ));
        }

        for (name, percent) in self.markup_percent.entries() {
            if !percent.is_finite() || percent < 0.0 {
                return Err(ConfigError::invalid(
                    format!("markup_percent.{}", name),
                    format!("must be a non-negative number, got {}", percent),
                ));
            }
        }

        for pattern in &self.management.zero_markup_patterns {
            Regex::new(pattern).map_err(|e| {
                ConfigError::invalid("management.zero_markup_patterns", e.to_string())
            })?;
        }

        if self.header_scan_rows == 0 {
            return Err(ConfigError::invalid("header_scan_rows", "must be at least 1"));
        }
        if self.empty_row_run == 0 {
            return Err(ConfigError::invalid("empty_row_run", "must be at least 1"));
        }
        if self.total_tolerance < Money::ZERO {
            return Err(ConfigError::invalid("total_tolerance", "must not be negative"));
        }
        if !(0.0..=1.0).contains(&self.low_confidence_threshold) {
            return Err(ConfigError::invalid(
                "low_confidence_threshold",
                "must be between 0 and 1",
            ));
        }
        if self.default_unit.trim().is_empty() {
            return Err(ConfigError::invalid("default_unit", "must not be empty"));
        }

        Ok(())
    }
}
