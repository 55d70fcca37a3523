//! Line item extraction.
//!
//! Each row of the table region expands into zero, one or several items:
//!
//! ```text
//! ┌──────────────────────────────┐      ┌──────────────────────────────────┐
//! │ Demo | 15000 | 6000 | 0      │  →   │ Demo (Labor)      15000  labor   │
//! │                              │      │ Demo (Materials)   6000  mat.    │  (shared group id)
//! ├──────────────────────────────┤      ├──────────────────────────────────┤
//! │ Paint |  0 | 800 | -         │  →   │ Paint               800  mat.    │
//! ├──────────────────────────────┤      ├──────────────────────────────────┤
//! │ (blank)                      │  →   │ nothing                          │
//! └──────────────────────────────┘      └──────────────────────────────────┘
//! ```
//!
//! Costs are exactly what the sheet says (or zero); prices are derived from
//! the category markup and never feed back into costs.

use regex::Regex;
use uuid::Uuid;

use super::region::{item_matches, row_is_empty};
use super::text::{parse_amount, ParsedAmount};
use crate::config::{ManagementRule, ParserConfig};
use crate::models::{
    BudgetColumns, Category, Cell, CostComponent, ExtractedLineItem, Grid, Money, TableRegion,
};

/// Items, warnings and split count for one table region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemExtraction {
    pub items: Vec<ExtractedLineItem>,
    pub warnings: Vec<String>,
    pub compound_rows_split: usize,
}

/// Which of the two management signals a description carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementSignal {
    Both,
    CompanyOnly,
    ZeroMarkupOnly,
    Neither,
}

/// Compiled form of [`ManagementRule`].
pub struct ManagementMatcher {
    company_tokens: Vec<Regex>,
    zero_markup: Vec<Regex>,
}

impl ManagementMatcher {
    pub fn new(rule: &ManagementRule) -> Self {
        let company_tokens = rule
            .company_tokens
            .iter()
            .filter(|t| !t.trim().is_empty())
            .filter_map(|t| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(t.trim()))).ok())
            .collect();
        // Patterns are checked by ParserConfig::validate.
        let zero_markup = rule
            .zero_markup_patterns
            .iter()
            .filter_map(|p| Regex::new(&format!("(?i){}", p)).ok())
            .collect();

        Self {
            company_tokens,
            zero_markup,
        }
    }

    pub fn signal(&self, description: &str) -> ManagementSignal {
        let company = self.company_tokens.iter().any(|r| r.is_match(description));
        let zero = self.zero_markup.iter().any(|r| r.is_match(description));
        match (company, zero) {
            (true, true) => ManagementSignal::Both,
            (true, false) => ManagementSignal::CompanyOnly,
            (false, true) => ManagementSignal::ZeroMarkupOnly,
            (false, false) => ManagementSignal::Neither,
        }
    }
}

/// Walk every row of `region` and build line items.
pub fn extract_line_items(
    grid: &Grid,
    columns: &BudgetColumns,
    region: &TableRegion,
    config: &ParserConfig,
) -> LineItemExtraction {
    let matcher = ManagementMatcher::new(&config.management);
    let components = item_components(columns);
    let mut out = LineItemExtraction::default();

    for row in region.rows() {
        if row_is_empty(grid, row, columns)
            || item_matches(grid, row, columns, &config.subtotal_markers)
        {
            continue;
        }
        extract_row(grid, row, columns, &components, &matcher, config, &mut out);
    }

    out
}

/// Component columns that produce items; a lone total column stands in when
/// no component column is mapped.
fn item_components(columns: &BudgetColumns) -> Vec<(CostComponent, usize)> {
    let components = columns.cost_components();
    if components.is_empty() {
        if let Some(total) = columns.total_cost {
            return vec![(CostComponent::Unclassified, total)];
        }
    }
    components
}

fn extract_row(
    grid: &Grid,
    row: usize,
    columns: &BudgetColumns,
    components: &[(CostComponent, usize)],
    matcher: &ManagementMatcher,
    config: &ParserConfig,
    out: &mut LineItemExtraction,
) {
    let sheet_row = row + 1;

    let mut positive: Vec<(CostComponent, Money)> = Vec::new();
    for (component, col) in components {
        let label = component.role().label();
        match parse_amount(grid.cell(row, *col)) {
            ParsedAmount::Blank => {}
            ParsedAmount::Value(amount) if amount.is_positive() => positive.push((*component, amount)),
            ParsedAmount::Value(amount) if amount < Money::ZERO => out.warnings.push(format!(
                "row {}: negative {} value {} treated as 0",
                sheet_row, label, amount
            )),
            ParsedAmount::Value(_) => {}
            ParsedAmount::Invalid(text) => out.warnings.push(format!(
                "row {}: non-numeric {} value '{}' treated as 0",
                sheet_row, label, text
            )),
            ParsedAmount::OutOfRange(text) => out.warnings.push(format!(
                "row {}: {} value '{}' exceeds {} and was treated as 0",
                sheet_row,
                label,
                text,
                Money::from_cents(Money::MAX_SHEET_CENTS)
            )),
        }
    }

    if positive.is_empty() {
        return;
    }

    let mut description = columns
        .item
        .map(|col| grid.cell(row, col).display_text())
        .unwrap_or_default();
    if description.is_empty() {
        description = format!("Row {}", sheet_row);
        out.warnings.push(format!(
            "row {}: cost values without a description, named '{}'",
            sheet_row, description
        ));
    }

    let is_management = match matcher.signal(&description) {
        ManagementSignal::Both => true,
        ManagementSignal::CompanyOnly => {
            out.warnings.push(format!(
                "row {}: '{}' names the company but has no 0% markup indicator; standard markup applied",
                sheet_row, description
            ));
            false
        }
        ManagementSignal::ZeroMarkupOnly => {
            out.warnings.push(format!(
                "row {}: '{}' indicates 0% markup but names no internal company; standard markup applied",
                sheet_row, description
            ));
            false
        }
        ManagementSignal::Neither => false,
    };

    let quantity = read_quantity(grid, row, columns, out);
    let unit = columns
        .unit
        .map(|col| grid.cell(row, col).display_text())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| config.default_unit.clone());

    let split_group_id = (positive.len() > 1).then(|| split_group_id(row, &description));
    if split_group_id.is_some() {
        out.compound_rows_split += 1;
    }

    for (component, cost) in positive {
        let category = if is_management {
            Category::Management
        } else {
            component.category()
        };
        let item_description = match split_group_id {
            Some(_) => format!("{} ({})", description, component.qualifier()),
            None => description.clone(),
        };

        out.items.push(ExtractedLineItem {
            description: item_description,
            category,
            cost,
            price: cost.with_markup(config.markup_percent.basis_points(category)),
            quantity,
            unit: unit.clone(),
            source_row_index: row,
            split_group_id,
        });
    }
}

/// Deterministic group id for the items split out of one row.
fn split_group_id(row: usize, description: &str) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("budget-row:{}:{}", row, description).as_bytes(),
    )
}

fn read_quantity(grid: &Grid, row: usize, columns: &BudgetColumns, out: &mut LineItemExtraction) -> f64 {
    let Some(col) = columns.quantity else {
        return 1.0;
    };

    let cell = grid.cell(row, col);
    let parsed = match cell {
        Cell::Empty => return 1.0,
        Cell::Number(n) => Some(*n),
        Cell::Text(s) if s.trim().is_empty() => return 1.0,
        Cell::Text(s) => s.trim().replace(',', "").parse::<f64>().ok(),
    };

    match parsed {
        Some(q) if q.is_finite() && q > 0.0 => q,
        _ => {
            out.warnings.push(format!(
                "row {}: quantity '{}' is not a positive number, using 1",
                row + 1,
                cell.display_text()
            ));
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::columns::map_columns;
    use crate::extract::region::detect_region;
    use serde_json::json;

    fn run(value: serde_json::Value) -> LineItemExtraction {
        let grid = Grid::from_value(value).unwrap();
        let config = ParserConfig::default();
        let mapping = map_columns(&grid, 0, &config);
        let region = detect_region(&grid, 0, &mapping.columns, &config);
        extract_line_items(&grid, &mapping.columns, &region, &config)
    }

    #[test]
    fn test_single_component_row() {
        let out = run(json!([
            ["Item", "Labor", "Material", "Sub"],
            ["Paint", 0, 800, "-"],
        ]));

        assert_eq!(out.items.len(), 1);
        let item = &out.items[0];
        assert_eq!(item.description, "Paint");
        assert_eq!(item.category, Category::Materials);
        assert_eq!(item.cost, Money::from_cents(80_000));
        assert_eq!(item.price, Money::from_cents(92_000));
        assert_eq!(item.quantity, 1.0);
        assert_eq!(item.unit, "ea");
        assert_eq!(item.split_group_id, None);
        assert_eq!(out.compound_rows_split, 0);
    }

    #[test]
    fn test_compound_row_split() {
        let out = run(json!([
            ["Item", "Labor", "Material", "Sub"],
            ["Demo", 15000, 6000, 0],
        ]));

        assert_eq!(out.items.len(), 2);
        assert_eq!(out.compound_rows_split, 1);

        let (labor, material) = (&out.items[0], &out.items[1]);
        assert_eq!(labor.description, "Demo (Labor)");
        assert_eq!(labor.category, Category::LaborInternal);
        assert_eq!(labor.cost, Money::from_cents(1_500_000));
        assert_eq!(material.description, "Demo (Materials)");
        assert_eq!(material.category, Category::Materials);
        assert_eq!(material.cost, Money::from_cents(600_000));

        assert!(labor.split_group_id.is_some());
        assert_eq!(labor.split_group_id, material.split_group_id);
        assert_eq!(labor.source_row_index, 1);
        assert_eq!(material.source_row_index, 1);
    }

    #[test]
    fn test_group_ids_are_deterministic_and_distinct() {
        let sheet = json!([
            ["Item", "Labor", "Material"],
            ["Demo", 1, 2],
            ["Demo", 3, 4],
        ]);
        let a = run(sheet.clone());
        let b = run(sheet);

        assert_eq!(a, b);
        assert_ne!(a.items[0].split_group_id, a.items[2].split_group_id);
    }

    #[test]
    fn test_management_override() {
        let out = run(json!([
            ["Item", "Labor", "Material", "Sub"],
            ["Supervision (RCG) 0%", null, null, 4200],
        ]));

        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].category, Category::Management);
        assert_eq!(out.items[0].price, out.items[0].cost);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_management_needs_both_signals() {
        let out = run(json!([
            ["Item", "Sub"],
            ["Supervision (RCG)", 4200],
            ["Permit fees at cost", 300],
        ]));

        assert_eq!(out.items[0].category, Category::Subcontractor);
        assert_eq!(out.items[1].category, Category::Subcontractor);
        assert!(out.items[0].price > out.items[0].cost);
        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings[0].contains("no 0% markup indicator"));
        assert!(out.warnings[1].contains("names no internal company"));
    }

    #[test]
    fn test_blank_row_is_silent() {
        let out = run(json!([
            ["Item", "Labor"],
            ["Demo", 100],
            [null, "   "],
            ["Paint", 50],
        ]));

        assert_eq!(out.items.len(), 2);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_non_numeric_and_negative_cells_coerced() {
        let out = run(json!([
            ["Item", "Labor", "Material"],
            ["Electrical", "TBD", 500],
            ["Credit", -200, null],
        ]));

        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].category, Category::Materials);
        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings[0].contains("row 2") && out.warnings[0].contains("'TBD'"));
        assert!(out.warnings[1].contains("row 3") && out.warnings[1].contains("negative"));
    }

    #[test]
    fn test_oversized_amount_coerced() {
        let out = run(json!([
            ["Item", "Labor", "Material"],
            ["Big", 1e17, 1e17],
            ["Paint", 0, 50],
        ]));

        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].description, "Paint");
        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings.iter().all(|w| w.contains("row 2") && w.contains("exceeds")));
    }

    #[test]
    fn test_section_subtotals_skipped() {
        let out = run(json!([
            ["Item", "Labor"],
            ["Demo", 100],
            ["Subtotal", 100],
            ["Paint", 50],
            ["Section Total", 50],
        ]));

        let names: Vec<&str> = out.items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(names, vec!["Demo", "Paint"]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_quantity_and_unit() {
        let out = run(json!([
            ["Item", "Qty", "Unit", "Material"],
            ["Drywall", "1,200", "sf", 3600],
            ["Trim", "lots", null, 90],
        ]));

        assert_eq!(out.items[0].quantity, 1200.0);
        assert_eq!(out.items[0].unit, "sf");
        assert_eq!(out.items[1].quantity, 1.0);
        assert_eq!(out.items[1].unit, "ea");
        assert!(out.warnings.iter().any(|w| w.contains("quantity 'lots'")));
    }

    #[test]
    fn test_missing_description() {
        let out = run(json!([
            ["Item", "Labor"],
            [null, 75],
        ]));

        assert_eq!(out.items[0].description, "Row 2");
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_total_only_sheet() {
        let out = run(json!([
            ["Description", "Amount"],
            ["Roofing", 12000],
        ]));

        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].category, Category::Other);
        assert_eq!(out.items[0].cost, Money::from_cents(1_200_000));
    }
}
