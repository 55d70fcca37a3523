//! Totals aggregation and the advisory cross-check against the sheet's own
//! totals row.

use serde::Serialize;

use super::region::item_matches;
use super::text::{parse_amount, ParsedAmount};
use crate::config::ParserConfig;
use crate::models::{BudgetColumns, ExtractedLineItem, Grid, Money, TableRegion};

/// Sums over the extracted items plus what the sheet claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsCheck {
    pub total_cost: Money,
    pub total_price: Money,
    /// Row recognised as the sheet's totals row, if any.
    pub totals_row: Option<usize>,
    /// Total cost stated on that row, if readable.
    pub sheet_total: Option<Money>,
    pub warnings: Vec<String>,
}

/// Sum the items and compare against a totals row at or just below the region.
pub fn validate_totals(
    items: &[ExtractedLineItem],
    grid: &Grid,
    columns: &BudgetColumns,
    region: &TableRegion,
    config: &ParserConfig,
) -> TotalsCheck {
    let total_cost: Money = items.iter().map(|i| i.cost).sum();
    let total_price: Money = items.iter().map(|i| i.price).sum();

    let mut check = TotalsCheck {
        total_cost,
        total_price,
        totals_row: None,
        sheet_total: None,
        warnings: Vec::new(),
    };

    let Some(row) = find_totals_row(grid, columns, region, config) else {
        return check;
    };
    check.totals_row = Some(row);
    check.sheet_total = stated_total(grid, row, columns);

    if let Some(stated) = check.sheet_total {
        let difference = stated.abs_diff(total_cost);
        if difference > config.total_tolerance {
            check.warnings.push(format!(
                "totals row {} states total cost {} but extracted items sum to {} (difference {})",
                row + 1,
                stated,
                total_cost,
                difference
            ));
        }
    }

    check
}

fn find_totals_row(
    grid: &Grid,
    columns: &BudgetColumns,
    region: &TableRegion,
    config: &ParserConfig,
) -> Option<usize> {
    let mut candidates = vec![region.end_row, region.end_row + 1];
    if let Some(stop) = region.stop_row {
        candidates.push(stop);
    }
    candidates.dedup();

    candidates
        .into_iter()
        .filter(|row| *row < grid.len() && *row >= region.start_row)
        .find(|row| item_matches(grid, *row, columns, &config.total_markers))
}

/// The totals row's total-cost cell, else the sum of its component cells.
fn stated_total(grid: &Grid, row: usize, columns: &BudgetColumns) -> Option<Money> {
    if let Some(col) = columns.total_cost {
        if let ParsedAmount::Value(amount) = parse_amount(grid.cell(row, col)) {
            return Some(amount);
        }
    }

    let values: Vec<Money> = columns
        .cost_components()
        .into_iter()
        .filter_map(|(_, col)| match parse_amount(grid.cell(row, col)) {
            ParsedAmount::Value(amount) => Some(amount),
            _ => None,
        })
        .collect();

    (!values.is_empty()).then(|| values.into_iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::columns::map_columns;
    use crate::extract::line_items::extract_line_items;
    use crate::extract::region::detect_region;
    use serde_json::json;

    fn check(value: serde_json::Value) -> TotalsCheck {
        let grid = Grid::from_value(value).unwrap();
        let config = ParserConfig::default();
        let mapping = map_columns(&grid, 0, &config);
        let region = detect_region(&grid, 0, &mapping.columns, &config);
        let items = extract_line_items(&grid, &mapping.columns, &region, &config).items;
        validate_totals(&items, &grid, &mapping.columns, &region, &config)
    }

    #[test]
    fn test_matching_totals_row() {
        let result = check(json!([
            ["Item", "Labor", "Material", "Sub"],
            ["Demo", 15000, 6000, 0],
            ["Framing", 0, 10000, 27000],
            ["Total Cost", 58000, "-", "-"],
        ]));

        assert_eq!(result.total_cost, Money::from_cents(5_800_000));
        assert_eq!(result.totals_row, Some(3));
        assert_eq!(result.sheet_total, Some(Money::from_cents(5_800_000)));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_mismatch_is_warning() {
        let result = check(json!([
            ["Item", "Labor", "Total"],
            ["Demo", 100, 100],
            ["Paint", 50, 50],
            ["Grand Total", null, 175],
        ]));

        assert_eq!(result.total_cost, Money::from_cents(15_000));
        assert_eq!(result.sheet_total, Some(Money::from_cents(17_500)));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("175.00"));
        assert!(result.warnings[0].contains("150.00"));
    }

    #[test]
    fn test_rounding_within_tolerance() {
        let result = check(json!([
            ["Item", "Labor"],
            ["Demo", 100.40],
            ["Total", 100],
        ]));

        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_no_totals_row() {
        let result = check(json!([
            ["Item", "Labor"],
            ["Demo", 100],
            ["Paint", 25],
        ]));

        assert_eq!(result.totals_row, None);
        assert_eq!(result.total_cost, Money::from_cents(12_500));
        assert_eq!(result.total_price, Money::from_cents(15_625));
    }

    #[test]
    fn test_non_total_stop_marker_ignored() {
        let result = check(json!([
            ["Item", "Labor"],
            ["Demo", 100],
            ["Expenses", 999],
        ]));

        assert_eq!(result.totals_row, None);
        assert!(result.warnings.is_empty());
    }
}
