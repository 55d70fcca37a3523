//! Column mapping: header cell text → semantic column role.
//!
//! Header cells are scanned left to right. Each cell takes the unassigned
//! role whose synonym list it matches best (exact before approximate,
//! smaller edit distance first, then canonical role order). A role, once
//! taken, is never reassigned.

use super::text::{match_synonyms, normalize_cell, SynonymMatch};
use crate::config::ParserConfig;
use crate::error::{ExtractResult, ExtractionError};
use crate::models::{BudgetColumns, ColumnMappingResult, ColumnRole, Grid};

/// Confidence weight of each of the two required slots, in hundredths.
const REQUIRED_WEIGHT: i64 = 50;
/// Confidence lost per unmapped optional role, in hundredths.
const OPTIONAL_PENALTY: i64 = 4;

/// Map the header row's cells to column roles.
pub fn map_columns(grid: &Grid, header_row: usize, config: &ParserConfig) -> ColumnMappingResult {
    let mut columns = BudgetColumns::default();
    let mut warnings = Vec::new();

    for (col, cell) in grid.row(header_row).iter().enumerate() {
        let text = normalize_cell(cell);
        if text.is_empty() {
            continue;
        }

        let best = ColumnRole::ALL
            .into_iter()
            .filter(|role| !columns.is_mapped(*role))
            .filter_map(|role| {
                match_synonyms(&text, config.synonyms.for_role(role)).map(|m| (m, role))
            })
            .min();

        if let Some((quality, role)) = best {
            columns.set(role, col);
            if let SynonymMatch::Fuzzy(distance) = quality {
                warnings.push(format!(
                    "header '{}' (column {}) matched {} by approximate spelling (distance {})",
                    cell.display_text(),
                    col + 1,
                    role,
                    distance
                ));
            }
        }
    }

    let mut mapped_required = 0;
    if columns.item.is_some() {
        mapped_required += 1;
    } else {
        warnings.push("no item/description column found".to_string());
    }
    if columns.has_required_cost() {
        mapped_required += 1;
    } else {
        warnings.push("no labor, material or subcontractor cost column found".to_string());
    }

    let mut unmapped_optional = 0;
    for role in ColumnRole::OPTIONAL {
        if !columns.is_mapped(role) {
            unmapped_optional += 1;
            warnings.push(format!("no {} column found", role));
        }
    }

    let hundredths = (REQUIRED_WEIGHT * mapped_required - OPTIONAL_PENALTY * unmapped_optional).clamp(0, 100);

    ColumnMappingResult {
        columns,
        confidence: hundredths as f64 / 100.0,
        warnings,
    }
}

/// Fail when the item column is missing; cost columns may legitimately be absent.
pub fn ensure_required(mapping: &ColumnMappingResult, header_row: usize) -> ExtractResult<()> {
    if mapping.columns.item.is_some() {
        return Ok(());
    }
    Err(ExtractionError::RequiredColumnsMissing {
        header_row,
        missing: vec![ColumnRole::Item.label().to_string()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header(cells: serde_json::Value) -> Grid {
        Grid::from_value(json!([cells])).unwrap()
    }

    #[test]
    fn test_simple_mapping() {
        let g = header(json!(["Item", "Labor", "Material", "Sub"]));
        let result = map_columns(&g, 0, &ParserConfig::default());

        assert_eq!(result.columns.item, Some(0));
        assert_eq!(result.columns.labor_cost, Some(1));
        assert_eq!(result.columns.material_cost, Some(2));
        assert_eq!(result.columns.subcontractor_cost, Some(3));
        assert_eq!(result.columns.unit, None);
        // both required slots, five optional roles missing
        assert_eq!(result.confidence, 0.8);
        assert!(result.warnings.contains(&"no unit column found".to_string()));
    }

    #[test]
    fn test_typo_maps_to_labor() {
        let g = header(json!(["Description", "Lbor", "Materails"]));
        let result = map_columns(&g, 0, &ParserConfig::default());

        assert_eq!(result.columns.labor_cost, Some(1));
        assert_eq!(result.columns.material_cost, Some(2));
        assert!(result.warnings.iter().any(|w| w.contains("'Lbor'")));
    }

    #[test]
    fn test_each_role_assigned_once() {
        let g = header(json!(["Item", "Total", "Total Cost", "Price", "Qty", "UOM"]));
        let result = map_columns(&g, 0, &ParserConfig::default());

        assert_eq!(result.columns.total_cost, Some(1));
        assert_eq!(result.columns.total_price, Some(3));
        assert_eq!(result.columns.quantity, Some(4));
        assert_eq!(result.columns.unit, Some(5));
        assert!(!result.columns.mapped_indices().contains(&2));
    }

    #[test]
    fn test_missing_cost_columns_lower_confidence() {
        let g = header(json!(["Scope", "Notes"]));
        let result = map_columns(&g, 0, &ParserConfig::default());

        assert_eq!(result.columns.item, Some(0));
        assert!(result.confidence < 0.5);
        assert!(result
            .warnings
            .contains(&"no labor, material or subcontractor cost column found".to_string()));
        assert!(ensure_required(&result, 0).is_ok());
    }

    #[test]
    fn test_missing_item_is_hard_failure() {
        let g = header(json!(["Labor", "Material"]));
        let result = map_columns(&g, 0, &ParserConfig::default());

        assert_eq!(result.columns.item, None);
        let err = ensure_required(&result, 0).unwrap_err();
        assert!(matches!(err, ExtractionError::RequiredColumnsMissing { header_row: 0, .. }));
    }

    #[test]
    fn test_blank_header_cells_skipped() {
        let g = header(json!([null, "  ", "Item", "Equipment"]));
        let result = map_columns(&g, 0, &ParserConfig::default());

        assert_eq!(result.columns.item, Some(2));
        assert_eq!(result.columns.equipment_cost, Some(3));
    }
}
