//! Domain models for the budget import pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Grid`] / [`Cell`] - Immutable tabular input, as decoded upstream
//! - [`ColumnRole`] / [`BudgetColumns`] - Semantic column roles and their indices
//! - [`ColumnMappingResult`] - Column mapping with confidence and warnings
//! - [`TableRegion`] / [`StopReason`] - Bounds of the line item table
//! - [`Category`] / [`CostComponent`] - Vendor types and the cost columns feeding them
//! - [`Money`] - Exact fixed-point amounts (cents)
//! - [`ExtractedLineItem`] / [`ExtractionResult`] - Pipeline output

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, RangeInclusive, Sub};
use uuid::Uuid;

// =============================================================================
// Grid
// =============================================================================

/// A single spreadsheet cell: absent, plain text, or a plain number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Text content, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for absent cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Cell rendered as text; numbers use their shortest representation.
    pub fn display_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// Ordered rows of ordered cells. Rows may be ragged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Build a grid from a JSON array of arrays (`null` / string / number cells).
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row by index; an out-of-range row reads as empty.
    pub fn row(&self, index: usize) -> &[Cell] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cell by position; anything outside a ragged row reads as [`Cell::Empty`].
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.row(row).get(col).unwrap_or(&EMPTY_CELL)
    }
}

// =============================================================================
// Column Roles
// =============================================================================

/// Semantic role a spreadsheet column can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnRole {
    Item,
    LaborCost,
    MaterialCost,
    SubcontractorCost,
    EquipmentCost,
    Unit,
    Quantity,
    TotalCost,
    TotalPrice,
}

impl ColumnRole {
    /// Canonical order. Ties in fuzzy matching resolve to the earlier role.
    pub const ALL: [ColumnRole; 9] = [
        ColumnRole::Item,
        ColumnRole::LaborCost,
        ColumnRole::MaterialCost,
        ColumnRole::SubcontractorCost,
        ColumnRole::EquipmentCost,
        ColumnRole::Unit,
        ColumnRole::Quantity,
        ColumnRole::TotalCost,
        ColumnRole::TotalPrice,
    ];

    /// Roles that count towards mapping confidence as optional.
    pub const OPTIONAL: [ColumnRole; 5] = [
        ColumnRole::EquipmentCost,
        ColumnRole::Unit,
        ColumnRole::Quantity,
        ColumnRole::TotalCost,
        ColumnRole::TotalPrice,
    ];

    /// Human readable name used in warnings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::LaborCost => "labor cost",
            Self::MaterialCost => "material cost",
            Self::SubcontractorCost => "subcontractor cost",
            Self::EquipmentCost => "equipment cost",
            Self::Unit => "unit",
            Self::Quantity => "quantity",
            Self::TotalCost => "total cost",
            Self::TotalPrice => "total price",
        }
    }

    /// Whether a header match for this role signals a cost column.
    pub fn is_cost_like(&self) -> bool {
        matches!(
            self,
            Self::LaborCost
                | Self::MaterialCost
                | Self::SubcontractorCost
                | Self::EquipmentCost
                | Self::TotalCost
                | Self::TotalPrice
        )
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Column index per role, `None` when unmapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetColumns {
    pub item: Option<usize>,
    pub labor_cost: Option<usize>,
    pub material_cost: Option<usize>,
    pub subcontractor_cost: Option<usize>,
    pub equipment_cost: Option<usize>,
    pub unit: Option<usize>,
    pub quantity: Option<usize>,
    pub total_cost: Option<usize>,
    pub total_price: Option<usize>,
}

impl BudgetColumns {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Item => self.item,
            ColumnRole::LaborCost => self.labor_cost,
            ColumnRole::MaterialCost => self.material_cost,
            ColumnRole::SubcontractorCost => self.subcontractor_cost,
            ColumnRole::EquipmentCost => self.equipment_cost,
            ColumnRole::Unit => self.unit,
            ColumnRole::Quantity => self.quantity,
            ColumnRole::TotalCost => self.total_cost,
            ColumnRole::TotalPrice => self.total_price,
        }
    }

    pub fn set(&mut self, role: ColumnRole, index: usize) {
        let slot = match role {
            ColumnRole::Item => &mut self.item,
            ColumnRole::LaborCost => &mut self.labor_cost,
            ColumnRole::MaterialCost => &mut self.material_cost,
            ColumnRole::SubcontractorCost => &mut self.subcontractor_cost,
            ColumnRole::EquipmentCost => &mut self.equipment_cost,
            ColumnRole::Unit => &mut self.unit,
            ColumnRole::Quantity => &mut self.quantity,
            ColumnRole::TotalCost => &mut self.total_cost,
            ColumnRole::TotalPrice => &mut self.total_price,
        };
        *slot = Some(index);
    }

    pub fn is_mapped(&self, role: ColumnRole) -> bool {
        self.get(role).is_some()
    }

    /// Every mapped column index, in role order.
    pub fn mapped_indices(&self) -> Vec<usize> {
        ColumnRole::ALL.iter().filter_map(|r| self.get(*r)).collect()
    }

    /// Mapped cost component columns in fixed component order.
    pub fn cost_components(&self) -> Vec<(CostComponent, usize)> {
        CostComponent::COLUMNS
            .iter()
            .filter_map(|c| self.get(c.role()).map(|idx| (*c, idx)))
            .collect()
    }

    /// True when at least one of labor / material / subcontractor is mapped.
    pub fn has_required_cost(&self) -> bool {
        self.labor_cost.is_some() || self.material_cost.is_some() || self.subcontractor_cost.is_some()
    }
}

/// Output of the column mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMappingResult {
    pub columns: BudgetColumns,
    /// Score in [0, 1].
    pub confidence: f64,
    pub warnings: Vec<String>,
}

// =============================================================================
// Table Region
// =============================================================================

/// Why the region detector stopped scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    StopMarkerMatched,
    ConsecutiveEmptyRows,
    EndOfGrid,
}

/// Rows holding line items. `end_row < start_row` means the table is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRegion {
    pub start_row: usize,
    /// Inclusive.
    pub end_row: usize,
    pub stop_reason: StopReason,
    /// Row whose item text matched a stop marker, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stop_row: Option<usize>,
}

impl TableRegion {
    pub fn rows(&self) -> RangeInclusive<usize> {
        self.start_row..=self.end_row
    }

    pub fn is_empty(&self) -> bool {
        self.end_row < self.start_row
    }
}

// =============================================================================
// Categories
// =============================================================================

/// Vendor type of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Subcontractor,
    Materials,
    LaborInternal,
    Equipment,
    Management,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Subcontractor,
        Category::Materials,
        Category::LaborInternal,
        Category::Equipment,
        Category::Management,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subcontractor => "subcontractor",
            Self::Materials => "materials",
            Self::LaborInternal => "labor_internal",
            Self::Equipment => "equipment",
            Self::Management => "management",
            Self::Other => "other",
        }
    }

    /// Parse from the snake_case wire name.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code.trim())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cost column that yields line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostComponent {
    Labor,
    Material,
    Subcontractor,
    Equipment,
    /// Total-only sheets, where no component column exists.
    Unclassified,
}

impl CostComponent {
    /// Component columns in emission order.
    pub const COLUMNS: [CostComponent; 4] = [
        CostComponent::Labor,
        CostComponent::Material,
        CostComponent::Subcontractor,
        CostComponent::Equipment,
    ];

    pub fn role(&self) -> ColumnRole {
        match self {
            Self::Labor => ColumnRole::LaborCost,
            Self::Material => ColumnRole::MaterialCost,
            Self::Subcontractor => ColumnRole::SubcontractorCost,
            Self::Equipment => ColumnRole::EquipmentCost,
            Self::Unclassified => ColumnRole::TotalCost,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::Labor => Category::LaborInternal,
            Self::Material => Category::Materials,
            Self::Subcontractor => Category::Subcontractor,
            Self::Equipment => Category::Equipment,
            Self::Unclassified => Category::Other,
        }
    }

    /// Suffix used when a compound row is split.
    pub fn qualifier(&self) -> &'static str {
        match self {
            Self::Labor => "Labor",
            Self::Material => "Materials",
            Self::Subcontractor => "Subcontractor",
            Self::Equipment => "Equipment",
            Self::Unclassified => "Other",
        }
    }
}

// =============================================================================
// Money
// =============================================================================

/// Exact amount in cents.
///
/// Serialized as a decimal string with two fractional digits (`"15000.00"`).
/// Arithmetic saturates at the `i64` bounds instead of overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest magnitude accepted from a sheet: ten trillion, in cents.
    pub const MAX_SHEET_CENTS: i64 = 1_000_000_000_000_000;

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Round a sheet number to cents, half away from zero.
    pub fn from_f64(value: f64) -> Self {
        Money((value * 100.0).round() as i64)
    }

    /// Like [`Money::from_f64`], but `None` for non-finite values and
    /// magnitudes above [`Money::MAX_SHEET_CENTS`].
    pub fn from_sheet_value(value: f64) -> Option<Self> {
        let cents = (value * 100.0).round();
        (cents.is_finite() && cents.abs() <= Self::MAX_SHEET_CENTS as f64).then(|| Money(cents as i64))
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// `self` plus `basis_points / 10000` of itself, rounded half up to the cent.
    pub fn with_markup(&self, basis_points: i64) -> Self {
        let markup = (self.0 as i128 * basis_points as i128 + 5_000).div_euclid(10_000);
        let price = (self.0 as i128 + markup).clamp(i64::MIN as i128, i64::MAX as i128);
        Money(price as i64)
    }

    pub fn abs_diff(&self, other: Money) -> Money {
        Money(self.0.abs_diff(other.0).min(i64::MAX as u64) as i64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Money::from_f64(n)),
            Raw::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Money::from_f64)
                .map_err(|_| serde::de::Error::custom(format!("invalid amount '{}'", s))),
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// One estimate line item, traceable to its source row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedLineItem {
    pub description: String,
    pub category: Category,
    /// What the business pays, exactly as read from the sheet.
    pub cost: Money,
    /// Cost plus the category markup.
    pub price: Money,
    pub quantity: f64,
    pub unit: String,
    pub source_row_index: usize,
    /// Shared by items produced from one compound row.
    pub split_group_id: Option<Uuid>,
}

/// Everything one pipeline invocation produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub items: Vec<ExtractedLineItem>,
    pub warnings: Vec<String>,
    pub header_row_index: usize,
    pub region: TableRegion,
    pub columns: BudgetColumns,
    pub mapping_confidence: f64,
    pub compound_rows_split: usize,
    pub total_cost: Money,
    pub total_price: Money,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grid_from_value_ragged() {
        let grid = Grid::from_value(json!([
            ["Item", "Labor"],
            ["Demo", 1500, null, "extra"],
            []
        ]))
        .unwrap();

        assert_eq!(grid.len(), 3);
        assert_eq!(grid.cell(0, 0), &Cell::Text("Item".into()));
        assert_eq!(grid.cell(1, 1), &Cell::Number(1500.0));
        assert_eq!(grid.cell(1, 2), &Cell::Empty);
        assert_eq!(grid.cell(2, 5), &Cell::Empty);
        assert_eq!(grid.cell(99, 0), &Cell::Empty);
    }

    #[test]
    fn test_cell_blank() {
        assert!(Cell::Empty.is_blank());
        assert!(Cell::Text("   ".into()).is_blank());
        assert!(!Cell::Number(0.0).is_blank());
        assert!(!Cell::from("x").is_blank());
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1_500_000).to_string(), "15000.00");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::from_f64(12.346).to_string(), "12.35");
    }

    #[test]
    fn test_money_markup_rounding() {
        // 15% of 10.01 = 1.5015 -> 1.50
        assert_eq!(Money::from_cents(1001).with_markup(1500), Money::from_cents(1151));
        // 15% of 10.10 = 1.515 -> 1.52
        assert_eq!(Money::from_cents(1010).with_markup(1500), Money::from_cents(1162));
        assert_eq!(Money::from_cents(1234).with_markup(0), Money::from_cents(1234));
    }

    #[test]
    fn test_money_sheet_ceiling() {
        assert_eq!(Money::from_sheet_value(1e13), Some(Money::from_cents(Money::MAX_SHEET_CENTS)));
        assert_eq!(Money::from_sheet_value(1e17), None);
        assert_eq!(Money::from_sheet_value(-1e17), None);
        assert_eq!(Money::from_sheet_value(f64::INFINITY), None);
    }

    #[test]
    fn test_money_saturates() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max + Money::from_cents(1), max);
        assert_eq!(max.with_markup(2500), max);
        assert_eq!(vec![max, max, max].into_iter().sum::<Money>(), max);
        assert_eq!(Money::from_cents(i64::MIN).abs_diff(max), max);
    }

    #[test]
    fn test_money_serde() {
        let json = serde_json::to_string(&Money::from_cents(600_000)).unwrap();
        assert_eq!(json, "\"6000.00\"");

        let parsed: Money = serde_json::from_str("\"6000.5\"").unwrap();
        assert_eq!(parsed, Money::from_cents(600_050));
        let parsed: Money = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, Money::from_cents(4200));
    }

    #[test]
    fn test_budget_columns_components_order() {
        let mut cols = BudgetColumns::default();
        cols.set(ColumnRole::SubcontractorCost, 3);
        cols.set(ColumnRole::LaborCost, 1);
        cols.set(ColumnRole::Item, 0);

        let comps = cols.cost_components();
        assert_eq!(comps, vec![(CostComponent::Labor, 1), (CostComponent::Subcontractor, 3)]);
        assert_eq!(cols.mapped_indices(), vec![0, 1, 3]);
        assert!(cols.has_required_cost());
    }

    #[test]
    fn test_category_codes() {
        assert_eq!(Category::from_code("labor_internal"), Some(Category::LaborInternal));
        assert_eq!(Category::from_code("bogus"), None);
        let json = serde_json::to_string(&Category::LaborInternal).unwrap();
        assert_eq!(json, "\"labor_internal\"");
    }

    #[test]
    fn test_region_empty() {
        let region = TableRegion {
            start_row: 1,
            end_row: 0,
            stop_reason: StopReason::StopMarkerMatched,
            stop_row: Some(1),
        };
        assert!(region.is_empty());
        assert_eq!(region.rows().count(), 0);
    }
}
