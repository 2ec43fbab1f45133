//! Warehouse stock entry models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::delivery::Docstatus;

/// Movement type of a stock entry. Receipt-like types add to the balance,
/// issue-like types subtract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEntryType {
    #[serde(rename = "Opening Stock")]
    OpeningStock,
    Receipt,
    #[serde(rename = "Adjustment (Increase)")]
    AdjustmentIncrease,
    Issue,
    #[serde(rename = "Adjustment (Decrease)")]
    AdjustmentDecrease,
}

impl StockEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockEntryType::OpeningStock => "Opening Stock",
            StockEntryType::Receipt => "Receipt",
            StockEntryType::AdjustmentIncrease => "Adjustment (Increase)",
            StockEntryType::Issue => "Issue",
            StockEntryType::AdjustmentDecrease => "Adjustment (Decrease)",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Opening Stock" => Some(StockEntryType::OpeningStock),
            "Receipt" => Some(StockEntryType::Receipt),
            "Adjustment (Increase)" => Some(StockEntryType::AdjustmentIncrease),
            "Issue" => Some(StockEntryType::Issue),
            "Adjustment (Decrease)" => Some(StockEntryType::AdjustmentDecrease),
            _ => None,
        }
    }

    /// True when the entry adds to the warehouse balance.
    pub fn is_inward(&self) -> bool {
        matches!(
            self,
            StockEntryType::OpeningStock
                | StockEntryType::Receipt
                | StockEntryType::AdjustmentIncrease
        )
    }
}

impl std::fmt::Display for StockEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A warehouse stock movement document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockEntry {
    pub id: Uuid,
    pub posting_date: NaiveDate,
    pub entry_type: StockEntryType,
    pub warehouse: String,
    /// Set when the entry was auto-created from a submitted delivery
    pub delivery_id: Option<Uuid>,
    pub docstatus: Docstatus,
    pub items: Vec<StockEntryItem>,
    pub total_qty: Decimal,
    pub total_kg: Decimal,
    pub total_items: i32,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One stock entry row; (item, pack_size) must be unique within an entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockEntryItem {
    pub id: Uuid,
    pub idx: i32,
    pub item: String,
    pub pack_size: String,
    pub pack_weight_kg: Decimal,
    pub qty: Decimal,
    pub kg: Decimal,
}

/// Computed stock entry totals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockEntryTotals {
    pub total_qty: Decimal,
    pub total_kg: Decimal,
    pub total_items: i32,
}

/// Recompute row KG and the entry totals.
pub fn compute_stock_totals(items: &mut [StockEntryItem]) -> StockEntryTotals {
    let mut totals = StockEntryTotals {
        total_qty: Decimal::ZERO,
        total_kg: Decimal::ZERO,
        total_items: items.len() as i32,
    };

    for row in items.iter_mut() {
        row.kg = row.qty * row.pack_weight_kg;
        totals.total_qty += row.qty;
        totals.total_kg += row.kg;
    }

    totals
}

/// First duplicated (item, pack_size) key among rows, if any.
pub fn find_duplicate_pack_row(items: &[StockEntryItem]) -> Option<(usize, &StockEntryItem)> {
    for (i, row) in items.iter().enumerate() {
        if items[..i]
            .iter()
            .any(|prev| prev.item == row.item && prev.pack_size == row.pack_size)
        {
            return Some((i, row));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn row(item: &str, pack: &str, weight: &str, qty: &str) -> StockEntryItem {
        StockEntryItem {
            id: Uuid::new_v4(),
            idx: 1,
            item: item.to_string(),
            pack_size: pack.to_string(),
            pack_weight_kg: dec(weight),
            qty: dec(qty),
            kg: Decimal::ZERO,
        }
    }

    #[test]
    fn test_entry_type_direction() {
        assert!(StockEntryType::OpeningStock.is_inward());
        assert!(StockEntryType::Receipt.is_inward());
        assert!(StockEntryType::AdjustmentIncrease.is_inward());
        assert!(!StockEntryType::Issue.is_inward());
        assert!(!StockEntryType::AdjustmentDecrease.is_inward());
    }

    #[test]
    fn test_entry_type_round_trip() {
        for t in [
            StockEntryType::OpeningStock,
            StockEntryType::Receipt,
            StockEntryType::AdjustmentIncrease,
            StockEntryType::Issue,
            StockEntryType::AdjustmentDecrease,
        ] {
            assert_eq!(StockEntryType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn test_compute_stock_totals() {
        let mut items = vec![
            row("Wheat", "50 KG", "50", "4"),
            row("Maize", "25 KG", "25", "2"),
        ];
        let totals = compute_stock_totals(&mut items);

        assert_eq!(totals.total_qty, dec("6"));
        assert_eq!(totals.total_kg, dec("250"));
        assert_eq!(totals.total_items, 2);
        assert_eq!(items[0].kg, dec("200"));
    }

    #[test]
    fn test_find_duplicate_pack_row() {
        let items = vec![
            row("Wheat", "50 KG", "50", "4"),
            row("Wheat", "25 KG", "25", "2"),
            row("Wheat", "50 KG", "50", "1"),
        ];
        let dup = find_duplicate_pack_row(&items);
        assert_eq!(dup.map(|(i, _)| i), Some(2));

        let unique = vec![row("Wheat", "50 KG", "50", "4")];
        assert!(find_duplicate_pack_row(&unique).is_none());
    }
}
