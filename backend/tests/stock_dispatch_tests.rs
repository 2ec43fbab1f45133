//! Stock entry and vehicle dispatch tests
//!
//! Tests for warehouse movements and truck loading including:
//! - Inward/outward direction per entry type
//! - Duplicate (item, pack size) detection within an entry
//! - Dispatch totals, distinct customer count and capacity warning

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{
    compute_dispatch_totals, compute_stock_totals, find_duplicate_pack_row, is_over_capacity,
    DispatchStatus, Docstatus, StockEntryItem, StockEntryType, VehicleDispatchItem,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn stock_row(item: &str, pack: &str, weight: &str, qty: &str) -> StockEntryItem {
    StockEntryItem {
        id: uuid::Uuid::new_v4(),
        idx: 1,
        item: item.to_string(),
        pack_size: pack.to_string(),
        pack_weight_kg: dec(weight),
        qty: dec(qty),
        kg: Decimal::ZERO,
    }
}

fn load(customer: &str, kg: &str, packs: &str, amount: &str) -> VehicleDispatchItem {
    VehicleDispatchItem {
        id: uuid::Uuid::new_v4(),
        idx: 1,
        delivery_id: uuid::Uuid::new_v4(),
        customer: customer.to_string(),
        total_kg: dec(kg),
        total_packs: dec(packs),
        total_amount: dec(amount),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Opening stock, receipts and upward adjustments add to the balance
    #[test]
    fn test_inward_entry_types() {
        assert!(StockEntryType::OpeningStock.is_inward());
        assert!(StockEntryType::Receipt.is_inward());
        assert!(StockEntryType::AdjustmentIncrease.is_inward());
        assert!(!StockEntryType::Issue.is_inward());
        assert!(!StockEntryType::AdjustmentDecrease.is_inward());
    }

    /// Entry type labels survive a storage round trip
    #[test]
    fn test_entry_type_labels() {
        assert_eq!(StockEntryType::OpeningStock.as_str(), "Opening Stock");
        assert_eq!(
            StockEntryType::parse("Adjustment (Decrease)"),
            Some(StockEntryType::AdjustmentDecrease)
        );
        assert_eq!(StockEntryType::parse("Transfer"), None);
    }

    /// Row KG and entry totals derive from packs times pack weight
    #[test]
    fn test_stock_totals() {
        let mut items = vec![
            stock_row("Wheat", "50 KG", "50", "10"),
            stock_row("Maize", "25 KG", "25", "4"),
        ];
        let totals = compute_stock_totals(&mut items);

        assert_eq!(totals.total_qty, dec("14"));
        assert_eq!(totals.total_kg, dec("600"));
        assert_eq!(totals.total_items, 2);
        assert_eq!(items[1].kg, dec("100"));
    }

    /// A repeated (item, pack size) pair is reported with its row position
    #[test]
    fn test_duplicate_pack_row_detection() {
        let items = vec![
            stock_row("Wheat", "50 KG", "50", "10"),
            stock_row("Wheat", "25 KG", "25", "4"),
            stock_row("Wheat", "25 KG", "25", "1"),
        ];
        assert_eq!(find_duplicate_pack_row(&items).map(|(i, _)| i), Some(2));
    }

    /// Same item in different pack sizes is not a duplicate
    #[test]
    fn test_different_pack_sizes_allowed() {
        let items = vec![
            stock_row("Wheat", "50 KG", "50", "10"),
            stock_row("Wheat", "25 KG", "25", "4"),
        ];
        assert!(find_duplicate_pack_row(&items).is_none());
    }

    /// Dispatch totals count each customer once
    #[test]
    fn test_dispatch_distinct_customers() {
        let deliveries = vec![
            load("CUST-A", "1000", "20", "30000"),
            load("CUST-B", "800", "16", "24000"),
            load("CUST-A", "200", "4", "6000"),
        ];
        let totals = compute_dispatch_totals(&deliveries, dec("4000"));

        assert_eq!(totals.total_loaded_kg, dec("2000"));
        assert_eq!(totals.total_customers, 2);
        assert_eq!(totals.remaining_capacity_kg, dec("2000"));
        assert_eq!(totals.capacity_utilization, dec("50"));
    }

    /// Over-capacity loading warns rather than blocks
    #[test]
    fn test_over_capacity_is_a_warning_threshold() {
        assert!(!is_over_capacity(dec("4000"), dec("4000")));
        assert!(!is_over_capacity(dec("4001"), dec("4000")));
        assert!(is_over_capacity(dec("4001.5"), dec("4000")));
    }

    /// Dispatch status labels follow the docstatus lifecycle
    #[test]
    fn test_dispatch_status_labels() {
        assert_eq!(
            DispatchStatus::from_docstatus(Docstatus::Draft).as_str(),
            "Loading"
        );
        assert_eq!(
            DispatchStatus::from_docstatus(Docstatus::Submitted).as_str(),
            "Dispatched"
        );
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn qty_strategy() -> impl Strategy<Value = Decimal> {
        (1u64..500).prop_map(Decimal::from)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Warehouse balance equals inward minus outward quantities
        #[test]
        fn prop_balance_direction(
            movements in prop::collection::vec(
                (prop_oneof![
                    Just(StockEntryType::Receipt),
                    Just(StockEntryType::Issue),
                    Just(StockEntryType::AdjustmentIncrease),
                    Just(StockEntryType::AdjustmentDecrease),
                ], qty_strategy()),
                1..20
            )
        ) {
            let balance: Decimal = movements.iter().fold(Decimal::ZERO, |acc, (t, qty)| {
                if t.is_inward() { acc + qty } else { acc - qty }
            });

            let inward: Decimal = movements
                .iter()
                .filter(|(t, _)| t.is_inward())
                .map(|(_, q)| *q)
                .sum();
            let outward: Decimal = movements
                .iter()
                .filter(|(t, _)| !t.is_inward())
                .map(|(_, q)| *q)
                .sum();
            prop_assert_eq!(balance, inward - outward);
        }

        /// Loaded KG plus remaining capacity always equals the vehicle capacity
        #[test]
        fn prop_dispatch_capacity_accounting(
            kgs in prop::collection::vec(qty_strategy(), 1..10),
            capacity in (100u64..10_000).prop_map(Decimal::from)
        ) {
            let deliveries: Vec<VehicleDispatchItem> = kgs
                .iter()
                .enumerate()
                .map(|(i, kg)| {
                    let mut d = load(&format!("CUST-{}", i), "0", "1", "1000");
                    d.total_kg = *kg;
                    d
                })
                .collect();
            let totals = compute_dispatch_totals(&deliveries, capacity);

            prop_assert_eq!(
                totals.total_loaded_kg + totals.remaining_capacity_kg,
                capacity
            );
        }
    }
}
