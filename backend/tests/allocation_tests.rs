//! FIFO allocation tests
//!
//! Tests for the delivery allocator including:
//! - Oldest booking consumed first
//! - Allocated packs never exceed the request or the pending capacity
//! - Shortfall reported instead of raised
//! - Pack/KG conversion on proposed rows

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::allocation::{allocate_fifo, PendingDealItem};
use shared::models::packs_to_kg;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn pending(date: (i32, u32, u32), qty: &str, weight: &str) -> PendingDealItem {
    PendingDealItem {
        deal_id: uuid::Uuid::new_v4(),
        deal_item_id: uuid::Uuid::new_v4(),
        deal_date: chrono::NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        item: "Wheat".to_string(),
        pack_size: format!("{} KG", weight),
        pack_weight_kg: dec(weight),
        rate: dec("1500"),
        pending_qty: dec(qty),
        pending_kg: dec(qty) * dec(weight),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The first (oldest) row is exhausted before the second is touched
    #[test]
    fn test_oldest_booking_first() {
        let rows = vec![
            pending((2025, 1, 5), "8", "50"),
            pending((2025, 3, 5), "8", "50"),
        ];
        let result = allocate_fifo(&rows, dec("10"));

        assert_eq!(result.allocations.len(), 2);
        assert_eq!(result.allocations[0].deal_item_id, rows[0].deal_item_id);
        assert_eq!(result.allocations[0].allocate_qty, dec("8"));
        assert_eq!(result.allocations[1].allocate_qty, dec("2"));
    }

    /// An exact fit consumes every row fully with no shortfall
    #[test]
    fn test_exact_fit() {
        let rows = vec![
            pending((2025, 1, 5), "4", "50"),
            pending((2025, 2, 5), "6", "50"),
        ];
        let result = allocate_fifo(&rows, dec("10"));

        assert_eq!(result.total_allocated(), dec("10"));
        assert_eq!(result.shortfall, Decimal::ZERO);
    }

    /// Requests beyond pending capacity report the remainder as shortfall
    #[test]
    fn test_shortfall_is_a_warning() {
        let rows = vec![pending((2025, 1, 5), "3", "50")];
        let result = allocate_fifo(&rows, dec("12"));

        assert_eq!(result.total_allocated(), dec("3"));
        assert_eq!(result.shortfall, dec("9"));
    }

    /// Fully delivered rows are skipped without producing empty lines
    #[test]
    fn test_exhausted_rows_skipped() {
        let rows = vec![
            pending((2025, 1, 5), "0", "50"),
            pending((2025, 2, 5), "5", "50"),
        ];
        let result = allocate_fifo(&rows, dec("4"));

        assert_eq!(result.allocations.len(), 1);
        assert_eq!(result.allocations[0].deal_item_id, rows[1].deal_item_id);
    }

    /// Proposed line amounts use the booked rate of the consumed row
    #[test]
    fn test_line_amount_from_row_rate() {
        let mut row = pending((2025, 1, 5), "10", "25");
        row.rate = dec("800");
        let result = allocate_fifo(&[row], dec("4"));

        assert_eq!(result.allocations[0].amount, dec("3200"));
    }

    /// The proposed row carries the pack weight for KG conversion downstream
    #[test]
    fn test_pack_kg_conversion() {
        let rows = vec![pending((2025, 1, 5), "10", "25")];
        let result = allocate_fifo(&rows, dec("6"));

        let line = &result.allocations[0];
        assert_eq!(
            packs_to_kg(line.allocate_qty, line.pack_weight_kg),
            dec("150")
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
        (0u64..500).prop_map(Decimal::from)
    }

    fn pending_rows() -> impl Strategy<Value = Vec<PendingDealItem>> {
        prop::collection::vec(qty_strategy(), 1..12).prop_map(|qtys| {
            qtys.into_iter()
                .enumerate()
                .map(|(i, qty)| {
                    let mut row = pending((2025, 1, 1 + (i as u32 % 28)), "0", "50");
                    row.pending_qty = qty;
                    row.pending_kg = qty * dec("50");
                    row
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Allocated total never exceeds the request or the pending capacity
        #[test]
        fn prop_allocation_bounded(
            rows in pending_rows(),
            request in qty_strategy()
        ) {
            let total_pending: Decimal = rows.iter().map(|r| r.pending_qty).sum();
            let result = allocate_fifo(&rows, request);

            prop_assert!(result.total_allocated() <= request);
            prop_assert!(result.total_allocated() <= total_pending);
        }

        /// Allocated + shortfall always equals the request
        #[test]
        fn prop_allocation_accounts_for_request(
            rows in pending_rows(),
            request in qty_strategy()
        ) {
            let result = allocate_fifo(&rows, request);
            prop_assert_eq!(result.total_allocated() + result.shortfall, request);
        }

        /// No proposed line exceeds the pending quantity of its source row
        #[test]
        fn prop_lines_respect_row_capacity(
            rows in pending_rows(),
            request in qty_strategy()
        ) {
            let result = allocate_fifo(&rows, request);
            for line in &result.allocations {
                let source = rows
                    .iter()
                    .find(|r| r.deal_item_id == line.deal_item_id)
                    .unwrap();
                prop_assert!(line.allocate_qty > Decimal::ZERO);
                prop_assert!(line.allocate_qty <= source.pending_qty);
            }
        }

        /// Earlier rows are consumed fully before later rows contribute
        #[test]
        fn prop_fifo_order_respected(
            rows in pending_rows(),
            request in qty_strategy()
        ) {
            let result = allocate_fifo(&rows, request);

            // Map row index to allocated quantity
            let allocated_at = |i: usize| -> Decimal {
                result
                    .allocations
                    .iter()
                    .filter(|l| l.deal_item_id == rows[i].deal_item_id)
                    .map(|l| l.allocate_qty)
                    .sum()
            };

            let mut later_touched = false;
            for i in (0..rows.len()).rev() {
                if later_touched && rows[i].pending_qty > Decimal::ZERO {
                    // Everything before a consumed row must be fully consumed
                    prop_assert_eq!(allocated_at(i), rows[i].pending_qty);
                }
                if allocated_at(i) > Decimal::ZERO {
                    later_touched = true;
                }
            }
        }
    }
}
