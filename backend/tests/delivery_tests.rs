//! Delivery document tests
//!
//! Tests for delivery lifecycle arithmetic including:
//! - Docstatus transitions and their integer encoding
//! - Document totals across mixed pack sizes
//! - Capacity validation with 1 KG slack
//! - Pending tolerance and row aggregation for the stock bridge

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{
    aggregate_by_pack, compute_delivery_totals, pending_deal_statuses, pending_item_statuses,
    DealItemStatus, DealStatus, DeliveryItem, Docstatus,
};
use shared::validation::{check_delivery_capacity, has_pending, validate_deliver_qty};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn row(deal: Option<uuid::Uuid>, item: &str, weight: &str, qty: &str, rate: &str) -> DeliveryItem {
    DeliveryItem {
        id: uuid::Uuid::new_v4(),
        idx: 1,
        deal_id: deal,
        deal_item_id: deal.map(|_| uuid::Uuid::new_v4()),
        item: item.to_string(),
        pack_size: format!("{} KG", weight),
        pack_weight_kg: dec(weight),
        deliver_qty: dec(qty),
        rate: dec(rate),
        amount: Decimal::ZERO,
        is_extra: false,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Docstatus integers follow the 0/1/2 convention
    #[test]
    fn test_docstatus_encoding() {
        assert_eq!(Docstatus::Draft.as_i16(), 0);
        assert_eq!(Docstatus::Submitted.as_i16(), 1);
        assert_eq!(Docstatus::Cancelled.as_i16(), 2);
        assert_eq!(Docstatus::from_i16(7), None);
    }

    /// Only Draft documents are editable, only Submitted count for totals
    #[test]
    fn test_docstatus_predicates() {
        assert!(Docstatus::Draft.is_draft());
        assert!(!Docstatus::Draft.is_submitted());
        assert!(Docstatus::Submitted.is_submitted());
        assert!(!Docstatus::Cancelled.is_draft());
        assert!(!Docstatus::Cancelled.is_submitted());
    }

    /// Totals sum packs, KG and amounts across mixed pack sizes
    #[test]
    fn test_delivery_totals_mixed_packs() {
        let deal = uuid::Uuid::new_v4();
        let mut items = vec![
            row(Some(deal), "Wheat", "50", "4", "1500"),
            row(Some(deal), "Wheat", "25", "2", "750"),
        ];
        let totals = compute_delivery_totals(&mut items);

        assert_eq!(totals.total_delivery_qty, dec("6"));
        assert_eq!(totals.total_delivery_kg, dec("250"));
        assert_eq!(totals.total_amount, dec("7500"));
    }

    /// A row with no deal reference is flagged as extra
    #[test]
    fn test_extra_flag_follows_deal_reference() {
        let mut items = vec![
            row(Some(uuid::Uuid::new_v4()), "Wheat", "50", "1", "1500"),
            row(None, "Maize", "25", "1", "600"),
        ];
        compute_delivery_totals(&mut items);

        assert!(!items[0].is_extra);
        assert!(items[1].is_extra);
    }

    /// Delivering exactly the remaining KG is fine
    #[test]
    fn test_capacity_exact_remainder() {
        assert!(check_delivery_capacity(dec("500"), dec("300"), dec("200")).is_ok());
    }

    /// 1 KG over the remainder is absorbed by the slack; more is rejected
    #[test]
    fn test_capacity_slack_boundary() {
        assert!(check_delivery_capacity(dec("500"), dec("300"), dec("201")).is_ok());
        assert!(check_delivery_capacity(dec("500"), dec("300"), dec("201.01")).is_err());
    }

    /// The rejection message names both quantities for the operator
    #[test]
    fn test_capacity_error_mentions_quantities() {
        let err = check_delivery_capacity(dec("500"), dec("480"), dec("40")).unwrap_err();
        assert!(err.contains("40"));
        assert!(err.contains("20"));
    }

    /// Remainders within 0.1 KG are rounding noise, not pending work
    #[test]
    fn test_pending_tolerance() {
        assert!(!has_pending(dec("0.1")));
        assert!(!has_pending(dec("0.05")));
        assert!(has_pending(dec("0.11")));
    }

    /// Zero and negative quantities are rejected before any other check
    #[test]
    fn test_deliver_qty_positive() {
        assert!(validate_deliver_qty(dec("0.5")).is_ok());
        assert!(validate_deliver_qty(Decimal::ZERO).is_err());
        assert!(validate_deliver_qty(dec("-1")).is_err());
    }

    /// Cancelling a submitted document drops its KG from the tally,
    /// reopening the capacity it was holding
    #[test]
    fn test_cancel_reopens_capacity() {
        // 480 of 500 KG delivered: a further 25 exceeds even the slack
        assert!(check_delivery_capacity(dec("500"), dec("480"), dec("25")).is_err());
        // the cancelled document no longer counts, so 480 fits again
        assert!(check_delivery_capacity(dec("500"), Decimal::ZERO, dec("480")).is_ok());
        assert!(check_delivery_capacity(dec("500"), Decimal::ZERO, dec("25")).is_ok());
    }

    /// Editing a submitted delivery sees its own prior rows as available;
    /// any other document is still blocked by them
    #[test]
    fn test_edit_excludes_own_contribution() {
        assert!(check_delivery_capacity(dec("500"), dec("480"), dec("500")).is_err());
        assert!(check_delivery_capacity(dec("500"), Decimal::ZERO, dec("500")).is_ok());
    }

    /// The edit path widens both status filters with Delivered so reopened
    /// capacity on closed rows stays reachable
    #[test]
    fn test_pending_status_filters_widen_for_edits() {
        assert!(!pending_deal_statuses(false).contains(&DealStatus::Delivered));
        assert!(pending_deal_statuses(true).contains(&DealStatus::Delivered));
        assert!(!pending_item_statuses(false).contains(&DealItemStatus::Delivered));
        assert!(pending_item_statuses(true).contains(&DealItemStatus::Delivered));
        // Cancelled deals are never candidates, edit or not
        assert!(!pending_deal_statuses(true).contains(&DealStatus::Cancelled));
    }

    /// Rows with the same (item, pack size) collapse into one stock line
    #[test]
    fn test_aggregation_for_stock_issue() {
        let deal_a = uuid::Uuid::new_v4();
        let deal_b = uuid::Uuid::new_v4();
        let items = vec![
            row(Some(deal_a), "Wheat", "50", "4", "1500"),
            row(Some(deal_b), "Wheat", "50", "3", "1500"),
            row(None, "Maize", "25", "2", "600"),
        ];
        let lines = aggregate_by_pack(&items);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].qty, dec("7"));
        assert_eq!(lines[1].item, "Maize");
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn qty_strategy() -> impl Strategy<Value = Decimal> {
        (1u64..200).prop_map(Decimal::from)
    }

    fn weight_strategy() -> impl Strategy<Value = Decimal> {
        prop_oneof![Just(dec("25")), Just(dec("30")), Just(dec("50"))]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Document KG is always the sum of row packs times row weights
        #[test]
        fn prop_totals_match_row_sums(
            rows in prop::collection::vec((qty_strategy(), weight_strategy()), 1..10)
        ) {
            let mut items: Vec<DeliveryItem> = rows
                .iter()
                .map(|(qty, weight)| {
                    let mut r = row(None, "Wheat", "50", "1", "1500");
                    r.deliver_qty = *qty;
                    r.pack_weight_kg = *weight;
                    r
                })
                .collect();
            let totals = compute_delivery_totals(&mut items);

            let expected_kg: Decimal = rows.iter().map(|(q, w)| q * w).sum();
            let expected_qty: Decimal = rows.iter().map(|(q, _)| *q).sum();
            prop_assert_eq!(totals.total_delivery_kg, expected_kg);
            prop_assert_eq!(totals.total_delivery_qty, expected_qty);
        }

        /// Aggregation preserves the total pack count
        #[test]
        fn prop_aggregation_preserves_qty(
            rows in prop::collection::vec((qty_strategy(), weight_strategy()), 1..10)
        ) {
            let items: Vec<DeliveryItem> = rows
                .iter()
                .map(|(qty, weight)| {
                    let mut r = row(None, "Wheat", "50", "1", "1500");
                    r.deliver_qty = *qty;
                    r.pack_weight_kg = *weight;
                    r.pack_size = format!("{} KG", weight);
                    r
                })
                .collect();

            let total_before: Decimal = items.iter().map(|r| r.deliver_qty).sum();
            let lines = aggregate_by_pack(&items);
            let total_after: Decimal = lines.iter().map(|l| l.qty).sum();
            prop_assert_eq!(total_before, total_after);
        }

        /// Capacity check accepts exactly up to available + 1 KG, no more
        #[test]
        fn prop_capacity_threshold(
            booked in qty_strategy(),
            delivered in (0u64..200).prop_map(Decimal::from),
            delivering in qty_strategy()
        ) {
            let booked_kg = booked * dec("50");
            let delivered_kg = delivered.min(booked) * dec("50");
            let delivering_kg = delivering * dec("50");
            let available = booked_kg - delivered_kg;

            let result = check_delivery_capacity(booked_kg, delivered_kg, delivering_kg);
            prop_assert_eq!(result.is_ok(), delivering_kg <= available + Decimal::ONE);
        }
    }
}
