//! Deal (wholesale booking) models and the fulfilment ledger
//!
//! A Deal books one or more items in packs; deliveries consume the booking.
//! All cross-pack-size reconciliation happens in kilograms: `delivered_kg`
//! is always re-derived from submitted delivery rows, never adjusted
//! incrementally.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tolerance absorbing pack/KG float rounding when classifying item status.
pub fn kg_tolerance() -> Decimal {
    Decimal::new(1, 1) // 0.1 kg
}

/// Slack allowed on top of available KG when validating a delivery row.
pub fn capacity_slack_kg() -> Decimal {
    Decimal::ONE
}

/// Status of a whole Deal. `Cancelled` is terminal and never derived away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealStatus {
    Open,
    Confirmed,
    #[serde(rename = "Partially Delivered")]
    PartiallyDelivered,
    Delivered,
    Cancelled,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Open => "Open",
            DealStatus::Confirmed => "Confirmed",
            DealStatus::PartiallyDelivered => "Partially Delivered",
            DealStatus::Delivered => "Delivered",
            DealStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Open" => Some(DealStatus::Open),
            "Confirmed" => Some(DealStatus::Confirmed),
            "Partially Delivered" => Some(DealStatus::PartiallyDelivered),
            "Delivered" => Some(DealStatus::Delivered),
            "Cancelled" => Some(DealStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single Deal item row, derived from delivered vs booked KG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealItemStatus {
    Open,
    #[serde(rename = "Partially Delivered")]
    PartiallyDelivered,
    Delivered,
}

impl DealItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealItemStatus::Open => "Open",
            DealItemStatus::PartiallyDelivered => "Partially Delivered",
            DealItemStatus::Delivered => "Delivered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Open" => Some(DealItemStatus::Open),
            "Partially Delivered" => Some(DealItemStatus::PartiallyDelivered),
            "Delivered" => Some(DealItemStatus::Delivered),
            _ => None,
        }
    }
}

impl std::fmt::Display for DealItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deal statuses eligible for the pending-capacity query.
///
/// Editing an existing delivery excludes its own submitted rows from the
/// delivered tally, which can reopen capacity on deals already closed, so
/// the edit path widens the filter with Delivered.
pub fn pending_deal_statuses(editing_delivery: bool) -> Vec<DealStatus> {
    let mut statuses = vec![
        DealStatus::Open,
        DealStatus::Confirmed,
        DealStatus::PartiallyDelivered,
    ];
    if editing_delivery {
        statuses.push(DealStatus::Delivered);
    }
    statuses
}

/// Item statuses eligible for the pending-capacity query, widened the same
/// way as [`pending_deal_statuses`].
pub fn pending_item_statuses(editing_delivery: bool) -> Vec<DealItemStatus> {
    let mut statuses = vec![DealItemStatus::Open, DealItemStatus::PartiallyDelivered];
    if editing_delivery {
        statuses.push(DealItemStatus::Delivered);
    }
    statuses
}

/// A wholesale booking against a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    pub customer: String,
    pub customer_name: String,
    /// Price-list area the deal was booked under
    pub area: Option<String>,
    pub deal_date: NaiveDate,
    pub status: DealStatus,
    pub items: Vec<DealItem>,
    pub total_qty: Decimal,
    pub total_amount: Decimal,
    pub total_kg: Decimal,
    pub total_delivered_kg: Decimal,
    pub total_pending_kg: Decimal,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a Deal: item + pack size + quantity in packs
///
/// `pack_weight_kg` is snapshotted from the pack-size master at creation so
/// historical rows stay interpretable if the master changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealItem {
    pub id: Uuid,
    /// Row position within the deal; part of the FIFO tie-break
    pub idx: i32,
    pub item: String,
    pub pack_size: String,
    pub pack_weight_kg: Decimal,
    /// Booked quantity in packs
    pub qty: Decimal,
    /// Rate per pack
    pub rate: Decimal,
    pub amount: Decimal,
    /// Delivered packs (informational; KG is authoritative)
    pub delivered_qty: Decimal,
    pub pending_qty: Decimal,
    /// Sum of deliver_qty * pack_weight_kg over submitted delivery rows
    pub delivered_kg: Decimal,
    pub pending_kg: Decimal,
    pub item_status: DealItemStatus,
}

impl DealItem {
    pub fn booked_kg(&self) -> Decimal {
        self.qty * self.pack_weight_kg
    }
}

/// Classify an item row from its booked and delivered KG.
///
/// Open when nothing delivered; Delivered within `kg_tolerance()` of the
/// booking; Partially Delivered in between.
pub fn derive_item_status(booked_kg: Decimal, delivered_kg: Decimal) -> DealItemStatus {
    if delivered_kg <= Decimal::ZERO {
        DealItemStatus::Open
    } else if delivered_kg >= booked_kg - kg_tolerance() {
        DealItemStatus::Delivered
    } else {
        DealItemStatus::PartiallyDelivered
    }
}

/// Recompute one item row's derived fields from qty/rate/delivered figures.
pub fn recompute_line(row: &mut DealItem) {
    row.amount = row.qty * row.rate;
    row.pending_qty = row.qty - row.delivered_qty;
    let booked_kg = row.booked_kg();
    row.pending_kg = booked_kg - row.delivered_kg;
    row.item_status = derive_item_status(booked_kg, row.delivered_kg);
}

/// Derive the parent status from its item statuses.
///
/// `Cancelled` is sticky. All-Open deals keep a previous Open/Confirmed as
/// is, falling back to Open.
pub fn derive_deal_status(item_statuses: &[DealItemStatus], previous: DealStatus) -> DealStatus {
    if previous == DealStatus::Cancelled {
        return DealStatus::Cancelled;
    }
    if item_statuses.is_empty() {
        return previous;
    }

    if item_statuses
        .iter()
        .all(|s| *s == DealItemStatus::Delivered)
    {
        DealStatus::Delivered
    } else if item_statuses
        .iter()
        .any(|s| matches!(s, DealItemStatus::PartiallyDelivered | DealItemStatus::Delivered))
    {
        DealStatus::PartiallyDelivered
    } else {
        match previous {
            DealStatus::Open | DealStatus::Confirmed => previous,
            _ => DealStatus::Open,
        }
    }
}

/// Recompute every item row, the deal totals and the derived status.
///
/// Idempotent: calling it twice with no input change is a no-op.
pub fn recompute_deal(deal: &mut Deal) {
    for row in &mut deal.items {
        recompute_line(row);
    }

    deal.total_qty = deal.items.iter().map(|r| r.qty).sum();
    deal.total_amount = deal.items.iter().map(|r| r.amount).sum();
    deal.total_kg = deal.items.iter().map(|r| r.booked_kg()).sum();
    deal.total_delivered_kg = deal.items.iter().map(|r| r.delivered_kg).sum();
    deal.total_pending_kg = deal.items.iter().map(|r| r.pending_kg).sum();

    let statuses: Vec<DealItemStatus> = deal.items.iter().map(|r| r.item_status).collect();
    deal.status = derive_deal_status(&statuses, deal.status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(qty: &str, weight: &str, delivered_kg: &str) -> DealItem {
        DealItem {
            id: Uuid::new_v4(),
            idx: 1,
            item: "Wheat".to_string(),
            pack_size: "50 KG".to_string(),
            pack_weight_kg: dec(weight),
            qty: dec(qty),
            rate: dec("1500"),
            amount: Decimal::ZERO,
            delivered_qty: Decimal::ZERO,
            pending_qty: Decimal::ZERO,
            delivered_kg: dec(delivered_kg),
            pending_kg: Decimal::ZERO,
            item_status: DealItemStatus::Open,
        }
    }

    fn deal_with(items: Vec<DealItem>, status: DealStatus) -> Deal {
        Deal {
            id: Uuid::new_v4(),
            customer: "CUST-001".to_string(),
            customer_name: "Sharma Traders".to_string(),
            area: None,
            deal_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            status,
            items,
            total_qty: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            total_kg: Decimal::ZERO,
            total_delivered_kg: Decimal::ZERO,
            total_pending_kg: Decimal::ZERO,
            remarks: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_item_status_open_at_zero() {
        assert_eq!(
            derive_item_status(dec("500"), Decimal::ZERO),
            DealItemStatus::Open
        );
        assert_eq!(
            derive_item_status(dec("500"), dec("-1")),
            DealItemStatus::Open
        );
    }

    #[test]
    fn test_item_status_partial_in_between() {
        assert_eq!(
            derive_item_status(dec("500"), dec("0.2")),
            DealItemStatus::PartiallyDelivered
        );
        assert_eq!(
            derive_item_status(dec("500"), dec("499.8")),
            DealItemStatus::PartiallyDelivered
        );
    }

    #[test]
    fn test_item_status_delivered_within_tolerance() {
        // booked - 0.1 is the lower edge of Delivered
        assert_eq!(
            derive_item_status(dec("500"), dec("499.9")),
            DealItemStatus::Delivered
        );
        assert_eq!(
            derive_item_status(dec("500"), dec("500")),
            DealItemStatus::Delivered
        );
        assert_eq!(
            derive_item_status(dec("500"), dec("501")),
            DealItemStatus::Delivered
        );
    }

    #[test]
    fn test_zero_pack_weight_is_trivially_delivered() {
        // Legacy rows with weight 0 have booked_kg 0; any delivery closes them
        assert_eq!(
            derive_item_status(Decimal::ZERO, dec("0.01")),
            DealItemStatus::Delivered
        );
    }

    #[test]
    fn test_recompute_line_derives_all_fields() {
        let mut row = item("10", "50", "150");
        row.delivered_qty = dec("3");
        recompute_line(&mut row);

        assert_eq!(row.amount, dec("15000"));
        assert_eq!(row.pending_qty, dec("7"));
        assert_eq!(row.pending_kg, dec("350"));
        assert_eq!(row.item_status, DealItemStatus::PartiallyDelivered);
    }

    #[test]
    fn test_deal_status_all_delivered() {
        let statuses = [DealItemStatus::Delivered, DealItemStatus::Delivered];
        assert_eq!(
            derive_deal_status(&statuses, DealStatus::Open),
            DealStatus::Delivered
        );
    }

    #[test]
    fn test_deal_status_any_progress_is_partial() {
        let statuses = [DealItemStatus::Open, DealItemStatus::Delivered];
        assert_eq!(
            derive_deal_status(&statuses, DealStatus::Open),
            DealStatus::PartiallyDelivered
        );

        let statuses = [DealItemStatus::PartiallyDelivered, DealItemStatus::Open];
        assert_eq!(
            derive_deal_status(&statuses, DealStatus::Confirmed),
            DealStatus::PartiallyDelivered
        );
    }

    #[test]
    fn test_deal_status_all_open_preserves_confirmed() {
        let statuses = [DealItemStatus::Open, DealItemStatus::Open];
        assert_eq!(
            derive_deal_status(&statuses, DealStatus::Confirmed),
            DealStatus::Confirmed
        );
        assert_eq!(
            derive_deal_status(&statuses, DealStatus::Open),
            DealStatus::Open
        );
        // A previously delivered deal whose deliveries were all cancelled
        // falls back to Open
        assert_eq!(
            derive_deal_status(&statuses, DealStatus::Delivered),
            DealStatus::Open
        );
    }

    #[test]
    fn test_cancelled_is_sticky() {
        let statuses = [DealItemStatus::Delivered];
        assert_eq!(
            derive_deal_status(&statuses, DealStatus::Cancelled),
            DealStatus::Cancelled
        );
    }

    #[test]
    fn test_recompute_deal_totals_and_conservation() {
        let mut deal = deal_with(
            vec![item("10", "50", "200"), item("4", "25", "100")],
            DealStatus::Open,
        );
        recompute_deal(&mut deal);

        assert_eq!(deal.total_qty, dec("14"));
        assert_eq!(deal.total_kg, dec("600"));
        assert_eq!(deal.total_delivered_kg, dec("300"));
        assert_eq!(deal.total_pending_kg, dec("300"));
        // Conservation: total = delivered + pending
        assert_eq!(
            deal.total_kg,
            deal.total_delivered_kg + deal.total_pending_kg
        );
        assert_eq!(deal.status, DealStatus::PartiallyDelivered);
    }

    #[test]
    fn test_recompute_deal_is_idempotent() {
        let mut deal = deal_with(
            vec![item("10", "50", "500"), item("2", "30", "0")],
            DealStatus::Confirmed,
        );
        recompute_deal(&mut deal);
        let first = format!("{:?}", deal);
        recompute_deal(&mut deal);
        let second = format!("{:?}", deal);
        assert_eq!(first, second);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            DealStatus::Open,
            DealStatus::Confirmed,
            DealStatus::PartiallyDelivered,
            DealStatus::Delivered,
            DealStatus::Cancelled,
        ] {
            assert_eq!(DealStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DealStatus::parse("Unknown"), None);
    }
}
