//! Delivery models: a submittable document recording dispatch against Deals

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Three-state submission lifecycle. Only Submitted documents count toward
/// deal delivered totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Docstatus {
    Draft,
    Submitted,
    Cancelled,
}

impl Docstatus {
    pub fn as_i16(&self) -> i16 {
        match self {
            Docstatus::Draft => 0,
            Docstatus::Submitted => 1,
            Docstatus::Cancelled => 2,
        }
    }

    pub fn from_i16(v: i16) -> Option<Self> {
        match v {
            0 => Some(Docstatus::Draft),
            1 => Some(Docstatus::Submitted),
            2 => Some(Docstatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Docstatus::Draft)
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, Docstatus::Submitted)
    }
}

impl std::fmt::Display for Docstatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Docstatus::Draft => write!(f, "Draft"),
            Docstatus::Submitted => write!(f, "Submitted"),
            Docstatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// A dispatch document: one or more rows delivering against Deal items
/// (or ad hoc "extra" rows not tied to any Deal)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub customer: String,
    pub customer_name: String,
    pub delivery_date: NaiveDate,
    pub docstatus: Docstatus,
    pub items: Vec<DeliveryItem>,
    /// Total packs across rows
    pub total_delivery_qty: Decimal,
    pub total_delivery_kg: Decimal,
    pub total_amount: Decimal,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One delivery row. `deal_id` of None marks an extra/adhoc row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryItem {
    pub id: Uuid,
    pub idx: i32,
    pub deal_id: Option<Uuid>,
    pub deal_item_id: Option<Uuid>,
    pub item: String,
    pub pack_size: String,
    pub pack_weight_kg: Decimal,
    /// Delivered quantity in packs
    pub deliver_qty: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub is_extra: bool,
}

impl DeliveryItem {
    pub fn deliver_kg(&self) -> Decimal {
        self.deliver_qty * self.pack_weight_kg
    }
}

/// Computed delivery document totals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTotals {
    pub total_delivery_qty: Decimal,
    pub total_delivery_kg: Decimal,
    pub total_amount: Decimal,
}

/// Recompute row amounts, the extra flag and the document totals.
pub fn compute_delivery_totals(items: &mut [DeliveryItem]) -> DeliveryTotals {
    let mut totals = DeliveryTotals {
        total_delivery_qty: Decimal::ZERO,
        total_delivery_kg: Decimal::ZERO,
        total_amount: Decimal::ZERO,
    };

    for row in items.iter_mut() {
        row.is_extra = row.deal_id.is_none();
        row.amount = row.deliver_qty * row.rate;
        totals.total_delivery_qty += row.deliver_qty;
        totals.total_delivery_kg += row.deliver_kg();
        totals.total_amount += row.amount;
    }

    totals
}

/// A delivery's rows aggregated by (item, pack_size), as consumed by the
/// stock component when issuing goods from the warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedDeliveryLine {
    pub item: String,
    pub pack_size: String,
    pub pack_weight_kg: Decimal,
    pub qty: Decimal,
}

/// Group delivery rows by (item, pack_size), preserving first-seen order.
pub fn aggregate_by_pack(items: &[DeliveryItem]) -> Vec<AggregatedDeliveryLine> {
    let mut out: Vec<AggregatedDeliveryLine> = Vec::new();

    for row in items {
        match out
            .iter_mut()
            .find(|l| l.item == row.item && l.pack_size == row.pack_size)
        {
            Some(line) => line.qty += row.deliver_qty,
            None => out.push(AggregatedDeliveryLine {
                item: row.item.clone(),
                pack_size: row.pack_size.clone(),
                pack_weight_kg: row.pack_weight_kg,
                qty: row.deliver_qty,
            }),
        }
    }

    out
}
