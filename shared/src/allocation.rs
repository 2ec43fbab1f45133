//! FIFO allocation of a requested delivery quantity across pending deal items
//!
//! The allocator is a planning aid: it proposes delivery rows against the
//! oldest outstanding bookings first. The delivery document created from a
//! proposal re-validates independently on submit, so an allocation shortfall
//! is a warning rather than an error.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A deal item row with remaining undelivered capacity, already ordered
/// oldest first by the caller (deal date, then deal creation time, then
/// row index).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDealItem {
    pub deal_id: Uuid,
    pub deal_item_id: Uuid,
    pub deal_date: chrono::NaiveDate,
    pub item: String,
    pub pack_size: String,
    pub pack_weight_kg: Decimal,
    pub rate: Decimal,
    /// Remaining packs after subtracting submitted delivery rows
    pub pending_qty: Decimal,
    pub pending_kg: Decimal,
}

/// One proposed delivery row against a deal item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationLine {
    pub deal_id: Uuid,
    pub deal_item_id: Uuid,
    pub item: String,
    pub pack_size: String,
    pub pack_weight_kg: Decimal,
    pub allocate_qty: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

/// Result of a FIFO allocation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResult {
    pub allocations: Vec<AllocationLine>,
    /// Requested packs that could not be covered by pending capacity
    pub shortfall: Decimal,
}

impl AllocationResult {
    pub fn total_allocated(&self) -> Decimal {
        self.allocations.iter().map(|a| a.allocate_qty).sum()
    }
}

/// Greedily allocate `total_qty` packs across pending deal items, oldest
/// first. Rows are consumed in the order given; any remainder after the
/// list is exhausted is returned as `shortfall`.
pub fn allocate_fifo(pending: &[PendingDealItem], total_qty: Decimal) -> AllocationResult {
    let mut remaining = total_qty;
    let mut allocations = Vec::new();

    for row in pending {
        if remaining <= Decimal::ZERO {
            break;
        }
        if row.pending_qty <= Decimal::ZERO {
            continue;
        }

        let allocate = remaining.min(row.pending_qty);
        allocations.push(AllocationLine {
            deal_id: row.deal_id,
            deal_item_id: row.deal_item_id,
            item: row.item.clone(),
            pack_size: row.pack_size.clone(),
            pack_weight_kg: row.pack_weight_kg,
            allocate_qty: allocate,
            rate: row.rate,
            amount: allocate * row.rate,
        });
        remaining -= allocate;
    }

    AllocationResult {
        allocations,
        shortfall: remaining.max(Decimal::ZERO),
    }
}
