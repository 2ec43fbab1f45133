//! Item price list models
//!
//! Prices are quoted per reference pack (50 KG) per area and form a time
//! series; the applicable price at a point in time is the latest active
//! entry at or before it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Weight of the reference pack prices are quoted against.
pub fn reference_pack_kg() -> Decimal {
    Decimal::from(50)
}

/// One price list entry for an (area, item) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemPrice {
    pub id: Uuid,
    pub item: String,
    pub area: String,
    /// Quoted price per 50 KG reference pack
    pub base_price_50kg: Decimal,
    /// Derived: base_price_50kg / 50
    pub price_per_kg: Decimal,
    pub effective_datetime: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Derive the per-KG price from the reference-pack quote.
pub fn price_per_kg(base_price_50kg: Decimal) -> Decimal {
    if base_price_50kg > Decimal::ZERO {
        base_price_50kg / reference_pack_kg()
    } else {
        Decimal::ZERO
    }
}

/// Rate for a pack of the given weight: price_per_kg * weight_kg.
pub fn rate_for_pack(price_per_kg: Decimal, pack_weight_kg: Decimal) -> Decimal {
    price_per_kg * pack_weight_kg
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_price_per_kg() {
        assert_eq!(
            price_per_kg(Decimal::from(1500)),
            Decimal::from_str("30").unwrap()
        );
        assert_eq!(price_per_kg(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(price_per_kg(Decimal::from(-10)), Decimal::ZERO);
    }

    #[test]
    fn test_rate_for_pack() {
        // 30 per KG, 25 KG bag
        assert_eq!(
            rate_for_pack(Decimal::from(30), Decimal::from(25)),
            Decimal::from(750)
        );
    }
}
