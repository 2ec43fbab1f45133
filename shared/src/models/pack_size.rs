//! Pack size reference data

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A discrete pack unit (e.g. a 50 KG bag). Reference data; rows booking a
/// pack size snapshot its weight rather than linking live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackSize {
    pub id: Uuid,
    pub name: String,
    pub weight_kg: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Convert a pack count to kilograms using a per-row pack weight.
pub fn packs_to_kg(qty: Decimal, pack_weight_kg: Decimal) -> Decimal {
    qty * pack_weight_kg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packs_to_kg() {
        assert_eq!(
            packs_to_kg(Decimal::from(4), Decimal::from(50)),
            Decimal::from(200)
        );
        assert_eq!(packs_to_kg(Decimal::ZERO, Decimal::from(50)), Decimal::ZERO);
    }
}
