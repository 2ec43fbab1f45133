//! Vehicle dispatch models: consolidating submitted deliveries onto a truck

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::deal::capacity_slack_kg;
use crate::models::delivery::Docstatus;

/// Dispatch lifecycle label, derived from docstatus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchStatus {
    Loading,
    Dispatched,
    Cancelled,
}

impl DispatchStatus {
    pub fn from_docstatus(docstatus: Docstatus) -> Self {
        match docstatus {
            Docstatus::Draft => DispatchStatus::Loading,
            Docstatus::Submitted => DispatchStatus::Dispatched,
            Docstatus::Cancelled => DispatchStatus::Cancelled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Loading => "Loading",
            DispatchStatus::Dispatched => "Dispatched",
            DispatchStatus::Cancelled => "Cancelled",
        }
    }
}

/// A truck-load of submitted deliveries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleDispatch {
    pub id: Uuid,
    pub dispatch_date: NaiveDate,
    pub vehicle_number: String,
    pub vehicle_capacity_kg: Decimal,
    pub docstatus: Docstatus,
    pub status: DispatchStatus,
    pub deliveries: Vec<VehicleDispatchItem>,
    pub total_loaded_kg: Decimal,
    pub total_packs: Decimal,
    pub total_amount: Decimal,
    pub total_customers: i32,
    pub remaining_capacity_kg: Decimal,
    /// Percent of vehicle capacity used
    pub capacity_utilization: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One delivery loaded onto a dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleDispatchItem {
    pub id: Uuid,
    pub idx: i32,
    pub delivery_id: Uuid,
    pub customer: String,
    pub total_kg: Decimal,
    pub total_packs: Decimal,
    pub total_amount: Decimal,
}

/// Computed dispatch totals
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchTotals {
    pub total_loaded_kg: Decimal,
    pub total_packs: Decimal,
    pub total_amount: Decimal,
    pub total_customers: i32,
    pub remaining_capacity_kg: Decimal,
    pub capacity_utilization: Decimal,
}

/// Sum loaded deliveries and derive capacity figures.
pub fn compute_dispatch_totals(
    deliveries: &[VehicleDispatchItem],
    vehicle_capacity_kg: Decimal,
) -> DispatchTotals {
    let total_loaded_kg: Decimal = deliveries.iter().map(|d| d.total_kg).sum();
    let total_packs: Decimal = deliveries.iter().map(|d| d.total_packs).sum();
    let total_amount: Decimal = deliveries.iter().map(|d| d.total_amount).sum();

    let mut customers: Vec<&str> = deliveries.iter().map(|d| d.customer.as_str()).collect();
    customers.sort_unstable();
    customers.dedup();

    let capacity_utilization = if vehicle_capacity_kg > Decimal::ZERO {
        total_loaded_kg / vehicle_capacity_kg * Decimal::from(100)
    } else {
        Decimal::ZERO
    };

    DispatchTotals {
        total_loaded_kg,
        total_packs,
        total_amount,
        total_customers: customers.len() as i32,
        remaining_capacity_kg: vehicle_capacity_kg - total_loaded_kg,
        capacity_utilization,
    }
}

/// Loaded weight beyond vehicle capacity is allowed but warned about.
pub fn is_over_capacity(total_loaded_kg: Decimal, vehicle_capacity_kg: Decimal) -> bool {
    total_loaded_kg > vehicle_capacity_kg + capacity_slack_kg()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn load(customer: &str, kg: &str, packs: &str, amount: &str) -> VehicleDispatchItem {
        VehicleDispatchItem {
            id: Uuid::new_v4(),
            idx: 1,
            delivery_id: Uuid::new_v4(),
            customer: customer.to_string(),
            total_kg: dec(kg),
            total_packs: dec(packs),
            total_amount: dec(amount),
        }
    }

    #[test]
    fn test_dispatch_totals() {
        let deliveries = vec![
            load("CUST-A", "2000", "40", "60000"),
            load("CUST-B", "1500", "30", "45000"),
            load("CUST-A", "500", "10", "15000"),
        ];
        let totals = compute_dispatch_totals(&deliveries, dec("5000"));

        assert_eq!(totals.total_loaded_kg, dec("4000"));
        assert_eq!(totals.total_packs, dec("80"));
        assert_eq!(totals.total_amount, dec("120000"));
        assert_eq!(totals.total_customers, 2);
        assert_eq!(totals.remaining_capacity_kg, dec("1000"));
        assert_eq!(totals.capacity_utilization, dec("80"));
    }

    #[test]
    fn test_zero_capacity_utilization() {
        let totals = compute_dispatch_totals(&[load("CUST-A", "100", "2", "3000")], Decimal::ZERO);
        assert_eq!(totals.capacity_utilization, Decimal::ZERO);
    }

    #[test]
    fn test_over_capacity_check() {
        assert!(!is_over_capacity(dec("5000"), dec("5000")));
        assert!(!is_over_capacity(dec("5001"), dec("5000")));
        assert!(is_over_capacity(dec("5002"), dec("5000")));
    }

    #[test]
    fn test_status_from_docstatus() {
        assert_eq!(
            DispatchStatus::from_docstatus(Docstatus::Draft),
            DispatchStatus::Loading
        );
        assert_eq!(
            DispatchStatus::from_docstatus(Docstatus::Submitted),
            DispatchStatus::Dispatched
        );
        assert_eq!(
            DispatchStatus::from_docstatus(Docstatus::Cancelled),
            DispatchStatus::Cancelled
        );
    }
}
