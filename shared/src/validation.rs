//! Validation utilities for the Mandi Trade Management Platform
//!
//! Quantity checks are done in kilograms: packs of different weights can
//! deliver against the same booked line, so KG is the authoritative unit.

use rust_decimal::Decimal;

use crate::models::{capacity_slack_kg, kg_tolerance};

// ============================================================================
// Delivery Quantity Validations
// ============================================================================

/// Check a delivery row against the remaining capacity of its deal item.
///
/// `other_delivered_kg` is the KG already delivered by submitted deliveries
/// excluding the document being validated. A small slack above the exact
/// remainder is tolerated to absorb pack-weight rounding.
pub fn check_delivery_capacity(
    booked_kg: Decimal,
    other_delivered_kg: Decimal,
    delivering_kg: Decimal,
) -> Result<(), String> {
    let available_kg = booked_kg - other_delivered_kg;
    if delivering_kg > available_kg + capacity_slack_kg() {
        return Err(format!(
            "delivering {delivering_kg} KG exceeds remaining capacity of {available_kg} KG"
        ));
    }
    Ok(())
}

/// A booked line cannot shrink below what submitted deliveries have
/// already delivered against it. Uses the same slack as the delivery-side
/// capacity check so a line filled through the slack stays editable.
pub fn check_booked_covers_delivered(
    booked_kg: Decimal,
    delivered_kg: Decimal,
) -> Result<(), String> {
    if delivered_kg > booked_kg + capacity_slack_kg() {
        return Err(format!(
            "already delivered {delivered_kg} KG exceeds the booked {booked_kg} KG"
        ));
    }
    Ok(())
}

/// Delivery row quantities must be strictly positive.
pub fn validate_deliver_qty(qty: Decimal) -> Result<(), &'static str> {
    if qty <= Decimal::ZERO {
        return Err("Delivery quantity must be greater than zero");
    }
    Ok(())
}

/// True when the remaining KG is large enough to count as pending.
/// Remainders within tolerance are rounding noise, not open capacity.
pub fn has_pending(pending_kg: Decimal) -> bool {
    pending_kg > kg_tolerance()
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Validate a vehicle registration number (basic shape check)
pub fn validate_vehicle_number(number: &str) -> Result<(), &'static str> {
    let trimmed = number.trim();
    if trimmed.len() < 4 {
        return Err("Vehicle number must be at least 4 characters");
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
    {
        return Err("Vehicle number may contain only letters, digits, spaces and dashes");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ========================================================================
    // Delivery Quantity Validation Tests
    // ========================================================================

    #[test]
    fn test_capacity_within_remaining() {
        assert!(check_delivery_capacity(dec("500"), dec("200"), dec("300")).is_ok());
        assert!(check_delivery_capacity(dec("500"), Decimal::ZERO, dec("500")).is_ok());
    }

    #[test]
    fn test_capacity_slack_absorbs_rounding() {
        // 1 KG over the exact remainder is tolerated
        assert!(check_delivery_capacity(dec("500"), dec("200"), dec("301")).is_ok());
        assert!(check_delivery_capacity(dec("500"), dec("200"), dec("301.5")).is_err());
    }

    #[test]
    fn test_capacity_error_names_quantities() {
        let err = check_delivery_capacity(dec("500"), dec("450"), dec("100")).unwrap_err();
        assert!(err.contains("100"));
        assert!(err.contains("50"));
    }

    #[test]
    fn test_booked_must_cover_delivered() {
        assert!(check_booked_covers_delivered(dec("500"), dec("500")).is_ok());
        // delivered through the slack stays valid
        assert!(check_booked_covers_delivered(dec("500"), dec("501")).is_ok());
        assert!(check_booked_covers_delivered(dec("500"), dec("501.5")).is_err());
        // a booking shrunk below its deliveries is rejected with both figures
        let err = check_booked_covers_delivered(dec("200"), dec("500")).unwrap_err();
        assert!(err.contains("200"));
        assert!(err.contains("500"));
    }

    #[test]
    fn test_deliver_qty_must_be_positive() {
        assert!(validate_deliver_qty(dec("1")).is_ok());
        assert!(validate_deliver_qty(Decimal::ZERO).is_err());
        assert!(validate_deliver_qty(dec("-2")).is_err());
    }

    #[test]
    fn test_has_pending_tolerance() {
        assert!(has_pending(dec("0.2")));
        assert!(!has_pending(dec("0.1")));
        assert!(!has_pending(Decimal::ZERO));
        assert!(!has_pending(dec("-5")));
    }

    // ========================================================================
    // General Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_email() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@.").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_validate_vehicle_number() {
        assert!(validate_vehicle_number("RJ14 GA 1234").is_ok());
        assert!(validate_vehicle_number("MH-12-AB-9876").is_ok());
        assert!(validate_vehicle_number("AB").is_err());
        assert!(validate_vehicle_number("RJ14@1234").is_err());
    }
}
