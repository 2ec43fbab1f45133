//! WebAssembly module for the Mandi Trade Management Platform
//!
//! Provides client-side computation for:
//! - Pack/KG conversions
//! - Deal item status classification
//! - Delivery capacity pre-checks
//! - FIFO allocation previews

use rust_decimal::Decimal;
use std::str::FromStr;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::allocation::*;
pub use shared::models::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn parse_decimal(value: &str, field: &str) -> Result<Decimal, JsValue> {
    Decimal::from_str(value).map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", field, e)))
}

/// Convert a pack count to kilograms
#[wasm_bindgen]
pub fn convert_packs_to_kg(qty: &str, pack_weight_kg: &str) -> Result<String, JsValue> {
    let qty = parse_decimal(qty, "qty")?;
    let weight = parse_decimal(pack_weight_kg, "pack_weight_kg")?;
    Ok(packs_to_kg(qty, weight).to_string())
}

/// Classify a deal item from its booked and delivered KG
#[wasm_bindgen]
pub fn classify_item_status(booked_kg: &str, delivered_kg: &str) -> Result<String, JsValue> {
    let booked = parse_decimal(booked_kg, "booked_kg")?;
    let delivered = parse_decimal(delivered_kg, "delivered_kg")?;
    Ok(derive_item_status(booked, delivered).as_str().to_string())
}

/// Pre-check a delivery row against the remaining capacity of its deal item.
/// Returns an empty string when the row fits, or the rejection message.
#[wasm_bindgen]
pub fn check_row_capacity(
    booked_kg: &str,
    other_delivered_kg: &str,
    delivering_kg: &str,
) -> Result<String, JsValue> {
    let booked = parse_decimal(booked_kg, "booked_kg")?;
    let other = parse_decimal(other_delivered_kg, "other_delivered_kg")?;
    let delivering = parse_decimal(delivering_kg, "delivering_kg")?;

    Ok(match check_delivery_capacity(booked, other, delivering) {
        Ok(()) => String::new(),
        Err(msg) => msg,
    })
}

/// Derive the per-KG price from a 50 KG reference quote
#[wasm_bindgen]
pub fn derive_price_per_kg(base_price_50kg: &str) -> Result<String, JsValue> {
    let base = parse_decimal(base_price_50kg, "base_price_50kg")?;
    Ok(price_per_kg(base).to_string())
}

/// Preview a FIFO allocation across pending deal items.
/// Takes the pending rows as JSON (oldest first) and returns the proposed
/// allocation lines plus shortfall as JSON.
#[wasm_bindgen]
pub fn preview_allocation(pending_json: &str, total_qty: &str) -> Result<String, JsValue> {
    let pending: Vec<PendingDealItem> = serde_json::from_str(pending_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid pending items JSON: {}", e)))?;
    let total_qty = parse_decimal(total_qty, "total_qty")?;

    let result = allocate_fifo(&pending, total_qty);
    serde_json::to_string(&result)
        .map_err(|e| JsValue::from_str(&format!("Serialization failed: {}", e)))
}

/// True when the remaining KG counts as open capacity
#[wasm_bindgen]
pub fn is_pending(pending_kg: &str) -> Result<bool, JsValue> {
    let pending = parse_decimal(pending_kg, "pending_kg")?;
    Ok(has_pending(pending))
}
