//! Item price list HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{require_admin, CurrentUser};
use crate::services::price::{CreatePriceInput, PriceService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListPricesQuery {
    pub item: Option<String>,
    pub area: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRateQuery {
    pub item: String,
    pub area: String,
    pub pack_size: String,
    /// Defaults to now when omitted
    pub at: Option<DateTime<Utc>>,
}

/// List price entries
pub async fn list_prices(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListPricesQuery>,
) -> impl IntoResponse {
    let service = PriceService::new(state.db.clone());

    match service
        .list_prices(query.item.as_deref(), query.area.as_deref())
        .await
    {
        Ok(prices) => (
            StatusCode::OK,
            Json(serde_json::json!({ "prices": prices })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Record a new price entry (admin only)
pub async fn create_price(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<CreatePriceInput>,
) -> impl IntoResponse {
    if let Err(response) = require_admin(&user.0) {
        return response;
    }
    let service = PriceService::new(state.db.clone());

    match service.create_price(input).await {
        Ok(price) => (StatusCode::CREATED, Json(price)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Deactivate a price entry (admin only)
pub async fn deactivate_price(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(price_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(response) = require_admin(&user.0) {
        return response;
    }
    let service = PriceService::new(state.db.clone());

    match service.deactivate_price(price_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Latest active prices per item for one area
pub async fn get_area_prices(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(area): Path<String>,
) -> impl IntoResponse {
    let service = PriceService::new(state.db.clone());

    match service.prices_for_area(&area).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Resolve the pack rate for (item, area, pack size)
pub async fn resolve_rate(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ResolveRateQuery>,
) -> impl IntoResponse {
    let service = PriceService::new(state.db.clone());
    let at = query.at.unwrap_or_else(Utc::now);

    match service
        .resolve_rate(&query.item, &query.area, &query.pack_size, at)
        .await
    {
        Ok(rate) => (StatusCode::OK, Json(rate)).into_response(),
        Err(e) => e.into_response(),
    }
}
