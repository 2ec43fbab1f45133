//! Warehouse stock entry HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::stock::{CreateStockEntryInput, StockService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListStockEntriesQuery {
    pub warehouse: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StockBalancesQuery {
    pub warehouse: Option<String>,
    pub item: Option<String>,
    pub pack_size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssueFromDeliveryInput {
    pub delivery_id: Uuid,
    pub warehouse: String,
    pub posting_date: NaiveDate,
}

/// List stock entries
pub async fn list_stock_entries(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListStockEntriesQuery>,
) -> impl IntoResponse {
    let service = StockService::new(state.db.clone());

    match service.list_entries(query.warehouse.as_deref()).await {
        Ok(entries) => (
            StatusCode::OK,
            Json(serde_json::json!({ "stock_entries": entries })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a stock entry with its rows
pub async fn get_stock_entry(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = StockService::new(state.db.clone());

    match service.get_entry(entry_id).await {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a stock entry in Draft
pub async fn create_stock_entry(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<CreateStockEntryInput>,
) -> impl IntoResponse {
    let service = StockService::new(state.db.clone());

    match service.create_entry(input).await {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create and submit an Issue entry from a submitted delivery
pub async fn create_issue_from_delivery(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<IssueFromDeliveryInput>,
) -> impl IntoResponse {
    let service = StockService::new(state.db.clone());

    match service
        .create_issue_from_delivery(input.delivery_id, &input.warehouse, input.posting_date)
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Submit a Draft stock entry
pub async fn submit_stock_entry(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = StockService::new(state.db.clone());

    match service.submit_entry(entry_id).await {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Cancel a Submitted stock entry
pub async fn cancel_stock_entry(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = StockService::new(state.db.clone());

    match service.cancel_entry(entry_id).await {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Current balances per (warehouse, item, pack size)
pub async fn get_stock_balances(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<StockBalancesQuery>,
) -> impl IntoResponse {
    let service = StockService::new(state.db.clone());

    match service
        .balances(
            query.warehouse.as_deref(),
            query.item.as_deref(),
            query.pack_size.as_deref(),
        )
        .await
    {
        Ok(balances) => (
            StatusCode::OK,
            Json(serde_json::json!({ "balances": balances })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
