//! Delivery lifecycle and FIFO allocation HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::delivery::{AllocationQuery, CreateDeliveryInput, DeliveryService};
use crate::AppState;

/// Query parameters for listing deliveries
#[derive(Debug, Deserialize)]
pub struct ListDeliveriesQuery {
    pub customer: Option<String>,
    pub docstatus: Option<i16>,
}

/// Query parameters for the allocator
#[derive(Debug, Deserialize)]
pub struct AllocateQuery {
    pub customer: String,
    pub total_qty: Decimal,
    pub item: Option<String>,
    pub pack_size: Option<String>,
    pub exclude_delivery: Option<Uuid>,
}

/// List deliveries
pub async fn list_deliveries(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListDeliveriesQuery>,
) -> impl IntoResponse {
    let service = DeliveryService::new(state.db.clone());

    match service
        .list_deliveries(query.customer.as_deref(), query.docstatus)
        .await
    {
        Ok(deliveries) => (
            StatusCode::OK,
            Json(serde_json::json!({ "deliveries": deliveries })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a specific delivery with its rows
pub async fn get_delivery(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(delivery_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DeliveryService::new(state.db.clone());

    match service.get_delivery(delivery_id).await {
        Ok(delivery) => (StatusCode::OK, Json(delivery)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a delivery in Draft
pub async fn create_delivery(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<CreateDeliveryInput>,
) -> impl IntoResponse {
    let service = DeliveryService::new(state.db.clone());

    match service.create_delivery(input).await {
        Ok(delivery) => (StatusCode::CREATED, Json(delivery)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update a Draft delivery
pub async fn update_delivery(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(delivery_id): Path<Uuid>,
    Json(input): Json<CreateDeliveryInput>,
) -> impl IntoResponse {
    let service = DeliveryService::new(state.db.clone());

    match service.update_delivery(delivery_id, input).await {
        Ok(delivery) => (StatusCode::OK, Json(delivery)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Submit a Draft delivery
pub async fn submit_delivery(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(delivery_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DeliveryService::new(state.db.clone());

    match service.submit_delivery(delivery_id).await {
        Ok(delivery) => (StatusCode::OK, Json(delivery)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Cancel a Submitted delivery
pub async fn cancel_delivery(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(delivery_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DeliveryService::new(state.db.clone());

    match service.cancel_delivery(delivery_id).await {
        Ok(delivery) => (StatusCode::OK, Json(delivery)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete a Draft delivery
pub async fn delete_delivery(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(delivery_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DeliveryService::new(state.db.clone());

    match service.delete_delivery(delivery_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// A delivery's rows aggregated by (item, pack size), for the stock bridge
pub async fn get_aggregated_lines(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(delivery_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DeliveryService::new(state.db.clone());

    match service.aggregated_lines(delivery_id).await {
        Ok(lines) => (StatusCode::OK, Json(serde_json::json!({ "lines": lines }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List pending deal items for a customer, oldest booking first
pub async fn get_pending_deal_items(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<AllocationQuery>,
) -> impl IntoResponse {
    let service = DeliveryService::new(state.db.clone());

    match service.get_pending_deal_items(&query).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({ "pending_items": items })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Propose delivery rows by FIFO allocation across pending deal items
pub async fn allocate_fifo(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<AllocateQuery>,
) -> impl IntoResponse {
    let service = DeliveryService::new(state.db.clone());

    let allocation_query = AllocationQuery {
        customer: query.customer,
        item: query.item,
        pack_size: query.pack_size,
        exclude_delivery: query.exclude_delivery,
    };

    match service.allocate(&allocation_query, query.total_qty).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}
