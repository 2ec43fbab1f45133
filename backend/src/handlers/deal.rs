//! Deal management HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::deal::{CreateDealInput, DealFilter, DealService, UpdateDealInput};
use crate::AppState;

/// List deals with optional filters
pub async fn list_deals(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(filter): Query<DealFilter>,
) -> impl IntoResponse {
    let service = DealService::new(state.db.clone());

    match service.list_deals(filter).await {
        Ok(deals) => (StatusCode::OK, Json(serde_json::json!({ "deals": deals }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a specific deal with its items
pub async fn get_deal(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DealService::new(state.db.clone());

    match service.get_deal(deal_id).await {
        Ok(deal) => (StatusCode::OK, Json(deal)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a new deal
pub async fn create_deal(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<CreateDealInput>,
) -> impl IntoResponse {
    let service = DealService::new(state.db.clone());

    match service.create_deal(input).await {
        Ok(deal) => (StatusCode::CREATED, Json(deal)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update a deal
pub async fn update_deal(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(deal_id): Path<Uuid>,
    Json(input): Json<UpdateDealInput>,
) -> impl IntoResponse {
    let service = DealService::new(state.db.clone());

    match service.update_deal(deal_id, input).await {
        Ok(deal) => (StatusCode::OK, Json(deal)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Confirm an Open deal
pub async fn confirm_deal(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DealService::new(state.db.clone());

    match service.confirm_deal(deal_id).await {
        Ok(deal) => (StatusCode::OK, Json(deal)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Cancel a deal
pub async fn cancel_deal(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DealService::new(state.db.clone());

    match service.cancel_deal(deal_id).await {
        Ok(deal) => (StatusCode::OK, Json(deal)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete a deal
pub async fn delete_deal(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DealService::new(state.db.clone());

    match service.delete_deal(deal_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Re-derive a deal's delivered figures from its submitted deliveries.
/// Maintenance endpoint; idempotent.
pub async fn refresh_deal(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DealService::new(state.db.clone());

    match service.refresh_from_deliveries(deal_id).await {
        Ok(()) => match service.get_deal(deal_id).await {
            Ok(deal) => (StatusCode::OK, Json(deal)).into_response(),
            Err(e) => e.into_response(),
        },
        Err(e) => e.into_response(),
    }
}
