//! Vehicle dispatch HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::dispatch::{CreateDispatchInput, DispatchService};
use crate::AppState;

/// List vehicle dispatches
pub async fn list_dispatches(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> impl IntoResponse {
    let service = DispatchService::new(state.db.clone());

    match service.list_dispatches().await {
        Ok(dispatches) => (
            StatusCode::OK,
            Json(serde_json::json!({ "dispatches": dispatches })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a dispatch with its loaded deliveries
pub async fn get_dispatch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(dispatch_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DispatchService::new(state.db.clone());

    match service.get_dispatch(dispatch_id).await {
        Ok(dispatch) => (StatusCode::OK, Json(dispatch)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a dispatch from submitted deliveries
pub async fn create_dispatch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<CreateDispatchInput>,
) -> impl IntoResponse {
    let service = DispatchService::new(state.db.clone());

    match service.create_dispatch(input).await {
        Ok(dispatch) => (StatusCode::CREATED, Json(dispatch)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List submitted deliveries not yet on an active dispatch
pub async fn get_undispatched_deliveries(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> impl IntoResponse {
    let service = DispatchService::new(state.db.clone());

    match service.undispatched_deliveries().await {
        Ok(deliveries) => (
            StatusCode::OK,
            Json(serde_json::json!({ "deliveries": deliveries })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Submit a dispatch
pub async fn submit_dispatch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(dispatch_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DispatchService::new(state.db.clone());

    match service.submit_dispatch(dispatch_id).await {
        Ok(dispatch) => (StatusCode::OK, Json(dispatch)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Cancel a dispatched vehicle
pub async fn cancel_dispatch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(dispatch_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DispatchService::new(state.db.clone());

    match service.cancel_dispatch(dispatch_id).await {
        Ok(dispatch) => (StatusCode::OK, Json(dispatch)).into_response(),
        Err(e) => e.into_response(),
    }
}
