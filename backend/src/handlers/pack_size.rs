//! Pack size master HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{require_admin, CurrentUser};
use crate::services::pack_size::{CreatePackSizeInput, PackSizeService, UpdatePackSizeInput};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListPackSizesQuery {
    #[serde(default)]
    pub only_active: bool,
}

/// List pack size masters
pub async fn list_pack_sizes(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListPackSizesQuery>,
) -> impl IntoResponse {
    let service = PackSizeService::new(state.db.clone());

    match service.list_pack_sizes(query.only_active).await {
        Ok(pack_sizes) => (
            StatusCode::OK,
            Json(serde_json::json!({ "pack_sizes": pack_sizes })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a pack size master (admin only)
pub async fn create_pack_size(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<CreatePackSizeInput>,
) -> impl IntoResponse {
    if let Err(response) = require_admin(&user.0) {
        return response;
    }
    let service = PackSizeService::new(state.db.clone());

    match service.create_pack_size(input).await {
        Ok(pack_size) => (StatusCode::CREATED, Json(pack_size)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update a pack size master (admin only)
pub async fn update_pack_size(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(pack_size_id): Path<Uuid>,
    Json(input): Json<UpdatePackSizeInput>,
) -> impl IntoResponse {
    if let Err(response) = require_admin(&user.0) {
        return response;
    }
    let service = PackSizeService::new(state.db.clone());

    match service.update_pack_size(pack_size_id, input).await {
        Ok(pack_size) => (StatusCode::OK, Json(pack_size)).into_response(),
        Err(e) => e.into_response(),
    }
}
