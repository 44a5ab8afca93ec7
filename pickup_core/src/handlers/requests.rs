//! Pickup request endpoints

use crate::{
    error::Result,
    extractors::{ApiJson, ApiJsonOrDefault},
    models::{CreatePickupRequest, UpdatePickupRequest},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

pub async fn handle_list_requests(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let requests = state.request_service.list().await?;
    info!("GET /api/requests - {} requests", requests.len());

    Ok(Json(requests))
}

pub async fn handle_create_request(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreatePickupRequest>,
) -> Result<impl IntoResponse> {
    let new_request = payload.into_new_request()?;
    let created = state.request_service.create(new_request).await?;
    info!("POST /api/requests - created {}", created.id);

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn handle_update_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJsonOrDefault(payload): ApiJsonOrDefault<UpdatePickupRequest>,
) -> Result<impl IntoResponse> {
    info!("PUT /api/requests/{}", id);

    let changes = payload.into_changes()?;
    let updated = state.request_service.update(id, changes).await?;

    Ok(Json(updated))
}

pub async fn handle_delete_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let removed = state.request_service.delete(id.clone()).await?;
    info!("DELETE /api/requests/{} - removed: {}", id, removed);

    Ok(Json(json!({ "ok": true })))
}
