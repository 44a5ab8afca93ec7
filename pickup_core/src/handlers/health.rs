use crate::{error::Result, AppState};
use axum::{extract::State, response::IntoResponse, Json};
use tracing::info;

pub async fn handle_health(State(state): State<AppState>) -> Result<impl IntoResponse> {
    info!("GET /health");

    let stats = state.request_service.stats().await?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp(),
        "version": state.version,
        "storage": state.request_service.storage_description(),
        "requests": stats,
    })))
}
