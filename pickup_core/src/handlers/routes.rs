//! Route table for the API plus the static UI fallback

use crate::{
    handlers::{health::handle_health, requests::*},
    AppState,
};
use axum::{
    routing::{get, put},
    Router,
};
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/api/requests",
            get(handle_list_requests).post(handle_create_request),
        )
        .route(
            "/api/requests/:id",
            put(handle_update_request).delete(handle_delete_request),
        )
}

/// Files under `static_dir`, with `index.html` answering every path that matches nothing else.
pub fn static_ui(static_dir: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")))
}
