//! Core library for the pickup request tracker: models, storage, and HTTP handlers.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use handlers::routes::{create_routes, static_ui};
pub use models::{PickupRequest, RequestStatus};
pub use services::{RequestService, RequestStats};
pub use store::{JsonFileStore, MemoryStore, RequestStore};

use axum::Router;
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub request_service: RequestService,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(RequestService::with_memory_store())
    }
}

impl AppState {
    pub fn new(request_service: RequestService) -> Self {
        Self {
            app_name: "Pickup Request Tracker".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            request_service,
        }
    }

    /// Picks the file store, or the in-memory one when no data file is configured.
    pub fn from_config(config: &AppConfig) -> Self {
        let request_service = if config.uses_memory_store() {
            RequestService::with_memory_store()
        } else {
            RequestService::with_file_store(&config.storage.data_file)
        };
        Self::new(request_service)
    }
}

pub fn create_app(state: AppState) -> Router {
    create_app_with_config(state, &AppConfig::default())
}

pub fn create_app_with_config(state: AppState, config: &AppConfig) -> Router {
    let mut router = create_routes().fallback_service(static_ui(&config.storage.static_dir));

    router = router.layer(middleware::cors::cors_layer());

    router = middleware::logging::with_request_logging(router);

    router.with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
