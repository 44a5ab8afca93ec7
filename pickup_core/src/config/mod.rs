//! Layered application configuration

mod settings;

pub use settings::{AppConfig, ServerConfig, StorageConfig};
