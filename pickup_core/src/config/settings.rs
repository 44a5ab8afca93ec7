use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the request collection. Empty selects the in-memory store.
    pub data_file: PathBuf,
    /// Directory the UI is served from; `index.html` inside it is the catch-all.
    pub static_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("./data/db.json"),
            static_dir: PathBuf::from("./public"),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        let port = std::env::var("PORT").ok();
        let app_config = app_config.with_port_override(port.as_deref())?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Applies the bare `PORT` variable on top of everything else.
    pub fn with_port_override(mut self, port: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(raw) = port.map(str::trim).filter(|p| !p.is_empty()) {
            self.server.port = raw
                .parse()
                .map_err(|_| ConfigError::Message(format!("Invalid PORT value: {}", raw)))?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Message("Server host cannot be empty".to_string()));
        }

        if self.storage.static_dir.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "Static directory cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn uses_memory_store(&self) -> bool {
        self.storage.data_file.as_os_str().is_empty()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.data_file, PathBuf::from("./data/db.json"));
        assert!(!config.uses_memory_store());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.server.port = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.server.host = "  ".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.storage.static_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_data_file_selects_memory_store() {
        let mut config = AppConfig::default();
        config.storage.data_file = PathBuf::new();
        assert!(config.uses_memory_store());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_override() {
        let config = AppConfig::default().with_port_override(Some("8081")).unwrap();
        assert_eq!(config.server.port, 8081);

        let config = AppConfig::default().with_port_override(None).unwrap();
        assert_eq!(config.server.port, 3000);

        let config = AppConfig::default().with_port_override(Some("")).unwrap();
        assert_eq!(config.server.port, 3000);

        assert!(AppConfig::default().with_port_override(Some("http")).is_err());
        assert!(AppConfig::default().with_port_override(Some("70000")).is_err());
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");

        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 8080;
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }
}
