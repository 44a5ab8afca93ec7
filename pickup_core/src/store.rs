//! Whole-collection persistence for pickup requests

use crate::error::{AppError, Result};
use crate::models::PickupRequest;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Backing storage for the ordered request collection.
///
/// `load` never fails: a backend that cannot produce its data reports an empty
/// collection so the service stays available. `save` replaces everything.
pub trait RequestStore: Send + Sync {
    fn load(&self) -> Vec<PickupRequest>;
    fn save(&self, requests: &[PickupRequest]) -> Result<()>;
    fn describe(&self) -> String;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    requests: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct StoreDocumentRef<'a> {
    requests: &'a [PickupRequest],
}

/// Stores the collection as `{"requests": [...]}` in a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl RequestStore for JsonFileStore {
    fn load(&self) -> Vec<PickupRequest> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Store file {} does not exist yet, starting empty", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read store file {}: {}; treating as empty", self.path.display(), e);
                return Vec::new();
            }
        };

        let document = match serde_json::from_str::<StoreDocument>(&contents) {
            Ok(document) => document,
            Err(e) => {
                warn!("Store file {} is malformed: {}; treating as empty", self.path.display(), e);
                return Vec::new();
            }
        };

        // A single unreadable record is dropped, the rest of the collection is kept.
        document
            .requests
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value::<PickupRequest>(record) {
                Ok(request) => Some(request),
                Err(e) => {
                    warn!("Skipping unreadable record {} in {}: {}", index, self.path.display(), e);
                    None
                }
            })
            .collect()
    }

    fn save(&self, requests: &[PickupRequest]) -> Result<()> {
        let dir = self.parent_dir();
        let storage_err = |action: &str, e: &dyn std::fmt::Display| {
            AppError::Storage(format!("{} {}: {}", action, self.path.display(), e))
        };

        std::fs::create_dir_all(dir).map_err(|e| storage_err("failed to create directory for", &e))?;

        let body = serde_json::to_vec_pretty(&StoreDocumentRef { requests })
            .map_err(|e| storage_err("failed to serialize", &e))?;

        // Written beside the target so the rename stays on one filesystem.
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| storage_err("failed to stage", &e))?;
        tmp.write_all(&body).map_err(|e| storage_err("failed to write", &e))?;
        tmp.as_file().sync_all().map_err(|e| storage_err("failed to sync", &e))?;
        tmp.persist(&self.path).map_err(|e| storage_err("failed to replace", &e.error))?;

        debug!("Saved {} requests to {}", requests.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json file ({})", self.path.display())
    }
}

/// Keeps the collection in process memory only.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    requests: Arc<RwLock<Vec<PickupRequest>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestStore for MemoryStore {
    fn load(&self) -> Vec<PickupRequest> {
        self.requests.read().clone()
    }

    fn save(&self, requests: &[PickupRequest]) -> Result<()> {
        *self.requests.write() = requests.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
