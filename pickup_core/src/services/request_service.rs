use crate::{
    error::{AppError, Result},
    models::{NewPickupRequest, PickupChanges, PickupRequest, RequestStatus},
    store::{JsonFileStore, MemoryStore, RequestStore},
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// The only writer of the request collection.
///
/// Every mutation runs load, change, save while holding `write_lock`, so two
/// concurrent writes against the same store cannot overwrite each other.
/// Store calls run on the blocking pool.
#[derive(Clone)]
pub struct RequestService {
    store: Arc<dyn RequestStore>,
    write_lock: Arc<Mutex<()>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RequestStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl RequestService {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_file_store(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(JsonFileStore::new(path)))
    }

    pub fn with_memory_store() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn storage_description(&self) -> String {
        self.store.describe()
    }

    pub async fn list(&self) -> Result<Vec<PickupRequest>> {
        self.run_blocking(|store, _| Ok(store.load())).await
    }

    pub async fn create(&self, input: NewPickupRequest) -> Result<PickupRequest> {
        self.run_blocking(move |store, write_lock| {
            let _guard = write_lock.lock();
            let mut requests = store.load();

            let id = fresh_id(&requests);
            let now = chrono::Utc::now().timestamp_millis();
            let created_at = requests.first().map_or(now, |head| now.max(head.created_at));

            let request = PickupRequest::from_new(id, input, created_at);
            requests.insert(0, request.clone());
            store.save(&requests)?;

            Ok(request)
        })
        .await
    }

    pub async fn update(&self, id: String, changes: PickupChanges) -> Result<PickupRequest> {
        self.run_blocking(move |store, write_lock| {
            let _guard = write_lock.lock();
            let mut requests = store.load();

            let request = requests
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound("not found".to_string()))?;

            if changes.is_empty() {
                return Ok(request.clone());
            }

            changes.apply(request);
            let updated = request.clone();
            store.save(&requests)?;

            Ok(updated)
        })
        .await
    }

    /// Removes the request if it exists. Returns whether anything was removed.
    pub async fn delete(&self, id: String) -> Result<bool> {
        self.run_blocking(move |store, write_lock| {
            let _guard = write_lock.lock();
            let mut requests = store.load();

            let before = requests.len();
            requests.retain(|r| r.id != id);
            let removed = requests.len() != before;

            store.save(&requests)?;
            Ok(removed)
        })
        .await
    }

    pub async fn stats(&self) -> Result<RequestStats> {
        let requests = self.list().await?;
        let count = |status: RequestStatus| requests.iter().filter(|r| r.status == status).count();

        Ok(RequestStats {
            total: requests.len(),
            pending: count(RequestStatus::Pending),
            in_progress: count(RequestStatus::InProgress),
            completed: count(RequestStatus::Completed),
        })
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RequestStore, &Mutex<()>) -> Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        let write_lock = self.write_lock.clone();
        tokio::task::spawn_blocking(move || f(store.as_ref(), write_lock.as_ref())).await?
    }
}

fn fresh_id(existing: &[PickupRequest]) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if !existing.iter().any(|r| r.id == id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn new_request(name: &str) -> NewPickupRequest {
        NewPickupRequest {
            name: name.to_string(),
            phone: "555-1000".to_string(),
            address: "1 Elm St".to_string(),
            device: "Laptop".to_string(),
            quantity: 2,
            date: None,
        }
    }

    #[tokio::test]
    async fn test_create_prepends_and_assigns_defaults() {
        let service = RequestService::with_memory_store();

        let first = service.create(new_request("Alice")).await.unwrap();
        let second = service.create(new_request("Bob")).await.unwrap();

        assert!(!first.id.is_empty());
        assert_ne!(first.id, second.id);
        assert_eq!(first.status, RequestStatus::Pending);
        assert!(second.created_at >= first.created_at);

        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_created_at_never_goes_backwards() {
        let future = chrono::Utc::now().timestamp_millis() + 60_000;
        let mut existing = PickupRequest::from_new("seed".to_string(), new_request("Seed"), future);
        existing.status = RequestStatus::Completed;

        let store = MemoryStore::new();
        store.save(&[existing]).unwrap();

        let service = RequestService::new(Arc::new(store));
        let created = service.create(new_request("Alice")).await.unwrap();

        assert_eq!(created.created_at, future);
    }

    #[tokio::test]
    async fn test_update_changes_only_given_fields() {
        let service = RequestService::with_memory_store();
        let created = service.create(new_request("Alice")).await.unwrap();

        let changes = PickupChanges {
            status: Some(RequestStatus::Completed),
            ..Default::default()
        };
        let updated = service.update(created.id.clone(), changes).await.unwrap();

        assert_eq!(updated.status, RequestStatus::Completed);
        assert_eq!(
            PickupRequest {
                status: RequestStatus::Pending,
                ..updated.clone()
            },
            created
        );
        assert_eq!(service.list().await.unwrap(), vec![updated]);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let service = RequestService::with_memory_store();
        let created = service.create(new_request("Alice")).await.unwrap();

        let result = service
            .update("missing".to_string(), PickupChanges::default())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(service.list().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_empty_update_does_not_rewrite_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        let service = RequestService::with_file_store(&path);
        let created = service.create(new_request("Alice")).await.unwrap();

        // Compact JSON, unlike the pretty layout a save would write.
        std::fs::write(&path, serde_json::json!({ "requests": [created.clone()] }).to_string()).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let updated = service.update(created.id.clone(), PickupChanges::default()).await.unwrap();
        assert_eq!(updated, created);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let service = RequestService::with_memory_store();
        let keep = service.create(new_request("Alice")).await.unwrap();
        let gone = service.create(new_request("Bob")).await.unwrap();

        assert!(service.delete(gone.id.clone()).await.unwrap());
        assert!(!service.delete(gone.id.clone()).await.unwrap());
        assert!(!service.delete("never-existed".to_string()).await.unwrap());

        assert_eq!(service.list().await.unwrap(), vec![keep]);
    }

    #[tokio::test]
    async fn test_file_store_survives_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");

        let service = RequestService::with_file_store(&path);
        let a = service.create(new_request("Alice")).await.unwrap();
        let b = service.create(new_request("Bob")).await.unwrap();
        service
            .update(
                a.id.clone(),
                PickupChanges {
                    address: Some("9 Pine Rd".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        service.delete(b.id.clone()).await.unwrap();
        let in_memory = service.list().await.unwrap();

        let restarted = RequestService::with_file_store(&path);
        assert_eq!(restarted.list().await.unwrap(), in_memory);
        assert_eq!(in_memory.len(), 1);
        assert_eq!(in_memory[0].address, "9 Pine Rd");
    }

    #[tokio::test]
    async fn test_concurrent_creates_do_not_lose_updates() {
        let dir = TempDir::new().unwrap();
        let service = RequestService::with_file_store(dir.path().join("db.json"));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move { service.create(new_request(&format!("user-{}", i))).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let requests = service.list().await.unwrap();
        assert_eq!(requests.len(), 20);
        let ids: HashSet<_> = requests.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn test_stats() {
        let service = RequestService::with_memory_store();
        let a = service.create(new_request("Alice")).await.unwrap();
        service.create(new_request("Bob")).await.unwrap();
        service
            .update(
                a.id,
                PickupChanges {
                    status: Some(RequestStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stats = service.stats().await.unwrap();
        assert_eq!(
            stats,
            RequestStats {
                total: 2,
                pending: 1,
                in_progress: 1,
                completed: 0,
            }
        );
    }
}
