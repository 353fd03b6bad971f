use crate::storage::{ObjectStore, StorageError, Visibility, join_url, validate_path};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub visibility: Visibility,
}

/// In-process store. Nothing survives a restart; useful for tests and
/// throwaway runs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    base_url: String,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    put_log: Arc<RwLock<Vec<String>>>,
}

impl MemoryStore {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            objects: Arc::new(RwLock::new(HashMap::new())),
            put_log: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects.read().await.get(path).cloned()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Every successful `put`, in call order.
    pub async fn put_log(&self) -> Vec<String> {
        self.put_log.read().await.clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        visibility: Visibility,
    ) -> Result<(), StorageError> {
        validate_path(path)?;
        debug!("Storing {} in memory ({} bytes)", path, bytes.len());

        let mut objects = self.objects.write().await;
        objects.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                visibility,
            },
        );
        drop(objects);

        self.put_log.write().await.push(path.to_string());
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        validate_path(path)?;
        self.objects
            .read()
            .await
            .get(path)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        validate_path(path)?;
        match self.objects.write().await.remove(path) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(path.to_string())),
        }
    }

    fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn name(&self) -> &str {
        "In-Memory Store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new("/photos".to_string());

        store
            .put("1", b"original".to_vec(), "image/png", Visibility::PublicRead)
            .await
            .unwrap();

        let object = store.object("1").await.unwrap();
        assert_eq!(object.content_type, "image/png");
        assert_eq!(object.visibility, Visibility::PublicRead);
        assert_eq!(store.get("1").await.unwrap(), b"original");

        store.delete("1").await.unwrap();
        assert!(!store.contains("1").await);
        assert!(matches!(store.get("1").await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_put_log_keeps_call_order() {
        let store = MemoryStore::new("/photos".to_string());

        for path in ["3", "1", "2"] {
            store
                .put(path, Vec::new(), "image/jpeg", Visibility::PublicRead)
                .await
                .unwrap();
        }

        assert_eq!(store.put_log().await, vec!["3", "1", "2"]);
        assert_eq!(store.paths().await, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_memory_store_name() {
        let store = MemoryStore::new("/photos".to_string());
        assert_eq!(store.name(), "In-Memory Store");
    }
}
