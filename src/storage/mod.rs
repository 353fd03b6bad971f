pub mod config;
pub mod error;
pub mod providers;

pub use config::*;
pub use error::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    PublicRead,
}

/// Byte storage for originals and thumbnails, addressed by relative path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        visibility: Visibility,
    ) -> Result<(), StorageError>;

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Public URL of the object at `path`. Pure function of the path, so
    /// callers can build URLs without touching the store.
    fn url_for(&self, path: &str) -> String;

    fn name(&self) -> &str;
}

pub type DynObjectStore = Arc<dyn ObjectStore>;

pub async fn create_store(config: &StorageConfig) -> Result<DynObjectStore, StorageError> {
    match config {
        StorageConfig::Local(local_config) => Ok(Arc::new(providers::local::LocalStore::new(
            local_config.directory.clone(),
            local_config.base_url.clone(),
        ))),
        StorageConfig::Memory(memory_config) => Ok(Arc::new(
            providers::memory::MemoryStore::new(memory_config.base_url.clone()),
        )),
        StorageConfig::S3(s3_config) => Ok(Arc::new(
            providers::s3::S3Store::new(s3_config).await?,
        )),
    }
}

/// Join a base URL and a relative object path with exactly one slash.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Reject paths that could escape the store's root.
pub(crate) fn validate_path(path: &str) -> Result<(), StorageError> {
    let trimmed = path.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('/')
        || trimmed.starts_with('\\')
        || trimmed
            .split(['/', '\\'])
            .any(|component| component == ".." || component.is_empty())
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}
