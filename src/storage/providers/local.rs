use crate::storage::{ObjectStore, StorageError, Visibility, join_url, validate_path};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Objects as plain files under a root directory. Visibility is implied by
/// the server mounting the directory at `base_url`.
pub struct LocalStore {
    root: PathBuf,
    base_url: String,
}

impl LocalStore {
    pub fn new(root: PathBuf, base_url: String) -> Self {
        Self { root, base_url }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        _visibility: Visibility,
    ) -> Result<(), StorageError> {
        let full_path = self.full_path(path)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so readers never see a partial object.
        let mut temp_name = full_path.as_os_str().to_owned();
        temp_name.push(".partial");
        let temp_path = PathBuf::from(temp_name);
        tokio::fs::write(&temp_path, &bytes).await?;
        tokio::fs::rename(&temp_path, &full_path).await?;

        debug!(
            "Stored {} ({} bytes, {}) at {:?}",
            path,
            bytes.len(),
            content_type,
            full_path
        );
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full_path = self.full_path(path)?;
        match tokio::fs::read(&full_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full_path = self.full_path(path)?;
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => {
                debug!("Deleted {:?}", full_path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn name(&self) -> &str {
        "Local Filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path().to_path_buf(), "/photos".to_string());
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_put_creates_nested_directories() {
        let (store, temp_dir) = create_test_store();

        store
            .put("250x250/42", b"thumb".to_vec(), "image/jpeg", Visibility::PublicRead)
            .await
            .unwrap();

        let on_disk = std::fs::read(temp_dir.path().join("250x250").join("42")).unwrap();
        assert_eq!(on_disk, b"thumb");
        assert!(!temp_dir.path().join("250x250").join("42.partial").exists());
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_object() {
        let (store, _temp_dir) = create_test_store();

        store
            .put("7", b"first".to_vec(), "image/png", Visibility::PublicRead)
            .await
            .unwrap();
        store
            .put("7", b"second".to_vec(), "image/png", Visibility::PublicRead)
            .await
            .unwrap();

        assert_eq!(store.get("7").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_get_and_delete_missing_object() {
        let (store, _temp_dir) = create_test_store();

        assert!(matches!(
            store.get("nope").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.delete("nope").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let (store, _temp_dir) = create_test_store();

        let result = store
            .put("../outside", b"x".to_vec(), "image/jpeg", Visibility::PublicRead)
            .await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }

    #[test]
    fn test_url_for() {
        let (store, _temp_dir) = create_test_store();
        assert_eq!(store.url_for("740x555/3"), "/photos/740x555/3");
    }
}
