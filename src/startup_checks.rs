use crate::Config;
use crate::storage::StorageConfig;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create database directory {0}: {1}")]
    DatabaseDirectoryCreationFailed(String, #[source] std::io::Error),

    #[error("Failed to create storage directory {0}: {1}")]
    StorageDirectoryCreationFailed(String, #[source] std::io::Error),

    #[error("Storage directory is not accessible: {0}")]
    StorageDirectoryInaccessible(String),

    #[error("No thumbnail sizes configured")]
    NoThumbnailSizes,

    #[error("Thumbnail size {0}x{1} has no area")]
    ZeroThumbnailSize(u32, u32),

    #[error("Thumbnail queue capacity must be greater than zero")]
    ZeroQueueCapacity,

    #[error("JPEG quality {0} is outside 1-100")]
    JpegQualityOutOfRange(u8),

    #[error("S3 bucket name is empty")]
    EmptyBucket,
}

impl StartupCheckError {
    /// Whether the server cannot run at all with this problem.
    pub fn is_critical(&self) -> bool {
        !matches!(self, StartupCheckError::JpegQualityOutOfRange(_))
    }
}

async fn ensure_directory(dir: &Path) -> Result<bool, std::io::Error> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(false);
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(true)
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    // Database directory
    if let Some(db_dir) = config.database.path.parent() {
        match ensure_directory(db_dir).await {
            Ok(true) => info!("Created database directory: {:?}", db_dir),
            Ok(false) => info!("Database will be opened at {:?}", config.database.path),
            Err(e) => {
                error!("Failed to create database directory {:?}: {}", db_dir, e);
                errors.push(StartupCheckError::DatabaseDirectoryCreationFailed(
                    db_dir.display().to_string(),
                    e,
                ));
            }
        }
    }

    // Object storage
    match &config.storage {
        StorageConfig::Local(local) => {
            let dir = &local.directory;
            match ensure_directory(dir).await {
                Ok(created) => {
                    if created {
                        info!("Created storage directory: {:?}", dir);
                    }
                    match tokio::fs::read_dir(dir).await {
                        Ok(_) => info!("Storage directory is accessible: {:?}", dir),
                        Err(e) => {
                            error!("Storage directory is not accessible: {}", e);
                            errors.push(StartupCheckError::StorageDirectoryInaccessible(
                                dir.display().to_string(),
                            ));
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to create storage directory {:?}: {}", dir, e);
                    errors.push(StartupCheckError::StorageDirectoryCreationFailed(
                        dir.display().to_string(),
                        e,
                    ));
                }
            }
        }
        StorageConfig::Memory(_) => {
            warn!("Using in-memory storage, photos will not survive a restart");
        }
        StorageConfig::S3(s3) => {
            if s3.bucket.trim().is_empty() {
                errors.push(StartupCheckError::EmptyBucket);
            } else {
                info!("Using S3 bucket {}", s3.bucket);
            }
        }
    }

    // Thumbnail pipeline
    let thumbnails = &config.thumbnails;
    if thumbnails.sizes.is_empty() {
        errors.push(StartupCheckError::NoThumbnailSizes);
    }
    for spec in &thumbnails.sizes {
        if spec.width == 0 || spec.height == 0 {
            errors.push(StartupCheckError::ZeroThumbnailSize(spec.width, spec.height));
        }
    }
    if thumbnails.queue_capacity == 0 {
        errors.push(StartupCheckError::ZeroQueueCapacity);
    }
    if !(1..=100).contains(&thumbnails.jpeg_quality) {
        warn!(
            "JPEG quality {} is outside 1-100 and will be clamped by the encoder",
            thumbnails.jpeg_quality
        );
        errors.push(StartupCheckError::JpegQualityOutOfRange(
            thumbnails.jpeg_quality,
        ));
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photos::{ResizeMode, ThumbnailSpec};
    use crate::storage::LocalStorageConfig;
    use tempfile::TempDir;

    fn config_in(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.database.path = temp_dir.path().join("db").join("photoshare.db");
        config.storage = StorageConfig::Local(LocalStorageConfig {
            directory: temp_dir.path().join("photos"),
            base_url: "/photos".to_string(),
        });
        config
    }

    #[tokio::test]
    async fn test_creates_missing_directories() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);

        perform_startup_checks(&config).await.unwrap();

        assert!(temp_dir.path().join("db").is_dir());
        assert!(temp_dir.path().join("photos").is_dir());
    }

    #[tokio::test]
    async fn test_rejects_bad_thumbnail_settings() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config.thumbnails.sizes = vec![ThumbnailSpec::new(0, 250, ResizeMode::Fill)];
        config.thumbnails.queue_capacity = 0;

        let errors = perform_startup_checks(&config).await.unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(StartupCheckError::is_critical));
        assert!(errors
            .iter()
            .any(|e| matches!(e, StartupCheckError::ZeroThumbnailSize(0, 250))));
        assert!(errors
            .iter()
            .any(|e| matches!(e, StartupCheckError::ZeroQueueCapacity)));
    }

    #[tokio::test]
    async fn test_jpeg_quality_is_not_critical() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config.thumbnails.jpeg_quality = 0;

        let errors = perform_startup_checks(&config).await.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].is_critical());
    }
}
