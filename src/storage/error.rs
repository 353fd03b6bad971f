use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("S3 error: {0}")]
    S3Error(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
