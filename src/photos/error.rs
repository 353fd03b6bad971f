use crate::db::DbError;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("upload is empty")]
    Empty,

    #[error("unrecognized image format")]
    UnknownFormat,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

/// Failures of the thumbnail pipeline. Each one is contained to the unit of
/// work it happened in: one uploaded photo or one output size.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to render {width}x{height} thumbnail: {reason}")]
    Render {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("Failed to encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Failed to write {path} to the object store: {source}")]
    StoreWrite {
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to record metadata for {path}: {source}")]
    MetadataInsert {
        path: String,
        #[source]
        source: DbError,
    },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("thumbnail queue is full")]
    Full,

    #[error("timed out waiting for a free slot in the thumbnail queue")]
    Timeout,

    #[error("thumbnail queue is closed")]
    Closed,
}

/// Failures that reject a whole upload request. Per-file problems are
/// reported in the upload report instead.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("name is required")]
    MissingName,

    #[error("Event {0} not found")]
    EventNotFound(crate::photos::EventId),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}
