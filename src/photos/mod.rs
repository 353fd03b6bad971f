// Photos module - upload ingestion, thumbnail pipeline and gallery views
pub mod decode;
pub mod download;
mod error;
pub mod exif;
pub mod gallery;
mod handlers;
pub mod persist;
pub mod queue;
pub mod render;
mod types;
pub mod upload;

// Re-export public items
pub use error::{DecodeError, ProcessingError, QueueError, UploadError};
pub use exif::{ExifInfo, Orientation};
pub use handlers::{
    create_event_handler, delete_photo_handler, download_handler, gallery_handler,
    list_events_handler, serve_photo_handler, upload_handler, view_photo_handler,
};
pub use persist::ThumbnailPersister;
pub use queue::{
    OverflowPolicy, ThumbnailJob, ThumbnailPipeline, ThumbnailQueue, ThumbnailWorker,
    WorkerState, thumbnail_queue,
};
pub use types::*;
pub use upload::{UploadReport, UploadService, UploadedFile};

#[cfg(test)]
mod tests {
    mod fixtures;

    mod decode_tests;
    mod exif_tests;
    mod persist_tests;
    mod queue_tests;
    mod render_tests;
    mod upload_tests;
}
