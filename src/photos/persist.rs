use super::error::ProcessingError;
use super::types::{PhotoId, Thumbnail};
use crate::db::{DbError, DynRepository};
use crate::storage::{DynObjectStore, Visibility};
use image::{DynamicImage, ImageEncoder, codecs::jpeg::JpegEncoder};
use std::io::Cursor;
use tracing::{debug, error, warn};

pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

/// Writes rendered thumbnails to the object store and records them.
#[derive(Clone)]
pub struct ThumbnailPersister {
    store: DynObjectStore,
    repository: DynRepository,
    jpeg_quality: u8,
}

impl ThumbnailPersister {
    pub fn new(store: DynObjectStore, repository: DynRepository, jpeg_quality: u8) -> Self {
        Self {
            store,
            repository,
            jpeg_quality,
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Whether the photo still has a row. Jobs for deleted photos are dropped.
    pub async fn photo_exists(&self, photo_id: PhotoId) -> Result<bool, DbError> {
        Ok(self.repository.get_photo(photo_id).await?.is_some())
    }

    /// Encode, store and record one thumbnail.
    ///
    /// The row is only written once the bytes are stored. If the row write
    /// fails, e.g. because the photo was deleted meanwhile, the stored object
    /// is removed again.
    pub async fn persist(
        &self,
        image: DynamicImage,
        photo_id: PhotoId,
        width: u32,
        height: u32,
    ) -> Result<Thumbnail, ProcessingError> {
        let thumbnail = Thumbnail::new(photo_id, width, height);
        let path = thumbnail.storage_path();

        let quality = self.jpeg_quality;
        let bytes = tokio::task::spawn_blocking(move || encode_jpeg(&image, quality)).await??;

        debug!("Storing thumbnail {} ({} bytes)", path, bytes.len());
        self.store
            .put(&path, bytes, THUMBNAIL_CONTENT_TYPE, Visibility::PublicRead)
            .await
            .map_err(|source| ProcessingError::StoreWrite {
                path: path.clone(),
                source,
            })?;

        if let Err(source) = self.repository.upsert_thumbnail(&thumbnail).await {
            match self.store.delete(&path).await {
                Ok(()) => warn!("Thumbnail {} could not be recorded and was removed", path),
                Err(e) => error!(
                    "Thumbnail {} could not be recorded or removed, the object is orphaned: {}",
                    path, e
                ),
            }
            return Err(ProcessingError::MetadataInsert { path, source });
        }

        Ok(thumbnail)
    }
}

/// Encode as baseline JPEG. Alpha is dropped since JPEG has no alpha channel.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ProcessingError> {
    let rgb_image = image.to_rgb8();

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .write_image(
            rgb_image.as_raw(),
            rgb_image.width(),
            rgb_image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(ProcessingError::Encode)?;

    Ok(buffer.into_inner())
}
