use super::decode::{DecodedImage, decode_image};
use super::error::{ProcessingError, UploadError};
use super::exif::{ExifInfo, read_exif};
use super::queue::{ThumbnailJob, ThumbnailQueue};
use super::types::{EventId, Photo, PhotoId};
use crate::db::DynRepository;
use crate::storage::{DynObjectStore, Visibility};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One file field from the upload form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedPhoto {
    pub photo_id: PhotoId,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub uploaded: Vec<UploadedPhoto>,
    pub skipped: Vec<SkippedFile>,
}

/// Stores originals, records them and hands them to the thumbnail queue.
#[derive(Clone)]
pub struct UploadService {
    repository: DynRepository,
    store: DynObjectStore,
    queue: ThumbnailQueue,
}

impl UploadService {
    pub fn new(repository: DynRepository, store: DynObjectStore, queue: ThumbnailQueue) -> Self {
        Self {
            repository,
            store,
            queue,
        }
    }

    /// Ingest a batch of files for `username`. Only a blank name or an
    /// unknown event fail the request; each file either lands in
    /// `uploaded` or in `skipped`.
    pub async fn ingest(
        &self,
        event_id: EventId,
        username: &str,
        files: Vec<UploadedFile>,
    ) -> Result<UploadReport, UploadError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(UploadError::MissingName);
        }

        if self.repository.get_event(event_id).await?.is_none() {
            return Err(UploadError::EventNotFound(event_id));
        }

        let mut report = UploadReport::default();
        for file in files {
            let filename = base_filename(&file.filename);

            if file.bytes.is_empty() {
                debug!("Skipping empty upload {}", filename);
                report.skipped.push(SkippedFile {
                    filename,
                    reason: "empty file".to_string(),
                });
                continue;
            }

            match self
                .ingest_one(event_id, username, &filename, file.bytes)
                .await
            {
                Ok(photo) => report.uploaded.push(UploadedPhoto {
                    photo_id: photo.photo_id,
                    url: self.store.url_for(&photo.storage_path()),
                    filename,
                }),
                Err(e) => {
                    error!("Failed to ingest {}: {}", filename, e);
                    report.skipped.push(SkippedFile {
                        filename,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "{} photo(s) uploaded to event {} by {}, {} skipped",
            report.uploaded.len(),
            event_id,
            username,
            report.skipped.len()
        );
        Ok(report)
    }

    async fn ingest_one(
        &self,
        event_id: EventId,
        username: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Photo, ProcessingError> {
        let (decoded, exif, bytes) = tokio::task::spawn_blocking(
            move || -> Result<(DecodedImage, ExifInfo, Vec<u8>), ProcessingError> {
                let decoded = decode_image(&bytes)?;
                let exif = read_exif(&bytes);
                Ok((decoded, exif, bytes))
            },
        )
        .await??;

        let (width, height) = decoded.dimensions();
        let photo = Photo {
            photo_id: PhotoId::generate(),
            event_id,
            username: username.to_string(),
            filename: filename.to_string(),
            format: decoded.format,
            width,
            height,
            taken: exif.taken,
            uploaded: Utc::now(),
        };

        let path = photo.storage_path();
        self.store
            .put(&path, bytes, &photo.content_type(), Visibility::PublicRead)
            .await
            .map_err(|source| ProcessingError::StoreWrite {
                path: path.clone(),
                source,
            })?;

        if let Err(source) = self.repository.insert_photo(&photo).await {
            if let Err(e) = self.store.delete(&path).await {
                warn!("Failed to remove unrecorded original {}: {}", path, e);
            }
            return Err(ProcessingError::MetadataInsert { path, source });
        }

        let job = ThumbnailJob::new(photo.photo_id, Arc::new(decoded.image), exif);
        if let Err(e) = self.queue.enqueue(job).await {
            warn!(
                "Photo {} stored without thumbnails, enqueue failed: {}",
                photo.photo_id, e
            );
        }

        Ok(photo)
    }
}

/// Strip any directory components a browser may send with the filename.
pub fn base_filename(raw: &str) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    if name.is_empty() || name == "." || name == ".." {
        "upload".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_filename_strips_directories() {
        assert_eq!(base_filename("IMG_0001.JPG"), "IMG_0001.JPG");
        assert_eq!(base_filename("holiday/IMG_0001.JPG"), "IMG_0001.JPG");
        assert_eq!(base_filename("C:\\Users\\me\\IMG_0002.jpg"), "IMG_0002.jpg");
        assert_eq!(base_filename("dir/"), "upload");
        assert_eq!(base_filename(".."), "upload");
    }
}
