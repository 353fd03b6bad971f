use super::types::{EventId, PhotoId};
use crate::db::{DbError, DynRepository};
use crate::storage::DynObjectStore;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Nothing to download")]
    NothingToDownload,

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Archive task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Fetch the originals of `photo_ids` and pack them as `username/filename`.
///
/// Photos that do not exist, belong to another event, or cannot be read
/// from the store are logged and left out.
pub async fn build_archive(
    repository: &DynRepository,
    store: &DynObjectStore,
    event_id: EventId,
    photo_ids: &[PhotoId],
) -> Result<Vec<u8>, DownloadError> {
    if photo_ids.is_empty() {
        return Err(DownloadError::NothingToDownload);
    }

    let mut entries = Vec::with_capacity(photo_ids.len());
    for photo_id in photo_ids {
        let photo = match repository.get_photo(*photo_id).await? {
            Some(photo) if photo.event_id == event_id => photo,
            _ => {
                warn!("Photo {} not found in event {}", photo_id, event_id);
                continue;
            }
        };

        match store.get(&photo.storage_path()).await {
            Ok(bytes) => entries.push(ArchiveEntry {
                name: format!("{}/{}", photo.username, photo.filename),
                bytes,
            }),
            Err(e) => error!("Failed to get photo {} from the store: {}", photo_id, e),
        }
    }

    let archive = tokio::task::spawn_blocking(move || write_archive(&entries)).await??;
    Ok(archive)
}

pub fn write_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>, DownloadError> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options: zip::write::FileOptions<'_, ()> =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.name.as_str()) {
            debug!("Skipping duplicate archive entry {}", entry.name);
            continue;
        }
        zip.start_file(entry.name.as_str(), options)?;
        zip.write_all(&entry.bytes)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_write_archive_contents() {
        let entries = vec![
            ArchiveEntry {
                name: "alice/a.jpg".to_string(),
                bytes: b"first".to_vec(),
            },
            ArchiveEntry {
                name: "bob/b.jpg".to_string(),
                bytes: b"second".to_vec(),
            },
            ArchiveEntry {
                name: "alice/a.jpg".to_string(),
                bytes: b"duplicate".to_vec(),
            },
        ];

        let bytes = write_archive(&entries).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut contents = String::new();
        archive
            .by_name("alice/a.jpg")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "first");
    }

    #[test]
    fn test_write_archive_empty() {
        let bytes = write_archive(&[]).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
