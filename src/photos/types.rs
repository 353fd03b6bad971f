use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(pub i32);

impl EventId {
    pub fn generate() -> Self {
        Self(rand::random_range(1..=i32::MAX))
    }
}

impl PhotoId {
    /// Random positive 31-bit key. Assigned before the original is stored
    /// because the storage path is derived from it.
    pub fn generate() -> Self {
        Self(rand::random_range(1..=i32::MAX))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub name: String,
    pub admin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub photo_id: PhotoId,
    pub event_id: EventId,
    /// Name the uploader gave on the upload form.
    pub username: String,
    /// Base filename on the uploader's computer.
    pub filename: String,
    /// Format tag reported by the decoder, e.g. "jpeg".
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// Initially set from EXIF, may be corrected later.
    pub taken: Option<NaiveDateTime>,
    pub uploaded: DateTime<Utc>,
}

impl Photo {
    pub fn storage_path(&self) -> String {
        original_path(self.photo_id)
    }

    pub fn content_type(&self) -> String {
        format!("image/{}", self.format)
    }
}

/// A stored, resized copy of a photo. `(photo_id, width, height)` is the
/// natural key; the storage location is always derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Thumbnail {
    pub photo_id: PhotoId,
    pub width: u32,
    pub height: u32,
}

impl Thumbnail {
    pub fn new(photo_id: PhotoId, width: u32, height: u32) -> Self {
        Self {
            photo_id,
            width,
            height,
        }
    }

    pub fn storage_path(&self) -> String {
        thumbnail_path(self.photo_id, self.width, self.height)
    }
}

pub fn original_path(photo_id: PhotoId) -> String {
    photo_id.to_string()
}

pub fn thumbnail_path(photo_id: PhotoId, width: u32, height: u32) -> String {
    format!("{}x{}/{}", width, height, photo_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Scale and crop symmetrically to exactly fill the box.
    Fill,
    /// Scale to fit inside the box, keeping the aspect ratio.
    Fit,
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResizeMode::Fill => write!(f, "fill"),
            ResizeMode::Fit => write!(f, "fit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailSpec {
    pub width: u32,
    pub height: u32,
    pub mode: ResizeMode,
}

impl ThumbnailSpec {
    pub fn new(width: u32, height: u32, mode: ResizeMode) -> Self {
        Self {
            width,
            height,
            mode,
        }
    }
}

impl fmt::Display for ThumbnailSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} ({})", self.width, self.height, self.mode)
    }
}
