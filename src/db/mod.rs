pub mod error;
pub mod schema;
pub mod sqlite;

pub use error::DbError;
pub use sqlite::SqliteRepository;

use crate::photos::{Event, EventId, Photo, PhotoId, Thumbnail};
use async_trait::async_trait;
use std::sync::Arc;

/// Structured records for events, photos and thumbnails.
///
/// Photos are ordered by `(username, taken, photo_id)` everywhere a list or
/// a neighbour is involved; a missing `taken` sorts first.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn insert_event(&self, event: &Event) -> Result<(), DbError>;
    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, DbError>;
    async fn list_events(&self) -> Result<Vec<Event>, DbError>;

    async fn insert_photo(&self, photo: &Photo) -> Result<(), DbError>;
    async fn get_photo(&self, photo_id: PhotoId) -> Result<Option<Photo>, DbError>;
    async fn find_photo(
        &self,
        event_id: EventId,
        username: &str,
        filename: &str,
    ) -> Result<Option<Photo>, DbError>;
    async fn list_photos(
        &self,
        event_id: EventId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Photo>, DbError>;
    async fn count_photos(&self, event_id: EventId) -> Result<usize, DbError>;
    /// The photos immediately before and after `photo` within its event.
    async fn neighbours(&self, photo: &Photo) -> Result<(Option<Photo>, Option<Photo>), DbError>;
    /// Removes the photo row and all of its thumbnail rows.
    async fn delete_photo(&self, photo_id: PhotoId) -> Result<(), DbError>;

    /// Insert, or overwrite the row with the same natural key.
    async fn upsert_thumbnail(&self, thumbnail: &Thumbnail) -> Result<(), DbError>;
    async fn thumbnails_for(&self, photo_id: PhotoId) -> Result<Vec<Thumbnail>, DbError>;
}

pub type DynRepository = Arc<dyn Repository>;
