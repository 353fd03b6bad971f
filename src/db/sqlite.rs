use super::{DbError, Repository, schema};
use crate::photos::{Event, EventId, Photo, PhotoId, Thumbnail};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const PHOTO_COLUMNS: &str =
    "photo_id, event_id, username, filename, format, width, height, taken, uploaded";

const GALLERY_ORDER: &str = "username, COALESCE(taken, ''), photo_id";

/// `Repository` over a single SQLite connection. Calls run on the blocking
/// pool and are serialised by the connection mutex.
#[derive(Clone)]
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        schema::init_schema(&conn)?;
        info!("Opened database at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut Connection) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| DbError::Poisoned)?;
            f(&mut guard)
        })
        .await?
    }
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        event_id: EventId(row.get(0)?),
        name: row.get(1)?,
        admin: row.get(2)?,
    })
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        photo_id: PhotoId(row.get(0)?),
        event_id: EventId(row.get(1)?),
        username: row.get(2)?,
        filename: row.get(3)?,
        format: row.get(4)?,
        width: row.get(5)?,
        height: row.get(6)?,
        taken: row.get(7)?,
        uploaded: row.get(8)?,
    })
}

fn thumbnail_from_row(row: &Row<'_>) -> rusqlite::Result<Thumbnail> {
    Ok(Thumbnail {
        photo_id: PhotoId(row.get(0)?),
        width: row.get(1)?,
        height: row.get(2)?,
    })
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn insert_event(&self, event: &Event) -> Result<(), DbError> {
        let event = event.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO events (event_id, name, admin) VALUES (?1, ?2, ?3)",
                params![event.event_id.0, event.name, event.admin],
            )?;
            debug!("Inserted event {}", event.event_id);
            Ok(())
        })
        .await
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, DbError> {
        self.with_conn(move |conn| {
            let event = conn
                .query_row(
                    "SELECT event_id, name, admin FROM events WHERE event_id = ?1",
                    [event_id.0],
                    event_from_row,
                )
                .optional()?;
            Ok(event)
        })
        .await
    }

    async fn list_events(&self) -> Result<Vec<Event>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT event_id, name, admin FROM events ORDER BY name")?;
            let events = stmt
                .query_map([], event_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(events)
        })
        .await
    }

    async fn insert_photo(&self, photo: &Photo) -> Result<(), DbError> {
        let photo = photo.clone();
        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO photos ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    PHOTO_COLUMNS
                ),
                params![
                    photo.photo_id.0,
                    photo.event_id.0,
                    photo.username,
                    photo.filename,
                    photo.format,
                    photo.width,
                    photo.height,
                    photo.taken,
                    photo.uploaded,
                ],
            )?;
            debug!("Inserted photo {}", photo.photo_id);
            Ok(())
        })
        .await
    }

    async fn get_photo(&self, photo_id: PhotoId) -> Result<Option<Photo>, DbError> {
        self.with_conn(move |conn| {
            let photo = conn
                .query_row(
                    &format!("SELECT {} FROM photos WHERE photo_id = ?1", PHOTO_COLUMNS),
                    [photo_id.0],
                    photo_from_row,
                )
                .optional()?;
            Ok(photo)
        })
        .await
    }

    async fn find_photo(
        &self,
        event_id: EventId,
        username: &str,
        filename: &str,
    ) -> Result<Option<Photo>, DbError> {
        let username = username.to_string();
        let filename = filename.to_string();
        self.with_conn(move |conn| {
            let photo = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM photos
                         WHERE event_id = ?1 AND username = ?2 AND filename = ?3
                         ORDER BY photo_id LIMIT 1",
                        PHOTO_COLUMNS
                    ),
                    params![event_id.0, username, filename],
                    photo_from_row,
                )
                .optional()?;
            Ok(photo)
        })
        .await
    }

    async fn list_photos(
        &self,
        event_id: EventId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Photo>, DbError> {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM photos WHERE event_id = ?1
                 ORDER BY {} LIMIT ?2 OFFSET ?3",
                PHOTO_COLUMNS, GALLERY_ORDER
            ))?;
            let photos = stmt
                .query_map(params![event_id.0, limit, offset], photo_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(photos)
        })
        .await
    }

    async fn count_photos(&self, event_id: EventId) -> Result<usize, DbError> {
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM photos WHERE event_id = ?1",
                [event_id.0],
                |row| row.get(0),
            )?;
            usize::try_from(count).map_err(|_| DbError::CorruptRow(format!("count {}", count)))
        })
        .await
    }

    async fn neighbours(&self, photo: &Photo) -> Result<(Option<Photo>, Option<Photo>), DbError> {
        let photo = photo.clone();
        self.with_conn(move |conn| {
            let key = params![
                photo.event_id.0,
                photo.username,
                photo.taken,
                photo.photo_id.0
            ];

            let prev = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM photos
                         WHERE event_id = ?1
                           AND (username, COALESCE(taken, ''), photo_id)
                             < (?2, COALESCE(?3, ''), ?4)
                         ORDER BY username DESC, COALESCE(taken, '') DESC, photo_id DESC
                         LIMIT 1",
                        PHOTO_COLUMNS
                    ),
                    key,
                    photo_from_row,
                )
                .optional()?;

            let next = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM photos
                         WHERE event_id = ?1
                           AND (username, COALESCE(taken, ''), photo_id)
                             > (?2, COALESCE(?3, ''), ?4)
                         ORDER BY {}
                         LIMIT 1",
                        PHOTO_COLUMNS, GALLERY_ORDER
                    ),
                    key,
                    photo_from_row,
                )
                .optional()?;

            Ok((prev, next))
        })
        .await
    }

    async fn delete_photo(&self, photo_id: PhotoId) -> Result<(), DbError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM thumbnails WHERE photo_id = ?1", [photo_id.0])?;
            tx.execute("DELETE FROM photos WHERE photo_id = ?1", [photo_id.0])?;
            tx.commit()?;
            debug!("Deleted photo {}", photo_id);
            Ok(())
        })
        .await
    }

    async fn upsert_thumbnail(&self, thumbnail: &Thumbnail) -> Result<(), DbError> {
        let thumbnail = *thumbnail;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO thumbnails (photo_id, width, height) VALUES (?1, ?2, ?3)",
                params![thumbnail.photo_id.0, thumbnail.width, thumbnail.height],
            )?;
            Ok(())
        })
        .await
    }

    async fn thumbnails_for(&self, photo_id: PhotoId) -> Result<Vec<Thumbnail>, DbError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT photo_id, width, height FROM thumbnails
                 WHERE photo_id = ?1 ORDER BY width, height",
            )?;
            let thumbnails = stmt
                .query_map([photo_id.0], thumbnail_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(thumbnails)
        })
        .await
    }
}
