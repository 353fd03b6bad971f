use super::types::{Event, Photo, PhotoId, ThumbnailSpec, thumbnail_path};
use crate::db::{DbError, DynRepository};
use crate::storage::DynObjectStore;
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub label: String,
    pub active: bool,
    pub disabled: bool,
    pub url: String,
}

/// Position of one page within an event's gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: usize,
    pub num_pages: usize,
    /// One-based index of the first photo on the page.
    pub start: usize,
    /// One-based index of the last photo on the page.
    pub end: usize,
    pub total: usize,
    pub pages: Vec<Page>,
}

impl Pagination {
    /// `page` 0 is treated as page 1. An empty gallery still has one page.
    /// Anything past the end is reported as the first page after it.
    pub fn new(page: usize, per_page: usize, total: usize, base_url: &str) -> Self {
        let per_page = per_page.max(1);
        let num_pages = total.div_ceil(per_page).max(1);
        let current_page = page.clamp(1, num_pages + 1);

        let offset = (current_page - 1) * per_page;
        // A page past the end shows nothing.
        let (start, end) = if offset < total {
            (offset + 1, (offset + per_page).min(total))
        } else {
            (0, 0)
        };

        let page_url = |n: usize| format!("{}?page={}", base_url, n);

        let mut pages = Vec::with_capacity(num_pages + 2);
        pages.push(Page {
            label: "Prev".to_string(),
            active: false,
            disabled: current_page <= 1,
            url: page_url(current_page.saturating_sub(1).max(1)),
        });
        for n in 1..=num_pages {
            pages.push(Page {
                label: n.to_string(),
                active: n == current_page,
                disabled: false,
                url: page_url(n),
            });
        }
        pages.push(Page {
            label: "Next".to_string(),
            active: false,
            disabled: current_page >= num_pages,
            url: page_url((current_page + 1).min(num_pages)),
        });

        Self {
            current_page,
            num_pages,
            start,
            end,
            total,
            pages,
        }
    }

    pub fn offset(&self, per_page: usize) -> usize {
        (self.current_page - 1).saturating_mul(per_page.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThumbnailView {
    pub width: u32,
    pub height: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoView {
    pub photo_id: PhotoId,
    pub username: String,
    pub filename: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub taken: Option<NaiveDateTime>,
    /// Original image.
    pub url: String,
    /// Single-photo view with previous/next navigation.
    pub view_url: String,
    pub thumbnails: Vec<ThumbnailView>,
}

impl PhotoView {
    /// Thumbnail URLs are derived from the configured sizes; a size the
    /// worker has not finished yet simply 404s until it has.
    pub fn new(photo: &Photo, store: &DynObjectStore, sizes: &[ThumbnailSpec]) -> Self {
        Self {
            photo_id: photo.photo_id,
            username: photo.username.clone(),
            filename: photo.filename.clone(),
            format: photo.format.clone(),
            width: photo.width,
            height: photo.height,
            taken: photo.taken,
            url: store.url_for(&photo.storage_path()),
            view_url: photo_view_url(photo),
            thumbnails: sizes
                .iter()
                .map(|spec| ThumbnailView {
                    width: spec.width,
                    height: spec.height,
                    url: store.url_for(&thumbnail_path(photo.photo_id, spec.width, spec.height)),
                })
                .collect(),
        }
    }
}

pub fn photo_view_url(photo: &Photo) -> String {
    format!(
        "/events/{}/photos/{}/{}",
        photo.event_id,
        urlencoding::encode(&photo.username),
        urlencoding::encode(&photo.filename)
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserGroup {
    pub username: String,
    pub photos: Vec<PhotoView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryPage {
    pub event: Event,
    pub groups: Vec<UserGroup>,
    pub pagination: Pagination,
}

/// Split an ordered photo list into consecutive runs per uploader.
pub fn group_by_username(photos: Vec<PhotoView>) -> Vec<UserGroup> {
    let mut groups: Vec<UserGroup> = Vec::new();
    for photo in photos {
        match groups.last_mut() {
            Some(group) if group.username == photo.username => group.photos.push(photo),
            _ => groups.push(UserGroup {
                username: photo.username.clone(),
                photos: vec![photo],
            }),
        }
    }
    groups
}

pub async fn load_gallery_page(
    repository: &DynRepository,
    store: &DynObjectStore,
    sizes: &[ThumbnailSpec],
    event: Event,
    page: usize,
    per_page: usize,
    base_url: &str,
) -> Result<GalleryPage, DbError> {
    let total = repository.count_photos(event.event_id).await?;
    let pagination = Pagination::new(page, per_page, total, base_url);

    let photos = repository
        .list_photos(event.event_id, pagination.offset(per_page), per_page)
        .await?;
    let views = photos
        .iter()
        .map(|photo| PhotoView::new(photo, store, sizes))
        .collect();

    Ok(GalleryPage {
        event,
        groups: group_by_username(views),
        pagination,
    })
}
