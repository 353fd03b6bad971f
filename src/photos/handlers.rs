use super::download::{DownloadError, build_archive};
use super::error::UploadError;
use super::gallery::{PhotoView, load_gallery_page};
use super::persist::THUMBNAIL_CONTENT_TYPE;
use super::types::{Event, EventId, Photo, PhotoId, Thumbnail};
use super::upload::UploadedFile;
use crate::AppState;
use crate::storage::{StorageConfig, StorageError};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    pub page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub admin: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub photo_ids: Vec<PhotoId>,
}

#[derive(Debug, Serialize)]
pub struct PhotoDetail {
    pub photo: PhotoView,
    pub prev: Option<PhotoView>,
    pub next: Option<PhotoView>,
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> Response {
    error!("{}: {}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

async fn find_event(app_state: &AppState, event_id: i32) -> Result<Event, Response> {
    match app_state.repository.get_event(EventId(event_id)).await {
        Ok(Some(event)) => Ok(event),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            format!("Event {} not found", event_id),
        )
            .into_response()),
        Err(e) => Err(internal_error("Failed to get event", e)),
    }
}

#[axum::debug_handler]
pub async fn create_event_handler(
    State(app_state): State<AppState>,
    Json(new_event): Json<NewEvent>,
) -> Response {
    let name = new_event.name.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "Event name is required").into_response();
    }

    let event = Event {
        event_id: EventId::generate(),
        name: name.to_string(),
        admin: new_event.admin.trim().to_string(),
    };

    match app_state.repository.insert_event(&event).await {
        Ok(()) => {
            info!("Created event {} ({})", event.event_id, event.name);
            (StatusCode::CREATED, Json(event)).into_response()
        }
        Err(e) => internal_error("Failed to create event", e),
    }
}

#[axum::debug_handler]
pub async fn list_events_handler(State(app_state): State<AppState>) -> Response {
    match app_state.repository.list_events().await {
        Ok(events) => Json(events).into_response(),
        Err(e) => internal_error("Failed to list events", e),
    }
}

#[axum::debug_handler]
pub async fn gallery_handler(
    State(app_state): State<AppState>,
    Path(event_id): Path<i32>,
    Query(query): Query<GalleryQuery>,
) -> Response {
    let event = match find_event(&app_state, event_id).await {
        Ok(event) => event,
        Err(response) => return response,
    };

    let base_url = format!(
        "{}/events/{}",
        app_state.config.app.base_url.as_deref().unwrap_or(""),
        event_id
    );

    match load_gallery_page(
        &app_state.repository,
        &app_state.store,
        &app_state.config.thumbnails.sizes,
        event,
        query.page.unwrap_or(0),
        app_state.config.app.photos_per_page,
        &base_url,
    )
    .await
    {
        Ok(page) => Json(page).into_response(),
        Err(e) => internal_error("Failed to load gallery", e),
    }
}

#[axum::debug_handler]
pub async fn view_photo_handler(
    State(app_state): State<AppState>,
    Path((event_id, username, filename)): Path<(i32, String, String)>,
) -> Response {
    if let Err(response) = find_event(&app_state, event_id).await {
        return response;
    }

    let photo = match app_state
        .repository
        .find_photo(EventId(event_id), &username, &filename)
        .await
    {
        Ok(Some(photo)) => photo,
        Ok(None) => return (StatusCode::NOT_FOUND, "No photo found.").into_response(),
        Err(e) => return internal_error("Failed to find photo", e),
    };

    let (prev, next) = match app_state.repository.neighbours(&photo).await {
        Ok(neighbours) => neighbours,
        Err(e) => return internal_error("Failed to find neighbouring photos", e),
    };

    let sizes = &app_state.config.thumbnails.sizes;
    let to_view = |photo: &Photo| PhotoView::new(photo, &app_state.store, sizes);

    Json(PhotoDetail {
        photo: to_view(&photo),
        prev: prev.as_ref().map(to_view),
        next: next.as_ref().map(to_view),
    })
    .into_response()
}

#[axum::debug_handler]
pub async fn upload_handler(
    State(app_state): State<AppState>,
    Path(event_id): Path<i32>,
    mut multipart: Multipart,
) -> Response {
    let mut username = String::new();
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed upload form: {}", e);
                return (StatusCode::BAD_REQUEST, e.body_text()).into_response();
            }
        };

        match field.name() {
            Some("name") => match field.text().await {
                Ok(text) => username = text,
                Err(e) => return (StatusCode::BAD_REQUEST, e.body_text()).into_response(),
            },
            Some("photos[]") | Some("photos") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => files.push(UploadedFile::new(filename, bytes.to_vec())),
                    Err(e) => {
                        warn!("Failed to read uploaded file {}: {}", filename, e);
                        return (StatusCode::BAD_REQUEST, e.body_text()).into_response();
                    }
                }
            }
            other => debug!("Ignoring form field {:?}", other),
        }
    }

    match app_state
        .uploads
        .ingest(EventId(event_id), &username, files)
        .await
    {
        Ok(report) => Json(report).into_response(),
        Err(UploadError::MissingName) => {
            (StatusCode::BAD_REQUEST, "name is required").into_response()
        }
        Err(e @ UploadError::EventNotFound(_)) => {
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
        Err(e) => internal_error("Upload failed", e),
    }
}

#[axum::debug_handler]
pub async fn download_handler(
    State(app_state): State<AppState>,
    Path(event_id): Path<i32>,
    Json(request): Json<DownloadRequest>,
) -> Response {
    if let Err(response) = find_event(&app_state, event_id).await {
        return response;
    }

    match build_archive(
        &app_state.repository,
        &app_state.store,
        EventId(event_id),
        &request.photo_ids,
    )
    .await
    {
        Ok(archive) => (
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"event-{}.zip\"", event_id),
                ),
            ],
            archive,
        )
            .into_response(),
        Err(e @ DownloadError::NothingToDownload) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => internal_error("Failed to build download", e),
    }
}

/// Stored objects for providers without their own public endpoint. S3
/// objects are fetched from the bucket URL directly.
#[axum::debug_handler]
pub async fn serve_photo_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    if matches!(app_state.config.storage, StorageConfig::S3(_)) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let bytes = match app_state.store.get(&path).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) | Err(StorageError::InvalidPath(_)) => {
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => return internal_error("Failed to read stored object", e),
    };

    let content_type = if path.contains('/') {
        THUMBNAIL_CONTENT_TYPE.to_string()
    } else {
        original_content_type(&app_state, &path).await
    };

    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=31536000".to_string()),
        ],
        bytes,
    )
        .into_response()
}

async fn original_content_type(app_state: &AppState, path: &str) -> String {
    let photo = match path.parse::<i32>() {
        Ok(id) => app_state.repository.get_photo(PhotoId(id)).await,
        Err(_) => Ok(None),
    };

    match photo {
        Ok(Some(photo)) => photo.content_type(),
        Ok(None) => "application/octet-stream".to_string(),
        Err(e) => {
            warn!("Failed to look up content type for {}: {}", path, e);
            "application/octet-stream".to_string()
        }
    }
}

/// Removes the original, every thumbnail object and the rows. Objects that
/// cannot be deleted are logged and left behind.
#[axum::debug_handler]
pub async fn delete_photo_handler(
    State(app_state): State<AppState>,
    Path(photo_id): Path<String>,
) -> Response {
    let photo_id = match photo_id.parse::<i32>() {
        Ok(id) => PhotoId(id),
        Err(_) => return (StatusCode::NOT_FOUND, "No photo found.").into_response(),
    };
    let photo = match app_state.repository.get_photo(photo_id).await {
        Ok(Some(photo)) => photo,
        Ok(None) => return (StatusCode::NOT_FOUND, "No photo found.").into_response(),
        Err(e) => return internal_error("Failed to get photo", e),
    };

    let recorded = match app_state.repository.thumbnails_for(photo_id).await {
        Ok(thumbnails) => thumbnails,
        Err(e) => return internal_error("Failed to list thumbnails", e),
    };

    // Sizes still being rendered have no row yet but may already be stored.
    let configured = app_state
        .config
        .thumbnails
        .sizes
        .iter()
        .map(|spec| Thumbnail::new(photo_id, spec.width, spec.height));
    let mut paths = vec![photo.storage_path()];
    let mut seen = HashSet::new();
    for thumbnail in recorded.into_iter().chain(configured) {
        if seen.insert(thumbnail) {
            paths.push(thumbnail.storage_path());
        }
    }

    for path in &paths {
        match app_state.store.delete(path).await {
            Ok(()) => debug!("Deleted {}", path),
            Err(StorageError::NotFound(_)) => debug!("{} was never stored", path),
            Err(e) => warn!(
                "Failed to delete {} from {}: {}",
                path,
                app_state.store.name(),
                e
            ),
        }
    }

    match app_state.repository.delete_photo(photo_id).await {
        Ok(()) => {
            info!("Deleted photo {} from event {}", photo_id, photo.event_id);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => internal_error("Failed to delete photo", e),
    }
}
