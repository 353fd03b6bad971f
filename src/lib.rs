use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod db;
pub mod photos;
pub mod startup_checks;
pub mod storage;

use photos::{OverflowPolicy, ResizeMode, ThumbnailSpec};
use storage::StorageConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub thumbnails: ThumbnailsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_photos_per_page")]
    pub photos_per_page: usize,
    /// Prefix for pagination links, e.g. "https://photos.example.com".
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("photoshare.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThumbnailsConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub overflow: OverflowPolicy,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_thumbnail_sizes")]
    pub sizes: Vec<ThumbnailSpec>,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            overflow: OverflowPolicy::default(),
            jpeg_quality: default_jpeg_quality(),
            sizes: default_thumbnail_sizes(),
        }
    }
}

fn default_photos_per_page() -> usize {
    100
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_thumbnail_sizes() -> Vec<ThumbnailSpec> {
    vec![
        ThumbnailSpec::new(250, 250, ResizeMode::Fill),
        ThumbnailSpec::new(740, 555, ResizeMode::Fit),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            app: AppConfig {
                name: "Photoshare".to_string(),
                photos_per_page: default_photos_per_page(),
                base_url: None,
            },
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            thumbnails: ThumbnailsConfig::default(),
        }
    }
}

use axum::{
    Router,
    routing::{get, post},
};
use db::DynRepository;
use photos::{
    ThumbnailPersister, ThumbnailPipeline, ThumbnailQueue, ThumbnailWorker, UploadService,
    thumbnail_queue,
};
use storage::DynObjectStore;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub repository: DynRepository,
    pub store: DynObjectStore,
    pub queue: ThumbnailQueue,
    pub uploads: UploadService,
}

impl AppState {
    pub fn new(
        config: Config,
        repository: DynRepository,
        store: DynObjectStore,
        queue: ThumbnailQueue,
    ) -> Self {
        let uploads = UploadService::new(repository.clone(), store.clone(), queue.clone());
        Self {
            config,
            repository,
            store,
            queue,
            uploads,
        }
    }
}

/// Wire the thumbnail pipeline and queue around `repository` and `store`.
/// The returned worker must be spawned for thumbnails to be generated.
pub fn build_state(
    config: Config,
    repository: DynRepository,
    store: DynObjectStore,
) -> (AppState, ThumbnailWorker) {
    let persister = ThumbnailPersister::new(
        store.clone(),
        repository.clone(),
        config.thumbnails.jpeg_quality,
    );
    let pipeline = ThumbnailPipeline::new(config.thumbnails.sizes.clone(), persister);
    let (queue, worker) = thumbnail_queue(&config.thumbnails, pipeline);

    (AppState::new(config, repository, store, queue), worker)
}

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/events",
            post(photos::create_event_handler).get(photos::list_events_handler),
        )
        .route("/events/{event}", get(photos::gallery_handler))
        .route(
            "/events/{event}/photos/{username}/{filename}",
            get(photos::view_photo_handler),
        )
        .route("/events/{event}/upload", post(photos::upload_handler))
        .route("/events/{event}/download", post(photos::download_handler))
        .route(
            "/photos/{*path}",
            get(photos::serve_photo_handler).delete(photos::delete_photo_handler),
        )
        .layer(axum::extract::DefaultBodyLimit::disable())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let user_agent = request
                        .headers()
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        query = ?request.uri().query(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let size = response
                            .headers()
                            .get("content-length")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            size = %size,
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
