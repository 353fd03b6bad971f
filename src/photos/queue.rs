//! Bounded background queue feeding a single thumbnail worker.
//!
//! Producers (upload handlers) share a cloneable [`ThumbnailQueue`]. One
//! [`ThumbnailWorker`] consumes jobs in FIFO order, one at a time, and renders
//! every configured size for each job. A failed size or a failed job is
//! logged and the worker moves on.

use super::error::{ProcessingError, QueueError};
use super::exif::ExifInfo;
use super::persist::ThumbnailPersister;
use super::render::render;
use super::types::{PhotoId, Thumbnail, ThumbnailSpec};
use crate::ThumbnailsConfig;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What `enqueue` does when the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Wait until the worker frees a slot.
    #[default]
    Block,
    /// Wait at most `millis`, then fail with [`QueueError::Timeout`].
    Timeout { millis: u64 },
    /// Fail immediately with [`QueueError::Full`].
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Processing,
}

/// One uploaded photo awaiting thumbnails. The decoded image is shared with
/// the upload path and never mutated.
#[derive(Debug, Clone)]
pub struct ThumbnailJob {
    pub photo_id: PhotoId,
    pub image: Arc<DynamicImage>,
    pub exif: ExifInfo,
}

impl ThumbnailJob {
    pub fn new(photo_id: PhotoId, image: Arc<DynamicImage>, exif: ExifInfo) -> Self {
        Self {
            photo_id,
            image,
            exif,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub stored: Vec<Thumbnail>,
    pub failed: Vec<ThumbnailSpec>,
}

/// Render-then-persist for every configured size.
#[derive(Clone)]
pub struct ThumbnailPipeline {
    sizes: Vec<ThumbnailSpec>,
    persister: ThumbnailPersister,
}

impl ThumbnailPipeline {
    pub fn new(sizes: Vec<ThumbnailSpec>, persister: ThumbnailPersister) -> Self {
        Self { sizes, persister }
    }

    pub fn sizes(&self) -> &[ThumbnailSpec] {
        &self.sizes
    }

    /// Sizes are processed in configuration order and independently of each
    /// other.
    pub async fn process(&self, job: &ThumbnailJob) -> JobReport {
        let mut report = JobReport::default();

        match self.persister.photo_exists(job.photo_id).await {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    "Photo {} was deleted before its thumbnails were generated, skipping",
                    job.photo_id
                );
                return report;
            }
            Err(e) => warn!(
                "Could not check photo {} before rendering, continuing: {}",
                job.photo_id, e
            ),
        }

        for spec in &self.sizes {
            match self.process_size(job, *spec).await {
                Ok(thumbnail) => {
                    debug!("Stored thumbnail {}", thumbnail.storage_path());
                    report.stored.push(thumbnail);
                }
                Err(e) => {
                    warn!(
                        "Failed to generate {} thumbnail for photo {}: {}",
                        spec, job.photo_id, e
                    );
                    report.failed.push(*spec);
                }
            }
        }

        report
    }

    async fn process_size(
        &self,
        job: &ThumbnailJob,
        spec: ThumbnailSpec,
    ) -> Result<Thumbnail, ProcessingError> {
        let image = job.image.clone();
        let orientation = job.exif.orientation;

        let rendered = tokio::task::spawn_blocking(move || {
            render(&image, spec.width, spec.height, spec.mode, orientation)
        })
        .await??;

        self.persister
            .persist(rendered, job.photo_id, spec.width, spec.height)
            .await
    }
}

struct Shared {
    sender: Mutex<Option<mpsc::Sender<ThumbnailJob>>>,
    pending: AtomicUsize,
    state: watch::Sender<WorkerState>,
    overflow: OverflowPolicy,
    capacity: usize,
}

impl Shared {
    fn finish_one(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.state.send_replace(WorkerState::Idle);
    }
}

/// Producer side of the queue. Clones share the same channel.
#[derive(Clone)]
pub struct ThumbnailQueue {
    shared: Arc<Shared>,
}

/// Consumer side. Does nothing until [`ThumbnailWorker::spawn`] is called.
pub struct ThumbnailWorker {
    receiver: mpsc::Receiver<ThumbnailJob>,
    pipeline: ThumbnailPipeline,
    shared: Arc<Shared>,
}

pub fn thumbnail_queue(
    config: &ThumbnailsConfig,
    pipeline: ThumbnailPipeline,
) -> (ThumbnailQueue, ThumbnailWorker) {
    let capacity = config.queue_capacity.max(1);
    let (sender, receiver) = mpsc::channel(capacity);
    let (state, _) = watch::channel(WorkerState::Idle);

    let shared = Arc::new(Shared {
        sender: Mutex::new(Some(sender)),
        pending: AtomicUsize::new(0),
        state,
        overflow: config.overflow,
        capacity,
    });

    (
        ThumbnailQueue {
            shared: shared.clone(),
        },
        ThumbnailWorker {
            receiver,
            pipeline,
            shared,
        },
    )
}

impl ThumbnailQueue {
    /// Hand a job to the worker, applying the overflow policy when the
    /// queue is full. On success the job will be processed exactly once
    /// unless the process exits first.
    pub async fn enqueue(&self, job: ThumbnailJob) -> Result<(), QueueError> {
        let sender = self
            .shared
            .sender
            .lock()
            .map_err(|_| QueueError::Closed)?
            .clone()
            .ok_or(QueueError::Closed)?;

        let permit = match self.shared.overflow {
            OverflowPolicy::Block => sender.reserve().await.map_err(|_| QueueError::Closed)?,
            OverflowPolicy::Timeout { millis } => {
                match tokio::time::timeout(Duration::from_millis(millis), sender.reserve()).await {
                    Ok(reserved) => reserved.map_err(|_| QueueError::Closed)?,
                    Err(_) => return Err(QueueError::Timeout),
                }
            }
            OverflowPolicy::Reject => sender.try_reserve().map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => QueueError::Full,
                mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
            })?,
        };

        // Counted before the send so the worker can never decrement first.
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        debug!("Queued thumbnail job for photo {}", job.photo_id);
        permit.send(job);

        Ok(())
    }

    /// Jobs accepted but not yet finished, including the one in progress.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn state(&self) -> WorkerState {
        *self.shared.state.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.shared
            .sender
            .lock()
            .map(|sender| sender.is_none())
            .unwrap_or(true)
    }

    /// Resolves once nothing is pending and the worker is idle.
    pub async fn wait_idle(&self) {
        let mut state = self.shared.state.subscribe();
        loop {
            let idle = *state.borrow_and_update() == WorkerState::Idle;
            if idle && self.pending() == 0 {
                return;
            }
            if state.changed().await.is_err() {
                return;
            }
        }
    }

    /// Stop accepting jobs. Already queued jobs are still processed; the
    /// worker task ends once they are done.
    pub fn shutdown(&self) {
        if let Ok(mut sender) = self.shared.sender.lock()
            && sender.take().is_some()
        {
            info!(
                "Thumbnail queue closed with {} job(s) pending",
                self.pending()
            );
        }
    }
}

impl ThumbnailWorker {
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!(
            "Thumbnail worker started ({} size(s), capacity {})",
            self.pipeline.sizes().len(),
            self.shared.capacity
        );

        while let Some(job) = self.receiver.recv().await {
            self.shared.state.send_replace(WorkerState::Processing);
            info!("Generating thumbnails for photo {}", job.photo_id);

            let report = self.pipeline.process(&job).await;
            if report.failed.is_empty() {
                debug!(
                    "Finished photo {} ({} thumbnail(s))",
                    job.photo_id,
                    report.stored.len()
                );
            } else {
                error!(
                    "Photo {}: {} of {} thumbnail(s) failed",
                    job.photo_id,
                    report.failed.len(),
                    self.pipeline.sizes().len()
                );
            }

            self.shared.finish_one();
        }

        info!("Thumbnail worker stopped (queue closed)");
    }
}
