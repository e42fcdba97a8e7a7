//! Pair upload orchestration
//!
//! The two images of a capture upload concurrently as independent
//! retryable jobs, but succeed or fail as a unit. Overall progress is
//! the arithmetic mean of the two jobs' latest fractions, recomputed on
//! every job event and published through a watch channel.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::info;

use crate::config::UploadConfig;
use crate::processing::JpegPayload;

use super::job::{RetryPolicy, UploadJob};
use super::store::{HttpRemoteStore, ProgressFn, RemoteStore};
use super::UploadError;

/// Download URLs for a completed pair upload.
#[derive(Debug, Clone)]
pub struct PairUrls {
    pub front: String,
    pub back: String,
}

/// Latest known fraction per job and their mean.
struct PairProgress {
    fractions: [f64; 2],
}

impl PairProgress {
    fn new() -> Self {
        Self {
            fractions: [0.0, 0.0],
        }
    }

    fn update(&mut self, slot: usize, fraction: f64) -> f64 {
        self.fractions[slot] = fraction.clamp(0.0, 1.0);
        (self.fractions[0] + self.fractions[1]) / 2.0
    }
}

fn pair_slot_progress(
    shared: Arc<Mutex<PairProgress>>,
    tx: watch::Sender<f64>,
    slot: usize,
) -> ProgressFn {
    Arc::new(move |fraction| {
        if let Ok(mut progress) = shared.lock() {
            let overall = progress.update(slot, fraction);
            let _ = tx.send(overall);
        }
    })
}

/// Uploads finished images to a remote store.
pub struct Uploader {
    store: Arc<dyn RemoteStore>,
    policy: RetryPolicy,
}

impl Uploader {
    pub fn new(store: Arc<dyn RemoteStore>, config: &UploadConfig) -> Self {
        Self {
            store,
            policy: RetryPolicy::from_config(config),
        }
    }

    /// Build an uploader over HTTP from the configured endpoint.
    pub fn over_http(config: &UploadConfig) -> Result<Self, UploadError> {
        let endpoint = config.endpoint.as_deref().ok_or(UploadError::NotConfigured)?;
        Ok(Self::new(Arc::new(HttpRemoteStore::new(endpoint)), config))
    }

    /// Upload one image to an explicit path. Building block for posts
    /// that ended up with a single usable image.
    pub async fn upload_image(
        &self,
        payload: JpegPayload,
        path: &str,
    ) -> Result<String, UploadError> {
        UploadJob::new(path, payload)
            .run(self.store.as_ref(), &self.policy, Arc::new(|_| {}))
            .await
    }

    /// Upload both images of a capture concurrently under
    /// `<entity_id>/front.jpg` and `<entity_id>/back.jpg`. The first
    /// permanently failed side fails the pair.
    pub fn upload_pair(
        &self,
        front: JpegPayload,
        back: JpegPayload,
        entity_id: &str,
    ) -> PairUpload {
        let (progress_tx, progress_rx) = watch::channel(0.0);
        let shared = Arc::new(Mutex::new(PairProgress::new()));
        let front_progress = pair_slot_progress(shared.clone(), progress_tx.clone(), 0);
        let back_progress = pair_slot_progress(shared, progress_tx, 1);

        let front_job = UploadJob::new(format!("{}/front.jpg", entity_id), front);
        let back_job = UploadJob::new(format!("{}/back.jpg", entity_id), back);
        let store = self.store.clone();
        let policy = self.policy.clone();

        info!(entity = %entity_id, "Pair upload starting");

        let handle = tokio::spawn(async move {
            let (front_url, back_url) = tokio::try_join!(
                front_job.run(store.as_ref(), &policy, front_progress),
                back_job.run(store.as_ref(), &policy, back_progress),
            )?;
            Ok(PairUrls {
                front: front_url,
                back: back_url,
            })
        });

        PairUpload {
            progress_rx,
            handle,
        }
    }
}

/// A pair upload in flight. Dropping the handle abandons the result but
/// not the transfer; the spawned jobs keep retrying detached.
pub struct PairUpload {
    progress_rx: watch::Receiver<f64>,
    handle: JoinHandle<Result<PairUrls, UploadError>>,
}

impl PairUpload {
    /// Latest overall progress, 0.0 through 1.0.
    pub fn progress(&self) -> watch::Receiver<f64> {
        self.progress_rx.clone()
    }

    /// Progress as an async stream of values.
    pub fn progress_stream(&self) -> WatchStream<f64> {
        WatchStream::new(self.progress_rx.clone())
    }

    /// Wait for both sides to finish.
    pub async fn join(self) -> Result<PairUrls, UploadError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(UploadError::TaskFailed(e.to_string())),
        }
    }
}
