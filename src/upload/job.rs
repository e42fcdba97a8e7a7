//! Single-image upload with bounded retries
//!
//! Each image is its own job: a failed transfer is retried with
//! exponential backoff until the attempt ceiling, then the job fails
//! permanently. A retry restarts the transfer from zero, so job
//! progress is not monotonic across attempts.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::UploadConfig;
use crate::processing::JpegPayload;

use super::store::{ProgressFn, RemoteStore};
use super::UploadError;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retry ceiling and backoff shape for upload jobs.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first (never less than 1)
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per subsequent retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Backoff after the given failed attempt (1-based).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exp = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(exp)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// One image on its way to one path in the store.
pub struct UploadJob {
    pub path: String,
    pub payload: JpegPayload,
}

impl UploadJob {
    pub fn new(path: impl Into<String>, payload: JpegPayload) -> Self {
        Self {
            path: path.into(),
            payload,
        }
    }

    /// Transfer the payload, retrying per the policy. Progress resets
    /// to 0.0 when a retry begins.
    pub async fn run(
        &self,
        store: &dyn RemoteStore,
        policy: &RetryPolicy,
        on_progress: ProgressFn,
    ) -> Result<String, UploadError> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(path = %self.path, attempt, "Upload attempt starting");

            match store
                .put(
                    &self.path,
                    self.payload.bytes.clone(),
                    JpegPayload::CONTENT_TYPE,
                    on_progress.clone(),
                )
                .await
            {
                Ok(url) => {
                    info!(path = %self.path, attempt, "Upload complete");
                    return Ok(url);
                }
                Err(e) if attempt < max_attempts => {
                    let delay = policy.backoff_for_attempt(attempt);
                    warn!(
                        path = %self.path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Upload attempt failed, retrying: {}", e
                    );
                    sleep(delay).await;
                    on_progress(0.0);
                }
                Err(e) => {
                    error!(
                        path = %self.path,
                        attempts = attempt,
                        "Upload failed permanently: {}", e
                    );
                    return Err(UploadError::Terminal {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}
