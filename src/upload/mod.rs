//! Resilient image upload
//!
//! Finished JPEG payloads leave the device through here. Each image is
//! a retryable job; a capture's two images upload concurrently behind
//! one progress signal. The store trait is the seam where transports
//! and tests swap the backend.

mod job;
mod pipeline;
mod store;

pub use job::{RetryPolicy, UploadJob};
pub use pipeline::{PairUpload, PairUrls, Uploader};
pub use store::{HttpRemoteStore, ProgressFn, RemoteStore, StoreError};

use thiserror::Error;

/// Errors surfaced by upload jobs and pair uploads. Callers present
/// these as one generic upload failure; the chained source carries the
/// diagnostic detail.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The job exhausted its retry budget
    #[error("upload failed after {attempts} attempts: {source}")]
    Terminal {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// No upload endpoint is configured
    #[error("upload failed: no endpoint configured")]
    NotConfigured,

    /// The upload task itself died
    #[error("upload failed: {0}")]
    TaskFailed(String),
}
