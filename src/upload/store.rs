//! Remote object store
//!
//! One operation: put bytes at a path, get back the download URL the
//! server assigns. The HTTP implementation streams payloads so byte
//! progress can be surfaced as the transfer leaves the device.

use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::StreamExt;
use reqwest::{Body, Client};
use serde::Deserialize;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// Fractional progress callback (0.0 through 1.0). Called from the
/// transfer task; implementations must be cheap and non-blocking.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server returned status {0}")]
    Status(u16),

    /// The server acknowledged the transfer but its response did not
    /// contain a parseable download URL
    #[error("malformed store response: {0}")]
    MalformedResponse(String),
}

/// Destination for finished image payloads.
pub trait RemoteStore: Send + Sync {
    /// Store `payload` at `path` and return its download URL. Progress
    /// is reported as bytes leave, plus a final 1.0 on acknowledgement.
    fn put<'a>(
        &'a self,
        path: &'a str,
        payload: Vec<u8>,
        content_type: &'a str,
        on_progress: ProgressFn,
    ) -> BoxFuture<'a, Result<String, StoreError>>;
}

/// Server response for a stored object.
#[derive(Debug, Deserialize)]
struct UploadReceipt {
    download_url: String,
}

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Object store speaking plain HTTP PUT against a root URL.
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: Client,
    root: String,
}

impl HttpRemoteStore {
    pub fn new(root: impl Into<String>) -> Self {
        Self::with_client(Client::new(), root)
    }

    pub fn with_client(client: Client, root: impl Into<String>) -> Self {
        Self {
            client,
            root: root.into(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.root.trim_end_matches('/'), path)
    }
}

impl RemoteStore for HttpRemoteStore {
    fn put<'a>(
        &'a self,
        path: &'a str,
        payload: Vec<u8>,
        content_type: &'a str,
        on_progress: ProgressFn,
    ) -> BoxFuture<'a, Result<String, StoreError>> {
        Box::pin(async move {
            let url = self.object_url(path);
            let total = payload.len() as u64;
            debug!(%url, bytes = total, "Object upload starting");

            on_progress(0.0);

            // Stream the payload in chunks, counting transmitted bytes
            // into the progress callback.
            let sent = Arc::new(AtomicU64::new(0));
            let stream = ReaderStream::with_capacity(Cursor::new(payload), UPLOAD_CHUNK_SIZE);
            let stream = stream.inspect({
                let sent = sent.clone();
                let on_progress = on_progress.clone();
                move |chunk| {
                    if let Ok(chunk) = chunk {
                        let transferred =
                            sent.fetch_add(chunk.len() as u64, Ordering::Relaxed)
                                + chunk.len() as u64;
                        if total > 0 {
                            on_progress(transferred as f64 / total as f64);
                        }
                    }
                }
            });

            let response = self
                .client
                .put(&url)
                .header("Content-Type", content_type)
                .header("Content-Length", total)
                .body(Body::wrap_stream(stream))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(StoreError::Status(status.as_u16()));
            }

            let body = response.text().await?;
            let receipt: UploadReceipt = serde_json::from_str(&body)
                .map_err(|e| StoreError::MalformedResponse(e.to_string()))?;

            on_progress(1.0);
            info!(%url, bytes = total, "Object upload complete");
            Ok(receipt.download_url)
        })
    }
}
