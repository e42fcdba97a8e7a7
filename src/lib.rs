//! paircap - dual-camera capture and resilient pair upload
//!
//! This library drives the moment-capture flow of a photo sharing client:
//! configure front and back cameras in one session, capture both sides at
//! once, post-process the frames into upload-ready JPEGs, and push the pair
//! to remote storage with retries and aggregated progress.
//!
//! The crate is organized into several modules:
//!
//! - [`camera`]: Session configuration, device discovery, and concurrent capture
//! - [`processing`]: Orientation fix-up, downscaling, and JPEG encoding
//! - [`upload`]: Retrying object uploads and pair-level progress tracking
//! - [`config`]: User configuration handling
//! - [`logging`]: File-based tracing setup with log rotation

pub mod camera;
pub mod config;
pub mod logging;
pub mod processing;
pub mod upload;

// Re-export commonly used types
pub use camera::{
    spawn_camera_service, CameraError, CameraHandle, CameraPlatform, CameraPosition, CameraStatus,
    CapturedImage, CapturedPair, NoFeedback,
};
pub use config::Config;
pub use processing::{JpegPayload, PhotoError, PhotoProcessor};
pub use upload::{HttpRemoteStore, PairUpload, PairUrls, UploadError, Uploader};
