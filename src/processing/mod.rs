//! Image post-processing
//!
//! Turns captured frames into upload-ready payloads: orientation
//! correction at capture time, then bounded downscale and JPEG
//! encoding just before upload. All transforms are pure; nothing here
//! touches the camera or the network.

mod encode;
mod orientation;
mod resize;

pub use orientation::rotate_upright;

use image::{RgbImage, RgbaImage};
use thiserror::Error;
use tracing::debug;

use crate::camera::CapturedImage;
use crate::config::ProcessingConfig;

#[derive(Debug, Error)]
pub enum PhotoError {
    /// The frame buffer does not match its declared dimensions
    #[error("frame buffer does not match its dimensions")]
    InvalidFrame,

    #[error("JPEG encoding failed: {0}")]
    Encode(String),

    #[error("processing task failed: {0}")]
    TaskFailed(String),
}

/// A finished, upload-ready image.
#[derive(Debug, Clone)]
pub struct JpegPayload {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl JpegPayload {
    pub const CONTENT_TYPE: &'static str = "image/jpeg";

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Prepares captured images for upload: decode, bound the size,
/// drop alpha, encode as JPEG.
#[derive(Debug, Clone)]
pub struct PhotoProcessor {
    max_dimension: u32,
    jpeg_quality: u8,
}

impl PhotoProcessor {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            max_dimension: config.max_dimension,
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Synchronous processing path. CPU-bound; prefer [`Self::prepare`]
    /// from async contexts.
    pub fn prepare_for_upload(&self, image: &CapturedImage) -> Result<JpegPayload, PhotoError> {
        let frame = &image.frame;
        let rgba = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
            .ok_or(PhotoError::InvalidFrame)?;

        let rgba = resize::downscale_to_fit(rgba, self.max_dimension);
        let rgb = strip_alpha(&rgba);
        let bytes = encode::encode_jpeg(&rgb, self.jpeg_quality)?;

        debug!(
            camera = %image.position,
            width = rgb.width(),
            height = rgb.height(),
            bytes = bytes.len(),
            "Prepared image for upload"
        );

        Ok(JpegPayload {
            width: rgb.width(),
            height: rgb.height(),
            bytes,
        })
    }

    /// Process on the blocking pool.
    pub async fn prepare(&self, image: CapturedImage) -> Result<JpegPayload, PhotoError> {
        let processor = self.clone();
        match tokio::task::spawn_blocking(move || processor.prepare_for_upload(&image)).await {
            Ok(result) => result,
            Err(e) => Err(PhotoError::TaskFailed(e.to_string())),
        }
    }
}

fn strip_alpha(rgba: &RgbaImage) -> RgbImage {
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (to, from) in rgb.pixels_mut().zip(rgba.pixels()) {
        *to = image::Rgb([from[0], from[1], from[2]]);
    }
    rgb
}
