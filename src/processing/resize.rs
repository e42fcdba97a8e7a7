//! Upload-size bounding
//!
//! Images are downscaled so neither dimension exceeds the configured
//! maximum, preserving aspect ratio. Images already within bounds are
//! returned untouched, upscaling never happens.

use image::imageops::FilterType;
use image::RgbaImage;
use tracing::debug;

/// Downscale so that `max(width, height) <= max_dimension`. A no-op for
/// images that already fit.
pub fn downscale_to_fit(image: RgbaImage, max_dimension: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return image;
    }

    let scale = max_dimension as f64 / width.max(height) as f64;
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    let new_height = ((height as f64 * scale).round() as u32).max(1);

    debug!(width, height, new_width, new_height, "Downscaling image for upload");

    image::imageops::resize(&image, new_width, new_height, FilterType::Lanczos3)
}
