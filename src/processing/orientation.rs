//! Orientation correction for captured frames
//!
//! Photo outputs deliver frames rotated 180 degrees from display
//! orientation, so every captured image gets one half-turn at the
//! pixel-buffer level. The operation is its own inverse. A frame whose
//! buffer does not match its declared dimensions cannot be rotated
//! safely and passes through unchanged.

use tracing::debug;

use crate::camera::RawFrame;

/// Rotate a frame 180 degrees in place. Applying it twice restores the
/// original frame.
pub fn rotate_upright(frame: RawFrame) -> RawFrame {
    if !frame.is_intact() {
        debug!(
            width = frame.width,
            height = frame.height,
            len = frame.rgba.len(),
            "Frame buffer does not match dimensions, passing through"
        );
        return frame;
    }

    let RawFrame {
        width,
        height,
        mut rgba,
    } = frame;
    rotate_180(&mut rgba);
    RawFrame {
        width,
        height,
        rgba,
    }
}

/// Reverse the pixel order of a tightly packed RGBA buffer. The middle
/// pixel of an odd-sized image stays put.
fn rotate_180(rgba: &mut [u8]) {
    let pixels = rgba.len() / 4;
    for i in 0..pixels / 2 {
        let j = pixels - 1 - i;
        for byte in 0..4 {
            rgba.swap(i * 4 + byte, j * 4 + byte);
        }
    }
}
