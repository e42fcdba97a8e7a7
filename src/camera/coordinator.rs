//! Simultaneous front/back capture
//!
//! Both photo outputs fire at once; each branch runs on the blocking
//! pool and resolves independently to an optional image. A branch that
//! errors, panics, or returns undecodable data yields nothing and never
//! disturbs its sibling, so a one-sided result is an ordinary outcome.
//! Every image is rotated upright before the branches join.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::processing::rotate_upright;

use super::feedback::CaptureFeedback;
use super::platform::CameraPlatform;
use super::types::{CameraPosition, CapturedImage, CapturedPair, OutputId};

/// Capture one image per connected output and join the results into a
/// pair. Positions without an output (single-camera sessions) resolve
/// to `None` immediately.
pub async fn capture_pair(
    platform: Arc<dyn CameraPlatform>,
    front_output: Option<OutputId>,
    back_output: Option<OutputId>,
    feedback: Arc<dyn CaptureFeedback>,
) -> CapturedPair {
    feedback.capture_started();

    let id = Uuid::new_v4();
    debug!(capture = %id, "Capture firing");

    let (front, back) = tokio::join!(
        capture_branch(platform.clone(), CameraPosition::Front, front_output),
        capture_branch(platform.clone(), CameraPosition::Back, back_output),
    );

    if front.is_none() && back.is_none() {
        warn!(capture = %id, "Capture produced no images");
    }

    CapturedPair { id, front, back }
}

async fn capture_branch(
    platform: Arc<dyn CameraPlatform>,
    position: CameraPosition,
    output: Option<OutputId>,
) -> Option<CapturedImage> {
    let output = output?;

    let task = tokio::task::spawn_blocking(move || platform.capture_still(output));

    let frame = match task.await {
        Ok(Ok(frame)) => frame,
        Ok(Err(e)) => {
            warn!(camera = %position, "Capture branch failed: {}", e);
            return None;
        }
        Err(e) => {
            warn!(camera = %position, "Capture task failed: {}", e);
            return None;
        }
    };

    if !frame.is_decodable() {
        warn!(camera = %position, "Captured frame is not decodable");
        return None;
    }

    Some(CapturedImage {
        position,
        frame: rotate_upright(frame),
        taken_at: Utc::now(),
    })
}
