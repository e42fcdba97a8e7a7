//! Capture feedback seam
//!
//! The embedder can react to the shutter (haptics, sounds, UI flash)
//! without the capture path knowing anything about it. Injected at
//! service construction; the default does nothing.

/// Fire-and-forget notifications about capture activity. Implementations
/// must return quickly; the capture path never waits on them.
pub trait CaptureFeedback: Send + Sync {
    /// A capture was accepted and is about to fire.
    fn capture_started(&self);
}

/// Feedback sink that ignores everything.
pub struct NoFeedback;

impl CaptureFeedback for NoFeedback {
    fn capture_started(&self) {}
}
