//! Core camera domain types shared across the capture pipeline

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Physical camera position on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraPosition {
    /// Selfie camera
    Front,
    /// Main camera
    Back,
}

impl std::fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraPosition::Front => write!(f, "front"),
            CameraPosition::Back => write!(f, "back"),
        }
    }
}

/// An immutable handle to a physical camera, resolved once and cached
/// for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct CameraDevice {
    /// Platform-assigned unique identifier
    pub id: String,
    /// Which side of the device the camera faces
    pub position: CameraPosition,
    /// Human-readable model name (for logs)
    pub model: String,
}

/// A tightly packed RGBA pixel buffer as delivered by a photo output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl RawFrame {
    /// Whether the buffer length matches the declared dimensions.
    /// Frames that fail this check pass through orientation correction
    /// untouched rather than being rejected.
    pub fn is_intact(&self) -> bool {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            == Some(self.rgba.len())
    }

    /// Whether the frame carries any decodable image data at all.
    pub fn is_decodable(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.rgba.is_empty()
    }
}

/// A single captured image with its origin and timestamp
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub position: CameraPosition,
    pub frame: RawFrame,
    pub taken_at: DateTime<Utc>,
}

/// The result of one simultaneous capture. Either side may be absent:
/// a branch that failed or a single-camera session yields `None` for
/// the missing position.
#[derive(Debug, Clone)]
pub struct CapturedPair {
    /// Identifier tying both images to one capture moment
    pub id: Uuid,
    pub front: Option<CapturedImage>,
    pub back: Option<CapturedImage>,
}

impl CapturedPair {
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            front: None,
            back: None,
        }
    }

    /// True when the capture produced no image on either side
    /// (not running, capture already in flight, or both branches failed).
    pub fn is_empty(&self) -> bool {
        self.front.is_none() && self.back.is_none()
    }
}

/// Capture session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No topology exists; the starting and ending state
    Unconfigured,
    /// A configuration attempt is in progress
    Configuring,
    /// Topology built, session not yet streaming
    Configured,
    /// Session is streaming; captures are accepted
    Running,
    /// Teardown in progress
    Stopping,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Unconfigured => "unconfigured",
            SessionState::Configuring => "configuring",
            SessionState::Configured => "configured",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
        };
        write!(f, "{}", name)
    }
}

/// Orientation applied to a connection's video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoOrientation {
    Portrait,
    Landscape,
}

/// Camera hardware access state as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Granted,
    Denied,
    Undetermined,
}

/// How inputs and outputs participate in connection formation when
/// attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WiringMode {
    /// The platform forms default connections on attach
    Automatic,
    /// Nothing is connected implicitly; the graph is built by hand
    Manual,
}

/// Opaque handle to an attached device input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputId(pub u32);

/// Opaque handle to an attached photo output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputId(pub u32);

/// Opaque handle to a formed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u32);

/// Opaque handle to a preview sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewId(pub u32);

/// A renderable preview surface plus the metadata the view layer needs
/// to present it correctly. Layout is the embedder's job; mirroring and
/// orientation decisions are made here.
#[derive(Debug, Clone, Copy)]
pub struct PreviewHandle {
    pub id: PreviewId,
    pub position: CameraPosition,
    /// Front previews mirror so the user sees themselves as in a mirror
    pub mirrored: bool,
    pub orientation: VideoOrientation,
}

/// Errors surfaced by camera configuration and capture
#[derive(Debug, Error)]
pub enum CameraError {
    /// Hardware access was not granted. Surfaced once; never retried.
    #[error("camera access denied")]
    AuthorizationDenied,

    /// The requested camera does not exist or cannot be opened
    #[error("{0} camera unavailable")]
    DeviceUnavailable(CameraPosition),

    /// Neither the dual nor the single topology could be built
    #[error("session configuration failed: {0}")]
    ConfigurationFailed(String),

    /// The platform failed to deliver a still image
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    /// The camera service task is no longer running
    #[error("camera service closed")]
    ServiceClosed,
}
