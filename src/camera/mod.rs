//! Camera capture subsystem
//!
//! A single long-lived service owns the capture session and processes
//! commands strictly in order, so configuration, start, stop, and
//! capture never race. Embedders talk to it through a [`CameraHandle`]
//! and observe it through a broadcast status stream.

mod coordinator;
mod discovery;
mod feedback;
mod platform;
mod service;
mod session;
mod strategy;
mod types;
mod wiring;

pub use feedback::{CaptureFeedback, NoFeedback};
pub use platform::CameraPlatform;
pub use service::{create_camera_channels, spawn_camera_service, CameraHandle, CameraService};
pub use session::CaptureSession;
pub use types::{
    Authorization, CameraDevice, CameraError, CameraPosition, CapturedImage, CapturedPair,
    ConnectionId, InputId, OutputId, PreviewHandle, PreviewId, RawFrame, SessionState,
    VideoOrientation, WiringMode,
};

use tokio::sync::oneshot;

/// Commands accepted by the camera service
pub enum CameraCommand {
    /// Build the session topology without starting the stream
    Configure {
        reply: oneshot::Sender<Result<(), CameraError>>,
    },
    /// Begin streaming (configures first when needed)
    Start {
        reply: oneshot::Sender<Result<(), CameraError>>,
    },
    /// Stop streaming and tear the topology down
    Stop { reply: oneshot::Sender<()> },
    /// Fire a simultaneous capture
    Capture {
        reply: oneshot::Sender<CapturedPair>,
    },
    /// Fetch the preview handle for one camera
    Preview {
        position: CameraPosition,
        reply: oneshot::Sender<Option<PreviewHandle>>,
    },
    /// Shut the service down
    Shutdown,
}

/// Status updates broadcast by the camera service
#[derive(Debug, Clone)]
pub enum CameraStatus {
    /// Camera access was denied; nothing will configure
    Unauthorized,
    /// No topology exists
    Idle,
    /// A configuration attempt is in progress
    Configuring,
    /// Topology built, stream not yet running
    Ready { dual: bool },
    /// Stream is live; captures are accepted
    Running { dual: bool },
    /// Teardown in progress
    Stopping,
    /// An error occurred
    Error(String),
}
