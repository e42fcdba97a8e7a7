//! Capture session lifecycle
//!
//! A session cycles through unconfigured, configuring, configured,
//! running, and stopping. Configuration and start are split so the
//! embedder can build the topology early (hiding the latency behind
//! navigation) and begin streaming later. Start and stop are
//! idempotent; stop always returns the session to unconfigured with
//! nothing left attached.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::discovery::DeviceCache;
use super::platform::CameraPlatform;
use super::strategy::{
    ConfigurationStrategy, DualCameraStrategy, SessionTopology, SingleCameraStrategy,
};
use super::types::{CameraError, CameraPosition, OutputId, PreviewHandle, SessionState};

pub struct CaptureSession {
    platform: Arc<dyn CameraPlatform>,
    devices: DeviceCache,
    state: SessionState,
    topology: Option<SessionTopology>,
    /// Hardware capability ANDed with configuration preference.
    /// Probed once; never re-read.
    dual_capable: bool,
}

impl CaptureSession {
    pub fn new(platform: Arc<dyn CameraPlatform>, prefer_dual: bool) -> Self {
        let dual_capable = platform.supports_multi_cam() && prefer_dual;
        Self {
            platform,
            devices: DeviceCache::new(),
            state: SessionState::Unconfigured,
            topology: None,
            dual_capable,
        }
    }

    /// Resolve both camera handles in parallel ahead of the first
    /// configuration.
    pub async fn warm_device_cache(&mut self) {
        self.devices.precache(&self.platform).await;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_dual(&self) -> bool {
        self.topology
            .as_ref()
            .map(|t| t.is_dual())
            .unwrap_or(false)
    }

    pub fn photo_output(&self, position: CameraPosition) -> Option<OutputId> {
        self.topology.as_ref().and_then(|t| t.photo_output(position))
    }

    pub fn preview(&self, position: CameraPosition) -> Option<PreviewHandle> {
        self.topology.as_ref().and_then(|t| t.preview(position))
    }

    /// Build the session topology without starting the stream. Does
    /// nothing when a topology already exists.
    pub fn configure(&mut self) -> Result<(), CameraError> {
        if self.state != SessionState::Unconfigured {
            debug!(state = %self.state, "Session already configured");
            return Ok(());
        }

        self.state = SessionState::Configuring;
        let topology = match self.build_topology() {
            Ok(topology) => topology,
            Err(e) => {
                self.state = SessionState::Unconfigured;
                return Err(e);
            }
        };

        info!(dual = topology.is_dual(), "Capture session configured");
        self.topology = Some(topology);
        self.state = SessionState::Configured;
        Ok(())
    }

    fn build_topology(&mut self) -> Result<SessionTopology, CameraError> {
        if self.dual_capable {
            let strategy = DualCameraStrategy;
            match strategy.configure(self.platform.as_ref(), &mut self.devices) {
                Ok(topology) => return Ok(topology),
                Err(e) => {
                    warn!(
                        strategy = strategy.name(),
                        "Configuration failed, falling back to single camera: {}", e
                    );
                }
            }
        }

        SingleCameraStrategy.configure(self.platform.as_ref(), &mut self.devices)
    }

    /// Begin streaming, configuring first when needed. Calling start on
    /// a running session is a no-op.
    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.state == SessionState::Running {
            warn!("Capture session already running");
            return Ok(());
        }

        self.configure()?;

        if let Err(e) = self.platform.start_session() {
            warn!("Session failed to start, tearing down: {}", e);
            self.teardown();
            return Err(e);
        }

        self.state = SessionState::Running;
        info!(dual = self.is_dual(), "Capture session running");
        Ok(())
    }

    /// Stop streaming and remove the whole topology. Stopping an
    /// unconfigured session is a no-op.
    pub fn stop(&mut self) {
        if self.state == SessionState::Unconfigured {
            debug!("Capture session already stopped");
            return;
        }

        self.state = SessionState::Stopping;
        info!("Stopping capture session");
        self.platform.stop_session();
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(topology) = self.topology.take() {
            topology.teardown(self.platform.as_ref());
        }
        self.state = SessionState::Unconfigured;
    }
}
