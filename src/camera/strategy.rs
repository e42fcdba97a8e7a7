//! Session configuration strategies
//!
//! The ideal topology runs both cameras in one session with manual
//! wiring. Hardware that cannot do that, or a dual build that fails
//! partway, gets the plain single-camera topology instead. Whichever
//! strategy runs, a failed build never leaves half-attached pieces
//! behind: everything added is recorded and removed before the error
//! propagates.

use tracing::{debug, info};

use super::discovery::DeviceCache;
use super::platform::CameraPlatform;
use super::types::{
    CameraError, CameraPosition, ConnectionId, InputId, OutputId, PreviewHandle, VideoOrientation,
    WiringMode,
};
use super::wiring::{self, CameraLink};

/// Everything a configuration attempt attached to the session, in
/// creation order. Teardown removes connections first, then outputs,
/// previews, and inputs.
#[derive(Debug)]
pub struct SessionTopology {
    dual: bool,
    inputs: Vec<InputId>,
    outputs: Vec<(CameraPosition, OutputId)>,
    previews: Vec<PreviewHandle>,
    connections: Vec<ConnectionId>,
}

impl SessionTopology {
    fn new(dual: bool) -> Self {
        Self {
            dual,
            inputs: Vec::new(),
            outputs: Vec::new(),
            previews: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn is_dual(&self) -> bool {
        self.dual
    }

    pub fn photo_output(&self, position: CameraPosition) -> Option<OutputId> {
        self.outputs
            .iter()
            .find(|(p, _)| *p == position)
            .map(|(_, output)| *output)
    }

    pub fn preview(&self, position: CameraPosition) -> Option<PreviewHandle> {
        self.previews
            .iter()
            .find(|handle| handle.position == position)
            .copied()
    }

    /// Remove every attached piece from the session, in reverse
    /// dependency order.
    pub fn teardown(self, platform: &dyn CameraPlatform) {
        debug!(
            inputs = self.inputs.len(),
            outputs = self.outputs.len(),
            previews = self.previews.len(),
            connections = self.connections.len(),
            "Tearing down session topology"
        );
        for connection in self.connections {
            platform.remove_connection(connection);
        }
        for (_, output) in self.outputs {
            platform.remove_output(output);
        }
        for handle in self.previews {
            platform.remove_preview(handle.id);
        }
        for input in self.inputs {
            platform.remove_input(input);
        }
    }
}

/// A way of building a session topology. Selected once per
/// configuration attempt from the hardware capability and preference.
pub trait ConfigurationStrategy {
    fn name(&self) -> &'static str;

    /// Build the topology, or fail having removed everything that was
    /// attached along the way.
    fn configure(
        &self,
        platform: &dyn CameraPlatform,
        devices: &mut DeviceCache,
    ) -> Result<SessionTopology, CameraError>;
}

/// Both cameras in one session, manual wiring throughout.
pub struct DualCameraStrategy;

impl DualCameraStrategy {
    fn build(
        &self,
        platform: &dyn CameraPlatform,
        devices: &mut DeviceCache,
        topology: &mut SessionTopology,
    ) -> Result<(), CameraError> {
        let mut links = Vec::new();

        for position in [CameraPosition::Back, CameraPosition::Front] {
            let device = devices.device(platform, position)?;

            let input = platform.add_input(&device, WiringMode::Manual)?;
            topology.inputs.push(input);

            let output = platform.add_photo_output(WiringMode::Manual)?;
            topology.outputs.push((position, output));

            let preview = platform.add_preview(position)?;
            topology.previews.push(PreviewHandle {
                id: preview,
                position,
                mirrored: position == CameraPosition::Front,
                orientation: VideoOrientation::Portrait,
            });

            links.push(CameraLink {
                position,
                input,
                output,
                preview,
            });
        }

        topology.connections = wiring::wire_links(platform, &links)?;
        Ok(())
    }
}

impl ConfigurationStrategy for DualCameraStrategy {
    fn name(&self) -> &'static str {
        "dual-camera"
    }

    fn configure(
        &self,
        platform: &dyn CameraPlatform,
        devices: &mut DeviceCache,
    ) -> Result<SessionTopology, CameraError> {
        let mut topology = SessionTopology::new(true);
        match self.build(platform, devices, &mut topology) {
            Ok(()) => {
                info!("Dual-camera topology configured");
                Ok(topology)
            }
            Err(e) => {
                topology.teardown(platform);
                Err(e)
            }
        }
    }
}

/// Back camera only, with the platform's default connection formation.
pub struct SingleCameraStrategy;

impl SingleCameraStrategy {
    fn build(
        &self,
        platform: &dyn CameraPlatform,
        devices: &mut DeviceCache,
        topology: &mut SessionTopology,
    ) -> Result<(), CameraError> {
        let device = devices.device(platform, CameraPosition::Back)?;

        let input = platform.add_input(&device, WiringMode::Automatic)?;
        topology.inputs.push(input);

        let output = platform.add_photo_output(WiringMode::Automatic)?;
        topology.outputs.push((CameraPosition::Back, output));

        let preview = platform.add_preview(CameraPosition::Back)?;
        topology.previews.push(PreviewHandle {
            id: preview,
            position: CameraPosition::Back,
            mirrored: false,
            orientation: VideoOrientation::Portrait,
        });

        Ok(())
    }
}

impl ConfigurationStrategy for SingleCameraStrategy {
    fn name(&self) -> &'static str {
        "single-camera"
    }

    fn configure(
        &self,
        platform: &dyn CameraPlatform,
        devices: &mut DeviceCache,
    ) -> Result<SessionTopology, CameraError> {
        let mut topology = SessionTopology::new(false);
        match self.build(platform, devices, &mut topology) {
            Ok(()) => {
                info!("Single-camera topology configured");
                Ok(topology)
            }
            Err(e) => {
                topology.teardown(platform);
                Err(e)
            }
        }
    }
}
