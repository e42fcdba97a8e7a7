//! Manual connection wiring for dual-camera topologies
//!
//! With automatic connection formation disabled, every link between an
//! input's video port and a photo output or preview sink is made by
//! hand. Individual refusals are tolerated (a camera can run without
//! its preview); a topology with no photo connection at all is useless
//! and fails configuration.

use tracing::{debug, warn};

use super::platform::CameraPlatform;
use super::types::{
    CameraError, CameraPosition, ConnectionId, InputId, OutputId, PreviewId, VideoOrientation,
};

/// One camera's attach points, ready to be linked up.
pub struct CameraLink {
    pub position: CameraPosition,
    pub input: InputId,
    pub output: OutputId,
    pub preview: PreviewId,
}

/// Connect every input to its photo output and preview sink.
///
/// The back preview's orientation is pinned to portrait; the front is
/// left at the platform default. Returns the connections that were
/// formed. On failure no connections remain; the caller still owns
/// cleanup of inputs, outputs, and previews.
pub fn wire_links(
    platform: &dyn CameraPlatform,
    links: &[CameraLink],
) -> Result<Vec<ConnectionId>, CameraError> {
    let mut connections = Vec::new();
    let mut photo_links = 0usize;

    for link in links {
        match platform.connect_output(link.input, link.output) {
            Ok(connection) => {
                debug!(camera = %link.position, "Connected photo output");
                connections.push(connection);
                photo_links += 1;
            }
            Err(e) => {
                warn!(camera = %link.position, "Photo connection refused: {}", e);
            }
        }

        let orientation = match link.position {
            CameraPosition::Back => Some(VideoOrientation::Portrait),
            CameraPosition::Front => None,
        };
        match platform.connect_preview(link.input, link.preview, orientation) {
            Ok(connection) => {
                debug!(camera = %link.position, "Connected preview");
                connections.push(connection);
            }
            Err(e) => {
                warn!(camera = %link.position, "Preview connection refused: {}", e);
            }
        }
    }

    if photo_links == 0 {
        for connection in connections {
            platform.remove_connection(connection);
        }
        return Err(CameraError::ConfigurationFailed(
            "no photo connection could be formed".to_string(),
        ));
    }

    Ok(connections)
}
