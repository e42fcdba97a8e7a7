//! Hardware abstraction for camera sessions
//!
//! Everything the capture pipeline needs from the underlying camera
//! stack goes through [`CameraPlatform`]: device resolution, topology
//! mutation (inputs, outputs, previews, connections), session start and
//! stop, and still capture. Implementations may block briefly; callers
//! wrap slow operations in `spawn_blocking`.

use super::types::{
    Authorization, CameraDevice, CameraError, CameraPosition, ConnectionId, InputId, OutputId,
    PreviewId, RawFrame, VideoOrientation, WiringMode,
};

/// The seam between the capture pipeline and real camera hardware.
///
/// All methods take `&self`; implementations are expected to be
/// internally synchronized. The service serializes its own calls, but
/// capture fan-out invokes `capture_still` from two tasks at once.
pub trait CameraPlatform: Send + Sync {
    /// Current hardware access state. Read once at service startup.
    fn authorization(&self) -> Authorization;

    /// Whether the hardware supports running both cameras in one
    /// session. Constant for the lifetime of the process.
    fn supports_multi_cam(&self) -> bool;

    /// Look up the camera at the given position. May block on a
    /// hardware query.
    fn resolve_device(&self, position: CameraPosition) -> Result<CameraDevice, CameraError>;

    /// Attach a device input to the session.
    fn add_input(&self, device: &CameraDevice, mode: WiringMode) -> Result<InputId, CameraError>;

    fn remove_input(&self, input: InputId);

    /// Attach a photo output to the session.
    fn add_photo_output(&self, mode: WiringMode) -> Result<OutputId, CameraError>;

    fn remove_output(&self, output: OutputId);

    /// Create a preview sink for the given position.
    fn add_preview(&self, position: CameraPosition) -> Result<PreviewId, CameraError>;

    fn remove_preview(&self, preview: PreviewId);

    /// Form an explicit connection from an input's video port to a
    /// photo output.
    fn connect_output(&self, input: InputId, output: OutputId) -> Result<ConnectionId, CameraError>;

    /// Form an explicit connection from an input's video port to a
    /// preview sink, optionally pinning the stream orientation.
    fn connect_preview(
        &self,
        input: InputId,
        preview: PreviewId,
        orientation: Option<VideoOrientation>,
    ) -> Result<ConnectionId, CameraError>;

    fn remove_connection(&self, connection: ConnectionId);

    /// Begin streaming. Blocks until the session is live or fails.
    fn start_session(&self) -> Result<(), CameraError>;

    /// Stop streaming. Infallible teardown.
    fn stop_session(&self);

    /// Capture one still frame from the given photo output. Blocks
    /// until the platform delivers the frame or reports an error.
    fn capture_still(&self, output: OutputId) -> Result<RawFrame, CameraError>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted platform for exercising configuration, fallback, and
    //! capture paths without hardware. Records every topology mutation
    //! so tests can assert that rollback removed everything it added.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Condvar, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ConnectTarget {
        Output(OutputId),
        Preview(PreviewId),
    }

    #[derive(Debug, Clone)]
    pub struct ConnectionRecord {
        pub from: InputId,
        pub target: ConnectTarget,
        pub orientation: Option<VideoOrientation>,
    }

    /// Holds `capture_still` open until released, so a test can observe
    /// the service while a capture is still in flight.
    pub struct CaptureGate {
        entered: AtomicUsize,
        released: Mutex<bool>,
        unblock: Condvar,
    }

    impl CaptureGate {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                entered: AtomicUsize::new(0),
                released: Mutex::new(false),
                unblock: Condvar::new(),
            })
        }

        /// How many capture calls have reached the platform.
        pub fn entered(&self) -> usize {
            self.entered.load(Ordering::SeqCst)
        }

        /// Let every held (and future) capture proceed.
        pub fn release(&self) {
            *self.released.lock().unwrap() = true;
            self.unblock.notify_all();
        }

        fn hold(&self) {
            self.entered.fetch_add(1, Ordering::SeqCst);
            let mut released = self.released.lock().unwrap();
            while !*released {
                released = self.unblock.wait(released).unwrap();
            }
        }
    }

    #[derive(Default)]
    struct FakeState {
        next_id: u32,
        inputs: HashMap<InputId, CameraPosition>,
        /// Position becomes known once a connection (or automatic
        /// attach) ties the output to an input.
        outputs: HashMap<OutputId, Option<CameraPosition>>,
        previews: HashMap<PreviewId, CameraPosition>,
        connections: HashMap<ConnectionId, ConnectionRecord>,
        session_running: bool,
        captures: Vec<CameraPosition>,
    }

    pub struct FakePlatform {
        pub authorization: Authorization,
        pub multi_cam: bool,
        pub front_present: bool,
        pub back_present: bool,
        pub fail_manual_inputs: bool,
        pub fail_manual_outputs: bool,
        pub fail_photo_connections: bool,
        pub fail_automatic_inputs: bool,
        pub fail_start: bool,
        pub fail_capture_for: Option<CameraPosition>,
        pub capture_gate: Option<Arc<CaptureGate>>,
        state: Mutex<FakeState>,
    }

    impl FakePlatform {
        /// Multi-cam capable device with both cameras present.
        pub fn dual() -> Self {
            Self {
                authorization: Authorization::Granted,
                multi_cam: true,
                front_present: true,
                back_present: true,
                fail_manual_inputs: false,
                fail_manual_outputs: false,
                fail_photo_connections: false,
                fail_automatic_inputs: false,
                fail_start: false,
                fail_capture_for: None,
                capture_gate: None,
                state: Mutex::new(FakeState::default()),
            }
        }

        /// Single-camera device (no multi-cam support, no front camera).
        pub fn single_only() -> Self {
            Self {
                multi_cam: false,
                front_present: false,
                ..Self::dual()
            }
        }

        fn next_id(state: &mut FakeState) -> u32 {
            state.next_id += 1;
            state.next_id
        }

        /// Counts of (inputs, outputs, previews, connections) still attached.
        pub fn live_ids(&self) -> (usize, usize, usize, usize) {
            let state = self.state.lock().unwrap();
            (
                state.inputs.len(),
                state.outputs.len(),
                state.previews.len(),
                state.connections.len(),
            )
        }

        pub fn is_session_running(&self) -> bool {
            self.state.lock().unwrap().session_running
        }

        pub fn capture_count(&self, position: CameraPosition) -> usize {
            self.state
                .lock()
                .unwrap()
                .captures
                .iter()
                .filter(|p| **p == position)
                .count()
        }

        pub fn connection_records(&self) -> Vec<ConnectionRecord> {
            self.state
                .lock()
                .unwrap()
                .connections
                .values()
                .cloned()
                .collect()
        }

        /// A recognizable frame whose first byte encodes the position.
        pub fn frame_for(position: CameraPosition) -> RawFrame {
            let marker = match position {
                CameraPosition::Front => 0x10,
                CameraPosition::Back => 0x20,
            };
            RawFrame {
                width: 2,
                height: 2,
                rgba: vec![marker; 16],
            }
        }
    }

    impl CameraPlatform for FakePlatform {
        fn authorization(&self) -> Authorization {
            self.authorization
        }

        fn supports_multi_cam(&self) -> bool {
            self.multi_cam
        }

        fn resolve_device(&self, position: CameraPosition) -> Result<CameraDevice, CameraError> {
            let present = match position {
                CameraPosition::Front => self.front_present,
                CameraPosition::Back => self.back_present,
            };
            if !present {
                return Err(CameraError::DeviceUnavailable(position));
            }
            Ok(CameraDevice {
                id: format!("fake-{}", position),
                position,
                model: "Fake Camera".to_string(),
            })
        }

        fn add_input(
            &self,
            device: &CameraDevice,
            mode: WiringMode,
        ) -> Result<InputId, CameraError> {
            if mode == WiringMode::Manual && self.fail_manual_inputs {
                return Err(CameraError::ConfigurationFailed(
                    "input rejected by session".to_string(),
                ));
            }
            if mode == WiringMode::Automatic && self.fail_automatic_inputs {
                return Err(CameraError::ConfigurationFailed(
                    "input rejected by session".to_string(),
                ));
            }
            let mut state = self.state.lock().unwrap();
            let id = InputId(Self::next_id(&mut state));
            state.inputs.insert(id, device.position);

            // Automatic attach ties any position-less outputs to this
            // input, mimicking default connection formation.
            if mode == WiringMode::Automatic {
                let position = device.position;
                for slot in state.outputs.values_mut() {
                    if slot.is_none() {
                        *slot = Some(position);
                    }
                }
            }
            Ok(id)
        }

        fn remove_input(&self, input: InputId) {
            self.state.lock().unwrap().inputs.remove(&input);
        }

        fn add_photo_output(&self, mode: WiringMode) -> Result<OutputId, CameraError> {
            if mode == WiringMode::Manual && self.fail_manual_outputs {
                return Err(CameraError::ConfigurationFailed(
                    "output rejected by session".to_string(),
                ));
            }
            let mut state = self.state.lock().unwrap();
            let id = OutputId(Self::next_id(&mut state));
            let position = if mode == WiringMode::Automatic {
                // Adopt the position of an already attached input.
                state.inputs.values().next().copied()
            } else {
                None
            };
            state.outputs.insert(id, position);
            Ok(id)
        }

        fn remove_output(&self, output: OutputId) {
            self.state.lock().unwrap().outputs.remove(&output);
        }

        fn add_preview(&self, position: CameraPosition) -> Result<PreviewId, CameraError> {
            let mut state = self.state.lock().unwrap();
            let id = PreviewId(Self::next_id(&mut state));
            state.previews.insert(id, position);
            Ok(id)
        }

        fn remove_preview(&self, preview: PreviewId) {
            self.state.lock().unwrap().previews.remove(&preview);
        }

        fn connect_output(
            &self,
            input: InputId,
            output: OutputId,
        ) -> Result<ConnectionId, CameraError> {
            if self.fail_photo_connections {
                return Err(CameraError::ConfigurationFailed(
                    "connection refused".to_string(),
                ));
            }
            let mut state = self.state.lock().unwrap();
            let position = state.inputs.get(&input).copied();
            if let Some(slot) = state.outputs.get_mut(&output) {
                *slot = position;
            }
            let id = ConnectionId(Self::next_id(&mut state));
            state.connections.insert(
                id,
                ConnectionRecord {
                    from: input,
                    target: ConnectTarget::Output(output),
                    orientation: None,
                },
            );
            Ok(id)
        }

        fn connect_preview(
            &self,
            input: InputId,
            preview: PreviewId,
            orientation: Option<VideoOrientation>,
        ) -> Result<ConnectionId, CameraError> {
            let mut state = self.state.lock().unwrap();
            let id = ConnectionId(Self::next_id(&mut state));
            state.connections.insert(
                id,
                ConnectionRecord {
                    from: input,
                    target: ConnectTarget::Preview(preview),
                    orientation,
                },
            );
            Ok(id)
        }

        fn remove_connection(&self, connection: ConnectionId) {
            self.state.lock().unwrap().connections.remove(&connection);
        }

        fn start_session(&self) -> Result<(), CameraError> {
            if self.fail_start {
                return Err(CameraError::ConfigurationFailed(
                    "session failed to start".to_string(),
                ));
            }
            self.state.lock().unwrap().session_running = true;
            Ok(())
        }

        fn stop_session(&self) {
            self.state.lock().unwrap().session_running = false;
        }

        fn capture_still(&self, output: OutputId) -> Result<RawFrame, CameraError> {
            // A parked capture must not hold the state lock.
            if let Some(gate) = &self.capture_gate {
                gate.hold();
            }

            let position = {
                let state = self.state.lock().unwrap();
                match state.outputs.get(&output) {
                    Some(Some(position)) => *position,
                    Some(None) => {
                        return Err(CameraError::CaptureFailed(
                            "output has no connection".to_string(),
                        ))
                    }
                    None => {
                        return Err(CameraError::CaptureFailed("unknown output".to_string()))
                    }
                }
            };

            if self.fail_capture_for == Some(position) {
                return Err(CameraError::CaptureFailed(format!(
                    "{} capture aborted",
                    position
                )));
            }

            let mut state = self.state.lock().unwrap();
            state.captures.push(position);
            Ok(FakePlatform::frame_for(position))
        }
    }
}
