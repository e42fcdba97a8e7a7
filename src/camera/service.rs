//! Camera service actor
//!
//! Owns the capture session and serializes every operation against it.
//! Commands arrive on an mpsc channel and are handled one at a time, so
//! a start queued behind a stop always observes the completed teardown.
//! Captures run as background tasks (the loop stays responsive); a flag
//! keeps them one at a time, and a re-entrant request resolves to an
//! empty pair instead of queueing.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::Config;

use super::coordinator;
use super::feedback::CaptureFeedback;
use super::platform::CameraPlatform;
use super::session::CaptureSession;
use super::types::{
    Authorization, CameraError, CameraPosition, CapturedPair, PreviewHandle, SessionState,
};
use super::{CameraCommand, CameraStatus};

pub struct CameraService {
    platform: Arc<dyn CameraPlatform>,
    feedback: Arc<dyn CaptureFeedback>,
    session: CaptureSession,
    cmd_rx: mpsc::Receiver<CameraCommand>,
    status_tx: broadcast::Sender<CameraStatus>,
    authorized: bool,
    capture_in_flight: bool,
}

impl CameraService {
    pub fn new(
        platform: Arc<dyn CameraPlatform>,
        feedback: Arc<dyn CaptureFeedback>,
        config: &Config,
        cmd_rx: mpsc::Receiver<CameraCommand>,
        status_tx: broadcast::Sender<CameraStatus>,
    ) -> Self {
        let session = CaptureSession::new(platform.clone(), config.camera.prefer_dual);
        Self {
            platform,
            feedback,
            session,
            cmd_rx,
            status_tx,
            authorized: false,
            capture_in_flight: false,
        }
    }

    /// Run the service main loop until shutdown.
    pub async fn run(&mut self) {
        info!("Camera service starting");

        self.authorized = self.platform.authorization() != Authorization::Denied;
        if !self.authorized {
            warn!("Camera access denied");
            let _ = self.status_tx.send(CameraStatus::Unauthorized);
        } else {
            self.session.warm_device_cache().await;
            let _ = self.status_tx.send(CameraStatus::Idle);
        }

        let (capture_done_tx, mut capture_done_rx) = mpsc::channel::<()>(1);

        loop {
            tokio::select! {
                Some(cmd) = self.cmd_rx.recv() => {
                    match cmd {
                        CameraCommand::Configure { reply } => {
                            let result = self.configure();
                            let _ = reply.send(result);
                        }
                        CameraCommand::Start { reply } => {
                            let result = self.start();
                            let _ = reply.send(result);
                        }
                        CameraCommand::Stop { reply } => {
                            self.stop();
                            let _ = reply.send(());
                        }
                        CameraCommand::Capture { reply } => {
                            self.begin_capture(reply, capture_done_tx.clone());
                        }
                        CameraCommand::Preview { position, reply } => {
                            let _ = reply.send(self.session.preview(position));
                        }
                        CameraCommand::Shutdown => {
                            info!("Shutdown command received");
                            self.stop();
                            break;
                        }
                    }
                }

                Some(()) = capture_done_rx.recv() => {
                    self.capture_in_flight = false;
                }

                else => break,
            }
        }

        info!("Camera service stopped");
    }

    fn configure(&mut self) -> Result<(), CameraError> {
        if !self.authorized {
            return Err(CameraError::AuthorizationDenied);
        }
        if self.session.state() != SessionState::Unconfigured {
            return Ok(());
        }

        let _ = self.status_tx.send(CameraStatus::Configuring);
        match self.session.configure() {
            Ok(()) => {
                let _ = self.status_tx.send(CameraStatus::Ready {
                    dual: self.session.is_dual(),
                });
                Ok(())
            }
            Err(e) => {
                let _ = self.status_tx.send(CameraStatus::Error(e.to_string()));
                Err(e)
            }
        }
    }

    fn start(&mut self) -> Result<(), CameraError> {
        if !self.authorized {
            return Err(CameraError::AuthorizationDenied);
        }
        if self.session.state() == SessionState::Running {
            return Ok(());
        }

        match self.session.start() {
            Ok(()) => {
                let _ = self.status_tx.send(CameraStatus::Running {
                    dual: self.session.is_dual(),
                });
                Ok(())
            }
            Err(e) => {
                let _ = self.status_tx.send(CameraStatus::Error(e.to_string()));
                Err(e)
            }
        }
    }

    fn stop(&mut self) {
        if self.session.state() == SessionState::Unconfigured {
            return;
        }

        let _ = self.status_tx.send(CameraStatus::Stopping);
        self.session.stop();
        let _ = self.status_tx.send(CameraStatus::Idle);
    }

    fn begin_capture(
        &mut self,
        reply: oneshot::Sender<CapturedPair>,
        done_tx: mpsc::Sender<()>,
    ) {
        if self.session.state() != SessionState::Running {
            debug!("Capture requested while not running");
            let _ = reply.send(CapturedPair::empty());
            return;
        }
        if self.capture_in_flight {
            debug!("Capture already in flight");
            let _ = reply.send(CapturedPair::empty());
            return;
        }

        self.capture_in_flight = true;
        let platform = self.platform.clone();
        let feedback = self.feedback.clone();
        let front = self.session.photo_output(CameraPosition::Front);
        let back = self.session.photo_output(CameraPosition::Back);

        tokio::spawn(async move {
            let pair = coordinator::capture_pair(platform, front, back, feedback).await;
            let _ = reply.send(pair);
            let _ = done_tx.send(()).await;
        });
    }
}

/// Cloneable front end for the camera service.
#[derive(Clone)]
pub struct CameraHandle {
    cmd_tx: mpsc::Sender<CameraCommand>,
    status_tx: broadcast::Sender<CameraStatus>,
}

impl CameraHandle {
    /// Build the session topology ahead of start.
    pub async fn configure(&self) -> Result<(), CameraError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(CameraCommand::Configure { reply: tx })
            .await
            .map_err(|_| CameraError::ServiceClosed)?;
        rx.await.map_err(|_| CameraError::ServiceClosed)?
    }

    /// Begin streaming.
    pub async fn start(&self) -> Result<(), CameraError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(CameraCommand::Start { reply: tx })
            .await
            .map_err(|_| CameraError::ServiceClosed)?;
        rx.await.map_err(|_| CameraError::ServiceClosed)?
    }

    /// Stop streaming and tear down. Waits for the teardown to finish.
    pub async fn stop(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(CameraCommand::Stop { reply: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    /// Fire a simultaneous capture. Resolves to an empty pair when the
    /// session is not running, a capture is already in flight, or the
    /// service is gone.
    pub async fn capture(&self) -> CapturedPair {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(CameraCommand::Capture { reply: tx })
            .await
            .is_err()
        {
            return CapturedPair::empty();
        }
        rx.await.unwrap_or_else(|_| CapturedPair::empty())
    }

    /// Preview handle for one camera, if the topology has it.
    pub async fn preview(&self, position: CameraPosition) -> Option<PreviewHandle> {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(CameraCommand::Preview {
                position,
                reply: tx,
            })
            .await
            .is_err()
        {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Subscribe to service status updates.
    pub fn status(&self) -> broadcast::Receiver<CameraStatus> {
        self.status_tx.subscribe()
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(CameraCommand::Shutdown).await;
    }
}

/// Create command and status channels for the camera service.
pub fn create_camera_channels() -> (
    mpsc::Sender<CameraCommand>,
    mpsc::Receiver<CameraCommand>,
    broadcast::Sender<CameraStatus>,
    broadcast::Receiver<CameraStatus>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (status_tx, status_rx) = broadcast::channel(16);
    (cmd_tx, cmd_rx, status_tx, status_rx)
}

/// Spawn a camera service on the current runtime and return its handle.
pub fn spawn_camera_service(
    platform: Arc<dyn CameraPlatform>,
    feedback: Arc<dyn CaptureFeedback>,
    config: &Config,
) -> CameraHandle {
    let (cmd_tx, cmd_rx, status_tx, _status_rx) = create_camera_channels();
    let mut service = CameraService::new(platform, feedback, config, cmd_rx, status_tx.clone());
    tokio::spawn(async move { service.run().await });
    CameraHandle { cmd_tx, status_tx }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::feedback::recording::RecordingFeedback;
    use super::super::feedback::NoFeedback;
    use super::super::platform::fake::{CaptureGate, FakePlatform};
    use super::super::types::CameraPosition;
    use super::*;

    fn spawn_over(platform: Arc<FakePlatform>) -> CameraHandle {
        spawn_camera_service(platform, Arc::new(NoFeedback), &Config::default())
    }

    #[tokio::test]
    async fn full_cycle_configure_start_capture_stop() {
        let platform = Arc::new(FakePlatform::dual());
        let handle = spawn_over(platform.clone());

        handle.configure().await.expect("configure succeeds");
        assert!(!platform.is_session_running());

        handle.start().await.expect("start succeeds");
        assert!(platform.is_session_running());

        let pair = handle.capture().await;
        assert!(pair.front.is_some());
        assert!(pair.back.is_some());

        handle.stop().await;
        assert!(!platform.is_session_running());
        assert_eq!(platform.live_ids(), (0, 0, 0, 0));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn capture_while_idle_returns_empty_pair() {
        let platform = Arc::new(FakePlatform::dual());
        let handle = spawn_over(platform.clone());

        let pair = handle.capture().await;
        assert!(pair.is_empty());
        assert_eq!(platform.capture_count(CameraPosition::Back), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn capture_after_stop_returns_empty_pair() {
        let platform = Arc::new(FakePlatform::dual());
        let handle = spawn_over(platform.clone());

        handle.start().await.expect("start succeeds");
        handle.stop().await;

        let pair = handle.capture().await;
        assert!(pair.is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn capture_while_one_is_in_flight_returns_empty_pair() {
        let gate = CaptureGate::new();
        let mut fake = FakePlatform::single_only();
        fake.capture_gate = Some(gate.clone());
        let platform = Arc::new(fake);
        let handle = spawn_over(platform.clone());

        handle.start().await.expect("start succeeds");

        // Park the first capture inside the platform.
        let first = tokio::spawn({
            let handle = handle.clone();
            async move { handle.capture().await }
        });
        tokio::time::timeout(Duration::from_secs(5), async {
            while gate.entered() == 0 {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("first capture reaches the platform");

        // The second request is refused without reaching the platform.
        let second = handle.capture().await;
        assert!(second.is_empty());
        assert_eq!(gate.entered(), 1);

        gate.release();
        let pair = first.await.expect("capture task completes");
        assert!(pair.back.is_some());

        // Captures are accepted again once the first one drains.
        let third = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let pair = handle.capture().await;
                if !pair.is_empty() {
                    break pair;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("capture accepted after the first completes");
        assert!(third.back.is_some());
        assert_eq!(platform.capture_count(CameraPosition::Back), 2);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn capture_after_shutdown_returns_empty_pair() {
        let platform = Arc::new(FakePlatform::dual());
        let handle = spawn_over(platform.clone());

        handle.start().await.expect("start succeeds");
        assert!(platform.is_session_running());

        handle.shutdown().await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while platform.is_session_running() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("shutdown tears the session down");

        let pair = handle.capture().await;
        assert!(pair.is_empty());
        assert_eq!(platform.capture_count(CameraPosition::Back), 0);
    }

    #[tokio::test]
    async fn denied_authorization_blocks_configuration() {
        let mut fake = FakePlatform::dual();
        fake.authorization = Authorization::Denied;
        let platform = Arc::new(fake);
        let handle = spawn_over(platform.clone());

        let err = handle.configure().await.expect_err("configure must fail");
        assert!(matches!(err, CameraError::AuthorizationDenied));
        let err = handle.start().await.expect_err("start must fail");
        assert!(matches!(err, CameraError::AuthorizationDenied));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn single_camera_session_captures_back_only() {
        let platform = Arc::new(FakePlatform::single_only());
        let handle = spawn_over(platform.clone());

        handle.start().await.expect("start succeeds");
        let pair = handle.capture().await;
        assert!(pair.front.is_none());
        assert!(pair.back.is_some());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn preview_handles_carry_mirroring_metadata() {
        let platform = Arc::new(FakePlatform::dual());
        let handle = spawn_over(platform.clone());

        handle.configure().await.expect("configure succeeds");

        let front = handle
            .preview(CameraPosition::Front)
            .await
            .expect("front preview exists");
        assert!(front.mirrored);

        let back = handle
            .preview(CameraPosition::Back)
            .await
            .expect("back preview exists");
        assert!(!back.mirrored);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn status_stream_reports_transitions() {
        let platform = Arc::new(FakePlatform::dual());
        let (cmd_tx, cmd_rx, status_tx, mut status_rx) = create_camera_channels();
        let mut service = CameraService::new(
            platform.clone(),
            Arc::new(NoFeedback),
            &Config::default(),
            cmd_rx,
            status_tx.clone(),
        );
        tokio::spawn(async move { service.run().await });
        let handle = CameraHandle { cmd_tx, status_tx };

        handle.start().await.expect("start succeeds");
        handle.stop().await;
        handle.shutdown().await;

        let mut saw_running = false;
        let mut saw_idle_after_running = false;
        while let Ok(status) = status_rx.try_recv() {
            match status {
                CameraStatus::Running { dual } => {
                    assert!(dual);
                    saw_running = true;
                }
                CameraStatus::Idle if saw_running => saw_idle_after_running = true,
                _ => {}
            }
        }
        assert!(saw_running);
        assert!(saw_idle_after_running);
    }

    #[tokio::test]
    async fn feedback_fires_for_accepted_captures_only() {
        let platform = Arc::new(FakePlatform::dual());
        let feedback = Arc::new(RecordingFeedback::default());
        let handle =
            spawn_camera_service(platform.clone(), feedback.clone(), &Config::default());

        // Rejected: not running yet.
        let _ = handle.capture().await;
        assert_eq!(feedback.started_count(), 0);

        handle.start().await.expect("start succeeds");
        let _ = handle.capture().await;
        assert_eq!(feedback.started_count(), 1);

        handle.shutdown().await;
    }
}
