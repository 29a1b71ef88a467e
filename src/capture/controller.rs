//! Camera session controller
//!
//! Owns the single hardware capture session. Every configuration mutation
//! goes through the backend's atomic propose/apply, so a caller never
//! observes a half-configured session: after any operation the session is
//! either fully reconfigured or exactly as it was.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::traits::{
    AccessStatus, AudioInput, CameraFacing, CaptureBackend, CaptureError, CaptureFormat,
    CaptureResult, SessionConfig, VideoInput, WriteOutcome,
};

/// Current state of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Session is not running
    Idle,
    /// A configuration proposal is being applied
    Configuring,
    /// Session is streaming
    Running,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Exclusive owner of the capture session.
pub struct CaptureSessionController {
    backend: Arc<dyn CaptureBackend>,

    state: RwLock<SessionState>,

    /// The configuration currently in effect, if any
    committed: RwLock<Option<SessionConfig>>,

    facing: RwLock<CameraFacing>,

    format: CaptureFormat,
}

impl CaptureSessionController {
    /// Create a controller over `backend` with the default capture format.
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self::with_format(backend, CaptureFormat::default())
    }

    /// Create a controller with an explicit capture format.
    pub fn with_format(backend: Arc<dyn CaptureBackend>, format: CaptureFormat) -> Self {
        Self {
            backend,
            state: RwLock::new(SessionState::Idle),
            committed: RwLock::new(None),
            facing: RwLock::new(CameraFacing::Front),
            format,
        }
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Get the current facing position.
    pub fn facing(&self) -> CameraFacing {
        *self.facing.read()
    }

    /// Get the configuration currently in effect.
    pub fn current_config(&self) -> Option<SessionConfig> {
        self.committed.read().clone()
    }

    /// Reconfigure the session for `facing`.
    ///
    /// Tears down the existing inputs and proposes a fresh configuration:
    /// one video input for the requested facing position plus the default
    /// microphone when one is present. On rejection the prior configuration
    /// stays committed and the error is returned.
    pub async fn configure(&self, facing: CameraFacing) -> CaptureResult<()> {
        let prior = {
            let mut state = self.state.write();
            let prior = *state;
            *state = SessionState::Configuring;
            prior
        };

        let result = self.reconfigure(facing).await;

        // Configuring is transient; the prior run state is restored whether
        // the proposal was applied or rejected.
        *self.state.write() = prior;

        result
    }

    async fn reconfigure(&self, facing: CameraFacing) -> CaptureResult<()> {
        let camera = self
            .backend
            .camera_for(facing)
            .ok_or(CaptureError::DeviceUnavailable(facing))?;

        // A missing microphone is not fatal; the session records video-only.
        let audio = self.backend.default_microphone().map(|device| AudioInput {
            device_id: device.id,
            name: device.name,
        });
        if audio.is_none() {
            tracing::warn!("No audio input device found; recording video-only");
        }

        let proposal = SessionConfig {
            video: VideoInput {
                device_id: camera.id,
                name: camera.name,
                facing,
            },
            audio,
            format: self.format,
        };

        self.backend.apply(&proposal).await?;

        *self.committed.write() = Some(proposal);
        *self.facing.write() = facing;

        tracing::info!("Capture session configured for {:?} camera", facing);
        Ok(())
    }

    /// Start the session.
    ///
    /// Requests camera and microphone access first; the session only runs
    /// after access is granted. Denial leaves the session Idle and returns
    /// `PermissionDenied`. Starting a running session is a no-op.
    pub async fn start(&self) -> CaptureResult<()> {
        if *self.state.read() == SessionState::Running {
            return Ok(());
        }

        if self.committed.read().is_none() {
            let facing = *self.facing.read();
            self.configure(facing).await?;
        }

        match self.backend.request_access().await {
            AccessStatus::Granted => {}
            AccessStatus::Denied => {
                tracing::warn!("Camera or microphone access denied");
                return Err(CaptureError::PermissionDenied);
            }
        }

        self.backend.run().await?;
        *self.state.write() = SessionState::Running;

        tracing::info!("Capture session running");
        Ok(())
    }

    /// Stop the session. Stopping an Idle session is a no-op.
    pub async fn stop(&self) {
        if *self.state.read() == SessionState::Idle {
            return;
        }

        self.backend.halt().await;
        *self.state.write() = SessionState::Idle;

        tracing::info!("Capture session stopped");
    }

    /// Flip the facing position and reconfigure.
    ///
    /// The session returns to its prior run state; at no point are two
    /// video inputs attached.
    pub async fn switch_camera(&self) -> CaptureResult<()> {
        let next = self.facing.read().flipped();
        self.configure(next).await
    }

    /// Begin writing the session to `target`.
    pub async fn begin_writing(
        &self,
        target: &Path,
    ) -> CaptureResult<oneshot::Receiver<WriteOutcome>> {
        if *self.state.read() != SessionState::Running {
            return Err(CaptureError::NotRunning);
        }
        self.backend.begin_writing(target).await
    }

    /// Request finalization of the in-flight write.
    pub async fn finish_writing(&self) -> CaptureResult<()> {
        self.backend.finish_writing().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fake::FakeBackend;

    fn fixture() -> (Arc<FakeBackend>, CaptureSessionController) {
        let fake = Arc::new(FakeBackend::new());
        let controller = CaptureSessionController::new(fake.clone());
        (fake, controller)
    }

    #[tokio::test]
    async fn configure_twice_keeps_single_video_input() {
        let (fake, controller) = fixture();

        controller.configure(CameraFacing::Front).await.unwrap();
        controller.configure(CameraFacing::Front).await.unwrap();

        assert_eq!(fake.video_input_count(), 1);
    }

    #[tokio::test]
    async fn configure_missing_device_reports_unavailable_and_keeps_prior() {
        let fake = Arc::new(FakeBackend::front_only());
        let controller = CaptureSessionController::new(fake.clone());

        controller.configure(CameraFacing::Front).await.unwrap();
        let before = controller.current_config().unwrap();

        let err = controller.configure(CameraFacing::Back).await.unwrap_err();
        assert!(matches!(
            err,
            CaptureError::DeviceUnavailable(CameraFacing::Back)
        ));

        let after = controller.current_config().unwrap();
        assert_eq!(after.video.device_id, before.video.device_id);
        assert_eq!(controller.facing(), CameraFacing::Front);
        assert_eq!(fake.video_input_count(), 1);
    }

    #[tokio::test]
    async fn rejected_proposal_keeps_prior_config() {
        let (fake, controller) = fixture();

        controller.configure(CameraFacing::Front).await.unwrap();
        let before = controller.current_config().unwrap();

        fake.reject_next_apply();
        let err = controller.configure(CameraFacing::Back).await.unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationRejected(_)));

        let after = controller.current_config().unwrap();
        assert_eq!(after.video.facing, before.video.facing);
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn denied_access_leaves_session_idle() {
        let (fake, controller) = fixture();
        fake.set_access(AccessStatus::Denied);

        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, CaptureError::PermissionDenied));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(!fake.is_running());
    }

    #[tokio::test]
    async fn stop_on_idle_session_is_noop() {
        let (fake, controller) = fixture();

        controller.stop().await;

        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(fake.halt_count(), 0);
    }

    #[tokio::test]
    async fn switch_camera_flips_facing_with_single_video_input() {
        let (fake, controller) = fixture();

        controller.start().await.unwrap();
        assert_eq!(controller.facing(), CameraFacing::Front);

        controller.switch_camera().await.unwrap();

        assert_eq!(controller.facing(), CameraFacing::Back);
        assert_eq!(controller.state(), SessionState::Running);
        assert_eq!(fake.video_input_count(), 1);
    }

    #[tokio::test]
    async fn begin_writing_requires_running_session() {
        let (_fake, controller) = fixture();

        let err = controller
            .begin_writing(Path::new("/tmp/never-written.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::NotRunning));
    }
}
