//! In-memory capture backend for tests.
//!
//! Behaves like the hardware seam without touching any device: `apply`
//! replaces the attached inputs as a unit, `begin_writing` hands out the
//! per-attempt completion channel, and `finish_writing` resolves it
//! according to the configured [`FinishMode`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::traits::{
    AccessStatus, AudioDeviceInfo, CameraFacing, CaptureBackend, CaptureError, CaptureResult,
    CameraInfo, Resolution, SessionConfig, WriteOutcome,
};

/// How `finish_writing` resolves the in-flight attempt.
#[derive(Debug, Clone)]
pub enum FinishMode {
    /// Write a small movie payload to the target and complete successfully
    Succeed,
    /// Complete with the given failure reason
    Fail(String),
    /// Never complete (exercises the finalization timeout)
    Stall,
}

struct ActiveWrite {
    target: PathBuf,
    done: oneshot::Sender<WriteOutcome>,
}

pub struct FakeBackend {
    cameras: Vec<(CameraFacing, CameraInfo)>,
    access: Mutex<AccessStatus>,
    finish_mode: Mutex<FinishMode>,
    reject_apply: AtomicBool,

    inputs: Mutex<Vec<String>>,
    running: AtomicBool,
    halt_count: AtomicUsize,
    takes: AtomicUsize,
    active: Mutex<Option<ActiveWrite>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::with_cameras(vec![CameraFacing::Front, CameraFacing::Back])
    }

    /// A device with no rear camera.
    pub fn front_only() -> Self {
        Self::with_cameras(vec![CameraFacing::Front])
    }

    fn with_cameras(facings: Vec<CameraFacing>) -> Self {
        let cameras = facings
            .into_iter()
            .map(|facing| {
                let id = format!("{:?}-camera", facing).to_lowercase();
                (
                    facing,
                    CameraInfo {
                        id: id.clone(),
                        name: id,
                        supported_resolutions: vec![Resolution {
                            width: 1280,
                            height: 720,
                        }],
                    },
                )
            })
            .collect();

        Self {
            cameras,
            access: Mutex::new(AccessStatus::Granted),
            finish_mode: Mutex::new(FinishMode::Succeed),
            reject_apply: AtomicBool::new(false),
            inputs: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            halt_count: AtomicUsize::new(0),
            takes: AtomicUsize::new(0),
            active: Mutex::new(None),
        }
    }

    pub fn set_access(&self, access: AccessStatus) {
        *self.access.lock() = access;
    }

    pub fn set_finish_mode(&self, mode: FinishMode) {
        *self.finish_mode.lock() = mode;
    }

    /// Reject the next `apply` proposal, then behave normally again.
    pub fn reject_next_apply(&self) {
        self.reject_apply.store(true, Ordering::SeqCst);
    }

    /// Fail the in-flight attempt without finalization being requested,
    /// as the hardware does on a mid-recording error.
    pub fn fail_in_flight(&self, reason: &str) {
        if let Some(active) = self.active.lock().take() {
            let _ = active
                .done
                .send(WriteOutcome::failed(active.target, reason));
        }
    }

    pub fn video_input_count(&self) -> usize {
        self.inputs
            .lock()
            .iter()
            .filter(|input| input.starts_with("video:"))
            .count()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn halt_count(&self) -> usize {
        self.halt_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureBackend for FakeBackend {
    fn cameras(&self) -> Vec<CameraInfo> {
        self.cameras.iter().map(|(_, info)| info.clone()).collect()
    }

    fn camera_for(&self, facing: CameraFacing) -> Option<CameraInfo> {
        self.cameras
            .iter()
            .find(|(f, _)| *f == facing)
            .map(|(_, info)| info.clone())
    }

    fn default_microphone(&self) -> Option<AudioDeviceInfo> {
        Some(AudioDeviceInfo {
            id: "fake-mic".to_string(),
            name: "Fake Microphone".to_string(),
            is_default: true,
        })
    }

    async fn request_access(&self) -> AccessStatus {
        *self.access.lock()
    }

    async fn apply(&self, config: &SessionConfig) -> CaptureResult<()> {
        if self.reject_apply.swap(false, Ordering::SeqCst) {
            return Err(CaptureError::ConfigurationRejected(
                "backend refused the proposal".to_string(),
            ));
        }

        // Teardown and re-add as one unit, like a begin/commit bracket.
        let mut inputs = vec![format!("video:{}", config.video.device_id)];
        if let Some(audio) = &config.audio {
            inputs.push(format!("audio:{}", audio.device_id));
        }
        *self.inputs.lock() = inputs;
        Ok(())
    }

    async fn run(&self) -> CaptureResult<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.halt_count.fetch_add(1, Ordering::SeqCst);
    }

    async fn begin_writing(
        &self,
        target: &Path,
    ) -> CaptureResult<oneshot::Receiver<WriteOutcome>> {
        let (done, receiver) = oneshot::channel();
        *self.active.lock() = Some(ActiveWrite {
            target: target.to_path_buf(),
            done,
        });
        Ok(receiver)
    }

    async fn finish_writing(&self) -> CaptureResult<()> {
        let mode = self.finish_mode.lock().clone();

        if matches!(mode, FinishMode::Stall) {
            // Keep the attempt in flight; the completion never arrives.
            return Ok(());
        }

        let Some(active) = self.active.lock().take() else {
            return Err(CaptureError::Backend("no write in flight".to_string()));
        };

        match mode {
            FinishMode::Succeed => {
                let take = self.takes.fetch_add(1, Ordering::SeqCst) + 1;
                std::fs::write(&active.target, format!("take-{take}"))?;
                let _ = active.done.send(WriteOutcome::success(active.target));
            }
            FinishMode::Fail(reason) => {
                let _ = active
                    .done
                    .send(WriteOutcome::failed(active.target, reason));
            }
            FinishMode::Stall => unreachable!(),
        }
        Ok(())
    }
}
