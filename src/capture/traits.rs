//! Capture trait definitions
//!
//! Platform-agnostic types for the camera session and the backend seam the
//! controller drives.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

/// Which way the active camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// Selfie camera, the default for coaching recordings
    Front,

    /// Rear camera
    Back,
}

impl CameraFacing {
    /// The opposite facing position.
    pub fn flipped(self) -> Self {
        match self {
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Back => CameraFacing::Front,
        }
    }
}

/// Information about a camera device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    /// Supported resolutions
    pub supported_resolutions: Vec<Resolution>,
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Information about an audio input device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDeviceInfo {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    /// Whether this is the default input device
    pub is_default: bool,
}

/// Capture format requested from the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
        }
    }
}

/// A video input resolved for a session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInput {
    pub device_id: String,
    pub name: String,
    pub facing: CameraFacing,
}

/// An audio input resolved for a session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInput {
    pub device_id: String,
    pub name: String,
}

/// A complete session configuration proposal.
///
/// Exactly one video input, at most one audio input, and a single
/// movie-file output. The type itself enforces at most one input per media
/// type; backends apply a proposal as a whole or reject it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// The single video input
    pub video: VideoInput,

    /// Optional audio input (recording continues without one)
    pub audio: Option<AudioInput>,

    /// Requested capture format
    pub format: CaptureFormat,
}

/// Result of a camera/microphone access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Granted,
    Denied,
}

/// Completion notification for a recording attempt.
///
/// Delivered exactly once per attempt, whether finalization was requested
/// or the hardware failed mid-recording.
#[derive(Debug)]
pub struct WriteOutcome {
    /// The target the attempt was writing to
    pub target: PathBuf,

    /// `None` on success, otherwise the failure reason
    pub error: Option<String>,
}

impl WriteOutcome {
    pub fn success(target: PathBuf) -> Self {
        Self {
            target,
            error: None,
        }
    }

    pub fn failed(target: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            target,
            error: Some(reason.into()),
        }
    }
}

/// Errors from the capture layer
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera or microphone access denied")]
    PermissionDenied,

    #[error("no camera available for facing position {0:?}")]
    DeviceUnavailable(CameraFacing),

    #[error("session rejected configuration: {0}")]
    ConfigurationRejected(String),

    #[error("capture session is not running")]
    NotRunning,

    #[error("capture backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Backend seam between the session controller and the capture hardware.
///
/// Implementations own the actual devices. All mutation goes through
/// `apply`, which takes a proposal as a whole: after it returns, either the
/// new configuration is in effect or the previous one still is. No
/// intermediate state is observable.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Enumerate cameras known to the backend.
    fn cameras(&self) -> Vec<CameraInfo>;

    /// Resolve the camera for a facing position, if one exists.
    fn camera_for(&self, facing: CameraFacing) -> Option<CameraInfo>;

    /// The default microphone, if one is present.
    fn default_microphone(&self) -> Option<AudioDeviceInfo>;

    /// Request camera and microphone access from the platform.
    async fn request_access(&self) -> AccessStatus;

    /// Atomically apply a proposed session configuration.
    async fn apply(&self, config: &SessionConfig) -> CaptureResult<()>;

    /// Start streaming the applied configuration.
    async fn run(&self) -> CaptureResult<()>;

    /// Stop streaming. Halting an already stopped backend is a no-op.
    async fn halt(&self);

    /// Begin writing the session to `target`.
    ///
    /// Returns the receiver for this attempt's single completion
    /// notification.
    async fn begin_writing(&self, target: &Path)
        -> CaptureResult<oneshot::Receiver<WriteOutcome>>;

    /// Request finalization of the in-flight write.
    ///
    /// Returns once finalization has been requested; the actual completion
    /// arrives on the receiver returned by `begin_writing`.
    async fn finish_writing(&self) -> CaptureResult<()>;
}
