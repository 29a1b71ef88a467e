//! Camera capture subsystem
//!
//! The session controller, the backend seam it drives, and the native
//! nokhwa/FFmpeg backend.

pub mod audio;
pub mod camera;
pub mod controller;
pub mod traits;

#[cfg(test)]
pub mod fake;

pub use camera::CameraCaptureBackend;
pub use controller::{CaptureSessionController, SessionState};
pub use traits::{
    AccessStatus, AudioDeviceInfo, AudioInput, CameraFacing, CameraInfo, CaptureBackend,
    CaptureError, CaptureFormat, CaptureResult, Resolution, SessionConfig, VideoInput,
    WriteOutcome,
};
