//! Error types and handling
//!
//! Aggregates the module errors into one application-wide type with a
//! stable machine-readable projection for a UI frontend.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthError;
use crate::capture::CaptureError;
use crate::chat::ChatError;
use crate::recorder::RecorderError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error response for a frontend
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

fn capture_code(error: &CaptureError) -> &'static str {
    match error {
        CaptureError::PermissionDenied => "PERMISSION_DENIED",
        CaptureError::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
        CaptureError::ConfigurationRejected(_) => "CONFIGURATION_REJECTED",
        CaptureError::NotRunning => "SESSION_NOT_RUNNING",
        CaptureError::Backend(_) => "CAPTURE_ERROR",
        CaptureError::Io(_) => "IO_ERROR",
    }
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Capture(inner) => capture_code(inner),
            AppError::Recorder(RecorderError::AlreadyRecording) => "ALREADY_RECORDING",
            AppError::Recorder(RecorderError::NotRecording) => "NOT_RECORDING",
            AppError::Recorder(RecorderError::FinalizationFailed(_)) => "FINALIZATION_FAILED",
            AppError::Recorder(RecorderError::Capture(inner)) => capture_code(inner),
            AppError::Recorder(RecorderError::Io(_)) => "IO_ERROR",
            AppError::Chat(_) => "CHAT_ERROR",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CameraFacing;

    #[test]
    fn taxonomy_maps_to_stable_codes() {
        let cases: Vec<(AppError, &str)> = vec![
            (CaptureError::PermissionDenied.into(), "PERMISSION_DENIED"),
            (
                CaptureError::DeviceUnavailable(CameraFacing::Back).into(),
                "DEVICE_UNAVAILABLE",
            ),
            (
                CaptureError::ConfigurationRejected("refused".into()).into(),
                "CONFIGURATION_REJECTED",
            ),
            (RecorderError::AlreadyRecording.into(), "ALREADY_RECORDING"),
            (
                RecorderError::FinalizationFailed("stalled".into()).into(),
                "FINALIZATION_FAILED",
            ),
            (
                RecorderError::Capture(CaptureError::PermissionDenied).into(),
                "PERMISSION_DENIED",
            ),
        ];

        for (error, expected) in cases {
            let response = ErrorResponse::from(error);
            assert_eq!(response.code, expected);
            assert!(!response.message.is_empty());
        }
    }
}
