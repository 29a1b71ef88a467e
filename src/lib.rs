//! TalkTrack - Daily self-recording and AI coaching for better communication.
//!
//! This is the core library crate for the TalkTrack application. It owns
//! the camera session lifecycle, recording coordination, the date-keyed
//! video archive, and the remote chat/auth collaborators; the UI shell
//! stays a thin layer on top and observes everything through events and
//! queries.

pub mod archive;
pub mod auth;
pub mod capture;
pub mod chat;
pub mod recorder;
pub mod utils;

pub use archive::VideoArchive;
pub use auth::{AuthClient, AuthError, AuthSession};
pub use capture::{
    CameraCaptureBackend, CameraFacing, CaptureError, CaptureSessionController, SessionState,
};
pub use chat::{ChatClient, ChatError, Conversation};
pub use recorder::{
    RecorderError, RecorderSettings, RecordingCoordinator, RecordingEvent, RecordingState,
};
pub use utils::error::{AppError, AppResult, ErrorResponse};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging for an embedding application.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talktrack=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("TalkTrack core v{}", env!("CARGO_PKG_VERSION"));
}
