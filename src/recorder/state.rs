//! Recording state management
//!
//! Defines the recording state machine and the coordinator settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Current state of the recording system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    Idle,
    /// Currently recording
    Recording,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Settings for the recording coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSettings {
    /// Directory finished recordings are stored in
    pub storage_dir: PathBuf,

    /// Movie container extension, without the dot
    pub container_ext: String,

    /// How long a requested finalization may take before the attempt is
    /// treated as failed and the coordinator returns to Idle
    pub finalize_timeout: Duration,
}

impl RecorderSettings {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            container_ext: "mp4".to_string(),
            finalize_timeout: Duration::from_secs(10),
        }
    }

    pub fn finalize_timeout(mut self, timeout: Duration) -> Self {
        self.finalize_timeout = timeout;
        self
    }
}
