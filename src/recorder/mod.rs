//! Recording system module
//!
//! - RecordingCoordinator tracks the single in-flight recording attempt
//! - recording state and settings live in `state`
//!
//! Finished recordings are relocated into the date-keyed archive; outcomes
//! are published as typed events.

pub mod coordinator;
pub mod state;

pub use coordinator::{RecorderError, RecorderResult, RecordingCoordinator, RecordingEvent};
pub use state::{RecorderSettings, RecordingState};
