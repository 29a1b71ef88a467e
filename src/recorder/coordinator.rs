//! Recording coordinator
//!
//! Tracks the single in-flight recording, hands the capture session a fresh
//! temporary target per attempt, and relocates the finished movie into its
//! date-keyed archive slot.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::state::{RecorderSettings, RecordingState};
use crate::archive::VideoArchive;
use crate::capture::{CaptureError, CaptureSessionController, WriteOutcome};

/// Events emitted during recording
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    /// Recording started
    Started,
    /// Recording finished and was stored at the contained location
    Finished(PathBuf),
    /// Recording failed; the temporary file was discarded
    Failed(String),
}

/// Errors from the recording layer
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error("finalization failed: {0}")]
    FinalizationFailed(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for recorder operations
pub type RecorderResult<T> = Result<T, RecorderError>;

/// Coordinates recording attempts over the capture session.
///
/// At most one recording is in flight at any time, and each attempt
/// registers exactly one completion handler; the state machine makes a
/// second registration impossible. Completion outcomes are published on a
/// broadcast channel so any consumer (UI shell, tests) can observe them
/// from its own context.
pub struct RecordingCoordinator {
    controller: Arc<CaptureSessionController>,
    archive: Arc<VideoArchive>,

    state: Arc<RwLock<RecordingState>>,

    /// Arms the finalization deadline of the in-flight attempt
    finish_tx: Arc<Mutex<Option<mpsc::Sender<()>>>>,

    started_at: Arc<RwLock<Option<Instant>>>,

    event_tx: broadcast::Sender<RecordingEvent>,

    finalize_timeout: Duration,
}

impl RecordingCoordinator {
    /// Create a coordinator writing into the archive named by `settings`.
    pub fn new(
        controller: Arc<CaptureSessionController>,
        settings: RecorderSettings,
    ) -> std::io::Result<Self> {
        let archive =
            VideoArchive::with_extension(&settings.storage_dir, settings.container_ext.clone())?;
        Ok(Self::with_archive(controller, Arc::new(archive), settings))
    }

    /// Create a coordinator over an existing archive.
    pub fn with_archive(
        controller: Arc<CaptureSessionController>,
        archive: Arc<VideoArchive>,
        settings: RecorderSettings,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            controller,
            archive,
            state: Arc::new(RwLock::new(RecordingState::Idle)),
            finish_tx: Arc::new(Mutex::new(None)),
            started_at: Arc::new(RwLock::new(None)),
            event_tx,
            finalize_timeout: settings.finalize_timeout,
        }
    }

    /// Get the current recording state.
    pub fn state(&self) -> RecordingState {
        *self.state.read()
    }

    pub fn is_recording(&self) -> bool {
        self.state() == RecordingState::Recording
    }

    /// The archive finished recordings land in.
    pub fn archive(&self) -> &VideoArchive {
        &self.archive
    }

    /// Subscribe to recording events.
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    /// Elapsed time of the in-flight recording, zero when idle.
    pub fn duration(&self) -> Duration {
        self.started_at
            .read()
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    /// Start a recording attempt.
    ///
    /// Fails with `AlreadyRecording` when one is in progress. Otherwise a
    /// fresh unique temporary target is reserved and the capture session
    /// begins writing to it.
    pub async fn start_recording(&self) -> RecorderResult<()> {
        {
            let mut state = self.state.write();
            if *state == RecordingState::Recording {
                return Err(RecorderError::AlreadyRecording);
            }
            *state = RecordingState::Recording;
        }

        match self.begin_attempt().await {
            Ok(()) => Ok(()),
            Err(e) => {
                *self.state.write() = RecordingState::Idle;
                Err(e)
            }
        }
    }

    async fn begin_attempt(&self) -> RecorderResult<()> {
        let temp = self.archive.temp_target();

        // Reserve the target before the hardware touches it.
        std::fs::write(&temp, [])?;

        let completion = match self.controller.begin_writing(&temp).await {
            Ok(receiver) => receiver,
            Err(e) => {
                self.archive.discard(&temp);
                return Err(e.into());
            }
        };

        let (finish_tx, finish_rx) = mpsc::channel(1);
        *self.finish_tx.lock() = Some(finish_tx);
        *self.started_at.write() = Some(Instant::now());

        tracing::info!("Recording started, writing to {}", temp.display());
        let _ = self.event_tx.send(RecordingEvent::Started);

        self.spawn_completion_handler(completion, finish_rx, temp);
        Ok(())
    }

    /// Request finalization of the in-flight recording.
    ///
    /// Valid only while Recording. The call returns once finalization has
    /// been requested; the outcome arrives as a `Finished` or `Failed`
    /// event when the capture layer delivers its completion.
    pub async fn stop_recording(&self) -> RecorderResult<()> {
        if *self.state.read() != RecordingState::Recording {
            return Err(RecorderError::NotRecording);
        }

        let Some(finish_tx) = self.finish_tx.lock().take() else {
            return Err(RecorderError::NotRecording);
        };

        self.controller.finish_writing().await?;

        // Arm the finalization deadline.
        let _ = finish_tx.send(()).await;

        tracing::info!("Recording stop requested, awaiting finalization");
        Ok(())
    }

    /// One handler per attempt, resolved by the first of: the completion
    /// notification, or the deadline once finalization has been requested.
    fn spawn_completion_handler(
        &self,
        mut completion: oneshot::Receiver<WriteOutcome>,
        mut finish_rx: mpsc::Receiver<()>,
        temp: PathBuf,
    ) {
        let state = self.state.clone();
        let archive = self.archive.clone();
        let event_tx = self.event_tx.clone();
        let finish_slot = self.finish_tx.clone();
        let started_at = self.started_at.clone();
        let deadline = self.finalize_timeout;

        tokio::spawn(async move {
            let received = tokio::select! {
                outcome = &mut completion => Some(outcome),
                _ = finish_rx.recv() => None,
            };

            let received = match received {
                Some(outcome) => Some(outcome),
                // Finalization was requested; the completion must arrive
                // within the deadline.
                None => tokio::time::timeout(deadline, completion).await.ok(),
            };

            let event = match received {
                Some(Ok(WriteOutcome {
                    target,
                    error: None,
                })) => {
                    let today = chrono::Local::now().date_naive();
                    match archive.store(today, &target) {
                        Ok(stored) => RecordingEvent::Finished(stored),
                        Err(e) => {
                            archive.discard(&target);
                            RecordingEvent::Failed(format!("failed to store recording: {e}"))
                        }
                    }
                }
                Some(Ok(WriteOutcome {
                    target,
                    error: Some(reason),
                })) => {
                    archive.discard(&target);
                    RecordingEvent::Failed(
                        RecorderError::FinalizationFailed(reason).to_string(),
                    )
                }
                Some(Err(_)) => {
                    archive.discard(&temp);
                    RecordingEvent::Failed("capture backend dropped the recording".to_string())
                }
                None => {
                    archive.discard(&temp);
                    RecordingEvent::Failed(
                        RecorderError::FinalizationFailed(format!(
                            "no completion within {deadline:?}"
                        ))
                        .to_string(),
                    )
                }
            };

            match &event {
                RecordingEvent::Finished(path) => {
                    tracing::info!("Recording stored at {}", path.display());
                }
                RecordingEvent::Failed(reason) => {
                    tracing::warn!("Recording failed: {}", reason);
                }
                RecordingEvent::Started => {}
            }

            finish_slot.lock().take();
            *started_at.write() = None;
            *state.write() = RecordingState::Idle;
            let _ = event_tx.send(event);
        });
    }
}
