//! Native camera backend using nokhwa
//!
//! Captures camera frames with nokhwa and encodes them to an H.264 movie
//! file through an FFmpeg child process. Implements the [`CaptureBackend`]
//! seam driven by the session controller.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;

use super::audio;
use super::traits::{
    AccessStatus, AudioDeviceInfo, CameraFacing, CaptureBackend, CaptureError, CaptureResult,
    CameraInfo, Resolution, SessionConfig, WriteOutcome,
};

/// Get list of available cameras
pub fn cameras() -> Vec<CameraInfo> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => cameras
            .into_iter()
            .map(|info| {
                let id = match info.index() {
                    CameraIndex::Index(i) => i.to_string(),
                    CameraIndex::String(s) => s.to_string(),
                };
                let name = info.human_name().to_string();

                // Common resolutions
                let resolutions = vec![
                    Resolution {
                        width: 1920,
                        height: 1080,
                    },
                    Resolution {
                        width: 1280,
                        height: 720,
                    },
                    Resolution {
                        width: 640,
                        height: 480,
                    },
                ];

                CameraInfo {
                    id,
                    name,
                    supported_resolutions: resolutions,
                }
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate cameras: {:?}", e);
            Vec::new()
        }
    }
}

/// FFmpeg encoder writing the movie file for one recording attempt
struct FfmpegMovieWriter {
    process: Mutex<Option<Child>>,
    target: PathBuf,
}

impl FfmpegMovieWriter {
    fn new(
        width: u32,
        height: u32,
        fps: u32,
        target: &Path,
        pixel_format: &str,
    ) -> Result<Self, std::io::Error> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Input: raw frames from stdin in the camera's native format.
        // Output: H.264 MP4 at the caller-chosen target.
        // TODO: mux the configured microphone input; requires a second
        // FFmpeg input fed over a named pipe.
        let process = Command::new("ffmpeg")
            .args([
                "-y", // Overwrite the reserved target
                "-f",
                "rawvideo",
                "-pixel_format",
                pixel_format,
                "-video_size",
                &format!("{width}x{height}"),
                "-framerate",
                &fps.to_string(),
                "-i",
                "-", // Read from stdin
                "-c:v",
                "libx264",
                "-preset",
                "veryfast",
                "-pix_fmt",
                "yuv420p",
                "-crf",
                "18",
                "-g",
                &(fps * 2).to_string(),
                "-movflags",
                "+faststart",
                &target.to_string_lossy(),
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        tracing::info!(
            "Started FFmpeg movie writer: {}x{} @ {}fps, pixel_format={}, target: {}",
            width,
            height,
            fps,
            pixel_format,
            target.display()
        );

        Ok(Self {
            process: Mutex::new(Some(process)),
            target: target.to_path_buf(),
        })
    }

    fn write_frame(&self, data: &[u8]) -> bool {
        let mut guard = self.process.lock();
        if let Some(process) = guard.as_mut() {
            if let Some(stdin) = process.stdin.as_mut() {
                return stdin.write_all(data).is_ok();
            }
        }
        false
    }

    /// Close the input stream, wait for FFmpeg, and verify the target.
    fn finish(&self) -> Result<(), String> {
        let mut guard = self.process.lock();
        if let Some(mut process) = guard.take() {
            // Close stdin to signal EOF
            drop(process.stdin.take());
            let output = process
                .wait_with_output()
                .map_err(|e| format!("failed to wait for FFmpeg: {e}"))?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(format!("FFmpeg exited with {}: {}", output.status, stderr));
            }
        }

        if !self.target.exists() {
            return Err(format!(
                "movie file missing after finalization: {}",
                self.target.display()
            ));
        }
        Ok(())
    }
}

struct WriterHandle {
    stop: Arc<AtomicBool>,
}

/// Production capture backend over the machine's cameras.
pub struct CameraCaptureBackend {
    applied: RwLock<Option<SessionConfig>>,
    running: AtomicBool,
    writing: Mutex<Option<WriterHandle>>,
}

impl CameraCaptureBackend {
    pub fn new() -> Self {
        Self {
            applied: RwLock::new(None),
            running: AtomicBool::new(false),
            writing: Mutex::new(None),
        }
    }

    fn camera_index(device_id: &str) -> CameraIndex {
        match device_id.parse::<u32>() {
            Ok(idx) => CameraIndex::Index(idx),
            Err(_) => CameraIndex::String(device_id.to_string()),
        }
    }
}

impl Default for CameraCaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureBackend for CameraCaptureBackend {
    fn cameras(&self) -> Vec<CameraInfo> {
        cameras()
    }

    /// Facing positions map onto enumeration order: the first camera is the
    /// user-facing one, the second (when present) the rear one.
    fn camera_for(&self, facing: CameraFacing) -> Option<CameraInfo> {
        let all = cameras();
        match facing {
            CameraFacing::Front => all.first().cloned(),
            CameraFacing::Back => all.get(1).cloned(),
        }
    }

    fn default_microphone(&self) -> Option<AudioDeviceInfo> {
        audio::default_input()
    }

    async fn request_access(&self) -> AccessStatus {
        // The platform prompts on first device open (nokhwa handles the
        // request); denial then surfaces as an open failure. Nothing to
        // pre-flight here.
        AccessStatus::Granted
    }

    async fn apply(&self, config: &SessionConfig) -> CaptureResult<()> {
        // Validate the proposal before committing anything, so a rejection
        // leaves the prior configuration untouched.
        let index = Self::camera_index(&config.video.device_id);
        let known = cameras()
            .iter()
            .any(|camera| camera.id == config.video.device_id);
        if !known {
            return Err(CaptureError::ConfigurationRejected(format!(
                "camera {index:?} is not attached"
            )));
        }

        *self.applied.write() = Some(config.clone());
        tracing::debug!(
            "Applied session configuration: video={}, audio={:?}",
            config.video.device_id,
            config.audio.as_ref().map(|a| a.device_id.as_str())
        );
        Ok(())
    }

    async fn run(&self) -> CaptureResult<()> {
        if self.applied.read().is_none() {
            return Err(CaptureError::Backend(
                "no session configuration applied".to_string(),
            ));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn halt(&self) {
        if self.writing.lock().is_some() {
            tracing::warn!("Session halted with a write in flight");
        }
        self.running.store(false, Ordering::SeqCst);
    }

    async fn begin_writing(
        &self,
        target: &Path,
    ) -> CaptureResult<oneshot::Receiver<WriteOutcome>> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::NotRunning);
        }
        if self.writing.lock().is_some() {
            return Err(CaptureError::Backend(
                "a write is already in flight".to_string(),
            ));
        }

        let config = self
            .applied
            .read()
            .clone()
            .ok_or_else(|| CaptureError::Backend("no session configuration applied".to_string()))?;

        let (done, receiver) = oneshot::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let target = target.to_path_buf();

        // The camera is opened inside the capture thread; every exit path
        // sends the attempt's single completion.
        std::thread::spawn(move || {
            let index = Self::camera_index(&config.video.device_id);
            let format =
                RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution);

            let mut camera = match Camera::new(index.clone(), format) {
                Ok(camera) => camera,
                Err(e) => {
                    tracing::error!("Failed to open camera {:?}: {:?}", index, e);
                    let _ = done.send(WriteOutcome::failed(
                        target,
                        format!("failed to open camera: {e}"),
                    ));
                    return;
                }
            };

            if let Err(e) = camera.open_stream() {
                tracing::error!("Failed to open camera stream: {:?}", e);
                let _ = done.send(WriteOutcome::failed(
                    target,
                    format!("failed to open camera stream: {e}"),
                ));
                return;
            }

            // Encode at the resolution the camera actually delivers, not
            // the requested one.
            let camera_format = camera.camera_format();
            let width = camera_format.resolution().width();
            let height = camera_format.resolution().height();
            let fps = camera_format.frame_rate();
            let frame_format = camera_format.format();

            let pix_fmt = match frame_format {
                FrameFormat::YUYV => "yuyv422",
                FrameFormat::NV12 => "nv12",
                FrameFormat::RAWRGB => "rgb24",
                FrameFormat::MJPEG => "mjpeg",
                _ => {
                    tracing::warn!(
                        "Unknown camera format {:?}, falling back to yuyv422",
                        frame_format
                    );
                    "yuyv422"
                }
            };

            tracing::info!(
                "Camera opened: {}x{} @ {}fps, format={:?} -> ffmpeg pix_fmt={}",
                width,
                height,
                fps,
                frame_format,
                pix_fmt
            );

            let writer = match FfmpegMovieWriter::new(width, height, fps, &target, pix_fmt) {
                Ok(writer) => writer,
                Err(e) => {
                    let _ = camera.stop_stream();
                    let _ = done.send(WriteOutcome::failed(
                        target,
                        format!("failed to start FFmpeg: {e}"),
                    ));
                    return;
                }
            };

            let mut frame_count: u64 = 0;
            while !stop_flag.load(Ordering::SeqCst) {
                // Blocks until the camera delivers the next frame; the
                // camera controls the timing.
                match camera.frame() {
                    Ok(frame) => {
                        writer.write_frame(frame.buffer());
                        frame_count += 1;
                    }
                    Err(e) => {
                        tracing::debug!("Failed to capture frame: {:?}", e);
                    }
                }
            }

            if let Err(e) = camera.stop_stream() {
                tracing::warn!("Error stopping camera stream: {:?}", e);
            }

            tracing::info!("Captured {} frames, finalizing movie file", frame_count);

            match writer.finish() {
                Ok(()) => {
                    let _ = done.send(WriteOutcome::success(target));
                }
                Err(reason) => {
                    tracing::error!("Finalization failed: {}", reason);
                    let _ = done.send(WriteOutcome::failed(target, reason));
                }
            }
        });

        *self.writing.lock() = Some(WriterHandle { stop });
        Ok(receiver)
    }

    async fn finish_writing(&self) -> CaptureResult<()> {
        let Some(handle) = self.writing.lock().take() else {
            return Err(CaptureError::Backend("no write in flight".to_string()));
        };
        handle.stop.store(true, Ordering::SeqCst);
        Ok(())
    }
}
