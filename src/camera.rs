// Camera capture and the live-capture session state machine

use crate::error::{MoodLensError, Result};
use crate::models::Frame;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{error, info};

/// Owns the capture device and reads RGB frames from it
pub struct CameraManager {
    camera: Camera,
}

impl CameraManager {
    /// Opens a capture device
    pub fn new() -> Result<Self> {
        // Request 640x480 at 30 FPS for better performance
        let requested_format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            nokhwa::utils::CameraFormat::new(
                nokhwa::utils::Resolution::new(640, 480),
                nokhwa::utils::FrameFormat::YUYV,
                30,
            ),
        ));

        // Try different camera indices (some systems start at 0, others at 1)
        let camera = Self::try_open_camera(0, requested_format)
            .or_else(|_| Self::try_open_camera(1, requested_format))
            .map_err(|e| {
                error!(
                    "Failed to initialize camera after trying multiple indices: {}",
                    e
                );
                MoodLensError::CameraInit(format!(
                    "Could not open camera. Make sure:\n\
                    1. A camera is connected\n\
                    2. No other app is using it\n\
                    3. Camera permissions are granted\n\
                    Error: {e}"
                ))
            })?;

        Ok(Self { camera })
    }

    /// Helper to try opening a camera at a specific index
    fn try_open_camera(index: u32, requested_format: RequestedFormat) -> Result<Camera> {
        Camera::new(CameraIndex::Index(index), requested_format)
            .map_err(|e| MoodLensError::CameraInit(e.to_string()))
    }

    /// Returns the camera information
    pub fn camera_info(&self) -> String {
        self.camera.info().human_name().to_string()
    }

    /// Opens the camera stream if not already open
    pub fn ensure_stream_open(&mut self) -> Result<()> {
        // Try to open the stream (idempotent if already open)
        let _ = self.camera.open_stream();

        // Wait a moment for the camera to initialize
        std::thread::sleep(std::time::Duration::from_millis(200));

        // Verify stream is working
        match self.camera.frame() {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Camera stream not working: {}", e);
                Err(MoodLensError::CameraInit(format!(
                    "Camera stream not working: {e}. Make sure camera permissions are granted."
                )))
            }
        }
    }

    /// Gets the most recent frame (blocking)
    /// Note: Stream must be opened first with ensure_stream_open()
    pub fn get_current_frame(&mut self) -> Result<Frame> {
        let frame_data = self.camera.frame().map_err(|e| {
            MoodLensError::FrameProcessing(format!("Failed to capture frame: {e}"))
        })?;

        let buffer = frame_data.decode_image::<RgbFormat>().map_err(|e| {
            MoodLensError::FrameProcessing(format!("Failed to decode frame: {e}"))
        })?;

        let (width, height) = (buffer.width(), buffer.height());
        let data = buffer.into_raw();

        Ok(Frame::new(data, width, height))
    }

    /// Stops the camera stream
    pub fn stop_stream(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            error!("Error stopping camera stream: {}", e);
        }
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

/// Phases of a live-capture session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveState {
    /// No camera held
    Idle,
    /// Camera open, frames flowing
    Streaming,
    /// A frame has been frozen for analysis; camera already released
    Captured,
}

/// One live-capture session.
///
/// The camera handle lives only inside this struct; every transition out of
/// `Streaming` drops it, so the device is never held outside an active
/// session, including error paths.
pub struct LiveSession {
    state: LiveState,
    camera: Option<CameraManager>,
    last_frame: Option<Frame>,
}

impl LiveSession {
    pub fn new() -> Self {
        Self {
            state: LiveState::Idle,
            camera: None,
            last_frame: None,
        }
    }

    pub fn state(&self) -> LiveState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == LiveState::Streaming
    }

    /// Opens the camera and starts streaming. Does nothing if already
    /// streaming; on failure the session stays idle with no device held.
    pub fn start(&mut self) -> Result<()> {
        if self.state == LiveState::Streaming {
            return Ok(());
        }

        let mut camera = CameraManager::new()?;
        camera.ensure_stream_open()?;
        info!("Live capture started on {}", camera.camera_info());

        self.camera = Some(camera);
        self.last_frame = None;
        self.state = LiveState::Streaming;
        Ok(())
    }

    /// Reads the next frame while streaming. A read failure releases the
    /// camera and ends the session.
    pub fn poll_frame(&mut self) -> Result<Frame> {
        let camera = self.camera.as_mut().ok_or_else(|| {
            MoodLensError::FrameProcessing("No active camera stream".to_string())
        })?;

        match camera.get_current_frame() {
            Ok(frame) => {
                self.last_frame = Some(frame.clone());
                Ok(frame)
            }
            Err(e) => {
                error!("Camera read failed, ending live session: {}", e);
                self.release();
                Err(e)
            }
        }
    }

    /// Freezes the most recent frame for analysis and releases the camera.
    /// Returns None if no frame has been seen yet.
    pub fn request_analyze(&mut self) -> Option<Frame> {
        if self.state != LiveState::Streaming {
            return None;
        }
        let frame = self.last_frame.clone()?;
        self.camera = None;
        self.state = LiveState::Captured;
        Some(frame)
    }

    /// Returns to idle after a captured frame has been handled
    pub fn finish(&mut self) {
        self.release();
    }

    /// Stops the session from any state and releases the camera
    pub fn stop(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.camera = None;
        self.last_frame = None;
        self.state = LiveState::Idle;
    }
}

impl Default for LiveSession {
    fn default() -> Self {
        Self::new()
    }
}
