// Error types for MoodLens

use thiserror::Error;

/// Main error type for MoodLens operations
#[derive(Debug, Error)]
pub enum MoodLensError {
    #[error("Camera initialization failed: {0}")]
    CameraInit(String),

    #[error("Frame processing failed: {0}")]
    FrameProcessing(String),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Classifier contract violation: {0}")]
    ClassifierContract(String),

    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    Decode(#[from] image::ImageError),
}

/// Result type alias for MoodLens operations
pub type Result<T> = std::result::Result<T, MoodLensError>;

// Conversion from nokhwa errors
impl From<nokhwa::NokhwaError> for MoodLensError {
    fn from(err: nokhwa::NokhwaError) -> Self {
        match err {
            nokhwa::NokhwaError::StructureError { structure, error } => {
                MoodLensError::CameraInit(format!("{structure}: {error}"))
            }
            nokhwa::NokhwaError::OpenDeviceError(device, error) => {
                MoodLensError::CameraInit(format!("Device {device}: {error}"))
            }
            nokhwa::NokhwaError::GetPropertyError { property, error } => {
                MoodLensError::CameraInit(format!("Property {property}: {error}"))
            }
            nokhwa::NokhwaError::ReadFrameError(error) => MoodLensError::FrameProcessing(error),
            _ => MoodLensError::CameraInit(err.to_string()),
        }
    }
}

// Conversion from ONNX Runtime errors
impl From<ort::Error> for MoodLensError {
    fn from(err: ort::Error) -> Self {
        MoodLensError::OnnxRuntime(err.to_string())
    }
}
