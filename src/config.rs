// Application configuration

use std::path::PathBuf;

/// Runtime configuration for the application
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file holding the detection history
    pub db_path: PathBuf,
    /// ONNX emotion model
    pub model_path: PathBuf,
    /// Log file written by the tracing subscriber
    pub log_path: PathBuf,
    /// Persist the source image bytes alongside each record
    pub keep_image_data: bool,
    /// Predictions below this confidence are reported as "no detection"
    pub confidence_threshold: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("image_emotion.db"),
            model_path: PathBuf::from("assets/models/emotion.onnx"),
            log_path: PathBuf::from("moodlens.log"),
            keep_image_data: true,
            confidence_threshold: 0.25,
        }
    }
}
