mod camera;
mod classifier;
mod config;
mod error;
mod image_source;
mod models;
mod pipeline;
mod store;
mod ui;

use classifier::OnnxEmotionClassifier;
use config::AppConfig;
use error::Result;
use pipeline::DetectionPipeline;
use std::sync::Arc;
use store::DetectionStore;
use tracing::error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};
use ui::MoodLensApp;

/// Initializes the logging system (file only, no console output)
fn init_logging(config: &AppConfig) -> Result<()> {
    // Create log file
    let log_file = std::fs::File::create(&config.log_path)?;

    // Set up file layer only (no console output)
    let file_layer = fmt::layer()
        .with_writer(Arc::new(log_file))
        .with_ansi(false);

    // Initialize subscriber with file logging only
    tracing_subscriber::registry().with(file_layer).init();

    Ok(())
}

fn main() -> Result<()> {
    let config = AppConfig::default();
    init_logging(&config)?;

    // Initialize components
    let store = Arc::new(DetectionStore::open(&config.db_path)?);
    let classifier = OnnxEmotionClassifier::new(&config.model_path, config.confidence_threshold)?;
    let pipeline = DetectionPipeline::new(
        Box::new(classifier),
        Arc::clone(&store),
        config.keep_image_data,
    );

    // Run application
    let result = eframe::run_native(
        "MoodLens",
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([960.0, 760.0])
                .with_title("MoodLens"),
            ..Default::default()
        },
        Box::new(move |_cc| Ok(Box::new(MoodLensApp::new(pipeline, store)))),
    );

    if let Err(e) = result {
        error!("Application error: {}", e);
    }

    Ok(())
}
