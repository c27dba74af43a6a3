// Emotion classification via ONNX model inference

use crate::error::{MoodLensError, Result};
use crate::models::{Emotion, Prediction};
use image::imageops::FilterType;
use image::DynamicImage;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use tracing::{debug, error};

/// Model input edge length (ViT-style preprocessing)
const INPUT_SIZE: usize = 224;
/// Pixel normalization: (x/255 - MEAN) / STD
const NORM_MEAN: f32 = 0.5;
const NORM_STD: f32 = 0.5;

/// Maps an image to an emotion and confidence, or reports that nothing
/// was detected. `None` is the "no face found" outcome, not an error.
pub trait EmotionClassifier {
    fn classify(&mut self, image: &DynamicImage) -> Result<Option<Prediction>>;
}

/// Emotion classifier backed by ONNX Runtime
pub struct OnnxEmotionClassifier {
    session: Session,
    confidence_threshold: f32,
}

impl OnnxEmotionClassifier {
    /// Creates a new classifier by loading the ONNX model
    pub fn new<P: AsRef<Path>>(model_path: P, confidence_threshold: f32) -> Result<Self> {
        let session = Session::builder()
            .map_err(|e| {
                MoodLensError::ModelLoad(format!("Failed to create session builder: {e}"))
            })?
            .commit_from_file(model_path.as_ref())
            .map_err(|e| {
                error!("Failed to load ONNX model: {}", e);
                MoodLensError::ModelLoad(format!("ONNX model load failed: {e}"))
            })?;

        Ok(Self {
            session,
            confidence_threshold,
        })
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&mut self, image: &DynamicImage) -> Result<Option<Prediction>> {
        let input_array = preprocess(image);

        let input_tensor = Value::from_array(input_array).map_err(|e| {
            MoodLensError::OnnxRuntime(format!("Failed to create input tensor: {e}"))
        })?;

        let inputs = ort::inputs![input_tensor];
        let outputs = self.session.run(inputs).map_err(|e| {
            error!("ONNX inference failed: {}", e);
            MoodLensError::OnnxRuntime(format!("Inference failed: {e}"))
        })?;

        let (_, output_value) = outputs
            .iter()
            .next()
            .ok_or_else(|| MoodLensError::OnnxRuntime("No output from model".to_string()))?;

        let tensor = output_value.try_extract_tensor::<f32>().map_err(|e| {
            MoodLensError::OnnxRuntime(format!("Failed to extract output tensor: {e}"))
        })?;

        let logits = tensor.1;
        let probabilities = softmax(logits);

        let (max_idx, max_prob) = probabilities
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or_else(|| {
                MoodLensError::OnnxRuntime("No probabilities in output".to_string())
            })?;

        let emotion = Emotion::ALL.get(max_idx).copied().ok_or_else(|| {
            MoodLensError::OnnxRuntime(format!("Unexpected class index {max_idx} from model"))
        })?;

        // Below the threshold the model has not seen anything recognizable,
        // which callers treat as "no detection"
        if *max_prob < self.confidence_threshold {
            debug!(
                "Top class {} at {:.3} below threshold {:.3}",
                emotion, max_prob, self.confidence_threshold
            );
            return Ok(None);
        }

        Ok(Some(Prediction::new(emotion, *max_prob)))
    }
}

/// Resizes and normalizes an image into a [1, 3, H, W] input tensor
fn preprocess(image: &DynamicImage) -> ndarray::Array4<f32> {
    let resized = image
        .resize_exact(INPUT_SIZE as u32, INPUT_SIZE as u32, FilterType::Triangle)
        .to_rgb8();

    // HWC pixels into a CHW tensor
    let mut chw = ndarray::Array4::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            chw[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 / 255.0 - NORM_MEAN) / NORM_STD;
        }
    }
    chw
}

/// Converts logits to probabilities
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp_sum: f32 = logits.iter().map(|&x| (x - max_logit).exp()).sum();
    logits
        .iter()
        .map(|&x| (x - max_logit).exp() / exp_sum)
        .collect()
}
