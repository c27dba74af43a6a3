// Detection pipeline: image input -> classifier -> history record

use crate::classifier::EmotionClassifier;
use crate::error::{MoodLensError, Result};
use crate::image_source::ImageInput;
use crate::models::{NewDetection, Prediction};
use crate::store::DetectionStore;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Outcome of one pipeline run. `NoDetection` is informational, distinct
/// from the error paths.
#[derive(Clone, Copy, Debug)]
pub enum DetectionOutcome {
    Detected { prediction: Prediction, id: i64 },
    NoDetection,
}

/// Turns a raw image input into zero or one persisted detection record
pub struct DetectionPipeline {
    classifier: Box<dyn EmotionClassifier>,
    store: Arc<DetectionStore>,
    keep_image_data: bool,
}

impl DetectionPipeline {
    pub fn new(
        classifier: Box<dyn EmotionClassifier>,
        store: Arc<DetectionStore>,
        keep_image_data: bool,
    ) -> Self {
        Self {
            classifier,
            store,
            keep_image_data,
        }
    }

    /// Decodes, classifies, and persists one image. Nothing is stored unless
    /// classification succeeds.
    pub fn run_once(
        &mut self,
        input: &ImageInput,
        display_name: Option<&str>,
    ) -> Result<DetectionOutcome> {
        let image = input.decode()?;

        let Some(prediction) = self.classifier.classify(&image)? else {
            info!("No detection in {}", display_name.unwrap_or("submitted image"));
            return Ok(DetectionOutcome::NoDetection);
        };

        // The emotion label is closed by type; confidence range is the
        // remaining contract surface to check
        if !prediction.confidence.is_finite() || !(0.0..=1.0).contains(&prediction.confidence) {
            error!(
                "Classifier returned out-of-range confidence {}",
                prediction.confidence
            );
            return Err(MoodLensError::ClassifierContract(format!(
                "confidence {} outside [0, 1]",
                prediction.confidence
            )));
        }

        let image_name = display_name
            .map(str::to_string)
            .or_else(|| input.display_name())
            .unwrap_or_else(synthesized_capture_name);

        let image_data = if self.keep_image_data {
            Some(input.stored_bytes()?)
        } else {
            None
        };

        let id = self.store.insert(&NewDetection {
            image_name,
            emotion: prediction.emotion,
            confidence: prediction.confidence,
            image_data,
        })?;
        info!("Recorded detection {}: {}", id, prediction);

        Ok(DetectionOutcome::Detected { prediction, id })
    }
}

/// Unique name for a camera capture with no user-supplied filename.
/// Rapid successive captures must not collide.
pub fn synthesized_capture_name() -> String {
    format!("live_capture_{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_source::PixelOrder;
    use crate::models::{Emotion, Frame};
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    /// Classifier returning a fixed result, for driving pipeline outcomes
    struct ScriptedClassifier(Option<Prediction>);

    impl EmotionClassifier for ScriptedClassifier {
        fn classify(&mut self, _image: &DynamicImage) -> Result<Option<Prediction>> {
            Ok(self.0)
        }
    }

    fn png_input(name: &str) -> ImageInput {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([200, 180, 160])));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        ImageInput::Bytes {
            name: name.to_string(),
            data: buffer.into_inner(),
        }
    }

    fn frame_input() -> ImageInput {
        ImageInput::Frame {
            frame: Frame::new(vec![90; 4 * 4 * 3], 4, 4),
            order: PixelOrder::Rgb,
        }
    }

    fn pipeline(
        result: Option<Prediction>,
        keep_image_data: bool,
    ) -> (DetectionPipeline, Arc<DetectionStore>) {
        let store = Arc::new(DetectionStore::open_in_memory().unwrap());
        let pipeline = DetectionPipeline::new(
            Box::new(ScriptedClassifier(result)),
            Arc::clone(&store),
            keep_image_data,
        );
        (pipeline, store)
    }

    #[test]
    fn detection_appends_exactly_one_matching_record() {
        let (mut pipeline, store) =
            pipeline(Some(Prediction::new(Emotion::Happy, 0.93)), true);

        let prior_max = store.list_all().unwrap().first().map(|r| r.id).unwrap_or(0);
        let outcome = pipeline.run_once(&png_input("cat.jpg"), None).unwrap();

        let DetectionOutcome::Detected { prediction, id } = outcome else {
            panic!("expected a detection");
        };
        assert_eq!(prediction.emotion, Emotion::Happy);
        assert!(id > prior_max);

        let records = store.list_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].image_name, "cat.jpg");
        assert_eq!(records[0].emotion, Emotion::Happy);
        assert!((records[0].confidence - 0.93).abs() < 1e-6);
    }

    #[test]
    fn no_detection_persists_nothing() {
        let (mut pipeline, store) = pipeline(None, true);

        let outcome = pipeline.run_once(&png_input("blank.png"), None).unwrap();
        assert!(matches!(outcome, DetectionOutcome::NoDetection));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn decode_failure_aborts_before_classification() {
        let (mut pipeline, store) =
            pipeline(Some(Prediction::new(Emotion::Sad, 0.8)), true);

        let corrupt = ImageInput::Bytes {
            name: "broken.jpg".to_string(),
            data: vec![1, 2, 3],
        };
        assert!(matches!(
            pipeline.run_once(&corrupt, None),
            Err(MoodLensError::Decode(_))
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn out_of_range_confidence_is_a_contract_violation() {
        let (mut pipeline, store) =
            pipeline(Some(Prediction::new(Emotion::Happy, 1.5)), true);

        assert!(matches!(
            pipeline.run_once(&png_input("a.png"), None),
            Err(MoodLensError::ClassifierContract(_))
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn nan_confidence_is_a_contract_violation() {
        let (mut pipeline, store) =
            pipeline(Some(Prediction::new(Emotion::Happy, f32::NAN)), true);

        assert!(pipeline.run_once(&png_input("a.png"), None).is_err());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn camera_captures_get_distinct_synthesized_names() {
        let (mut pipeline, store) =
            pipeline(Some(Prediction::new(Emotion::Surprise, 0.7)), false);

        pipeline.run_once(&frame_input(), None).unwrap();
        pipeline.run_once(&frame_input(), None).unwrap();

        let records = store.list_all().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].image_name.starts_with("live_capture_"));
        assert!(records[1].image_name.starts_with("live_capture_"));
        assert_ne!(records[0].image_name, records[1].image_name);
    }

    #[test]
    fn explicit_display_name_wins_over_derived_name() {
        let (mut pipeline, store) =
            pipeline(Some(Prediction::new(Emotion::Neutral, 0.5)), false);

        pipeline
            .run_once(&png_input("original.png"), Some("renamed.png"))
            .unwrap();
        assert_eq!(store.list_all().unwrap()[0].image_name, "renamed.png");
    }

    #[test]
    fn image_payload_follows_capability_flag() {
        let (mut with_blob, blob_store) =
            pipeline(Some(Prediction::new(Emotion::Happy, 0.9)), true);
        with_blob.run_once(&png_input("a.png"), None).unwrap();
        assert!(blob_store.list_all().unwrap()[0].image_data.is_some());

        let (mut without_blob, lean_store) =
            pipeline(Some(Prediction::new(Emotion::Happy, 0.9)), false);
        without_blob.run_once(&png_input("a.png"), None).unwrap();
        assert!(lean_store.list_all().unwrap()[0].image_data.is_none());
    }

    #[test]
    fn synthesized_names_never_collide_within_a_burst() {
        let mut names = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(names.insert(synthesized_capture_name()));
        }
    }
}
