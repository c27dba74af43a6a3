// Core data models for MoodLens

/// Represents a single video frame with RGB data
#[derive(Clone, Debug)]
pub struct Frame {
    /// Raw RGB pixel data (width * height * 3 bytes)
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl Frame {
    /// Creates a new Frame with the given parameters
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }
}

/// The closed set of emotions the classifier may report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    /// All members, in classifier output order
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    /// Lowercase storage form of the label
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    /// Parses a label, case-insensitively. Returns None for anything
    /// outside the fixed set.
    pub fn parse(label: &str) -> Option<Emotion> {
        match label.to_ascii_lowercase().as_str() {
            "angry" => Some(Emotion::Angry),
            "disgust" => Some(Emotion::Disgust),
            "fear" => Some(Emotion::Fear),
            "happy" => Some(Emotion::Happy),
            "sad" => Some(Emotion::Sad),
            "surprise" => Some(Emotion::Surprise),
            "neutral" => Some(Emotion::Neutral),
            _ => None,
        }
    }

    /// Emoji shown next to the label in the UI
    pub fn emoji(&self) -> &'static str {
        match self {
            Emotion::Angry => "😠",
            Emotion::Disgust => "🤢",
            Emotion::Fear => "😨",
            Emotion::Happy => "😊",
            Emotion::Sad => "😢",
            Emotion::Surprise => "😲",
            Emotion::Neutral => "😐",
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Capitalized display form
        match self {
            Emotion::Angry => write!(f, "Angry"),
            Emotion::Disgust => write!(f, "Disgust"),
            Emotion::Fear => write!(f, "Fear"),
            Emotion::Happy => write!(f, "Happy"),
            Emotion::Sad => write!(f, "Sad"),
            Emotion::Surprise => write!(f, "Surprise"),
            Emotion::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Result of a classification: the emotion and its confidence
#[derive(Clone, Copy, Debug)]
pub struct Prediction {
    /// The detected emotion
    pub emotion: Emotion,
    /// Confidence level (0.0 to 1.0)
    pub confidence: f32,
}

impl Prediction {
    /// Creates a new Prediction
    pub fn new(emotion: Emotion, confidence: f32) -> Self {
        Self {
            emotion,
            confidence,
        }
    }

    /// Returns the confidence as a percentage (0-100)
    pub fn confidence_percent(&self) -> f32 {
        self.confidence * 100.0
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({:.2}% confidence)",
            self.emotion,
            self.confidence_percent()
        )
    }
}

/// A detection waiting to be persisted
#[derive(Clone, Debug)]
pub struct NewDetection {
    /// Source label: original filename or a synthesized capture name
    pub image_name: String,
    pub emotion: Emotion,
    pub confidence: f32,
    /// Raw source bytes, kept only when blob persistence is enabled
    pub image_data: Option<Vec<u8>>,
}

/// One persisted detection, as read back from the store
#[derive(Clone, Debug)]
pub struct DetectionRecord {
    pub id: i64,
    pub image_name: String,
    pub emotion: Emotion,
    pub confidence: f32,
    pub image_data: Option<Vec<u8>>,
    /// Creation time, `YYYY-MM-DD HH:MM:SS`, assigned by the store
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_any_case() {
        assert_eq!(Emotion::parse("happy"), Some(Emotion::Happy));
        assert_eq!(Emotion::parse("Happy"), Some(Emotion::Happy));
        assert_eq!(Emotion::parse("SURPRISE"), Some(Emotion::Surprise));
    }

    #[test]
    fn parse_rejects_labels_outside_the_set() {
        assert_eq!(Emotion::parse("contempt"), None);
        assert_eq!(Emotion::parse(""), None);
    }

    #[test]
    fn storage_form_round_trips() {
        for emotion in Emotion::ALL {
            assert_eq!(Emotion::parse(emotion.as_str()), Some(emotion));
        }
    }

    #[test]
    fn display_is_capitalized() {
        assert_eq!(Emotion::Fear.to_string(), "Fear");
        assert_eq!(Emotion::Fear.as_str(), "fear");
    }
}
