// Language detection
//
// Two implementations sit behind the LanguageDetector trait:
// - Whatlang: statistical trigram detection (cargo feature "detection")
// - Unavailable: fixed answer used when detection is switched off or not built

#[cfg(feature = "detection")]
pub mod whatlang_detector;
pub mod unavailable;

use std::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::languages;

/// Label returned when no language could be identified
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Label returned when the detection capability is absent
pub const UNAVAILABLE_LABEL: &str = "English (detection unavailable)";

/// Outcome of a detection: a display label plus the code used for routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedLanguage {
    pub label: String,
    pub code: Option<String>,
}

impl DetectedLanguage {
    /// Build from a detector code, labelling it through the language table
    pub fn from_code(code: &str) -> Self {
        Self {
            label: languages::label_of(code),
            code: Some(code.to_string()),
        }
    }

    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            code: None,
        }
    }

    /// Sentinel for a missing detector; routes like English
    pub fn unavailable() -> Self {
        Self {
            label: UNAVAILABLE_LABEL.to_string(),
            code: Some(languages::PIVOT.to_string()),
        }
    }

    /// Whether the text is already in the pivot language
    pub fn is_pivot(&self) -> bool {
        self.code.as_deref() == Some(languages::PIVOT)
    }
}

/// A single inbound message together with its detected language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub detected: DetectedLanguage,
}

impl Utterance {
    pub fn detect(text: &str, detector: &dyn LanguageDetector) -> Self {
        Self {
            text: text.to_string(),
            detected: detector.detect(text),
        }
    }
}

/// Identify the dominant language of a text span.
///
/// Implementations must not fail: any internal problem is reported as
/// [`DetectedLanguage::unknown`]. Repeated calls on the same text within one
/// process return the same answer.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> DetectedLanguage;

    /// Whether this is a real detector rather than the unavailable sentinel
    fn is_available(&self) -> bool {
        true
    }
}

/// Factory for creating detector instances
pub struct DetectorFactory;

impl DetectorFactory {
    /// Real detector when `available` and compiled in, otherwise the sentinel
    pub fn create_detector(available: bool) -> Arc<dyn LanguageDetector> {
        #[cfg(feature = "detection")]
        {
            if available {
                return Arc::new(whatlang_detector::WhatlangDetector::new());
            }
        }

        #[cfg(not(feature = "detection"))]
        let _ = available;

        Arc::new(unavailable::UnavailableDetector)
    }

    /// Whether a statistical detector was built into this binary
    pub fn compiled_in() -> bool {
        cfg!(feature = "detection")
    }
}
