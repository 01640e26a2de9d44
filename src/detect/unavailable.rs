use super::{DetectedLanguage, LanguageDetector};

/// Stand-in used when detection is disabled or not compiled in
pub struct UnavailableDetector;

impl LanguageDetector for UnavailableDetector {
    fn detect(&self, _text: &str) -> DetectedLanguage {
        DetectedLanguage::unavailable()
    }

    fn is_available(&self) -> bool {
        false
    }
}
