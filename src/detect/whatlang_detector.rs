use tracing::debug;
use whatlang::{Detector, Lang};

use crate::error::{Result, ParleyError};
use super::{DetectedLanguage, LanguageDetector};

/// Trigram-based detector backed by the whatlang crate.
///
/// whatlang scores against fixed tables and uses no randomness, so a given
/// text always yields the same language.
pub struct WhatlangDetector {
    detector: Detector,
}

impl WhatlangDetector {
    pub fn new() -> Self {
        Self {
            detector: Detector::new(),
        }
    }

    fn detect_code(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(ParleyError::Detection("empty input".to_string()));
        }

        let info = self.detector
            .detect(text)
            .ok_or_else(|| ParleyError::Detection("no language identified".to_string()))?;

        debug!(
            "whatlang: {} (confidence {:.2}, reliable: {})",
            info.lang().code(),
            info.confidence(),
            info.is_reliable()
        );

        match table_code(info.lang()) {
            Some(code) => Ok(code.to_string()),
            // Short inputs often score as a stray language; keep only confident guesses
            None if !info.is_reliable() => Err(ParleyError::Detection(format!(
                "unreliable guess '{}'",
                info.lang().code()
            ))),
            None => Ok(info.lang().code().to_string()),
        }
    }
}

impl Default for WhatlangDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> DetectedLanguage {
        match self.detect_code(text) {
            Ok(code) => DetectedLanguage::from_code(&code),
            Err(e) => {
                debug!("Language detection fell back to unknown: {}", e);
                DetectedLanguage::unknown()
            }
        }
    }
}

// whatlang reports ISO 639-3; the language table is keyed by two-letter codes
fn table_code(lang: Lang) -> Option<&'static str> {
    match lang {
        Lang::Eng => Some("en"),
        Lang::Spa => Some("es"),
        Lang::Fra => Some("fr"),
        Lang::Deu => Some("de"),
        Lang::Ita => Some("it"),
        Lang::Por => Some("pt"),
        Lang::Rus => Some("ru"),
        Lang::Cmn => Some("zh"),
        Lang::Jpn => Some("ja"),
        Lang::Kor => Some("ko"),
        Lang::Ara => Some("ar"),
        Lang::Hin => Some("hi"),
        _ => None,
    }
}
