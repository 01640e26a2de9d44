// Translation between the user's language and the pivot language
//
// LanguageTranslator is the failure-tolerant front used by the pipeline. It
// resolves language names, skips no-op translations and turns every engine
// failure into the original text. The engines behind it:
// - Ollama: prompt an LLM for a JSON translation
// - Identity: used when the translation capability is absent

pub mod common;
pub mod identity;

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use tracing::{debug, warn};

pub use common::OllamaTranslationEngine;
pub use identity::IdentityEngine;
use crate::config::TranslateConfig;
use crate::error::Result;
use crate::languages;

/// Engine contract: translate `text` into the language with code `target_code`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    async fn translate_text(&self, text: &str, target_code: &str) -> Result<String>;

    /// Short engine name for log lines
    fn name(&self) -> &'static str;
}

/// Result of a translation attempt. `applied` is false whenever the original
/// text came back: no-op pair, identity engine, or a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    pub text: String,
    pub applied: bool,
}

impl TranslationOutcome {
    pub fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            applied: false,
        }
    }
}

pub struct LanguageTranslator {
    engine: Arc<dyn TranslationEngine>,
    timeout: Duration,
    available: bool,
}

impl LanguageTranslator {
    pub fn new(engine: Arc<dyn TranslationEngine>, timeout: Duration) -> Self {
        Self {
            engine,
            timeout,
            available: true,
        }
    }

    /// Identity translator for when the capability is absent
    pub fn unavailable() -> Self {
        Self {
            engine: Arc::new(IdentityEngine),
            timeout: Duration::ZERO,
            available: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Translate `text` to `target` (a language name or code). Never fails:
    /// on any error the original text is returned.
    pub async fn translate(&self, text: &str, target: &str) -> String {
        self.translate_from(text, None, target).await.text
    }

    /// Like [`translate`](Self::translate), but a known source language equal
    /// to the target short-circuits without touching the engine.
    pub async fn translate_from(&self, text: &str, source: Option<&str>, target: &str) -> TranslationOutcome {
        if !self.available {
            return TranslationOutcome::unchanged(text);
        }

        let target_code = languages::resolve(target);
        if let Some(source) = source {
            if languages::resolve(source).eq_ignore_ascii_case(&target_code) {
                debug!("Skipping translation: source and target are both '{}'", target_code);
                return TranslationOutcome::unchanged(text);
            }
        }

        if text.trim().is_empty() {
            return TranslationOutcome::unchanged(text);
        }

        match tokio::time::timeout(self.timeout, self.engine.translate_text(text, &target_code)).await {
            Ok(Ok(translation)) if !translation.trim().is_empty() => TranslationOutcome {
                text: translation,
                applied: true,
            },
            Ok(Ok(_)) => {
                warn!("Translation error ({}): empty translation received", self.engine.name());
                TranslationOutcome::unchanged(text)
            }
            Ok(Err(e)) => {
                warn!("Translation error ({}): {}", self.engine.name(), e);
                TranslationOutcome::unchanged(text)
            }
            Err(_) => {
                warn!(
                    "Translation error ({}): timed out after {}s",
                    self.engine.name(),
                    self.timeout.as_secs()
                );
                TranslationOutcome::unchanged(text)
            }
        }
    }
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Ollama-backed translator when `available`, identity otherwise
    pub fn create_translator(config: &TranslateConfig, available: bool) -> Result<LanguageTranslator> {
        if !available {
            return Ok(LanguageTranslator::unavailable());
        }

        let engine = OllamaTranslationEngine::new(config.clone())?;
        Ok(LanguageTranslator::new(Arc::new(engine), config.timeout()))
    }
}
