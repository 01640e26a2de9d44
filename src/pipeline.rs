use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{ChatConfig, Config};
use crate::detect::{DetectorFactory, LanguageDetector, Utterance};
use crate::error::Result;
use crate::generate::{
    BackendKind, BackendRegistry, BackendSet, FallbackResponder, GenerationResult, OllamaModelLoader,
};
use crate::history::ConversationTurn;
use crate::languages;
use crate::setup::CapabilitySet;
use crate::translate::{LanguageTranslator, TranslationOutcome, TranslatorFactory};

/// Per-request options chosen by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOptions {
    pub translation_enabled: bool,
    pub backend_label: String,
    pub output_language: String,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            translation_enabled: true,
            backend_label: BackendKind::CausalDialogue.label().to_string(),
            output_language: languages::AUTO.to_string(),
        }
    }
}

impl From<&ChatConfig> for TurnOptions {
    fn from(chat: &ChatConfig) -> Self {
        Self {
            translation_enabled: chat.translation_enabled,
            backend_label: chat.backend.clone(),
            output_language: chat.output_language.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub final_response: String,
    /// Display label of the detected language
    pub detected_language: String,
    /// Text handed to the backend
    pub normalized_input: String,
    pub used_fallback: bool,
    pub annotation: String,
    /// Backend that produced the reply; `None` when the fallback responder did
    pub backend: Option<BackendKind>,
}

impl TurnOutcome {
    /// Persistence record for this exchange
    pub fn to_turn(&self, raw: &str) -> ConversationTurn {
        ConversationTurn {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_message: raw.to_string(),
            bot_response: self.final_response.clone(),
            detected_language: self.detected_language.clone(),
            normalized_message: self.normalized_input.clone(),
            backend: self.backend.map(|kind| kind.label().to_string()),
            used_fallback: self.used_fallback,
        }
    }
}

/// Where replies come from
pub enum Responder {
    /// Real models, acquired lazily per kind
    Backends {
        registry: Arc<BackendRegistry>,
        backends: BackendSet,
    },
    /// Generation capability absent; canned replies only
    Fallback(FallbackResponder),
}

/// Detect, normalize, generate, denormalize, emit
pub struct ConversationPipeline {
    detector: Arc<dyn LanguageDetector>,
    translator: LanguageTranslator,
    responder: Responder,
}

impl ConversationPipeline {
    pub fn new(detector: Arc<dyn LanguageDetector>, translator: LanguageTranslator, responder: Responder) -> Self {
        Self {
            detector,
            translator,
            responder,
        }
    }

    /// Wire real or sentinel collaborators according to `capabilities`
    pub fn from_config(config: &Config, capabilities: &CapabilitySet) -> Result<Self> {
        let detector = DetectorFactory::create_detector(capabilities.detection);
        let translator = TranslatorFactory::create_translator(&config.translate, capabilities.translation)?;

        let responder = if capabilities.generation {
            let loader = Arc::new(OllamaModelLoader::new(&config.generation)?);
            Responder::Backends {
                registry: Arc::new(BackendRegistry::new(loader, config.generation.acquire_timeout())),
                backends: BackendSet::from_config(&config.generation),
            }
        } else {
            info!("Generation unavailable, using canned replies");
            Responder::Fallback(FallbackResponder::from_entropy())
        };

        Ok(Self::new(detector, translator, responder))
    }

    /// Backend registry, when real models are in use
    pub fn registry(&self) -> Option<&Arc<BackendRegistry>> {
        match &self.responder {
            Responder::Backends { registry, .. } => Some(registry),
            Responder::Fallback(_) => None,
        }
    }

    /// Run one request through every stage. Never fails.
    pub async fn handle_turn(&self, raw: &str, options: &TurnOptions) -> TurnOutcome {
        // Detect
        let utterance = Utterance::detect(raw, &*self.detector);
        let detected = utterance.detected;
        debug!("Detected language: {}", detected.label);

        // Normalize to the pivot language
        let normalized = if options.translation_enabled && !detected.is_pivot() {
            self.translator
                .translate_from(&utterance.text, detected.code.as_deref(), languages::PIVOT)
                .await
        } else {
            TranslationOutcome::unchanged(&utterance.text)
        };

        // Generate
        let (reply, backend) = self.generate(&normalized.text, &options.backend_label).await;

        // Denormalize to the requested output language
        let denormalized = if options.translation_enabled && !languages::keeps_pivot(&options.output_language) {
            self.translator
                .translate_from(&reply.text, Some(languages::PIVOT), &options.output_language)
                .await
        } else {
            TranslationOutcome::unchanged(&reply.text)
        };

        // Emit
        let translated = normalized.applied || denormalized.applied;
        let annotation = annotate(&detected.label, backend, translated);

        TurnOutcome {
            final_response: denormalized.text,
            detected_language: detected.label,
            normalized_input: normalized.text,
            used_fallback: reply.used_fallback,
            annotation,
            backend,
        }
    }

    async fn generate(&self, text: &str, backend_label: &str) -> (GenerationResult, Option<BackendKind>) {
        match &self.responder {
            Responder::Fallback(fallback) => (fallback.respond(text), None),
            Responder::Backends { registry, backends } => {
                let kind = BackendKind::from_label(backend_label);
                let handle = registry.get(kind).await;
                (backends.get(kind).generate(&handle, text).await, Some(kind))
            }
        }
    }
}

fn annotate(detected_label: &str, backend: Option<BackendKind>, translated: bool) -> String {
    let model = match backend {
        Some(kind) => kind.label(),
        None => "fallback",
    };

    let mut annotation = format!("Detected: {} | Model: {}", detected_label, model);
    if translated {
        annotation.push_str(" | Translated");
    }
    annotation
}
