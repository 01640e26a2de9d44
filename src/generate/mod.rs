// Reply generation
//
// Three interchangeable backends share one GenerationBackend contract and
// differ only in prompt shaping and decoding policy:
// - Causal dialogue ("fast"): end-of-turn marker, reply is the new suffix
// - Conversational seq2seq ("better"): the input as one utterance
// - Instruction seq2seq ("instruction"): the input wrapped in an instruction
//
// Model sessions are acquired lazily through the BackendRegistry. When the
// generation capability is absent altogether the FallbackResponder answers.

pub mod causal;
pub mod engine;
pub mod fallback;
pub mod registry;
pub mod seq2seq;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use engine::{OllamaEngine, OllamaModelLoader};
pub use fallback::FallbackResponder;
pub use registry::BackendRegistry;
use crate::config::GenerationConfig;
use crate::error::Result;

/// Reply when the backend's model could not be loaded
pub const LOAD_FAILURE_REPLY: &str = "Sorry, I'm having trouble loading the model. Please try again.";

/// Reply when a seq2seq backend produced nothing
pub const EMPTY_REPLY: &str = "I'm not sure how to respond to that.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Decoder-only dialogue model continuing the conversation
    CausalDialogue,
    /// Encoder-decoder model trained on open-domain conversation
    ConversationalSeq2Seq,
    /// Encoder-decoder model tuned to follow instructions
    InstructionSeq2Seq,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::CausalDialogue,
        BackendKind::ConversationalSeq2Seq,
        BackendKind::InstructionSeq2Seq,
    ];

    /// Parse a caller-supplied label; also accepts the older display labels
    /// such as "BlenderBot (Better)".
    pub fn parse_label(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        match label.as_str() {
            "fast" | "causal" | "dialogue" => return Some(Self::CausalDialogue),
            "better" | "conversational" => return Some(Self::ConversationalSeq2Seq),
            "instruction" | "instruct" => return Some(Self::InstructionSeq2Seq),
            _ => {}
        }

        if label.contains("dialogpt") {
            Some(Self::CausalDialogue)
        } else if label.contains("blenderbot") {
            Some(Self::ConversationalSeq2Seq)
        } else if label.contains("flan-t5") {
            Some(Self::InstructionSeq2Seq)
        } else {
            None
        }
    }

    /// Like [`parse_label`](Self::parse_label) but unknown labels select the
    /// causal dialogue backend.
    pub fn from_label(label: &str) -> Self {
        Self::parse_label(label).unwrap_or_else(|| {
            warn!("Unknown backend label '{}', using the causal dialogue backend", label);
            Self::CausalDialogue
        })
    }

    pub fn is_known_label(label: &str) -> bool {
        Self::parse_label(label).is_some()
    }

    /// Canonical selection label
    pub fn label(self) -> &'static str {
        match self {
            Self::CausalDialogue => "fast",
            Self::ConversationalSeq2Seq => "better",
            Self::InstructionSeq2Seq => "instruction",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::CausalDialogue => 0,
            Self::ConversationalSeq2Seq => 1,
            Self::InstructionSeq2Seq => 2,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CausalDialogue => "Causal dialogue (fast)",
            Self::ConversationalSeq2Seq => "Conversational (better)",
            Self::InstructionSeq2Seq => "Instruction (instruction)",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub text: String,
    /// Set when `text` is a canned reply rather than model output
    pub used_fallback: bool,
}

impl GenerationResult {
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            used_fallback: false,
        }
    }

    pub fn canned(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            used_fallback: true,
        }
    }
}

/// How long a reply may grow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxLength {
    /// Total output length in tokens
    Fixed(usize),
    /// Prompt length plus this many tokens; the window covers prompt and reply
    InputPlus(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodingPolicy {
    pub num_beams: u32,
    pub no_repeat_ngram_size: Option<u32>,
    pub do_sample: bool,
    pub temperature: f32,
    pub length: MaxLength,
}

impl DecodingPolicy {
    /// Token window for a prompt of `input_tokens`
    pub fn window(&self, input_tokens: usize) -> usize {
        match self.length {
            MaxLength::Fixed(n) => n,
            MaxLength::InputPlus(n) => input_tokens + n,
        }
    }

    /// Tokens the engine may produce for a prompt of `input_tokens`
    pub fn max_new_tokens(&self, input_tokens: usize) -> usize {
        match self.length {
            MaxLength::Fixed(n) => n,
            MaxLength::InputPlus(_) => self.window(input_tokens).saturating_sub(input_tokens),
        }
    }

    /// Effective sampling temperature; greedy/beam decoding when not sampling
    pub fn sampling_temperature(&self) -> f32 {
        if self.do_sample { self.temperature } else { 0.0 }
    }
}

/// Prompt as sent to the inference engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPrompt {
    pub prompt: String,
    /// Send verbatim, bypassing the model's chat template
    pub raw: bool,
    pub max_new_tokens: usize,
}

/// Rough token count: one per word plus one per punctuation mark
pub fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace()
        .map(|word| 1 + word.chars().filter(|c| c.is_ascii_punctuation()).count())
        .sum()
}

/// Runs a prepared prompt against a loaded model
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn complete(&self, model: &str, prompt: &PreparedPrompt, policy: &DecodingPolicy) -> Result<String>;
}

/// A model session ready to serve one backend kind
pub struct LoadedModel {
    pub kind: BackendKind,
    pub model: String,
    pub engine: Arc<dyn InferenceEngine>,
}

impl LoadedModel {
    pub fn new(kind: BackendKind, model: impl Into<String>, engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            kind,
            model: model.into(),
            engine,
        }
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Registry-owned handle for one backend kind
#[derive(Debug, Clone)]
pub enum BackendHandle {
    Ready(Arc<LoadedModel>),
    Unavailable { reason: String },
}

impl BackendHandle {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn model_name(&self) -> Option<&str> {
        match self {
            Self::Ready(model) => Some(&model.model),
            Self::Unavailable { .. } => None,
        }
    }

    /// Whether both handles point at the same loaded model
    pub fn same_instance(&self, other: &BackendHandle) -> bool {
        match (self, other) {
            (Self::Ready(a), Self::Ready(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Acquires the model session for a backend kind (possibly slow)
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, kind: BackendKind) -> Result<LoadedModel>;
}

/// Reply synthesis for one backend kind
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn policy(&self) -> &DecodingPolicy;

    /// Shape user text into the prompt the model expects
    fn prepare(&self, text: &str) -> PreparedPrompt;

    /// Upper bound for a single engine call
    fn timeout(&self) -> Duration;

    /// Substitute for a blank reply
    fn empty_reply(&self) -> &'static str {
        EMPTY_REPLY
    }

    /// Pull the reply out of raw engine output
    fn extract_reply(&self, _prompt: &PreparedPrompt, output: &str) -> String {
        output.to_string()
    }

    /// Generate a reply. Never fails: unavailable models, engine errors,
    /// timeouts and blank output all map to canned replies.
    async fn generate(&self, handle: &BackendHandle, text: &str) -> GenerationResult {
        let model = match handle {
            BackendHandle::Ready(model) => model,
            BackendHandle::Unavailable { .. } => return GenerationResult::canned(LOAD_FAILURE_REPLY),
        };

        let prepared = self.prepare(text);
        debug!(
            "Generating with {} ({}), up to {} new tokens",
            self.kind(),
            model.model,
            prepared.max_new_tokens
        );

        let completion = tokio::time::timeout(
            self.timeout(),
            model.engine.complete(&model.model, &prepared, self.policy()),
        )
        .await;

        match completion {
            Ok(Ok(output)) => {
                let reply = self.extract_reply(&prepared, &output);
                let reply = reply.trim();
                if reply.is_empty() {
                    GenerationResult::canned(self.empty_reply())
                } else {
                    GenerationResult::model(reply)
                }
            }
            Ok(Err(e)) => {
                warn!("Generation with {} failed: {}", self.kind(), e);
                GenerationResult::canned(format!("Sorry, I encountered an error: {}", e))
            }
            Err(_) => {
                warn!("Generation with {} timed out after {}s", self.kind(), self.timeout().as_secs());
                GenerationResult::canned(format!(
                    "Sorry, I encountered an error: generation timed out after {}s",
                    self.timeout().as_secs()
                ))
            }
        }
    }
}

/// Factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    pub fn create_backend(kind: BackendKind, config: &GenerationConfig) -> Box<dyn GenerationBackend> {
        let timeout = config.generate_timeout();
        match kind {
            BackendKind::CausalDialogue => {
                Box::new(causal::CausalDialogueBackend::new(config.end_of_turn.clone(), timeout))
            }
            BackendKind::ConversationalSeq2Seq => {
                Box::new(seq2seq::ConversationalBackend::new(timeout))
            }
            BackendKind::InstructionSeq2Seq => {
                Box::new(seq2seq::InstructionBackend::new(timeout))
            }
        }
    }
}

/// One backend per kind
pub struct BackendSet {
    backends: [Box<dyn GenerationBackend>; 3],
}

impl BackendSet {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            backends: BackendKind::ALL.map(|kind| BackendFactory::create_backend(kind, config)),
        }
    }

    pub fn get(&self, kind: BackendKind) -> &dyn GenerationBackend {
        &*self.backends[kind.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParleyError;

    fn ready(engine: MockInferenceEngine) -> BackendHandle {
        BackendHandle::Ready(Arc::new(LoadedModel::new(
            BackendKind::ConversationalSeq2Seq,
            "test-model",
            Arc::new(engine),
        )))
    }

    fn backend() -> Box<dyn GenerationBackend> {
        BackendFactory::create_backend(BackendKind::ConversationalSeq2Seq, &GenerationConfig::default())
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!(BackendKind::from_label("fast"), BackendKind::CausalDialogue);
        assert_eq!(BackendKind::from_label("Better"), BackendKind::ConversationalSeq2Seq);
        assert_eq!(BackendKind::from_label("instruction"), BackendKind::InstructionSeq2Seq);
        assert_eq!(BackendKind::from_label("BlenderBot (Better)"), BackendKind::ConversationalSeq2Seq);
        assert_eq!(BackendKind::from_label("FLAN-T5 (Instruction)"), BackendKind::InstructionSeq2Seq);
        assert_eq!(BackendKind::from_label("unknown-value"), BackendKind::CausalDialogue);
        assert!(!BackendKind::is_known_label("unknown-value"));
    }

    #[test]
    fn test_labels_roundtrip() {
        for kind in BackendKind::ALL {
            assert_eq!(BackendKind::parse_label(kind.label()), Some(kind));
        }
    }

    #[test]
    fn test_decoding_windows() {
        let causal = causal::CAUSAL_POLICY;
        assert_eq!(causal.window(12), 112);
        assert_eq!(causal.max_new_tokens(12), 100);

        let seq2seq = seq2seq::SEQ2SEQ_POLICY;
        assert_eq!(seq2seq.window(12), 100);
        assert_eq!(seq2seq.max_new_tokens(12), 100);
        assert_eq!(seq2seq.sampling_temperature(), 0.7);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("Hello world"), 2);
        assert_eq!(estimate_tokens("Hello, world!"), 4);
    }

    #[tokio::test]
    async fn test_unavailable_handle_returns_apology() {
        let handle = BackendHandle::Unavailable { reason: "missing".to_string() };
        let result = backend().generate(&handle, "Hi there").await;
        assert_eq!(result, GenerationResult::canned(LOAD_FAILURE_REPLY));
    }

    #[tokio::test]
    async fn test_blank_output_is_replaced() {
        let mut engine = MockInferenceEngine::new();
        engine.expect_complete().returning(|_, _, _| Ok("  \n ".to_string()));

        let result = backend().generate(&ready(engine), "Hi there").await;
        assert_eq!(result.text, EMPTY_REPLY);
        assert!(result.used_fallback);
    }

    #[tokio::test]
    async fn test_engine_error_becomes_reply() {
        let mut engine = MockInferenceEngine::new();
        engine.expect_complete()
            .returning(|_, _, _| Err(ParleyError::Generation("out of memory".to_string())));

        let result = backend().generate(&ready(engine), "Hi there").await;
        assert!(result.text.starts_with("Sorry, I encountered an error:"));
        assert!(result.text.contains("out of memory"));
        assert!(result.used_fallback);
    }

    #[tokio::test]
    async fn test_model_output_is_trimmed() {
        let mut engine = MockInferenceEngine::new();
        engine.expect_complete()
            .withf(|model, prompt, policy| {
                model == "test-model" && prompt.prompt == "Hi there" && policy.num_beams == 5
            })
            .returning(|_, _, _| Ok("  Hello! How are you?\n".to_string()));

        let result = backend().generate(&ready(engine), "Hi there").await;
        assert_eq!(result, GenerationResult::model("Hello! How are you?"));
    }

    #[test]
    fn test_backend_set_covers_every_kind() {
        let set = BackendSet::from_config(&GenerationConfig::default());
        for kind in BackendKind::ALL {
            assert_eq!(set.get(kind).kind(), kind);
        }
    }
}
