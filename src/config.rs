use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::{Result, ParleyError};
use crate::generate::BackendKind;
use crate::languages;

// Default values used when a section omits a field
fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_translate_timeout_secs() -> u64 {
    60
}

fn default_acquire_timeout_secs() -> u64 {
    600
}

fn default_generate_timeout_secs() -> u64 {
    120
}

fn default_end_of_turn() -> String {
    "<|endoftext|>".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub translate: TranslateConfig,
    pub generation: GenerationConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Turn statistical language detection on or off
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Turn the translation capability on or off
    pub enabled: bool,
    /// Ollama endpoint URL
    pub endpoint: String,
    /// LLM model to use for translation
    pub model: String,
    /// Upper bound for a single translation round-trip (seconds)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Turn the generation capability on or off
    pub enabled: bool,
    /// Ollama endpoint URL
    pub endpoint: String,
    /// Pull missing models on first use instead of marking them unavailable
    pub auto_pull: bool,
    /// Upper bound for loading (and optionally pulling) a backend model (seconds)
    pub acquire_timeout_secs: u64,
    /// Upper bound for a single generation call (seconds)
    pub generate_timeout_secs: u64,
    /// End-of-turn marker appended to the input of the causal dialogue backend
    pub end_of_turn: String,
    /// Model tag per backend kind
    pub models: BackendModels,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendModels {
    /// Causal dialogue model ("fast")
    pub causal_dialogue: String,
    /// Encoder-decoder conversational model ("better")
    pub conversational: String,
    /// Instruction-tuned model ("instruction")
    pub instruction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Normalize input to English and translate replies
    pub translation_enabled: bool,
    /// Backend label: fast, better or instruction
    pub backend: String,
    /// Output language: auto, english, spanish, ...
    pub output_language: String,
    /// Append-only conversation log
    pub history_path: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_endpoint(),
            model: "llama3.2:3b".to_string(),
            timeout_secs: default_translate_timeout_secs(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_endpoint(),
            auto_pull: false,
            acquire_timeout_secs: default_acquire_timeout_secs(),
            generate_timeout_secs: default_generate_timeout_secs(),
            end_of_turn: default_end_of_turn(),
            models: BackendModels::default(),
        }
    }
}

impl Default for BackendModels {
    fn default() -> Self {
        Self {
            causal_dialogue: "tinyllama:1.1b".to_string(),
            conversational: "llama3.2:3b".to_string(),
            instruction: "qwen2.5:3b-instruct".to_string(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            translation_enabled: true,
            backend: "fast".to_string(),
            output_language: "auto".to_string(),
            history_path: ".parley/history.jsonl".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            translate: TranslateConfig::default(),
            generation: GenerationConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl TranslateConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GenerationConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }
}

impl BackendModels {
    /// Model tag serving the given backend kind
    pub fn for_kind(&self, kind: BackendKind) -> &str {
        match kind {
            BackendKind::CausalDialogue => &self.causal_dialogue,
            BackendKind::ConversationalSeq2Seq => &self.conversational,
            BackendKind::InstructionSeq2Seq => &self.instruction,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ParleyError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ParleyError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ParleyError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject settings that can never work. Unknown labels and language names
    /// are only warned about: the pipeline falls back to its defaults for them.
    pub fn validate(&self) -> Result<()> {
        if self.translate.enabled {
            if self.translate.endpoint.trim().is_empty() {
                return Err(ParleyError::Config("translate.endpoint must not be empty".to_string()));
            }
            if self.translate.model.trim().is_empty() {
                return Err(ParleyError::Config("translate.model must not be empty".to_string()));
            }
        }

        if self.generation.enabled {
            if self.generation.endpoint.trim().is_empty() {
                return Err(ParleyError::Config("generation.endpoint must not be empty".to_string()));
            }
            for kind in BackendKind::ALL {
                if self.generation.models.for_kind(kind).trim().is_empty() {
                    return Err(ParleyError::Config(format!(
                        "generation.models entry for the {} backend must not be empty",
                        kind.label()
                    )));
                }
            }
            if self.generation.generate_timeout_secs == 0 || self.generation.acquire_timeout_secs == 0 {
                return Err(ParleyError::Config("generation timeouts must be greater than zero".to_string()));
            }
        }

        if self.translate.enabled && self.translate.timeout_secs == 0 {
            return Err(ParleyError::Config("translate.timeout_secs must be greater than zero".to_string()));
        }

        if !BackendKind::is_known_label(&self.chat.backend) {
            warn!("Unknown backend '{}', the causal dialogue backend will be used", self.chat.backend);
        }
        if !languages::is_output_choice(&self.chat.output_language) {
            warn!(
                "Unknown output language '{}', it will be passed to the translator verbatim",
                self.chat.output_language
            );
        }

        Ok(())
    }
}
