use std::sync::Arc;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::{BackendModels, GenerationConfig};
use crate::error::{Result, ParleyError};
use crate::ollama::{GenerateOptions, GenerateRequest, OllamaClient};
use super::{BackendKind, DecodingPolicy, InferenceEngine, LoadedModel, ModelLoader, PreparedPrompt};

/// Inference through ollama's `/api/generate`
pub struct OllamaEngine {
    client: OllamaClient,
}

impl OllamaEngine {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(&config.endpoint, config.generate_timeout())?,
        })
    }
}

#[async_trait]
impl InferenceEngine for OllamaEngine {
    async fn complete(&self, model: &str, prompt: &PreparedPrompt, policy: &DecodingPolicy) -> Result<String> {
        // ollama samples a single sequence; beam width and n-gram blocking stay advisory
        debug!(
            "Decoding policy for {}: beams={}, no_repeat_ngram={:?}",
            model, policy.num_beams, policy.no_repeat_ngram_size
        );

        let request = GenerateRequest {
            model: model.to_string(),
            prompt: prompt.prompt.clone(),
            stream: false,
            raw: prompt.raw,
            format: None,
            options: Some(GenerateOptions {
                temperature: Some(policy.sampling_temperature()),
                num_predict: Some(prompt.max_new_tokens),
            }),
        };

        self.client.generate(&request).await
    }
}

/// Acquires backend models from a local ollama server, pulling them on
/// demand when `auto_pull` is set.
pub struct OllamaModelLoader {
    client: OllamaClient,
    engine: Arc<OllamaEngine>,
    models: BackendModels,
    auto_pull: bool,
}

impl OllamaModelLoader {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(&config.endpoint, config.acquire_timeout())?,
            engine: Arc::new(OllamaEngine::new(config)?),
            models: config.models.clone(),
            auto_pull: config.auto_pull,
        })
    }
}

#[async_trait]
impl ModelLoader for OllamaModelLoader {
    async fn load(&self, kind: BackendKind) -> Result<LoadedModel> {
        let model = self.models.for_kind(kind);
        info!("Acquiring model '{}' for the {} backend", model, kind);

        if !self.client.has_model(model).await? {
            if !self.auto_pull {
                return Err(ParleyError::ModelUnavailable(format!(
                    "Ollama model '{}' not found. Pull it with `ollama pull {}` or set generation.auto_pull",
                    model, model
                )));
            }
            self.client.pull_model(model).await?;
        }

        Ok(LoadedModel::new(kind, model, self.engine.clone()))
    }
}
