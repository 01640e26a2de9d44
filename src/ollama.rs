//! Thin client for the ollama HTTP API.
//!
//! Translation, generation and the capability probe all talk to ollama; this
//! module owns the wire types and status handling they share.

use std::time::Duration;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Result, ParleyError};

/// Sampling and length options understood by `/api/generate`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    /// Skip the model's prompt template and send `prompt` as-is
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub raw: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub done: bool,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
}

impl OllamaClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.endpoint, path)
    }

    /// Run a non-streaming completion and return the raw response text
    pub async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let url = self.url("generate");
        debug!("Sending generate request for model {} to {}", request.model, url);

        let response = self.client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ParleyError::Generation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ParleyError::Generation(format!(
                "Ollama API error {}: {}", status, error_text
            )));
        }

        let body: GenerateResponse = response.json().await
            .map_err(|e| ParleyError::Generation(format!("Failed to parse response: {}", e)))?;

        debug!("Raw ollama response: {}", body.response);
        Ok(body.response)
    }

    /// Whether `model` is present locally
    pub async fn has_model(&self, model: &str) -> Result<bool> {
        let response = self.client
            .post(self.url("show"))
            .json(&json!({ "name": model }))
            .send()
            .await
            .map_err(|e| ParleyError::ModelUnavailable(format!("Failed to connect to Ollama: {}", e)))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(ParleyError::ModelUnavailable(format!(
                "Ollama rejected model lookup for '{}' with HTTP {}", model, status
            ))),
        }
    }

    /// Pull `model`, blocking until the download finishes
    pub async fn pull_model(&self, model: &str) -> Result<()> {
        info!("Pulling ollama model '{}'", model);

        let response = self.client
            .post(self.url("pull"))
            .json(&json!({ "name": model, "stream": false }))
            .send()
            .await
            .map_err(|e| ParleyError::ModelUnavailable(format!("Failed to connect to Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ParleyError::ModelUnavailable(format!(
                "Failed to pull model '{}': HTTP {} {}", model, status, error_text
            )));
        }

        info!("Pulled ollama model '{}'", model);
        Ok(())
    }

    /// Names of the locally available models; doubles as a liveness check
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self.client
            .get(self.url("tags"))
            .send()
            .await
            .map_err(|e| ParleyError::ModelUnavailable(format!("Failed to connect to Ollama: {}", e)))?;

        if !response.status().is_success() {
            return Err(ParleyError::ModelUnavailable(format!(
                "Ollama at {} answered HTTP {}", self.endpoint, response.status()
            )));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Fail unless `model` is present locally
    pub async fn ensure_model(&self, model: &str) -> Result<()> {
        if self.has_model(model).await? {
            info!("Ollama model '{}' is available", model);
            Ok(())
        } else {
            Err(ParleyError::ModelUnavailable(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                model, model
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434");
        assert_eq!(client.url("generate"), "http://localhost:11434/api/generate");
    }

    #[test]
    fn test_generate_request_omits_unset_fields() {
        let request = GenerateRequest {
            model: "llama3.2:3b".to_string(),
            prompt: "hi".to_string(),
            stream: false,
            raw: false,
            format: None,
            options: Some(GenerateOptions {
                temperature: Some(0.7),
                num_predict: Some(100),
            }),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("raw").is_none());
        assert!(value.get("format").is_none());
        assert_eq!(value["options"]["num_predict"], 100);
        assert_eq!(value["stream"], false);
    }
}
