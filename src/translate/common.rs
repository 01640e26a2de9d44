use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TranslateConfig;
use crate::error::{Result, ParleyError};
use crate::languages;
use crate::ollama::{GenerateOptions, GenerateRequest, OllamaClient};
use super::TranslationEngine;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
}

/// Translation through an ollama-served LLM, asking for JSON output
pub struct OllamaTranslationEngine {
    client: OllamaClient,
    config: TranslateConfig,
}

impl OllamaTranslationEngine {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = OllamaClient::new(&config.endpoint, config.timeout())?;
        Ok(Self { client, config })
    }

    /// Build translation prompt, using JSON format
    fn build_translation_prompt(&self, text: &str, target_code: &str) -> String {
        let language_name = language_display_name(target_code);

        format!(
            "You are a professional translator.\n\
             \n\
             CRITICAL: You must translate the text to {} ONLY. Do not translate to any other language.\n\
             The target language is: {} (language code: {})\n\
             \n\
             Return ONLY the translation in JSON format as {{\"text\":\"your {} translation here\"}}.\n\
             Do not include any explanations, alternatives, or text in other languages.\n\
             \n\
             [Text to translate]\n\
             {}\n",
            language_name, language_name, target_code, language_name, text
        )
    }
}

#[async_trait]
impl TranslationEngine for OllamaTranslationEngine {
    async fn translate_text(&self, text: &str, target_code: &str) -> Result<String> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: self.build_translation_prompt(text, target_code),
            stream: false,
            raw: false,
            format: Some("json".to_string()),
            options: Some(GenerateOptions {
                temperature: Some(0.0),
                num_predict: None,
            }),
        };

        let raw_response = self.client
            .generate(&request)
            .await
            .map_err(|e| ParleyError::Translation(e.to_string()))?;
        let raw_response = raw_response.trim();

        if raw_response.is_empty() {
            return Err(ParleyError::Translation("Empty translation received".to_string()));
        }

        if let Ok(result) = serde_json::from_str::<TranslationResult>(raw_response) {
            debug!("Parsed JSON translation into {}", target_code);
            return Ok(result.text.trim().to_string());
        }

        if let Some(text) = json_string_field(raw_response) {
            debug!("Parsed JSON translation under an unexpected key into {}", target_code);
            return Ok(text);
        }

        Ok(clean_translation_response(raw_response))
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

/// Language name for prompts; codes outside the table are used as given
fn language_display_name(code: &str) -> String {
    match languages::name_of(code) {
        Some(_) => languages::label_of(code),
        None => code.to_string(),
    }
}

/// First non-empty string value of a JSON object, whatever its key
fn json_string_field(response: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(response).ok()?;
    value
        .as_object()?
        .values()
        .filter_map(|field| field.as_str())
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// Clean up translation response to extract just the translation
fn clean_translation_response(response: &str) -> String {
    let lines: Vec<&str> = response.lines().collect();

    for &line in &lines {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with("Here are") ||
           trimmed.starts_with("Here is") ||
           trimmed.starts_with("Option") ||
           trimmed.starts_with("**Option") ||
           trimmed.starts_with("Translation:") ||
           trimmed.starts_with("- ") ||
           trimmed.starts_with("* ") {
            continue;
        }

        if trimmed.starts_with("**") && trimmed.ends_with("**") {
            continue;
        }

        if trimmed.len() > 3 {
            return trimmed.to_string();
        }
    }

    for &line in &lines {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    response.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_the_target_language() {
        let engine = OllamaTranslationEngine::new(TranslateConfig::default()).unwrap();
        let prompt = engine.build_translation_prompt("¿Dónde está la biblioteca?", "en");
        assert!(prompt.contains("translate the text to English ONLY"));
        assert!(prompt.contains("(language code: en)"));
        assert!(prompt.contains("¿Dónde está la biblioteca?"));
    }

    #[test]
    fn test_language_display_name() {
        assert_eq!(language_display_name("ja"), "Japanese");
        assert_eq!(language_display_name("Dutch"), "Dutch");
    }

    #[test]
    fn test_clean_translation_response_skips_preamble() {
        let response = "Here is the translation:\n\n**Translation**\nWhere is the library?\n- alternative";
        assert_eq!(clean_translation_response(response), "Where is the library?");
    }

    #[test]
    fn test_json_under_another_key_is_unwrapped() {
        assert_eq!(
            json_string_field(r#"{"translation": " Where is the library? "}"#).as_deref(),
            Some("Where is the library?")
        );
        assert_eq!(json_string_field(r#"{"text": ""}"#), None);
        assert_eq!(json_string_field("Where is the library?"), None);
    }

    #[test]
    fn test_clean_translation_response_keeps_short_text() {
        assert_eq!(clean_translation_response("\n  Hi \n"), "Hi");
    }
}
