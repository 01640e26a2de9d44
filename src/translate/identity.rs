use async_trait::async_trait;

use crate::error::Result;
use super::TranslationEngine;

/// Returns its input unchanged
pub struct IdentityEngine;

#[async_trait]
impl TranslationEngine for IdentityEngine {
    async fn translate_text(&self, text: &str, _target_code: &str) -> Result<String> {
        Ok(text.to_string())
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}
