use std::time::Duration;
use async_trait::async_trait;

use super::{
    BackendKind, DecodingPolicy, GenerationBackend, MaxLength, PreparedPrompt, estimate_tokens,
};

/// Beam search over sampled continuations, no repeated bigrams, and a
/// response window of the prompt plus 100 tokens.
pub const CAUSAL_POLICY: DecodingPolicy = DecodingPolicy {
    num_beams: 5,
    no_repeat_ngram_size: Some(2),
    do_sample: true,
    temperature: 0.7,
    length: MaxLength::InputPlus(100),
};

/// Reply when the dialogue model produced nothing
pub const CAUSAL_EMPTY_REPLY: &str = "I'm not sure how to respond to that. Could you try rephrasing?";

/// Decoder-only dialogue backend. The user turn is closed with an end-of-turn
/// marker and the model continues with its own turn.
pub struct CausalDialogueBackend {
    end_of_turn: String,
    timeout: Duration,
}

impl CausalDialogueBackend {
    pub fn new(end_of_turn: String, timeout: Duration) -> Self {
        Self { end_of_turn, timeout }
    }
}

#[async_trait]
impl GenerationBackend for CausalDialogueBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CausalDialogue
    }

    fn policy(&self) -> &DecodingPolicy {
        &CAUSAL_POLICY
    }

    fn prepare(&self, text: &str) -> PreparedPrompt {
        let prompt = format!("{}{}", text, self.end_of_turn);
        let input_tokens = estimate_tokens(&prompt);
        PreparedPrompt {
            prompt,
            raw: true,
            max_new_tokens: CAUSAL_POLICY.max_new_tokens(input_tokens),
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn empty_reply(&self) -> &'static str {
        CAUSAL_EMPTY_REPLY
    }

    // Only the newly generated suffix is the reply
    fn extract_reply(&self, prompt: &PreparedPrompt, output: &str) -> String {
        let suffix = output.strip_prefix(prompt.prompt.as_str()).unwrap_or(output);
        if self.end_of_turn.is_empty() {
            return suffix.to_string();
        }
        suffix
            .split(self.end_of_turn.as_str())
            .find(|segment| !segment.trim().is_empty())
            .unwrap_or("")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::generate::{BackendHandle, GenerationResult, LoadedModel, MockInferenceEngine};

    fn backend() -> CausalDialogueBackend {
        CausalDialogueBackend::new("<|endoftext|>".to_string(), Duration::from_secs(5))
    }

    #[test]
    fn test_prompt_closes_the_user_turn() {
        let prepared = backend().prepare("How are you?");
        assert_eq!(prepared.prompt, "How are you?<|endoftext|>");
        assert!(prepared.raw);
        assert_eq!(prepared.max_new_tokens, 100);
    }

    #[test]
    fn test_extract_reply_drops_echoed_prompt() {
        let backend = backend();
        let prepared = backend.prepare("How are you?");

        let echoed = "How are you?<|endoftext|>I'm fine, thanks!<|endoftext|>";
        assert_eq!(backend.extract_reply(&prepared, echoed), "I'm fine, thanks!");

        let suffix_only = "I'm fine, thanks!";
        assert_eq!(backend.extract_reply(&prepared, suffix_only), "I'm fine, thanks!");
    }

    #[tokio::test]
    async fn test_reply_after_leading_marker_is_kept() {
        let mut engine = MockInferenceEngine::new();
        engine.expect_complete()
            .returning(|_, _, _| Ok("<|endoftext|>I'm fine, thanks!".to_string()));

        let handle = BackendHandle::Ready(Arc::new(LoadedModel::new(
            BackendKind::CausalDialogue,
            "dialogue",
            Arc::new(engine),
        )));

        let result = backend().generate(&handle, "How are you?").await;
        assert_eq!(result, GenerationResult::model("I'm fine, thanks!"));
    }

    #[tokio::test]
    async fn test_marker_only_output_uses_clarifying_reply() {
        let mut engine = MockInferenceEngine::new();
        engine.expect_complete()
            .withf(|_, prompt, policy| prompt.raw && policy.no_repeat_ngram_size == Some(2))
            .returning(|_, _, _| Ok("<|endoftext|>".to_string()));

        let handle = BackendHandle::Ready(Arc::new(LoadedModel::new(
            BackendKind::CausalDialogue,
            "dialogue",
            Arc::new(engine),
        )));

        let result = backend().generate(&handle, "Hmm").await;
        assert_eq!(result, GenerationResult::canned(CAUSAL_EMPTY_REPLY));
    }
}
