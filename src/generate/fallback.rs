use std::sync::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};

use super::GenerationResult;

/// Canned replies for when no generation backend exists at all.
///
/// The random source is injected so tests can seed it.
pub struct FallbackResponder {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl FallbackResponder {
    pub fn new(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Every reply the responder may choose for `text`
    pub fn candidates(text: &str) -> Vec<String> {
        vec![
            format!("I understand you said: '{}'. Unfortunately, AI models are not loaded yet.", text),
            format!("Thank you for your message: '{}'. Please install the required dependencies to enable AI responses.", text),
            format!("I received your message: '{}'. To get intelligent responses, please start ollama and pull the configured models.", text),
            format!("Your message '{}' was received. Configure a generation backend to enable AI chat features.", text),
        ]
    }

    /// Pick one candidate uniformly at random
    pub fn respond(&self, text: &str) -> GenerationResult {
        let candidates = Self::candidates(text);
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let reply = candidates
            .choose(&mut **rng)
            .cloned()
            .unwrap_or_else(|| format!("I received your message: '{}'.", text));
        GenerationResult::canned(reply)
    }
}
