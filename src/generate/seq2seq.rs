use std::time::Duration;
use async_trait::async_trait;

use super::{BackendKind, DecodingPolicy, GenerationBackend, MaxLength, PreparedPrompt};

/// Beam search over sampled outputs, capped at 100 tokens
pub const SEQ2SEQ_POLICY: DecodingPolicy = DecodingPolicy {
    num_beams: 5,
    no_repeat_ngram_size: None,
    do_sample: true,
    temperature: 0.7,
    length: MaxLength::Fixed(100),
};

/// Template wrapped around user text for the instruction backend
pub const INSTRUCTION_TEMPLATE: &str = "Answer this question or respond to this statement: ";

fn seq2seq_prompt(prompt: String) -> PreparedPrompt {
    PreparedPrompt {
        prompt,
        raw: false,
        max_new_tokens: SEQ2SEQ_POLICY.max_new_tokens(0),
    }
}

/// Open-domain conversational model; the user text is the whole utterance
pub struct ConversationalBackend {
    timeout: Duration,
}

impl ConversationalBackend {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl GenerationBackend for ConversationalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ConversationalSeq2Seq
    }

    fn policy(&self) -> &DecodingPolicy {
        &SEQ2SEQ_POLICY
    }

    fn prepare(&self, text: &str) -> PreparedPrompt {
        seq2seq_prompt(text.to_string())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Instruction-following model prompted through a fixed template
pub struct InstructionBackend {
    timeout: Duration,
}

impl InstructionBackend {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl GenerationBackend for InstructionBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::InstructionSeq2Seq
    }

    fn policy(&self) -> &DecodingPolicy {
        &SEQ2SEQ_POLICY
    }

    fn prepare(&self, text: &str) -> PreparedPrompt {
        seq2seq_prompt(format!("{}{}", INSTRUCTION_TEMPLATE, text))
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
