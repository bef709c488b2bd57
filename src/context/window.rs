//! Context Window Manager.
//!
//! Keeps a prompt inside the model's context window by dropping the
//! oldest conversation messages until
//! `system + conversation + reserved completion tokens <= max context`.

use std::sync::Arc;

use super::tokenizer::TokenCounter;
use crate::core::errors::ChatError;
use crate::llm::types::Message;

/// Token limits of the deployed model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProfile {
    pub identifier: String,
    pub max_context_length: usize,
    /// Tokens kept free for the completion itself.
    pub reserved_completion_tokens: usize,
}

impl ModelProfile {
    /// Builds the profile for `identifier`, taking the context length from
    /// the tokenizer unless `max_context_override` is set.
    pub fn resolve(
        counter: &dyn TokenCounter,
        identifier: &str,
        reserved_completion_tokens: usize,
        max_context_override: Option<usize>,
    ) -> Result<Self, ChatError> {
        let max_context_length = match max_context_override {
            Some(value) => value,
            None => counter.max_context_length(identifier)?,
        };
        Ok(Self {
            identifier: identifier.to_string(),
            max_context_length,
            reserved_completion_tokens,
        })
    }
}

#[derive(Clone)]
pub struct ContextWindowManager {
    counter: Arc<dyn TokenCounter>,
    profile: ModelProfile,
}

impl ContextWindowManager {
    pub fn new(counter: Arc<dyn TokenCounter>, profile: ModelProfile) -> Self {
        Self { counter, profile }
    }

    pub fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    /// Tokens used by the system message plus `conversation`.
    pub fn total_tokens(
        &self,
        system: &Message,
        conversation: &[Message],
    ) -> Result<usize, ChatError> {
        let mut text = String::from(system.content());
        for message in conversation {
            text.push_str(message.content());
        }
        self.counter.count_tokens(&self.profile.identifier, &text)
    }

    pub fn fits(&self, system: &Message, conversation: &[Message]) -> Result<bool, ChatError> {
        let used = self.total_tokens(system, conversation)?;
        Ok(used + self.profile.reserved_completion_tokens <= self.profile.max_context_length)
    }

    /// Returns the longest suffix of `conversation` that fits the window.
    ///
    /// The result is empty when not even the most recent message fits;
    /// callers must reject such a request rather than send it.
    pub fn trim(
        &self,
        conversation: &[Message],
        system: &Message,
    ) -> Result<Vec<Message>, ChatError> {
        for start in 0..conversation.len() {
            let candidate = &conversation[start..];
            if self.fits(system, candidate)? {
                if start > 0 {
                    tracing::info!(
                        "Dropped {} oldest message(s) to fit the {} token context window",
                        start,
                        self.profile.max_context_length
                    );
                }
                return Ok(candidate.to_vec());
            }
        }
        Ok(Vec::new())
    }
}
