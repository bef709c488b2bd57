//! Token counting backed by tiktoken BPE encoders.
//!
//! Encoders are resolved once when the tokenizer is loaded and then only
//! read, so a single [`Tokenizer`] is shared by every request.

use std::collections::HashMap;

use tiktoken_rs::CoreBPE;

use crate::core::errors::ChatError;

/// Counts tokens for a model identifier.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, model: &str, text: &str) -> Result<usize, ChatError>;

    fn max_context_length(&self, model: &str) -> Result<usize, ChatError>;
}

struct ModelEncoding {
    bpe: CoreBPE,
    max_context_length: usize,
}

pub struct Tokenizer {
    encodings: HashMap<String, ModelEncoding>,
}

impl Tokenizer {
    /// Resolves an encoder for every model up front.
    ///
    /// Fails with [`ChatError::UnknownModel`] if any identifier has no known
    /// encoding.
    pub fn load(models: &[&str]) -> Result<Self, ChatError> {
        let mut encodings = HashMap::new();
        for &model in models {
            let canonical = canonical_model_name(model);
            let bpe = tiktoken_rs::get_bpe_from_model(&canonical).map_err(|e| {
                tracing::error!("Could not resolve an encoding for model {}: {}", model, e);
                ChatError::UnknownModel(model.to_string())
            })?;
            let max_context_length = tiktoken_rs::model::get_context_size(&canonical);
            tracing::info!(
                "Loaded tokenizer for {} (context length {})",
                model,
                max_context_length
            );
            encodings.insert(
                model.to_string(),
                ModelEncoding {
                    bpe,
                    max_context_length,
                },
            );
        }
        Ok(Self { encodings })
    }

    fn encoding(&self, model: &str) -> Result<&ModelEncoding, ChatError> {
        self.encodings
            .get(model)
            .ok_or_else(|| ChatError::UnknownModel(model.to_string()))
    }
}

impl TokenCounter for Tokenizer {
    fn count_tokens(&self, model: &str, text: &str) -> Result<usize, ChatError> {
        Ok(self.encoding(model)?.bpe.encode_with_special_tokens(text).len())
    }

    fn max_context_length(&self, model: &str) -> Result<usize, ChatError> {
        Ok(self.encoding(model)?.max_context_length)
    }
}

/// Azure deployments spell GPT-3.5 as `gpt-35`.
fn canonical_model_name(model: &str) -> String {
    model.trim().to_lowercase().replace("gpt-35", "gpt-3.5")
}
