use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::errors::ChatError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize tokenizer: {0}")]
    Tokenizer(#[source] ChatError),

    #[error(
        "max_tokens ({reserved}) leaves no room for a prompt in the {max_context_length} token context of {model}"
    )]
    ContextBudget {
        model: String,
        max_context_length: usize,
        reserved: usize,
    },
}
