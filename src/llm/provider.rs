use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::mpsc;

use super::types::{GenerationOptions, Prompt};

/// Raw failure reported by an upstream provider.
///
/// `status` is set when the provider answered with an HTTP error status;
/// transport and decoding failures leave it empty.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub status: Option<StatusCode>,
    pub message: String,
}

impl ProviderError {
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn other<E: std::fmt::Display>(err: E) -> Self {
        Self {
            status: None,
            message: err.to_string(),
        }
    }
}

pub type FragmentReceiver = mpsc::Receiver<Result<String, ProviderError>>;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// return the provider name (e.g. "azure_openai")
    fn name(&self) -> &str;

    /// chat completion (non-streaming)
    async fn chat(
        &self,
        prompt: &Prompt,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError>;

    /// chat completion (streaming); fragments arrive in upstream order
    async fn stream_chat(
        &self,
        prompt: &Prompt,
        options: &GenerationOptions,
    ) -> Result<FragmentReceiver, ProviderError>;
}
