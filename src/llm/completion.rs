use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;
use reqwest::StatusCode;

use super::provider::{ChatProvider, FragmentReceiver, ProviderError};
use super::retry::RetryPolicy;
use super::types::{Generation, GenerationOptions, Prompt};
use crate::core::errors::ChatError;

/// Ordered, non-empty reply fragments. An `Err` item ends the stream.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// Maps a provider failure onto the error taxonomy callers see.
pub fn classify(err: ProviderError) -> ChatError {
    tracing::error!("Upstream call failed: {}", err);
    match err.status {
        Some(StatusCode::TOO_MANY_REQUESTS) => ChatError::RateLimited(err.message),
        _ => ChatError::Upstream(err.message),
    }
}

/// Sends prompts upstream, retrying rate-limited attempts per [`RetryPolicy`].
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn ChatProvider>,
    options: GenerationOptions,
    retry: RetryPolicy,
}

impl CompletionClient {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        options: GenerationOptions,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            options,
            retry,
        }
    }

    pub async fn complete(&self, prompt: &Prompt) -> Result<Generation, ChatError> {
        self.retry
            .run(|attempt| async move {
                tracing::debug!(
                    "Sending completion to {} (attempt {})",
                    self.provider.name(),
                    attempt
                );
                self.provider
                    .chat(prompt, &self.options)
                    .await
                    .map(Generation::new)
                    .map_err(classify)
            })
            .await
    }

    /// Opens a streaming completion.
    ///
    /// The call resolves once the first non-empty fragment has arrived, so
    /// any failure before output exists goes through the retry policy.
    /// Failures after that end the returned stream and are not retried.
    pub async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream, ChatError> {
        let (first, rx) = self
            .retry
            .run(|attempt| async move {
                tracing::debug!(
                    "Opening completion stream to {} (attempt {})",
                    self.provider.name(),
                    attempt
                );
                self.open_stream(prompt).await
            })
            .await?;

        Ok(fragments(first, rx))
    }

    async fn open_stream(
        &self,
        prompt: &Prompt,
    ) -> Result<(Option<String>, FragmentReceiver), ChatError> {
        let mut rx = self
            .provider
            .stream_chat(prompt, &self.options)
            .await
            .map_err(classify)?;

        while let Some(item) = rx.recv().await {
            match item {
                Ok(fragment) if fragment.is_empty() => continue,
                Ok(fragment) => return Ok((Some(fragment), rx)),
                Err(e) => return Err(classify(e)),
            }
        }

        // Upstream finished without producing any text.
        Ok((None, rx))
    }
}

fn fragments(first: Option<String>, mut rx: FragmentReceiver) -> FragmentStream {
    Box::pin(async_stream::stream! {
        if let Some(first) = first {
            yield Ok(first);
        }
        while let Some(item) = rx.recv().await {
            match item {
                Ok(fragment) if fragment.is_empty() => continue,
                Ok(fragment) => yield Ok(fragment),
                Err(e) => {
                    let err = classify(e);
                    tracing::warn!("Completion stream terminated after partial output");
                    yield Err(err);
                    break;
                }
            }
        }
    })
}
