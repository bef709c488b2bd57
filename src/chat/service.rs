use crate::chat::mapper::{ChatMessageDto, MessageConverter};
use crate::context::ContextWindowManager;
use crate::core::errors::ChatError;
use crate::llm::completion::{CompletionClient, FragmentStream};
use crate::llm::types::{Message, Prompt};

/// Validates, trims and forwards client conversations.
///
/// Holds no per-request state; every call receives the full history.
#[derive(Clone)]
pub struct ChatbotService {
    completion: CompletionClient,
    window: ContextWindowManager,
    system_message: Message,
    converter: MessageConverter,
}

impl ChatbotService {
    pub fn new(
        completion: CompletionClient,
        window: ContextWindowManager,
        system_message: Message,
        converter: MessageConverter,
    ) -> Self {
        Self {
            completion,
            window,
            system_message,
            converter,
        }
    }

    pub fn window(&self) -> &ContextWindowManager {
        &self.window
    }

    /// One-shot completion returning the reply text.
    pub async fn completion(&self, messages: &[ChatMessageDto]) -> Result<String, ChatError> {
        let prompt = self.build_prompt(messages)?;
        let generation = self.completion.complete(&prompt).await?;
        Ok(generation.content)
    }

    /// Streaming completion. Errors before the first fragment fail the call;
    /// later errors end the returned stream.
    pub async fn completion_stream(
        &self,
        messages: &[ChatMessageDto],
    ) -> Result<FragmentStream, ChatError> {
        let prompt = self.build_prompt(messages)?;
        self.completion.stream(&prompt).await
    }

    fn build_prompt(&self, messages: &[ChatMessageDto]) -> Result<Prompt, ChatError> {
        if messages.is_empty() {
            return Err(ChatError::EmptyRequest);
        }

        let conversation = messages
            .iter()
            .map(|dto| (self.converter)(&dto.role, &dto.content))
            .collect::<Result<Vec<_>, _>>()?;

        let trimmed = self.window.trim(&conversation, &self.system_message)?;
        if trimmed.is_empty() {
            tracing::warn!(
                "Rejecting request: latest message does not fit the {} token context window",
                self.window.profile().max_context_length
            );
            return Err(ChatError::PromptTooLarge);
        }

        Ok(Prompt::new(&self.system_message, &trimmed))
    }
}
