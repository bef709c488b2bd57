use std::path::Path;
use std::sync::Arc;

use crate::chat::prompt::load_system_message;
use crate::chat::{to_internal, ChatbotService};
use crate::context::{ContextWindowManager, ModelProfile, Tokenizer};
use crate::core::config::AppConfig;
use crate::llm::{
    AzureOpenAiProvider, ChatProvider, CompletionClient, GenerationOptions, RetryPolicy,
};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Everything in here is built once at startup and only read afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub chatbot: ChatbotService,
}

impl AppState {
    /// Builds the state against the configured Azure OpenAI deployment.
    ///
    /// Fails if the model has no known tokenizer, which is fatal because the
    /// model is fixed for the lifetime of the process.
    pub fn initialize(config: AppConfig) -> Result<Arc<Self>, InitializationError> {
        let provider = Arc::new(AzureOpenAiProvider::new(&config.azure_openai));
        Self::with_provider(config, provider)
    }

    pub fn with_provider(
        config: AppConfig,
        provider: Arc<dyn ChatProvider>,
    ) -> Result<Arc<Self>, InitializationError> {
        let azure = &config.azure_openai;

        let tokenizer = Tokenizer::load(&[azure.model.as_str()])
            .map_err(InitializationError::Tokenizer)?;
        let tokenizer = Arc::new(tokenizer);
        let profile = ModelProfile::resolve(
            tokenizer.as_ref(),
            &azure.model,
            azure.max_tokens,
            azure.max_context_length,
        )
        .map_err(InitializationError::Tokenizer)?;
        if profile.reserved_completion_tokens >= profile.max_context_length {
            return Err(InitializationError::ContextBudget {
                model: profile.identifier,
                max_context_length: profile.max_context_length,
                reserved: profile.reserved_completion_tokens,
            });
        }
        tracing::info!(
            "Model profile: {} (context {} tokens, {} reserved for completion)",
            profile.identifier,
            profile.max_context_length,
            profile.reserved_completion_tokens
        );

        let options = GenerationOptions {
            model: azure.model.clone(),
            max_tokens: azure.max_tokens,
            temperature: azure.temperature,
        };
        let completion =
            CompletionClient::new(provider, options, RetryPolicy::from(&config.retry));
        let window = ContextWindowManager::new(tokenizer, profile);
        let system_message = load_system_message(Path::new(&config.prompt.system_prompt_path));

        let chatbot = ChatbotService::new(completion, window, system_message, to_internal);

        Ok(Arc::new(AppState {
            config: Arc::new(config),
            chatbot,
        }))
    }
}
