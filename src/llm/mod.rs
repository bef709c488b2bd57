pub mod azure;
pub mod completion;
pub mod provider;
pub mod retry;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

pub use azure::AzureOpenAiProvider;
pub use completion::{CompletionClient, FragmentStream};
pub use provider::{ChatProvider, ProviderError};
pub use retry::RetryPolicy;
pub use types::{Generation, GenerationOptions, Message, Prompt, Role};
