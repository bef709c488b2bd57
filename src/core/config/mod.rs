pub mod app_config;
pub mod defaults;
pub mod service;
pub mod validation;

pub use app_config::{AppConfig, AzureOpenAiConfig, RetryConfig};
pub use service::{ConfigError, ConfigService};
