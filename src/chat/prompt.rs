use std::fs;
use std::path::Path;

use crate::core::config::defaults::DEFAULT_SYSTEM_PROMPT;
use crate::llm::types::Message;

/// Reads the system prompt template once at startup.
///
/// A missing or blank file falls back to the built-in prompt.
pub fn load_system_message(path: &Path) -> Message {
    match fs::read_to_string(path) {
        Ok(contents) if !contents.trim().is_empty() => {
            tracing::info!("Loaded system prompt from {}", path.display());
            Message::system(contents.trim_end())
        }
        Ok(_) => {
            tracing::warn!(
                "System prompt file {} is empty; using the default prompt",
                path.display()
            );
            Message::system(DEFAULT_SYSTEM_PROMPT)
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read system prompt {}: {}; using the default prompt",
                path.display(),
                err
            );
            Message::system(DEFAULT_SYSTEM_PROMPT)
        }
    }
}
