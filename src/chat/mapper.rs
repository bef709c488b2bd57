use serde::{Deserialize, Serialize};

use crate::core::errors::ChatError;
use crate::llm::types::{Message, Role};

/// A message as sent by the client, with role "user" or "assistant".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageDto {
    pub role: String,
    pub content: String,
}

impl ChatMessageDto {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Converts a client role/content pair into a [`Message`].
pub type MessageConverter = fn(&str, &str) -> Result<Message, ChatError>;

/// Default [`MessageConverter`]. Roles match case-insensitively and the
/// system role is rejected; it is only ever injected by the service.
pub fn to_internal(role: &str, content: &str) -> Result<Message, ChatError> {
    let role = role.trim();
    if role.eq_ignore_ascii_case(Role::User.as_str()) {
        Ok(Message::user(content))
    } else if role.eq_ignore_ascii_case(Role::Assistant.as_str()) {
        Ok(Message::assistant(content))
    } else {
        Err(ChatError::InvalidRole(role.to_string()))
    }
}
