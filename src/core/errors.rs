use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures produced while serving a chat completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Body should contain at least 1 message.")]
    EmptyRequest,
    #[error("Question's length is too big.")]
    PromptTooLarge,
    #[error("invalid message role: {0}")]
    InvalidRole(String),
    #[error("upstream rate limited: {0}")]
    RateLimited(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("unknown model: {0}")]
    UnknownModel(String),
}

impl ChatError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ChatError::RateLimited(_))
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyRequest | ChatError::PromptTooLarge | ChatError::InvalidRole(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ChatError::RateLimited(detail) => {
                tracing::error!("Upstream still rate limited after retries: {}", detail);
                ApiError::ServiceUnavailable
            }
            ChatError::Upstream(detail) | ChatError::UnknownModel(detail) => {
                tracing::error!("Completion failed: {}", detail);
                ApiError::Internal("An internal server error occurred.".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
