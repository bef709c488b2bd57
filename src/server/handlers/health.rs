use std::sync::Arc;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let profile = state.chatbot.window().profile();
    Json(json!({
        "status": "ok",
        "model": profile.identifier,
        "max_context_length": profile.max_context_length,
        "reserved_completion_tokens": profile.reserved_completion_tokens
    }))
}
