use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::{Stream, StreamExt};
use tracing::Instrument;
use uuid::Uuid;

use crate::chat::ChatMessageDto;
use crate::core::errors::ApiError;
use crate::state::AppState;

/// Requests a completion for the full client-side history and returns the
/// reply as plain text.
pub async fn completion(
    State(state): State<Arc<AppState>>,
    Json(messages): Json<Vec<ChatMessageDto>>,
) -> Result<impl IntoResponse, ApiError> {
    let span = tracing::info_span!("completion", request_id = %Uuid::new_v4());
    async move {
        tracing::info!("Calling /chat/completion with {} message(s)", messages.len());
        let reply = state.chatbot.completion(&messages).await?;
        Ok::<_, ApiError>((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            reply,
        ))
    }
    .instrument(span)
    .await
}

/// Streams the reply as server-sent events, one `data:` event per fragment.
pub async fn completion_stream(
    State(state): State<Arc<AppState>>,
    Json(messages): Json<Vec<ChatMessageDto>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let span = tracing::info_span!("completion_stream", request_id = %Uuid::new_v4());
    let mut fragments = async {
        tracing::info!(
            "Calling /chat/completion/stream with {} message(s)",
            messages.len()
        );
        state.chatbot.completion_stream(&messages).await
    }
    .instrument(span)
    .await?;

    // Dropped when the client disconnects, which cancels the upstream call.
    let stream = async_stream::stream! {
        let mut count = 0usize;
        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => {
                    count += 1;
                    yield Ok(Event::default().data(normalize_line_endings(&fragment)));
                }
                Err(err) => {
                    tracing::warn!("Ending stream after {} fragment(s): {}", count, err);
                    break;
                }
            }
        }
        tracing::debug!("Stream finished after {} fragment(s)", count);
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// SSE fields cannot carry `\r`; multi-line data is split into one `data:`
/// line per `\n`, which clients join back with `\n`.
fn normalize_line_endings(fragment: &str) -> String {
    if !fragment.contains('\r') {
        return fragment.to_string();
    }
    fragment.replace("\r\n", "\n").replace('\r', "\n")
}
