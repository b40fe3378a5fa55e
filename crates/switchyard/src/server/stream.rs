use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;

use crate::dispatcher::{DispatchError, DispatchOutcome};
use crate::server::chat::ChatRequest;
use crate::server::error::{ApiError, ApiErrorBody};
use crate::server::ServerState;

/// One server-sent event of a streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StreamChunk {
    /// Handler that produced the reply, `unknown` when routing failed.
    Agent(String),
    /// One word of the reply followed by a space.
    Word(String),
    /// `{thread_id, agent_used, error}`; always last.
    Done(Value),
}

impl StreamChunk {
    fn into_event(self) -> Event {
        match self {
            StreamChunk::Agent(name) => Event::default().event("agent").data(name),
            StreamChunk::Word(word) => Event::default().event("message").data(word),
            StreamChunk::Done(summary) => Event::default().event("done").data(summary.to_string()),
        }
    }
}

pub(crate) fn stream_chunks(outcome: DispatchOutcome, thread_id: String) -> Vec<StreamChunk> {
    let agent = outcome
        .selected_handler
        .clone()
        .unwrap_or_else(|| "unknown".to_string());
    let mut chunks = vec![StreamChunk::Agent(agent)];
    chunks.extend(
        outcome
            .output
            .split_whitespace()
            .map(|word| StreamChunk::Word(format!("{word} "))),
    );
    let error = outcome.error.as_ref().map(ApiErrorBody::from);
    chunks.push(StreamChunk::Done(json!({
        "thread_id": thread_id,
        "agent_used": outcome.selected_handler,
        "error": error,
    })));
    chunks
}

/// Dispatch one message and stream the reply word by word as SSE. The same
/// failures as `/chat` are HTTP errors; everything else is streamed.
#[tracing::instrument(skip_all, fields(thread_id = %payload.thread_id))]
pub(crate) async fn stream_chat(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let outcome = state
        .dispatcher
        .handle(&payload.thread_id, &payload.message)
        .await;
    if let Some(error @ (DispatchError::InvalidInput(_) | DispatchError::Internal(_))) =
        outcome.error.clone()
    {
        return Err(ApiError::from(error));
    }

    let chunks = stream_chunks(outcome, payload.thread_id);
    tracing::debug!(chunks = chunks.len(), "streaming reply");
    let stream = tokio_stream::iter(chunks).map(|chunk| Ok(chunk.into_event()));

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
