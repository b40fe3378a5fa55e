use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::dispatcher::DispatchError;
use crate::server::error::{ApiError, ApiErrorBody};
use crate::server::ServerState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_thread_id")]
    pub thread_id: String,
}

fn default_thread_id() -> String {
    "default".to_string()
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub agent_used: Option<String>,
    pub thread_id: String,
    pub error: Option<ApiErrorBody>,
}

/// Dispatch one message. Routing and handler failures still answer 200 with
/// the failure text as `response`; only malformed input and internal faults
/// are HTTP errors.
#[tracing::instrument(skip_all, fields(thread_id = %payload.thread_id))]
pub(crate) async fn chat(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let outcome = state
        .dispatcher
        .handle(&payload.thread_id, &payload.message)
        .await;

    match outcome.error {
        Some(error @ (DispatchError::InvalidInput(_) | DispatchError::Internal(_))) => {
            Err(ApiError::from(error))
        }
        error => Ok(Json(ChatResponse {
            response: outcome.output,
            agent_used: outcome.selected_handler,
            thread_id: payload.thread_id,
            error: error.as_ref().map(ApiErrorBody::from),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::testing;
    use axum::http::StatusCode;

    fn request(message: &str, thread_id: &str) -> Json<ChatRequest> {
        Json(ChatRequest {
            message: message.to_string(),
            thread_id: thread_id.to_string(),
        })
    }

    #[test]
    fn thread_id_defaults() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"message": "hello"}"#).expect("request");
        assert_eq!(request.thread_id, "default");
    }

    #[tokio::test]
    async fn chat_reports_the_handler_used() {
        let state = testing::state("alpha");
        let Json(response) = chat(State(state.clone()), request("add 2 and 2", "t1"))
            .await
            .expect("response");

        assert_eq!(response.response, "alpha output");
        assert_eq!(response.agent_used.as_deref(), Some("alpha"));
        assert_eq!(response.thread_id, "t1");
        assert!(response.error.is_none());
        assert_eq!(
            state.dispatcher.store().turn_count("t1").expect("count"),
            2
        );
    }

    #[tokio::test]
    async fn empty_message_is_a_bad_request() {
        let state = testing::state("alpha");
        let err = chat(State(state), request("  ", "t1")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body().code, "invalid_input");
    }

    #[tokio::test]
    async fn routing_failure_is_reported_in_the_body() {
        let state = testing::state("gamma");
        let Json(response) = chat(State(state), request("something odd", "t1"))
            .await
            .expect("response");

        assert_eq!(response.agent_used, None);
        assert!(!response.response.is_empty());
        assert_eq!(
            response.error.map(|error| error.code),
            Some("routing_failed".to_string())
        );
    }
}
