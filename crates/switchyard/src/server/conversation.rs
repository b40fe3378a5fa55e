use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::conversation::Turn;
use crate::server::error::ApiError;
use crate::server::ServerState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub turns: Vec<Turn>,
}

/// Most recent turns of a conversation. Unknown ids yield no turns.
pub(crate) async fn conversation_history(
    State(state): State<Arc<ServerState>>,
    Path(conversation_id): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let turns = state.dispatcher.history(&conversation_id, params.limit)?;
    Ok(Json(ConversationResponse {
        conversation_id,
        turns,
    }))
}
