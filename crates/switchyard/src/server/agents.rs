use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::handler::HandlerDescriptor;
use crate::server::error::ApiError;
use crate::server::ServerState;

#[derive(Debug, Serialize)]
pub struct AgentsResponse {
    pub count: usize,
    pub agents: Vec<HandlerDescriptor>,
}

pub(crate) async fn list_agents(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<AgentsResponse>, ApiError> {
    let agents = state.dispatcher.registry().all()?;
    Ok(Json(AgentsResponse {
        count: agents.len(),
        agents,
    }))
}
