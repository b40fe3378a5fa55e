//! The classification oracle seam.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use switchyard_llm::{ChatMessage, LlmError, LlmProvider};

const ROUTER_SYSTEM_PROMPT: &str =
    "You classify requests for a dispatcher. Answer with a handler name only.";

#[derive(Debug, Clone, PartialEq)]
pub enum OracleError {
    /// The oracle could not be reached or did not answer in time.
    Unavailable(String),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::Unavailable(msg) => write!(f, "oracle unavailable: {msg}"),
        }
    }
}

impl std::error::Error for OracleError {}

impl From<LlmError> for OracleError {
    fn from(error: LlmError) -> Self {
        OracleError::Unavailable(error.to_string())
    }
}

/// External classifier that names the handler for a routing query.
///
/// Output is free text expected to contain a handler name; the dispatcher
/// validates it.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn classify(&self, query: &str) -> Result<String, OracleError>;
}

/// Oracle backed by a chat-completion provider.
pub struct LlmOracle {
    provider: Arc<dyn LlmProvider>,
}

impl LlmOracle {
    /// Wrap `provider` as-is.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Wrap a copy of `provider` pinned to temperature 0.
    pub fn deterministic(provider: &dyn LlmProvider) -> Result<Self, LlmError> {
        let settings = provider.settings().clone().with_temperature(0.0);
        let routed: Arc<dyn LlmProvider> = Arc::from(provider.with_settings(settings)?);
        Ok(Self::new(routed))
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn classify(&self, query: &str) -> Result<String, OracleError> {
        let messages = [
            ChatMessage::system(ROUTER_SYSTEM_PROMPT),
            ChatMessage::user(query),
        ];
        let answer = self.provider.complete(&messages).await?;
        Ok(answer.trim().to_string())
    }
}
