use std::fmt;

use crate::error::CoreError;
use crate::routing::RoutingDecision;

/// Request-time failure. Every variant still resolves into a textual
/// [`DispatchOutcome`].
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Empty or whitespace-only request.
    InvalidInput(String),
    /// The oracle failed or timed out.
    OracleUnavailable(String),
    /// The oracle answered, but with no registered name.
    AmbiguousRouting(String),
    /// No handler could be selected by any route.
    RoutingFailed(String),
    /// The selected handler reported an error.
    HandlerExecution { handler: String, message: String },
    /// The caller cancelled before the request was recorded.
    Cancelled,
    Internal(String),
}

impl DispatchError {
    /// Stable machine-readable code, used by transports.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::InvalidInput(_) => "invalid_input",
            DispatchError::OracleUnavailable(_) => "oracle_unavailable",
            DispatchError::AmbiguousRouting(_) => "ambiguous_routing",
            DispatchError::RoutingFailed(_) => "routing_failed",
            DispatchError::HandlerExecution { .. } => "handler_execution",
            DispatchError::Cancelled => "cancelled",
            DispatchError::Internal(_) => "internal_error",
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            DispatchError::OracleUnavailable(msg) => write!(f, "oracle unavailable: {msg}"),
            DispatchError::AmbiguousRouting(msg) => write!(f, "ambiguous routing: {msg}"),
            DispatchError::RoutingFailed(msg) => write!(f, "routing failed: {msg}"),
            DispatchError::HandlerExecution { handler, message } => {
                write!(f, "handler '{handler}' failed: {message}")
            }
            DispatchError::Cancelled => write!(f, "request cancelled"),
            DispatchError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<CoreError> for DispatchError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::InvalidInput(msg) => DispatchError::InvalidInput(msg),
            other => DispatchError::Internal(other.to_string()),
        }
    }
}

/// Result of one dispatch. `output` is always set, even on failure.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub request_id: String,
    pub conversation_id: String,
    pub output: String,
    pub selected_handler: Option<String>,
    pub error: Option<DispatchError>,
    pub routing: Option<RoutingDecision>,
}

impl DispatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
