use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum LlmError {
    InvalidInput(String),
    MissingApiKey,
    /// The request never produced an HTTP response (connect, TLS, timeout).
    Transport(String),
    /// The provider answered with a non-success status.
    Status { code: u16, body: String },
    InvalidResponse(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            LlmError::MissingApiKey => write!(f, "missing LLM API key"),
            LlmError::Transport(msg) => write!(f, "transport error: {msg}"),
            LlmError::Status { code, body } => write!(f, "provider returned {code}: {body}"),
            LlmError::InvalidResponse(msg) => write!(f, "invalid provider response: {msg}"),
        }
    }
}

impl std::error::Error for LlmError {}
