use std::fmt;

/// Configuration and bookkeeping errors for the switchyard crate.
///
/// Request-time routing failures live in [`crate::dispatcher::DispatchError`];
/// everything here is either a startup mistake or a lookup miss.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A handler with the same name (case-insensitive) is already registered.
    DuplicateName(String),
    /// No handler is registered under this name.
    NotFound(String),
    /// Handler metadata failed validation at registration.
    InvalidHandler(String),
    /// Invalid input provided by the caller.
    InvalidInput(String),
    /// Internal error.
    Internal(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::DuplicateName(name) => {
                write!(f, "handler '{name}' is already registered")
            }
            CoreError::NotFound(name) => write!(f, "handler '{name}' not found"),
            CoreError::InvalidHandler(msg) => write!(f, "invalid handler: {msg}"),
            CoreError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            CoreError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;
