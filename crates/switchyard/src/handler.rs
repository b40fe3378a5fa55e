//! The contract every routable handler implements.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::conversation::Turn;
use crate::error::{CoreError, CoreResult};
use crate::routing::matcher::DECORATION;

/// Ordinary failure reported by [`Handler::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerError {
    /// The handler could not complete the request.
    Execution(String),
    /// A backend the handler depends on is unreachable.
    Unavailable(String),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Execution(msg) => write!(f, "{msg}"),
            HandlerError::Unavailable(msg) => write!(f, "backend unavailable: {msg}"),
        }
    }
}

impl std::error::Error for HandlerError {}

/// A pluggable unit of work the dispatcher can route to.
///
/// `name`, `description` and `capabilities` are read once at registration and
/// must not change afterwards.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &str;

    /// Free text shown to the routing oracle. Must be non-empty.
    fn description(&self) -> &str;

    /// Keyword tags shown to the routing oracle.
    fn capabilities(&self) -> Vec<String>;

    /// Run the request. `history` is the bounded window the router saw and may
    /// be empty.
    async fn execute(&self, request: &str, history: &[Turn]) -> Result<String, HandlerError>;

    /// Fast local estimate in `[0, 1]` of how well this handler fits `request`.
    /// `None` opts out of confidence-based fallback routing.
    fn confidence(&self, _request: &str) -> Option<f64> {
        None
    }
}

/// Immutable snapshot of a handler's routing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerDescriptor {
    pub name: String,
    pub description: String,
    pub capabilities: BTreeSet<String>,
}

impl HandlerDescriptor {
    /// Capture and validate a handler's metadata.
    pub fn of(handler: &dyn Handler) -> CoreResult<Self> {
        let name = handler.name().trim();
        if name.is_empty() {
            return Err(CoreError::InvalidHandler(
                "name must be a non-empty string".to_string(),
            ));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidHandler(format!(
                "{name}: name must not contain whitespace"
            )));
        }
        // The oracle answer is stripped of these before matching.
        if let Some(c) = name.chars().find(|c| DECORATION.contains(c)) {
            return Err(CoreError::InvalidHandler(format!(
                "{name}: name must not contain '{c}'"
            )));
        }
        let description = handler.description().trim();
        if description.is_empty() {
            return Err(CoreError::InvalidHandler(format!(
                "{name}: description must be a non-empty string"
            )));
        }
        let capabilities: BTreeSet<String> = handler
            .capabilities()
            .into_iter()
            .map(|capability| capability.trim().to_string())
            .filter(|capability| !capability.is_empty())
            .collect();
        if capabilities.is_empty() {
            return Err(CoreError::InvalidHandler(format!(
                "{name}: capabilities must be a non-empty list"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            capabilities,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Scriptable handler for tests.
    pub struct StubHandler {
        pub name: String,
        pub description: String,
        pub capabilities: Vec<String>,
        pub reply: Result<String, HandlerError>,
        pub confidence: Option<f64>,
        pub delay: Option<Duration>,
        pub calls: AtomicUsize,
        pub seen_history: Mutex<Vec<Vec<Turn>>>,
    }

    impl StubHandler {
        pub fn new(name: &str, capability: &str) -> Self {
            Self {
                name: name.to_string(),
                description: format!("{name} handler"),
                capabilities: vec![capability.to_string()],
                reply: Ok(format!("{name} output")),
                confidence: None,
                delay: None,
                calls: AtomicUsize::new(0),
                seen_history: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(mut self, reply: Result<String, HandlerError>) -> Self {
            self.reply = reply;
            self
        }

        pub fn with_confidence(mut self, confidence: f64) -> Self {
            self.confidence = Some(confidence);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn arc(self) -> Arc<Self> {
            Arc::new(self)
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_history(&self) -> Vec<Turn> {
            self.seen_history
                .lock()
                .expect("history")
                .last()
                .cloned()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl Handler for StubHandler {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            &self.description
        }

        fn capabilities(&self) -> Vec<String> {
            self.capabilities.clone()
        }

        async fn execute(&self, request: &str, history: &[Turn]) -> Result<String, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_history
                .lock()
                .expect("history")
                .push(history.to_vec());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply
                .clone()
                .map(|reply| if reply == "{echo}" { request.to_string() } else { reply })
        }

        fn confidence(&self, _request: &str) -> Option<f64> {
            self.confidence
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubHandler;
    use super::*;

    #[test]
    fn descriptor_trims_and_dedups_capabilities() {
        let mut handler = StubHandler::new("alpha", "math");
        handler.capabilities = vec![" math ".into(), "math".into(), "".into(), "algebra".into()];
        let descriptor = HandlerDescriptor::of(&handler).expect("descriptor");
        let capabilities: Vec<&str> = descriptor.capabilities.iter().map(String::as_str).collect();
        assert_eq!(capabilities, vec!["algebra", "math"]);
    }

    #[test]
    fn descriptor_rejects_empty_description() {
        let mut handler = StubHandler::new("alpha", "math");
        handler.description = "   ".to_string();
        let err = HandlerDescriptor::of(&handler).unwrap_err();
        assert!(matches!(err, CoreError::InvalidHandler(msg) if msg.contains("description")));
    }

    #[test]
    fn descriptor_rejects_blank_or_spaced_names() {
        let blank = StubHandler::new("", "math");
        assert!(matches!(
            HandlerDescriptor::of(&blank),
            Err(CoreError::InvalidHandler(_))
        ));

        let spaced = StubHandler::new("file ops", "files");
        assert!(matches!(
            HandlerDescriptor::of(&spaced),
            Err(CoreError::InvalidHandler(_))
        ));
    }

    #[test]
    fn descriptor_rejects_names_with_punctuation() {
        for name in ["ask?", "*notes*", "say!", "'quoted'", "files.v2"] {
            let handler = StubHandler::new(name, "misc");
            assert!(
                matches!(
                    HandlerDescriptor::of(&handler),
                    Err(CoreError::InvalidHandler(msg)) if msg.contains("must not contain")
                ),
                "{name} should be rejected"
            );
        }
        assert!(HandlerDescriptor::of(&StubHandler::new("file_operations-2", "files")).is_ok());
    }

    #[test]
    fn descriptor_rejects_missing_capabilities() {
        let mut handler = StubHandler::new("alpha", "math");
        handler.capabilities.clear();
        assert!(matches!(
            HandlerDescriptor::of(&handler),
            Err(CoreError::InvalidHandler(msg)) if msg.contains("capabilities")
        ));
    }

    #[test]
    fn default_confidence_is_absent() {
        struct Plain;

        #[async_trait]
        impl Handler for Plain {
            fn name(&self) -> &str {
                "plain"
            }
            fn description(&self) -> &str {
                "plain handler"
            }
            fn capabilities(&self) -> Vec<String> {
                vec!["anything".to_string()]
            }
            async fn execute(&self, _: &str, _: &[Turn]) -> Result<String, HandlerError> {
                Ok(String::new())
            }
        }

        assert_eq!(Plain.confidence("read a file"), None);
    }
}
