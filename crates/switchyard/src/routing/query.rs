use std::fmt::Write;

use crate::conversation::{Role, Turn};
use crate::handler::HandlerDescriptor;

/// Everything the oracle is shown for one routing decision.
///
/// Rendering is a pure function of the inputs, so identical registry state,
/// history and request always produce an identical prompt.
#[derive(Debug, Clone)]
pub struct RoutingQuery<'a> {
    handlers: &'a [HandlerDescriptor],
    history: &'a [Turn],
    request: &'a str,
}

impl<'a> RoutingQuery<'a> {
    pub fn new(handlers: &'a [HandlerDescriptor], history: &'a [Turn], request: &'a str) -> Self {
        Self {
            handlers,
            history,
            request,
        }
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name.clone()).collect()
    }

    /// The full routing prompt: handler catalogue, recent turns, request.
    pub fn prompt(&self) -> String {
        let mut out = String::from(
            "You are a supervisor that routes user requests to the most appropriate \
             specialized handler.\n\nAvailable handlers:\n",
        );
        for handler in self.handlers {
            let capabilities: Vec<&str> =
                handler.capabilities.iter().map(String::as_str).collect();
            let _ = writeln!(
                out,
                "- {}: {} (capabilities: {})",
                handler.name,
                handler.description,
                capabilities.join(", ")
            );
        }

        if !self.history.is_empty() {
            out.push_str("\nRecent conversation:\n");
            for turn in self.history {
                let speaker = match turn.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                };
                let _ = writeln!(out, "{speaker}: {}", turn.content);
            }
        }

        let _ = write!(
            out,
            "\nUser request: \"{}\"\n\n\
             Based on the request and the conversation so far, which handler should \
             handle this task? Respond with ONLY the handler name, nothing else.\n\n\
             Valid handler names: {}\n\nSelected handler:",
            self.request,
            self.handler_names().join(", ")
        );
        out
    }

    /// Retry prompt used after an unparseable answer: lists only valid names
    /// and asks for a single token.
    pub fn strict_prompt(&self) -> String {
        format!(
            "Reply with exactly one of these handler names and nothing else: {}\n\
             Answer with a single token. No punctuation, quotes or explanation.\n\n\
             User request: \"{}\"\n\nHandler name:",
            self.handler_names().join(", "),
            self.request
        )
    }
}
