use std::sync::Arc;

use async_trait::async_trait;
use switchyard_llm::{ChatMessage, LlmError, LlmProvider};

use crate::config::HandlerConfig;
use crate::conversation::{Role, Turn};
use crate::handler::{Handler, HandlerError};
use crate::routing::KeywordConfidence;

/// Handler whose behavior is a system prompt sent to a chat model.
pub struct LlmHandler {
    config: HandlerConfig,
    keywords: KeywordConfidence,
    provider: Arc<dyn LlmProvider>,
}

impl LlmHandler {
    pub fn new(config: HandlerConfig, provider: Arc<dyn LlmProvider>) -> Self {
        let keywords = KeywordConfidence::new(config.keywords.iter().cloned());
        Self {
            config,
            keywords,
            provider,
        }
    }

    fn messages(&self, request: &str, history: &[Turn]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.config.system_prompt.as_str()));
        messages.extend(history.iter().map(|turn| match turn.role {
            Role::User => ChatMessage::user(turn.content.as_str()),
            Role::Assistant => ChatMessage::assistant(turn.content.as_str()),
        }));
        messages.push(ChatMessage::user(request));
        messages
    }
}

#[async_trait]
impl Handler for LlmHandler {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn description(&self) -> &str {
        &self.config.description
    }

    fn capabilities(&self) -> Vec<String> {
        self.config.capabilities.clone()
    }

    async fn execute(&self, request: &str, history: &[Turn]) -> Result<String, HandlerError> {
        let messages = self.messages(request, history);
        tracing::debug!(
            handler = %self.config.name,
            messages = messages.len(),
            "calling model"
        );
        self.provider
            .complete(&messages)
            .await
            .map(|reply| reply.trim().to_string())
            .map_err(handler_error)
    }

    fn confidence(&self, request: &str) -> Option<f64> {
        self.keywords.score(request)
    }
}

pub(crate) fn handler_error(error: LlmError) -> HandlerError {
    match error {
        LlmError::MissingApiKey | LlmError::Transport(_) | LlmError::Status { .. } => {
            HandlerError::Unavailable(error.to_string())
        }
        other => HandlerError::Execution(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;
    use switchyard_llm::LlmSettings;

    /// Provider that answers with the last message it was sent (or a fixed
    /// reply or error) and keeps every request.
    #[derive(Default)]
    pub struct EchoProvider {
        pub settings: LlmSettings,
        pub reply: Option<String>,
        pub failure: Option<LlmError>,
        pub seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl EchoProvider {
        pub fn failing(error: LlmError) -> Self {
            Self {
                failure: Some(error),
                ..Self::default()
            }
        }

        pub fn replying(reply: impl Into<String>) -> Self {
            Self {
                reply: Some(reply.into()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
            self.seen.lock().expect("seen").push(messages.to_vec());
            if let Some(error) = &self.failure {
                return Err(error.clone());
            }
            if let Some(reply) = &self.reply {
                return Ok(reply.clone());
            }
            Ok(messages
                .last()
                .map(|message| format!(" {} ", message.content))
                .unwrap_or_default())
        }

        fn settings(&self) -> &LlmSettings {
            &self.settings
        }

        fn with_settings(&self, settings: LlmSettings) -> Result<Box<dyn LlmProvider>, LlmError> {
            Ok(Box::new(EchoProvider {
                settings,
                reply: self.reply.clone(),
                failure: self.failure.clone(),
                seen: Mutex::new(Vec::new()),
            }))
        }
    }
}
