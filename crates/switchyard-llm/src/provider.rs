use async_trait::async_trait;

use crate::error::LlmError;
use crate::message::ChatMessage;
use crate::settings::LlmSettings;

/// Non-streaming chat completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send `messages` and return the assistant's text reply.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    fn settings(&self) -> &LlmSettings;

    /// Clone this provider with different settings (e.g. temperature 0 for routing).
    fn with_settings(&self, settings: LlmSettings) -> Result<Box<dyn LlmProvider>, LlmError>;
}
