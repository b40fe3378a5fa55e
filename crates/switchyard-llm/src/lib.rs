pub mod error;
pub mod message;
pub mod openai;
pub mod provider;
pub mod settings;

pub use error::LlmError;
pub use message::{ChatMessage, ChatRole};
pub use openai::OpenAiCompatibleProvider;
pub use provider::LlmProvider;
pub use settings::LlmSettings;
