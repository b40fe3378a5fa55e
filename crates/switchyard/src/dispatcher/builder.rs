use std::sync::Arc;
use std::time::Duration;

use crate::config::DispatcherConfig;
use crate::conversation::{ConversationLocks, ConversationStore};
use crate::dispatcher::Dispatcher;
use crate::error::{CoreError, CoreResult};
use crate::handler::Handler;
use crate::oracle::Oracle;
use crate::registry::Registry;

/// Assembles a [`Dispatcher`]. Registration errors surface from [`build`],
/// before any caller can reach the dispatcher.
///
/// [`build`]: DispatcherBuilder::build
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: Vec<Arc<dyn Handler>>,
    oracle: Option<Arc<dyn Oracle>>,
    store: Option<Arc<ConversationStore>>,
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn handlers<I>(mut self, handlers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Handler>>,
    {
        self.handlers.extend(handlers);
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Share an existing store instead of starting from an empty one.
    #[cfg(test)]
    pub(crate) fn store(mut self, store: Arc<ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn history_window(mut self, turns: usize) -> Self {
        self.config.history_window = turns;
        self
    }

    pub fn oracle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.oracle_timeout_ms = timeout.map(|limit| limit.as_millis().max(1) as u64);
        self
    }

    pub fn build(self) -> CoreResult<Dispatcher> {
        let oracle = self
            .oracle
            .ok_or_else(|| CoreError::InvalidInput("a dispatcher needs an oracle".to_string()))?;

        let registry = Registry::new();
        for handler in self.handlers {
            registry.register(handler)?;
        }

        tracing::info!(
            handlers = registry.len()?,
            history_window = self.config.history_window,
            "dispatcher ready"
        );

        Ok(Dispatcher {
            registry,
            store: self.store.unwrap_or_default(),
            locks: ConversationLocks::new(),
            oracle,
            config: self.config,
        })
    }
}
