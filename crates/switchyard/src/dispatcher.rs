//! Routes each request to one handler and records the exchange.
//!
//! A dispatch runs: read the bounded history, ask the oracle, validate its
//! answer (with one strict retry and a local confidence fallback), execute
//! the chosen handler, then append the user and assistant turns together.
//! Requests for the same conversation are serialized end to end.

mod builder;
mod outcome;


pub use builder::DispatcherBuilder;
pub use outcome::{DispatchError, DispatchOutcome};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::DispatcherConfig;
use crate::conversation::{ConversationLocks, ConversationStore, Turn};
use crate::error::CoreResult;
use crate::oracle::{Oracle, OracleError};
use crate::registry::Registry;
use crate::routing::{match_handler, RouteSource, RoutingDecision, RoutingQuery};

/// Routes requests across a [`Registry`] of handlers.
///
/// Conversations are read through [`Dispatcher::history`] and written only by
/// [`Dispatcher::handle`], under the per-conversation lock. The store itself
/// is not reachable from outside the crate:
///
/// ```compile_fail
/// fn append_unlocked(dispatcher: &switchyard::Dispatcher) {
///     let _ = dispatcher.store();
/// }
/// ```
pub struct Dispatcher {
    registry: Registry,
    store: Arc<ConversationStore>,
    locks: ConversationLocks,
    oracle: Arc<dyn Oracle>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// The last `limit` turns of a conversation, defaulting to the routing
    /// window.
    pub fn history(&self, conversation_id: &str, limit: Option<usize>) -> CoreResult<Vec<Turn>> {
        self.store
            .recent(conversation_id, limit.unwrap_or(self.config.history_window))
    }

    pub async fn handle(&self, conversation_id: &str, text: &str) -> DispatchOutcome {
        self.handle_with_cancel(conversation_id, text, &CancellationToken::new())
            .await
    }

    /// Dispatch `text` within `conversation_id`. An empty id is an anonymous,
    /// single-use conversation: no history is read and nothing is kept.
    ///
    /// Cancelling `cancel` before the exchange is recorded abandons the request
    /// and leaves the conversation untouched.
    #[tracing::instrument(skip_all, fields(conversation_id = %conversation_id, request_id = tracing::field::Empty))]
    pub async fn handle_with_cancel(
        &self,
        conversation_id: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        let request_id = Uuid::now_v7().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());
        let reply = Reply {
            request_id,
            conversation_id,
        };

        if text.trim().is_empty() {
            return reply.failed(DispatchError::InvalidInput(
                "request text must not be empty".to_string(),
            ));
        }

        let anonymous = conversation_id.is_empty();
        let _guard = if anonymous {
            None
        } else {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return reply.cancelled(),
                guard = self.locks.acquire(conversation_id) => match guard {
                    Ok(guard) => Some(guard),
                    Err(error) => return reply.failed(error.into()),
                },
            }
        };

        let history = if anonymous {
            Vec::new()
        } else {
            match self.store.recent(conversation_id, self.config.history_window) {
                Ok(history) => history,
                Err(error) => return reply.failed(error.into()),
            }
        };

        let decision = match self.route(text, &history, cancel).await {
            Ok(decision) => decision,
            Err(DispatchError::Cancelled) => return reply.cancelled(),
            Err(error) => {
                tracing::warn!(error = %error, "no handler selected");
                let notice = format!(
                    "Sorry, I couldn't work out which handler should take that request ({error})."
                );
                let recorded = self.record(conversation_id, text, &notice);
                return reply.finish(notice, None, Some(recorded.err().unwrap_or(error)), None);
            }
        };

        let handler = match self.registry.get(&decision.selected) {
            Ok(handler) => handler,
            Err(error) => return reply.failed(error.into()),
        };
        tracing::info!(
            handler = %decision.selected,
            source = ?decision.source,
            "routed request"
        );

        let execution = tokio::select! {
            biased;
            _ = cancel.cancelled() => return reply.cancelled(),
            result = handler.execute(text, &history) => result,
        };

        let (output, error) = match execution {
            Ok(output) => (output, None),
            Err(error) => {
                tracing::warn!(handler = %decision.selected, error = %error, "handler failed");
                (
                    format!("Error in {} handler: {error}", decision.selected),
                    Some(DispatchError::HandlerExecution {
                        handler: decision.selected.clone(),
                        message: error.to_string(),
                    }),
                )
            }
        };

        let error = match self.record(conversation_id, text, &output) {
            Ok(()) => error,
            Err(recording) => Some(recording),
        };
        let selected = decision.selected.clone();
        reply.finish(output, Some(selected), error, Some(decision))
    }

    /// Pick a handler: oracle, then one strict retry, then local confidence.
    async fn route(
        &self,
        request: &str,
        history: &[Turn],
        cancel: &CancellationToken,
    ) -> Result<RoutingDecision, DispatchError> {
        let handlers = self.registry.all()?;
        if handlers.is_empty() {
            return Err(DispatchError::RoutingFailed(
                "no handlers are registered".to_string(),
            ));
        }
        let query = RoutingQuery::new(&handlers, history, request);
        let names = query.handler_names();

        let first = match self.consult(&query.prompt(), cancel).await {
            Ok(answer) => answer,
            Err(DispatchError::Cancelled) => return Err(DispatchError::Cancelled),
            Err(error) => return self.fall_back(request, String::new(), error),
        };
        if let Some(selected) = match_handler(&first, &names) {
            return Ok(RoutingDecision {
                selected,
                raw_oracle_output: first,
                source: RouteSource::Oracle,
            });
        }
        tracing::warn!(answer = %first, "oracle named no registered handler, retrying");

        let retry = match self.consult(&query.strict_prompt(), cancel).await {
            Ok(answer) => answer,
            Err(DispatchError::Cancelled) => return Err(DispatchError::Cancelled),
            Err(error) => return self.fall_back(request, first, error),
        };
        if let Some(selected) = match_handler(&retry, &names) {
            return Ok(RoutingDecision {
                selected,
                raw_oracle_output: retry,
                source: RouteSource::StrictRetry,
            });
        }

        let ambiguity = DispatchError::AmbiguousRouting(format!(
            "oracle answered {first:?}, then {retry:?}"
        ));
        self.fall_back(request, retry, ambiguity)
    }

    async fn consult(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DispatchError> {
        let call = async {
            match self.config.oracle_timeout() {
                Some(limit) => tokio::time::timeout(limit, self.oracle.classify(query))
                    .await
                    .unwrap_or_else(|_| {
                        Err(OracleError::Unavailable(format!(
                            "no answer within {}ms",
                            limit.as_millis()
                        )))
                    }),
                None => self.oracle.classify(query).await,
            }
        };

        let answer = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
            answer = call => answer,
        };
        answer.map_err(|error| match error {
            OracleError::Unavailable(msg) => DispatchError::OracleUnavailable(msg),
        })
    }

    fn fall_back(
        &self,
        request: &str,
        raw_oracle_output: String,
        cause: DispatchError,
    ) -> Result<RoutingDecision, DispatchError> {
        tracing::warn!(cause = %cause, "falling back to local confidence");
        match self.registry.best_by_confidence(request)? {
            Some((selected, score)) => {
                tracing::info!(handler = %selected, score, "confidence fallback selected handler");
                Ok(RoutingDecision {
                    selected,
                    raw_oracle_output,
                    source: RouteSource::ConfidenceFallback,
                })
            }
            None => Err(DispatchError::RoutingFailed(cause.to_string())),
        }
    }

    fn record(&self, conversation_id: &str, request: &str, output: &str) -> Result<(), DispatchError> {
        if conversation_id.is_empty() {
            return Ok(());
        }
        self.store
            .append_exchange(conversation_id, Turn::user(request), Turn::assistant(output))
            .map_err(|error| {
                tracing::error!(error = %error, "failed to record exchange");
                DispatchError::from(error)
            })
    }
}

/// Identity of the request being answered.
struct Reply<'a> {
    request_id: String,
    conversation_id: &'a str,
}

impl Reply<'_> {
    fn finish(
        self,
        output: String,
        selected_handler: Option<String>,
        error: Option<DispatchError>,
        routing: Option<RoutingDecision>,
    ) -> DispatchOutcome {
        DispatchOutcome {
            request_id: self.request_id,
            conversation_id: self.conversation_id.to_string(),
            output,
            selected_handler,
            error,
            routing,
        }
    }

    /// Outcome for a request that recorded nothing.
    fn failed(self, error: DispatchError) -> DispatchOutcome {
        tracing::warn!(error = %error, "request rejected");
        let output = format!("Error: {error}");
        self.finish(output, None, Some(error), None)
    }

    fn cancelled(self) -> DispatchOutcome {
        tracing::info!("request cancelled");
        self.finish(
            "Request cancelled.".to_string(),
            None,
            Some(DispatchError::Cancelled),
            None,
        )
    }
}
