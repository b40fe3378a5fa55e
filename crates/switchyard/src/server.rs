use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};

use crate::dispatcher::Dispatcher;

pub mod agents;
pub mod chat;
pub mod conversation;
pub mod error;
pub mod stream;

/// HTTP front end for a [`Dispatcher`]. Serves on a background task until
/// [`Server::shutdown`] is called or the value is dropped.
pub struct Server {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Server {
    pub async fn start(dispatcher: Arc<Dispatcher>, addr: SocketAddr) -> Result<Self, String> {
        let state = Arc::new(ServerState { dispatcher });
        let app = router(state);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|error| format!("failed to bind {addr}: {error}"))?;
        let addr = listener
            .local_addr()
            .map_err(|error| error.to_string())?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                tracing::error!(%error, "server stopped with an error");
            }
        });
        tracing::info!(%addr, "listening");

        Ok(Server {
            addr,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(&mut self) -> Result<(), String> {
        if let Some(sender) = self.shutdown.take() {
            sender
                .send(())
                .map_err(|_| "failed to send server shutdown signal".to_string())
        } else {
            Ok(())
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new()
        .route("/health", get(health))
        .route("/agents", get(agents::list_agents))
        .route("/chat", post(chat::chat))
        .route("/stream", post(stream::stream_chat))
        .route("/conversations/:id", get(conversation::conversation_history))
        .with_state(state)
        .layer(cors)
}

async fn health() -> &'static str {
    "ok"
}

pub(crate) struct ServerState {
    pub(crate) dispatcher: Arc<Dispatcher>,
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::handler::testing::StubHandler;
    use crate::oracle::testing::ScriptedOracle;

    /// State over a dispatcher with `alpha` and `beta` stubs and an oracle
    /// that always answers `answer`.
    pub fn state(answer: &str) -> Arc<ServerState> {
        let dispatcher = Dispatcher::builder()
            .handler(StubHandler::new("alpha", "math").arc())
            .handler(StubHandler::new("beta", "files").arc())
            .oracle(Arc::new(ScriptedOracle::always(answer)))
            .build()
            .expect("dispatcher");
        Arc::new(ServerState {
            dispatcher: Arc::new(dispatcher),
        })
    }
}
