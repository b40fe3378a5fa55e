//! Run the switchyard HTTP server.
//!
//! Reads `.env`, loads (or creates) `switchyard.json`, and serves until Ctrl+C.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use switchyard::config::{load_or_create_config, CONFIG_FILENAME};
use switchyard::handlers::build_handlers;
use switchyard::{Dispatcher, LlmOracle, Server};
use switchyard_llm::{LlmProvider, LlmSettings, OpenAiCompatibleProvider};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:8000";

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(error) = run().await {
        tracing::error!(%error, "switchyard failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config_path = std::env::var("SWITCHYARD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(CONFIG_FILENAME));
    let config = load_or_create_config(&config_path).map_err(|error| error.to_string())?;

    let settings = LlmSettings::from_env();
    tracing::info!(model = %settings.model, base_url = %settings.base_url, "using model");
    let provider: Arc<dyn LlmProvider> =
        Arc::new(OpenAiCompatibleProvider::new(settings).map_err(|error| error.to_string())?);
    let oracle = LlmOracle::deterministic(provider.as_ref()).map_err(|error| error.to_string())?;

    let base_dir = config_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let handlers =
        build_handlers(&config.handlers, provider, &base_dir).map_err(|error| error.to_string())?;

    let dispatcher = Dispatcher::builder()
        .handlers(handlers)
        .oracle(Arc::new(oracle))
        .config(config.dispatcher.with_env_overrides())
        .build()
        .map_err(|error| error.to_string())?;

    let addr: SocketAddr = std::env::var("SWITCHYARD_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .map_err(|error| format!("invalid SWITCHYARD_ADDR: {error}"))?;
    let mut server = Server::start(Arc::new(dispatcher), addr).await?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|error| format!("failed to listen for Ctrl+C: {error}"))?;
    tracing::info!("shutting down");
    server.shutdown()
}
