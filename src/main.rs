use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use snippets::api::{self, AppState};
use snippets::cli::ApiArgs;
use snippets::config::AppConfig;
use snippets::server;
use snippets::store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so TOKEN_SIGNING_KEY and friends can live there.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = ApiArgs::parse();
    let config = Arc::new(args.apply(AppConfig::from_env()));
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting snippets API in {:?} mode", config.environment);

    let store = Arc::new(MemoryStore::new());
    if let Some((email, password)) = args.bootstrap.credentials() {
        let id = store
            .ensure_admin(&args.bootstrap.name, email, password)
            .await
            .context("creating bootstrap administrator")?;
        tracing::info!("bootstrap administrator {} has id {}", email, id);
    } else {
        tracing::warn!("no bootstrap administrator configured; user management will be unreachable");
    }

    let state = AppState::new(config.clone(), store.clone(), store)
        .context("TOKEN_SIGNING_KEY must be set to a non-empty secret")?;
    let app = api::router(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("snippets API listening on http://{}", bind_addr);

    server::serve(listener, app, config.shutdown_timeout()).await
}
