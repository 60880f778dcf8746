use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use snippets::cli::WebArgs;
use snippets::config::AppConfig;
use snippets::server;
use snippets::web::{self, client::ApiClient, WebState};

const PURGE_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = WebArgs::parse();
    let config = Arc::new(args.apply(AppConfig::from_env()));
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting snippets web in {:?} mode", config.environment);

    let api = ApiClient::new(&config.web.api_url)
        .with_context(|| format!("invalid API url {:?}", config.web.api_url))?;
    match api.ping().await {
        Ok(()) => tracing::info!("API reachable at {}", api.base_url()),
        Err(e) => tracing::warn!("API at {} not reachable yet: {}", api.base_url(), e),
    }

    let state = WebState::new(config.clone(), api);

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = sessions.purge_expired().await;
            if purged > 0 {
                tracing::debug!("purged {} expired sessions", purged);
            }
        }
    });

    let app = web::router(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.web_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("snippets web listening on http://{}", bind_addr);

    server::serve(listener, app, config.shutdown_timeout()).await
}
