pub mod api;
pub mod cli;
pub mod core;
pub mod providers;
pub mod refresh;
pub mod store;
pub mod summary;

use crate::api::{AppState, app_router};
use crate::core::config::AppConfig;
use crate::core::query::CountryQuery;
use crate::providers::{ExchangeRateProvider, RestCountriesProvider};
use crate::refresh::RefreshEngine;
use crate::summary::SummaryImage;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Serve {
        listen: Option<SocketAddr>,
    },
    Refresh,
    List {
        region: Option<String>,
        currency: Option<String>,
        sort: Option<String>,
    },
    Status,
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

/// Wires the store, upstream providers, refresh engine and image generator together.
pub fn build_state(config: &AppConfig) -> Result<Arc<AppState>> {
    let store = store::open_store(config)?;
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let countries = Arc::new(RestCountriesProvider::new(
        &config.providers.countries.base_url,
        timeout,
    ));
    let rates = Arc::new(ExchangeRateProvider::new(
        &config.providers.rates.base_url,
        timeout,
    ));
    let summary = Arc::new(SummaryImage::new(&config.cache_dir, &config.font_path));
    let engine = RefreshEngine::new(
        Arc::clone(&store),
        countries,
        rates,
        Arc::clone(&summary),
        &config.base_currency,
    );

    Ok(Arc::new(AppState {
        store,
        engine,
        summary,
    }))
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let state = build_state(&config)?;

    match command {
        AppCommand::Serve { listen } => serve(state, listen.unwrap_or(config.listen_addr)).await,
        AppCommand::Refresh => {
            cli::countries::refresh(&state.engine, state.store.as_ref(), &state.summary).await
        }
        AppCommand::List {
            region,
            currency,
            sort,
        } => {
            let query =
                CountryQuery::from_params(region.as_deref(), currency.as_deref(), sort.as_deref())?;
            cli::countries::list(state.store.as_ref(), &query).await
        }
        AppCommand::Status => cli::countries::status(state.store.as_ref()).await,
    }
}
