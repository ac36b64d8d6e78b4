// =============================================================================
// PSX Scanner — Main Entry Point
// =============================================================================
//
// Serves indicator analysis, BUY/SELL/HOLD signals and multi-symbol scans for
// Pakistan Stock Exchange listings.  Price history is pulled on demand from
// the PSX data portal and cached in memory.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod error;
mod indicators;
mod market_data;
mod runtime_config;
mod scanner;
mod signals;
mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::PsxClient;
use crate::runtime_config::RuntimeConfig;

const CONFIG_PATH: &str = "runtime_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("PSX Scanner starting up");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides();

    info!(
        symbols = config.symbols.len(),
        default_scan = ?config.default_scan_symbols,
        cache_ttl_secs = config.cache_ttl_secs,
        "Configuration loaded"
    );

    // ── 2. PSX client & shared state ─────────────────────────────────────
    let client = PsxClient::new(
        &config.psx_base_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    info!(base_url = %client.base_url(), "PSX client ready");

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(
        config,
        Arc::new(client),
        Some(PathBuf::from(CONFIG_PATH)),
    ));

    // ── 3. Cache sweeper ─────────────────────────────────────────────────
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let cache = sweep_state.market_data.cache();
            if cache.is_empty() {
                continue;
            }
            let removed = cache.clear_expired();
            if removed > 0 {
                info!(removed, "Expired series evicted from cache");
            }
        }
    });

    // ── 4. API server ────────────────────────────────────────────────────
    let app = api::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    // ── 5. Shutdown ──────────────────────────────────────────────────────
    let config = state.runtime_config.read().clone();
    if let Err(e) = config.save(CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("PSX Scanner shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    warn!("Shutdown signal received, stopping gracefully");
}
