#![warn(clippy::nursery, clippy::pedantic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use tokio::task;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::Config;
use crate::service::PasteService;
use crate::store::{MemoryStore, RecordStore, RocksStore};
use crate::time::{Clock, SystemClock};

mod api;
mod config;
mod paste;
mod policy;
mod service;
mod short_code;
mod store;
mod time;
mod validation;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if config.ephemeral {
        warn!("Running with an in-memory store; pastes will not survive a restart");
        serve(&config, MemoryStore::new()).await
    } else {
        let store = RocksStore::open(&config.db_path).with_context(|| {
            format!("Failed to open database at {}", config.db_path.display())
        })?;
        serve(&config, store).await
    }
}

async fn serve<S: RecordStore>(config: &Config, store: S) -> Result<()> {
    let service = PasteService::new(Arc::new(store), SystemClock, config.store_timeout());
    let state = Arc::new(AppState {
        service,
        base_url: config.base_url.clone(),
    });

    let stop_signal = Arc::new(AtomicBool::new(false));
    let sweeper = config.sweep_interval().map(|interval| {
        task::spawn(cleanup(
            Arc::clone(&stop_signal),
            Arc::clone(&state),
            interval,
        ))
    });

    let signals = Signals::new([SIGINT, SIGTERM])?;
    let signals_handle = signals.handle();

    info!("Listening on {}", config.bind);
    axum::Server::bind(&config.bind)
        .serve(api::router(Arc::clone(&state)).into_make_service())
        .with_graceful_shutdown(shutdown_signal(signals))
        .await?;

    signals_handle.close();
    stop_signal.store(true, Ordering::Release);
    if let Some(sweeper) = sweeper {
        sweeper.abort();
        // Cancellation is the expected outcome here.
        let _ = sweeper.await;
    }

    // Last handle to the store; dropping it closes the database.
    drop(state);
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal(mut signals: Signals) {
    if let Some(signal) = signals.next().await {
        info!(signal, "Received signal, shutting down");
    }
}

/// Periodic clean-up task that deletes expired entries.
async fn cleanup<S: RecordStore, C: Clock>(
    stop_signal: Arc<AtomicBool>,
    state: Arc<AppState<S, C>>,
    interval: Duration,
) {
    while !stop_signal.load(Ordering::Acquire) {
        tokio::time::sleep(interval).await;
        match state.service.purge_expired().await {
            Ok(0) => (),
            Ok(purged) => info!(purged, "Swept expired pastes"),
            Err(e) => warn!("Failed to cleanup db: {}", e),
        }
    }
}
