//! ledsync daemon.
//!
//! Serves the shared LED state over HTTP. Configured from the environment;
//! see the `config` module for the variables.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::{self, SignalKind};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use ledsync::api;
use ledsync::config::Config;
use ledsync::store::StateStore;
use ledsync::tracing::{self, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    tracing::init_journald_or_stdout(config.mode.default_log_level());

    let store = Arc::new(StateStore::new(&config.state_file));
    let initial = store.load();
    info!(
        rev = initial.record.rev,
        outcome = ?initial.outcome,
        "Loaded state."
    );

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr()))?;

    let running = CancellationToken::new();
    let tracker = TaskTracker::new();
    {
        let running = running.clone();
        tracker.spawn(async move {
            if let Err(e) = api::serve(listener, store, config.mode, running.clone()).await {
                error!(error = %e, "API server failed.");
                running.cancel();
            }
        });
    }
    tracker.close();
    info!("Started.");

    let mut sigint = unix::signal(SignalKind::interrupt())?;
    let mut sigterm = unix::signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = running.cancelled() => {},
    }

    trace!("Shutting down.");
    running.cancel();

    tracker.wait().await;
    info!("Exiting.");
    Ok(())
}
