//! Server assembly: bind, serve, and run the background expiry sweep.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;

use verikit_engine::VerificationRegistry;

use crate::{router, AppState};

/// Periodically expire stale challenges nobody is polling.
pub fn spawn_sweeper(
    registry: Arc<VerificationRegistry>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let swept = registry.sweep_expired();
            if swept > 0 {
                tracing::info!(swept, "background sweep expired challenges");
            }
        }
    })
}

/// Bind and serve the API until the process is stopped.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    sweep_interval: Duration,
) -> anyhow::Result<()> {
    let sweeper = spawn_sweeper(state.registry.clone(), sweep_interval);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(%addr, "verification service listening");

    let result = axum::serve(listener, router(state))
        .await
        .context("server error");
    sweeper.abort();
    result
}
