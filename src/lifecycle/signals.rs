//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT; Ctrl+C elsewhere)
//! - Map every shutdown signal to a single graceful stop
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - All signals funnel into `Shutdown::trigger`, which is once-guarded,
//!   so concurrent or repeated signals stop the proxy exactly once

use std::sync::Arc;

use crate::lifecycle::Shutdown;

/// Spawn a task that waits for a shutdown signal and triggers `shutdown`.
pub fn spawn_handler(shutdown: Arc<Shutdown>) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received");
        shutdown.trigger();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt =
        signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");
    let mut terminate =
        signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
}
