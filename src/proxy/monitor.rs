//! Idle monitor: suspends the VM once every connection has closed.
//!
//! # Responsibilities
//! - Poll the open-connection count on a fixed interval
//! - Issue the suspend once the count drains to zero
//! - Retry a failed suspend indefinitely while the VM stays up
//! - Close the activation cycle so a later arrival can restart the VM
//!
//! One monitor exists per activation cycle; the orchestrator spawns it only
//! when it wins the trigger edge. A connection arriving between "drained to
//! zero" and "suspend issued" is a tolerated race: its I/O fails against
//! the suspending VM and the next arrival re-triggers a start.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::net::{ActivityGate, ConnectionTracker};
use crate::proxy::activation::Activation;
use crate::vm::VmController;

/// Per-cycle idle watcher.
pub struct IdleMonitor<C> {
    controller: Arc<C>,
    activation: Arc<Activation>,
    tracker: ConnectionTracker,
    gate: Arc<ActivityGate>,
    interval: Duration,
    machine: String,
}

impl<C: VmController> IdleMonitor<C> {
    pub fn new(
        controller: Arc<C>,
        activation: Arc<Activation>,
        tracker: ConnectionTracker,
        gate: Arc<ActivityGate>,
        interval: Duration,
        machine: String,
    ) -> Self {
        Self {
            controller,
            activation,
            tracker,
            gate,
            interval,
            machine,
        }
    }

    /// Run until the VM is suspended or the proxy shuts down.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!(
            machine = %self.machine,
            interval_ms = self.interval.as_millis() as u64,
            "Idle monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        // The first tick fires immediately; skip straight to the cadence.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.poll_idle().await {
                        break;
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!(machine = %self.machine, "Idle monitor received shutdown signal, exiting");
                    break;
                }
            }
        }
    }

    /// One poll. Returns true once the cycle is closed and the monitor
    /// should exit.
    async fn poll_idle(&self) -> bool {
        let open = self.tracker.open_count();
        tracing::trace!(
            machine = %self.machine,
            open_connections = open,
            io_ops = self.gate.ops(),
            "Idle poll"
        );
        if open > 0 {
            return false;
        }

        self.activation.begin_stopping();

        match self.controller.suspend().await {
            Ok(()) => {
                self.activation.try_clear();
                tracing::info!(machine = %self.machine, "VM suspended");
                true
            }
            Err(e) => {
                // Only give up once the VM is confirmed down; an error from
                // the running check counts as "still up, retry".
                match self.controller.is_running().await {
                    Ok(false) => {
                        self.activation.try_clear();
                        tracing::warn!(
                            machine = %self.machine,
                            error = %e,
                            "Suspend failed but VM is already stopped"
                        );
                        true
                    }
                    Ok(true) | Err(_) => {
                        tracing::warn!(
                            machine = %self.machine,
                            error = %e,
                            "Suspend failed, VM still running; will retry"
                        );
                        false
                    }
                }
            }
        }
    }
}
