//! Proxy orchestrator subsystem.
//!
//! # Data Flow
//! ```text
//! accept → track connection → consult VM state
//!     → (first arrival) start VM, spawn idle monitor
//!     → resolve guest address → dial → bidirectional copy
//!
//! Idle monitor (one per activation cycle):
//!     open connections drained → suspend VM → clear activation
//! ```
//!
//! # Design Decisions
//! - Only setup failures (VM missing, bind error) escape `run()`; every
//!   per-connection failure is logged and drops that connection only
//! - Shutdown forces in-flight forwarders closed rather than draining them
//! - Counters and flags live on the proxy instance, not in globals, so two
//!   proxies in one process never couple

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinSet;

use crate::config::ProxyConfig;
use crate::lifecycle::Shutdown;
use crate::net::{
    Accepted, ActivityGate, ConnectionGuard, ConnectionId, ConnectionTracker, GatedStream,
    InterruptibleListener,
};
use crate::vm::{VmController, VmError};

pub mod activation;
pub mod monitor;

use activation::Activation;
use monitor::IdleMonitor;

/// Fatal errors from proxy setup. Everything past setup is handled locally.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Vm(#[from] VmError),

    #[error("invalid listen address {0:?}")]
    InvalidBindAddress(String),

    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
}

/// The idle-activated TCP proxy.
///
/// Accepts connections, lazily starts the backend VM on first demand,
/// forwards bytes opaquely, and suspends the VM once idle.
pub struct Proxy<C> {
    config: ProxyConfig,
    controller: Arc<C>,
    activation: Arc<Activation>,
    tracker: ConnectionTracker,
    gate: Arc<ActivityGate>,
    shutdown: Arc<Shutdown>,
}

impl<C: VmController> Proxy<C> {
    pub fn new(config: ProxyConfig, controller: C) -> Self {
        Self {
            config,
            controller: Arc::new(controller),
            activation: Arc::new(Activation::new()),
            tracker: ConnectionTracker::new(),
            gate: Arc::new(ActivityGate::new()),
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Shared shutdown coordinator, for wiring up signal handling.
    pub fn shutdown_handle(&self) -> Arc<Shutdown> {
        Arc::clone(&self.shutdown)
    }

    /// Number of connections currently being forwarded.
    pub fn open_connections(&self) -> u64 {
        self.tracker.open_count()
    }

    /// Request shutdown. Idempotent; safe to call from a signal handler
    /// task any number of times.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    /// Serve until [`stop`](Self::stop) is called.
    ///
    /// Fails fast when the machine does not exist or the listener cannot
    /// bind; every later failure drops at most one connection.
    pub async fn run(&self) -> Result<(), ProxyError> {
        let machine = &self.config.vm.machine;
        if !self.controller.exists().await? {
            return Err(VmError::NotFound(machine.clone()).into());
        }

        let bind_addr: SocketAddr = self
            .config
            .listener
            .bind_address
            .parse()
            .map_err(|_| ProxyError::InvalidBindAddress(self.config.listener.bind_address.clone()))?;

        let mut listener = InterruptibleListener::bind(bind_addr)
            .await
            .map_err(ProxyError::Bind)?;

        // The listener is the shutdown lever: closing it is the only way
        // the accept loop terminates normally.
        let handle = listener.handle();
        let mut shutdown_rx = self.shutdown.subscribe();
        {
            let handle = handle.clone();
            tokio::spawn(async move {
                let _ = shutdown_rx.recv().await;
                handle.close();
            });
        }
        // A stop() that landed before the subscription above never reached
        // a receiver, and trigger() fires at most once; latch it here.
        if self.shutdown.is_triggered() {
            handle.close();
        }

        tracing::info!(
            address = %listener.local_addr(),
            machine = %machine,
            target_port = self.config.vm.target_port,
            "Proxy listening"
        );

        let mut forwarders = JoinSet::new();
        loop {
            // Reap finished forwarding tasks.
            while forwarders.try_join_next().is_some() {}

            match listener.accept().await {
                Accepted::Interrupted => {
                    tracing::info!("Listener interrupted, shutting down");
                    break;
                }
                Accepted::Error(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                }
                Accepted::Conn(stream, peer) => {
                    self.admit(stream, peer, &mut forwarders).await;
                }
            }
        }

        // Forced-close shutdown policy: abort whatever is still in flight.
        forwarders.shutdown().await;
        Ok(())
    }

    /// Handle one accepted connection: make sure the VM is coming up,
    /// resolve and dial it, then hand off to the forwarder.
    async fn admit(&self, stream: TcpStream, peer: SocketAddr, forwarders: &mut JoinSet<()>) {
        let guard = self.tracker.track();
        let id = guard.id();
        tracing::debug!(connection_id = %id, peer = %peer, "Connection accepted");

        let running = match self.controller.is_running().await {
            Ok(running) => running,
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "VM state query failed, dropping connection");
                return;
            }
        };

        if self.activation.try_trigger() {
            if !running {
                if let Err(e) = self.controller.start().await {
                    self.activation.abort_start();
                    tracing::warn!(connection_id = %id, error = %e, "VM start failed, dropping connection");
                    return;
                }
                tracing::info!(machine = %self.config.vm.machine, "VM started");
            }
            self.activation.set_running();
            self.spawn_monitor();
        }
        // A losing arrival proceeds without starting anything; if the VM is
        // still coming up its address resolution fails and only this
        // connection is dropped.

        let addr = match self.controller.resolve_addr().await {
            Ok(addr) => addr,
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "Address resolution failed, dropping connection");
                return;
            }
        };

        let target = format!("{}:{}", addr, self.config.vm.target_port);
        let dst = match TcpStream::connect(&target).await {
            Ok(dst) => dst,
            Err(e) => {
                tracing::warn!(connection_id = %id, target = %target, error = %e, "Dial failed, dropping connection");
                return;
            }
        };

        tracing::info!(connection_id = %id, peer = %peer, target = %target, "Forwarding connection");
        let src = GatedStream::new(stream, Arc::clone(&self.gate));
        forwarders.spawn(serve(id, src, dst, guard));
    }

    fn spawn_monitor(&self) {
        let monitor = IdleMonitor::new(
            Arc::clone(&self.controller),
            Arc::clone(&self.activation),
            self.tracker.clone(),
            Arc::clone(&self.gate),
            Duration::from_secs(self.config.vm.poll_interval_secs),
            self.config.vm.machine.clone(),
        );
        tokio::spawn(monitor.run(self.shutdown.subscribe()));
    }
}

/// Copy bytes in both directions until both sides finish, then close
/// everything. The guard drop decrements the open count exactly once.
async fn serve(
    id: ConnectionId,
    src: GatedStream<TcpStream>,
    dst: TcpStream,
    guard: ConnectionGuard,
) {
    let (mut src_rd, mut src_wr) = tokio::io::split(src);
    let (mut dst_rd, mut dst_wr) = dst.into_split();

    let client_to_vm = async {
        let res = tokio::io::copy(&mut src_rd, &mut dst_wr).await;
        let _ = dst_wr.shutdown().await;
        res
    };
    let vm_to_client = async {
        let res = tokio::io::copy(&mut dst_rd, &mut src_wr).await;
        let _ = src_wr.shutdown().await;
        res
    };

    let (c2v, v2c) = tokio::join!(client_to_vm, vm_to_client);
    match c2v {
        Ok(bytes) => tracing::trace!(connection_id = %id, bytes, "client → vm done"),
        // Broken pipes and resets are the normal end of a forwarded stream.
        Err(e) => tracing::debug!(connection_id = %id, error = %e, "client → vm copy ended"),
    }
    match v2c {
        Ok(bytes) => tracing::trace!(connection_id = %id, bytes, "vm → client done"),
        Err(e) => tracing::debug!(connection_id = %id, error = %e, "vm → client copy ended"),
    }

    tracing::debug!(connection_id = %id, "Forwarding finished");
    drop(guard);
}
