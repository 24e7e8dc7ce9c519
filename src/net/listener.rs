//! Interruptible TCP listener.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections on a background task
//! - Deliver a distinguished `Interrupted` result once closed
//! - Graceful handling of transient accept errors
//!
//! # Design Decisions
//! - A dedicated task owns the socket and publishes results to a bounded
//!   channel; `close()` is therefore callable from any task (e.g. the
//!   signal handler) without holding the listener itself.
//! - `Interrupted` is a sentinel variant, not a close-induced I/O error,
//!   so the accept loop can tell shutdown apart from a real failure.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};

/// Result of a single accept attempt.
#[derive(Debug)]
pub enum Accepted {
    /// A connection was accepted.
    Conn(TcpStream, SocketAddr),
    /// The underlying accept failed; recoverable, the listener stays up.
    Error(std::io::Error),
    /// The listener was closed; no further connections will be delivered.
    Interrupted,
}

/// A TCP listener whose blocking `accept` can be unblocked by `close()`.
///
/// Once closed, every subsequent [`accept`](InterruptibleListener::accept)
/// returns [`Accepted::Interrupted`] and never a connection.
pub struct InterruptibleListener {
    results: mpsc::Receiver<Accepted>,
    handle: InterruptHandle,
    local_addr: SocketAddr,
}

/// Clonable handle used to close the listener from another task.
#[derive(Clone)]
pub struct InterruptHandle {
    closed: Arc<AtomicBool>,
    tx: broadcast::Sender<()>,
}

impl InterruptHandle {
    /// Close the listener. Idempotent; a second call is a no-op.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(());
        }
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl InterruptibleListener {
    /// Bind to `addr` and start the background accept task.
    pub async fn bind(addr: SocketAddr) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let (result_tx, result_rx) = mpsc::channel(1);
        let (interrupt_tx, mut interrupt_rx) = broadcast::channel(1);
        let closed = Arc::new(AtomicBool::new(false));

        let handle = InterruptHandle {
            closed: Arc::clone(&closed),
            tx: interrupt_tx,
        };

        tokio::spawn(async move {
            loop {
                if closed.load(Ordering::SeqCst) {
                    break;
                }
                tokio::select! {
                    _ = interrupt_rx.recv() => break,
                    res = listener.accept() => {
                        let msg = match res {
                            Ok((stream, peer)) => Accepted::Conn(stream, peer),
                            Err(e) => Accepted::Error(e),
                        };
                        let errored = matches!(msg, Accepted::Error(_));
                        if result_tx.send(msg).await.is_err() {
                            break;
                        }
                        if errored {
                            // Persistent accept failures (fd exhaustion and
                            // the like) would otherwise spin this loop.
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        }
                    }
                }
            }
            // Dropping the socket unblocks any pending OS accept; the
            // sentinel covers a caller already parked on the channel.
            let _ = result_tx.send(Accepted::Interrupted).await;
            tracing::debug!("Accept task exited");
        });

        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self {
            results: result_rx,
            handle,
            local_addr,
        })
    }

    /// Wait for the next accept result.
    pub async fn accept(&mut self) -> Accepted {
        if self.handle.is_closed() {
            return Accepted::Interrupted;
        }
        match self.results.recv().await {
            // A connection may have been queued right as close() landed;
            // it must not be handed out.
            Some(Accepted::Conn(..)) if self.handle.is_closed() => Accepted::Interrupted,
            Some(result) => result,
            None => Accepted::Interrupted,
        }
    }

    /// Handle for closing this listener from another task.
    pub fn handle(&self) -> InterruptHandle {
        self.handle.clone()
    }

    /// The local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
