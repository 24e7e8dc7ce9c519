//! Activity-tracking stream wrapper with a pause barrier.
//!
//! # Responsibilities
//! - Count every read/write attempt on forwarded connections
//! - Park I/O while the shared barrier is closed
//!
//! # Design Decisions
//! - The counter only ever increases; it answers "has there been activity",
//!   not "how many connections are open" (the tracker owns that).
//! - The barrier is open in the steady state. Closing it is a hook for
//!   pausing traffic around a backend reconfiguration; nothing closes it
//!   mid-connection today.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{ready, Context, Poll, Waker};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Shared activity counter plus wait barrier.
pub struct ActivityGate {
    /// Total read/write attempts observed. Relaxed is sufficient: the value
    /// is a monotone activity signal, not a synchronization point.
    ops: AtomicU64,
    barrier: Mutex<Barrier>,
}

struct Barrier {
    open: bool,
    waiters: Vec<Waker>,
}

impl ActivityGate {
    /// Create a gate with the barrier open.
    pub fn new() -> Self {
        Self {
            ops: AtomicU64::new(0),
            barrier: Mutex::new(Barrier {
                open: true,
                waiters: Vec::new(),
            }),
        }
    }

    /// Record one I/O attempt.
    pub fn record(&self) {
        self.ops.fetch_add(1, Ordering::Relaxed);
    }

    /// Total I/O attempts observed so far.
    pub fn ops(&self) -> u64 {
        self.ops.load(Ordering::Relaxed)
    }

    /// Close the barrier; subsequent I/O parks until [`open`](Self::open).
    pub fn close(&self) {
        let mut barrier = self.barrier.lock().expect("gate barrier poisoned");
        barrier.open = false;
    }

    /// Open the barrier and wake every parked waiter.
    pub fn open(&self) {
        let mut barrier = self.barrier.lock().expect("gate barrier poisoned");
        barrier.open = true;
        for waker in barrier.waiters.drain(..) {
            waker.wake();
        }
    }

    /// Whether the barrier currently admits I/O.
    pub fn is_open(&self) -> bool {
        self.barrier.lock().expect("gate barrier poisoned").open
    }

    fn poll_barrier(&self, cx: &mut Context<'_>) -> Poll<()> {
        let mut barrier = self.barrier.lock().expect("gate barrier poisoned");
        if barrier.open {
            return Poll::Ready(());
        }
        if !barrier.waiters.iter().any(|w| w.will_wake(cx.waker())) {
            barrier.waiters.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl Default for ActivityGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream wrapper that records activity and honors the gate barrier.
///
/// Every `poll_read`/`poll_write` first bumps the shared counter, then
/// parks until the barrier is open, then delegates to the inner stream.
pub struct GatedStream<S> {
    inner: S,
    gate: Arc<ActivityGate>,
}

impl<S> GatedStream<S> {
    pub fn new(inner: S, gate: Arc<ActivityGate>) -> Self {
        Self { inner, gate }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for GatedStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.gate.record();
        ready!(self.gate.poll_barrier(cx));
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for GatedStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.gate.record();
        ready!(self.gate.poll_barrier(cx));
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
