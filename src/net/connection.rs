//! Open-connection tracking.
//!
//! # Responsibilities
//! - Count connections currently being forwarded
//! - Generate unique connection IDs for tracing
//! - Guarantee exactly one decrement per accepted connection
//!
//! The idle monitor reads this count: the VM is only suspended once it has
//! drained to zero.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global atomic counter for connection IDs.
/// Relaxed ordering is sufficient since we only need uniqueness.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a forwarded connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tracks connections that are currently open.
///
/// Each proxy owns its own tracker (no process-wide state), shared with the
/// idle monitor and every forwarding task by clone.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    open_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self {
            open_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a new open connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.open_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            open_count: Arc::clone(&self.open_count),
            id: ConnectionId::new(),
        }
    }

    /// Number of connections currently open.
    pub fn open_count(&self) -> u64 {
        self.open_count.load(Ordering::SeqCst)
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that tracks one connection's lifetime.
///
/// Decrements the open count exactly once when dropped, whether the
/// connection finished forwarding or was abandoned before dialing.
#[derive(Debug)]
pub struct ConnectionGuard {
    open_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// This connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.open_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
