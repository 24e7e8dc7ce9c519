//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger (once-guarded)
//!
//! Shutdown (shutdown.rs):
//!     trigger → broadcast → listener closes, idle monitor exits,
//!     in-flight forwarders force-closed
//! ```
//!
//! # Design Decisions
//! - Every shutdown path funnels through one broadcast
//! - Triggering twice is a tolerated no-op, not a crash

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
