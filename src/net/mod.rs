//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (background accept task, interruptible)
//!     → connection.rs (open-connection tracking)
//!     → activity.rs (I/O counting, pause barrier)
//!     → Hand off to the forwarding loop
//! ```
//!
//! # Design Decisions
//! - Closing the listener yields a sentinel, never a raw I/O error
//! - Each connection is tracked so the idle monitor knows when to suspend
//! - The activity barrier is a pause hook, open in the steady state

pub mod activity;
pub mod connection;
pub mod listener;

pub use activity::{ActivityGate, GatedStream};
pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Accepted, InterruptHandle, InterruptibleListener};
