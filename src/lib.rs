//! lazyvm — an idle-activated TCP proxy for VirtualBox machines.
//!
//! Listens for inbound connections, starts the named VM on first demand,
//! forwards bytes opaquely in both directions, and suspends the VM again
//! once every connection has closed. The forwarded protocol is a black
//! box; it was built for RDP but works with anything TCP.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────┐
//!                    │                   LAZYVM                      │
//!                    │                                               │
//!   Client ──────────┼─▶ net::listener ──▶ proxy (orchestrator) ──┐  │
//!                    │        │                  │                │  │
//!                    │        │                  ▼                ▼  │
//!                    │        │            vm::VirtualBox      dial ─┼──▶ Guest VM
//!                    │        │           (start / suspend /        │
//!                    │        │            resolve address)         │
//!                    │        │                  ▲                  │
//!                    │        ▼                  │                  │
//!                    │  net::connection ──▶ proxy::monitor          │
//!                    │  (open count)       (idle → suspend)         │
//!                    │                                               │
//!                    │  Cross-cutting: config, lifecycle,            │
//!                    │  observability                                │
//!                    └───────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod vm;

pub use config::ProxyConfig;
pub use lifecycle::Shutdown;
pub use proxy::{Proxy, ProxyError};
pub use vm::{VirtualBox, VmController, VmError};
