//! Backend VM control subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator / idle monitor
//!     → VmController (trait seam, mocked in tests)
//!     → virtualbox.rs (VBoxManage subprocess, line-oriented output parsing)
//! ```
//!
//! # Design Decisions
//! - The trait is the only surface the proxy core sees; the VBoxManage
//!   mechanics stay behind it
//! - start/suspend are idempotent so racing arrivals and retrying monitors
//!   never have to coordinate with the hypervisor's actual state
//! - suspend uses savestate: the guest's state is preserved, never discarded

use std::future::Future;

use thiserror::Error;

pub mod virtualbox;

pub use virtualbox::{ManageRunner, VBoxManageCli, VirtualBox};

/// Errors from the VM controller boundary.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("vm does not exist: {0}")]
    NotFound(String),

    #[error("vm is not running: {0}")]
    NotRunning(String),

    #[error("failed to run VBoxManage: {0}")]
    Command(#[from] std::io::Error),

    #[error("VBoxManage exited with {status}: {stderr}")]
    CommandFailed {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("unable to parse guest network address")]
    AddressParse,
}

/// Control surface for the lazily started backend VM.
///
/// All operations are safe to call concurrently; in practice the proxy
/// serializes `start` (triggering arrival only) and `suspend` (idle monitor
/// only) by construction.
pub trait VmController: Send + Sync + 'static {
    /// Whether the named VM exists at all.
    fn exists(&self) -> impl Future<Output = Result<bool, VmError>> + Send;

    /// Whether the VM is currently running.
    fn is_running(&self) -> impl Future<Output = Result<bool, VmError>> + Send;

    /// Start the VM. No-op if it is already running.
    fn start(&self) -> impl Future<Output = Result<(), VmError>> + Send;

    /// Suspend the VM, preserving its state. No-op if already stopped.
    /// Succeeds only once the hypervisor acknowledges the request.
    fn suspend(&self) -> impl Future<Output = Result<(), VmError>> + Send;

    /// Resolve the VM's guest network address. Fails when not running.
    fn resolve_addr(&self) -> impl Future<Output = Result<String, VmError>> + Send;
}
