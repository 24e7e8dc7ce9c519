//! Backend activation state machine.
//!
//! # Responsibilities
//! - Track the VM's activation cycle: Stopped → Starting → Running →
//!   Stopping → Stopped
//! - Elect exactly one winner for the Stopped→Starting edge when several
//!   connections arrive at once
//! - Give the idle monitor sole ownership of the Stopping→Stopped edge
//!
//! # Design Decisions
//! - Every edge is a compare-and-swap, never a read-then-write, so a
//!   second concurrent trigger is a no-op instead of a duplicate monitor.

use std::sync::atomic::{AtomicU8, Ordering};

const STOPPED: u8 = 0;
const STARTING: u8 = 1;
const RUNNING: u8 = 2;
const STOPPING: u8 = 3;

/// Current phase of the activation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Atomic activation state, one per proxy instance.
#[derive(Debug)]
pub struct Activation {
    state: AtomicU8,
}

impl Activation {
    /// Start at `Stopped`; the first connection triggers the cycle.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(STOPPED),
        }
    }

    /// The current state.
    pub fn state(&self) -> ActivationState {
        match self.state.load(Ordering::SeqCst) {
            STARTING => ActivationState::Starting,
            RUNNING => ActivationState::Running,
            STOPPING => ActivationState::Stopping,
            _ => ActivationState::Stopped,
        }
    }

    /// Claim the Stopped→Starting edge. Exactly one caller per cycle wins.
    pub fn try_trigger(&self) -> bool {
        self.state
            .compare_exchange(STOPPED, STARTING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Starting→Running, once the VM start has been issued.
    pub fn set_running(&self) {
        let _ = self
            .state
            .compare_exchange(STARTING, RUNNING, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Starting→Stopped, when the start attempt failed. The next arrival
    /// may trigger a fresh cycle.
    pub fn abort_start(&self) {
        let _ = self
            .state
            .compare_exchange(STARTING, STOPPED, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Running→Stopping, entered by the idle monitor when the open
    /// connection count drains. Returns false if already stopping.
    pub fn begin_stopping(&self) -> bool {
        self.state
            .compare_exchange(RUNNING, STOPPING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Stopping→Stopped: single-winner close of the cycle. A concurrent
    /// second clear is a no-op returning false.
    pub fn try_clear(&self) -> bool {
        self.state
            .compare_exchange(STOPPING, STOPPED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl Default for Activation {
    fn default() -> Self {
        Self::new()
    }
}
