//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files;
//! every field has a default so a minimal config (or none at all, with the
//! machine name coming from the CLI) is enough.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend VM configuration.
    pub vm: VmConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Backend VM configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VmConfig {
    /// VirtualBox machine name. Required; may come from the CLI instead.
    pub machine: String,

    /// Target port on the guest (e.g., 3389 for RDP).
    pub target_port: u16,

    /// Idle monitor poll interval, seconds.
    pub poll_interval_secs: u64,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            machine: String::new(),
            target_port: 3389,
            poll_interval_secs: 1,
        }
    }
}
