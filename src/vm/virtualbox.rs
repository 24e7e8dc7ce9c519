//! VirtualBox controller driven through the `VBoxManage` CLI.
//!
//! # Responsibilities
//! - Query machine existence and run state (`list vms` / `list runningvms`)
//! - Start headless (`startvm --type headless`)
//! - Suspend via savestate (`controlvm savestate`)
//! - Resolve the guest IPv4 address (`guestproperty enumerate`)
//!
//! Command execution sits behind [`ManageRunner`] and output parsing is
//! kept in pure functions, so everything above the subprocess boundary can
//! be tested against captured VBoxManage output.

use std::future::Future;

use tokio::process::Command;

use crate::vm::{VmController, VmError};

/// The guest property key fragment carrying the IPv4 lease.
const V4_IP_MARKER: &str = "/V4/IP";
const VALUE_MARKER: &str = "value:";

/// Executes one `VBoxManage` invocation, returning its stdout.
pub trait ManageRunner: Send + Sync + 'static {
    fn run(&self, args: &[&str]) -> impl Future<Output = Result<String, VmError>> + Send;
}

/// Runs the real `VBoxManage` binary found on `PATH`.
pub struct VBoxManageCli;

impl ManageRunner for VBoxManageCli {
    async fn run(&self, args: &[&str]) -> Result<String, VmError> {
        let output = Command::new("VBoxManage").args(args).output().await?;
        if !output.status.success() {
            return Err(VmError::CommandFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// VirtualBox machine handle.
pub struct VirtualBox<R: ManageRunner = VBoxManageCli> {
    name: String,
    runner: R,
}

impl VirtualBox {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_runner(name, VBoxManageCli)
    }
}

impl<R: ManageRunner> VirtualBox<R> {
    /// Build a controller over a custom runner.
    pub fn with_runner(name: impl Into<String>, runner: R) -> Self {
        Self {
            name: name.into(),
            runner,
        }
    }

    /// Whether `VBoxManage list <which>` includes this machine.
    async fn listed(&self, which: &str) -> Result<bool, VmError> {
        let out = self.runner.run(&["list", which]).await?;
        Ok(listing_contains(&out, &self.name))
    }
}

impl<R: ManageRunner> VmController for VirtualBox<R> {
    async fn exists(&self) -> Result<bool, VmError> {
        self.listed("vms").await
    }

    async fn is_running(&self) -> Result<bool, VmError> {
        self.listed("runningvms").await
    }

    async fn start(&self) -> Result<(), VmError> {
        if self.is_running().await? {
            return Ok(());
        }
        self.runner
            .run(&["startvm", &self.name, "--type", "headless"])
            .await?;
        Ok(())
    }

    async fn suspend(&self) -> Result<(), VmError> {
        if !self.is_running().await? {
            return Ok(());
        }
        self.runner
            .run(&["controlvm", &self.name, "savestate"])
            .await?;
        Ok(())
    }

    async fn resolve_addr(&self) -> Result<String, VmError> {
        if !self.is_running().await? {
            return Err(VmError::NotRunning(self.name.clone()));
        }
        let out = self
            .runner
            .run(&["guestproperty", "enumerate", &self.name])
            .await?;
        parse_guest_addr(&out)
    }
}

/// Whether a `VBoxManage list` output names `name`.
///
/// Lines look like `"machine name" {uuid}`; match on the quoted name
/// followed by a space so prefixes don't collide.
fn listing_contains(output: &str, name: &str) -> bool {
    let needle = format!("\"{}\" ", name);
    output.lines().any(|line| line.starts_with(&needle))
}

/// Extract the guest IPv4 address from `guestproperty enumerate` output.
///
/// Scans for a property line carrying a `/V4/IP` key and takes the text
/// between the `value:` marker and the following comma, trimmed. Exhausting
/// the output without a match is an address-parse failure.
fn parse_guest_addr(output: &str) -> Result<String, VmError> {
    for line in output.lines() {
        let Some(key_at) = line.find(V4_IP_MARKER) else {
            continue;
        };
        let rest = &line[key_at..];
        let Some(value_at) = rest.find(VALUE_MARKER) else {
            continue;
        };
        let rest = &rest[value_at + VALUE_MARKER.len()..];
        let Some(comma_at) = rest.find(',') else {
            continue;
        };
        let addr = rest[..comma_at].trim();
        if addr.is_empty() {
            continue;
        }
        return Ok(addr.to_string());
    }
    Err(VmError::AddressParse)
}
