//! lazyvm binary: starts a VirtualBox VM on incoming connection, proxies
//! the traffic, and suspends the VM again on idle.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use lazyvm::config::{self, ProxyConfig};
use lazyvm::lifecycle::signals;
use lazyvm::observability::logging;
use lazyvm::proxy::Proxy;
use lazyvm::vm::VirtualBox;

#[derive(Parser)]
#[command(name = "lazyvm", version)]
#[command(about = "Starts a VM on incoming remote session connection, suspends it on idle")]
struct Args {
    /// Network address to listen on (default 0.0.0.0:5000)
    #[arg(short, long)]
    addr: Option<String>,

    /// Target port on the machine (default 3389)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Turn on verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// VirtualBox machine name
    machine: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(addr) = args.addr {
        config.listener.bind_address = addr;
    }
    if let Some(port) = args.port {
        config.vm.target_port = port;
    }
    if let Some(machine) = args.machine {
        config.vm.machine = machine;
    }
    config::ensure_valid(&config)?;

    tracing::info!(
        machine = %config.vm.machine,
        bind_address = %config.listener.bind_address,
        target_port = config.vm.target_port,
        "lazyvm starting"
    );

    let controller = VirtualBox::new(&config.vm.machine);
    let proxy = Arc::new(Proxy::new(config, controller));

    signals::spawn_handler(proxy.shutdown_handle());

    proxy.run().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
