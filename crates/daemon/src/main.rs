/// tcpsite - tiny sites over onion services
///
/// Serves one file, plus a JSON directory naming it, from loopback
/// listeners published as a transient onion service:
/// - virtual port 1 streams the file
/// - virtual port 65535 returns `{"<file name>":1}`

use anyhow::{Context, Result};
use clap::Parser;
use tcpsite_core::{ControlAddr, Supervisor, TorControl};
use tcpsite_daemon::{logging, Args, ShutdownSignal};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.site_config()?;

    logging::init(config.debug)?;
    info!("Starting tcpsite v{}", env!("CARGO_PKG_VERSION"));

    // Connect to a running tor instance
    let addr: ControlAddr = config
        .control_addr
        .parse()
        .context("Invalid control address")?;
    let mut control = TorControl::connect(&addr)
        .await
        .context("Failed to connect to control socket")?;
    control.set_debug(config.debug);

    control
        .authenticate(config.control_password.as_deref())
        .await
        .context("Authentication failed")?;

    let site = Supervisor::new(&args.file).start(control).await?;
    println!("{}", site.service().onion_id.hostname());

    let mut signals = ShutdownSignal::new().context("Failed to install signal handlers")?;
    let shutdown = site.shutdown_token();
    tokio::spawn(async move {
        match signals.recv().await {
            Ok(name) => {
                info!("{} received, shutting down", name);
                shutdown.cancel();
            }
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        }
    });

    site.wait().await;
    info!("Stopped");
    Ok(())
}
