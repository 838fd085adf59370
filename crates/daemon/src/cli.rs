/// Command line surface

use clap::Parser;
use std::path::PathBuf;
use tcpsite_common::{Result, SiteConfig};

/// Serve one file over an onion service, with a JSON directory on port 65535
#[derive(Parser, Debug)]
#[command(name = "tcpsite", version, about, long_about = None)]
pub struct Args {
    /// Path to the file to serve
    pub file: PathBuf,

    /// Show what's happening, including control port traffic
    #[arg(long)]
    pub debug: bool,

    /// Control address (default://, tcp://host:port or unix:///path)
    #[arg(long = "control-addr")]
    pub control_addr: Option<String>,

    /// Control port authentication password
    #[arg(long = "control-passwd")]
    pub control_passwd: Option<String>,

    /// TOML file with defaults for the control settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Config file values (or defaults), overridden by any flags given.
    pub fn site_config(&self) -> Result<SiteConfig> {
        let mut config = match &self.config {
            Some(path) => SiteConfig::from_file(path)?,
            None => SiteConfig::default(),
        };

        if let Some(addr) = &self.control_addr {
            config = config.with_control_addr(addr.as_str());
        }
        if let Some(password) = &self.control_passwd {
            config = config.with_control_password(password.as_str());
        }
        if self.debug {
            config = config.with_debug(true);
        }

        Ok(config)
    }
}
