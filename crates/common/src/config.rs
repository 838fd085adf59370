use serde::{Deserialize, Serialize};
use std::path::Path;

/// Local listener constants
pub mod protocol {
    /// Loopback address every target listener binds to
    pub const LISTEN_ADDR: &str = "127.0.0.1";

    /// Port zero asks the OS for an ephemeral port
    pub const EPHEMERAL_PORT: u16 = 0;
}

/// Control connection constants
pub mod control {
    /// Address spec that probes the usual local control endpoints
    pub const DEFAULT_ADDR: &str = "default://";

    /// Unix control socket tried first for `default://`
    pub const DEFAULT_UNIX_SOCKET: &str = "/var/run/tor/control";

    /// TCP control port tried second for `default://`
    pub const DEFAULT_TCP_ADDR: &str = "127.0.0.1:9051";

    /// PROTOCOLINFO version we speak
    pub const PROTOCOLINFO_VERSION: u32 = 1;
}

/// Site configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Control endpoint address spec
    pub control_addr: String,

    /// Control authentication password
    pub control_password: Option<String>,

    /// Verbose diagnostics, including control traffic
    pub debug: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            control_addr: control::DEFAULT_ADDR.to_string(),
            control_password: None,
            debug: false,
        }
    }
}

impl SiteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_control_addr(mut self, addr: impl Into<String>) -> Self {
        self.control_addr = addr.into();
        self
    }

    /// An empty password means "no password".
    pub fn with_control_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.control_password = if password.is_empty() {
            None
        } else {
            Some(password)
        };
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Failed to serialize config: {0}")]
    SerializeError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),
}
