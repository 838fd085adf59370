pub mod config;
pub mod error;

pub use config::{ConfigError, SiteConfig};
pub use error::{Result, SiteError};

use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("virtual port {0} is reserved for the directory")]
    ReservedVirtualPort(u16),
    #[error("virtual port 0 is not a valid port")]
    ZeroVirtualPort,
    #[error("invalid virtual port: {0}")]
    InvalidVirtualPort(String),
}

/// Port number a target is reachable on through the hidden service.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualPort(u16);

impl VirtualPort {
    /// Reserved for the directory listing.
    pub const DIRECTORY: VirtualPort = VirtualPort(u16::MAX);

    /// Virtual port of the single served file.
    pub const FILE: VirtualPort = VirtualPort(1);

    /// Creates a port for a file target. The directory port and zero are refused.
    pub fn for_file(port: u16) -> std::result::Result<Self, DomainError> {
        match port {
            0 => Err(DomainError::ZeroVirtualPort),
            p if p == Self::DIRECTORY.0 => Err(DomainError::ReservedVirtualPort(p)),
            p => Ok(Self(p)),
        }
    }

    pub fn get(&self) -> u16 {
        self.0
    }

    pub fn is_directory(&self) -> bool {
        *self == Self::DIRECTORY
    }
}

impl fmt::Debug for VirtualPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualPort({})", self.0)
    }
}

impl fmt::Display for VirtualPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<VirtualPort> for u16 {
    fn from(value: VirtualPort) -> Self {
        value.0
    }
}

impl FromStr for VirtualPort {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let port = s
            .parse::<u16>()
            .map_err(|err| DomainError::InvalidVirtualPort(err.to_string()))?;
        Self::for_file(port)
    }
}

/// Something served on its own listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// A file on local storage, re-read for every connection.
    File { path: PathBuf, port: VirtualPort },
    /// The synthetic name-to-port listing of all file targets.
    Directory,
}

impl Target {
    /// File target on the default file virtual port.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            port: VirtualPort::FILE,
        }
    }

    /// File target on its own virtual port. The directory port is refused.
    pub fn file_on(
        path: impl Into<PathBuf>,
        port: VirtualPort,
    ) -> std::result::Result<Self, DomainError> {
        if port.is_directory() {
            return Err(DomainError::ReservedVirtualPort(port.get()));
        }
        Ok(Self::File {
            path: path.into(),
            port,
        })
    }

    pub fn virtual_port(&self) -> VirtualPort {
        match self {
            Self::File { port, .. } => *port,
            Self::Directory => VirtualPort::DIRECTORY,
        }
    }

    /// Name advertised in the directory: the last path component.
    ///
    /// `None` for the directory itself.
    pub fn listing_name(&self) -> Option<String> {
        match self {
            Self::File { path, .. } => Some(
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            ),
            Self::Directory => None,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { path, port } => write!(f, "file {} (port {})", path.display(), port),
            Self::Directory => write!(f, "directory (port {})", VirtualPort::DIRECTORY),
        }
    }
}
