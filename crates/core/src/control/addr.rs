/// Control endpoint address specs
///
/// Accepted forms:
/// - `default://`: the local Unix socket, then the default TCP port
/// - `tcp://host:port` or a bare `host:port`
/// - `unix:///path/to/socket` or a bare absolute path

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tcpsite_common::config::control;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAddr {
    Default,
    Tcp(String),
    Unix(PathBuf),
}

impl ControlAddr {
    /// Concrete endpoints to try, in order.
    pub fn candidates(&self) -> Vec<ControlAddr> {
        match self {
            Self::Default => vec![
                Self::Unix(PathBuf::from(control::DEFAULT_UNIX_SOCKET)),
                Self::Tcp(control::DEFAULT_TCP_ADDR.to_string()),
            ],
            other => vec![other.clone()],
        }
    }
}

impl fmt::Display for ControlAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "{}", control::DEFAULT_ADDR),
            Self::Tcp(addr) => write!(f, "tcp://{}", addr),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ControlAddrError {
    #[error("unsupported control address scheme: {0}")]
    UnsupportedScheme(String),

    #[error("missing host:port in control address: {0}")]
    MissingHostPort(String),

    #[error("missing socket path in control address: {0}")]
    MissingPath(String),
}

impl FromStr for ControlAddr {
    type Err = ControlAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == control::DEFAULT_ADDR {
            return Ok(Self::Default);
        }

        match s.split_once("://") {
            Some(("tcp", rest)) => parse_tcp(rest, s),
            Some(("unix", rest)) => {
                if rest.is_empty() {
                    Err(ControlAddrError::MissingPath(s.to_string()))
                } else {
                    Ok(Self::Unix(PathBuf::from(rest)))
                }
            }
            Some((scheme, _)) => Err(ControlAddrError::UnsupportedScheme(scheme.to_string())),
            None if s.starts_with('/') => Ok(Self::Unix(PathBuf::from(s))),
            None => parse_tcp(s, s),
        }
    }
}

fn parse_tcp(host_port: &str, original: &str) -> Result<ControlAddr, ControlAddrError> {
    match host_port.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(ControlAddr::Tcp(host_port.to_string()))
        }
        _ => Err(ControlAddrError::MissingHostPort(original.to_string())),
    }
}
