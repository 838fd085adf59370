/// Hidden service control
///
/// A small client for the Tor control protocol: connect to the control
/// endpoint, authenticate, and register an onion service whose virtual
/// ports forward to our local listeners.

use crate::mapping::OnionPortSpec;
use async_trait::async_trait;
use tcpsite_common::SiteError;

mod addr;
mod client;
mod onion;
mod reply;

pub use addr::{ControlAddr, ControlAddrError};
pub use client::{ControlStream, TorControl};
pub use onion::{OnionId, OnionInfo};
pub use reply::{ProtocolInfo, Reply, ReplyParser};

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Failed to connect to control socket: {0}")]
    Connect(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Command rejected: {status} {message}")]
    Command { status: u16, message: String },

    #[error("Malformed control reply: {0}")]
    Malformed(String),

    #[error("Control connection closed")]
    Closed,

    #[error("Invalid onion service id: {0}")]
    InvalidOnionId(String),

    #[error(transparent)]
    Address(#[from] ControlAddrError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ControlError> for SiteError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::Connect(_) | ControlError::Address(_) => {
                SiteError::control_connection(err.to_string())
            }
            ControlError::Authentication(_) => SiteError::authentication(err.to_string()),
            ControlError::Io(e) => SiteError::Io(e),
            other => SiteError::protocol(other.to_string()),
        }
    }
}

/// Registers the site's ports as a hidden service.
///
/// The service may only live as long as the publisher, so whoever runs
/// the site keeps it around until shutdown.
#[async_trait]
pub trait HiddenServicePublisher: Send {
    async fn publish(
        &mut self,
        ports: &[OnionPortSpec],
        transient: bool,
    ) -> Result<OnionInfo, ControlError>;
}

#[async_trait]
impl HiddenServicePublisher for TorControl {
    async fn publish(
        &mut self,
        ports: &[OnionPortSpec],
        transient: bool,
    ) -> Result<OnionInfo, ControlError> {
        self.add_onion(ports, transient).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_map_to_site_errors() {
        let err: SiteError = ControlError::Authentication("bad cookie".into()).into();
        assert!(matches!(err, SiteError::AuthenticationFailed(_)));
        assert!(err.is_fatal());

        let err: SiteError = ControlError::Connect("refused".into()).into();
        assert!(matches!(err, SiteError::ControlConnection(_)));

        let err: SiteError = ControlError::Closed.into();
        assert!(matches!(err, SiteError::Protocol(_)));
    }
}
