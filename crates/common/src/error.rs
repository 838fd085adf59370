use thiserror::Error;

/// Common error types for tcpsite
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Control connection failed: {0}")]
    ControlConnection(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Hidden service registration failed: {0}")]
    Registration(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Domain(#[from] crate::DomainError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for tcpsite operations
pub type Result<T> = std::result::Result<T, SiteError>;

impl SiteError {
    pub fn control_connection(msg: impl Into<String>) -> Self {
        Self::ControlConnection(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed(msg.into())
    }

    pub fn registration(msg: impl Into<String>) -> Self {
        Self::Registration(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Fatal errors stop the process; everything else is logged and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ControlConnection(_)
                | Self::AuthenticationFailed(_)
                | Self::Registration(_)
                | Self::Config(_)
        )
    }
}
