use super::reply::{quote, ProtocolInfo, Reply, ReplyParser};
use super::{ControlAddr, ControlError, OnionId, OnionInfo};
use crate::mapping::OnionPortSpec;
use std::io;
use tcpsite_common::config::control;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Anything the control protocol can run over
pub trait ControlStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ControlStream for T {}

/// Connection to a Tor control port
pub struct TorControl {
    stream: BufStream<Box<dyn ControlStream>>,
    debug: bool,
}

impl TorControl {
    /// Connect to the first reachable endpoint of `addr`.
    pub async fn connect(addr: &ControlAddr) -> Result<Self, ControlError> {
        let mut failures = Vec::new();

        for candidate in addr.candidates() {
            match connect_endpoint(&candidate).await {
                Ok(stream) => {
                    info!("Connected to control port at {}", candidate);
                    return Ok(Self::from_boxed(stream));
                }
                Err(e) => {
                    debug!("Control endpoint {} unavailable: {}", candidate, e);
                    failures.push(format!("{}: {}", candidate, e));
                }
            }
        }

        Err(ControlError::Connect(failures.join("; ")))
    }

    pub fn from_stream<S: ControlStream + 'static>(stream: S) -> Self {
        Self::from_boxed(Box::new(stream))
    }

    fn from_boxed(stream: Box<dyn ControlStream>) -> Self {
        Self {
            stream: BufStream::new(stream),
            debug: false,
        }
    }

    /// Log every line sent and received.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Send a command and wait for its reply, failing on a non-2xx status.
    pub async fn request(&mut self, command: &str) -> Result<Reply, ControlError> {
        self.send(command, command).await?;
        let reply = self.read_reply().await?;
        if !reply.is_ok() {
            return Err(ControlError::Command {
                status: reply.status,
                message: reply.message().to_string(),
            });
        }
        Ok(reply)
    }

    pub async fn protocol_info(&mut self) -> Result<ProtocolInfo, ControlError> {
        let reply = self
            .request(&format!("PROTOCOLINFO {}", control::PROTOCOLINFO_VERSION))
            .await?;
        ProtocolInfo::from_reply(&reply)
    }

    /// Authenticate with `password` if given, otherwise with whatever
    /// password-less method the control port offers.
    pub async fn authenticate(&mut self, password: Option<&str>) -> Result<(), ControlError> {
        let info = self.protocol_info().await?;
        debug!(
            "Control port offers {:?} (Tor {})",
            info.auth_methods,
            info.tor_version.as_deref().unwrap_or("unknown")
        );

        let command = match password.filter(|p| !p.is_empty()) {
            Some(password) => format!("AUTHENTICATE {}", quote(password)),
            None if info.supports("NULL") => "AUTHENTICATE".to_string(),
            None if info.supports("COOKIE") => {
                let path = info.cookie_file.as_ref().ok_or_else(|| {
                    ControlError::Authentication("COOKIE offered without COOKIEFILE".into())
                })?;
                let cookie = tokio::fs::read(path).await.map_err(|e| {
                    ControlError::Authentication(format!(
                        "cannot read cookie {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                format!("AUTHENTICATE {}", hex::encode(cookie))
            }
            None => {
                return Err(ControlError::Authentication(format!(
                    "no usable method among {:?}; a password is required",
                    info.auth_methods
                )))
            }
        };

        self.send(&command, "AUTHENTICATE <redacted>").await?;
        let reply = self.read_reply().await?;
        if !reply.is_ok() {
            return Err(ControlError::Authentication(reply.message().to_string()));
        }

        debug!("Authenticated with control port");
        Ok(())
    }

    /// Create an onion service forwarding each virtual port to its target.
    ///
    /// A transient service has its key discarded and disappears when this
    /// connection closes; otherwise it is detached and outlives us.
    pub async fn add_onion(
        &mut self,
        ports: &[OnionPortSpec],
        transient: bool,
    ) -> Result<OnionInfo, ControlError> {
        let mut command = String::from("ADD_ONION NEW:BEST");
        command.push_str(if transient {
            " Flags=DiscardPK"
        } else {
            " Flags=Detach"
        });
        for spec in ports {
            command.push_str(&format!(" Port={}", spec));
        }

        let reply = self.request(&command).await?;
        let onion_id = reply
            .value("ServiceID")
            .ok_or_else(|| ControlError::Malformed("ADD_ONION reply without ServiceID".into()))?
            .parse::<OnionId>()?;

        Ok(OnionInfo {
            onion_id,
            private_key: reply.value("PrivateKey").map(str::to_string),
        })
    }

    async fn send(&mut self, line: &str, shown: &str) -> Result<(), ControlError> {
        if self.debug {
            debug!("control -> {}", shown);
        }
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Next reply that is not an asynchronous event.
    async fn read_reply(&mut self) -> Result<Reply, ControlError> {
        let mut parser = ReplyParser::new();
        let mut line = String::new();

        loop {
            line.clear();
            if self.stream.read_line(&mut line).await? == 0 {
                return Err(ControlError::Closed);
            }
            if self.debug {
                debug!("control <- {}", line.trim_end());
            }

            if let Some(reply) = parser.push(&line)? {
                if reply.is_event() {
                    continue;
                }
                return Ok(reply);
            }
        }
    }
}

async fn connect_endpoint(addr: &ControlAddr) -> io::Result<Box<dyn ControlStream>> {
    match addr {
        ControlAddr::Tcp(host_port) => Ok(Box::new(TcpStream::connect(host_port.as_str()).await?)),
        #[cfg(unix)]
        ControlAddr::Unix(path) => Ok(Box::new(tokio::net::UnixStream::connect(path).await?)),
        #[cfg(not(unix))]
        ControlAddr::Unix(_) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "unix control sockets are not supported on this platform",
        )),
        ControlAddr::Default => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "default:// must be expanded into candidates first",
        )),
    }
}
