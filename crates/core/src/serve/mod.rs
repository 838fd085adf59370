/// Per-target serving loops
///
/// Every listener gets one accept loop. Each accepted connection is
/// handed to its own task, so a slow client never holds up the next
/// accept. Handler errors are logged and stay inside their task.

use std::future::Future;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

mod directory;
mod file;

pub use directory::DirectoryServer;
pub use file::FileServer;

/// Accept until `shutdown` fires, spawning `handle` for every connection.
///
/// Accept errors do not end the loop.
pub(crate) async fn accept_loop<F, Fut>(
    name: &'static str,
    listener: TcpListener,
    shutdown: CancellationToken,
    handle: F,
) where
    F: Fn(TcpStream, SocketAddr) -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("{}: listener shutting down", name);
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("{}: New connection from {}", name, peer);
                    let task = handle(stream, peer);
                    tokio::spawn(async move {
                        if let Err(e) = task.await {
                            error!("{} error: {:#}", name, e);
                        }
                    });
                }
                Err(e) => {
                    warn!("{}: accept failed: {}", name, e);
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    /// Connect and read until the server closes.
    pub(crate) async fn fetch(addr: std::net::SocketAddr) -> Vec<u8> {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut body = Vec::new();
        stream.read_to_end(&mut body).await.unwrap();
        body
    }

    pub(crate) async fn loopback_listener() -> (tokio::net::TcpListener, std::net::SocketAddr) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }
}
