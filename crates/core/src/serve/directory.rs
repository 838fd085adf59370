use super::accept_loop;
use crate::directory::DirectoryPayload;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Writes the same precomputed listing to every connection
#[derive(Debug, Clone)]
pub struct DirectoryServer {
    payload: Arc<[u8]>,
}

impl DirectoryServer {
    pub fn new(payload: &DirectoryPayload) -> Self {
        Self {
            payload: payload.shared(),
        }
    }

    /// Serve until `shutdown` is cancelled.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) {
        info!("Serving directory on {:?}", listener.local_addr().ok());
        let payload = self.payload;
        accept_loop("directory", listener, shutdown, move |stream, _peer| {
            send_listing(stream, Arc::clone(&payload))
        })
        .await;
    }
}

async fn send_listing(mut stream: TcpStream, payload: Arc<[u8]>) -> Result<()> {
    stream
        .write_all(&payload)
        .await
        .context("Unable to write directory data to socket")?;
    debug!("Directory sent ({} bytes)", payload.len());

    stream.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serve::tests::{fetch, loopback_listener};
    use tcpsite_common::Target;

    #[tokio::test]
    async fn test_repeated_requests_are_identical() {
        let payload =
            DirectoryPayload::from_targets(&[Target::file("/srv/photo.jpg"), Target::Directory])
                .unwrap();

        let (listener, addr) = loopback_listener().await;
        let shutdown = CancellationToken::new();
        tokio::spawn(DirectoryServer::new(&payload).serve(listener, shutdown.clone()));

        let first = fetch(addr).await;
        assert_eq!(first, br#"{"photo.jpg":1}"#);
        for _ in 0..5 {
            assert_eq!(fetch(addr).await, first);
        }

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let payload = DirectoryPayload::from_targets(&[Target::file("a.txt")]).unwrap();

        let (listener, addr) = loopback_listener().await;
        let shutdown = CancellationToken::new();
        tokio::spawn(DirectoryServer::new(&payload).serve(listener, shutdown.clone()));

        let mut clients = tokio::task::JoinSet::new();
        for _ in 0..16 {
            clients.spawn(fetch(addr));
        }
        while let Some(body) = clients.join_next().await {
            assert_eq!(body.unwrap(), payload.as_bytes());
        }

        shutdown.cancel();
    }
}
