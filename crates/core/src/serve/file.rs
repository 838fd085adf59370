use super::accept_loop;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Streams one file, read fresh from disk, to every connection
#[derive(Debug, Clone)]
pub struct FileServer {
    path: Arc<Path>,
}

impl FileServer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        Self {
            path: Arc::from(path),
        }
    }

    /// Serve until `shutdown` is cancelled.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) {
        info!("Serving {} on {:?}", self.path.display(), listener.local_addr().ok());
        let path = self.path;
        accept_loop("file", listener, shutdown, move |stream, _peer| {
            send_file(stream, Arc::clone(&path))
        })
        .await;
    }
}

/// Copy the whole file to the connection, then close it.
async fn send_file(mut stream: TcpStream, path: Arc<Path>) -> Result<()> {
    let mut file = File::open(&*path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;

    let written = tokio::io::copy(&mut file, &mut stream)
        .await
        .with_context(|| format!("failed to send {}", path.display()))?;
    info!("Written {} bytes", written);

    stream.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serve::tests::{fetch, loopback_listener};
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_serves_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"\x89PNG not really").unwrap();

        let (listener, addr) = loopback_listener().await;
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(FileServer::new(&path).serve(listener, shutdown.clone()));

        assert_eq!(fetch(addr).await, b"\x89PNG not really");

        shutdown.cancel();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_rereads_file_per_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"first").unwrap();

        let (listener, addr) = loopback_listener().await;
        let shutdown = CancellationToken::new();
        tokio::spawn(FileServer::new(&path).serve(listener, shutdown.clone()));

        assert_eq!(fetch(addr).await, b"first");
        std::fs::write(&path, b"second version").unwrap();
        assert_eq!(fetch(addr).await, b"second version");

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_missing_file_yields_empty_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");

        let (listener, addr) = loopback_listener().await;
        let shutdown = CancellationToken::new();
        tokio::spawn(FileServer::new(&path).serve(listener, shutdown.clone()));

        assert!(fetch(addr).await.is_empty());
        // the loop is still accepting
        assert!(fetch(addr).await.is_empty());

        std::fs::write(&path, b"now it exists").unwrap();
        assert_eq!(fetch(addr).await, b"now it exists");

        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_slow_reader_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let body = vec![0x5au8; 16 * 1024 * 1024];
        std::fs::write(&path, &body).unwrap();

        let (listener, addr) = loopback_listener().await;
        let shutdown = CancellationToken::new();
        tokio::spawn(FileServer::new(&path).serve(listener, shutdown.clone()));

        // connects but never reads, so its transfer stalls on a full socket buffer
        let stalled = TcpStream::connect(addr).await.unwrap();

        let second = timeout(Duration::from_secs(10), fetch(addr))
            .await
            .expect("second connection was held up by the stalled one");
        assert_eq!(second.len(), body.len());

        drop(stalled);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_cancel_stops_loop() {
        let (listener, _addr) = loopback_listener().await;
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(FileServer::new("/nonexistent").serve(listener, shutdown.clone()));

        shutdown.cancel();
        timeout(Duration::from_secs(5), server)
            .await
            .expect("loop did not stop")
            .unwrap();
    }
}
