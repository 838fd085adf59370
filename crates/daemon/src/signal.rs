/// Shutdown signals

use std::io;
use tokio::signal;

/// Waits for Ctrl-C or, on Unix, SIGTERM.
///
/// Handlers are installed by `new`, so a signal arriving before the first
/// `recv` is not lost.
pub struct ShutdownSignal {
    #[cfg(unix)]
    terminate: signal::unix::Signal,
}

impl ShutdownSignal {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: signal::unix::signal(signal::unix::SignalKind::terminate())?,
        })
    }

    /// Resolves with the name of the signal received.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> io::Result<&'static str> {
        tokio::select! {
            res = signal::ctrl_c() => res.map(|_| "SIGINT"),
            _ = self.terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> io::Result<&'static str> {
        signal::ctrl_c().await.map(|_| "Ctrl-C")
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sigterm_is_caught() {
        let mut shutdown = ShutdownSignal::new().unwrap();

        let status = Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let received = tokio::time::timeout(Duration::from_secs(5), shutdown.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, "SIGTERM");
    }
}
