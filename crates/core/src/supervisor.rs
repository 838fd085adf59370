/// Site supervisor
///
/// Runs startup as one straight line:
/// 1. allocate a listener per target (failures are dropped)
/// 2. build the directory listing and start every serving loop
/// 3. publish the port mapping as a transient hidden service
///
/// After that the site only reacts to connections until it is shut down.

use crate::control::{HiddenServicePublisher, OnionInfo};
use crate::directory::DirectoryPayload;
use crate::listener::{self, Bind, LoopbackBinder};
use crate::mapping::PortMapping;
use crate::serve::{DirectoryServer, FileServer};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use tcpsite_common::{Result, SiteError, Target, VirtualPort};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub struct Supervisor<B = LoopbackBinder> {
    targets: Vec<Target>,
    binder: B,
    shutdown: CancellationToken,
}

impl Supervisor<LoopbackBinder> {
    /// Serve a single file plus the directory.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self::with_targets(vec![Target::file(file), Target::Directory])
    }

    pub fn with_targets(targets: Vec<Target>) -> Self {
        Self {
            targets,
            binder: LoopbackBinder,
            shutdown: CancellationToken::new(),
        }
    }
}

impl<B: Bind> Supervisor<B> {
    pub fn with_binder<B2: Bind>(self, binder: B2) -> Supervisor<B2> {
        Supervisor {
            targets: self.targets,
            binder,
            shutdown: self.shutdown,
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Allocate, dispatch and publish.
    ///
    /// The publisher is kept by the returned site so a transient service
    /// stays up for as long as the site runs.
    pub async fn start<P: HiddenServicePublisher>(self, mut publisher: P) -> Result<RunningSite<P>> {
        let allocation = listener::allocate(self.targets, &self.binder);
        let mapping = allocation.port_mapping();
        let payload = DirectoryPayload::from_targets(allocation.file_targets())
            .map_err(|e| SiteError::serialization(e.to_string()))?;
        debug!(
            "Allocated {} listener(s), directory lists {} file(s)",
            allocation.bound().len(),
            payload.entries().len()
        );

        let mut loops = JoinSet::new();
        let mut local_addrs = BTreeMap::new();
        for bound in allocation.into_bound() {
            let (target, listener, local_addr) = bound.into_parts();
            local_addrs.insert(target.virtual_port(), local_addr);

            let shutdown = self.shutdown.clone();
            match target {
                Target::File { path, .. } => {
                    loops.spawn(FileServer::new(path).serve(listener, shutdown));
                }
                Target::Directory => {
                    loops.spawn(DirectoryServer::new(&payload).serve(listener, shutdown));
                }
            }
        }

        let specs = mapping.port_specs();
        let service = match publisher.publish(&specs, true).await {
            Ok(service) => service,
            Err(e) => {
                self.shutdown.cancel();
                while loops.join_next().await.is_some() {}
                return Err(SiteError::registration(e.to_string()));
            }
        };
        info!("Running on {}", service.onion_id.hostname());

        Ok(RunningSite {
            service,
            mapping,
            payload,
            local_addrs,
            loops,
            shutdown: self.shutdown,
            publisher,
        })
    }
}

/// A published site with its serving loops running
pub struct RunningSite<P> {
    service: OnionInfo,
    mapping: PortMapping,
    payload: DirectoryPayload,
    local_addrs: BTreeMap<VirtualPort, SocketAddr>,
    loops: JoinSet<()>,
    shutdown: CancellationToken,
    publisher: P,
}

impl<P> RunningSite<P> {
    pub fn service(&self) -> &OnionInfo {
        &self.service
    }

    pub fn mapping(&self) -> &PortMapping {
        &self.mapping
    }

    pub fn payload(&self) -> &DirectoryPayload {
        &self.payload
    }

    /// Loopback address serving `port`, if that target was bound
    pub fn local_addr(&self, port: VirtualPort) -> Option<SocketAddr> {
        self.local_addrs.get(&port).copied()
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Token that stops every serving loop when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Block until every serving loop has exited.
    ///
    /// Loops only exit once the shutdown token is cancelled.
    pub async fn wait(mut self) {
        while let Some(result) = self.loops.join_next().await {
            if let Err(e) = result {
                error!("Serving loop failed: {}", e);
            }
        }
        info!("All listeners closed");
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlError;
    use crate::listener::tests::ExhaustedFiles;
    use crate::mapping::OnionPortSpec;
    use crate::serve::tests::fetch;
    use async_trait::async_trait;
    use std::time::Duration;

    const SERVICE_ID: &str = "pg6mmjiyjmcrsslvykfwnntlaru7p5svn6y2ymmju6nubxndf4pscryd";

    #[derive(Default)]
    struct RecordingPublisher {
        calls: Vec<(Vec<OnionPortSpec>, bool)>,
        reject: bool,
    }

    #[async_trait]
    impl HiddenServicePublisher for RecordingPublisher {
        async fn publish(
            &mut self,
            ports: &[OnionPortSpec],
            transient: bool,
        ) -> std::result::Result<OnionInfo, ControlError> {
            self.calls.push((ports.to_vec(), transient));
            if self.reject {
                return Err(ControlError::Command {
                    status: 512,
                    message: "Missing 'Port' argument".into(),
                });
            }
            Ok(OnionInfo {
                onion_id: SERVICE_ID.parse()?,
                private_key: None,
            })
        }
    }

    #[tokio::test]
    async fn test_publishes_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"jpeg bytes").unwrap();

        let site = Supervisor::new(&path)
            .start(RecordingPublisher::default())
            .await
            .unwrap();

        let calls = &site.publisher().calls;
        assert_eq!(calls.len(), 1);
        let (specs, transient) = &calls[0];
        assert!(*transient);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].virt_port, VirtualPort::FILE);
        assert_eq!(specs[1].virt_port, VirtualPort::DIRECTORY);

        let file_addr = site.local_addr(VirtualPort::FILE).unwrap();
        let dir_addr = site.local_addr(VirtualPort::DIRECTORY).unwrap();
        assert_eq!(specs[0].target, file_addr.port().to_string());
        assert_eq!(specs[1].target, dir_addr.port().to_string());

        assert_eq!(fetch(file_addr).await, b"jpeg bytes");
        assert_eq!(fetch(dir_addr).await, br#"{"photo.jpg":1}"#);
        assert_eq!(site.service().onion_id.as_str(), SERVICE_ID);

        tokio::time::timeout(Duration::from_secs(5), site.shutdown())
            .await
            .expect("loops did not stop");
    }

    #[tokio::test]
    async fn test_directory_port_never_reused() {
        let site = Supervisor::new("/srv/share/report.pdf")
            .start(RecordingPublisher::default())
            .await
            .unwrap();

        let mapping = site.mapping();
        let directory_local = mapping.get(VirtualPort::DIRECTORY).unwrap();
        let file_local = mapping.get(VirtualPort::FILE).unwrap();
        assert_ne!(directory_local, file_local);
        assert_eq!(
            site.payload().entries().values().copied().collect::<Vec<_>>(),
            vec![VirtualPort::FILE]
        );

        site.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_file_leaves_directory_working() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");

        let site = Supervisor::new(&path)
            .start(RecordingPublisher::default())
            .await
            .unwrap();

        let file_addr = site.local_addr(VirtualPort::FILE).unwrap();
        let dir_addr = site.local_addr(VirtualPort::DIRECTORY).unwrap();
        assert!(fetch(file_addr).await.is_empty());
        assert_eq!(fetch(dir_addr).await, br#"{"absent.txt":1}"#);

        site.shutdown().await;
    }

    #[tokio::test]
    async fn test_bind_failure_reduces_publication() {
        let site = Supervisor::new("/srv/share/photo.jpg")
            .with_binder(ExhaustedFiles)
            .start(RecordingPublisher::default())
            .await
            .unwrap();

        let (specs, _) = &site.publisher().calls[0];
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].virt_port, VirtualPort::DIRECTORY);
        assert!(site.local_addr(VirtualPort::FILE).is_none());

        // the unbound file is not advertised either
        let dir_addr = site.local_addr(VirtualPort::DIRECTORY).unwrap();
        assert_eq!(fetch(dir_addr).await, b"{}");

        site.shutdown().await;
    }

    #[tokio::test]
    async fn test_registration_failure_is_fatal() {
        let publisher = RecordingPublisher {
            reject: true,
            ..Default::default()
        };

        let err = Supervisor::new("/srv/share/photo.jpg")
            .start(publisher)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, SiteError::Registration(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_wait_returns_after_cancel() {
        let site = Supervisor::new("/srv/share/photo.jpg")
            .start(RecordingPublisher::default())
            .await
            .unwrap();

        let token = site.shutdown_token();
        let waiter = tokio::spawn(site.wait());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("wait did not return")
            .unwrap();
    }
}
