/// Listener allocation
///
/// Binds one loopback listener per target and records the ephemeral
/// port the OS picked. A target that cannot be bound is logged and
/// dropped; the remaining targets are still served.

use crate::mapping::PortMapping;
use std::collections::BTreeSet;
use std::io;
use std::net::SocketAddr;
use tcpsite_common::config::protocol;
use tcpsite_common::{Target, VirtualPort};
use tokio::net::TcpListener;
use tracing::{debug, warn};

/// Creates the socket for a target.
pub trait Bind: Send + Sync {
    fn bind(&self, target: &Target) -> io::Result<std::net::TcpListener>;
}

/// Binds `127.0.0.1:0` for every target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackBinder;

impl Bind for LoopbackBinder {
    fn bind(&self, _target: &Target) -> io::Result<std::net::TcpListener> {
        std::net::TcpListener::bind((protocol::LISTEN_ADDR, protocol::EPHEMERAL_PORT))
    }
}

/// A target together with its bound listener
#[derive(Debug)]
pub struct BoundTarget {
    target: Target,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl BoundTarget {
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn virtual_port(&self) -> VirtualPort {
        self.target.virtual_port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn into_parts(self) -> (Target, TcpListener, SocketAddr) {
        (self.target, self.listener, self.local_addr)
    }
}

/// Every target that was successfully bound, in allocation order
#[derive(Debug, Default)]
pub struct Allocation {
    bound: Vec<BoundTarget>,
}

impl Allocation {
    pub fn bound(&self) -> &[BoundTarget] {
        &self.bound
    }

    /// File targets that made it through allocation.
    pub fn file_targets(&self) -> impl Iterator<Item = &Target> {
        self.bound
            .iter()
            .map(|b| &b.target)
            .filter(|t| !t.is_directory())
    }

    pub fn port_mapping(&self) -> PortMapping {
        self.bound
            .iter()
            .map(|b| (b.virtual_port(), b.local_port()))
            .collect()
    }

    pub fn into_bound(self) -> Vec<BoundTarget> {
        self.bound
    }
}

/// Bind a listener for each target.
///
/// Must be called from inside a tokio runtime. Two targets asking for the
/// same virtual port, or two files with the same listing name, are never
/// both bound; the later one is dropped. A file on the directory port is
/// never bound.
pub fn allocate<I>(targets: I, binder: &dyn Bind) -> Allocation
where
    I: IntoIterator<Item = Target>,
{
    let mut taken = BTreeSet::new();
    let mut names = BTreeSet::new();
    let mut bound = Vec::new();

    for target in targets {
        let port = target.virtual_port();
        if !target.is_directory() && port.is_directory() {
            warn!(
                "Skipping {}: virtual port {} is reserved for the directory",
                target, port
            );
            continue;
        }
        if taken.contains(&port) {
            warn!("Skipping {}: virtual port {} is already in use", target, port);
            continue;
        }
        let name = target.listing_name();
        if let Some(name) = name.as_ref().filter(|n| names.contains(*n)) {
            warn!("Skipping {}: {} is already listed", target, name);
            continue;
        }

        match bind_one(&target, binder) {
            Ok((listener, local_addr)) => {
                debug!("Bound {} on {}", target, local_addr);
                taken.insert(port);
                names.extend(name);
                bound.push(BoundTarget {
                    target,
                    listener,
                    local_addr,
                });
            }
            Err(e) => {
                warn!("Failed to bind listener for {}: {}", target, e);
            }
        }
    }

    Allocation { bound }
}

fn bind_one(target: &Target, binder: &dyn Bind) -> io::Result<(TcpListener, SocketAddr)> {
    let std_listener = binder.bind(target)?;
    std_listener.set_nonblocking(true)?;
    let local_addr = std_listener.local_addr()?;
    let listener = TcpListener::from_std(std_listener)?;
    Ok((listener, local_addr))
}
