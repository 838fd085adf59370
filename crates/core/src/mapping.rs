/// Virtual port to local port table handed to the hidden service

use std::collections::BTreeMap;
use std::fmt;
use tcpsite_common::VirtualPort;

/// One `Port=` entry of a hidden service: external port and local target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnionPortSpec {
    pub virt_port: VirtualPort,
    pub target: String,
}

impl OnionPortSpec {
    pub fn new(virt_port: VirtualPort, target: impl Into<String>) -> Self {
        Self {
            virt_port,
            target: target.into(),
        }
    }
}

impl fmt::Display for OnionPortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.virt_port, self.target)
    }
}

/// Finalized once allocation is over; never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortMapping {
    ports: BTreeMap<VirtualPort, String>,
}

impl PortMapping {
    /// Local port string bound for a virtual port
    pub fn get(&self, port: VirtualPort) -> Option<&str> {
        self.ports.get(&port).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VirtualPort, &str)> {
        self.ports.iter().map(|(port, local)| (*port, local.as_str()))
    }

    pub fn port_specs(&self) -> Vec<OnionPortSpec> {
        self.iter()
            .map(|(port, local)| OnionPortSpec::new(port, local))
            .collect()
    }
}

impl FromIterator<(VirtualPort, u16)> for PortMapping {
    fn from_iter<T: IntoIterator<Item = (VirtualPort, u16)>>(iter: T) -> Self {
        Self {
            ports: iter
                .into_iter()
                .map(|(port, local)| (port, local.to_string()))
                .collect(),
        }
    }
}
