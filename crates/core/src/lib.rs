pub mod control;
pub mod directory;
pub mod listener;
pub mod mapping;
pub mod serve;
pub mod supervisor;

pub use control::{
    ControlAddr, ControlAddrError, ControlError, HiddenServicePublisher, OnionId, OnionInfo,
    ProtocolInfo, TorControl,
};
pub use directory::DirectoryPayload;
pub use listener::{allocate, Allocation, Bind, BoundTarget, LoopbackBinder};
pub use mapping::{OnionPortSpec, PortMapping};
pub use serve::{DirectoryServer, FileServer};
pub use supervisor::{RunningSite, Supervisor};
