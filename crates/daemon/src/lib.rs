//! tcpsite daemon library
//!
//! Command line handling, logging setup and shutdown signals for the
//! `tcpsite` binary, which publishes one file and its directory as an
//! onion service.

pub mod cli;
pub mod logging;
pub mod signal;

pub use cli::Args;
pub use signal::ShutdownSignal;
