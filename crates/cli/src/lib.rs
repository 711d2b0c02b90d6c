//! Command-line node for the PAIR messaging walkthrough.
//!
//! Provides:
//! - Argument parsing and logging setup
//! - The node runner (listen-or-dial, fixed message exchange, release)
//! - The error taxonomy reported at exit

pub mod config;
pub mod runner;

pub use config::CliConfig;
pub use runner::{ConnectionRole, ExchangeReport, NodeConfig, NodeError};
