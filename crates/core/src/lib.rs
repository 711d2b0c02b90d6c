//! Core abstractions for point-to-point PAIR messaging.
//!
//! This crate defines the capability interface a node talks to, without
//! committing to any particular transport:
//! - Addresses (`tcp://host:port`, `ipc://path`) and transport kinds
//! - The `Endpoint` trait and its configuration options
//! - Message formatting for the demo exchange
//! - The shared error type

pub mod address;
pub mod endpoint;
pub mod error;
pub mod message;

pub use address::{Address, TransportKind};
pub use endpoint::{Endpoint, EndpointOptions};
pub use error::{Error, Result};
pub use message::Message;
