//! Endpoint capability interface.
//!
//! An `Endpoint` is a bidirectional messaging handle bound to one
//! communication pattern. Whether it ends up accepting or initiating the
//! connection is decided at runtime by calling `listen` or `dial`, not at
//! construction.
//!
//! # Lifecycle
//!
//! 1. Construct with `EndpointOptions` (receive deadline, enabled transports)
//! 2. `listen` or `dial` exactly once
//! 3. `send` / `recv` as long as needed
//! 4. `close` (idempotent); implementations also release on drop

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::address::{Address, TransportKind};
use crate::error::{Error, Result};
use crate::message::Message;

/// Default depth of the outbound and inbound message queues.
pub const DEFAULT_QUEUE_LEN: usize = 128;

/// Deepest queue a socket accepts.
pub const MAX_QUEUE_LEN: usize = 8192;

/// Default upper bound on a received message (1 MiB).
pub const DEFAULT_MAX_RECV_SIZE: usize = 1024 * 1024;

/// Trait for bidirectional messaging endpoints.
///
/// # Thread Safety
///
/// Endpoints are owned by exactly one task. Methods take `&mut self`, so
/// concurrent use of one endpoint is ruled out by the borrow checker.
#[async_trait]
pub trait Endpoint: Send {
    /// Become the accepting side on `addr`.
    ///
    /// Fails immediately if the address is already claimed.
    async fn listen(&mut self, addr: &Address) -> Result<()>;

    /// Become the initiating side, connecting to `addr`.
    async fn dial(&mut self, addr: &Address) -> Result<()>;

    /// Queue a message for the peer.
    ///
    /// Returns once the message is queued, even if no peer is attached yet.
    async fn send(&mut self, msg: Message) -> Result<()>;

    /// Wait for the next message, bounded by the receive deadline.
    async fn recv(&mut self) -> Result<Message>;

    /// Release the endpoint. Calling it more than once is a no-op.
    async fn close(&mut self);
}

/// Configuration applied to an endpoint at construction.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use pairmsg_core::{EndpointOptions, TransportKind};
///
/// let options = EndpointOptions::new()
///     .with_transport(TransportKind::Ipc)
///     .with_transport(TransportKind::Tcp)
///     .with_recv_timeout(Duration::from_secs(10));
///
/// assert!(options.supports(TransportKind::Tcp));
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct EndpointOptions {
    /// Deadline for `recv`; `None` waits forever.
    pub recv_timeout: Option<Duration>,
    /// Deadline for queueing an outbound message; `None` waits forever.
    pub send_timeout: Option<Duration>,
    /// Outbound messages buffered before `send` blocks.
    pub send_queue_len: usize,
    /// Inbound messages buffered before the library stops reading.
    pub recv_queue_len: usize,
    /// Largest message accepted from the peer.
    pub max_recv_size: usize,
    /// Enabled transport mechanisms.
    pub transports: HashSet<TransportKind>,
}

impl EndpointOptions {
    /// Options with no transports enabled and no deadlines.
    pub fn new() -> Self {
        Self {
            recv_timeout: None,
            send_timeout: None,
            send_queue_len: DEFAULT_QUEUE_LEN,
            recv_queue_len: DEFAULT_QUEUE_LEN,
            max_recv_size: DEFAULT_MAX_RECV_SIZE,
            transports: HashSet::new(),
        }
    }

    pub fn with_transport(mut self, kind: TransportKind) -> Self {
        self.transports.insert(kind);
        self
    }

    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = Some(timeout);
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    pub fn with_queue_len(mut self, len: usize) -> Self {
        self.send_queue_len = len;
        self.recv_queue_len = len;
        self
    }

    pub fn with_max_recv_size(mut self, size: usize) -> Self {
        self.max_recv_size = size;
        self
    }

    /// True if `kind` has been enabled.
    pub fn supports(&self, kind: TransportKind) -> bool {
        self.transports.contains(&kind)
    }

    /// Reject option combinations an endpoint cannot be built with.
    pub fn validate(&self) -> Result<()> {
        for len in [self.send_queue_len, self.recv_queue_len] {
            if len == 0 || len > MAX_QUEUE_LEN {
                return Err(Error::InvalidOption(format!(
                    "queue length {} outside 1..={}",
                    len, MAX_QUEUE_LEN
                )));
            }
        }
        if self.max_recv_size == 0 {
            return Err(Error::InvalidOption("max_recv_size must be non-zero".into()));
        }
        if self.recv_timeout == Some(Duration::ZERO) {
            return Err(Error::InvalidOption("recv_timeout must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self::new()
    }
}
