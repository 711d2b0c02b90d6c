//! PAIR socket.
//!
//! A PAIR socket talks to at most one peer. It becomes the accepting side
//! with `listen` or the initiating side with `dial`; after that `send` and
//! `recv` work the same either way.
//!
//! # Queues
//!
//! `send` hands the message to the library's send buffer and returns, so a
//! listener can send before anybody has connected. `recv` waits for the next
//! message up to the receive deadline. Library calls that can block run on
//! tokio's blocking pool.
//!
//! # Release
//!
//! `close` and `Drop` both close the library socket. A listening IPC socket
//! removes its socket file when closed.

use std::time::Duration;

use bytes::Bytes;
use nng::options::{Options, RecvBufferSize, RecvMaxSize, RecvTimeout, SendBufferSize, SendTimeout};
use nng::{Protocol, Socket};
use pairmsg_core::{Address, Endpoint, EndpointOptions, Error, Message, Result, TransportKind};
use tracing::debug;

use crate::resolve::{self, Side};

/// True for the transports this socket can carry.
pub fn provides(kind: TransportKind) -> bool {
    match kind {
        TransportKind::Inproc | TransportKind::Ipc | TransportKind::Tcp => true,
        TransportKind::Ws => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Listening,
    Connected,
    Closed,
}

/// A PAIR v0 socket.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use pairmsg_core::{Address, Endpoint, EndpointOptions, Message, TransportKind};
/// use pairmsg_transport::PairSocket;
///
/// # async fn demo() -> pairmsg_core::Result<()> {
/// let options = EndpointOptions::new()
///     .with_transport(TransportKind::Tcp)
///     .with_recv_timeout(Duration::from_secs(10));
/// let mut socket = PairSocket::new(options)?;
///
/// let addr: Address = "tcp://localhost:54545".parse()?;
/// if socket.listen(&addr).await.is_err() {
///     socket.dial(&addr).await?;
/// }
/// socket.send(Message::from("hello")).await?;
/// let reply = socket.recv().await?;
/// socket.close().await;
/// # Ok(())
/// # }
/// ```
pub struct PairSocket {
    socket: Socket,
    options: EndpointOptions,
    state: State,
    url: Option<String>,
}

impl PairSocket {
    /// Open a socket and apply `options` to it.
    ///
    /// No connectivity yet; that starts with `listen` or `dial`.
    pub fn new(options: EndpointOptions) -> Result<Self> {
        options.validate()?;

        let socket = Socket::new(Protocol::Pair0).map_err(Error::transport)?;
        socket
            .set_opt::<RecvTimeout>(options.recv_timeout)
            .map_err(Error::transport)?;
        socket
            .set_opt::<SendTimeout>(options.send_timeout)
            .map_err(Error::transport)?;
        socket
            .set_opt::<SendBufferSize>(buffer_depth(options.send_queue_len)?)
            .map_err(Error::transport)?;
        socket
            .set_opt::<RecvBufferSize>(buffer_depth(options.recv_queue_len)?)
            .map_err(Error::transport)?;
        socket
            .set_opt::<RecvMaxSize>(options.max_recv_size)
            .map_err(Error::transport)?;

        Ok(Self {
            socket,
            options,
            state: State::Idle,
            url: None,
        })
    }

    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    /// Library URL this socket listens or dials on, once connected.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn check_can_connect(&self, addr: &Address) -> Result<()> {
        match self.state {
            State::Idle => {}
            State::Closed => return Err(Error::Closed),
            State::Listening | State::Connected => {
                return Err(Error::InvalidState(
                    "socket is already listening or connected".into(),
                ))
            }
        }

        let kind = addr.kind();
        if !self.options.supports(kind) || !provides(kind) {
            return Err(Error::UnsupportedTransport(kind));
        }
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.state == State::Closed {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Listen on an already resolved library URL.
    pub(crate) fn listen_url(&mut self, url: &str) -> Result<()> {
        self.socket.listen(url).map_err(Error::transport)?;
        debug!(url, "pair socket listening");

        self.url = Some(url.to_string());
        self.state = State::Listening;
        Ok(())
    }

    /// Dial an already resolved library URL, waiting for the connection.
    pub(crate) async fn dial_url(&mut self, url: &str) -> Result<()> {
        let socket = self.socket.clone();
        let target = url.to_string();
        blocking(move || socket.dial(&target))
            .await?
            .map_err(Error::transport)?;
        debug!(url, "pair socket connected");

        self.url = Some(url.to_string());
        self.state = State::Connected;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Endpoint for PairSocket {
    async fn listen(&mut self, addr: &Address) -> Result<()> {
        self.check_can_connect(addr)?;
        let url = resolve::library_url(addr, Side::Listen).await?;
        self.listen_url(&url)
    }

    async fn dial(&mut self, addr: &Address) -> Result<()> {
        self.check_can_connect(addr)?;
        let url = resolve::library_url(addr, Side::Dial).await?;
        self.dial_url(&url).await
    }

    async fn send(&mut self, msg: Message) -> Result<()> {
        self.check_open()?;

        let socket = self.socket.clone();
        let payload = msg.into_bytes();
        blocking(move || socket.send(nng::Message::from(&payload[..])))
            .await?
            .map_err(|(_, e)| library_error(e, self.options.send_timeout))
    }

    async fn recv(&mut self) -> Result<Message> {
        self.check_open()?;

        let socket = self.socket.clone();
        let received = blocking(move || socket.recv())
            .await?
            .map_err(|e| library_error(e, self.options.recv_timeout))?;

        Ok(Message::new(Bytes::copy_from_slice(&received[..])))
    }

    async fn close(&mut self) {
        if self.state == State::Closed {
            return;
        }
        self.state = State::Closed;
        self.socket.close();
        debug!(url = ?self.url, "pair socket closed");
    }
}

impl Drop for PairSocket {
    fn drop(&mut self) {
        if self.state != State::Closed {
            self.socket.close();
        }
    }
}

/// Run a blocking library call off the async thread.
async fn blocking<T, F>(call: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(Error::transport)
}

/// Map a library error, naming the deadline that expired for timeouts.
fn library_error(error: nng::Error, deadline: Option<Duration>) -> Error {
    match error {
        nng::Error::TimedOut => Error::Timeout(deadline.unwrap_or_default()),
        nng::Error::Closed => Error::Closed,
        other => Error::transport(other),
    }
}

fn buffer_depth(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| Error::InvalidOption(format!("queue length {} too large", len)))
}
