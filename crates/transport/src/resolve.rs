//! Library URLs for endpoint addresses.
//!
//! A TCP host is resolved here and only its first address is handed to the
//! library, for listening and dialing alike. Binding every resolved address
//! would let a second node listen on `localhost` through `::1` after the
//! first one claimed `127.0.0.1`, leaving two listeners and no pair.

use std::net::SocketAddr;

use pairmsg_core::{Address, Error, Result, TransportKind};

/// Which side of the connection a URL is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Listen,
    Dial,
}

/// URL to pass to the library for `addr`.
///
/// TCP addresses come back as `tcp://<ip>:<port>` for the first resolved
/// address; a wildcard host listens on every IPv4 interface and cannot be
/// dialed. Other schemes pass through unchanged.
pub async fn library_url(addr: &Address, side: Side) -> Result<String> {
    if addr.kind() != TransportKind::Tcp {
        return Ok(addr.as_str().to_string());
    }

    let target = match side {
        Side::Listen => addr.listen_target()?,
        Side::Dial => addr.dial_target()?,
    };
    let resolved = tokio::net::lookup_host(target.as_str()).await?;

    first_tcp_url(resolved).ok_or_else(|| {
        Error::invalid_address(addr.as_str(), format!("'{}' resolved to nothing", target))
    })
}

/// `tcp://` URL for the first of `resolved`, if any.
pub fn first_tcp_url(resolved: impl IntoIterator<Item = SocketAddr>) -> Option<String> {
    resolved
        .into_iter()
        .next()
        .map(|addr| format!("tcp://{}", addr))
}
