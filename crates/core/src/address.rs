//! Endpoint addresses.
//!
//! An address names a transport mechanism and a location on it, written in
//! URI style: `tcp://localhost:54545` or `ipc:///tmp/pair.ipc`. Both peers of
//! a pair must be started with the same address.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Transport mechanisms an address can name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Within a single process
    Inproc,
    /// Between processes on the same machine (Unix domain sockets)
    Ipc,
    /// TCP over the network
    Tcp,
    /// WebSocket
    Ws,
}

impl TransportKind {
    /// URI scheme for this transport.
    pub fn scheme(&self) -> &'static str {
        match self {
            TransportKind::Inproc => "inproc",
            TransportKind::Ipc => "ipc",
            TransportKind::Tcp => "tcp",
            TransportKind::Ws => "ws",
        }
    }

    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "inproc" => Some(TransportKind::Inproc),
            "ipc" => Some(TransportKind::Ipc),
            "tcp" => Some(TransportKind::Tcp),
            "ws" => Some(TransportKind::Ws),
            _ => None,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// A parsed, immutable endpoint address.
///
/// The original string is kept verbatim for logging.
///
/// # Example
///
/// ```rust
/// use pairmsg_core::{Address, TransportKind};
///
/// let addr: Address = "tcp://localhost:54545".parse().unwrap();
/// assert_eq!(addr.kind(), TransportKind::Tcp);
/// assert_eq!(addr.location(), "localhost:54545");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    raw: String,
    kind: TransportKind,
    location: String,
}

impl Address {
    /// Parse an address of the form `<scheme>://<location>`.
    ///
    /// TCP locations must be `host:port` with a numeric port; the host may be
    /// `*` or empty to mean every interface. IPC locations are filesystem
    /// paths and must be non-empty.
    pub fn parse(raw: &str) -> Result<Self> {
        let (scheme, location) = raw
            .split_once("://")
            .ok_or_else(|| Error::invalid_address(raw, "missing '://' separator"))?;

        let kind = TransportKind::from_scheme(scheme)
            .ok_or_else(|| Error::invalid_address(raw, format!("unknown scheme '{}'", scheme)))?;

        if location.is_empty() {
            return Err(Error::invalid_address(raw, "empty location"));
        }

        if kind == TransportKind::Tcp {
            split_host_port(raw, location)?;
        }

        Ok(Self {
            raw: raw.to_string(),
            kind,
            location: location.to_string(),
        })
    }

    /// Transport mechanism named by the scheme.
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Everything after `://`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The address exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Host and port for a TCP address.
    pub fn host_port(&self) -> Result<(&str, u16)> {
        if self.kind != TransportKind::Tcp {
            return Err(Error::invalid_address(&self.raw, "not a tcp address"));
        }
        split_host_port(&self.raw, &self.location)
    }

    /// Socket address string to bind for a TCP listener.
    ///
    /// A wildcard host binds every IPv4 interface.
    pub fn listen_target(&self) -> Result<String> {
        let (host, port) = self.host_port()?;
        if is_wildcard(host) {
            Ok(format!("0.0.0.0:{}", port))
        } else {
            Ok(format!("{}:{}", host, port))
        }
    }

    /// Socket address string to connect to for a TCP dialer.
    pub fn dial_target(&self) -> Result<String> {
        let (host, port) = self.host_port()?;
        if is_wildcard(host) {
            return Err(Error::invalid_address(&self.raw, "cannot dial a wildcard host"));
        }
        Ok(format!("{}:{}", host, port))
    }

    /// Filesystem path of an IPC address.
    pub fn ipc_path(&self) -> Result<&Path> {
        if self.kind != TransportKind::Ipc {
            return Err(Error::invalid_address(&self.raw, "not an ipc address"));
        }
        Ok(Path::new(&self.location))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Address::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_host_port<'a>(raw: &str, location: &'a str) -> Result<(&'a str, u16)> {
    let (host, port) = location
        .rsplit_once(':')
        .ok_or_else(|| Error::invalid_address(raw, "expected host:port"))?;

    // Bare IPv6 literals are ambiguous without brackets.
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        return Err(Error::invalid_address(raw, "ipv6 hosts must be bracketed"));
    }

    let port = port
        .parse::<u16>()
        .map_err(|_| Error::invalid_address(raw, format!("invalid port '{}'", port)))?;

    Ok((host, port))
}

fn is_wildcard(host: &str) -> bool {
    host.is_empty() || host == "*"
}
