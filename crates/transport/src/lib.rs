//! PAIR sockets for the `Endpoint` trait, backed by nng.
//!
//! nng carries the scalability protocol, the TCP and IPC transports and
//! their framing. This crate only adapts it:
//! - `PairSocket` wraps an nng `Pair0` socket behind the async `Endpoint` trait
//! - `resolve` turns an `Address` into the URL handed to nng, pinning TCP
//!   hosts to one resolved address
//!
//! nng speaks the same wire protocol as nanomsg and mangos, so a node built
//! here pairs with nodes built on either.

pub mod resolve;
pub mod socket;

pub use socket::PairSocket;
