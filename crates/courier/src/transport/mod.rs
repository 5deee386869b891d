//! Socket ingress for distributed commands.
//!
//! [`SocketSubscription`] binds a TCP or Unix socket, accepts publisher
//! connections on a background thread and reads newline-delimited payloads
//! from each connection into a bounded queue the dispatch worker drains.

mod errors;
mod listener;
mod stream;

pub use self::errors::TransportError;
pub use self::listener::SocketSubscription;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
