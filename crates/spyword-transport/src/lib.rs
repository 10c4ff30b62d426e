//! Transport layer for Spyword.
//!
//! The server never touches sockets directly. It accepts through a
//! [`Transport`] and talks to each client through a [`Connection`], both
//! of which deal in whole frames of bytes. What those bytes mean is the
//! protocol crate's business.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket listener via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Server-assigned identity of one accepted connection.
///
/// Ids come from a process-wide counter starting at 1 and are never
/// reused, so they double as player identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl From<ConnectionId> for u64 {
    fn from(id: ConnectionId) -> Self {
        id.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts incoming connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops accepting. Connections already handed out are unaffected.
    async fn shutdown(&self) -> Result<(), Self::Error>;

    /// The address actually bound, useful after binding to port 0.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// One client connection, exchanging whole frames.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// a reader parked in `recv` must not hold up a writer.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the peer.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Starts a clean close.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
