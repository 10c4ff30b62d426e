//! Error types for the session layer.

use spyword_protocol::PlayerId;

/// Errors that can occur when delivering to a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No connection with this identity is registered. It either never
    /// connected or has already been unregistered.
    #[error("player {0} is not connected")]
    NotConnected(PlayerId),

    /// The connection is registered but its writer task is gone, so the
    /// message had nowhere to go.
    #[error("outbox of player {0} is closed")]
    OutboxClosed(PlayerId),
}
