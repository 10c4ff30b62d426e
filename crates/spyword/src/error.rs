//! Unified error type for the Spyword server.

use spyword_protocol::ProtocolError;
use spyword_room::RoomError;
use spyword_session::SessionError;
use spyword_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SpywordError {
    /// Binding, accepting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A message could not be delivered to a connection.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room operation was refused.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The configuration file could not be read or parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
