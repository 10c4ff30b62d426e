//! Error types for the room layer.

use spyword_protocol::RoomId;

/// Errors that can occur during room store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist (never created, closed, or emptied).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room has left the lobby; joins are closed until it resets.
    #[error("game already in progress in room {0}")]
    GameInProgress(RoomId),

    /// Neither the selected categories nor the fallback category
    /// produced a single word.
    #[error("no words available for the selected categories")]
    NoWordsAvailable,

    /// Pause/resume was requested but no countdown has been started.
    #[error("no timer running in room {0}")]
    NoTimerRunning(RoomId),
}
