//! Messages exchanged between a browser client and the server.
//!
//! Both directions use the same adjacently tagged JSON shape, modelled on
//! event-emitter transports:
//!
//! ```text
//! client → server   { "event": "join_room", "data": { "roomId": "123456", "name": "Ana" }, "ack": 3 }
//! server → client   { "event": "room_updated", "data": { ...room snapshot... } }
//! ```
//!
//! `ack` is an optional correlation id. Intents that get a direct reply
//! (`create_room`, `join_room`) echo it back in [`ServerMessage::Ack`].

use serde::{Deserialize, Serialize};

use crate::{PlayerId, Room, RoomId, SettingsPatch};

/// Everything a client can ask the server to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Intent {
    CreateRoom { name: String },
    JoinRoom { room_id: RoomId, name: String },
    UpdateSettings { room_id: RoomId, settings: SettingsPatch },
    StartGame { room_id: RoomId },
    StartTimer { room_id: RoomId },
    /// Toggles: pauses a running countdown, resumes a paused one.
    PauseTimer { room_id: RoomId },
    ResetGame { room_id: RoomId },
    CloseRoom { room_id: RoomId },
    LeaveRoom { room_id: RoomId },
    Ping,
}

impl Intent {
    /// The room this intent targets, if any.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::JoinRoom { room_id, .. }
            | Self::UpdateSettings { room_id, .. }
            | Self::StartGame { room_id }
            | Self::StartTimer { room_id }
            | Self::PauseTimer { room_id }
            | Self::ResetGame { room_id }
            | Self::CloseRoom { room_id }
            | Self::LeaveRoom { room_id } => Some(room_id),
            Self::CreateRoom { .. } | Self::Ping => None,
        }
    }

    /// Returns `true` for intents only the room's host may issue.
    pub fn is_host_only(&self) -> bool {
        matches!(
            self,
            Self::UpdateSettings { .. }
                | Self::StartGame { .. }
                | Self::StartTimer { .. }
                | Self::PauseTimer { .. }
                | Self::ResetGame { .. }
                | Self::CloseRoom { .. }
        )
    }

    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create_room",
            Self::JoinRoom { .. } => "join_room",
            Self::UpdateSettings { .. } => "update_settings",
            Self::StartGame { .. } => "start_game",
            Self::StartTimer { .. } => "start_timer",
            Self::PauseTimer { .. } => "pause_timer",
            Self::ResetGame { .. } => "reset_game",
            Self::CloseRoom { .. } => "close_room",
            Self::LeaveRoom { .. } => "leave_room",
            Self::Ping => "ping",
        }
    }
}

/// One inbound frame: an [`Intent`] plus an optional ack correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    #[serde(flatten)]
    pub intent: Intent,
}

impl From<Intent> for ClientEnvelope {
    fn from(intent: Intent) -> Self {
        Self { ack: None, intent }
    }
}

/// Result of a `join_room` request, sent only to the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JoinReply {
    pub fn joined(room: Room) -> Self {
        Self {
            success: true,
            room: Some(room),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            room: None,
            error: Some(error.into()),
        }
    }
}

/// Body of a direct reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AckReply {
    /// `create_room` replies with the new room itself.
    Room(Room),
    /// `join_room` replies with a success flag.
    Join(JoinReply),
}

/// Everything the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message on every connection: the identity the server
    /// assigned, so the client can find itself in room snapshots.
    Connected { id: PlayerId },

    /// Direct reply to an intent that carried an `ack` id.
    Ack { id: Option<u64>, reply: AckReply },

    /// Full snapshot of a room after a change, sent to every member.
    RoomUpdated(Room),

    /// The host closed the room. Sent to every member; the room is gone.
    RoomClosed,

    /// Reply to [`Intent::Ping`].
    Pong,
}
