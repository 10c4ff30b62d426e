//! The room snapshot: the full state every member of a room is sent after
//! each change.
//!
//! Field names on the wire are camelCase and match what the browser client
//! reads (`hostId`, `timerEndTime`, ...). Timestamps are Unix epoch
//! milliseconds so clients can run the countdown against their own clock.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{PlayerId, RoomId};

/// Secret role handed out when a round starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Civilian,
    Spy,
}

/// Where a room is in its round lifecycle.
///
/// ```text
/// Lobby ──start_game──→ Reveal ──start_timer──→ Game
///   ↑                      │                      │
///   └───────reset──────────┴────────reset─────────┘
/// ```
///
/// There is no automatic transition when the countdown hits zero; the
/// round ends when the host resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    #[default]
    Lobby,
    Reveal,
    Game,
}

impl GameState {
    /// Returns `true` if new players may join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` while roles are handed out.
    pub fn has_roles(&self) -> bool {
        matches!(self, Self::Reveal | Self::Game)
    }
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "LOBBY"),
            Self::Reveal => write!(f, "REVEAL"),
            Self::Game => write!(f, "GAME"),
        }
    }
}

/// One participant in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Absent in the lobby, present on every player once a round starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub is_host: bool,
}

/// Host-editable round settings.
///
/// The integers are signed and unchecked: the store applies whatever the
/// host sends, and `start_game` clamps the spy count when it is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub spy_count: i64,
    #[serde(rename = "timerDuration", alias = "timerDurationMinutes")]
    pub timer_duration_minutes: i64,
    pub categories: BTreeSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            spy_count: 1,
            timer_duration_minutes: 5,
            categories: BTreeSet::from(["Locations".to_string()]),
        }
    }
}

impl Settings {
    /// Overrides each field that is present in `patch`, leaving the rest.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(spy_count) = patch.spy_count {
            self.spy_count = spy_count;
        }
        if let Some(minutes) = patch.timer_duration_minutes {
            self.timer_duration_minutes = minutes;
        }
        if let Some(categories) = patch.categories {
            self.categories = categories;
        }
    }

    /// Countdown length in milliseconds.
    pub fn timer_duration_ms(&self) -> i64 {
        self.timer_duration_minutes.saturating_mul(60_000)
    }
}

/// A partial [`Settings`] update sent by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spy_count: Option<i64>,
    #[serde(
        default,
        rename = "timerDuration",
        alias = "timerDurationMinutes",
        skip_serializing_if = "Option::is_none"
    )]
    pub timer_duration_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeSet<String>>,
}

/// One game session, as broadcast to its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub host_id: PlayerId,
    /// Join order. The first entry inherits host when the host leaves.
    pub players: Vec<Player>,
    pub state: GameState,
    pub settings: Settings,
    /// Empty outside a round.
    pub current_word: String,
    /// Deadline of the running countdown. Stale while `is_paused`.
    pub timer_end_time: Option<i64>,
    pub is_paused: bool,
    #[serde(rename = "pausedTimeRemaining", alias = "pausedRemainingMs")]
    pub paused_remaining_ms: Option<i64>,
}

impl Room {
    /// Returns the player with this id, if they are a member.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Returns `true` if `id` is a member of this room.
    pub fn contains(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    /// Number of players currently holding the spy role.
    pub fn spy_count(&self) -> usize {
        self.players
            .iter()
            .filter(|p| p.role == Some(Role::Spy))
            .count()
    }
}
