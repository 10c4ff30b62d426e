//! Identity types shared by every layer.

use serde::{Deserialize, Serialize};

use std::fmt;

/// The identity of one connected client.
///
/// A player *is* a connection: the id is assigned by the server when the
/// socket is accepted and is never reused for a later connection, so a
/// reconnecting client always shows up as a new player.
///
/// `#[serde(transparent)]` keeps it a plain number on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The join code of a room: six ASCII digits, e.g. `"482913"`.
///
/// Stored as a string because that is what players type and what the
/// client sends back. Clients may send anything here; a malformed id
/// simply never matches a live room.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Number of digits in a generated room code.
    pub const LEN: usize = 6;

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is exactly six ASCII digits.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == Self::LEN && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl From<&str> for RoomId {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl From<String> for RoomId {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
