//! Wire protocol for Spyword.
//!
//! - **Types** ([`PlayerId`], [`RoomId`]) — identities.
//! - **Model** ([`Room`], [`Player`], [`Settings`], ...) — the room
//!   snapshot that is broadcast to clients after every change.
//! - **Messages** ([`ClientEnvelope`], [`Intent`], [`ServerMessage`]) —
//!   what travels on each connection.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — bytes ↔ messages.
//!
//! ```text
//! Transport (bytes) → Protocol (Intent / ServerMessage) → Dispatcher
//! ```

mod codec;
mod error;
mod message;
mod model;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{AckReply, ClientEnvelope, Intent, JoinReply, ServerMessage};
pub use model::{GameState, Player, Role, Room, Settings, SettingsPatch};
pub use types::{PlayerId, RoomId};
