//! # Spyword
//!
//! Realtime room server for Spyword, a social deduction party game: every
//! player but the spies sees a secret word, and the table talks until the
//! spies are found or the countdown runs out.
//!
//! The server keeps every room in memory and is authoritative over it.
//! Clients send intents (`create_room`, `start_game`, ...) over a
//! WebSocket; after each successful change the whole room is rebroadcast
//! to its members as a `room_updated` snapshot.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spyword::prelude::*;
//!
//! # async fn start() -> Result<(), SpywordError> {
//! let config = ServerConfig::default().with_env_overrides();
//! let server = SpywordServer::builder().config(config).build().await?;
//! server.run().await
//! # }
//! ```

pub mod config;
pub mod dispatcher;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use dispatcher::{DispatchConfig, Dispatcher};
pub use error::SpywordError;
pub use server::{SpywordServer, SpywordServerBuilder};

/// Convenience re-exports for embedding or testing the server.
pub mod prelude {
    pub use crate::{
        ConfigError, DispatchConfig, Dispatcher, ServerConfig, SpywordError, SpywordServer,
        SpywordServerBuilder,
    };
    pub use spyword_protocol::{
        AckReply, ClientEnvelope, GameState, Intent, JoinReply, Player, PlayerId, Role, Room,
        RoomId, ServerMessage, Settings, SettingsPatch,
    };
    pub use spyword_room::{Clock, RoomError, RoomStore, SystemClock};
    pub use spyword_session::SessionRegistry;
}
