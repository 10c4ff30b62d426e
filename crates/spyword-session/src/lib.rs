//! Connection sessions and broadcast groups for Spyword.
//!
//! This crate answers two questions for the dispatcher:
//!
//! 1. **How do I reach a connection?** — every connection registers an
//!    [`Outbox`] that its writer task drains.
//! 2. **Who hears about a room?** — each room has a broadcast group of
//!    connections ([`SessionRegistry::broadcast`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Dispatcher (above)  ← decides what to send and to whom
//!     ↕
//! Session Layer (this crate)  ← outboxes and room groups
//!     ↕
//! Protocol Layer (below)  ← PlayerId, RoomId, ServerMessage
//! ```

mod error;
mod registry;

pub use error::SessionError;
pub use registry::{Outbox, SessionRegistry};
