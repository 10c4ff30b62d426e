//! Room store for Spyword.
//!
//! Pure state container for every live room: creation, membership with
//! host succession, settings, dealing roles, and the pause-aware
//! countdown. It knows nothing about connections or broadcasting.
//!
//! # Key types
//!
//! - [`RoomStore`] — owns the room table and performs every transition
//! - [`RoomError`] — why an operation was refused
//! - [`LeaveOutcome`] — whether a room survived a departure
//! - [`Clock`] — where timer deadlines get "now" from
//! - [`catalog`] — the built-in word categories

pub mod catalog;
mod clock;
mod config;
mod error;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_MAX_NAME_LEN, StoreConfig};
pub use error::RoomError;
pub use store::{LeaveOutcome, RoomStore};
