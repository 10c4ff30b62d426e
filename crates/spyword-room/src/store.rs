//! The room store: owns every live room and performs all state transitions.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use spyword_protocol::{GameState, Player, PlayerId, Role, Room, RoomId, SettingsPatch};

use crate::catalog::{self, FALLBACK_CATEGORY};
use crate::{Clock, RoomError, StoreConfig, SystemClock};

/// Smallest and one-past-largest generated room code.
const ROOM_CODE_RANGE: std::ops::Range<u32> = 100_000..1_000_000;

/// What is left of a room after a player leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The room still has members; here is its new snapshot.
    Remaining(Room),
    /// The last player left and the room was deleted.
    Deleted,
}

/// In-memory table of live rooms, keyed by join code.
///
/// Every operation locks only the entry of the room it touches, so an
/// operation on one room is atomic to observers while other rooms are
/// mutated in parallel. Nothing here awaits or does I/O.
///
/// Operations return owned snapshots, never references into the table,
/// so callers can broadcast without holding a lock.
pub struct RoomStore<C: Clock = SystemClock> {
    rooms: DashMap<RoomId, Room>,
    clock: C,
    config: StoreConfig,
}

impl RoomStore<SystemClock> {
    /// Creates an empty store using the system clock and default config.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default(), SystemClock)
    }
}

impl Default for RoomStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RoomStore<C> {
    /// Creates an empty store with default config and the given clock.
    pub fn with_clock(clock: C) -> Self {
        Self::with_config(StoreConfig::default(), clock)
    }

    /// Creates an empty store.
    pub fn with_config(config: StoreConfig, clock: C) -> Self {
        Self {
            rooms: DashMap::new(),
            clock,
            config,
        }
    }

    /// Opens a new lobby with `host` as its only player.
    ///
    /// Room codes are random; a code already in use is rejected and
    /// redrawn, so creation always succeeds.
    pub fn create(&self, host: PlayerId, host_name: &str) -> Room {
        let host_name = self.config.clamp_name(host_name);
        let mut rng = rand::rng();

        loop {
            let code = RoomId(rng.random_range(ROOM_CODE_RANGE).to_string());
            match self.rooms.entry(code) {
                Entry::Occupied(taken) => {
                    tracing::debug!(room_id = %taken.key(), "room code collision, redrawing");
                }
                Entry::Vacant(slot) => {
                    let room = Room {
                        id: slot.key().clone(),
                        host_id: host,
                        players: vec![Player {
                            id: host,
                            name: host_name,
                            role: None,
                            is_host: true,
                        }],
                        state: GameState::Lobby,
                        settings: self.config.default_settings.clone(),
                        current_word: String::new(),
                        timer_end_time: None,
                        is_paused: false,
                        paused_remaining_ms: None,
                    };
                    slot.insert(room.clone());
                    tracing::info!(room_id = %room.id, host = %host, "room created");
                    return room;
                }
            }
        }
    }

    /// Returns a snapshot of a room.
    pub fn get(&self, room_id: &RoomId) -> Option<Room> {
        self.rooms.get(room_id).map(|room| room.value().clone())
    }

    /// Adds a player to a lobby.
    ///
    /// Joining a room you are already in is a no-op that returns the
    /// current snapshot.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] — no such room
    /// - [`RoomError::GameInProgress`] — the room has left the lobby
    pub fn join(
        &self,
        room_id: &RoomId,
        player: PlayerId,
        name: &str,
    ) -> Result<Room, RoomError> {
        let name = self.config.clamp_name(name);
        self.update(room_id, |room, _| {
            if !room.state.is_joinable() {
                return Err(RoomError::GameInProgress(room.id.clone()));
            }
            if room.contains(player) {
                return Ok(());
            }
            room.players.push(Player {
                id: player,
                name,
                role: None,
                is_host: false,
            });
            tracing::info!(
                room_id = %room.id,
                %player,
                players = room.players.len(),
                "player joined"
            );
            Ok(())
        })
    }

    /// Removes a player. Deletes the room when it empties; otherwise, if
    /// the host left, the earliest-joined remaining player becomes host.
    ///
    /// A `player` who is not a member leaves the room unchanged.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room does not exist.
    pub fn leave(
        &self,
        room_id: &RoomId,
        player: PlayerId,
    ) -> Result<LeaveOutcome, RoomError> {
        let Entry::Occupied(mut entry) = self.rooms.entry(room_id.clone()) else {
            return Err(RoomError::NotFound(room_id.clone()));
        };

        let room = entry.get_mut();
        room.players.retain(|p| p.id != player);

        if room.players.is_empty() {
            entry.remove();
            tracing::info!(%room_id, %player, "last player left, room deleted");
            return Ok(LeaveOutcome::Deleted);
        }

        if room.host_id == player {
            let heir = &mut room.players[0];
            heir.is_host = true;
            room.host_id = heir.id;
            tracing::info!(%room_id, from = %player, to = %room.host_id, "host transferred");
        }

        Ok(LeaveOutcome::Remaining(room.clone()))
    }

    /// Overrides the settings fields present in `patch`.
    ///
    /// No bounds are checked: a negative or oversized spy count is stored
    /// as sent and only clamped when a round starts.
    pub fn update_settings(
        &self,
        room_id: &RoomId,
        patch: SettingsPatch,
    ) -> Result<Room, RoomError> {
        self.update(room_id, |room, _| {
            room.settings.apply(patch);
            tracing::debug!(%room_id, settings = ?room.settings, "settings updated");
            Ok(())
        })
    }

    /// Deals a new round: picks the secret word, assigns roles, and moves
    /// the room to `Reveal` with no timer running.
    ///
    /// The word is drawn uniformly from the union of the selected
    /// categories, or from the fallback category if that union is empty.
    /// The first `spy_count` players of a uniform shuffle become spies,
    /// with `spy_count` clamped to `0..=players`. No minimum player count
    /// is enforced.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] — no such room
    /// - [`RoomError::NoWordsAvailable`] — empty pool and empty fallback
    pub fn start_game(&self, room_id: &RoomId) -> Result<Room, RoomError> {
        self.update(room_id, |room, _| {
            let mut pool = catalog::word_pool(&room.settings.categories);
            if pool.is_empty() {
                pool = catalog::words(FALLBACK_CATEGORY)
                    .map(<[_]>::to_vec)
                    .unwrap_or_default();
            }

            let mut rng = rand::rng();
            let word = pool
                .choose(&mut rng)
                .copied()
                .ok_or(RoomError::NoWordsAvailable)?;

            let population = room.players.len();
            let spies = room.settings.spy_count.clamp(0, population as i64) as usize;

            let mut order: Vec<usize> = (0..population).collect();
            order.shuffle(&mut rng);
            for (rank, index) in order.into_iter().enumerate() {
                room.players[index].role = Some(if rank < spies {
                    Role::Spy
                } else {
                    Role::Civilian
                });
            }

            room.current_word = word.to_string();
            room.state = GameState::Reveal;
            room.timer_end_time = None;
            room.is_paused = false;
            room.paused_remaining_ms = None;

            tracing::info!(%room_id, players = population, spies, "round dealt");
            Ok(())
        })
    }

    /// Starts (or restarts) the countdown and moves the room to `Game`.
    ///
    /// Allowed from any state. Expiry is observed by clients only; the
    /// server never acts when the deadline passes.
    pub fn start_timer(&self, room_id: &RoomId) -> Result<Room, RoomError> {
        self.update(room_id, |room, now| {
            room.state = GameState::Game;
            room.timer_end_time =
                Some(now.saturating_add(room.settings.timer_duration_ms()));
            room.is_paused = false;
            room.paused_remaining_ms = None;
            tracing::debug!(%room_id, end = ?room.timer_end_time, "timer started");
            Ok(())
        })
    }

    /// Toggles the countdown between paused and running.
    ///
    /// Pausing freezes the remaining time (never negative); resuming sets
    /// a new deadline that far from now.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] — no such room
    /// - [`RoomError::NoTimerRunning`] — the timer was never started
    pub fn pause_timer(&self, room_id: &RoomId) -> Result<Room, RoomError> {
        self.update(room_id, |room, now| {
            let Some(end) = room.timer_end_time else {
                return Err(RoomError::NoTimerRunning(room.id.clone()));
            };

            if room.is_paused {
                let remaining = room.paused_remaining_ms.take().unwrap_or(0);
                room.timer_end_time = Some(now.saturating_add(remaining));
                room.is_paused = false;
                tracing::debug!(%room_id, remaining, "timer resumed");
            } else {
                let remaining = end.saturating_sub(now).max(0);
                room.paused_remaining_ms = Some(remaining);
                room.is_paused = true;
                tracing::debug!(%room_id, remaining, "timer paused");
            }
            Ok(())
        })
    }

    /// Returns the room to the lobby, keeping its members and settings.
    pub fn reset(&self, room_id: &RoomId) -> Result<Room, RoomError> {
        self.update(room_id, |room, _| {
            room.state = GameState::Lobby;
            for player in &mut room.players {
                player.role = None;
            }
            room.current_word.clear();
            room.timer_end_time = None;
            room.is_paused = false;
            room.paused_remaining_ms = None;
            tracing::info!(%room_id, "room reset to lobby");
            Ok(())
        })
    }

    /// Deletes a room unconditionally and returns its final snapshot.
    ///
    /// Who may close a room is decided by the caller.
    pub fn close(&self, room_id: &RoomId) -> Result<Room, RoomError> {
        let (_, room) = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        tracing::info!(%room_id, players = room.players.len(), "room closed");
        Ok(room)
    }

    /// The current host of a room.
    pub fn host_of(&self, room_id: &RoomId) -> Option<PlayerId> {
        self.rooms.get(room_id).map(|room| room.host_id)
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if no rooms are live.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Codes of all live rooms.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Runs `f` on a room under its entry lock and returns the resulting
    /// snapshot. `f` must validate before mutating: an `Err` is returned
    /// as-is and whatever `f` already changed stays changed.
    fn update<F>(&self, room_id: &RoomId, f: F) -> Result<Room, RoomError>
    where
        F: FnOnce(&mut Room, i64) -> Result<(), RoomError>,
    {
        let now = self.clock.now_ms();
        let mut room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        f(room.value_mut(), now)?;
        Ok(room.value().clone())
    }
}
