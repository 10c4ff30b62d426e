//! The session registry: who is connected, and which rooms they hear.
//!
//! Each live connection registers an [`Outbox`], the sending half of a
//! channel drained by that connection's writer task. Connections are
//! then placed into per-room *groups*; broadcasting to a room means
//! pushing a message into the outbox of every connection in its group.
//!
//! Group membership is the dispatcher's view of "who should be told
//! about this room". It is kept in step with the room store by the
//! dispatcher, not by this module.
//!
//! # Concurrency note
//!
//! Both tables are `DashMap`s and no method holds a guard on one table
//! while locking the other, so there is no lock ordering to get wrong.
//! Sends are non-blocking (unbounded channel), so nothing here awaits.

use std::collections::HashSet;

use dashmap::DashMap;
use spyword_protocol::{PlayerId, RoomId, ServerMessage};
use tokio::sync::mpsc;

use crate::SessionError;

/// Sending half of a connection's outbound queue.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// One registered connection.
struct Session {
    outbox: Outbox,
    /// Rooms whose group this connection is in.
    rooms: HashSet<RoomId>,
}

/// Tracks connected clients and the broadcast group of every room.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<PlayerId, Session>,
    groups: DashMap<RoomId, HashSet<PlayerId>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly accepted connection.
    ///
    /// Registering an id again replaces its outbox and clears its rooms;
    /// connection ids are never reused, so this only happens in tests.
    pub fn register(&self, player: PlayerId, outbox: Outbox) {
        let previous = self.sessions.insert(
            player,
            Session {
                outbox,
                rooms: HashSet::new(),
            },
        );
        if let Some(previous) = previous {
            self.forget_rooms(player, previous.rooms);
        }
        tracing::debug!(%player, "session registered");
    }

    /// Removes a connection from the registry and from every group.
    ///
    /// Returns the rooms it was in, so the caller can run departure for
    /// each of them. After this returns, no broadcast reaches `player`.
    pub fn unregister(&self, player: PlayerId) -> Vec<RoomId> {
        let Some((_, session)) = self.sessions.remove(&player) else {
            return Vec::new();
        };

        let mut rooms: Vec<RoomId> = session.rooms.iter().cloned().collect();
        rooms.sort();
        self.forget_rooms(player, session.rooms);

        tracing::debug!(%player, rooms = rooms.len(), "session unregistered");
        rooms
    }

    /// Adds a connection to a room's broadcast group.
    ///
    /// # Errors
    /// [`SessionError::NotConnected`] if `player` is not registered.
    pub fn join_group(
        &self,
        player: PlayerId,
        room: &RoomId,
    ) -> Result<(), SessionError> {
        {
            let mut session = self
                .sessions
                .get_mut(&player)
                .ok_or(SessionError::NotConnected(player))?;
            session.rooms.insert(room.clone());
        }
        self.groups.entry(room.clone()).or_default().insert(player);
        Ok(())
    }

    /// Removes a connection from a room's broadcast group. Empty groups
    /// are dropped. Returns `true` if it was a member.
    pub fn leave_group(&self, player: PlayerId, room: &RoomId) -> bool {
        if let Some(mut session) = self.sessions.get_mut(&player) {
            session.rooms.remove(room);
        }
        let removed = self
            .groups
            .get_mut(room)
            .is_some_and(|mut members| members.remove(&player));
        self.groups.remove_if(room, |_, members| members.is_empty());
        removed
    }

    /// Drops a room's group entirely, e.g. after the room is closed.
    ///
    /// Returns the connections that were in it.
    pub fn dissolve(&self, room: &RoomId) -> Vec<PlayerId> {
        let Some((_, members)) = self.groups.remove(room) else {
            return Vec::new();
        };
        for player in &members {
            if let Some(mut session) = self.sessions.get_mut(player) {
                session.rooms.remove(room);
            }
        }
        let mut members: Vec<PlayerId> = members.into_iter().collect();
        members.sort();
        members
    }

    /// Connections currently in a room's group, in id order.
    pub fn members(&self, room: &RoomId) -> Vec<PlayerId> {
        let mut members: Vec<PlayerId> = self
            .groups
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    /// Rooms a connection is grouped into, in code order.
    pub fn rooms_of(&self, player: PlayerId) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self
            .sessions
            .get(&player)
            .map(|session| session.rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    /// Returns `true` if `player` is registered.
    pub fn is_connected(&self, player: PlayerId) -> bool {
        self.sessions.contains_key(&player)
    }

    /// Queues a message for one connection.
    ///
    /// # Errors
    /// - [`SessionError::NotConnected`] — unknown connection
    /// - [`SessionError::OutboxClosed`] — its writer task has stopped
    pub fn send_to(
        &self,
        player: PlayerId,
        msg: ServerMessage,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get(&player)
            .ok_or(SessionError::NotConnected(player))?;
        session
            .outbox
            .send(msg)
            .map_err(|_| SessionError::OutboxClosed(player))
    }

    /// Queues a message for every connection in a room's group.
    ///
    /// Connections whose outbox is closed are skipped. Returns how many
    /// connections the message was queued for.
    pub fn broadcast(&self, room: &RoomId, msg: &ServerMessage) -> usize {
        let mut delivered = 0;
        for player in self.members(room) {
            match self.send_to(player, msg.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(%room, error = %e, "broadcast skipped member");
                }
            }
        }
        delivered
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn forget_rooms(&self, player: PlayerId, rooms: HashSet<RoomId>) {
        for room in rooms {
            if let Some(mut members) = self.groups.get_mut(&room) {
                members.remove(&player);
            }
            self.groups.remove_if(&room, |_, members| members.is_empty());
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
