//! Binds client intents to room store operations and decides who hears
//! about the result.
//!
//! The reply model is lopsided:
//!
//! - `create_room` and `join_room` always answer the caller with an ack.
//! - Every other mutation is fire-and-forget. On success the new snapshot
//!   is broadcast to the room's group; on failure nothing is sent, and the
//!   drop is only visible in the logs at `debug`.
//!
//! The dispatcher itself is synchronous: store operations never block and
//! outboxes are unbounded, so a connection task can call straight into it
//! without awaiting.

use std::sync::Arc;

use spyword_protocol::{
    AckReply, ClientEnvelope, Intent, JoinReply, PlayerId, RoomId, ServerMessage,
};
use spyword_room::{Clock, LeaveOutcome, RoomError, RoomStore, SystemClock};
use spyword_session::{Outbox, SessionRegistry};

/// Dispatch policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// When set, host-only intents from anyone but the room's current
    /// host are dropped like any other failed fire-and-forget intent.
    pub enforce_host: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { enforce_host: true }
    }
}

/// Routes intents from connections to the [`RoomStore`] and fans results
/// out through the [`SessionRegistry`].
pub struct Dispatcher<C: Clock = SystemClock> {
    store: Arc<RoomStore<C>>,
    sessions: Arc<SessionRegistry>,
    config: DispatchConfig,
}

impl<C: Clock> Dispatcher<C> {
    pub fn new(
        store: Arc<RoomStore<C>>,
        sessions: Arc<SessionRegistry>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            config,
        }
    }

    pub fn store(&self) -> &Arc<RoomStore<C>> {
        &self.store
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Registers a new connection and greets it with its identity.
    pub fn connect(&self, player: PlayerId, outbox: Outbox) {
        self.sessions.register(player, outbox);
        self.reply(player, ServerMessage::Connected { id: player });
        tracing::info!(%player, "player connected");
    }

    /// Handles one inbound intent from `player`.
    pub fn dispatch(&self, player: PlayerId, envelope: ClientEnvelope) {
        let ClientEnvelope { ack, intent } = envelope;

        if self.config.enforce_host && intent.is_host_only() {
            if let Some(room_id) = intent.room_id() {
                if self.store.host_of(room_id) != Some(player) {
                    tracing::debug!(
                        %player,
                        %room_id,
                        intent = intent.name(),
                        "dropped host-only intent from non-host"
                    );
                    return;
                }
            }
        }

        match intent {
            Intent::CreateRoom { name } => self.create_room(player, ack, &name),
            Intent::JoinRoom { room_id, name } => {
                self.join_room(player, ack, &room_id, &name);
            }
            Intent::UpdateSettings { room_id, settings } => {
                let result = self.store.update_settings(&room_id, settings);
                self.broadcast_result(player, "update_settings", &room_id, result);
            }
            Intent::StartGame { room_id } => {
                let result = self.store.start_game(&room_id);
                self.broadcast_result(player, "start_game", &room_id, result);
            }
            Intent::StartTimer { room_id } => {
                let result = self.store.start_timer(&room_id);
                self.broadcast_result(player, "start_timer", &room_id, result);
            }
            Intent::PauseTimer { room_id } => {
                let result = self.store.pause_timer(&room_id);
                self.broadcast_result(player, "pause_timer", &room_id, result);
            }
            Intent::ResetGame { room_id } => {
                let result = self.store.reset(&room_id);
                self.broadcast_result(player, "reset_game", &room_id, result);
            }
            Intent::CloseRoom { room_id } => self.close_room(player, &room_id),
            Intent::LeaveRoom { room_id } => self.leave_room(player, &room_id),
            Intent::Ping => self.reply(player, ServerMessage::Pong),
        }
    }

    /// Runs departure for every room `player` was in, then forgets the
    /// connection.
    ///
    /// Surviving rooms get a fresh snapshot; rooms that emptied are gone
    /// and nobody is told.
    pub fn disconnect(&self, player: PlayerId) {
        let rooms = self.sessions.unregister(player);
        for room_id in &rooms {
            self.depart(player, room_id);
        }
        tracing::info!(%player, rooms = rooms.len(), "player disconnected");
    }

    fn create_room(&self, player: PlayerId, ack: Option<u64>, name: &str) {
        let room = self.store.create(player, name);
        if let Err(e) = self.sessions.join_group(player, &room.id) {
            tracing::debug!(%player, room_id = %room.id, error = %e, "creator not grouped");
        }
        self.reply(
            player,
            ServerMessage::Ack {
                id: ack,
                reply: AckReply::Room(room),
            },
        );
    }

    fn join_room(
        &self,
        player: PlayerId,
        ack: Option<u64>,
        room_id: &RoomId,
        name: &str,
    ) {
        let reply = match self.store.join(room_id, player, name) {
            Ok(room) => {
                if let Err(e) = self.sessions.join_group(player, room_id) {
                    tracing::debug!(%player, %room_id, error = %e, "joiner not grouped");
                }
                self.sessions
                    .broadcast(room_id, &ServerMessage::RoomUpdated(room.clone()));
                JoinReply::joined(room)
            }
            Err(e) => {
                tracing::debug!(%player, %room_id, error = %e, "join refused");
                JoinReply::failed(e.to_string())
            }
        };
        self.reply(
            player,
            ServerMessage::Ack {
                id: ack,
                reply: AckReply::Join(reply),
            },
        );
    }

    fn close_room(&self, player: PlayerId, room_id: &RoomId) {
        match self.store.close(room_id) {
            Ok(_) => {
                let told = self.sessions.broadcast(room_id, &ServerMessage::RoomClosed);
                self.sessions.dissolve(room_id);
                tracing::debug!(%room_id, by = %player, told, "room_closed broadcast");
            }
            Err(e) => self.dropped(player, "close_room", &e),
        }
    }

    fn leave_room(&self, player: PlayerId, room_id: &RoomId) {
        if !self.sessions.leave_group(player, room_id) {
            tracing::debug!(%player, %room_id, "leave_room for a room not joined");
        }
        self.depart(player, room_id);
    }

    /// Removes `player` from a room after they have left its group.
    fn depart(&self, player: PlayerId, room_id: &RoomId) {
        match self.store.leave(room_id, player) {
            Ok(LeaveOutcome::Remaining(room)) => {
                self.sessions
                    .broadcast(room_id, &ServerMessage::RoomUpdated(room));
            }
            Ok(LeaveOutcome::Deleted) => {
                self.sessions.dissolve(room_id);
            }
            Err(e) => self.dropped(player, "leave", &e),
        }
    }

    fn broadcast_result(
        &self,
        player: PlayerId,
        intent: &'static str,
        room_id: &RoomId,
        result: Result<spyword_protocol::Room, RoomError>,
    ) {
        match result {
            Ok(room) => {
                self.sessions
                    .broadcast(room_id, &ServerMessage::RoomUpdated(room));
            }
            Err(e) => self.dropped(player, intent, &e),
        }
    }

    fn dropped(&self, player: PlayerId, intent: &'static str, error: &RoomError) {
        tracing::debug!(%player, intent, error = %error, "intent dropped");
    }

    fn reply(&self, player: PlayerId, msg: ServerMessage) {
        if let Err(e) = self.sessions.send_to(player, msg) {
            tracing::debug!(%player, error = %e, "reply not delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spyword_protocol::{GameState, Role, Room, SettingsPatch};
    use spyword_room::ManualClock;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    type Inbox = UnboundedReceiver<ServerMessage>;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn dispatcher(config: DispatchConfig) -> Dispatcher<ManualClock> {
        let store = RoomStore::with_clock(ManualClock::new(1_000_000));
        Dispatcher::new(Arc::new(store), Arc::new(SessionRegistry::new()), config)
    }

    /// Connects `id` and discards the greeting.
    fn connect(d: &Dispatcher<ManualClock>, id: u64) -> Inbox {
        let (tx, mut rx) = mpsc::unbounded_channel();
        d.connect(pid(id), tx);
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::Connected { id: pid(id) }
        );
        rx
    }

    fn drain(rx: &mut Inbox) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn send(d: &Dispatcher<ManualClock>, id: u64, intent: Intent) {
        d.dispatch(pid(id), ClientEnvelope::from(intent));
    }

    fn create(d: &Dispatcher<ManualClock>, host: u64, inbox: &mut Inbox) -> RoomId {
        d.dispatch(
            pid(host),
            ClientEnvelope {
                ack: Some(1),
                intent: Intent::CreateRoom { name: "Host".into() },
            },
        );
        match drain(inbox).as_slice() {
            [ServerMessage::Ack { id: Some(1), reply: AckReply::Room(room) }] => room.id.clone(),
            other => panic!("expected create ack, got {other:?}"),
        }
    }

    fn join(d: &Dispatcher<ManualClock>, id: u64, room_id: &RoomId) {
        send(
            d,
            id,
            Intent::JoinRoom {
                room_id: room_id.clone(),
                name: format!("P{id}"),
            },
        );
    }

    fn only_snapshot(inbox: &mut Inbox) -> Room {
        match drain(inbox).as_slice() {
            [ServerMessage::RoomUpdated(room)] => room.clone(),
            other => panic!("expected one room_updated, got {other:?}"),
        }
    }

    // =====================================================================
    // connect / create / join
    // =====================================================================

    #[test]
    fn test_connect_greets_with_identity() {
        let d = dispatcher(DispatchConfig::default());
        let _inbox = connect(&d, 7);
        assert!(d.sessions().is_connected(pid(7)));
    }

    #[test]
    fn test_create_room_acks_creator_and_groups_them() {
        let d = dispatcher(DispatchConfig::default());
        let mut host = connect(&d, 1);

        let room_id = create(&d, 1, &mut host);

        assert!(room_id.is_well_formed());
        assert_eq!(d.sessions().members(&room_id), vec![pid(1)]);
        assert_eq!(d.store().host_of(&room_id), Some(pid(1)));
    }

    #[test]
    fn test_join_broadcasts_and_acks_joiner() {
        let d = dispatcher(DispatchConfig::default());
        let mut host = connect(&d, 1);
        let mut guest = connect(&d, 2);
        let room_id = create(&d, 1, &mut host);

        d.dispatch(
            pid(2),
            ClientEnvelope {
                ack: Some(9),
                intent: Intent::JoinRoom {
                    room_id: room_id.clone(),
                    name: "Guest".into(),
                },
            },
        );

        let snapshot = only_snapshot(&mut host);
        assert_eq!(snapshot.players.len(), 2);

        let guest_msgs = drain(&mut guest);
        assert_eq!(guest_msgs.len(), 2);
        assert_eq!(guest_msgs[0], ServerMessage::RoomUpdated(snapshot.clone()));
        assert_eq!(
            guest_msgs[1],
            ServerMessage::Ack {
                id: Some(9),
                reply: AckReply::Join(JoinReply::joined(snapshot)),
            }
        );
    }

    #[test]
    fn test_join_failure_replies_only_to_joiner() {
        let d = dispatcher(DispatchConfig::default());
        let mut host = connect(&d, 1);
        let mut guest = connect(&d, 2);
        let room_id = create(&d, 1, &mut host);
        send(&d, 1, Intent::StartGame { room_id: room_id.clone() });
        drain(&mut host);

        join(&d, 2, &room_id);

        assert!(drain(&mut host).is_empty());
        match drain(&mut guest).as_slice() {
            [ServerMessage::Ack { id: None, reply: AckReply::Join(reply) }] => {
                assert!(!reply.success);
                assert!(reply.room.is_none());
                assert!(reply.error.as_deref().unwrap().contains("in progress"));
            }
            other => panic!("expected failed join ack, got {other:?}"),
        }
        assert_eq!(d.sessions().members(&room_id), vec![pid(1)]);
    }

    #[test]
    fn test_join_missing_room_reports_not_found() {
        let d = dispatcher(DispatchConfig::default());
        let mut guest = connect(&d, 2);

        join(&d, 2, &RoomId::from("000000"));

        match drain(&mut guest).as_slice() {
            [ServerMessage::Ack { reply: AckReply::Join(reply), .. }] => {
                assert!(!reply.success);
                assert!(reply.error.as_deref().unwrap().contains("not found"));
            }
            other => panic!("expected failed join ack, got {other:?}"),
        }
    }

    // =====================================================================
    // fire-and-forget mutations
    // =====================================================================

    #[test]
    fn test_settings_and_start_broadcast_to_group() {
        let d = dispatcher(DispatchConfig::default());
        let mut host = connect(&d, 1);
        let mut guest = connect(&d, 2);
        let room_id = create(&d, 1, &mut host);
        join(&d, 2, &room_id);
        drain(&mut host);
        drain(&mut guest);

        send(
            &d,
            1,
            Intent::UpdateSettings {
                room_id: room_id.clone(),
                settings: SettingsPatch {
                    categories: Some(["Animals".to_string()].into()),
                    ..SettingsPatch::default()
                },
            },
        );
        assert_eq!(only_snapshot(&mut guest).settings.categories.len(), 1);
        drain(&mut host);

        send(&d, 1, Intent::StartGame { room_id: room_id.clone() });
        let room = only_snapshot(&mut guest);
        assert_eq!(room.state, GameState::Reveal);
        assert_eq!(room.spy_count(), 1);
        assert_eq!(only_snapshot(&mut host), room);
    }

    #[test]
    fn test_non_host_intents_are_dropped() {
        let d = dispatcher(DispatchConfig::default());
        let mut host = connect(&d, 1);
        let mut guest = connect(&d, 2);
        let room_id = create(&d, 1, &mut host);
        join(&d, 2, &room_id);
        drain(&mut host);
        drain(&mut guest);

        send(&d, 2, Intent::StartGame { room_id: room_id.clone() });
        send(&d, 2, Intent::CloseRoom { room_id: room_id.clone() });

        assert!(drain(&mut host).is_empty());
        assert!(drain(&mut guest).is_empty());
        assert_eq!(d.store().get(&room_id).unwrap().state, GameState::Lobby);
    }

    #[test]
    fn test_non_host_allowed_when_not_enforced() {
        let d = dispatcher(DispatchConfig { enforce_host: false });
        let mut host = connect(&d, 1);
        let mut guest = connect(&d, 2);
        let room_id = create(&d, 1, &mut host);
        join(&d, 2, &room_id);
        drain(&mut host);
        drain(&mut guest);

        send(&d, 2, Intent::StartGame { room_id: room_id.clone() });

        assert_eq!(only_snapshot(&mut host).state, GameState::Reveal);
    }

    #[test]
    fn test_failed_mutation_is_silent() {
        let d = dispatcher(DispatchConfig { enforce_host: false });
        let mut host = connect(&d, 1);
        let room_id = create(&d, 1, &mut host);

        send(&d, 1, Intent::PauseTimer { room_id: room_id.clone() });
        send(&d, 1, Intent::StartGame { room_id: RoomId::from("000000") });

        assert!(drain(&mut host).is_empty());
    }

    #[test]
    fn test_timer_pause_resume_round_trip() {
        let d = dispatcher(DispatchConfig::default());
        let mut host = connect(&d, 1);
        let room_id = create(&d, 1, &mut host);

        send(&d, 1, Intent::StartTimer { room_id: room_id.clone() });
        let running = only_snapshot(&mut host);
        assert_eq!(running.state, GameState::Game);
        assert_eq!(running.timer_end_time, Some(1_000_000 + 300_000));

        send(&d, 1, Intent::PauseTimer { room_id: room_id.clone() });
        let paused = only_snapshot(&mut host);
        assert!(paused.is_paused);
        assert_eq!(paused.paused_remaining_ms, Some(300_000));

        send(&d, 1, Intent::PauseTimer { room_id: room_id.clone() });
        let resumed = only_snapshot(&mut host);
        assert!(!resumed.is_paused);
        assert_eq!(resumed.timer_end_time, Some(1_300_000));
    }

    #[test]
    fn test_reset_clears_roles() {
        let d = dispatcher(DispatchConfig::default());
        let mut host = connect(&d, 1);
        let room_id = create(&d, 1, &mut host);
        send(&d, 1, Intent::StartGame { room_id: room_id.clone() });
        let dealt = only_snapshot(&mut host);
        assert_eq!(dealt.players[0].role, Some(Role::Spy));

        send(&d, 1, Intent::ResetGame { room_id: room_id.clone() });
        let reset = only_snapshot(&mut host);
        assert_eq!(reset.state, GameState::Lobby);
        assert!(reset.players.iter().all(|p| p.role.is_none()));
        assert!(reset.current_word.is_empty());
    }

    #[test]
    fn test_ping_pongs_caller_only() {
        let d = dispatcher(DispatchConfig::default());
        let mut a = connect(&d, 1);
        let mut b = connect(&d, 2);

        send(&d, 1, Intent::Ping);

        assert_eq!(drain(&mut a), vec![ServerMessage::Pong]);
        assert!(drain(&mut b).is_empty());
    }

    // =====================================================================
    // close / leave / disconnect
    // =====================================================================

    #[test]
    fn test_close_notifies_group_and_dissolves_it() {
        let d = dispatcher(DispatchConfig::default());
        let mut host = connect(&d, 1);
        let mut guest = connect(&d, 2);
        let room_id = create(&d, 1, &mut host);
        join(&d, 2, &room_id);
        drain(&mut host);
        drain(&mut guest);

        send(&d, 1, Intent::CloseRoom { room_id: room_id.clone() });

        assert_eq!(drain(&mut host), vec![ServerMessage::RoomClosed]);
        assert_eq!(drain(&mut guest), vec![ServerMessage::RoomClosed]);
        assert!(d.store().get(&room_id).is_none());
        assert!(d.sessions().members(&room_id).is_empty());
        assert!(d.sessions().rooms_of(pid(2)).is_empty());
    }

    #[test]
    fn test_leave_room_transfers_host_and_notifies_survivors() {
        let d = dispatcher(DispatchConfig::default());
        let mut host = connect(&d, 1);
        let mut guest = connect(&d, 2);
        let room_id = create(&d, 1, &mut host);
        join(&d, 2, &room_id);
        drain(&mut host);
        drain(&mut guest);

        send(&d, 1, Intent::LeaveRoom { room_id: room_id.clone() });

        assert!(drain(&mut host).is_empty());
        let room = only_snapshot(&mut guest);
        assert_eq!(room.host_id, pid(2));
        assert!(room.players[0].is_host);
        assert_eq!(d.sessions().members(&room_id), vec![pid(2)]);
    }

    #[test]
    fn test_disconnect_of_host_transfers_host() {
        let d = dispatcher(DispatchConfig::default());
        let mut host = connect(&d, 1);
        let mut second = connect(&d, 2);
        let mut third = connect(&d, 3);
        let room_id = create(&d, 1, &mut host);
        join(&d, 2, &room_id);
        join(&d, 3, &room_id);
        drain(&mut second);
        drain(&mut third);

        d.disconnect(pid(1));

        let room = only_snapshot(&mut second);
        assert_eq!(room.host_id, pid(2));
        assert_eq!(only_snapshot(&mut third), room);
        assert!(!d.sessions().is_connected(pid(1)));
    }

    #[test]
    fn test_disconnect_of_last_player_deletes_room() {
        let d = dispatcher(DispatchConfig::default());
        let mut host = connect(&d, 1);
        let room_id = create(&d, 1, &mut host);

        d.disconnect(pid(1));

        assert!(d.store().get(&room_id).is_none());
        assert!(d.store().is_empty());
        assert!(d.sessions().members(&room_id).is_empty());
    }

    #[test]
    fn test_disconnect_without_rooms_is_harmless() {
        let d = dispatcher(DispatchConfig::default());
        let _inbox = connect(&d, 1);
        d.disconnect(pid(1));
        d.disconnect(pid(1));
        assert!(d.sessions().is_empty());
    }
}
