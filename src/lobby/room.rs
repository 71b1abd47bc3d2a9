//! Game room: sessions, seats and the simulation loop
//!
//! A room owns its `GameLoop` plus the per-session connection records. A
//! disconnected session's seat is reserved for a bounded grace window
//! (measured on the room clock); only when the grace expires does the seat
//! fall to bot control. Snapshot broadcast is fire-and-forget through each
//! session's unbounded outbox so a slow client can never stall the tick.

use std::time::Instant;

use hashbrown::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::constants::swap::RECONNECT_GRACE;
use crate::game::game_loop::{GameLoop, GameLoopConfig};
use crate::game::input_cache::InputSender;
use crate::game::state::{RoomMode, Seat, SessionId};
use crate::net::protocol::{RoomEvent, RoomSnapshot, ServerMessage};

/// Connection state of one session within a room.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionState {
    Connected,
    /// Temporarily gone; the seat is reserved until `grace_until` (room time).
    Disconnected { grace_until: f64 },
    Left,
}

/// Per-session record.
pub struct RoomSession {
    pub session_id: SessionId,
    pub display_name: String,
    pub state: ConnectionState,
    /// Fire-and-forget outbound channel; None until the transport attaches.
    pub outbox: Option<UnboundedSender<ServerMessage>>,
}

impl RoomSession {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Room errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,
    #[error("Session already in the room")]
    AlreadyJoined,
    #[error("Session not found")]
    SessionNotFound,
    #[error("Reconnection grace expired")]
    GraceExpired,
}

/// One game room.
pub struct Room {
    pub id: Uuid,
    pub mode: RoomMode,
    pub created_at: Instant,
    sessions: HashMap<SessionId, RoomSession>,
    game: GameLoop,
}

impl Room {
    pub fn new(mode: RoomMode, seed: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            created_at: Instant::now(),
            sessions: HashMap::new(),
            game: GameLoop::new(GameLoopConfig { mode, seed }),
        }
    }

    pub fn game(&self) -> &GameLoop {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameLoop {
        &mut self.game
    }

    /// Sender for connection handlers to push seat inputs.
    pub fn input_sender(&self) -> InputSender {
        self.game.input_sender()
    }

    /// Sessions currently holding a connection.
    pub fn connected_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_connected()).count()
    }

    /// Sessions holding or reserving a seat (connected + in-grace).
    pub fn occupied_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| !matches!(s.state, ConnectionState::Left))
            .count()
    }

    pub fn is_full(&self) -> bool {
        self.occupied_count() >= self.mode.max_humans()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied_count() == 0
    }

    /// Join a new session. The first join starts the run.
    pub fn join(
        &mut self,
        session_id: SessionId,
        display_name: String,
        preferred_seat: Option<Seat>,
        outbox: Option<UnboundedSender<ServerMessage>>,
    ) -> Result<Seat, RoomError> {
        if self.sessions.contains_key(&session_id) {
            return Err(RoomError::AlreadyJoined);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }

        let seat = self.game.add_session(session_id, preferred_seat);
        self.sessions.insert(
            session_id,
            RoomSession {
                session_id,
                display_name,
                state: ConnectionState::Connected,
                outbox,
            },
        );

        if self.game.start() {
            info!(room = %self.id, mode = ?self.mode, "run started");
            self.broadcast_event(&RoomEvent::RunStarted { mode: self.mode });
        }
        self.broadcast_event(&RoomEvent::PlayerJoined { session_id, seat });
        info!(room = %self.id, session = %session_id, seat = seat.as_str(), "session joined");
        Ok(seat)
    }

    /// Transport-level disconnect: keep the seat, start the grace clock.
    pub fn disconnect(&mut self, session_id: SessionId) -> Result<(), RoomError> {
        let now = self.game.state().now();
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(RoomError::SessionNotFound)?;
        session.state = ConnectionState::Disconnected { grace_until: now + RECONNECT_GRACE };
        session.outbox = None;
        debug!(room = %self.id, session = %session_id, "session disconnected, seat reserved");
        Ok(())
    }

    /// Resume a session within its grace window.
    pub fn reconnect(
        &mut self,
        session_id: SessionId,
        outbox: Option<UnboundedSender<ServerMessage>>,
    ) -> Result<Seat, RoomError> {
        let now = self.game.state().now();
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(RoomError::SessionNotFound)?;

        match session.state {
            ConnectionState::Disconnected { grace_until } if now <= grace_until => {
                session.state = ConnectionState::Connected;
                session.outbox = outbox;
                let seat = self
                    .game
                    .state()
                    .seat_map
                    .seat_of(session_id)
                    .ok_or(RoomError::SessionNotFound)?;
                info!(room = %self.id, session = %session_id, "session reconnected");
                Ok(seat)
            }
            ConnectionState::Connected => Err(RoomError::AlreadyJoined),
            _ => Err(RoomError::GraceExpired),
        }
    }

    /// Explicit leave: the seat is surrendered immediately, no grace.
    pub fn leave(&mut self, session_id: SessionId) -> Option<Seat> {
        let session = self.sessions.get_mut(&session_id)?;
        session.state = ConnectionState::Left;
        session.outbox = None;
        let seat = self.game.remove_session(session_id);
        if let Some(seat) = seat {
            self.broadcast_event(&RoomEvent::PlayerLeft { session_id, seat });
        }
        self.sessions.remove(&session_id);
        seat
    }

    /// Expire reconnection graces: the reserved seat converts to bot
    /// control and an event is emitted.
    fn expire_graces(&mut self) -> Vec<RoomEvent> {
        let now = self.game.state().now();
        let expired: Vec<SessionId> = self
            .sessions
            .values()
            .filter_map(|s| match s.state {
                ConnectionState::Disconnected { grace_until } if now > grace_until => {
                    Some(s.session_id)
                }
                _ => None,
            })
            .collect();

        let mut events = Vec::new();
        for session_id in expired {
            if let Some(seat) = self.game.remove_session(session_id) {
                warn!(room = %self.id, session = %session_id, seat = seat.as_str(), "grace expired, bot takeover");
                events.push(RoomEvent::SeatBotTakeover { seat });
            }
            self.sessions.remove(&session_id);
        }
        events
    }

    /// Run one tick and broadcast the snapshot plus events to every
    /// connected session. Never blocks on a client.
    pub fn tick_and_broadcast(&mut self) -> Vec<RoomEvent> {
        let mut events = self.expire_graces();
        events.extend(self.game.tick());

        for event in &events {
            self.broadcast_event(event);
        }
        let snapshot = self.game.snapshot();
        self.broadcast_snapshot(snapshot);
        events
    }

    /// Apply an upgrade on behalf of a session and broadcast the result.
    /// Unknown ids stay a silent no-op.
    pub fn apply_upgrade(&mut self, session_id: SessionId, id: &str) {
        if let Some(event) = self.game.apply_upgrade(Some(session_id), id) {
            self.broadcast_event(&event);
        }
    }

    /// Force an immediate reroll of the offer and broadcast the options.
    pub fn reroll_upgrades(&mut self) {
        let event = self.game.reroll_offer();
        self.broadcast_event(&event);
    }

    fn broadcast_event(&self, event: &RoomEvent) {
        for session in self.sessions.values().filter(|s| s.is_connected()) {
            if let Some(outbox) = &session.outbox {
                // Fire-and-forget: a closed receiver just drops the message
                let _ = outbox.send(ServerMessage::Event(event.clone()));
            }
        }
    }

    fn broadcast_snapshot(&self, snapshot: RoomSnapshot) {
        for session in self.sessions.values().filter(|s| s.is_connected()) {
            if let Some(outbox) = &session.outbox {
                let _ = outbox.send(ServerMessage::Snapshot(snapshot.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::ticking;
    use crate::game::state::RoomPhase;

    fn crew_room() -> Room {
        Room::new(RoomMode::Crew, 99)
    }

    #[test]
    fn test_first_join_starts_run() {
        let mut room = crew_room();
        assert_eq!(room.game().state().phase, RoomPhase::Lobby);
        room.join(Uuid::new_v4(), "P1".to_string(), None, None).unwrap();
        assert_eq!(room.game().state().phase, RoomPhase::Running);
    }

    #[test]
    fn test_join_respects_capacity() {
        let mut room = Room::new(RoomMode::Solo, 1);
        room.join(Uuid::new_v4(), "P1".to_string(), None, None).unwrap();
        let result = room.join(Uuid::new_v4(), "P2".to_string(), None, None);
        assert!(matches!(result, Err(RoomError::RoomFull)));
    }

    #[test]
    fn test_double_join_rejected() {
        let mut room = crew_room();
        let id = Uuid::new_v4();
        room.join(id, "P1".to_string(), None, None).unwrap();
        assert!(matches!(
            room.join(id, "P1".to_string(), None, None),
            Err(RoomError::AlreadyJoined)
        ));
    }

    #[test]
    fn test_disconnect_reserves_seat() {
        let mut room = crew_room();
        let id = Uuid::new_v4();
        let seat = room.join(id, "P1".to_string(), Some(Seat::Gunner), None).unwrap();
        room.disconnect(id).unwrap();

        // Seat still mapped to the session; not yet bot-controlled
        assert_eq!(room.game().state().seat_map.seat_of(id), Some(seat));

        // Ticks within the grace keep the reservation
        for _ in 0..20 {
            room.tick_and_broadcast();
        }
        assert_eq!(room.game().state().seat_map.seat_of(id), Some(seat));
    }

    #[test]
    fn test_reconnect_within_grace() {
        let mut room = crew_room();
        let id = Uuid::new_v4();
        let seat = room.join(id, "P1".to_string(), Some(Seat::Power), None).unwrap();
        room.disconnect(id).unwrap();
        for _ in 0..10 {
            room.tick_and_broadcast();
        }
        let resumed = room.reconnect(id, None).unwrap();
        assert_eq!(resumed, seat);
        assert_eq!(room.connected_count(), 1);
    }

    #[test]
    fn test_grace_expiry_converts_to_bot() {
        let mut room = crew_room();
        let id = Uuid::new_v4();
        room.join(id, "P1".to_string(), Some(Seat::Support), None).unwrap();
        room.disconnect(id).unwrap();

        // Run past the grace window
        let ticks = (RECONNECT_GRACE / ticking::DT) as usize + 10;
        let mut takeover = false;
        for _ in 0..ticks {
            for event in room.tick_and_broadcast() {
                if matches!(event, RoomEvent::SeatBotTakeover { seat: Seat::Support }) {
                    takeover = true;
                }
            }
        }
        assert!(takeover, "no bot takeover after grace expiry");
        assert_eq!(room.game().state().seat_map.seat_of(id), None);
        assert!(matches!(room.reconnect(id, None), Err(RoomError::SessionNotFound)));
    }

    #[test]
    fn test_leave_surrenders_seat_immediately() {
        let mut room = crew_room();
        let id = Uuid::new_v4();
        room.join(id, "P1".to_string(), None, None).unwrap();
        let seat = room.leave(id);
        assert!(seat.is_some());
        assert!(room.is_empty());
        assert_eq!(room.game().state().seat_map.human_count(), 0);
    }

    #[test]
    fn test_snapshots_flow_to_connected_sessions() {
        let mut room = crew_room();
        let id = Uuid::new_v4();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        room.join(id, "P1".to_string(), None, Some(tx)).unwrap();

        room.tick_and_broadcast();

        let mut got_snapshot = false;
        while let Ok(message) = rx.try_recv() {
            if matches!(message, ServerMessage::Snapshot(_)) {
                got_snapshot = true;
            }
        }
        assert!(got_snapshot);
    }

    #[test]
    fn test_broadcast_survives_dropped_receiver() {
        let mut room = crew_room();
        let id = Uuid::new_v4();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        room.join(id, "P1".to_string(), None, Some(tx)).unwrap();
        drop(rx);
        // Must not panic or error
        room.tick_and_broadcast();
    }
}
