//! Wire protocol between the transport layer and the room core
//!
//! Messages are bincode-encoded with the legacy (fixed-int) config for
//! cross-language client compatibility.

use serde::{Deserialize, Serialize};

use crate::game::state::{
    EnemyKind, EntityId, PowerSplit, RoomMode, RoomPhase, RoomState, Seat, SessionId,
};
use crate::loot::roll::RolledUpgrade;
use crate::util::vec3::Vec3;

/// Messages from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Request to join a room. Identity is already authenticated upstream;
    /// the core only sees the session id the collaborator minted.
    JoinRequest {
        display_name: String,
        preferred_seat: Option<Seat>,
        /// Reconnection token from a previous session, if resuming.
        resume_token: Option<Vec<u8>>,
    },
    /// Partial seat input; unset fields retain their cached values.
    Input(SeatInput),
    /// Apply one upgrade from the pending offer by definition id.
    ApplyUpgrade { id: String },
    /// Discard the pending offer and roll a fresh one.
    RerollUpgrades,
    /// Request to leave the room.
    Leave,
    /// Ping for latency measurement.
    Ping { timestamp: u64 },
}

/// Messages from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    JoinAccepted {
        session_id: SessionId,
        seat: Seat,
        resume_token: Vec<u8>,
    },
    JoinRejected { reason: String },
    /// Full authoritative state, broadcast every tick.
    Snapshot(RoomSnapshot),
    Event(RoomEvent),
    Pong {
        client_timestamp: u64,
        server_timestamp: u64,
    },
    Kicked { reason: String },
}

/// Partial per-seat control payload. Every field is optional so malformed or
/// sparse payloads merge defensively instead of being rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeatInput {
    // Pilot
    #[serde(default)]
    pub steer: Option<Vec3>,
    #[serde(default)]
    pub boost: Option<bool>,
    // Gunner
    #[serde(default)]
    pub aim: Option<Vec3>,
    #[serde(default)]
    pub fire: Option<bool>,
    // Power
    #[serde(default)]
    pub power_target: Option<PowerSplit>,
    /// Named preset ("balanced", "attack", "speed", "defense"); takes
    /// precedence over `power_target` when both are present.
    #[serde(default)]
    pub power_preset: Option<String>,
    // Systems
    #[serde(default)]
    pub overdrive: Option<bool>,
    #[serde(default)]
    pub shield_boost: Option<bool>,
    // Support
    #[serde(default)]
    pub scan: Option<bool>,
    #[serde(default)]
    pub repair: Option<bool>,
}

/// Events emitted by the room core alongside snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoomEvent {
    PlayerJoined { session_id: SessionId, seat: Seat },
    PlayerLeft { session_id: SessionId, seat: Seat },
    /// A reserved seat's reconnection grace expired; a bot took over.
    SeatBotTakeover { seat: Seat },
    SwapWarning { swap_at: f64 },
    SwapComplete { assignments: Vec<(SessionId, Seat)> },
    UpgradeOptions { options: Vec<RolledUpgrade> },
    UpgradeApplied { session_id: Option<SessionId>, id: String, seat: Seat },
    WaveStarted { wave: u32, boss: bool },
    EnemyKilled { id: EntityId, kind: EnemyKind, marked: bool },
    ComboTriggered { id: String },
    ShipDestroyed { wave: u32, score: u64 },
    RunStarted { mode: RoomMode },
}

/// Enemy state for network transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: EntityId,
    pub kind: EnemyKind,
    pub position: Vec3,
    pub hp: f32,
    pub telegraphing: bool,
    pub poisoned: bool,
    pub marked: bool,
}

/// Ship state for network transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipSnapshot {
    pub position: Vec3,
    pub velocity: Vec3,
    pub hp: f32,
    pub shield: f32,
    pub max_shield: f32,
    pub power_actual: PowerSplit,
    pub power_target: PowerSplit,
    pub instability: f32,
    pub heat: f32,
    pub overloaded: bool,
    pub perfect_active: bool,
    pub vision_radius: f32,
}

/// Full serializable room state, assembled once per tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub tick: u64,
    pub phase: RoomPhase,
    pub wave: u32,
    pub time_elapsed: f64,
    pub score: u64,
    pub ship: ShipSnapshot,
    pub enemies: Vec<EnemySnapshot>,
    /// Seat occupancy: session ids for humans, None for bot seats.
    pub seats: Vec<(Seat, Option<SessionId>)>,
    pub offer: Option<Vec<RolledUpgrade>>,
    /// Seconds until the next scheduled swap warning, if rotation is active.
    pub swap_countdown: Option<f64>,
}

impl RoomSnapshot {
    pub fn from_room_state(state: &RoomState, swap_countdown: Option<f64>) -> Self {
        let now = state.now();
        Self {
            tick: state.tick,
            phase: state.phase,
            wave: state.wave,
            time_elapsed: state.time_elapsed,
            score: state.score,
            ship: ShipSnapshot {
                position: state.ship.position,
                velocity: state.ship.velocity,
                hp: state.ship.hp,
                shield: state.ship.shield,
                max_shield: state.ship.max_shield,
                power_actual: state.ship.power.actual,
                power_target: state.ship.power.target,
                instability: state.ship.power.instability,
                heat: state.ship.power.heat,
                overloaded: state.ship.power.overloaded,
                perfect_active: now < state.ship.power.perfect_until,
                vision_radius: state.ship.vision_radius,
            },
            enemies: state
                .enemies
                .iter()
                .map(|e| EnemySnapshot {
                    id: e.id,
                    kind: e.kind,
                    position: e.position,
                    hp: e.hp,
                    telegraphing: e.telegraph_until.is_some_and(|t| now < t),
                    poisoned: e.poisoned_until.is_some_and(|t| now < t),
                    marked: e.is_marked(now),
                })
                .collect(),
            seats: Seat::ALL
                .into_iter()
                .map(|seat| (seat, state.seat_map.occupant(seat)))
                .collect(),
            offer: state.offer.as_ref().map(|o| o.options.clone()),
            swap_countdown,
        }
    }
}

/// Encode a message using bincode.
/// Uses legacy config for fixed-size integers (compatible with external clients)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    bincode::serde::encode_to_vec(message, bincode::config::legacy())
        .map_err(|e| EncodeError(e.to_string()))
}

/// Decode a message using bincode.
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    bincode::serde::decode_from_slice(data, bincode::config::legacy())
        .map(|(msg, _)| msg)
        .map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);
