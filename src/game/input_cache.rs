//! Input path: lock-free channel plus per-seat latest-value cache
//!
//! Connection handlers push partial `SeatInput` payloads without blocking;
//! the room loop drains the channel once per tick and merges each payload
//! into the cache field-by-field. The cache is last-write-wins, not a queue:
//! only the newest value per field matters to the simulation.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::game::constants::net::INPUT_CHANNEL_CAPACITY;
use crate::game::state::{PowerSplit, Seat, SessionId};
use crate::net::protocol::SeatInput;
use crate::util::vec3::Vec3;

/// Input message from a session's connection handler.
#[derive(Debug, Clone)]
pub struct InputMessage {
    pub session: SessionId,
    pub input: SeatInput,
}

/// Lock-free bounded channel feeding one room's tick loop.
pub struct InputBuffer {
    sender: Sender<InputMessage>,
    receiver: Receiver<InputMessage>,
    capacity: usize,
}

impl InputBuffer {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver, capacity }
    }

    /// Clonable sender handle for a connection.
    pub fn sender(&self) -> InputSender {
        InputSender { sender: self.sender.clone() }
    }

    /// Drain all pending inputs for this tick.
    pub fn drain(&self) -> Vec<InputMessage> {
        self.receiver.try_iter().collect()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new(INPUT_CHANNEL_CAPACITY)
    }
}

/// Clonable sender handle for connection handlers.
#[derive(Clone)]
pub struct InputSender {
    sender: Sender<InputMessage>,
}

impl InputSender {
    /// Submit an input (non-blocking). A full buffer drops the payload;
    /// a newer one is already on its way at client input rates.
    #[inline]
    pub fn try_send(&self, session: SessionId, input: SeatInput) -> Result<(), InputSendError> {
        self.sender
            .try_send(InputMessage { session, input })
            .map_err(|e| match e {
                TrySendError::Full(_) => InputSendError::Full,
                TrySendError::Disconnected(_) => InputSendError::Disconnected,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InputSendError {
    #[error("input buffer full")]
    Full,
    #[error("room loop stopped")]
    Disconnected,
}

/// Resolved control state for one seat. Unlike `SeatInput` every field is
/// concrete; merging a partial payload only overwrites the fields it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatControls {
    pub steer: Vec3,
    pub boost: bool,
    pub aim: Vec3,
    pub fire: bool,
    pub power_target: PowerSplit,
    pub overdrive: bool,
    pub shield_boost: bool,
    pub scan: bool,
    pub repair: bool,
}

impl Default for SeatControls {
    fn default() -> Self {
        Self {
            steer: Vec3::ZERO,
            boost: false,
            aim: Vec3::X,
            fire: false,
            power_target: PowerSplit::BALANCED,
            overdrive: false,
            shield_boost: false,
            scan: false,
            repair: false,
        }
    }
}

impl SeatControls {
    /// Merge a partial payload. Missing fields retain their cached values;
    /// present fields are sanitized before adoption.
    pub fn merge(&mut self, input: &SeatInput) {
        if let Some(steer) = input.steer {
            // Reject non-finite vectors outright; normalize oversized ones.
            if steer.x.is_finite() && steer.y.is_finite() && steer.z.is_finite() {
                self.steer = steer.clamp_length(1.0);
            }
        }
        if let Some(boost) = input.boost {
            self.boost = boost;
        }
        if let Some(aim) = input.aim {
            if aim.x.is_finite() && aim.y.is_finite() && aim.z.is_finite() && !aim.is_zero(1e-6) {
                self.aim = aim.normalize();
            }
        }
        if let Some(fire) = input.fire {
            self.fire = fire;
        }
        // Preset wins over a raw target when both are present.
        if let Some(preset) = input.power_preset.as_deref().and_then(PowerSplit::preset) {
            self.power_target = preset;
        } else if let Some(mut target) = input.power_target {
            target.normalize();
            self.power_target = target;
        }
        if let Some(overdrive) = input.overdrive {
            self.overdrive = overdrive;
        }
        if let Some(shield_boost) = input.shield_boost {
            self.shield_boost = shield_boost;
        }
        if let Some(scan) = input.scan {
            self.scan = scan;
        }
        if let Some(repair) = input.repair {
            self.repair = repair;
        }
    }
}

/// Per-seat latest-value cache read synchronously once per tick.
#[derive(Debug, Clone, Default)]
pub struct SeatInputCache {
    seats: [SeatControls; Seat::COUNT],
}

impl SeatInputCache {
    pub fn merge(&mut self, seat: Seat, input: &SeatInput) {
        self.seats[seat.index()].merge(input);
    }

    pub fn controls(&self, seat: Seat) -> &SeatControls {
        &self.seats[seat.index()]
    }

    /// Reset one seat to defaults. Used when control of a seat changes
    /// hands so the new occupant doesn't inherit a held boost or trigger.
    pub fn reset_seat(&mut self, seat: Seat) {
        self.seats[seat.index()] = SeatControls::default();
    }
}
