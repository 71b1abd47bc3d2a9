//! Cross-seat combo detection
//!
//! Tracks the last occurrence of a fixed set of seat actions and checks a
//! rule table every tick. A rule is satisfied when every action it lists
//! happened within its window; a satisfied rule applies its named temporary
//! ship buff. Rules are independent - several can fire on the same tick and
//! none disables another. A rule re-fires only when a newer action arrives,
//! so a stale pair of timestamps cannot extend a buff forever.

use serde::{Deserialize, Serialize};

use crate::game::state::ShipBuffs;

/// Seat actions the detector watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatAction {
    MarkedKill,
    SupportScan,
    SystemsOverdrive,
    PilotBoost,
    PowerEngineShift,
    PerfectRepair,
    SystemsShield,
}

impl SeatAction {
    pub const COUNT: usize = 7;

    pub fn index(&self) -> usize {
        match self {
            SeatAction::MarkedKill => 0,
            SeatAction::SupportScan => 1,
            SeatAction::SystemsOverdrive => 2,
            SeatAction::PilotBoost => 3,
            SeatAction::PowerEngineShift => 4,
            SeatAction::PerfectRepair => 5,
            SeatAction::SystemsShield => 6,
        }
    }
}

/// Buff a satisfied rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboBuff {
    DamageSurge,
    Slipstream,
    HullRegen,
    Overclock,
}

#[derive(Debug, Clone, Copy)]
pub struct ComboRule {
    pub id: &'static str,
    pub actions: &'static [SeatAction],
    /// All listed actions must fall within this many seconds of each other.
    pub window: f64,
    pub buff: ComboBuff,
    pub duration: f64,
}

pub const COMBO_RULES: &[ComboRule] = &[
    ComboRule {
        id: "focus-fire",
        actions: &[SeatAction::MarkedKill, SeatAction::SupportScan],
        window: 1.0,
        buff: ComboBuff::DamageSurge,
        duration: 4.0,
    },
    ComboRule {
        id: "slipstream",
        actions: &[SeatAction::PilotBoost, SeatAction::PowerEngineShift],
        window: 0.5,
        buff: ComboBuff::Slipstream,
        duration: 3.0,
    },
    ComboRule {
        id: "field-mend",
        actions: &[SeatAction::PerfectRepair, SeatAction::SystemsShield],
        window: 0.8,
        buff: ComboBuff::HullRegen,
        duration: 5.0,
    },
    ComboRule {
        id: "overclock",
        actions: &[SeatAction::SystemsOverdrive, SeatAction::PowerEngineShift],
        window: 0.6,
        buff: ComboBuff::Overclock,
        duration: 4.0,
    },
];

/// Action timestamps plus per-rule re-fire bookkeeping.
#[derive(Debug, Clone)]
pub struct ComboState {
    last_action: [f64; SeatAction::COUNT],
    last_fired: [f64; COMBO_RULES.len()],
}

impl Default for ComboState {
    fn default() -> Self {
        Self {
            last_action: [f64::NEG_INFINITY; SeatAction::COUNT],
            last_fired: [f64::NEG_INFINITY; COMBO_RULES.len()],
        }
    }
}

impl ComboState {
    pub fn record(&mut self, action: SeatAction, now: f64) {
        self.last_action[action.index()] = now;
    }

    pub fn last(&self, action: SeatAction) -> f64 {
        self.last_action[action.index()]
    }

    /// Evaluate every rule and apply buffs for the satisfied ones.
    /// Returns the ids of rules that fired this tick.
    pub fn evaluate(&mut self, buffs: &mut ShipBuffs, now: f64) -> Vec<&'static str> {
        let mut fired = Vec::new();

        for (i, rule) in COMBO_RULES.iter().enumerate() {
            let times: Vec<f64> = rule
                .actions
                .iter()
                .map(|a| self.last_action[a.index()])
                .collect();
            let newest = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let oldest = times.iter().cloned().fold(f64::INFINITY, f64::min);

            let satisfied = oldest.is_finite() && newest - oldest <= rule.window;
            // Only a new action occurrence can re-fire a rule
            if satisfied && newest > self.last_fired[i] {
                self.last_fired[i] = newest;
                apply_buff(buffs, rule.buff, now + rule.duration);
                fired.push(rule.id);
            }
        }

        fired
    }
}

fn apply_buff(buffs: &mut ShipBuffs, buff: ComboBuff, until: f64) {
    let slot = match buff {
        ComboBuff::DamageSurge => &mut buffs.damage_surge_until,
        ComboBuff::Slipstream => &mut buffs.slipstream_until,
        ComboBuff::HullRegen => &mut buffs.hull_regen_until,
        ComboBuff::Overclock => &mut buffs.overclock_until,
    };
    *slot = slot.max(until);
}
