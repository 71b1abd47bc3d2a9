//! Bot seat controllers
//!
//! Every seat without a live human is driven by a bot. Dispatch goes
//! through a seat-indexed handler table, so adding a behavior is a single
//! registration. Bots draw from the room stream like every other system,
//! keeping the tick fully reproducible.

use crate::game::constants::{combat, enemies, ship};
use crate::game::rng::GameRng;
use crate::game::state::{PowerSplit, RoomState, Seat};
use crate::net::protocol::SeatInput;
use crate::util::vec3::Vec3;

/// One seat's bot brain: reads room state, emits a partial input.
pub type BotHandler = fn(&RoomState, &mut GameRng) -> SeatInput;

/// Seat-indexed handler table.
#[derive(Clone)]
pub struct BotRoster {
    handlers: [BotHandler; Seat::COUNT],
}

impl Default for BotRoster {
    fn default() -> Self {
        Self {
            handlers: [
                pilot_bot,
                gunner_bot,
                power_bot,
                systems_bot,
                support_bot,
            ],
        }
    }
}

impl BotRoster {
    /// Generate this tick's input for a bot-controlled seat.
    pub fn generate(&self, seat: Seat, state: &RoomState, rng: &mut GameRng) -> SeatInput {
        (self.handlers[seat.index()])(state, rng)
    }

    /// Swap in a custom handler for one seat.
    pub fn register(&mut self, seat: Seat, handler: BotHandler) {
        self.handlers[seat.index()] = handler;
    }
}

fn nearest_enemy_offset(state: &RoomState) -> Option<Vec3> {
    state
        .enemies
        .iter()
        .map(|e| e.position - state.ship.position)
        .min_by(|a, b| {
            a.length_sq()
                .partial_cmp(&b.length_sq())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Pilot: follow the tube, stay off the walls, boost on open stretches.
fn pilot_bot(state: &RoomState, rng: &mut GameRng) -> SeatInput {
    let sample = state.cave.nearest(state.ship.position);
    let mut steer = sample.tangent;

    // Pull back toward the centerline when drifting into the wall
    let offset = state.ship.position - sample.point;
    let wall_closeness = offset.length() / sample.radius.max(1e-3);
    if wall_closeness > 0.6 {
        steer = (steer - offset.normalize() * (wall_closeness - 0.6)).normalize();
    }

    let boost = wall_closeness < 0.3 && rng.chance(0.05);
    SeatInput {
        steer: Some(steer),
        boost: Some(boost),
        ..Default::default()
    }
}

/// Gunner: track the nearest enemy, hold fire while one is in range.
fn gunner_bot(state: &RoomState, _rng: &mut GameRng) -> SeatInput {
    match nearest_enemy_offset(state) {
        Some(offset) if !offset.is_zero(1e-6) => SeatInput {
            aim: Some(offset.normalize()),
            fire: Some(offset.length() <= combat::GUN_RANGE),
            ..Default::default()
        },
        _ => SeatInput {
            fire: Some(false),
            ..Default::default()
        },
    }
}

/// Power: pick a preset for the situation - defense when the hull is low,
/// attack when enemies press in, speed otherwise.
fn power_bot(state: &RoomState, _rng: &mut GameRng) -> SeatInput {
    let threatened = nearest_enemy_offset(state)
        .map(|o| o.length() < enemies::SPAWN_RING_MIN)
        .unwrap_or(false);

    let target = if state.ship.hp < ship::MAX_HP * 0.35 {
        PowerSplit::preset("defense")
    } else if threatened {
        PowerSplit::preset("attack")
    } else if state.enemies.is_empty() {
        PowerSplit::preset("speed")
    } else {
        Some(PowerSplit::BALANCED)
    };

    SeatInput {
        power_target: target,
        ..Default::default()
    }
}

/// Systems: shield burst when shields run low, overdrive under pressure.
fn systems_bot(state: &RoomState, _rng: &mut GameRng) -> SeatInput {
    let shields_low = state.ship.shield < state.ship.max_shield * 0.3;
    let pressed = state.enemies.len() >= 8;
    SeatInput {
        shield_boost: Some(shields_low),
        overdrive: Some(pressed),
        ..Default::default()
    }
}

/// Support: scan when anything is unmarked nearby, repair when the hull
/// needs it.
fn support_bot(state: &RoomState, _rng: &mut GameRng) -> SeatInput {
    let now = state.now();
    let unmarked_nearby = state.enemies.iter().any(|e| {
        !e.is_marked(now)
            && e.position.distance_to(state.ship.position) <= state.ship.vision_radius
    });
    SeatInput {
        scan: Some(unmarked_nearby),
        repair: Some(state.ship.hp < ship::MAX_HP * 0.7),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::tests::test_state;
    use crate::game::state::{Enemy, EnemyKind};

    #[test]
    fn test_roster_covers_every_seat() {
        let roster = BotRoster::default();
        let state = test_state();
        let mut rng = GameRng::new(1);
        for seat in Seat::ALL {
            // Every handler produces some input without panicking
            let _ = roster.generate(seat, &state, &mut rng);
        }
    }

    #[test]
    fn test_pilot_bot_steers_along_tube() {
        let state = test_state();
        let mut rng = GameRng::new(2);
        let input = BotRoster::default().generate(Seat::Pilot, &state, &mut rng);
        let steer = input.steer.expect("pilot always steers");
        let tangent = state.cave.nearest(state.ship.position).tangent;
        assert!(steer.dot(tangent) > 0.5);
    }

    #[test]
    fn test_gunner_bot_fires_in_range() {
        let mut state = test_state();
        let id = state.next_entity_id();
        let pos = state.ship.position + Vec3::new(20.0, 0.0, 0.0);
        state.enemies.push(Enemy::new(id, EnemyKind::Chaser, pos));

        let mut rng = GameRng::new(3);
        let input = BotRoster::default().generate(Seat::Gunner, &state, &mut rng);
        assert_eq!(input.fire, Some(true));
        assert!(input.aim.unwrap().dot(Vec3::X) > 0.9);
    }

    #[test]
    fn test_gunner_bot_holds_fire_out_of_range() {
        let mut state = test_state();
        let id = state.next_entity_id();
        let pos = state.ship.position + Vec3::new(combat::GUN_RANGE * 3.0, 0.0, 0.0);
        state.enemies.push(Enemy::new(id, EnemyKind::Chaser, pos));

        let mut rng = GameRng::new(4);
        let input = BotRoster::default().generate(Seat::Gunner, &state, &mut rng);
        assert_eq!(input.fire, Some(false));
    }

    #[test]
    fn test_power_bot_defends_when_hull_low() {
        let mut state = test_state();
        state.ship.hp = 20.0;
        let mut rng = GameRng::new(5);
        let input = BotRoster::default().generate(Seat::Power, &state, &mut rng);
        assert_eq!(input.power_target, PowerSplit::preset("defense"));
    }

    #[test]
    fn test_support_bot_repairs_low_hull() {
        let mut state = test_state();
        state.ship.hp = 40.0;
        let mut rng = GameRng::new(6);
        let input = BotRoster::default().generate(Seat::Support, &state, &mut rng);
        assert_eq!(input.repair, Some(true));
    }

    #[test]
    fn test_register_replaces_handler() {
        fn idle(_: &RoomState, _: &mut GameRng) -> SeatInput {
            SeatInput::default()
        }
        let mut roster = BotRoster::default();
        roster.register(Seat::Pilot, idle);
        let state = test_state();
        let mut rng = GameRng::new(7);
        let input = roster.generate(Seat::Pilot, &state, &mut rng);
        assert!(input.steer.is_none());
    }
}
