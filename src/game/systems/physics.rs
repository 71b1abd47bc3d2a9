//! Ship physics
//!
//! Integrates pilot input into velocity and position, confines the ship to
//! the cave tube, and runs shield/hull regeneration. Thrust and the speed
//! ceiling scale with effective engine power and accumulated seat bonuses;
//! wall contact reflects velocity along the surface and applies fixed
//! damage on a cooldown so sustained scraping cannot melt the hull.

use crate::game::constants::{combat, ship};
use crate::game::input_cache::SeatControls;
use crate::game::state::RoomState;
use crate::game::systems::power;
use crate::util::vec3::Vec3;

/// What happened this tick, for events and the combo feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicsUpdate {
    /// Wall-contact damage was applied.
    pub wall_hit: bool,
    /// The pilot was boosting with thrust applied.
    pub boosting: bool,
}

/// Integrate one tick of ship motion.
///
/// `damage_mult` is the scheduler's damage-reduction multiplier;
/// `movement_assist` blends steering toward the local cave tangent during
/// the post-swap grace window.
pub fn update(
    state: &mut RoomState,
    pilot: &SeatControls,
    damage_mult: f32,
    movement_assist: bool,
    dt: f32,
) -> PhysicsUpdate {
    let now = state.now();
    let mut result = PhysicsUpdate::default();

    let effective = power::effective(&state.ship.power, now);
    let speed_bonus = state.bonuses.total_speed();
    let shield_bonus = state.bonuses.total_shield();
    let vision_bonus = state.bonuses.total_vision();

    // Thrust scaled by engine bank and speed bonuses
    let engine_mult = 0.5 + effective.engines;
    let accel = ship::BASE_ACCEL * engine_mult * (1.0 + speed_bonus);
    let mut steer = pilot.steer.clamp_length(1.0);

    if movement_assist && !steer.is_zero(1e-6) {
        // Blend raw steering toward the tube direction so a freshly swapped
        // pilot doesn't immediately plow into a wall.
        let tangent = state.cave.nearest(state.ship.position).tangent;
        let along = if steer.dot(tangent) >= 0.0 { tangent } else { -tangent };
        steer = (steer * 0.5 + along * 0.5).normalize() * steer.length();
    }

    if !steer.is_zero(1e-6) {
        state.ship.velocity += steer * accel * dt;
        if pilot.boost {
            result.boosting = true;
        }
    }

    // Exponential drag
    state.ship.velocity *= (-ship::DRAG * dt).exp();

    // Boost-dependent speed ceiling
    let mut max_speed = ship::BASE_MAX_SPEED * (0.5 + effective.engines) * (1.0 + speed_bonus);
    if pilot.boost {
        max_speed *= ship::BOOST_MULTIPLIER;
    }
    if now < state.ship.buffs.slipstream_until {
        max_speed *= 1.2;
    }
    state.ship.velocity = state.ship.velocity.clamp_length(max_speed);

    // Integrate and confine to the tube
    let raw = state.ship.position + state.ship.velocity * dt;
    let clamped = state.cave.clamp(raw);
    state.ship.position = clamped.position;

    if clamped.was_clamped {
        // Only reflect when still moving into the wall; gliding along the
        // surface keeps its tangential velocity.
        let into_wall = state.ship.velocity.dot(clamped.normal);
        if into_wall > 0.0 {
            state.ship.velocity = state.ship.velocity.reflect(clamped.normal)
                * combat::WALL_BOUNCE_DAMPING;
        }
        if now - state.ship.last_wall_hit >= combat::WALL_HIT_COOLDOWN {
            state.ship.apply_damage(combat::WALL_DAMAGE * damage_mult);
            state.ship.last_wall_hit = now;
            result.wall_hit = true;
        }
    }

    if state.ship.speed() > 1e-3 {
        state.ship.heading = state.ship.velocity.normalize();
    }

    // Shield capacity tracks the accumulated bonus; regen tracks the
    // shields bank
    state.ship.max_shield = ship::BASE_MAX_SHIELD * (1.0 + shield_bonus);
    state.ship.shield = (state.ship.shield
        + ship::SHIELD_REGEN_RATE * effective.shields * dt)
        .min(state.ship.max_shield);

    if now < state.ship.buffs.hull_regen_until {
        state.ship.hp = (state.ship.hp + ship::HULL_REGEN_RATE * dt).min(ship::MAX_HP);
    }

    state.ship.vision_radius = ship::BASE_VISION_RADIUS * (1.0 + vision_bonus);

    result
}
