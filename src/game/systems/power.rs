//! Power-distribution rhythm
//!
//! The power seat plays a timing game: a significant redistribution opens a
//! short follow-up window, and landing the next significant shift inside it
//! vents instability and heat and grants a brief performance buff. Missing
//! the window charges both accumulators instead. Actual bank levels ease
//! toward the target; high instability slows the response, and an overload
//! clamps effective output.

use crate::game::constants::power::*;
use crate::game::state::{PowerRhythm, PowerSplit};

/// What a target application did, for the combo feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShiftOutcome {
    /// L1 distance from the previous target exceeded the threshold.
    pub significant: bool,
    /// The shift landed inside an open follow-up window.
    pub perfect: bool,
    /// The shift raised the engine bank's share.
    pub engines_increased: bool,
}

/// Apply a requested power target. The request is renormalized before the
/// shift metric is computed. Under movement assist (post-swap grace) shifts
/// never open a window, so a disoriented new occupant is not penalized.
pub fn apply_target(
    rhythm: &mut PowerRhythm,
    requested: PowerSplit,
    now: f64,
    movement_assist: bool,
) -> ShiftOutcome {
    let mut requested = requested;
    requested.normalize();

    let magnitude = requested.l1_distance(&rhythm.target);
    let mut outcome = ShiftOutcome::default();

    if magnitude > SIGNIFICANT_SHIFT {
        outcome.significant = true;
        outcome.engines_increased = requested.engines > rhythm.target.engines + f32::EPSILON;

        match rhythm.window {
            Some((start, end)) if now >= start && now <= end => {
                // Perfect follow-up: vent the accumulators and grant the buff.
                outcome.perfect = true;
                rhythm.instability *= PERFECT_RELIEF;
                rhythm.heat *= PERFECT_RELIEF;
                rhythm.perfect_until = now + PERFECT_BUFF_DURATION;
                rhythm.window = None;
                rhythm.pending_magnitude = 0.0;
            }
            Some((start, _)) if now < start => {
                // Too early: the replaced window can no longer be followed
                // up, so its penalty lands now, and the new shift re-arms.
                rhythm.instability += rhythm.pending_magnitude * MISS_INSTABILITY_GAIN;
                rhythm.heat += rhythm.pending_magnitude * MISS_HEAT_GAIN;
                rhythm.window = None;
                rhythm.pending_magnitude = 0.0;
                if !movement_assist {
                    open_window(rhythm, now, magnitude);
                }
            }
            _ => {
                if !movement_assist {
                    open_window(rhythm, now, magnitude);
                }
            }
        }
    }

    rhythm.target = requested;
    outcome
}

fn open_window(rhythm: &mut PowerRhythm, now: f64, magnitude: f32) {
    rhythm.window = Some((now + WINDOW_OPEN_DELAY, now + WINDOW_CLOSE_DELAY));
    rhythm.pending_magnitude = magnitude;
}

/// Per-tick rhythm update: expire missed windows, decay the accumulators,
/// refresh the overload flag and ease actual levels toward the target.
/// The actual split is renormalized every tick so floating-point drift can
/// never break the sum-to-one invariant.
pub fn update(rhythm: &mut PowerRhythm, now: f64, dt: f32) {
    if let Some((_, end)) = rhythm.window {
        if now > end {
            rhythm.instability += rhythm.pending_magnitude * MISS_INSTABILITY_GAIN;
            rhythm.heat += rhythm.pending_magnitude * MISS_HEAT_GAIN;
            rhythm.window = None;
            rhythm.pending_magnitude = 0.0;
        }
    }

    let decay = (-DECAY_RATE * dt).exp();
    rhythm.instability *= decay;
    rhythm.heat *= decay;

    rhythm.overloaded =
        rhythm.instability > OVERLOAD_THRESHOLD || rhythm.heat > OVERLOAD_THRESHOLD;

    // Ease rate drops as instability rises; an overload slows it further.
    let mut rate = EASE_RATE / (1.0 + rhythm.instability);
    if rhythm.overloaded {
        rate *= OVERLOAD_CLAMP;
    }
    let t = 1.0 - (-rate * dt).exp();
    rhythm.actual.engines += (rhythm.target.engines - rhythm.actual.engines) * t;
    rhythm.actual.weapons += (rhythm.target.weapons - rhythm.actual.weapons) * t;
    rhythm.actual.shields += (rhythm.target.shields - rhythm.actual.shields) * t;
    rhythm.actual.normalize();
}

/// Effective bank output: actual levels, clamped while overloaded and
/// slightly boosted during a perfect-shift buff. Not renormalized - these
/// are output levels, not a distribution.
pub fn effective(rhythm: &PowerRhythm, now: f64) -> PowerSplit {
    let mut eff = rhythm.actual;
    if rhythm.overloaded {
        eff.engines = eff.engines.min(OVERLOAD_CLAMP);
        eff.weapons = eff.weapons.min(OVERLOAD_CLAMP);
        eff.shields = eff.shields.min(OVERLOAD_CLAMP);
    }
    if now < rhythm.perfect_until {
        eff.engines = (eff.engines * 1.15).min(1.0);
        eff.weapons = (eff.weapons * 1.15).min(1.0);
        eff.shields = (eff.shields * 1.15).min(1.0);
    }
    eff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::ticking::DT;

    fn attack() -> PowerSplit {
        PowerSplit::preset("attack").unwrap()
    }

    fn speed() -> PowerSplit {
        PowerSplit::preset("speed").unwrap()
    }

    #[test]
    fn test_significant_shift_opens_window() {
        let mut rhythm = PowerRhythm::default();
        let outcome = apply_target(&mut rhythm, attack(), 0.0, false);
        assert!(outcome.significant);
        assert!(!outcome.perfect);
        let (start, end) = rhythm.window.expect("window open");
        assert!((start - WINDOW_OPEN_DELAY).abs() < 1e-9);
        assert!((end - WINDOW_CLOSE_DELAY).abs() < 1e-9);
    }

    #[test]
    fn test_small_shift_is_ignored() {
        let mut rhythm = PowerRhythm::default();
        let nudged = PowerSplit::new(0.35, 0.33, 0.32);
        let outcome = apply_target(&mut rhythm, nudged, 0.0, false);
        assert!(!outcome.significant);
        assert!(rhythm.window.is_none());
    }

    #[test]
    fn test_perfect_follow_up_scenario() {
        // Preset `attack` at t=0 opens a window ~[0.12, 0.5]; preset `speed`
        // at t=0.15 lands inside it.
        let mut rhythm = PowerRhythm::default();
        apply_target(&mut rhythm, attack(), 0.0, false);
        let (window_start, _) = rhythm.window.unwrap();

        let outcome = apply_target(&mut rhythm, speed(), 0.15, false);
        assert!(outcome.perfect);
        assert!(rhythm.perfect_until > window_start);
        assert!(rhythm.window.is_none());
    }

    #[test]
    fn test_missed_window_charges_accumulators() {
        let mut rhythm = PowerRhythm::default();
        apply_target(&mut rhythm, attack(), 0.0, false);
        assert_eq!(rhythm.instability, 0.0);

        // Step past the window close without a follow-up
        let mut now = 0.0;
        while now < 0.6 {
            now += DT;
            update(&mut rhythm, now, DT as f32);
        }
        assert!(rhythm.window.is_none());
        assert!(rhythm.instability > 0.0);
        assert!(rhythm.heat > 0.0);
    }

    #[test]
    fn test_perfect_reduces_accumulators() {
        let mut rhythm = PowerRhythm::default();
        rhythm.instability = 0.8;
        rhythm.heat = 0.8;
        apply_target(&mut rhythm, attack(), 0.0, false);
        apply_target(&mut rhythm, speed(), 0.2, false);
        assert!(rhythm.instability < 0.8 * PERFECT_RELIEF + 1e-6);
        assert!(rhythm.heat < 0.8 * PERFECT_RELIEF + 1e-6);
    }

    #[test]
    fn test_assist_suppresses_window() {
        let mut rhythm = PowerRhythm::default();
        let outcome = apply_target(&mut rhythm, attack(), 0.0, true);
        assert!(outcome.significant);
        assert!(rhythm.window.is_none());
    }

    #[test]
    fn test_too_early_follow_up_penalized_and_rearmed() {
        let mut rhythm = PowerRhythm::default();
        apply_target(&mut rhythm, attack(), 0.0, false);
        // Follow up before the window opens
        let outcome = apply_target(&mut rhythm, speed(), 0.05, false);
        assert!(!outcome.perfect);
        assert!(rhythm.instability > 0.0);
        // New window armed from the early shift
        let (start, _) = rhythm.window.unwrap();
        assert!((start - (0.05 + WINDOW_OPEN_DELAY)).abs() < 1e-9);
    }

    #[test]
    fn test_overload_threshold_and_clamp() {
        let mut rhythm = PowerRhythm::default();
        rhythm.instability = OVERLOAD_THRESHOLD + 0.5;
        update(&mut rhythm, 0.0, 0.001);
        assert!(rhythm.overloaded);

        rhythm.actual = PowerSplit::new(0.7, 0.2, 0.1);
        let eff = effective(&rhythm, 100.0);
        assert!(eff.engines <= OVERLOAD_CLAMP + 1e-6);
    }

    #[test]
    fn test_power_sum_invariant_over_many_ticks() {
        let mut rhythm = PowerRhythm::default();
        let mut now = 0.0;
        let targets = [attack(), speed(), PowerSplit::preset("defense").unwrap()];
        for i in 0..2000 {
            if i % 37 == 0 {
                apply_target(&mut rhythm, targets[(i / 37) % 3], now, false);
            }
            now += DT;
            update(&mut rhythm, now, DT as f32);
            assert!(
                (rhythm.actual.sum() - 1.0).abs() < 1e-6,
                "sum drifted at tick {}: {}",
                i,
                rhythm.actual.sum()
            );
        }
    }

    #[test]
    fn test_accumulators_decay() {
        let mut rhythm = PowerRhythm::default();
        rhythm.instability = 0.5;
        rhythm.heat = 0.5;
        for i in 0..200 {
            update(&mut rhythm, i as f64 * DT, DT as f32);
        }
        assert!(rhythm.instability < 0.05);
        assert!(rhythm.heat < 0.05);
    }

    #[test]
    fn test_actual_eases_toward_target() {
        let mut rhythm = PowerRhythm::default();
        apply_target(&mut rhythm, attack(), 0.0, false);
        for i in 0..100 {
            update(&mut rhythm, i as f64 * DT, DT as f32);
        }
        assert!(rhythm.actual.l1_distance(&attack()) < 0.05);
    }
}
