//! Seat rotation scheduler
//!
//! Crew rooms periodically shuffle human sessions across seats:
//! `Idle -> Warning -> Swapped -> Grace -> Idle`. The warning-to-swap
//! transition is gated on ship speed and boss telegraphs; an unsafe moment
//! defers the swap by re-arming the warning rather than erroring, so a swap
//! always eventually resolves.

use smallvec::SmallVec;

use crate::game::constants::swap::*;
use crate::game::rng::GameRng;
use crate::game::state::{Seat, SeatMap, SessionId};

/// Scheduler phase with its deadline in room time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwapPhase {
    /// Counting down to the next warning.
    Idle { swap_at: f64 },
    /// Warning issued; swap fires at the deadline if safe.
    Warning { swap_at: f64 },
    /// Post-swap reorientation window.
    Grace { until: f64 },
}

/// Events the scheduler emitted this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SwapEvent {
    Warning { swap_at: f64 },
    /// Unsafe at the deadline; countdown re-armed.
    Deferred { swap_at: f64 },
    Completed { assignments: Vec<(SessionId, Seat)> },
    GraceEnded,
}

#[derive(Debug, Clone)]
pub struct SwapScheduler {
    pub phase: SwapPhase,
    enabled: bool,
}

impl SwapScheduler {
    /// Rotation is only armed in crew mode; a disabled scheduler never
    /// leaves Idle.
    pub fn new(enabled: bool, rng: &mut GameRng, now: f64) -> Self {
        Self {
            phase: SwapPhase::Idle { swap_at: now + roll_idle_target(rng) },
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Incoming damage multiplier: reduced while a swap is pending or the
    /// crew is reorienting.
    pub fn damage_multiplier(&self) -> f32 {
        match self.phase {
            SwapPhase::Idle { .. } => 1.0,
            SwapPhase::Warning { .. } | SwapPhase::Grace { .. } => DAMAGE_REDUCTION,
        }
    }

    /// Movement assist is active during the post-swap grace window.
    pub fn movement_assist(&self) -> bool {
        matches!(self.phase, SwapPhase::Grace { .. })
    }

    /// Seconds until the pending swap fires, if one is scheduled.
    pub fn countdown(&self, now: f64) -> Option<f64> {
        if !self.enabled {
            return None;
        }
        match self.phase {
            SwapPhase::Idle { swap_at } | SwapPhase::Warning { swap_at } => {
                Some((swap_at - now).max(0.0))
            }
            SwapPhase::Grace { .. } => None,
        }
    }

    /// Advance the state machine one tick.
    ///
    /// `surge_bonus` extends the grace window (the swap-surge-duration seat
    /// bonus). The gate check happens at the instant of the scheduled
    /// transition: over-speed or an active boss telegraph re-arms the
    /// warning with a fresh fixed countdown, unbounded retries.
    pub fn update(
        &mut self,
        seat_map: &mut SeatMap,
        ship_speed: f32,
        boss_telegraph: bool,
        now: f64,
        rng: &mut GameRng,
        surge_bonus: f64,
    ) -> SmallVec<[SwapEvent; 2]> {
        let mut events = SmallVec::new();
        if !self.enabled {
            return events;
        }

        match self.phase {
            SwapPhase::Idle { swap_at } if now >= swap_at => {
                let deadline = now + WARNING_DURATION;
                self.phase = SwapPhase::Warning { swap_at: deadline };
                events.push(SwapEvent::Warning { swap_at: deadline });
            }
            SwapPhase::Warning { swap_at } if now >= swap_at => {
                if ship_speed > SAFE_SPEED || boss_telegraph {
                    let deadline = now + WARNING_DURATION;
                    self.phase = SwapPhase::Warning { swap_at: deadline };
                    events.push(SwapEvent::Deferred { swap_at: deadline });
                } else {
                    let assignments = perform_swap(seat_map, rng);
                    self.phase = SwapPhase::Grace {
                        until: now + GRACE_DURATION + surge_bonus.max(0.0),
                    };
                    events.push(SwapEvent::Completed { assignments });
                }
            }
            SwapPhase::Grace { until } if now >= until => {
                self.phase = SwapPhase::Idle { swap_at: now + roll_idle_target(rng) };
                events.push(SwapEvent::GraceEnded);
            }
            _ => {}
        }

        events
    }
}

/// Uniform idle target in [IDLE_MIN, IDLE_MAX).
fn roll_idle_target(rng: &mut GameRng) -> f64 {
    rng.range_f64(IDLE_MIN, IDLE_MAX)
}

/// Reassign human sessions across seats.
///
/// With two or more humans, tries up to `PERMUTATION_ATTEMPTS` random
/// permutations of all five seats looking for one where no human keeps
/// their pre-swap seat; best-effort, the last attempt is accepted when the
/// budget runs out. With exactly one human, a uniformly random different
/// seat is chosen. Unassigned seats implicitly fall to bot control.
pub fn perform_swap(seat_map: &mut SeatMap, rng: &mut GameRng) -> Vec<(SessionId, Seat)> {
    let humans = seat_map.human_seats();

    match humans.len() {
        0 => Vec::new(),
        1 => {
            let (seat, session) = humans[0];
            let offset = 1 + rng.pick_index(Seat::COUNT - 1);
            let new_seat = Seat::from_index(seat.index() + offset);
            let mut assignments = [None; Seat::COUNT];
            assignments[new_seat.index()] = Some(session);
            seat_map.set_assignments(assignments);
            vec![(session, new_seat)]
        }
        _ => {
            let mut permutation = [0usize; Seat::COUNT];
            for attempt in 0..PERMUTATION_ATTEMPTS {
                let mut candidate: [usize; Seat::COUNT] = [0, 1, 2, 3, 4];
                rng.shuffle(&mut candidate);
                permutation = candidate;
                let collision_free = humans
                    .iter()
                    .all(|(seat, _)| candidate[seat.index()] != seat.index());
                if collision_free || attempt == PERMUTATION_ATTEMPTS - 1 {
                    break;
                }
            }

            let mut assignments = [None; Seat::COUNT];
            let mut result = Vec::with_capacity(humans.len());
            for (seat, session) in humans {
                let new_seat = Seat::from_index(permutation[seat.index()]);
                assignments[new_seat.index()] = Some(session);
                result.push((session, new_seat));
            }
            seat_map.set_assignments(assignments);
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn seeded() -> GameRng {
        GameRng::new(42)
    }

    #[test]
    fn test_disabled_scheduler_is_inert() {
        let mut rng = seeded();
        let mut scheduler = SwapScheduler::new(false, &mut rng, 0.0);
        let mut map = SeatMap::default();
        map.assign(Uuid::new_v4(), None);
        let events = scheduler.update(&mut map, 0.0, false, 10_000.0, &mut rng, 0.0);
        assert!(events.is_empty());
        assert!(scheduler.countdown(0.0).is_none());
    }

    #[test]
    fn test_idle_target_in_range() {
        let mut rng = seeded();
        for _ in 0..500 {
            let target = roll_idle_target(&mut rng);
            assert!((IDLE_MIN..IDLE_MAX).contains(&target));
        }
    }

    #[test]
    fn test_full_cycle() {
        let mut rng = seeded();
        let mut scheduler = SwapScheduler::new(true, &mut rng, 0.0);
        let mut map = SeatMap::default();
        let session = Uuid::new_v4();
        map.assign(session, Some(Seat::Pilot));

        let warn_at = match scheduler.phase {
            SwapPhase::Idle { swap_at } => swap_at,
            _ => panic!("should start idle"),
        };

        // Reach the idle deadline -> warning
        let events = scheduler.update(&mut map, 0.0, false, warn_at, &mut rng, 0.0);
        assert!(matches!(events[0], SwapEvent::Warning { .. }));
        assert!((scheduler.damage_multiplier() - DAMAGE_REDUCTION).abs() < 1e-6);

        // Reach the warning deadline with a safe ship -> swap + grace
        let events = scheduler.update(
            &mut map,
            0.0,
            false,
            warn_at + WARNING_DURATION,
            &mut rng,
            0.0,
        );
        match &events[0] {
            SwapEvent::Completed { assignments } => {
                assert_eq!(assignments.len(), 1);
                assert_ne!(assignments[0].1, Seat::Pilot);
            }
            other => panic!("expected Completed, got {:?}", other),
        }
        assert!(scheduler.movement_assist());

        // Grace expires -> idle with a fresh target
        let events = scheduler.update(
            &mut map,
            0.0,
            false,
            warn_at + WARNING_DURATION + GRACE_DURATION,
            &mut rng,
            0.0,
        );
        assert!(matches!(events[0], SwapEvent::GraceEnded));
        assert!(matches!(scheduler.phase, SwapPhase::Idle { .. }));
    }

    #[test]
    fn test_swap_deferred_while_fast() {
        let mut rng = seeded();
        let mut scheduler = SwapScheduler::new(true, &mut rng, 0.0);
        let mut map = SeatMap::default();
        map.assign(Uuid::new_v4(), Some(Seat::Pilot));
        scheduler.phase = SwapPhase::Warning { swap_at: 10.0 };

        let events = scheduler.update(&mut map, SAFE_SPEED + 1.0, false, 10.0, &mut rng, 0.0);
        assert!(matches!(events[0], SwapEvent::Deferred { .. }));
        // Still a warning with a re-armed deadline; seat unchanged
        match scheduler.phase {
            SwapPhase::Warning { swap_at } => assert!((swap_at - 13.0).abs() < 1e-9),
            other => panic!("expected Warning, got {:?}", other),
        }
        assert_eq!(map.human_count(), 1);
    }

    #[test]
    fn test_swap_deferred_during_boss_telegraph() {
        let mut rng = seeded();
        let mut scheduler = SwapScheduler::new(true, &mut rng, 0.0);
        let mut map = SeatMap::default();
        let session = Uuid::new_v4();
        map.assign(session, Some(Seat::Gunner));
        scheduler.phase = SwapPhase::Warning { swap_at: 5.0 };

        let events = scheduler.update(&mut map, 0.0, true, 5.0, &mut rng, 0.0);
        assert!(matches!(events[0], SwapEvent::Deferred { .. }));
        assert_eq!(map.seat_of(session), Some(Seat::Gunner));
    }

    #[test]
    fn test_deferred_swap_eventually_resolves() {
        let mut rng = seeded();
        let mut scheduler = SwapScheduler::new(true, &mut rng, 0.0);
        let mut map = SeatMap::default();
        map.assign(Uuid::new_v4(), Some(Seat::Pilot));
        scheduler.phase = SwapPhase::Warning { swap_at: 0.0 };

        // Unsafe for a while, then safe: the retry loop must terminate
        let mut now = 0.0;
        for _ in 0..10 {
            scheduler.update(&mut map, SAFE_SPEED * 2.0, false, now, &mut rng, 0.0);
            now += WARNING_DURATION;
        }
        let events = scheduler.update(&mut map, 0.0, false, now, &mut rng, 0.0);
        assert!(matches!(events[0], SwapEvent::Completed { .. }));
    }

    #[test]
    fn test_single_human_never_keeps_seat() {
        for seed in 0..200 {
            let mut rng = GameRng::new(seed);
            let mut map = SeatMap::default();
            let session = Uuid::new_v4();
            map.assign(session, Some(Seat::Pilot));
            perform_swap(&mut map, &mut rng);
            assert_ne!(map.seat_of(session), Some(Seat::Pilot), "seed {}", seed);
        }
    }

    #[test]
    fn test_multi_human_swap_injective_and_derangement() {
        let mut fixed_points = 0;
        let mut total_humans = 0;
        for seed in 0..100 {
            let mut rng = GameRng::new(seed);
            let mut map = SeatMap::default();
            let sessions: Vec<SessionId> = (0..3).map(|_| Uuid::new_v4()).collect();
            for (i, s) in sessions.iter().enumerate() {
                map.assign(*s, Some(Seat::from_index(i)));
            }
            let before: Vec<(SessionId, Seat)> = sessions
                .iter()
                .map(|s| (*s, map.seat_of(*s).unwrap()))
                .collect();

            perform_swap(&mut map, &mut rng);

            // Injective: all humans still seated, all on distinct seats
            assert_eq!(map.human_count(), 3);
            for (session, old_seat) in &before {
                let new_seat = map.seat_of(*session).expect("still seated");
                total_humans += 1;
                if new_seat == *old_seat {
                    fixed_points += 1;
                }
            }
        }
        // Best-effort derangement: with a 12-attempt budget, keeping a seat
        // should be rare across 300 human swaps
        assert!(
            fixed_points * 20 < total_humans,
            "{} fixed points in {} swaps",
            fixed_points,
            total_humans
        );
    }

    #[test]
    fn test_swap_with_no_humans_is_noop() {
        let mut rng = seeded();
        let mut map = SeatMap::default();
        assert!(perform_swap(&mut map, &mut rng).is_empty());
        assert_eq!(map.human_count(), 0);
    }

    #[test]
    fn test_surge_bonus_extends_grace() {
        let mut rng = seeded();
        let mut scheduler = SwapScheduler::new(true, &mut rng, 0.0);
        let mut map = SeatMap::default();
        map.assign(Uuid::new_v4(), None);
        scheduler.phase = SwapPhase::Warning { swap_at: 0.0 };

        scheduler.update(&mut map, 0.0, false, 0.0, &mut rng, 1.5);
        match scheduler.phase {
            SwapPhase::Grace { until } => {
                assert!((until - (GRACE_DURATION + 1.5)).abs() < 1e-9)
            }
            other => panic!("expected Grace, got {:?}", other),
        }
    }
}
