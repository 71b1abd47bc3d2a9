//! Room state definitions and structures
//!
//! Contains the ship, enemies, seat mapping and per-run procedural state for
//! one room. Behavior lives in `systems/*`; this module is data plus small
//! invariant-preserving accessors.

// Allow dead_code for utility methods that are part of the public API
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::game::cave::CavePath;
use crate::game::constants::{enemies, ship, ticking, upgrades};
use crate::loot::roll::{RolledUpgrade, RolledWeapon};
use crate::util::vec3::Vec3;

/// Unique session identifier (assigned by the transport layer)
pub type SessionId = Uuid;

/// Entity identifier for enemies and projectiles. Monotonically allocated,
/// never reused, so stale references can only miss, not alias.
pub type EntityId = u64;

/// One of the five fixed crew roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    Pilot,
    Gunner,
    Power,
    Systems,
    Support,
}

impl Seat {
    pub const COUNT: usize = 5;
    pub const ALL: [Seat; 5] = [Seat::Pilot, Seat::Gunner, Seat::Power, Seat::Systems, Seat::Support];

    pub fn index(&self) -> usize {
        match self {
            Seat::Pilot => 0,
            Seat::Gunner => 1,
            Seat::Power => 2,
            Seat::Systems => 3,
            Seat::Support => 4,
        }
    }

    pub fn from_index(index: usize) -> Seat {
        Seat::ALL[index % Seat::COUNT]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Seat::Pilot => "pilot",
            Seat::Gunner => "gunner",
            Seat::Power => "power",
            Seat::Systems => "systems",
            Seat::Support => "support",
        }
    }
}

/// Session-to-seat mapping. Injective: a session holds at most one seat and
/// a seat holds at most one session. Seats without a session are bot-driven.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeatMap {
    seats: [Option<SessionId>; Seat::COUNT],
}

impl SeatMap {
    /// Assign a seat: the preferred seat if free, else the lowest-index free
    /// seat, else seat 0. Never fails. A session already seated keeps its
    /// seat.
    pub fn assign(&mut self, session: SessionId, preferred: Option<Seat>) -> Seat {
        if let Some(current) = self.seat_of(session) {
            return current;
        }
        if let Some(seat) = preferred {
            if self.seats[seat.index()].is_none() {
                self.seats[seat.index()] = Some(session);
                return seat;
            }
        }
        for seat in Seat::ALL {
            if self.seats[seat.index()].is_none() {
                self.seats[seat.index()] = Some(session);
                return seat;
            }
        }
        self.seats[0] = Some(session);
        Seat::Pilot
    }

    pub fn release(&mut self, session: SessionId) -> Option<Seat> {
        for seat in Seat::ALL {
            if self.seats[seat.index()] == Some(session) {
                self.seats[seat.index()] = None;
                return Some(seat);
            }
        }
        None
    }

    pub fn seat_of(&self, session: SessionId) -> Option<Seat> {
        Seat::ALL
            .into_iter()
            .find(|seat| self.seats[seat.index()] == Some(session))
    }

    pub fn occupant(&self, seat: Seat) -> Option<SessionId> {
        self.seats[seat.index()]
    }

    pub fn is_human(&self, seat: Seat) -> bool {
        self.seats[seat.index()].is_some()
    }

    pub fn human_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    /// Occupied seats in seat order.
    pub fn human_seats(&self) -> SmallVec<[(Seat, SessionId); 5]> {
        Seat::ALL
            .into_iter()
            .filter_map(|seat| self.seats[seat.index()].map(|s| (seat, s)))
            .collect()
    }

    /// Replace the whole mapping. Used by the swap scheduler after it has
    /// computed a permutation.
    pub fn set_assignments(&mut self, seats: [Option<SessionId>; Seat::COUNT]) {
        self.seats = seats;
    }

    pub fn assignments(&self) -> &[Option<SessionId>; Seat::COUNT] {
        &self.seats
    }
}

/// Room lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomPhase {
    Lobby,
    Running,
    Ended,
}

impl Default for RoomPhase {
    fn default() -> Self {
        Self::Lobby
    }
}

/// Room occupancy/rotation mode, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomMode {
    /// Up to five humans, rotation active.
    Crew,
    /// One human crewing alone with bots, no rotation.
    Solo,
    /// One human, single-seat experience, no rotation.
    Single,
}

impl RoomMode {
    pub fn max_humans(&self) -> usize {
        match self {
            RoomMode::Crew => Seat::COUNT,
            RoomMode::Solo | RoomMode::Single => 1,
        }
    }

    pub fn rotation_enabled(&self) -> bool {
        matches!(self, RoomMode::Crew)
    }
}

/// Normalized power distribution across the three banks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSplit {
    pub engines: f32,
    pub weapons: f32,
    pub shields: f32,
}

impl PowerSplit {
    pub const BALANCED: PowerSplit = PowerSplit { engines: 1.0 / 3.0, weapons: 1.0 / 3.0, shields: 1.0 / 3.0 };

    pub fn new(engines: f32, weapons: f32, shields: f32) -> Self {
        let mut split = Self { engines, weapons, shields };
        split.normalize();
        split
    }

    /// Named presets selectable from the power seat.
    pub fn preset(name: &str) -> Option<PowerSplit> {
        match name {
            "balanced" => Some(Self::BALANCED),
            "attack" => Some(PowerSplit { engines: 0.2, weapons: 0.6, shields: 0.2 }),
            "speed" => Some(PowerSplit { engines: 0.6, weapons: 0.2, shields: 0.2 }),
            "defense" => Some(PowerSplit { engines: 0.2, weapons: 0.2, shields: 0.6 }),
            _ => None,
        }
    }

    /// Clamp negatives to zero and rescale to sum 1. Degenerate inputs
    /// (all zero, NaN) fall back to the balanced split rather than faulting.
    pub fn normalize(&mut self) {
        self.engines = if self.engines.is_finite() { self.engines.max(0.0) } else { 0.0 };
        self.weapons = if self.weapons.is_finite() { self.weapons.max(0.0) } else { 0.0 };
        self.shields = if self.shields.is_finite() { self.shields.max(0.0) } else { 0.0 };
        let sum = self.engines + self.weapons + self.shields;
        if sum <= f32::EPSILON {
            *self = Self::BALANCED;
        } else {
            self.engines /= sum;
            self.weapons /= sum;
            self.shields /= sum;
        }
    }

    pub fn sum(&self) -> f32 {
        self.engines + self.weapons + self.shields
    }

    /// L1 distance between two splits; the significant-shift metric.
    pub fn l1_distance(&self, other: &PowerSplit) -> f32 {
        (self.engines - other.engines).abs()
            + (self.weapons - other.weapons).abs()
            + (self.shields - other.shields).abs()
    }
}

impl Default for PowerSplit {
    fn default() -> Self {
        Self::BALANCED
    }
}

/// Power rhythm state: target/actual banks plus the timing-window fields.
/// Mutated only by `systems::power`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerRhythm {
    pub target: PowerSplit,
    pub actual: PowerSplit,
    /// Non-negative accumulator; decays over time.
    pub instability: f32,
    /// Non-negative accumulator; decays over time.
    pub heat: f32,
    /// Open perfect-follow-up window as (start, end) in room time.
    pub window: Option<(f64, f64)>,
    /// Shift magnitude that opened the current window.
    pub pending_magnitude: f32,
    /// Performance buff granted by a perfect follow-up.
    pub perfect_until: f64,
    pub overloaded: bool,
}

impl Default for PowerRhythm {
    fn default() -> Self {
        Self {
            target: PowerSplit::BALANCED,
            actual: PowerSplit::BALANCED,
            instability: 0.0,
            heat: 0.0,
            window: None,
            pending_magnitude: 0.0,
            perfect_until: 0.0,
            overloaded: false,
        }
    }
}

/// Expiry timestamps for temporary combo buffs. A buff is active while its
/// expiry exceeds the room clock.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ShipBuffs {
    pub damage_surge_until: f64,
    pub slipstream_until: f64,
    pub hull_regen_until: f64,
    pub overclock_until: f64,
}

/// The crew's ship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub position: Vec3,
    pub velocity: Vec3,
    pub heading: Vec3,
    pub hp: f32,
    pub shield: f32,
    pub max_shield: f32,
    pub power: PowerRhythm,
    pub buffs: ShipBuffs,
    pub vision_radius: f32,
    /// Room time of the last wall-contact damage application.
    pub last_wall_hit: f64,
    /// Room time the gunner's weapon is ready again.
    pub gun_ready_at: f64,
    /// Room time the support scan is ready again.
    pub scan_ready_at: f64,
    /// Room time the support repair is ready again.
    pub repair_ready_at: f64,
    /// Room time the systems shield burst is ready again.
    pub shield_ready_at: f64,
}

impl Ship {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            heading: Vec3::X,
            hp: ship::MAX_HP,
            shield: ship::BASE_MAX_SHIELD,
            max_shield: ship::BASE_MAX_SHIELD,
            power: PowerRhythm::default(),
            buffs: ShipBuffs::default(),
            vision_radius: ship::BASE_VISION_RADIUS,
            last_wall_hit: f64::NEG_INFINITY,
            gun_ready_at: 0.0,
            scan_ready_at: 0.0,
            repair_ready_at: 0.0,
            shield_ready_at: 0.0,
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn is_destroyed(&self) -> bool {
        self.hp <= 0.0
    }

    /// Apply damage to shields first, hull for the remainder.
    pub fn apply_damage(&mut self, amount: f32) {
        let absorbed = amount.min(self.shield);
        self.shield -= absorbed;
        self.hp = (self.hp - (amount - absorbed)).max(0.0);
    }
}

/// Per-seat accumulated numeric modifiers. Additive and monotonic: applying
/// an upgrade only ever increases a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeatBonus {
    pub speed: f32,
    pub damage: f32,
    pub shield: f32,
    pub cooldown: f32,
    pub vision: f32,
    pub swap_surge_duration: f32,
}

impl SeatBonus {
    pub fn apply(&mut self, kind: crate::loot::catalog::BonusKind, magnitude: f32) {
        use crate::loot::catalog::BonusKind;
        let magnitude = magnitude.max(0.0);
        match kind {
            BonusKind::Speed => self.speed += magnitude,
            BonusKind::Damage => self.damage += magnitude,
            BonusKind::Shield => self.shield += magnitude,
            BonusKind::Cooldown => self.cooldown += magnitude,
            BonusKind::Vision => self.vision += magnitude,
            BonusKind::SwapSurgeDuration => self.swap_surge_duration += magnitude,
        }
    }
}

/// All five seats' bonuses plus crew-wide sums.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeatBonuses {
    seats: [SeatBonus; Seat::COUNT],
}

impl SeatBonuses {
    pub fn seat(&self, seat: Seat) -> &SeatBonus {
        &self.seats[seat.index()]
    }

    pub fn seat_mut(&mut self, seat: Seat) -> &mut SeatBonus {
        &mut self.seats[seat.index()]
    }

    pub fn total_speed(&self) -> f32 {
        self.seats.iter().map(|b| b.speed).sum()
    }

    pub fn total_damage(&self) -> f32 {
        self.seats.iter().map(|b| b.damage).sum()
    }

    pub fn total_shield(&self) -> f32 {
        self.seats.iter().map(|b| b.shield).sum()
    }

    pub fn total_cooldown(&self) -> f32 {
        self.seats.iter().map(|b| b.cooldown).sum()
    }

    pub fn total_vision(&self) -> f32 {
        self.seats.iter().map(|b| b.vision).sum()
    }

    pub fn total_swap_surge(&self) -> f32 {
        self.seats.iter().map(|b| b.swap_surge_duration).sum()
    }
}

/// Enemy behavior archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Chaser,
    Runner,
    Spitter,
    Lurker,
    Brute,
    Swarm,
    BossDreadmaw,
    BossHollowKing,
}

/// Static per-kind stats.
#[derive(Debug, Clone, Copy)]
pub struct EnemySpec {
    pub speed: f32,
    pub hp: f32,
    pub damage: f32,
    pub score: u64,
    /// Spawn-table weight. Bosses are not in the regular table.
    pub weight: f32,
    /// Detonates on contact instead of surviving it.
    pub self_destructs: bool,
    /// Seconds between ranged shots; 0 = melee only.
    pub fire_cooldown: f64,
}

impl EnemyKind {
    /// Kinds eligible for the weighted regular spawn draw.
    pub const REGULAR: [EnemyKind; 6] = [
        EnemyKind::Chaser,
        EnemyKind::Runner,
        EnemyKind::Spitter,
        EnemyKind::Lurker,
        EnemyKind::Brute,
        EnemyKind::Swarm,
    ];

    pub const BOSSES: [EnemyKind; 2] = [EnemyKind::BossDreadmaw, EnemyKind::BossHollowKing];

    pub fn spec(&self) -> &'static EnemySpec {
        match self {
            EnemyKind::Chaser => &EnemySpec { speed: 14.0, hp: 20.0, damage: 8.0, score: 10, weight: 12.0, self_destructs: false, fire_cooldown: 0.0 },
            EnemyKind::Runner => &EnemySpec { speed: 22.0, hp: 10.0, damage: 5.0, score: 8, weight: 8.0, self_destructs: false, fire_cooldown: 0.0 },
            EnemyKind::Spitter => &EnemySpec { speed: 10.0, hp: 14.0, damage: 6.0, score: 12, weight: 7.0, self_destructs: false, fire_cooldown: 2.5 },
            EnemyKind::Lurker => &EnemySpec { speed: 6.0, hp: 26.0, damage: 10.0, score: 14, weight: 5.0, self_destructs: false, fire_cooldown: 0.0 },
            EnemyKind::Brute => &EnemySpec { speed: 8.0, hp: 60.0, damage: 16.0, score: 20, weight: 4.0, self_destructs: false, fire_cooldown: 0.0 },
            EnemyKind::Swarm => &EnemySpec { speed: 18.0, hp: 4.0, damage: 4.0, score: 5, weight: 10.0, self_destructs: true, fire_cooldown: 0.0 },
            EnemyKind::BossDreadmaw => &EnemySpec { speed: 7.0, hp: 400.0, damage: 20.0, score: 150, weight: 0.0, self_destructs: false, fire_cooldown: 0.0 },
            EnemyKind::BossHollowKing => &EnemySpec { speed: 6.0, hp: 500.0, damage: 24.0, score: 200, weight: 0.0, self_destructs: false, fire_cooldown: 0.0 },
        }
    }

    pub fn is_boss(&self) -> bool {
        matches!(self, EnemyKind::BossDreadmaw | EnemyKind::BossHollowKing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnemyKind::Chaser => "chaser",
            EnemyKind::Runner => "runner",
            EnemyKind::Spitter => "spitter",
            EnemyKind::Lurker => "lurker",
            EnemyKind::Brute => "brute",
            EnemyKind::Swarm => "swarm",
            EnemyKind::BossDreadmaw => "boss-dreadmaw",
            EnemyKind::BossHollowKing => "boss-hollow-king",
        }
    }
}

/// A live enemy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EntityId,
    pub kind: EnemyKind,
    pub position: Vec3,
    pub hp: f32,
    /// Boss only: volley may not fire before this room time.
    pub telegraph_until: Option<f64>,
    /// Boss only: earliest room time the next telegraph may arm.
    pub next_volley_at: f64,
    /// Ranged kinds: earliest room time of the next shot.
    pub next_fire_at: f64,
    /// Earliest room time the next contact hit can land.
    pub next_contact_at: f64,
    pub poisoned_until: Option<f64>,
    pub poison_dps: f32,
    /// Support scan mark; kills while marked count as marked-kills.
    pub marked_until: Option<f64>,
}

impl Enemy {
    pub fn new(id: EntityId, kind: EnemyKind, position: Vec3) -> Self {
        Self {
            id,
            kind,
            position,
            hp: kind.spec().hp,
            telegraph_until: None,
            next_volley_at: 0.0,
            next_fire_at: 0.0,
            next_contact_at: 0.0,
            poisoned_until: None,
            poison_dps: 0.0,
            marked_until: None,
        }
    }

    pub fn is_marked(&self, now: f64) -> bool {
        self.marked_until.is_some_and(|t| now < t)
    }
}

/// An in-flight enemy projectile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyProjectile {
    pub id: EntityId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub damage: f32,
    pub expires_at: f64,
}

/// Pending upgrade offer: exactly three distinct rolled upgrades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeChoice {
    pub offered_at: f64,
    pub options: Vec<RolledUpgrade>,
}

/// Complete simulation state for one room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomState {
    pub phase: RoomPhase,
    pub tick: u64,
    pub wave: u32,
    /// Room-local clock in seconds; every timing window uses this.
    pub time_elapsed: f64,
    pub score: u64,
    pub ship: Ship,
    pub enemies: Vec<Enemy>,
    pub projectiles: Vec<EnemyProjectile>,
    pub seat_map: SeatMap,
    pub bonuses: SeatBonuses,
    pub offer: Option<UpgradeChoice>,
    pub next_offer_at: f64,
    pub next_spawn_at: f64,
    pub cave: CavePath,
    /// The run's rolled primary weapon; drives gunner fire.
    pub weapon: RolledWeapon,
    next_entity_id: EntityId,
}

impl RoomState {
    pub fn new(cave: CavePath, weapon: RolledWeapon) -> Self {
        let start = cave.start();
        Self {
            phase: RoomPhase::Lobby,
            tick: 0,
            wave: 1,
            time_elapsed: 0.0,
            score: 0,
            ship: Ship::new(start),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            seat_map: SeatMap::default(),
            bonuses: SeatBonuses::default(),
            offer: None,
            next_offer_at: upgrades::OFFER_INTERVAL,
            next_spawn_at: enemies::BASE_SPAWN_INTERVAL,
            cave,
            weapon,
            next_entity_id: 1,
        }
    }

    /// Current room time.
    pub fn now(&self) -> f64 {
        self.time_elapsed
    }

    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    pub fn get_enemy(&self, id: EntityId) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn get_enemy_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }

    pub fn boss_telegraph_active(&self) -> bool {
        let now = self.now();
        self.enemies
            .iter()
            .any(|e| e.kind.is_boss() && e.telegraph_until.is_some_and(|t| now < t))
    }

    pub fn advance_clock(&mut self) {
        self.tick += 1;
        self.time_elapsed += ticking::DT;
    }

    /// Reset for a fresh run after ship destruction. Seat assignment, seat
    /// bonuses, the cave and the rolled weapon persist with the room.
    pub fn reset_run(&mut self) {
        let now = self.now();
        self.wave = 1;
        self.score = 0;
        self.enemies.clear();
        self.projectiles.clear();
        self.offer = None;
        self.ship = Ship::new(self.cave.start());
        self.next_offer_at = now + upgrades::OFFER_INTERVAL;
        self.next_spawn_at = now + enemies::BASE_SPAWN_INTERVAL;
    }
}
