//! Static generation catalogs
//!
//! Everything the roller draws from lives here as plain const tables:
//! weapon archetypes, mods (grouped so one roll never stacks two mods of the
//! same group), infusions, quirks, rarity tiers, and upgrade definitions.
//! Tables are data, not behavior - the roller in `roll.rs` interprets them.

use serde::{Deserialize, Serialize};

/// Categorical label attached to weapons/upgrades. Gates mod eligibility and
/// feeds synergy detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    Kinetic,
    Beam,
    Shock,
    Ember,
    Venom,
    Frost,
    Aoe,
    Dot,
    Pierce,
    Crit,
    Rapid,
    Heavy,
    Support,
    Engine,
    Shield,
}

impl Tag {
    /// Fixed iteration order for deterministic tallies.
    pub const ALL: [Tag; 15] = [
        Tag::Kinetic,
        Tag::Beam,
        Tag::Shock,
        Tag::Ember,
        Tag::Venom,
        Tag::Frost,
        Tag::Aoe,
        Tag::Dot,
        Tag::Pierce,
        Tag::Crit,
        Tag::Rapid,
        Tag::Heavy,
        Tag::Support,
        Tag::Engine,
        Tag::Shield,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Kinetic => "kinetic",
            Tag::Beam => "beam",
            Tag::Shock => "shock",
            Tag::Ember => "ember",
            Tag::Venom => "venom",
            Tag::Frost => "frost",
            Tag::Aoe => "aoe",
            Tag::Dot => "dot",
            Tag::Pierce => "pierce",
            Tag::Crit => "crit",
            Tag::Rapid => "rapid",
            Tag::Heavy => "heavy",
            Tag::Support => "support",
            Tag::Engine => "engine",
            Tag::Shield => "shield",
        }
    }

    pub fn index(&self) -> usize {
        Tag::ALL.iter().position(|t| t == self).unwrap_or(0)
    }
}

/// Rarity tier of a rolled artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

/// Per-tier generation parameters.
#[derive(Debug, Clone, Copy)]
pub struct RarityTier {
    pub rarity: Rarity,
    pub weight: f32,
    /// Number of independent mods applied at this tier.
    pub affixes: usize,
    pub infusion_chance: f32,
    pub quirk_chance: f32,
    /// Scales upgrade magnitudes and weapon base stats.
    pub potency: f32,
}

pub const RARITY_TABLE: [RarityTier; 5] = [
    RarityTier { rarity: Rarity::Common, weight: 50.0, affixes: 0, infusion_chance: 0.0, quirk_chance: 0.0, potency: 1.0 },
    RarityTier { rarity: Rarity::Uncommon, weight: 30.0, affixes: 1, infusion_chance: 0.10, quirk_chance: 0.05, potency: 1.15 },
    RarityTier { rarity: Rarity::Rare, weight: 13.0, affixes: 2, infusion_chance: 0.25, quirk_chance: 0.12, potency: 1.35 },
    RarityTier { rarity: Rarity::Epic, weight: 6.0, affixes: 3, infusion_chance: 0.50, quirk_chance: 0.25, potency: 1.6 },
    RarityTier { rarity: Rarity::Legendary, weight: 1.0, affixes: 4, infusion_chance: 0.80, quirk_chance: 0.50, potency: 2.0 },
];

impl Rarity {
    pub fn tier(&self) -> &'static RarityTier {
        &RARITY_TABLE[*self as usize]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

/// Raw weapon stat block. All fields are clamped to valid ranges after mods
/// are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub damage: f32,
    /// Shots per second.
    pub fire_rate: f32,
    pub projectile_speed: f32,
    pub crit_chance: f32,
    pub crit_mult: f32,
    pub aoe_radius: f32,
    pub dot_dps: f32,
    pub dot_duration: f32,
    pub spread: f32,
}

/// Multiplicative/additive stat adjustment carried by mods, infusions and
/// quirks. Multipliers default to 1, adds to 0.
#[derive(Debug, Clone, Copy)]
pub struct StatDelta {
    pub damage_mult: f32,
    pub fire_rate_mult: f32,
    pub projectile_speed_mult: f32,
    pub crit_chance_add: f32,
    pub crit_mult_add: f32,
    pub aoe_add: f32,
    pub dot_dps_add: f32,
    pub dot_duration_add: f32,
    pub spread_mult: f32,
}

impl StatDelta {
    pub const NONE: StatDelta = StatDelta {
        damage_mult: 1.0,
        fire_rate_mult: 1.0,
        projectile_speed_mult: 1.0,
        crit_chance_add: 0.0,
        crit_mult_add: 0.0,
        aoe_add: 0.0,
        dot_dps_add: 0.0,
        dot_duration_add: 0.0,
        spread_mult: 1.0,
    };

    pub fn apply(&self, stats: &mut WeaponStats) {
        stats.damage *= self.damage_mult;
        stats.fire_rate *= self.fire_rate_mult;
        stats.projectile_speed *= self.projectile_speed_mult;
        stats.crit_chance += self.crit_chance_add;
        stats.crit_mult += self.crit_mult_add;
        stats.aoe_radius += self.aoe_add;
        stats.dot_dps += self.dot_dps_add;
        stats.dot_duration += self.dot_duration_add;
        stats.spread *= self.spread_mult;
    }
}

/// Base weapon family a roll starts from.
#[derive(Debug, Clone, Copy)]
pub struct WeaponArchetype {
    pub id: &'static str,
    pub display_name: &'static str,
    pub tags: &'static [Tag],
    pub base: WeaponStats,
    pub weight: f32,
}

pub const WEAPON_ARCHETYPES: &[WeaponArchetype] = &[
    WeaponArchetype {
        id: "autocannon",
        display_name: "Autocannon",
        tags: &[Tag::Kinetic, Tag::Rapid],
        base: WeaponStats { damage: 6.0, fire_rate: 5.0, projectile_speed: 220.0, crit_chance: 0.05, crit_mult: 1.5, aoe_radius: 0.0, dot_dps: 0.0, dot_duration: 0.0, spread: 0.06 },
        weight: 12.0,
    },
    WeaponArchetype {
        id: "scattergun",
        display_name: "Scattergun",
        tags: &[Tag::Kinetic, Tag::Heavy],
        base: WeaponStats { damage: 20.0, fire_rate: 1.2, projectile_speed: 160.0, crit_chance: 0.05, crit_mult: 1.5, aoe_radius: 2.0, dot_dps: 0.0, dot_duration: 0.0, spread: 0.30 },
        weight: 10.0,
    },
    WeaponArchetype {
        id: "arc-caster",
        display_name: "Arc Caster",
        tags: &[Tag::Shock, Tag::Beam],
        base: WeaponStats { damage: 9.0, fire_rate: 2.6, projectile_speed: 400.0, crit_chance: 0.08, crit_mult: 1.6, aoe_radius: 0.0, dot_dps: 0.0, dot_duration: 0.0, spread: 0.02 },
        weight: 9.0,
    },
    WeaponArchetype {
        id: "ember-lance",
        display_name: "Ember Lance",
        tags: &[Tag::Ember, Tag::Beam, Tag::Dot],
        base: WeaponStats { damage: 7.0, fire_rate: 2.0, projectile_speed: 380.0, crit_chance: 0.04, crit_mult: 1.4, aoe_radius: 0.0, dot_dps: 4.0, dot_duration: 2.5, spread: 0.02 },
        weight: 8.0,
    },
    WeaponArchetype {
        id: "venom-thrower",
        display_name: "Venom Thrower",
        tags: &[Tag::Venom, Tag::Dot, Tag::Aoe],
        base: WeaponStats { damage: 4.0, fire_rate: 3.0, projectile_speed: 120.0, crit_chance: 0.02, crit_mult: 1.3, aoe_radius: 4.0, dot_dps: 6.0, dot_duration: 3.0, spread: 0.18 },
        weight: 7.0,
    },
    WeaponArchetype {
        id: "rail-spike",
        display_name: "Rail Spike",
        tags: &[Tag::Kinetic, Tag::Pierce, Tag::Heavy],
        base: WeaponStats { damage: 42.0, fire_rate: 0.5, projectile_speed: 600.0, crit_chance: 0.15, crit_mult: 2.2, aoe_radius: 0.0, dot_dps: 0.0, dot_duration: 0.0, spread: 0.0 },
        weight: 7.0,
    },
    WeaponArchetype {
        id: "pulse-array",
        display_name: "Pulse Array",
        tags: &[Tag::Shock, Tag::Aoe, Tag::Rapid],
        base: WeaponStats { damage: 5.0, fire_rate: 4.0, projectile_speed: 250.0, crit_chance: 0.03, crit_mult: 1.4, aoe_radius: 3.0, dot_dps: 0.0, dot_duration: 0.0, spread: 0.12 },
        weight: 8.0,
    },
    WeaponArchetype {
        id: "cryo-projector",
        display_name: "Cryo Projector",
        tags: &[Tag::Frost, Tag::Support],
        base: WeaponStats { damage: 6.0, fire_rate: 2.2, projectile_speed: 180.0, crit_chance: 0.04, crit_mult: 1.4, aoe_radius: 2.5, dot_dps: 1.0, dot_duration: 2.0, spread: 0.10 },
        weight: 6.0,
    },
];

/// Independent modifier applied `rarity.affixes` times. One roll never takes
/// two mods of the same group.
#[derive(Debug, Clone, Copy)]
pub struct WeaponMod {
    pub id: &'static str,
    pub group: &'static str,
    /// Name fragment placed before the archetype name.
    pub prefix: Option<&'static str>,
    /// Name fragment composed as "of {suffix}" after the archetype name.
    pub suffix: Option<&'static str>,
    /// Tags that must already be present on the weapon.
    pub requires_tags: &'static [Tag],
    /// Tags that must not be present.
    pub forbids_tags: &'static [Tag],
    pub adds_tags: &'static [Tag],
    pub delta: StatDelta,
    pub weight: f32,
}

pub const WEAPON_MODS: &[WeaponMod] = &[
    WeaponMod {
        id: "honed",
        group: "damage",
        prefix: Some("Honed"),
        suffix: None,
        requires_tags: &[],
        forbids_tags: &[],
        adds_tags: &[],
        delta: StatDelta { damage_mult: 1.2, ..StatDelta::NONE },
        weight: 10.0,
    },
    WeaponMod {
        id: "brutal",
        group: "damage",
        prefix: Some("Brutal"),
        suffix: None,
        requires_tags: &[Tag::Heavy],
        forbids_tags: &[],
        adds_tags: &[],
        delta: StatDelta { damage_mult: 1.45, fire_rate_mult: 0.9, ..StatDelta::NONE },
        weight: 5.0,
    },
    WeaponMod {
        id: "cycled",
        group: "rate",
        prefix: None,
        suffix: Some("Cycling"),
        requires_tags: &[],
        forbids_tags: &[Tag::Heavy],
        adds_tags: &[Tag::Rapid],
        delta: StatDelta { fire_rate_mult: 1.3, damage_mult: 0.95, ..StatDelta::NONE },
        weight: 8.0,
    },
    WeaponMod {
        id: "overwound",
        group: "rate",
        prefix: Some("Overwound"),
        suffix: None,
        requires_tags: &[Tag::Rapid],
        forbids_tags: &[],
        adds_tags: &[],
        delta: StatDelta { fire_rate_mult: 1.5, spread_mult: 1.2, ..StatDelta::NONE },
        weight: 4.0,
    },
    WeaponMod {
        id: "keen",
        group: "crit",
        prefix: Some("Keen"),
        suffix: None,
        requires_tags: &[],
        forbids_tags: &[],
        adds_tags: &[Tag::Crit],
        delta: StatDelta { crit_chance_add: 0.08, ..StatDelta::NONE },
        weight: 8.0,
    },
    WeaponMod {
        id: "executioner",
        group: "crit",
        prefix: None,
        suffix: Some("Execution"),
        requires_tags: &[Tag::Pierce],
        forbids_tags: &[],
        adds_tags: &[Tag::Crit],
        delta: StatDelta { crit_mult_add: 0.6, ..StatDelta::NONE },
        weight: 4.0,
    },
    WeaponMod {
        id: "bursting",
        group: "aoe",
        prefix: Some("Bursting"),
        suffix: None,
        requires_tags: &[],
        forbids_tags: &[Tag::Pierce],
        adds_tags: &[Tag::Aoe],
        delta: StatDelta { aoe_add: 2.5, damage_mult: 0.95, ..StatDelta::NONE },
        weight: 7.0,
    },
    WeaponMod {
        id: "shaped-charge",
        group: "aoe",
        prefix: None,
        suffix: Some("the Breach"),
        requires_tags: &[Tag::Aoe],
        forbids_tags: &[],
        adds_tags: &[],
        delta: StatDelta { aoe_add: 4.0, ..StatDelta::NONE },
        weight: 4.0,
    },
    WeaponMod {
        id: "smoldering",
        group: "dot",
        prefix: Some("Smoldering"),
        suffix: None,
        requires_tags: &[Tag::Ember],
        forbids_tags: &[],
        adds_tags: &[Tag::Dot],
        delta: StatDelta { dot_dps_add: 3.0, dot_duration_add: 1.0, ..StatDelta::NONE },
        weight: 6.0,
    },
    WeaponMod {
        id: "festering",
        group: "dot",
        prefix: Some("Festering"),
        suffix: None,
        requires_tags: &[Tag::Venom],
        forbids_tags: &[],
        adds_tags: &[Tag::Dot],
        delta: StatDelta { dot_dps_add: 4.0, dot_duration_add: 2.0, ..StatDelta::NONE },
        weight: 6.0,
    },
    WeaponMod {
        id: "lingering",
        group: "dot",
        prefix: None,
        suffix: Some("Lingering Harm"),
        requires_tags: &[Tag::Dot],
        forbids_tags: &[],
        adds_tags: &[],
        delta: StatDelta { dot_duration_add: 2.5, ..StatDelta::NONE },
        weight: 5.0,
    },
    WeaponMod {
        id: "stabilized",
        group: "handling",
        prefix: Some("Stabilized"),
        suffix: None,
        requires_tags: &[],
        forbids_tags: &[],
        adds_tags: &[],
        delta: StatDelta { spread_mult: 0.5, projectile_speed_mult: 1.1, ..StatDelta::NONE },
        weight: 8.0,
    },
    WeaponMod {
        id: "accelerated",
        group: "handling",
        prefix: None,
        suffix: Some("Swiftness"),
        requires_tags: &[],
        forbids_tags: &[Tag::Beam],
        adds_tags: &[],
        delta: StatDelta { projectile_speed_mult: 1.4, ..StatDelta::NONE },
        weight: 6.0,
    },
    WeaponMod {
        id: "arcing",
        group: "conduction",
        prefix: Some("Arcing"),
        suffix: None,
        requires_tags: &[Tag::Shock],
        forbids_tags: &[],
        adds_tags: &[Tag::Aoe],
        delta: StatDelta { aoe_add: 2.0, damage_mult: 1.1, ..StatDelta::NONE },
        weight: 5.0,
    },
];

/// Large thematic modifier. At most one per weapon, rolled before affixes.
#[derive(Debug, Clone, Copy)]
pub struct Infusion {
    pub id: &'static str,
    pub prefix: &'static str,
    pub adds_tags: &'static [Tag],
    pub delta: StatDelta,
    pub weight: f32,
}

pub const INFUSIONS: &[Infusion] = &[
    Infusion {
        id: "arc-welded",
        prefix: "Arc-Welded",
        adds_tags: &[Tag::Shock],
        delta: StatDelta { damage_mult: 1.15, crit_chance_add: 0.03, ..StatDelta::NONE },
        weight: 8.0,
    },
    Infusion {
        id: "ember-forged",
        prefix: "Ember-Forged",
        adds_tags: &[Tag::Ember, Tag::Dot],
        delta: StatDelta { dot_dps_add: 3.5, dot_duration_add: 1.5, ..StatDelta::NONE },
        weight: 8.0,
    },
    Infusion {
        id: "venom-steeped",
        prefix: "Venom-Steeped",
        adds_tags: &[Tag::Venom, Tag::Dot],
        delta: StatDelta { dot_dps_add: 4.5, damage_mult: 0.95, dot_duration_add: 1.0, ..StatDelta::NONE },
        weight: 7.0,
    },
    Infusion {
        id: "hollow-core",
        prefix: "Hollow-Core",
        adds_tags: &[Tag::Pierce],
        delta: StatDelta { damage_mult: 1.25, fire_rate_mult: 0.9, ..StatDelta::NONE },
        weight: 6.0,
    },
    Infusion {
        id: "gale-tuned",
        prefix: "Gale-Tuned",
        adds_tags: &[Tag::Rapid],
        delta: StatDelta { fire_rate_mult: 1.35, damage_mult: 0.9, ..StatDelta::NONE },
        weight: 6.0,
    },
];

/// Flavor modifier with a small mechanical twist, gated by rarity.
#[derive(Debug, Clone, Copy)]
pub struct Quirk {
    pub id: &'static str,
    pub prefix: &'static str,
    pub adds_tags: &'static [Tag],
    pub delta: StatDelta,
    pub weight: f32,
}

pub const QUIRKS: &[Quirk] = &[
    Quirk {
        id: "volatile",
        prefix: "Volatile",
        adds_tags: &[],
        delta: StatDelta { damage_mult: 1.25, spread_mult: 1.3, ..StatDelta::NONE },
        weight: 6.0,
    },
    Quirk {
        id: "lucky",
        prefix: "Lucky",
        adds_tags: &[Tag::Crit],
        delta: StatDelta { crit_chance_add: 0.05, ..StatDelta::NONE },
        weight: 6.0,
    },
    Quirk {
        id: "patient",
        prefix: "Patient",
        adds_tags: &[],
        delta: StatDelta { fire_rate_mult: 0.85, damage_mult: 1.3, ..StatDelta::NONE },
        weight: 5.0,
    },
    Quirk {
        id: "hungry",
        prefix: "Hungry",
        adds_tags: &[],
        delta: StatDelta { fire_rate_mult: 1.2, crit_mult_add: -0.1, ..StatDelta::NONE },
        weight: 5.0,
    },
    Quirk {
        id: "echoing",
        prefix: "Echoing",
        adds_tags: &[Tag::Aoe],
        delta: StatDelta { aoe_add: 1.5, ..StatDelta::NONE },
        weight: 4.0,
    },
    Quirk {
        id: "stubborn",
        prefix: "Stubborn",
        adds_tags: &[],
        delta: StatDelta { spread_mult: 0.7, projectile_speed_mult: 0.9, ..StatDelta::NONE },
        weight: 4.0,
    },
];

/// Which `SeatBonus` field an upgrade feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BonusKind {
    Speed,
    Damage,
    Shield,
    Cooldown,
    Vision,
    SwapSurgeDuration,
}

/// Seat an upgrade's modifier lands on.
pub use crate::game::state::Seat;

/// Upgrade definition. Magnitude scales with rolled rarity potency.
#[derive(Debug, Clone, Copy)]
pub struct UpgradeDef {
    pub id: &'static str,
    pub display_name: &'static str,
    pub seat: Seat,
    pub kind: BonusKind,
    pub base_magnitude: f32,
    pub tags: &'static [Tag],
    pub weight: f32,
}

pub const UPGRADE_DEFS: &[UpgradeDef] = &[
    UpgradeDef { id: "thruster-overdrive", display_name: "Thruster Overdrive", seat: Seat::Pilot, kind: BonusKind::Speed, base_magnitude: 0.08, tags: &[Tag::Engine], weight: 10.0 },
    UpgradeDef { id: "inertial-trim", display_name: "Inertial Trim", seat: Seat::Pilot, kind: BonusKind::Speed, base_magnitude: 0.05, tags: &[Tag::Engine, Tag::Support], weight: 8.0 },
    UpgradeDef { id: "focusing-coils", display_name: "Focusing Coils", seat: Seat::Gunner, kind: BonusKind::Damage, base_magnitude: 0.10, tags: &[Tag::Crit], weight: 10.0 },
    UpgradeDef { id: "mass-driver-rails", display_name: "Mass Driver Rails", seat: Seat::Gunner, kind: BonusKind::Damage, base_magnitude: 0.14, tags: &[Tag::Kinetic, Tag::Heavy], weight: 6.0 },
    UpgradeDef { id: "coolant-loop", display_name: "Coolant Loop", seat: Seat::Gunner, kind: BonusKind::Cooldown, base_magnitude: 0.08, tags: &[Tag::Frost], weight: 8.0 },
    UpgradeDef { id: "barrier-lattice", display_name: "Barrier Lattice", seat: Seat::Systems, kind: BonusKind::Shield, base_magnitude: 0.12, tags: &[Tag::Shield], weight: 10.0 },
    UpgradeDef { id: "harmonic-dampers", display_name: "Harmonic Dampers", seat: Seat::Systems, kind: BonusKind::Cooldown, base_magnitude: 0.06, tags: &[Tag::Shield, Tag::Support], weight: 7.0 },
    UpgradeDef { id: "surge-capacitor", display_name: "Surge Capacitor", seat: Seat::Power, kind: BonusKind::SwapSurgeDuration, base_magnitude: 0.5, tags: &[Tag::Shock, Tag::Engine], weight: 7.0 },
    UpgradeDef { id: "flux-regulator", display_name: "Flux Regulator", seat: Seat::Power, kind: BonusKind::Cooldown, base_magnitude: 0.07, tags: &[Tag::Shock], weight: 8.0 },
    UpgradeDef { id: "wide-spectrum-lens", display_name: "Wide Spectrum Lens", seat: Seat::Support, kind: BonusKind::Vision, base_magnitude: 0.15, tags: &[Tag::Support], weight: 9.0 },
    UpgradeDef { id: "triage-protocols", display_name: "Triage Protocols", seat: Seat::Support, kind: BonusKind::Shield, base_magnitude: 0.08, tags: &[Tag::Support, Tag::Shield], weight: 7.0 },
    UpgradeDef { id: "afterburner-feed", display_name: "Afterburner Feed", seat: Seat::Power, kind: BonusKind::Speed, base_magnitude: 0.06, tags: &[Tag::Engine, Tag::Ember], weight: 6.0 },
];

pub fn upgrade_def(id: &str) -> Option<&'static UpgradeDef> {
    UPGRADE_DEFS.iter().find(|d| d.id == id)
}
