//! Procedural loot and upgrade generation
//!
//! Pure, seed-deterministic: every artifact is a function of `(seed,
//! options)` with no hidden state, which is what lets clients re-derive and
//! verify drops. Catalogs are static data; rolling interprets them.

pub mod catalog;
pub mod roll;
pub mod synergy;

pub use catalog::{BonusKind, Rarity, Tag, WeaponStats};
pub use roll::{roll_upgrade, roll_upgrade_choices, roll_weapon, RolledUpgrade, RolledWeapon, WeaponRollOptions};
pub use synergy::{active_synergies, generate_run_loadout, RunLoadout, TagTally};
