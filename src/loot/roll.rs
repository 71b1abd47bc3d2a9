//! Weapon and upgrade rolling
//!
//! Pure functions of `(seed, options)`. A roll owns a private seeded stream
//! and draws from the catalogs in a fixed order, so identical inputs always
//! reproduce identical artifacts. Generation has no failure path: weighted
//! picks fall back to uniform, and emptied filtered pools fall back to the
//! unfiltered pool.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::game::rng::GameRng;
use crate::game::state::Seat;
use crate::loot::catalog::{
    BonusKind, Rarity, RarityTier, Tag, UpgradeDef, WeaponStats, INFUSIONS, QUIRKS, RARITY_TABLE,
    UPGRADE_DEFS, WEAPON_ARCHETYPES, WEAPON_MODS,
};

/// Attempts per choice slot before falling back to a catalog scan.
const CHOICE_ATTEMPTS: usize = 16;

/// Optional constraints for a weapon roll.
#[derive(Debug, Clone, Default)]
pub struct WeaponRollOptions {
    /// Force a rarity instead of drawing one.
    pub rarity: Option<Rarity>,
    /// Archetype must carry all of these tags.
    pub required_tags: Vec<Tag>,
    /// Archetype must carry none of these tags.
    pub excluded_tags: Vec<Tag>,
}

/// A fully rolled weapon. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolledWeapon {
    pub id: String,
    pub rarity: Rarity,
    pub archetype_id: String,
    /// Applied part ids in application order: infusion, mods, quirk.
    pub parts: Vec<String>,
    pub tags: Vec<Tag>,
    pub stats: WeaponStats,
    pub name: String,
    pub power_score: f32,
}

impl RolledWeapon {
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }
}

/// A fully rolled upgrade. The id is the catalog definition id, which is what
/// `upgrade:apply` references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolledUpgrade {
    pub id: String,
    pub rarity: Rarity,
    pub seat: Seat,
    pub kind: BonusKind,
    pub magnitude: f32,
    pub tags: Vec<Tag>,
    pub name: String,
    pub power_score: f32,
}

fn roll_rarity(rng: &mut GameRng) -> &'static RarityTier {
    let weights: SmallVec<[f32; 5]> = RARITY_TABLE.iter().map(|t| t.weight).collect();
    &RARITY_TABLE[rng.weighted_index(&weights)]
}

fn push_tags(tags: &mut Vec<Tag>, added: &[Tag]) {
    for tag in added {
        if !tags.contains(tag) {
            tags.push(*tag);
        }
    }
}

fn clamp_stats(stats: &mut WeaponStats) {
    stats.damage = stats.damage.clamp(1.0, 200.0);
    stats.fire_rate = stats.fire_rate.clamp(0.2, 10.0);
    stats.projectile_speed = stats.projectile_speed.clamp(40.0, 900.0);
    stats.crit_chance = stats.crit_chance.clamp(0.0, 0.6);
    stats.crit_mult = stats.crit_mult.clamp(1.0, 4.0);
    stats.aoe_radius = stats.aoe_radius.clamp(0.0, 15.0);
    stats.dot_dps = stats.dot_dps.clamp(0.0, 30.0);
    stats.dot_duration = stats.dot_duration.clamp(0.0, 10.0);
    stats.spread = stats.spread.clamp(0.0, 1.0);
}

/// Heuristic combat-effectiveness rating: DPS adjusted for crit expectation,
/// plus area and damage-over-time contributions.
pub fn power_score(stats: &WeaponStats, tags: &[Tag]) -> f32 {
    let dps = stats.damage * stats.fire_rate;
    let crit_expectation = 1.0 + stats.crit_chance * (stats.crit_mult - 1.0);
    let mut score = dps * crit_expectation;
    score += stats.aoe_radius * 2.0;
    score += stats.dot_dps * stats.dot_duration * 0.8;
    if tags.contains(&Tag::Aoe) {
        score += 6.0;
    }
    if tags.contains(&Tag::Dot) {
        score += 5.0;
    }
    score
}

fn compose_name(
    quirk_prefix: Option<&str>,
    infusion_prefix: Option<&str>,
    mod_prefixes: &[&str],
    archetype_name: &str,
    suffix: Option<&str>,
) -> String {
    let mut name = String::new();
    for part in quirk_prefix
        .into_iter()
        .chain(infusion_prefix)
        .chain(mod_prefixes.iter().copied())
    {
        name.push_str(part);
        name.push(' ');
    }
    name.push_str(archetype_name);
    if let Some(suffix) = suffix {
        name.push_str(" of ");
        name.push_str(suffix);
    }
    name
}

/// Roll a weapon from a seed. Deterministic: identical `(seed, options)`
/// yield structurally identical results.
pub fn roll_weapon(seed: u64, options: &WeaponRollOptions) -> RolledWeapon {
    let mut rng = GameRng::new(seed);

    let tier = match options.rarity {
        Some(rarity) => rarity.tier(),
        None => roll_rarity(&mut rng),
    };

    // Archetype pool filtered by tag constraints; an emptied pool falls back
    // to the full catalog so a roll always lands somewhere.
    let filtered: Vec<usize> = (0..WEAPON_ARCHETYPES.len())
        .filter(|&i| {
            let arch = &WEAPON_ARCHETYPES[i];
            options.required_tags.iter().all(|t| arch.tags.contains(t))
                && !options.excluded_tags.iter().any(|t| arch.tags.contains(t))
        })
        .collect();
    let pool: Vec<usize> = if filtered.is_empty() {
        (0..WEAPON_ARCHETYPES.len()).collect()
    } else {
        filtered
    };
    let weights: Vec<f32> = pool.iter().map(|&i| WEAPON_ARCHETYPES[i].weight).collect();
    let archetype = &WEAPON_ARCHETYPES[pool[rng.weighted_index(&weights)]];

    let mut stats = archetype.base;
    let mut tags: Vec<Tag> = archetype.tags.to_vec();
    let mut parts: Vec<String> = Vec::new();
    let mut mod_prefixes: Vec<&'static str> = Vec::new();
    let mut name_suffix: Option<&'static str> = None;

    // Optional infusion, before affixes so its tags can gate them.
    let mut infusion_prefix = None;
    if rng.chance(tier.infusion_chance) {
        let weights: Vec<f32> = INFUSIONS.iter().map(|inf| inf.weight).collect();
        let infusion = &INFUSIONS[rng.weighted_index(&weights)];
        infusion.delta.apply(&mut stats);
        push_tags(&mut tags, infusion.adds_tags);
        parts.push(infusion.id.to_string());
        infusion_prefix = Some(infusion.prefix);
    }

    // Independent affixes, never repeating a mod group. Tag gates use the
    // tags accumulated so far; when gating empties the pool the group-unused
    // pool is used instead.
    let mut used_groups: SmallVec<[&str; 4]> = SmallVec::new();
    for _ in 0..tier.affixes {
        let gated: Vec<usize> = (0..WEAPON_MODS.len())
            .filter(|&i| {
                let m = &WEAPON_MODS[i];
                !used_groups.contains(&m.group)
                    && m.requires_tags.iter().all(|t| tags.contains(t))
                    && !m.forbids_tags.iter().any(|t| tags.contains(t))
            })
            .collect();
        let pool: Vec<usize> = if gated.is_empty() {
            (0..WEAPON_MODS.len())
                .filter(|&i| !used_groups.contains(&WEAPON_MODS[i].group))
                .collect()
        } else {
            gated
        };
        if pool.is_empty() {
            break;
        }
        let weights: Vec<f32> = pool.iter().map(|&i| WEAPON_MODS[i].weight).collect();
        let m = &WEAPON_MODS[pool[rng.weighted_index(&weights)]];

        m.delta.apply(&mut stats);
        push_tags(&mut tags, m.adds_tags);
        used_groups.push(m.group);
        parts.push(m.id.to_string());
        if let Some(prefix) = m.prefix {
            mod_prefixes.push(prefix);
        }
        if name_suffix.is_none() {
            name_suffix = m.suffix;
        }
    }

    // Optional quirk, last.
    let mut quirk_prefix = None;
    if rng.chance(tier.quirk_chance) {
        let weights: Vec<f32> = QUIRKS.iter().map(|q| q.weight).collect();
        let quirk = &QUIRKS[rng.weighted_index(&weights)];
        quirk.delta.apply(&mut stats);
        push_tags(&mut tags, quirk.adds_tags);
        parts.push(quirk.id.to_string());
        quirk_prefix = Some(quirk.prefix);
    }

    stats.damage *= tier.potency;
    clamp_stats(&mut stats);

    let name = compose_name(
        quirk_prefix,
        infusion_prefix,
        &mod_prefixes,
        archetype.display_name,
        name_suffix,
    );
    let score = power_score(&stats, &tags);

    RolledWeapon {
        id: format!("wpn-{:016x}", seed),
        rarity: tier.rarity,
        archetype_id: archetype.id.to_string(),
        parts,
        tags,
        stats,
        name,
        power_score: score,
    }
}

fn rarity_epithet(rarity: Rarity) -> &'static str {
    match rarity {
        Rarity::Common => "",
        Rarity::Uncommon => "Refined",
        Rarity::Rare => "Exceptional",
        Rarity::Epic => "Masterwork",
        Rarity::Legendary => "Mythic",
    }
}

fn roll_upgrade_from(rng: &mut GameRng, def: &'static UpgradeDef) -> RolledUpgrade {
    let tier = roll_rarity(rng);
    let magnitude = def.base_magnitude * tier.potency;
    let epithet = rarity_epithet(tier.rarity);
    let name = if epithet.is_empty() {
        def.display_name.to_string()
    } else {
        format!("{} {}", epithet, def.display_name)
    };
    RolledUpgrade {
        id: def.id.to_string(),
        rarity: tier.rarity,
        seat: def.seat,
        kind: def.kind,
        magnitude,
        tags: def.tags.to_vec(),
        name,
        power_score: magnitude * 100.0,
    }
}

/// Roll a single upgrade from a seed.
pub fn roll_upgrade(seed: u64) -> RolledUpgrade {
    let mut rng = GameRng::new(seed);
    let weights: Vec<f32> = UPGRADE_DEFS.iter().map(|d| d.weight).collect();
    let def = &UPGRADE_DEFS[rng.weighted_index(&weights)];
    roll_upgrade_from(&mut rng, def)
}

/// Roll `n` upgrades with distinct definition ids. Each slot retries a
/// bounded number of times, then scans the catalog for the first unused
/// definition, so distinctness holds whenever the pool is large enough.
pub fn roll_upgrade_choices(seed: u64, n: usize) -> Vec<RolledUpgrade> {
    let mut rng = GameRng::new(seed);
    let weights: Vec<f32> = UPGRADE_DEFS.iter().map(|d| d.weight).collect();
    let mut chosen: Vec<&'static UpgradeDef> = Vec::with_capacity(n);

    for _ in 0..n.min(UPGRADE_DEFS.len()) {
        let mut picked = None;
        for _ in 0..CHOICE_ATTEMPTS {
            let def = &UPGRADE_DEFS[rng.weighted_index(&weights)];
            if !chosen.iter().any(|c| c.id == def.id) {
                picked = Some(def);
                break;
            }
        }
        let def = picked.unwrap_or_else(|| {
            UPGRADE_DEFS
                .iter()
                .find(|d| !chosen.iter().any(|c| c.id == d.id))
                .expect("pool larger than choice count")
        });
        chosen.push(def);
    }

    chosen
        .into_iter()
        .map(|def| roll_upgrade_from(&mut rng, def))
        .collect()
}
