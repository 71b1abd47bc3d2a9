//! Tag synergy scoring
//!
//! A full run loadout tallies tag frequency across every rolled item and
//! checks it against a fixed rule table. Rules either require a minimum
//! count of one specific tag or a minimum combined count across an
//! "any of" tag set.

use serde::{Deserialize, Serialize};

use crate::game::rng::GameRng;
use crate::loot::catalog::Tag;
use crate::loot::roll::{roll_upgrade, roll_weapon, RolledUpgrade, RolledWeapon, WeaponRollOptions};

/// Weapons rolled per run loadout.
const LOADOUT_WEAPONS: usize = 3;
/// Upgrades rolled per run loadout.
const LOADOUT_UPGRADES: usize = 5;

/// What a synergy rule demands of the tag tally.
#[derive(Debug, Clone, Copy)]
pub enum SynergyRequirement {
    /// At least `count` occurrences of `tag`.
    MinCount { tag: Tag, count: u32 },
    /// At least `count` occurrences summed across `tags`.
    CombinedCount { tags: &'static [Tag], count: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct SynergyRule {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub requirement: SynergyRequirement,
}

pub const SYNERGY_RULES: &[SynergyRule] = &[
    SynergyRule {
        id: "storm-circuit",
        name: "Storm Circuit",
        description: "Shock weapons chain to a nearby enemy",
        requirement: SynergyRequirement::MinCount { tag: Tag::Shock, count: 2 },
    },
    SynergyRule {
        id: "wildfire",
        name: "Wildfire",
        description: "Burning enemies spread embers on death",
        requirement: SynergyRequirement::MinCount { tag: Tag::Ember, count: 2 },
    },
    SynergyRule {
        id: "plague-engine",
        name: "Plague Engine",
        description: "Poison duration doubled",
        requirement: SynergyRequirement::MinCount { tag: Tag::Venom, count: 2 },
    },
    SynergyRule {
        id: "demolitionist",
        name: "Demolitionist",
        description: "Blast radius increased by a third",
        requirement: SynergyRequirement::MinCount { tag: Tag::Aoe, count: 3 },
    },
    SynergyRule {
        id: "slow-burn",
        name: "Slow Burn",
        description: "Damage-over-time ticks twice as often",
        requirement: SynergyRequirement::MinCount { tag: Tag::Dot, count: 3 },
    },
    SynergyRule {
        id: "glass-lattice",
        name: "Glass Lattice",
        description: "Critical hits pierce through their target",
        requirement: SynergyRequirement::CombinedCount { tags: &[Tag::Crit, Tag::Pierce], count: 3 },
    },
    SynergyRule {
        id: "bulwark",
        name: "Bulwark",
        description: "Shield breaks knock enemies back",
        requirement: SynergyRequirement::CombinedCount { tags: &[Tag::Shield, Tag::Support], count: 3 },
    },
    SynergyRule {
        id: "hot-feed",
        name: "Hot Feed",
        description: "Engine surges vent heat into weapon damage",
        requirement: SynergyRequirement::CombinedCount { tags: &[Tag::Engine, Tag::Shock, Tag::Ember], count: 3 },
    },
];

/// Tag frequency table with a fixed iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagTally {
    counts: [u32; Tag::ALL.len()],
}

impl TagTally {
    pub fn add(&mut self, tag: Tag) {
        self.counts[tag.index()] += 1;
    }

    pub fn add_all(&mut self, tags: &[Tag]) {
        for tag in tags {
            self.add(*tag);
        }
    }

    pub fn count(&self, tag: Tag) -> u32 {
        self.counts[tag.index()]
    }

    pub fn combined(&self, tags: &[Tag]) -> u32 {
        tags.iter().map(|t| self.count(*t)).sum()
    }

    pub fn satisfies(&self, requirement: &SynergyRequirement) -> bool {
        match requirement {
            SynergyRequirement::MinCount { tag, count } => self.count(*tag) >= *count,
            SynergyRequirement::CombinedCount { tags, count } => self.combined(tags) >= *count,
        }
    }
}

/// A synergy rule the loadout satisfies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSynergy {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Complete rolled loadout for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLoadout {
    pub seed: u64,
    pub weapons: Vec<RolledWeapon>,
    pub upgrades: Vec<RolledUpgrade>,
    pub tags: TagTally,
    pub synergies: Vec<ActiveSynergy>,
}

/// Evaluate the rule table against a tally.
pub fn active_synergies(tally: &TagTally) -> Vec<ActiveSynergy> {
    SYNERGY_RULES
        .iter()
        .filter(|rule| tally.satisfies(&rule.requirement))
        .map(|rule| ActiveSynergy {
            id: rule.id.to_string(),
            name: rule.name.to_string(),
            description: rule.description.to_string(),
        })
        .collect()
}

/// Roll a full run loadout from a single seed. Sub-seeds for each item are
/// drawn from one master stream, so the whole loadout is reproducible.
pub fn generate_run_loadout(seed: u64) -> RunLoadout {
    let mut master = GameRng::new(seed);
    let options = WeaponRollOptions::default();

    let weapons: Vec<RolledWeapon> = (0..LOADOUT_WEAPONS)
        .map(|_| roll_weapon(master.next_u64(), &options))
        .collect();
    let upgrades: Vec<RolledUpgrade> = (0..LOADOUT_UPGRADES)
        .map(|_| roll_upgrade(master.next_u64()))
        .collect();

    let mut tags = TagTally::default();
    for weapon in &weapons {
        tags.add_all(&weapon.tags);
    }
    for upgrade in &upgrades {
        tags.add_all(&upgrade.tags);
    }

    let synergies = active_synergies(&tags);

    RunLoadout {
        seed,
        weapons,
        upgrades,
        tags,
        synergies,
    }
}
