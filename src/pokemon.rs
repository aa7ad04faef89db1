use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};

use crate::moves::MoveId;

pub mod stat;

use stat::{BaseStat, BaseStats, Stat, StatStages};

pub type Level = u8;
pub type Health = u16;
pub type Experience = u32;

pub const MAX_LEVEL: Level = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SpeciesId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PokemonType {
    Normal,
    Fire,
    Water,
    Electric,
    Grass,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Dark,
    Steel,
    Fairy,
}

/// Volatile status conditions. A healthy pokemon carries `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Burn,
    Poison,
    Paralysis,
    Sleep,
    Freeze,
    Confusion,
}

/// A pokemon as it is stored on a player's roster, outside of battle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPokemon {
    pub id: SpeciesId,
    pub name: String,
    #[serde(default = "default_level")]
    pub level: Level,
    pub types: Vec<PokemonType>,
    pub stats: BaseStats,
    #[serde(default)]
    pub move_pool: Vec<MoveId>,
    #[serde(default)]
    pub experience: Experience,
}

const fn default_level() -> Level {
    MAX_LEVEL
}

/// Battle-scoped copy of a roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattlePokemon {
    pub id: SpeciesId,
    pub name: String,
    pub level: Level,
    /// Slot on the owning team
    pub index: usize,
    pub types: Vec<PokemonType>,
    pub stats: BaseStats,
    pub current_hp: Health,
    pub max_hp: Health,
    pub status: Option<Status>,
    pub stat_stages: StatStages,
    pub is_fainted: bool,
    pub move_pool: Vec<MoveId>,
}

impl BattlePokemon {
    pub fn new(pokemon: &RosterPokemon, index: usize) -> Self {
        let hp = pokemon.stats[Stat::Hp];
        Self {
            id: pokemon.id,
            name: pokemon.name.clone(),
            level: pokemon.level,
            index,
            types: pokemon.types.clone(),
            stats: pokemon.stats,
            current_hp: hp,
            max_hp: hp,
            status: None,
            stat_stages: Default::default(),
            is_fainted: false,
            move_pool: pokemon.move_pool.clone(),
        }
    }

    pub fn fainted(&self) -> bool {
        self.is_fainted
    }

    /// Base stat with the current stage applied.
    pub fn stat(&self, stat: Stat) -> BaseStat {
        let base = self.stats[stat];
        match self.stage_of(stat) {
            Some(stage) => StatStages::mult(base, stage),
            None => base,
        }
    }

    fn stage_of(&self, stat: Stat) -> Option<stat::Stage> {
        use stat::StageStat;
        let stage = match stat {
            Stat::Hp => return None,
            Stat::Attack => StageStat::Attack,
            Stat::Defense => StageStat::Defense,
            Stat::SpecialAttack => StageStat::SpAttack,
            Stat::SpecialDefense => StageStat::SpDefense,
            Stat::Speed => StageStat::Speed,
        };
        Some(self.stat_stages[stage])
    }

    pub fn primary_type(&self) -> Option<PokemonType> {
        self.types.first().copied()
    }

    pub fn has_type(&self, pokemon_type: PokemonType) -> bool {
        self.types.contains(&pokemon_type)
    }

    pub fn knows(&self, id: &MoveId) -> bool {
        self.move_pool.contains(id)
    }
}

impl Display for BattlePokemon {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} (#{}) Lv. {}", self.name, self.id.0, self.level)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        core::fmt::Debug::fmt(self, f)
    }
}
