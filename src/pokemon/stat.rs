use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    ops::Deref,
};
use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};

pub type BaseStat = u16;
pub type Stage = i8;

pub const MAX_STAGE: Stage = 6;
pub const MIN_STAGE: Stage = -6;

/// Stats carried by a roster entry, named the way the rules data names them.
#[derive(Debug, Clone, Copy, Enum, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stat {
    Hp,
    Attack,
    Defense,
    SpecialAttack,
    SpecialDefense,
    Speed,
}

pub type BaseStats = EnumMap<Stat, BaseStat>;

/// Stats that can be raised or lowered during a battle.
#[derive(Debug, Clone, Copy, Enum, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageStat {
    #[serde(rename = "attack")]
    Attack,
    #[serde(rename = "defense")]
    Defense,
    #[serde(rename = "sp-atk")]
    SpAttack,
    #[serde(rename = "sp-def")]
    SpDefense,
    #[serde(rename = "speed")]
    Speed,
    #[serde(rename = "accuracy")]
    Accuracy,
    #[serde(rename = "evasion")]
    Evasion,
}

impl StageStat {
    /// The base stat a stage modifies, if any.
    pub fn base(&self) -> Option<Stat> {
        match self {
            Self::Attack => Some(Stat::Attack),
            Self::Defense => Some(Stat::Defense),
            Self::SpAttack => Some(Stat::SpecialAttack),
            Self::SpDefense => Some(Stat::SpecialDefense),
            Self::Speed => Some(Stat::Speed),
            Self::Accuracy | Self::Evasion => None,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatStages(EnumMap<StageStat, Stage>);

impl StatStages {
    /// Applies a stage delta, clamped to the legal range no matter how large the delta is.
    pub fn change_stage(&mut self, stat: StageStat, stage: Stage) {
        let current = self.0[stat] as i16;
        self.0[stat] = (current + stage as i16).clamp(MIN_STAGE as i16, MAX_STAGE as i16) as Stage;
    }

    pub fn mult(base: BaseStat, stage: Stage) -> BaseStat {
        let base = base as u32;
        let stage = stage as i32;
        (base * (2.max(2 + stage) as u32) / (2.max(2 - stage) as u32)).min(BaseStat::MAX as u32) as BaseStat
    }
}

impl Deref for StatStages {
    type Target = EnumMap<StageStat, Stage>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for StageStat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Attack => "attack",
            Self::Defense => "defense",
            Self::SpAttack => "sp-atk",
            Self::SpDefense => "sp-def",
            Self::Speed => "speed",
            Self::Accuracy => "accuracy",
            Self::Evasion => "evasion",
        })
    }
}
