use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};

use crate::{
    pokemon::{
        stat::{Stage, StageStat},
        PokemonType, Status,
    },
    state::field::WeatherKind,
};

pub mod damage;
pub mod effect;

pub type Power = u16;
pub type Accuracy = u8;
pub type Priority = i8;
pub type Percent = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MoveId(pub u16);

impl Display for MoveId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{}", self.0)
    }
}

/// Who a selected move is aimed at. On the wire the user is `-1` and an
/// opponent is its team slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "i32", into = "i32")]
pub enum MoveTarget {
    User,
    Opponent(usize),
}

impl From<i32> for MoveTarget {
    fn from(index: i32) -> Self {
        match usize::try_from(index) {
            Ok(index) => Self::Opponent(index),
            Err(..) => Self::User,
        }
    }
}

impl From<MoveTarget> for i32 {
    fn from(target: MoveTarget) -> Self {
        match target {
            MoveTarget::User => -1,
            MoveTarget::Opponent(index) => index as i32,
        }
    }
}

/// Move data as served by the rules collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveData {
    pub id: MoveId,
    pub name: String,
    #[serde(rename = "type")]
    pub move_type: PokemonType,
    #[serde(default)]
    pub power: Option<Power>,
    /// `None` never misses
    #[serde(default)]
    pub accuracy: Option<Accuracy>,
    #[serde(default)]
    pub priority: Priority,
    /// Free-form effect description.
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub effect_chance: Option<Percent>,
    /// Structured effects. When empty, effects are inferred from `effect`.
    #[serde(default)]
    pub effects: Vec<MoveEffect>,
}

impl MoveData {
    pub fn is_damaging(&self) -> bool {
        self.power.map(|power| power > 0).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectTarget {
    User,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MoveEffect {
    Status { status: Status },
    Stat { target: EffectTarget, stat: StageStat, stages: Stage },
    Weather { weather: WeatherKind, turns: u8 },
}

#[cfg(test)]
mod tests {
    use super::{MoveData, MoveTarget};

    #[test]
    fn target_wire_format() {
        assert_eq!(serde_json::to_string(&MoveTarget::User).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&MoveTarget::Opponent(3)).unwrap(), "3");
        assert_eq!(serde_json::from_str::<MoveTarget>("-1").unwrap(), MoveTarget::User);
        assert_eq!(serde_json::from_str::<MoveTarget>("0").unwrap(), MoveTarget::Opponent(0));
    }

    #[test]
    fn status_moves_have_no_power() {
        let data: MoveData = serde_json::from_str(
            r#"{ "id": 241, "name": "sunny-day", "type": "fire", "power": null, "accuracy": null }"#,
        )
        .unwrap();
        assert!(!data.is_damaging());
        assert!(data.effects.is_empty());
    }
}
