//! Battle events: the deltas the host broadcasts and both peers apply.

use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};

use crate::{
    moves::{MoveId, MoveTarget},
    pokemon::{
        stat::{Stage, StageStat},
        Health, Level, Status,
    },
    state::field::WeatherKind,
};

/// One side of the battle. The host always plays `Player1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player1,
    Player2,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Player1, Side::Player2];

    pub fn index(&self) -> usize {
        match self {
            Self::Player1 => 0,
            Self::Player2 => 1,
        }
    }

    pub fn opponent(&self) -> Self {
        match self {
            Self::Player1 => Self::Player2,
            Self::Player2 => Self::Player1,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Player1 => "player1",
            Self::Player2 => "player2",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BattleEvent {
    /// Carries the resulting HP so peers never recompute it.
    Damage {
        target: Side,
        pokemon_index: usize,
        amount: Health,
        new_hp: Health,
    },
    StatusApply {
        target: Side,
        pokemon_index: usize,
        status: Status,
    },
    StatusRemove {
        target: Side,
        pokemon_index: usize,
        status: Status,
    },
    StatusDamage {
        target: Side,
        pokemon_index: usize,
        amount: Health,
    },
    StatChange {
        target: Side,
        pokemon_index: usize,
        stat: StageStat,
        stages: Stage,
    },
    PokemonFainted {
        target: Side,
        pokemon_index: usize,
    },
    PokemonSwitch {
        target: Side,
        from_index: usize,
        to_index: usize,
        #[serde(default)]
        from_name: Option<String>,
        #[serde(default)]
        to_name: Option<String>,
    },
    MoveUsed {
        player: Side,
        pokemon_index: usize,
        move_id: MoveId,
        target_index: MoveTarget,
    },
    MoveMissed {
        player: Side,
        pokemon_index: usize,
        move_id: MoveId,
    },
    MoveFailed {
        player: Side,
        pokemon_index: usize,
        move_id: MoveId,
        reason: String,
    },
    /// A `None` weather type clears the weather.
    WeatherChange {
        weather_type: Option<WeatherKind>,
        turns_remaining: u8,
    },
    #[serde(rename = "turn_start_event")]
    TurnStart,
    #[serde(rename = "turn_end_event")]
    TurnEnd,
    LevelUp {
        target: Side,
        pokemon_index: usize,
        new_level: Level,
    },
}

/// Tags of every [`BattleEvent`] variant as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Damage,
    StatusApply,
    StatusRemove,
    StatusDamage,
    StatChange,
    PokemonFainted,
    PokemonSwitch,
    MoveUsed,
    MoveMissed,
    MoveFailed,
    WeatherChange,
    #[serde(rename = "turn_start_event")]
    TurnStart,
    #[serde(rename = "turn_end_event")]
    TurnEnd,
    LevelUp,
}

impl EventType {
    pub fn parse(tag: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(tag.to_owned())).ok()
    }
}

impl BattleEvent {
    pub fn kind(&self) -> EventType {
        match self {
            Self::Damage { .. } => EventType::Damage,
            Self::StatusApply { .. } => EventType::StatusApply,
            Self::StatusRemove { .. } => EventType::StatusRemove,
            Self::StatusDamage { .. } => EventType::StatusDamage,
            Self::StatChange { .. } => EventType::StatChange,
            Self::PokemonFainted { .. } => EventType::PokemonFainted,
            Self::PokemonSwitch { .. } => EventType::PokemonSwitch,
            Self::MoveUsed { .. } => EventType::MoveUsed,
            Self::MoveMissed { .. } => EventType::MoveMissed,
            Self::MoveFailed { .. } => EventType::MoveFailed,
            Self::WeatherChange { .. } => EventType::WeatherChange,
            Self::TurnStart => EventType::TurnStart,
            Self::TurnEnd => EventType::TurnEnd,
            Self::LevelUp { .. } => EventType::LevelUp,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{BattleEvent, EventType, Side};
    use crate::{
        moves::{MoveId, MoveTarget},
        state::field::WeatherKind,
    };

    #[test]
    fn wire_shapes() {
        let damage = BattleEvent::Damage {
            target: Side::Player2,
            pokemon_index: 0,
            amount: 12,
            new_hp: 30,
        };
        assert_eq!(
            serde_json::to_value(&damage).unwrap(),
            json!({ "type": "damage", "target": "player2", "pokemonIndex": 0, "amount": 12, "newHp": 30 })
        );

        let used = BattleEvent::MoveUsed {
            player: Side::Player1,
            pokemon_index: 1,
            move_id: MoveId(33),
            target_index: MoveTarget::User,
        };
        assert_eq!(serde_json::to_value(&used).unwrap()["targetIndex"], json!(-1));

        assert_eq!(
            serde_json::to_value(&BattleEvent::TurnEnd).unwrap(),
            json!({ "type": "turn_end_event" })
        );

        let clear: BattleEvent =
            serde_json::from_value(json!({ "type": "weather_change", "weatherType": null, "turnsRemaining": 0 }))
                .unwrap();
        assert_eq!(
            clear,
            BattleEvent::WeatherChange {
                weather_type: None,
                turns_remaining: 0
            }
        );
        let sand: BattleEvent = serde_json::from_value(
            json!({ "type": "weather_change", "weatherType": "sandstorm", "turnsRemaining": 4 }),
        )
        .unwrap();
        assert_eq!(sand.kind(), EventType::WeatherChange);
        assert!(matches!(
            sand,
            BattleEvent::WeatherChange {
                weather_type: Some(WeatherKind::Sandstorm),
                ..
            }
        ));
    }

    #[test]
    fn event_tags() {
        assert_eq!(EventType::parse("pokemon_switch"), Some(EventType::PokemonSwitch));
        assert_eq!(EventType::parse("turn_end_event"), Some(EventType::TurnEnd));
        assert_eq!(EventType::parse("turn_end"), None);
        assert_eq!(EventType::parse("explosion"), None);
    }
}
