use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeatherKind {
    Sunny,
    Rain,
    Sandstorm,
    Hail,
    StrongWind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerrainKind {
    Electric,
    Grassy,
    Misty,
    Psychic,
}

/// A field-wide condition with a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldCondition<K> {
    #[serde(rename = "type")]
    pub kind: K,
    pub turns_remaining: u8,
}

pub type Weather = FieldCondition<WeatherKind>;
pub type Terrain = FieldCondition<TerrainKind>;

impl<K> FieldCondition<K> {
    pub fn new(kind: K, turns_remaining: u8) -> Self {
        Self {
            kind,
            turns_remaining,
        }
    }
}
