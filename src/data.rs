use serde::{Deserialize, Serialize};

/// Tunable protocol behaviour shared by both peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSettings {
    /// Guest reports a state digest to the host after every turn.
    #[serde(default = "const_true")]
    pub verify_state_hash: bool,
    /// Duration of weather inferred from a move's effect text.
    #[serde(default = "default_weather_turns")]
    pub weather_turns: u8,
}

impl BattleSettings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for BattleSettings {
    fn default() -> Self {
        Self {
            verify_state_hash: true,
            weather_turns: default_weather_turns(),
        }
    }
}

const fn const_true() -> bool {
    true
}

const fn default_weather_turns() -> u8 {
    5
}
