use crate::{
    moves::Power,
    pokemon::{stat::BaseStat, Health, Level, PokemonType},
    state::field::WeatherKind,
};

pub const MIN_VARIANCE: f64 = 0.85;
pub const MAX_VARIANCE: f64 = 1.0;

/// Everything the damage formula consumes, already looked up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageInput {
    pub level: Level,
    pub power: Power,
    pub attack: BaseStat,
    pub defense: BaseStat,
    pub type_multiplier: f64,
    pub weather_multiplier: f64,
    /// Uniform draw in `[MIN_VARIANCE, MAX_VARIANCE]`
    pub variance: f64,
}

impl DamageInput {
    pub fn base_damage(&self) -> f64 {
        let level = self.level as f64;
        let defense = self.defense.max(1) as f64;
        ((((2.0 * level / 5.0 + 2.0) * self.power as f64 * self.attack as f64) / defense) / 50.0).floor()
            + 2.0
    }

    /// Final damage, never below 1.
    pub fn damage(&self) -> Health {
        let damage = (self.base_damage()
            * self.type_multiplier
            * self.weather_multiplier
            * self.variance)
            .floor();
        damage.clamp(1.0, Health::MAX as f64) as Health
    }
}

pub fn weather_multiplier(weather: Option<WeatherKind>, move_type: PokemonType) -> f64 {
    match (weather, move_type) {
        (Some(WeatherKind::Sunny), PokemonType::Fire) => 1.5,
        (Some(WeatherKind::Sunny), PokemonType::Water) => 0.5,
        (Some(WeatherKind::Rain), PokemonType::Water) => 1.5,
        (Some(WeatherKind::Rain), PokemonType::Fire) => 0.5,
        (Some(WeatherKind::Sandstorm), PokemonType::Rock) => 1.5,
        _ => 1.0,
    }
}
