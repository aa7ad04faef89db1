//! Move effect lookup.
//!
//! Structured [`MoveEffect`]s on the move data always win. Moves without them
//! fall back to a keyword heuristic over the effect text, which is best effort
//! only and may miss or misread effects.

use crate::{
    moves::{EffectTarget, MoveData, MoveEffect},
    pokemon::{stat::StageStat, Status},
    state::field::WeatherKind,
};

/// Moves that set weather, by name.
const WEATHER_MOVES: &[(&str, WeatherKind, u8)] = &[
    ("sunny-day", WeatherKind::Sunny, 5),
    ("rain-dance", WeatherKind::Rain, 5),
    ("sandstorm", WeatherKind::Sandstorm, 5),
    ("hail", WeatherKind::Hail, 5),
    ("snow", WeatherKind::Hail, 5),
    ("primordial-sea", WeatherKind::Rain, 8),
    ("desolate-land", WeatherKind::Sunny, 8),
    ("delta-stream", WeatherKind::StrongWind, 8),
];

const STATUS_KEYWORDS: &[(Status, &[&str])] = &[
    (Status::Freeze, &["freeze", "frozen"]),
    (Status::Burn, &["burn", "burned"]),
    (Status::Poison, &["poison", "poisoned"]),
    (Status::Paralysis, &["paralyze", "paralyzed", "paralysis"]),
    (Status::Sleep, &["sleep", "asleep"]),
    (Status::Confusion, &["confuse", "confused", "confusion"]),
];

/// Weather a status move sets, with its duration.
pub fn weather(data: &MoveData, default_turns: u8) -> Option<(WeatherKind, u8)> {
    if let Some((weather, turns)) = data.effects.iter().find_map(|effect| match effect {
        MoveEffect::Weather { weather, turns } => Some((*weather, *turns)),
        _ => None,
    }) {
        return Some((weather, turns));
    }

    let name = data.name.to_lowercase();
    if let Some((_, weather, turns)) = WEATHER_MOVES.iter().find(|(move_name, ..)| *move_name == name) {
        return Some((*weather, *turns));
    }

    if !data.effects.is_empty() {
        return None;
    }

    let text = data.effect.to_lowercase();
    let weather = if text.contains("sandstorm") {
        WeatherKind::Sandstorm
    } else if text.contains("sunny") || text.contains("sunlight") {
        WeatherKind::Sunny
    } else if text.contains("rain") {
        WeatherKind::Rain
    } else if text.contains("hail") || text.contains("snow") {
        WeatherKind::Hail
    } else {
        return None;
    };
    Some((weather, default_turns))
}

/// Secondary effects of a damaging move, before the chance roll.
pub fn secondary(data: &MoveData) -> Vec<MoveEffect> {
    if !data.effects.is_empty() {
        return data
            .effects
            .iter()
            .filter(|effect| !matches!(effect, MoveEffect::Weather { .. }))
            .copied()
            .collect();
    }

    let text = data.effect.to_lowercase();
    let mut effects = Vec::new();

    if let Some((status, ..)) = STATUS_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
    {
        effects.push(MoveEffect::Status { status: *status });
    }

    let stat = |target, stat, stages| MoveEffect::Stat {
        target,
        stat,
        stages,
    };

    if text.contains("raises attack") || text.contains("increase attack") {
        effects.push(stat(EffectTarget::User, StageStat::Attack, 1));
    } else if text.contains("lowers attack") || text.contains("decrease attack") {
        effects.push(stat(EffectTarget::Target, StageStat::Attack, -1));
    }

    if text.contains("raises defense") || text.contains("increase defense") {
        effects.push(stat(EffectTarget::User, StageStat::Defense, 1));
    }

    if text.contains("raises speed") || text.contains("increase speed") {
        effects.push(stat(EffectTarget::User, StageStat::Speed, 1));
    }

    effects
}
