use crate::{
    event::{BattleEvent, Side},
    pokemon::{BattlePokemon, PokemonType},
    state::{field::WeatherKind, BattleState},
};

fn immune(weather: WeatherKind, pokemon: &BattlePokemon) -> bool {
    match weather {
        WeatherKind::Sandstorm => [PokemonType::Ground, PokemonType::Rock, PokemonType::Steel]
            .iter()
            .any(|t| pokemon.has_type(*t)),
        WeatherKind::Hail => pokemon.has_type(PokemonType::Ice),
        WeatherKind::Sunny | WeatherKind::Rain | WeatherKind::StrongWind => true,
    }
}

/// End of turn chip damage from sandstorm and hail, one eighth of max HP.
pub fn weather_damage(state: &BattleState) -> Vec<BattleEvent> {
    let weather = match state.weather {
        Some(weather) if weather.turns_remaining > 0 => weather.kind,
        _ => return Vec::new(),
    };

    let mut events = Vec::new();

    for side in Side::ALL {
        if let Some(pokemon) = state.active(side) {
            if pokemon.fainted() || immune(weather, pokemon) {
                continue;
            }
            let amount = pokemon.max_hp / 8;
            if amount == 0 {
                continue;
            }
            let new_hp = pokemon.current_hp.saturating_sub(amount);
            events.push(BattleEvent::Damage {
                target: side,
                pokemon_index: pokemon.index,
                amount,
                new_hp,
            });
            if new_hp == 0 {
                events.push(BattleEvent::PokemonFainted {
                    target: side,
                    pokemon_index: pokemon.index,
                });
            }
        }
    }

    events
}

/// Counts the weather down by one turn, clearing it at zero.
pub fn weather_tick(state: &BattleState) -> Option<BattleEvent> {
    let weather = state.weather?;
    let turns_remaining = weather.turns_remaining.saturating_sub(1);
    Some(match turns_remaining {
        0 => BattleEvent::WeatherChange {
            weather_type: None,
            turns_remaining: 0,
        },
        _ => BattleEvent::WeatherChange {
            weather_type: Some(weather.kind),
            turns_remaining,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::{weather_damage, weather_tick};
    use crate::{
        event::{BattleEvent, Side},
        state::{field::WeatherKind, tests::state, BattleState},
    };

    fn with_weather(kind: WeatherKind, turns: u8) -> BattleState {
        state().apply_event(&BattleEvent::WeatherChange {
            weather_type: Some(kind),
            turns_remaining: turns,
        })
    }

    #[test]
    fn sandstorm_spares_rock_ground_steel() {
        // Pikachu takes damage, Eevee too
        let events = weather_damage(&with_weather(WeatherKind::Sandstorm, 3));
        assert_eq!(
            events,
            vec![
                BattleEvent::Damage {
                    target: Side::Player1,
                    pokemon_index: 0,
                    amount: 4,
                    new_hp: 31,
                },
                BattleEvent::Damage {
                    target: Side::Player2,
                    pokemon_index: 0,
                    amount: 6,
                    new_hp: 49,
                },
            ]
        );

        // Onix is part rock
        let onix = with_weather(WeatherKind::Sandstorm, 3).apply_event(&BattleEvent::PokemonSwitch {
            target: Side::Player1,
            from_index: 0,
            to_index: 1,
            from_name: None,
            to_name: None,
        });
        assert_eq!(weather_damage(&onix).len(), 1);
    }

    #[test]
    fn hail_faints_at_zero() {
        let state = with_weather(WeatherKind::Hail, 2).apply_event(&BattleEvent::Damage {
            target: Side::Player2,
            pokemon_index: 0,
            amount: 52,
            new_hp: 3,
        });
        let events = weather_damage(&state);
        assert!(events.contains(&BattleEvent::PokemonFainted {
            target: Side::Player2,
            pokemon_index: 0,
        }));
    }

    #[test]
    fn sun_and_rain_do_no_damage() {
        assert!(weather_damage(&with_weather(WeatherKind::Sunny, 5)).is_empty());
        assert!(weather_damage(&with_weather(WeatherKind::Rain, 5)).is_empty());
        assert!(weather_damage(&state()).is_empty());
    }

    #[test]
    fn countdown_clears() {
        assert_eq!(
            weather_tick(&with_weather(WeatherKind::Rain, 2)),
            Some(BattleEvent::WeatherChange {
                weather_type: Some(WeatherKind::Rain),
                turns_remaining: 1,
            })
        );
        assert_eq!(
            weather_tick(&with_weather(WeatherKind::Rain, 1)),
            Some(BattleEvent::WeatherChange {
                weather_type: None,
                turns_remaining: 0,
            })
        );
        assert_eq!(weather_tick(&state()), None);
    }
}
