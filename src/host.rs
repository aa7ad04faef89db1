//! Host-only turn resolution.
//!
//! Given a state where both players have committed an action, [`resolve`]
//! produces the ordered events that carry the battle to its next state. The
//! events are computed against a private working copy; callers apply them to
//! their own snapshot and broadcast them unchanged.

use core::fmt::{Display, Formatter, Result as FmtResult};
use log::{debug, info, warn};
use rand::Rng;

use crate::{
    data::BattleSettings,
    event::{BattleEvent, Side},
    moves::{
        damage::{weather_multiplier, DamageInput, MAX_VARIANCE, MIN_VARIANCE},
        effect, EffectTarget, MoveData, MoveEffect, MoveId, MoveTarget,
    },
    pokemon::{stat::Stat, Experience},
    rules::{RulesData, RulesError},
    select::BattleSelection,
    state::{BattleState, Outcome},
};

mod field;
mod queue;

pub use queue::{move_queue, MovePriority, QueuedAction};

/// Everything one resolution produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResolution {
    pub events: Vec<BattleEvent>,
    pub outcome: Option<Outcome>,
    pub xp: Option<XpAward>,
}

/// Experience owed to the winner's active pokemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpAward {
    pub side: Side,
    pub pokemon_index: usize,
    pub amount: Experience,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// Both players must have acted.
    NotReady,
    Rules(RulesError),
    MissingPokemon(Side),
}

impl std::error::Error for EngineError {}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::NotReady => f.write_str("both players have not acted yet"),
            Self::Rules(err) => write!(f, "rules lookup failed: {}", err),
            Self::MissingPokemon(side) => write!(f, "{} has no active pokemon", side),
        }
    }
}

impl From<RulesError> for EngineError {
    fn from(err: RulesError) -> Self {
        Self::Rules(err)
    }
}

/// Experience for the winner: ten per level of every loser still standing.
pub fn xp_award(state: &BattleState, winner: Side) -> XpAward {
    let amount = state
        .player(winner.opponent())
        .team
        .iter()
        .filter(|pokemon| !pokemon.fainted())
        .map(|pokemon| (pokemon.level as f64 * 10.0).ceil() as Experience)
        .sum();

    XpAward {
        side: winner,
        pokemon_index: state.player(winner).active_pokemon_index,
        amount,
    }
}

pub fn resolve<R: Rng>(
    state: &BattleState,
    rules: &dyn RulesData,
    settings: &BattleSettings,
    random: &mut R,
) -> Result<TurnResolution, EngineError> {
    if state.is_over() || !state.both_acted() {
        return Err(EngineError::NotReady);
    }

    let mut turn = Turn {
        state: state.clone(),
        events: Vec::new(),
        rules,
        settings,
    };

    for QueuedAction { side, action } in move_queue(state, rules)? {
        match action {
            BattleSelection::Switch(to) => turn.switch(side, to),
            BattleSelection::Move(id, target) => turn.use_move(side, id, target, random)?,
        }
    }

    turn.replace_fainted();

    let chip = field::weather_damage(&turn.state);
    if !chip.is_empty() {
        turn.emit_all(chip);
        turn.replace_fainted();
    }

    if let Some(event) = field::weather_tick(&turn.state) {
        turn.emit(event);
    }

    let outcome = turn.state.winner();
    let xp = match outcome {
        Some(outcome) => {
            info!("Battle decided: {:?}", outcome);
            turn.emit(BattleEvent::TurnEnd);
            outcome.winner().map(|winner| xp_award(&turn.state, winner))
        }
        None => None,
    };

    debug!("Resolved turn {} into {} events", state.turn_number + 1, turn.events.len());

    Ok(TurnResolution {
        events: turn.events,
        outcome,
        xp,
    })
}

struct Turn<'a> {
    state: BattleState,
    events: Vec<BattleEvent>,
    rules: &'a dyn RulesData,
    settings: &'a BattleSettings,
}

impl<'a> Turn<'a> {
    fn emit(&mut self, event: BattleEvent) {
        self.state = self.state.apply_event(&event);
        self.events.push(event);
    }

    fn emit_all(&mut self, events: Vec<BattleEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    fn switch(&mut self, side: Side, to: usize) {
        let player = self.state.player(side);
        let event = BattleEvent::PokemonSwitch {
            target: side,
            from_index: player.active_pokemon_index,
            to_index: to,
            from_name: player.active().map(|pokemon| pokemon.name.clone()),
            to_name: player.pokemon(to).map(|pokemon| pokemon.name.clone()),
        };
        self.emit(event);
    }

    fn use_move<R: Rng>(
        &mut self,
        side: Side,
        move_id: MoveId,
        target: MoveTarget,
        random: &mut R,
    ) -> Result<(), EngineError> {
        let attacker = self
            .state
            .active(side)
            .ok_or(EngineError::MissingPokemon(side))?;
        let pokemon_index = attacker.index;

        let failed = |reason: &str| BattleEvent::MoveFailed {
            player: side,
            pokemon_index,
            move_id,
            reason: reason.to_owned(),
        };

        if attacker.fainted() {
            self.emit(failed("fainted"));
            return Ok(());
        }

        // a stale opponent slot always means whoever is out now
        let target_side = match target {
            MoveTarget::User => side,
            MoveTarget::Opponent(..) => side.opponent(),
        };

        let defender = self
            .state
            .active(target_side)
            .ok_or(EngineError::MissingPokemon(target_side))?;
        if defender.fainted() {
            self.emit(failed("no target"));
            return Ok(());
        }

        let data = self.rules.move_data(&move_id)?;

        self.emit(BattleEvent::MoveUsed {
            player: side,
            pokemon_index,
            move_id,
            target_index: target,
        });

        if let Some(accuracy) = data.accuracy {
            if random.gen::<f64>() >= accuracy as f64 / 100.0 {
                self.emit(BattleEvent::MoveMissed {
                    player: side,
                    pokemon_index,
                    move_id,
                });
                return Ok(());
            }
        }

        if data.is_damaging() {
            return self.damage(side, target_side, &data, random);
        }

        if let Some((weather, turns)) = effect::weather(&data, self.settings.weather_turns) {
            self.emit(BattleEvent::WeatherChange {
                weather_type: Some(weather),
                turns_remaining: turns,
            });
        }
        Ok(())
    }

    fn damage<R: Rng>(
        &mut self,
        side: Side,
        target_side: Side,
        data: &MoveData,
        random: &mut R,
    ) -> Result<(), EngineError> {
        let attacker = self
            .state
            .active(side)
            .ok_or(EngineError::MissingPokemon(side))?;
        let defender = self
            .state
            .active(target_side)
            .ok_or(EngineError::MissingPokemon(target_side))?;

        let type_multiplier = match attacker.primary_type() {
            Some(attacking) => self
                .rules
                .type_effectiveness(attacking, &defender.types)
                .unwrap_or_else(|err| {
                    warn!("Type effectiveness unavailable ({}), using neutral damage", err);
                    1.0
                }),
            None => 1.0,
        };

        let input = DamageInput {
            level: attacker.level,
            power: data.power.unwrap_or_default(),
            attack: attacker.stat(Stat::Attack),
            defense: defender.stat(Stat::Defense),
            type_multiplier,
            weather_multiplier: weather_multiplier(
                self.state.weather.map(|weather| weather.kind),
                data.move_type,
            ),
            variance: random.gen_range(MIN_VARIANCE..MAX_VARIANCE),
        };

        let amount = input.damage();
        let new_hp = defender.current_hp.saturating_sub(amount);
        let defender_index = defender.index;
        let attacker_index = attacker.index;

        self.emit(BattleEvent::Damage {
            target: target_side,
            pokemon_index: defender_index,
            amount,
            new_hp,
        });

        if new_hp == 0 {
            self.emit(BattleEvent::PokemonFainted {
                target: target_side,
                pokemon_index: defender_index,
            });
        }

        let effects = effect::secondary(data);
        if effects.is_empty() {
            return Ok(());
        }

        // structured effects without a chance always apply, inferred ones never do
        let chance = data
            .effect_chance
            .unwrap_or(if data.effects.is_empty() { 0 } else { 100 });
        if chance == 0 || !random.gen_bool(chance.min(100) as f64 / 100.0) {
            return Ok(());
        }

        for effect in effects {
            match effect {
                MoveEffect::Status { status } => {
                    if new_hp > 0 {
                        self.emit(BattleEvent::StatusApply {
                            target: target_side,
                            pokemon_index: defender_index,
                            status,
                        });
                    }
                }
                MoveEffect::Stat {
                    target,
                    stat,
                    stages,
                } => {
                    let (target, pokemon_index) = match target {
                        EffectTarget::User => (side, attacker_index),
                        EffectTarget::Target => (target_side, defender_index),
                    };
                    self.emit(BattleEvent::StatChange {
                        target,
                        pokemon_index,
                        stat,
                        stages,
                    });
                }
                MoveEffect::Weather { .. } => (),
            }
        }

        Ok(())
    }

    /// Sends in the first healthy teammate for every fainted active pokemon.
    fn replace_fainted(&mut self) {
        for side in Side::ALL {
            let player = self.state.player(side);
            let replacement = match player.active() {
                Some(active) if active.fainted() => player.first_healthy(),
                _ => None,
            };
            if let Some(replacement) = replacement {
                let to = replacement.index;
                self.switch(side, to);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::rngs::mock::StepRng;

    use super::{resolve, xp_award, EngineError, XpAward};
    use crate::{
        data::BattleSettings,
        event::{BattleEvent, Side},
        moves::{EffectTarget, MoveData, MoveEffect, MoveId, MoveTarget},
        pokemon::{stat::StageStat, PokemonType, Status},
        rules::{RulesDex, RulesError, TypeRelations},
        select::BattleSelection,
        state::{field::WeatherKind, tests::state, BattleState, Outcome},
    };

    pub const TACKLE: MoveId = MoveId(1);
    pub const QUICK_ATTACK: MoveId = MoveId(98);
    pub const SANDSTORM: MoveId = MoveId(201);
    pub const NUZZLE: MoveId = MoveId(609);
    pub const GROWL: MoveId = MoveId(45);

    fn data(id: MoveId, name: &str, move_type: PokemonType, power: Option<u16>) -> MoveData {
        MoveData {
            id,
            name: name.to_owned(),
            move_type,
            power,
            accuracy: Some(100),
            priority: 0,
            effect: String::new(),
            effect_chance: None,
            effects: Vec::new(),
        }
    }

    pub fn dex() -> RulesDex {
        let mut dex = RulesDex::default();
        dex.insert_move(data(TACKLE, "tackle", PokemonType::Normal, Some(40)));
        dex.insert_move(MoveData {
            priority: 1,
            ..data(QUICK_ATTACK, "quick-attack", PokemonType::Normal, Some(40))
        });
        dex.insert_move(MoveData {
            accuracy: None,
            ..data(SANDSTORM, "sandstorm", PokemonType::Rock, None)
        });
        dex.insert_move(MoveData {
            effect_chance: Some(10),
            effect: "Has a 10% chance to paralyze the target.".to_owned(),
            ..data(NUZZLE, "nuzzle", PokemonType::Electric, Some(20))
        });
        dex.insert_move(MoveData {
            power: Some(1),
            effects: vec![MoveEffect::Stat {
                target: EffectTarget::Target,
                stat: StageStat::Attack,
                stages: -1,
            }],
            ..data(GROWL, "growl", PokemonType::Normal, None)
        });
        for pokemon_type in [PokemonType::Normal, PokemonType::Electric, PokemonType::Water] {
            dex.insert_type(pokemon_type, TypeRelations::default());
        }
        dex.insert_type(
            PokemonType::Electric,
            TypeRelations {
                double_damage_to: vec![PokemonType::Water],
                no_damage_to: vec![PokemonType::Ground],
                ..Default::default()
            },
        );
        dex
    }

    fn select(state: BattleState, p1: BattleSelection, p2: BattleSelection) -> BattleState {
        state
            .with_selection(Side::Player1, Some(p1))
            .with_selection(Side::Player2, Some(p2))
    }

    fn attack(id: MoveId) -> BattleSelection {
        BattleSelection::Move(id, MoveTarget::Opponent(0))
    }

    fn run(state: &BattleState) -> super::TurnResolution {
        resolve(state, &dex(), &BattleSettings::default(), &mut StepRng::new(0, 0)).unwrap()
    }

    #[test]
    fn needs_both_actions() {
        let state = state().with_selection(Side::Player1, Some(attack(TACKLE)));
        assert_eq!(
            resolve(&state, &dex(), &BattleSettings::default(), &mut StepRng::new(0, 0)),
            Err(EngineError::NotReady)
        );
    }

    #[test]
    fn both_attack_in_speed_order() {
        let state = select(state(), attack(TACKLE), attack(TACKLE));
        let resolution = run(&state);

        assert_eq!(resolution.outcome, None);
        assert_eq!(resolution.xp, None);
        assert_eq!(
            resolution.events,
            vec![
                BattleEvent::MoveUsed {
                    player: Side::Player1,
                    pokemon_index: 0,
                    move_id: TACKLE,
                    target_index: MoveTarget::Opponent(0),
                },
                // base 38 at the lowest variance
                BattleEvent::Damage {
                    target: Side::Player2,
                    pokemon_index: 0,
                    amount: 32,
                    new_hp: 23,
                },
                BattleEvent::MoveUsed {
                    player: Side::Player2,
                    pokemon_index: 0,
                    move_id: TACKLE,
                    target_index: MoveTarget::Opponent(0),
                },
                BattleEvent::Damage {
                    target: Side::Player1,
                    pokemon_index: 0,
                    amount: 40,
                    new_hp: 0,
                },
                BattleEvent::PokemonFainted {
                    target: Side::Player1,
                    pokemon_index: 0,
                },
                BattleEvent::PokemonSwitch {
                    target: Side::Player1,
                    from_index: 0,
                    to_index: 1,
                    from_name: Some("Pikachu".to_owned()),
                    to_name: Some("Onix".to_owned()),
                },
            ]
        );

        // resolving never touches the input
        assert_eq!(state.event_log.len(), 0);
        assert_eq!(state.player1.team[0].current_hp, 35);
    }

    #[test]
    fn fainted_target_fails_move() {
        let mut state = select(state(), attack(TACKLE), attack(QUICK_ATTACK));
        // Eevee outpriorities and knocks Pikachu out with a single point left
        state.player_mut(Side::Player1).pokemon_mut(0).unwrap().current_hp = 1;
        state.player_mut(Side::Player1).team.truncate(1);

        let resolution = run(&state);
        assert!(resolution.events.contains(&BattleEvent::MoveFailed {
            player: Side::Player1,
            pokemon_index: 0,
            move_id: TACKLE,
            reason: "fainted".to_owned(),
        }));
        assert_eq!(resolution.outcome, Some(Outcome::Winner(Side::Player2)));
        assert_eq!(resolution.events.last(), Some(&BattleEvent::TurnEnd));
        // nobody on the losing side is left standing
        assert_eq!(
            resolution.xp,
            Some(XpAward {
                side: Side::Player2,
                pokemon_index: 0,
                amount: 0,
            })
        );
    }

    #[test]
    fn switch_happens_before_moves() {
        let state = select(state(), attack(QUICK_ATTACK), BattleSelection::Switch(1));
        let resolution = run(&state);
        assert!(matches!(
            resolution.events[0],
            BattleEvent::PokemonSwitch {
                target: Side::Player2,
                to_index: 1,
                ..
            }
        ));
        assert!(matches!(
            resolution.events[2],
            BattleEvent::Damage {
                target: Side::Player2,
                pokemon_index: 1,
                ..
            }
        ));
    }

    #[test]
    fn weather_moves_and_chip_damage() {
        let state = select(state(), attack(SANDSTORM), BattleSelection::Switch(1));
        let resolution = run(&state);
        assert!(resolution.events.contains(&BattleEvent::WeatherChange {
            weather_type: Some(WeatherKind::Sandstorm),
            turns_remaining: 5,
        }));
        // Pikachu and Lapras take an eighth, then the countdown
        let tail = &resolution.events[resolution.events.len() - 3..];
        assert_eq!(
            tail,
            [
                BattleEvent::Damage {
                    target: Side::Player1,
                    pokemon_index: 0,
                    amount: 4,
                    new_hp: 31,
                },
                BattleEvent::Damage {
                    target: Side::Player2,
                    pokemon_index: 1,
                    amount: 16,
                    new_hp: 114,
                },
                BattleEvent::WeatherChange {
                    weather_type: Some(WeatherKind::Sandstorm),
                    turns_remaining: 4,
                },
            ]
        );
    }

    #[test]
    fn expiring_weather_clears() {
        let state = select(
            state().apply_event(&BattleEvent::WeatherChange {
                weather_type: Some(WeatherKind::Rain),
                turns_remaining: 1,
            }),
            BattleSelection::Switch(1),
            BattleSelection::Switch(1),
        );
        let resolution = run(&state);
        assert_eq!(
            resolution.events.last(),
            Some(&BattleEvent::WeatherChange {
                weather_type: None,
                turns_remaining: 0,
            })
        );
        let after = state.apply_events(&resolution.events);
        assert_eq!(after.weather, None);
    }

    #[test]
    fn secondary_effects() {
        let state = select(state(), attack(NUZZLE), attack(GROWL));
        let resolution = run(&state);
        assert!(resolution.events.contains(&BattleEvent::StatusApply {
            target: Side::Player2,
            pokemon_index: 0,
            status: Status::Paralysis,
        }));
        assert!(resolution.events.contains(&BattleEvent::StatChange {
            target: Side::Player1,
            pokemon_index: 0,
            stat: StageStat::Attack,
            stages: -1,
        }));
    }

    #[test]
    fn missing_move_data_fails_whole_turn() {
        let state = select(state(), attack(MoveId(999)), attack(TACKLE));
        assert_eq!(
            resolve(&state, &dex(), &BattleSettings::default(), &mut StepRng::new(0, 0)),
            Err(EngineError::Rules(RulesError::MissingMove(MoveId(999))))
        );
    }

    #[test]
    fn missing_type_chart_is_neutral() {
        let state = select(state(), attack(TACKLE), attack(TACKLE));
        let mut dex = dex();
        dex.types.clear();
        let resolution = resolve(&state, &dex, &BattleSettings::default(), &mut StepRng::new(0, 0)).unwrap();
        assert_eq!(resolution.events, run(&state).events);
    }

    #[test]
    fn xp_counts_standing_losers() {
        let state = state().apply_event(&BattleEvent::PokemonFainted {
            target: Side::Player2,
            pokemon_index: 0,
        });
        assert_eq!(xp_award(&state, Side::Player1).amount, 1000);
    }
}
