//! Immutable battle snapshots and the pure event application functions.

use core::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    event::{BattleEvent, Side},
    player::BattlePlayer,
    pokemon::{BattlePokemon, RosterPokemon},
    select::BattleSelection,
};

pub mod field;
mod history;

pub use history::EventLog;
use field::{Terrain, Weather};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BattleId(pub String);

impl BattleId {
    pub fn generate(timestamp: u64, random: &mut impl Rng) -> Self {
        Self(format!("battle_{}_{:08x}", timestamp, random.gen::<u32>()))
    }
}

impl Display for BattleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Selection,
    Resolution,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Winner(Side),
    Draw,
}

impl Outcome {
    pub fn winner(&self) -> Option<Side> {
        match self {
            Self::Winner(side) => Some(*side),
            Self::Draw => None,
        }
    }
}

/// Complete snapshot of a two player battle.
///
/// Every operation takes `&self` and returns a new snapshot. Clones share
/// players, pokemon and history; only the path an event touches is copied.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleState {
    pub battle_id: BattleId,
    pub player1: Arc<BattlePlayer>,
    pub player2: Arc<BattlePlayer>,
    /// Completed resolutions
    pub turn_number: u32,
    /// Host broadcast batches
    pub sequence_number: u64,
    pub phase: Phase,
    pub weather: Option<Weather>,
    pub terrain: Option<Terrain>,
    pub event_log: EventLog,
}

impl BattleState {
    pub fn new(
        battle_id: BattleId,
        player1: (impl Into<String>, &[RosterPokemon]),
        player2: (impl Into<String>, &[RosterPokemon]),
    ) -> Self {
        Self {
            battle_id,
            player1: Arc::new(BattlePlayer::new(player1.0, Side::Player1, player1.1)),
            player2: Arc::new(BattlePlayer::new(player2.0, Side::Player2, player2.1)),
            turn_number: 0,
            sequence_number: 0,
            phase: Phase::Selection,
            weather: None,
            terrain: None,
            event_log: EventLog::default(),
        }
    }

    pub fn player(&self, side: Side) -> &BattlePlayer {
        match side {
            Side::Player1 => &self.player1,
            Side::Player2 => &self.player2,
        }
    }

    pub(crate) fn player_mut(&mut self, side: Side) -> &mut BattlePlayer {
        Arc::make_mut(match side {
            Side::Player1 => &mut self.player1,
            Side::Player2 => &mut self.player2,
        })
    }

    pub fn active(&self, side: Side) -> Option<&BattlePokemon> {
        self.player(side).active()
    }

    pub fn both_acted(&self) -> bool {
        self.player1.has_acted() && self.player2.has_acted()
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::Ended
    }

    /// Applies one event, returning the new snapshot.
    pub fn apply_event(&self, event: &BattleEvent) -> Self {
        let mut next = self.clone();
        next.apply_in_place(event);
        next
    }

    pub fn apply_events<'a>(&self, events: impl IntoIterator<Item = &'a BattleEvent>) -> Self {
        let mut next = self.clone();
        for event in events {
            next.apply_in_place(event);
        }
        next
    }

    fn apply_in_place(&mut self, event: &BattleEvent) {
        match event {
            BattleEvent::Damage {
                target,
                pokemon_index,
                new_hp,
                ..
            } => {
                if let Some(pokemon) = self.pokemon_mut(*target, *pokemon_index) {
                    pokemon.current_hp = (*new_hp).min(pokemon.max_hp);
                }
            }
            BattleEvent::StatusApply {
                target,
                pokemon_index,
                status,
            } => {
                if let Some(pokemon) = self.pokemon_mut(*target, *pokemon_index) {
                    pokemon.status = Some(*status);
                }
            }
            BattleEvent::StatusRemove {
                target,
                pokemon_index,
                ..
            } => {
                if let Some(pokemon) = self.pokemon_mut(*target, *pokemon_index) {
                    pokemon.status = None;
                }
            }
            BattleEvent::PokemonFainted {
                target,
                pokemon_index,
            } => {
                if let Some(pokemon) = self.pokemon_mut(*target, *pokemon_index) {
                    pokemon.is_fainted = true;
                    pokemon.current_hp = 0;
                }
            }
            BattleEvent::PokemonSwitch {
                target, to_index, ..
            } => {
                let available = matches!(
                    self.player(*target).pokemon(*to_index),
                    Some(pokemon) if !pokemon.fainted()
                );
                if available {
                    self.player_mut(*target).active_pokemon_index = *to_index;
                } else {
                    warn!("Ignoring switch of {} into unavailable slot {}", target, to_index);
                }
            }
            BattleEvent::StatChange {
                target,
                pokemon_index,
                stat,
                stages,
            } => {
                if let Some(pokemon) = self.pokemon_mut(*target, *pokemon_index) {
                    pokemon.stat_stages.change_stage(*stat, *stages);
                }
            }
            BattleEvent::WeatherChange {
                weather_type,
                turns_remaining,
            } => {
                self.weather = weather_type.map(|kind| Weather::new(kind, *turns_remaining));
            }
            BattleEvent::StatusDamage { .. }
            | BattleEvent::MoveUsed { .. }
            | BattleEvent::MoveMissed { .. }
            | BattleEvent::MoveFailed { .. }
            | BattleEvent::TurnStart
            | BattleEvent::TurnEnd
            | BattleEvent::LevelUp { .. } => (),
        }
        self.event_log.push(event.clone());
    }

    fn pokemon_mut(&mut self, side: Side, index: usize) -> Option<&mut BattlePokemon> {
        if self.player(side).pokemon(index).is_none() {
            warn!("Event targets missing pokemon {} #{}", side, index);
            return None;
        }
        self.player_mut(side).pokemon_mut(index)
    }

    /// Clears both selections and opens the next turn.
    pub fn begin_turn(&self) -> Self {
        let mut next = self.clone();
        if next.is_over() {
            return next;
        }
        next.turn_number += 1;
        next.phase = Phase::Selection;
        next.clear_selections();
        next
    }

    /// Marks a new host batch and enters resolution.
    pub fn resolve_turn(&self) -> Self {
        let mut next = self.clone();
        if next.is_over() {
            return next;
        }
        next.sequence_number += 1;
        next.phase = Phase::Resolution;
        next
    }

    /// Follows a turn the host has announced.
    pub(crate) fn adopt_turn(&self, turn_number: u32, sequence_number: u64) -> Self {
        let mut next = self.clone();
        if next.is_over() {
            return next;
        }
        next.turn_number = turn_number;
        next.sequence_number = sequence_number;
        next.phase = Phase::Resolution;
        next
    }

    /// Ends the battle. Pending selections are dropped so both peers finish on the same snapshot.
    pub fn end_battle(&self) -> Self {
        let mut next = self.clone();
        next.phase = Phase::Ended;
        next.clear_selections();
        next
    }

    /// Abandons a turn that could not be resolved. Counters are kept.
    pub(crate) fn cancel_turn(&self) -> Self {
        let mut next = self.clone();
        if next.is_over() {
            return next;
        }
        next.phase = Phase::Selection;
        next.clear_selections();
        next
    }

    fn clear_selections(&mut self) {
        for side in Side::ALL {
            if self.player(side).has_acted() {
                self.player_mut(side).selection = None;
            }
        }
    }

    /// Decided strictly by fainted flags: HP can hit zero before the faint event lands.
    pub fn winner(&self) -> Option<Outcome> {
        match (self.player1.all_fainted(), self.player2.all_fainted()) {
            (false, true) => Some(Outcome::Winner(Side::Player1)),
            (true, false) => Some(Outcome::Winner(Side::Player2)),
            (true, true) => Some(Outcome::Draw),
            (false, false) => None,
        }
    }

    pub(crate) fn with_selection(&self, side: Side, selection: Option<BattleSelection>) -> Self {
        let mut next = self.clone();
        next.player_mut(side).selection = selection;
        next
    }

    /// Replaces a side's team before the first turn.
    pub(crate) fn with_team(&self, side: Side, team: &[RosterPokemon]) -> Self {
        let mut next = self.clone();
        let player = next.player_mut(side);
        player.team = BattlePlayer::battle_team(team);
        player.active_pokemon_index = 0;
        player.selection = None;
        debug!("Installed team of {} for {}", team.len(), side);
        next
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// SHA-256 of everything both peers must agree on.
    ///
    /// Battle id, pending selections and the history are left out: they
    /// legitimately differ between a host and a guest that are in sync.
    pub fn digest(&self) -> String {
        #[derive(Serialize)]
        struct Projection<'a> {
            turn: u32,
            sequence: u64,
            phase: Phase,
            weather: &'a Option<Weather>,
            terrain: &'a Option<Terrain>,
            sides: [(usize, &'a [Arc<BattlePokemon>]); 2],
        }

        let projection = Projection {
            turn: self.turn_number,
            sequence: self.sequence_number,
            phase: self.phase,
            weather: &self.weather,
            terrain: &self.terrain,
            sides: [
                (self.player1.active_pokemon_index, self.player1.team.as_slice()),
                (self.player2.active_pokemon_index, self.player2.team.as_slice()),
            ],
        };

        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&projection).unwrap_or_default());
        format!("{:x}", hasher.finalize())
    }
}
