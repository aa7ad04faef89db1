use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    event::Side,
    moves::{MoveId, MoveTarget},
    pokemon::{BattlePokemon, RosterPokemon},
    select::{BattleSelection, SelectError},
};

pub const MAX_TEAM_SIZE: usize = 6;

/// One side of a battle.
///
/// Team members sit behind [`Arc`]s so that snapshots share every pokemon
/// that an event did not touch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattlePlayer {
    pub account_id: String,
    pub side: Side,
    pub team: Vec<Arc<BattlePokemon>>,
    pub active_pokemon_index: usize,
    /// This turn's committed action.
    #[serde(default)]
    pub selection: Option<BattleSelection>,
}

impl BattlePlayer {
    pub fn new(account_id: impl Into<String>, side: Side, team: &[RosterPokemon]) -> Self {
        Self {
            account_id: account_id.into(),
            side,
            team: Self::battle_team(team),
            active_pokemon_index: 0,
            selection: None,
        }
    }

    pub(crate) fn battle_team(team: &[RosterPokemon]) -> Vec<Arc<BattlePokemon>> {
        team.iter()
            .take(MAX_TEAM_SIZE)
            .enumerate()
            .map(|(index, pokemon)| Arc::new(BattlePokemon::new(pokemon, index)))
            .collect()
    }

    pub fn active(&self) -> Option<&BattlePokemon> {
        self.pokemon(self.active_pokemon_index)
    }

    pub fn pokemon(&self, index: usize) -> Option<&BattlePokemon> {
        self.team.get(index).map(Arc::as_ref)
    }

    /// Copies the pokemon out of shared storage if another snapshot still holds it.
    pub(crate) fn pokemon_mut(&mut self, index: usize) -> Option<&mut BattlePokemon> {
        self.team.get_mut(index).map(Arc::make_mut)
    }

    pub fn has_acted(&self) -> bool {
        self.selection.is_some()
    }

    pub fn selected_move(&self) -> Option<(MoveId, MoveTarget)> {
        match self.selection {
            Some(BattleSelection::Move(id, target)) => Some((id, target)),
            _ => None,
        }
    }

    pub fn selected_switch(&self) -> Option<usize> {
        match self.selection {
            Some(BattleSelection::Switch(index)) => Some(index),
            _ => None,
        }
    }

    pub fn all_fainted(&self) -> bool {
        self.team.iter().all(|pokemon| pokemon.fainted())
    }

    /// First healthy teammate, used for forced replacements.
    pub fn first_healthy(&self) -> Option<&BattlePokemon> {
        self.team
            .iter()
            .map(Arc::as_ref)
            .find(|pokemon| !pokemon.fainted())
    }

    /// Checks a selection against the current team.
    pub fn validate(&self, selection: &BattleSelection) -> Result<(), SelectError> {
        match selection {
            BattleSelection::Move(id, ..) => match self.active() {
                Some(active) if active.knows(id) => Ok(()),
                _ => Err(SelectError::UnknownMove(*id)),
            },
            BattleSelection::Switch(index) => match self.pokemon(*index) {
                Some(pokemon) if !pokemon.fainted() && *index != self.active_pokemon_index => Ok(()),
                _ => Err(SelectError::InvalidSwitch(*index)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BattlePlayer;
    use crate::{
        event::Side,
        moves::{MoveId, MoveTarget},
        pokemon::{tests::roster, PokemonType},
        select::{BattleSelection, SelectError},
    };

    fn player() -> BattlePlayer {
        BattlePlayer::new(
            "ash",
            Side::Player1,
            &[
                roster("Pikachu", &[PokemonType::Electric], 35, 55, 40, 90),
                roster("Onix", &[PokemonType::Rock, PokemonType::Ground], 35, 45, 160, 70),
            ],
        )
    }

    #[test]
    fn validates_selections() {
        let mut player = player();
        assert!(player
            .validate(&BattleSelection::Move(MoveId(1), MoveTarget::Opponent(0)))
            .is_ok());
        assert_eq!(
            player.validate(&BattleSelection::Move(MoveId(2), MoveTarget::Opponent(0))),
            Err(SelectError::UnknownMove(MoveId(2)))
        );
        assert!(player.validate(&BattleSelection::Switch(1)).is_ok());
        assert_eq!(player.validate(&BattleSelection::Switch(0)), Err(SelectError::InvalidSwitch(0)));
        assert_eq!(player.validate(&BattleSelection::Switch(6)), Err(SelectError::InvalidSwitch(6)));

        player.pokemon_mut(1).unwrap().is_fainted = true;
        assert_eq!(player.validate(&BattleSelection::Switch(1)), Err(SelectError::InvalidSwitch(1)));
        assert_eq!(player.first_healthy().map(|p| p.index), Some(0));
    }

    #[test]
    fn selection_is_exclusive() {
        let mut player = player();
        assert!(!player.has_acted());
        player.selection = Some(BattleSelection::Switch(1));
        assert!(player.has_acted());
        assert_eq!(player.selected_switch(), Some(1));
        assert_eq!(player.selected_move(), None);
    }
}
