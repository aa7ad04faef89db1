use core::cmp::Reverse;
use std::collections::BTreeMap;

use crate::{
    event::Side,
    moves::Priority,
    pokemon::stat::{BaseStat, Stat},
    rules::RulesData,
    select::BattleSelection,
    state::BattleState,
};

use super::EngineError;

/// Switches go before every move. Moves are ordered by priority, then speed,
/// then side.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MovePriority {
    First(Side),
    Second(Reverse<Priority>, Reverse<BaseStat>, Side),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedAction {
    pub side: Side,
    pub action: BattleSelection,
}

pub fn move_queue(state: &BattleState, rules: &dyn RulesData) -> Result<Vec<QueuedAction>, EngineError> {
    let mut queue = BTreeMap::new();

    for side in Side::ALL {
        let player = state.player(side);
        let action = match player.selection {
            Some(action) => action,
            None => return Err(EngineError::NotReady),
        };

        let priority = match action {
            BattleSelection::Move(id, ..) => {
                let active = player.active().ok_or(EngineError::MissingPokemon(side))?;
                let data = rules.move_data(&id)?;
                MovePriority::Second(
                    Reverse(data.priority),
                    Reverse(active.stat(Stat::Speed)),
                    side,
                )
            }
            BattleSelection::Switch(..) => MovePriority::First(side),
        };

        queue.insert(priority, QueuedAction { side, action });
    }

    Ok(queue.into_values().collect())
}
