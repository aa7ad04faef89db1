use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};

use crate::moves::{MoveId, MoveTarget};

/// The single action a player commits to for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BattleSelection {
    /// Move ID, and its target.
    Move(MoveId, MoveTarget),
    /// Switch to another pokemon with its team slot.
    Switch(usize),
}

/// Why a local selection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectError {
    /// Active pokemon does not know the move.
    UnknownMove(MoveId),
    /// Switch slot is empty, fainted or already active.
    InvalidSwitch(usize),
    NotSelecting,
}

impl std::error::Error for SelectError {}

impl Display for SelectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::UnknownMove(id) => write!(f, "active pokemon does not know move {}", id),
            Self::InvalidSwitch(index) => write!(f, "cannot switch to team slot {}", index),
            Self::NotSelecting => f.write_str("battle is not accepting selections"),
        }
    }
}

impl Display for BattleSelection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Move(id, ..) => write!(f, "Move {}", id),
            Self::Switch(index) => write!(f, "Switch to {}", index),
        }
    }
}
