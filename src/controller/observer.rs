use crate::{event::BattleEvent, message::ErrorCode, state::BattleState};

/// Receives notifications from a [`BattleController`](super::BattleController).
///
/// Every method does nothing by default.
pub trait BattleObserver {
    /// The local snapshot was replaced.
    fn on_state_change(&mut self, _state: &BattleState) {}

    fn on_battle_event(&mut self, _event: &BattleEvent) {}

    fn on_opponent_name(&mut self, _name: &str) {}

    /// A roster pokemon levelled up from experience. Carries a [`BattleEvent::LevelUp`].
    fn on_level_up(&mut self, _event: &BattleEvent) {}

    fn on_peer_error(&mut self, _code: ErrorCode, _message: &str) {}

    /// The transport closed before the battle ended.
    fn on_interrupted(&mut self) {}
}
