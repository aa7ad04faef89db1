//! Host-authoritative peer-to-peer Pokemon battles
//!
//! Two peers keep identical [`state::BattleState`] snapshots. The host
//! resolves every turn with [`host::resolve`] and broadcasts the resulting
//! [`event::BattleEvent`]s; the guest applies them in sequence order. Both
//! sides are driven through a [`controller::BattleController`].

pub mod controller;
pub mod data;
pub mod endpoint;
pub mod event;
pub mod host;
pub mod message;
pub mod moves;
pub mod player;
pub mod pokemon;
pub mod roster;
pub mod rules;
pub mod select;
pub mod state;

pub mod prelude {

    pub use crate::controller::{BattleController, BattleObserver, ControllerError, Role, TurnStage};
    pub use crate::data::BattleSettings;
    pub use crate::endpoint::{ConnectionError, Transport};
    #[cfg(feature = "mpsc_transport")]
    pub use crate::endpoint::{channel, ChannelTransport};
    pub use crate::event::{BattleEvent, Side};
    pub use crate::message::{Envelope, ErrorCode, Message, MessageType};
    pub use crate::moves::{MoveData, MoveId, MoveTarget};
    pub use crate::pokemon::{BattlePokemon, RosterPokemon};
    pub use crate::roster::{MemoryRoster, Roster};
    pub use crate::rules::{RulesData, RulesDex};
    pub use crate::select::BattleSelection;
    pub use crate::state::{BattleId, BattleState, Outcome, Phase};

}
