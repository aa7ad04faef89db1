//! Per-peer battle session.
//!
//! A [`BattleController`] owns the local snapshot and the transport to the
//! other peer. The host (player 1) resolves turns and broadcasts the events;
//! the guest (player 2) applies whatever the host sends, in sequence order.

use core::fmt::{Display, Formatter, Result as FmtResult};
use log::{debug, error, info, trace, warn};
use rand::Rng;
use serde_json::Value;

use crate::{
    data::BattleSettings,
    endpoint::{ConnectionError, Transport},
    event::{BattleEvent, Side},
    host::{self, EngineError, XpAward},
    message::{Envelope, ErrorCode, Message, MessageError, MessageType},
    moves::{MoveId, MoveTarget},
    pokemon::RosterPokemon,
    roster::{self, Roster},
    rules::RulesData,
    select::{BattleSelection, SelectError},
    state::{BattleState, Outcome, Phase},
};

mod observer;
mod sequence;

pub use observer::BattleObserver;
pub use sequence::{Sequence, SequenceTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Host,
    Guest,
}

impl Role {
    pub fn side(&self) -> Side {
        match self {
            Self::Host => Side::Player1,
            Self::Guest => Side::Player2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnStage {
    /// Selections are open.
    WaitingForBoth,
    Resolving,
    Broadcasting,
    Ended,
    /// The connection is gone.
    Interrupted,
}

#[derive(Debug)]
pub enum ControllerError {
    Select(SelectError),
    Message(MessageError),
    Engine(EngineError),
    Connection(ConnectionError),
    Sync(serde_json::Error),
    /// The message is not accepted by this role or at this stage.
    OutOfProtocol(MessageType),
}

impl ControllerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Select(..) => ErrorCode::InvalidSelection,
            Self::Message(..) | Self::Connection(..) => ErrorCode::MessageError,
            Self::Engine(..) => ErrorCode::TurnFailed,
            Self::Sync(..) => ErrorCode::SyncParseError,
            Self::OutOfProtocol(..) => ErrorCode::OutOfProtocol,
        }
    }
}

impl std::error::Error for ControllerError {}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Select(err) => Display::fmt(err, f),
            Self::Message(err) => Display::fmt(err, f),
            Self::Engine(err) => Display::fmt(err, f),
            Self::Connection(err) => Display::fmt(err, f),
            Self::Sync(err) => write!(f, "could not read synced state: {}", err),
            Self::OutOfProtocol(kind) => write!(f, "{} is not expected here", kind),
        }
    }
}

impl From<SelectError> for ControllerError {
    fn from(err: SelectError) -> Self {
        Self::Select(err)
    }
}

impl From<MessageError> for ControllerError {
    fn from(err: MessageError) -> Self {
        Self::Message(err)
    }
}

impl From<EngineError> for ControllerError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<ConnectionError> for ControllerError {
    fn from(err: ConnectionError) -> Self {
        Self::Connection(err)
    }
}

pub struct BattleController<T: Transport, R: Rng> {
    role: Role,
    state: BattleState,
    stage: TurnStage,
    sequence: SequenceTracker,
    settings: BattleSettings,
    transport: T,
    random: R,
    rules: Box<dyn RulesData>,
    roster: Option<Box<dyn Roster>>,
    observers: Vec<Box<dyn BattleObserver>>,
    opponent_name: Option<String>,
}

impl<T: Transport, R: Rng> BattleController<T, R> {
    pub fn new(
        role: Role,
        state: BattleState,
        transport: T,
        rules: impl RulesData + 'static,
        random: R,
    ) -> Self {
        Self {
            role,
            stage: derive_stage(&state),
            sequence: SequenceTracker::new(state.sequence_number),
            state,
            settings: Default::default(),
            transport,
            random,
            rules: Box::new(rules),
            roster: None,
            observers: Vec::new(),
            opponent_name: None,
        }
    }

    pub fn with_settings(mut self, settings: BattleSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Experience is applied to this roster.
    pub fn with_roster(mut self, roster: impl Roster + 'static) -> Self {
        self.roster = Some(Box::new(roster));
        self
    }

    pub fn observe(&mut self, observer: impl BattleObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn side(&self) -> Side {
        self.role.side()
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    pub fn stage(&self) -> TurnStage {
        self.stage
    }

    pub fn opponent_name(&self) -> Option<&str> {
        self.opponent_name.as_deref()
    }

    pub fn roster(&self) -> Option<&dyn Roster> {
        self.roster.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn settings(&self) -> &BattleSettings {
        &self.settings
    }

    /// Sends the local player's name and team.
    pub fn announce(&mut self, account_name: &str, team: &[RosterPokemon]) -> Result<(), ControllerError> {
        self.send(Message::AccountName {
            account_name: account_name.to_owned(),
        })?;
        self.send(Message::TeamSelected {
            team: team.to_vec(),
        })
    }

    /// Guest only. Asks the host for its authoritative state.
    pub fn ready(&mut self) -> Result<(), ControllerError> {
        if self.role != Role::Guest {
            return Ok(());
        }
        let account_id = self.state.player(self.side()).account_id.clone();
        self.send(Message::Ready { account_id })
    }

    pub fn select_move(&mut self, move_id: MoveId, target: MoveTarget) -> Result<(), ControllerError> {
        self.select(BattleSelection::Move(move_id, target))
    }

    pub fn select_switch(&mut self, index: usize) -> Result<(), ControllerError> {
        self.select(BattleSelection::Switch(index))
    }

    fn select(&mut self, selection: BattleSelection) -> Result<(), ControllerError> {
        let side = self.side();
        if !self.accepts_selection(side) {
            return Err(SelectError::NotSelecting.into());
        }
        self.state.player(side).validate(&selection)?;

        debug!("{} selected {}", side, selection);
        self.commit(self.state.with_selection(side, Some(selection)));

        match self.role {
            Role::Guest => self.send(match selection {
                BattleSelection::Move(move_id, target_index) => Message::MoveSelected {
                    move_id,
                    target_index,
                },
                BattleSelection::Switch(new_pokemon_index) => Message::SwitchSelected { new_pokemon_index },
            }),
            Role::Host => self.try_resolve(),
        }
    }

    fn accepts_selection(&self, side: Side) -> bool {
        self.stage == TurnStage::WaitingForBoth
            && self.state.phase == Phase::Selection
            && !self.state.player(side).has_acted()
    }

    /// Drains every message the transport has ready.
    pub fn update(&mut self) {
        while self.stage != TurnStage::Interrupted {
            match self.transport.receive() {
                Ok(Some(value)) => {
                    if let Err(err) = self.handle_message(value) {
                        debug!("Handled message with error: {}", err);
                    }
                }
                Ok(None) => break,
                Err(..) => self.on_connection_closed(),
            }
        }
    }

    /// Handles one inbound message. Failures are answered with an ERROR to the
    /// peer and leave the local state as it was.
    pub fn handle_message(&mut self, value: Value) -> Result<(), ControllerError> {
        if self.stage == TurnStage::Interrupted {
            return Ok(());
        }

        let result = Envelope::decode(value)
            .map_err(ControllerError::from)
            .and_then(|envelope| {
                trace!("{} received {}", self.side(), envelope.message.kind());
                self.dispatch(envelope.message)
            });

        if let Err(err) = &result {
            match err {
                // turn failures are reported by the resolution itself
                ControllerError::Connection(..) | ControllerError::Engine(..) => (),
                err => {
                    warn!("Rejected message from peer: {}", err);
                    let reply = Message::error(err.code(), err);
                    if let Err(err) = self.send(reply) {
                        debug!("Could not report error to peer: {}", err);
                    }
                }
            }
        }

        result
    }

    fn dispatch(&mut self, message: Message) -> Result<(), ControllerError> {
        let kind = message.kind();
        match (self.role, message) {
            (Role::Host, Message::Ready { account_id }) => {
                info!("{} is ready", account_id);
                self.send_full_sync()
            }
            (Role::Guest, Message::Ready { .. }) => Ok(()),
            (_, Message::TeamSelected { team }) => {
                if self.state.turn_number != 0 || self.state.sequence_number != 0 {
                    return Err(ControllerError::OutOfProtocol(kind));
                }
                let next = self.state.with_team(self.side().opponent(), &team);
                self.commit(next);
                Ok(())
            }
            (_, Message::AccountName { account_name }) => {
                for observer in self.observers.iter_mut() {
                    observer.on_opponent_name(&account_name);
                }
                self.opponent_name = Some(account_name);
                Ok(())
            }
            (Role::Host, Message::MoveSelected { move_id, target_index }) => {
                self.remote_selection(BattleSelection::Move(move_id, target_index))
            }
            (Role::Host, Message::SwitchSelected { new_pokemon_index }) => {
                self.remote_selection(BattleSelection::Switch(new_pokemon_index))
            }
            (Role::Guest, Message::MoveSelected { .. } | Message::SwitchSelected { .. }) => {
                trace!("Ignoring {} sent to the guest", kind);
                Ok(())
            }
            (Role::Guest, Message::TurnStart {
                turn_number,
                sequence_number,
            }) => {
                if self.state.is_over() {
                    return Err(ControllerError::OutOfProtocol(kind));
                }
                self.stage = TurnStage::Resolving;
                self.commit(self.state.adopt_turn(turn_number, sequence_number));
                Ok(())
            }
            (Role::Guest, Message::BattleEvent {
                sequence_number,
                events,
            }) => self.apply_batch(sequence_number, events),
            (Role::Guest, Message::TurnEnd { turn_number, .. }) => {
                let next = self.state.begin_turn();
                let desynced = next.turn_number != turn_number;
                self.commit(next);
                self.stage = derive_stage(&self.state);
                if desynced {
                    warn!(
                        "Host ended turn {} but local turn is {}",
                        turn_number, self.state.turn_number
                    );
                    return self.request_sync();
                }
                if self.settings.verify_state_hash {
                    self.send(Message::StateHash {
                        hash: self.state.digest(),
                        turn_number: self.state.turn_number,
                    })?;
                }
                Ok(())
            }
            (Role::Guest, Message::BattleEnd { winner, .. }) => {
                info!("Battle over, winner: {:?}", winner);
                self.commit(self.state.end_battle());
                self.stage = TurnStage::Ended;
                Ok(())
            }
            (Role::Guest, Message::XpGain {
                xp_amount,
                pokemon_index,
            }) => {
                self.award_local(XpAward {
                    side: self.side(),
                    pokemon_index,
                    amount: xp_amount,
                });
                Ok(())
            }
            (_, Message::FullSync { state_json }) => {
                let state = BattleState::from_json(&state_json).map_err(ControllerError::Sync)?;
                info!("Adopting full state at turn {}", state.turn_number);
                self.sequence.reset(state.sequence_number);
                self.stage = derive_stage(&state);
                self.commit(state);
                Ok(())
            }
            (Role::Host, Message::SyncRequest { current_turn }) => {
                info!("Peer at turn {} asked for a full sync", current_turn);
                self.send_full_sync()
            }
            (Role::Host, Message::StateHash { hash, turn_number }) => {
                if turn_number != self.state.turn_number {
                    trace!("Ignoring state hash for stale turn {}", turn_number);
                    return Ok(());
                }
                if hash == self.state.digest() {
                    return Ok(());
                }
                warn!("Peer state diverged at turn {}, resyncing", turn_number);
                self.send_full_sync()
            }
            (_, Message::Heartbeat) => self.send(Message::Ack {
                acknowledges: MessageType::Heartbeat,
            }),
            (_, Message::Ack { acknowledges }) => {
                trace!("Peer acknowledged {}", acknowledges);
                Ok(())
            }
            (_, Message::Error { code, message }) => {
                warn!("Peer reported {:?}: {}", code, message);
                for observer in self.observers.iter_mut() {
                    observer.on_peer_error(code, &message);
                }
                Ok(())
            }
            _ => Err(ControllerError::OutOfProtocol(kind)),
        }
    }

    fn remote_selection(&mut self, selection: BattleSelection) -> Result<(), ControllerError> {
        let side = self.side().opponent();
        if !self.accepts_selection(side) {
            return Err(ControllerError::OutOfProtocol(match selection {
                BattleSelection::Move(..) => MessageType::MoveSelected,
                BattleSelection::Switch(..) => MessageType::SwitchSelected,
            }));
        }
        self.state.player(side).validate(&selection)?;
        debug!("{} selected {}", side, selection);
        self.commit(self.state.with_selection(side, Some(selection)));
        self.try_resolve()
    }

    fn apply_batch(&mut self, sequence_number: u64, events: Vec<BattleEvent>) -> Result<(), ControllerError> {
        match self.sequence.check(sequence_number) {
            Sequence::Next => {
                self.stage = TurnStage::Broadcasting;
                let next = self.state.apply_events(&events);
                self.sequence.applied(sequence_number);
                self.notify_events(&events);
                self.commit(next);
                Ok(())
            }
            Sequence::Duplicate => {
                warn!("Ignoring duplicate batch {}", sequence_number);
                Ok(())
            }
            Sequence::Gap { expected } => {
                warn!("Expected batch {} but got {}, requesting sync", expected, sequence_number);
                self.request_sync()
            }
        }
    }

    /// Host only. Resolves the turn once both players have acted.
    fn try_resolve(&mut self) -> Result<(), ControllerError> {
        if self.role != Role::Host || !self.state.both_acted() {
            return Ok(());
        }

        self.stage = TurnStage::Resolving;

        let resolving = self.state.resolve_turn();
        self.commit(resolving.clone());
        self.send(Message::TurnStart {
            turn_number: resolving.turn_number,
            sequence_number: resolving.sequence_number,
        })?;

        let resolution = match host::resolve(&resolving, self.rules.as_ref(), &self.settings, &mut self.random) {
            Ok(resolution) => resolution,
            Err(err) => {
                error!("Turn {} failed: {}", resolving.turn_number + 1, err);
                // the batch number stays spent so sequences never go backwards
                let rolled_back = resolving.cancel_turn();
                self.stage = derive_stage(&rolled_back);
                self.commit(rolled_back);
                self.send(Message::error(ErrorCode::TurnFailed, &err))?;
                self.send_full_sync()?;
                return Err(err.into());
            }
        };

        self.stage = TurnStage::Broadcasting;
        let applied = resolving.apply_events(&resolution.events);
        self.sequence.applied(applied.sequence_number);
        self.notify_events(&resolution.events);
        self.commit(applied);

        self.send(Message::BattleEvent {
            sequence_number: self.state.sequence_number,
            events: resolution.events,
        })?;

        match resolution.outcome {
            Some(outcome) => {
                self.finish(outcome)?;
                if let Some(award) = resolution.xp {
                    self.deliver_xp(award)?;
                }
                Ok(())
            }
            None => {
                self.commit(self.state.begin_turn());
                self.stage = TurnStage::WaitingForBoth;
                info!("Turn {} resolved", self.state.turn_number);
                self.send(Message::TurnEnd {
                    turn_number: self.state.turn_number,
                    sequence_number: self.state.sequence_number,
                })
            }
        }
    }

    /// Host only. Ends the battle and tells the guest.
    fn finish(&mut self, outcome: Outcome) -> Result<(), ControllerError> {
        let winner = outcome.winner();
        info!("Battle over, winner: {:?}", winner);

        self.commit(self.state.end_battle());
        self.stage = TurnStage::Ended;
        self.send(Message::BattleEnd {
            winner,
            loser: winner.map(|winner| winner.opponent()),
        })
    }

    fn deliver_xp(&mut self, award: XpAward) -> Result<(), ControllerError> {
        if award.side == self.side() {
            self.award_local(award);
            return Ok(());
        }
        self.send(Message::XpGain {
            xp_amount: award.amount,
            pokemon_index: award.pokemon_index,
        })
    }

    fn award_local(&mut self, award: XpAward) {
        let local = match self.roster.as_deref_mut() {
            Some(local) => local,
            None => {
                debug!("No roster to award {} xp to", award.amount);
                return;
            }
        };
        if let Some(new_level) = roster::award(local, award.pokemon_index, award.amount) {
            let event = BattleEvent::LevelUp {
                target: award.side,
                pokemon_index: award.pokemon_index,
                new_level,
            };
            for observer in self.observers.iter_mut() {
                observer.on_level_up(&event);
            }
        }
    }

    fn request_sync(&mut self) -> Result<(), ControllerError> {
        self.send(Message::SyncRequest {
            current_turn: self.state.turn_number,
        })
    }

    fn send_full_sync(&mut self) -> Result<(), ControllerError> {
        let state_json = self.state.to_json().map_err(MessageError::from)?;
        self.send(Message::FullSync { state_json })
    }

    fn send(&mut self, message: Message) -> Result<(), ControllerError> {
        trace!("{} sending {}", self.side(), message.kind());
        match self.transport.send(&Envelope::new(message)) {
            Ok(()) => Ok(()),
            Err(ConnectionError::Disconnected) => {
                self.on_connection_closed();
                Err(ConnectionError::Disconnected.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn commit(&mut self, state: BattleState) {
        self.state = state;
        for observer in self.observers.iter_mut() {
            observer.on_state_change(&self.state);
        }
    }

    fn notify_events(&mut self, events: &[BattleEvent]) {
        for event in events {
            for observer in self.observers.iter_mut() {
                observer.on_battle_event(event);
            }
        }
    }

    /// The transport closed. There is no reconnection.
    pub fn on_connection_closed(&mut self) {
        if self.stage == TurnStage::Interrupted {
            return;
        }
        warn!("Connection to peer closed");
        self.stage = TurnStage::Interrupted;
        for observer in self.observers.iter_mut() {
            observer.on_interrupted();
        }
    }

    /// Closes the session locally. Later inbound messages are ignored.
    pub fn close(&mut self) {
        debug!("Closing battle {}", self.state.battle_id);
        self.stage = TurnStage::Interrupted;
    }
}

fn derive_stage(state: &BattleState) -> TurnStage {
    match state.phase {
        Phase::Selection => TurnStage::WaitingForBoth,
        Phase::Resolution => TurnStage::Resolving,
        Phase::Ended => TurnStage::Ended,
    }
}
