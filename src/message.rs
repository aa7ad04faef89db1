//! Wire messages exchanged between the two peers.
//!
//! Every message travels as a JSON object `{ "type": .., "timestamp": .., ..fields }`.
//! Inbound JSON is checked by [`validate`] before it is decoded, so malformed
//! input always surfaces as a [`MessageError`].

use core::fmt::{Display, Formatter, Result as FmtResult};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    event::{BattleEvent, EventType, Side},
    moves::{MoveId, MoveTarget},
    pokemon::{Experience, RosterPokemon},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Ready,
    TeamSelected,
    AccountName,
    TurnStart,
    BattleEvent,
    TurnEnd,
    BattleEnd,
    MoveSelected,
    SwitchSelected,
    XpGain,
    FullSync,
    SyncRequest,
    StateHash,
    Heartbeat,
    Ack,
    Error,
}

impl MessageType {
    pub fn parse(tag: &str) -> Option<Self> {
        serde_json::from_value(Value::String(tag.to_owned())).ok()
    }
}

impl Display for MessageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match serde_json::to_value(self) {
            Ok(Value::String(tag)) => f.write_str(&tag),
            _ => write!(f, "{:?}", self),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// An inbound message could not be handled.
    MessageError,
    /// A full sync carried an unreadable state.
    SyncParseError,
    InvalidSelection,
    /// A message arrived that the receiver's role or stage does not accept.
    OutOfProtocol,
    /// The host could not resolve the turn and rolled it back.
    TurnFailed,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Message {
    Ready {
        account_id: String,
    },
    TeamSelected {
        team: Vec<RosterPokemon>,
    },
    AccountName {
        account_name: String,
    },
    TurnStart {
        turn_number: u32,
        sequence_number: u64,
    },
    /// One ordered batch of deltas.
    BattleEvent {
        sequence_number: u64,
        events: Vec<BattleEvent>,
    },
    TurnEnd {
        turn_number: u32,
        sequence_number: u64,
    },
    BattleEnd {
        winner: Option<Side>,
        loser: Option<Side>,
    },
    MoveSelected {
        move_id: MoveId,
        target_index: MoveTarget,
    },
    SwitchSelected {
        new_pokemon_index: usize,
    },
    XpGain {
        xp_amount: Experience,
        pokemon_index: usize,
    },
    FullSync {
        state_json: String,
    },
    SyncRequest {
        current_turn: u32,
    },
    StateHash {
        hash: String,
        turn_number: u32,
    },
    Heartbeat,
    Ack {
        acknowledges: MessageType,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl Message {
    pub fn kind(&self) -> MessageType {
        match self {
            Self::Ready { .. } => MessageType::Ready,
            Self::TeamSelected { .. } => MessageType::TeamSelected,
            Self::AccountName { .. } => MessageType::AccountName,
            Self::TurnStart { .. } => MessageType::TurnStart,
            Self::BattleEvent { .. } => MessageType::BattleEvent,
            Self::TurnEnd { .. } => MessageType::TurnEnd,
            Self::BattleEnd { .. } => MessageType::BattleEnd,
            Self::MoveSelected { .. } => MessageType::MoveSelected,
            Self::SwitchSelected { .. } => MessageType::SwitchSelected,
            Self::XpGain { .. } => MessageType::XpGain,
            Self::FullSync { .. } => MessageType::FullSync,
            Self::SyncRequest { .. } => MessageType::SyncRequest,
            Self::StateHash { .. } => MessageType::StateHash,
            Self::Heartbeat => MessageType::Heartbeat,
            Self::Ack { .. } => MessageType::Ack,
            Self::Error { .. } => MessageType::Error,
        }
    }

    pub fn error(code: ErrorCode, message: impl Display) -> Self {
        Self::Error {
            code,
            message: message.to_string(),
        }
    }
}

/// A message with its send time in epoch milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message: Message,
    pub timestamp: u64,
}

impl Envelope {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            timestamp: now(),
        }
    }

    pub fn to_value(&self) -> Result<Value, MessageError> {
        let mut value = serde_json::to_value(&self.message)?;
        match value.as_object_mut() {
            Some(object) => {
                object.insert("timestamp".to_owned(), self.timestamp.into());
                Ok(value)
            }
            None => Err(MessageError::NotAnObject),
        }
    }

    pub fn encode(&self) -> Result<String, MessageError> {
        Ok(self.to_value()?.to_string())
    }

    /// Validates and decodes one inbound message.
    pub fn decode(value: Value) -> Result<Self, MessageError> {
        validate(&value)?;
        let mut object = match value {
            Value::Object(object) => object,
            _ => return Err(MessageError::NotAnObject),
        };
        let timestamp = object
            .remove("timestamp")
            .and_then(|timestamp| timestamp.as_u64())
            .unwrap_or_default();
        Ok(Self {
            message: serde_json::from_value(Value::Object(object))?,
            timestamp,
        })
    }

    pub fn parse(json: &str) -> Result<Self, MessageError> {
        Self::decode(serde_json::from_str(json)?)
    }
}

impl From<Message> for Envelope {
    fn from(message: Message) -> Self {
        Self::new(message)
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Debug)]
pub enum MessageError {
    NotAnObject,
    MissingType,
    UnknownType(String),
    MissingField(&'static str),
    InvalidEvent(String),
    Malformed(serde_json::Error),
}

impl std::error::Error for MessageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for MessageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::NotAnObject => f.write_str("message is not a JSON object"),
            Self::MissingType => f.write_str("message has no type"),
            Self::UnknownType(tag) => write!(f, "unknown message type {:?}", tag),
            Self::MissingField(field) => write!(f, "message is missing numeric or array field {}", field),
            Self::InvalidEvent(tag) => write!(f, "unknown battle event type {:?}", tag),
            Self::Malformed(err) => write!(f, "malformed message: {}", err),
        }
    }
}

impl From<serde_json::Error> for MessageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err)
    }
}

/// Structural checks on a raw message.
pub fn validate(value: &Value) -> Result<MessageType, MessageError> {
    let object = value.as_object().ok_or(MessageError::NotAnObject)?;

    let tag = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(MessageError::MissingType)?;
    let kind = MessageType::parse(tag).ok_or_else(|| MessageError::UnknownType(tag.to_owned()))?;

    if !object.get("timestamp").map(Value::is_number).unwrap_or_default() {
        return Err(MessageError::MissingField("timestamp"));
    }

    if kind == MessageType::BattleEvent {
        validate_batch(object)?;
    }

    Ok(kind)
}

fn validate_batch(object: &Map<String, Value>) -> Result<(), MessageError> {
    if !object
        .get("sequenceNumber")
        .map(Value::is_number)
        .unwrap_or_default()
    {
        return Err(MessageError::MissingField("sequenceNumber"));
    }

    let events = object
        .get("events")
        .and_then(Value::as_array)
        .ok_or(MessageError::MissingField("events"))?;

    for event in events {
        let tag = event.get("type").and_then(Value::as_str).unwrap_or_default();
        if EventType::parse(tag).is_none() {
            return Err(MessageError::InvalidEvent(tag.to_owned()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{validate, Envelope, ErrorCode, Message, MessageError, MessageType};
    use crate::{
        event::{BattleEvent, Side},
        moves::{MoveId, MoveTarget},
    };

    #[test]
    fn encodes_flat_objects() {
        let envelope = Envelope {
            message: Message::MoveSelected {
                move_id: MoveId(85),
                target_index: MoveTarget::Opponent(0),
            },
            timestamp: 1700000000000,
        };
        assert_eq!(
            envelope.to_value().unwrap(),
            json!({ "type": "move_selected", "moveId": 85, "targetIndex": 0, "timestamp": 1700000000000u64 })
        );

        let error = Envelope {
            message: Message::error(ErrorCode::TurnFailed, "no data for move #9"),
            timestamp: 5,
        };
        assert_eq!(
            error.to_value().unwrap(),
            json!({ "type": "error", "code": "TURN_FAILED", "message": "no data for move #9", "timestamp": 5 })
        );
    }

    #[test]
    fn decodes_batches() {
        let envelope = Envelope::decode(json!({
            "type": "battle_event",
            "timestamp": 12,
            "sequenceNumber": 3,
            "events": [
                { "type": "pokemon_fainted", "target": "player1", "pokemonIndex": 2 },
                { "type": "turn_end_event" }
            ]
        }))
        .unwrap();
        assert_eq!(envelope.timestamp, 12);
        assert_eq!(
            envelope.message,
            Message::BattleEvent {
                sequence_number: 3,
                events: vec![
                    BattleEvent::PokemonFainted {
                        target: Side::Player1,
                        pokemon_index: 2
                    },
                    BattleEvent::TurnEnd,
                ],
            }
        );

        let heartbeat = Envelope::parse(r#"{ "type": "heartbeat", "timestamp": 1 }"#).unwrap();
        assert_eq!(heartbeat.message, Message::Heartbeat);
        let end = Envelope::parse(r#"{ "type": "battle_end", "timestamp": 1, "winner": "player2", "loser": "player1" }"#)
            .unwrap();
        assert_eq!(
            end.message,
            Message::BattleEnd {
                winner: Some(Side::Player2),
                loser: Some(Side::Player1)
            }
        );
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!(validate(&json!([1, 2])), Err(MessageError::NotAnObject)));
        assert!(matches!(validate(&json!({ "timestamp": 1 })), Err(MessageError::MissingType)));
        assert!(matches!(
            validate(&json!({ "type": "teleport", "timestamp": 1 })),
            Err(MessageError::UnknownType(tag)) if tag == "teleport"
        ));
        assert!(matches!(
            validate(&json!({ "type": "heartbeat" })),
            Err(MessageError::MissingField("timestamp"))
        ));
        assert!(matches!(
            validate(&json!({ "type": "battle_event", "timestamp": 1, "sequenceNumber": "4", "events": [] })),
            Err(MessageError::MissingField("sequenceNumber"))
        ));
        assert!(matches!(
            validate(&json!({ "type": "battle_event", "timestamp": 1, "sequenceNumber": 4, "events": {} })),
            Err(MessageError::MissingField("events"))
        ));
        assert!(matches!(
            validate(&json!({ "type": "battle_event", "timestamp": 1, "sequenceNumber": 4, "events": [{ "type": "explosion" }] })),
            Err(MessageError::InvalidEvent(tag)) if tag == "explosion"
        ));
        assert!(matches!(
            Envelope::decode(json!({ "type": "switch_selected", "timestamp": 1 })),
            Err(MessageError::Malformed(..))
        ));
        assert_eq!(
            validate(&json!({ "type": "sync_request", "timestamp": 1, "currentTurn": 2 })).unwrap(),
            MessageType::SyncRequest
        );
    }

    #[test]
    fn type_tags() {
        assert_eq!(MessageType::XpGain.to_string(), "xp_gain");
        assert_eq!(MessageType::parse("full_sync"), Some(MessageType::FullSync));
        assert_eq!(
            Message::Ack {
                acknowledges: MessageType::Heartbeat
            }
            .kind(),
            MessageType::Ack
        );
    }
}
