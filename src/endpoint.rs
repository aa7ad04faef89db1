use core::fmt::{Display, Formatter, Result as FmtResult};
use serde_json::Value;

use crate::message::{Envelope, MessageError};

/// Ordered, reliable message channel to the other peer.
pub trait Transport {
    fn send(&self, message: &Envelope) -> Result<(), ConnectionError>;

    /// Next raw inbound message, if one has arrived.
    fn receive(&self) -> Result<Option<Value>, ConnectionError>;
}

#[derive(Debug)]
pub enum ConnectionError {
    Disconnected,
    Encode(MessageError),
}

impl std::error::Error for ConnectionError {}

impl Display for ConnectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Disconnected => f.write_str("peer disconnected"),
            Self::Encode(err) => write!(f, "could not encode message: {}", err),
        }
    }
}

impl From<MessageError> for ConnectionError {
    fn from(err: MessageError) -> Self {
        Self::Encode(err)
    }
}

#[cfg(feature = "mpsc_transport")]
pub use mpsc::*;

#[cfg(feature = "mpsc_transport")]
mod mpsc {

    use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError, TrySendError};
    use serde_json::Value;

    use crate::message::Envelope;

    use super::{ConnectionError, Transport};

    /// Two connected in-process peers.
    pub fn channel() -> (ChannelTransport, ChannelTransport) {
        let (sender, peer_receiver) = unbounded();
        let (peer_sender, receiver) = unbounded();

        (
            ChannelTransport { sender, receiver },
            ChannelTransport {
                sender: peer_sender,
                receiver: peer_receiver,
            },
        )
    }

    /// Carries JSON text, the same as a data channel would.
    #[derive(Clone)]
    pub struct ChannelTransport {
        pub sender: Sender<String>,
        pub receiver: Receiver<String>,
    }

    impl ChannelTransport {
        /// Pushes raw text to the peer, bypassing encoding.
        pub fn send_raw(&self, text: impl Into<String>) -> Result<(), ConnectionError> {
            match self.sender.try_send(text.into()) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(..)) | Err(TrySendError::Disconnected(..)) => {
                    Err(ConnectionError::Disconnected)
                }
            }
        }
    }

    impl Transport for ChannelTransport {
        fn send(&self, message: &Envelope) -> Result<(), ConnectionError> {
            self.send_raw(message.encode()?)
        }

        /// Text that is not JSON is handed on as a string so validation rejects it.
        fn receive(&self) -> Result<Option<Value>, ConnectionError> {
            match self.receiver.try_recv() {
                Ok(text) => Ok(Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))),
                Err(TryRecvError::Empty) => Ok(None),
                Err(TryRecvError::Disconnected) => Err(ConnectionError::Disconnected),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use serde_json::json;

        use super::channel;
        use crate::{
            endpoint::{ConnectionError, Transport},
            message::{Envelope, Message},
        };

        #[test]
        fn delivers_in_order() {
            let (host, guest) = channel();
            host.send(&Envelope::new(Message::Heartbeat)).unwrap();
            host.send(&Envelope::new(Message::SyncRequest { current_turn: 4 })).unwrap();

            assert_eq!(guest.receive().unwrap().unwrap()["type"], json!("heartbeat"));
            assert_eq!(guest.receive().unwrap().unwrap()["currentTurn"], json!(4));
            assert!(guest.receive().unwrap().is_none());
        }

        #[test]
        fn reports_disconnect() {
            let (host, guest) = channel();
            drop(host);
            assert!(matches!(guest.receive(), Err(ConnectionError::Disconnected)));
            assert!(matches!(
                guest.send(&Envelope::new(Message::Heartbeat)),
                Err(ConnectionError::Disconnected)
            ));
        }
    }
}
