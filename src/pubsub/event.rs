//! Pushed frame classification

use bytes::Bytes;

use crate::error::{RedwireError, Result};
use crate::protocol::{FromReply, ReplyValue};

/// A published message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Channel the message was published to
    pub channel: String,

    /// Raw payload
    pub payload: Bytes,

    /// Pattern that matched, for `pmessage` frames
    pub pattern: Option<String>,
}

impl Message {
    /// Decode the payload as `T`
    pub fn payload_as<T: FromReply>(&self) -> Result<T> {
        T::from_reply(ReplyValue::BulkString(self.payload.clone()))
    }
}

/// Subscription acknowledgement kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Subscribe,
    Unsubscribe,
    PSubscribe,
    PUnsubscribe,
}

impl ControlKind {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"subscribe" => Some(ControlKind::Subscribe),
            b"unsubscribe" => Some(ControlKind::Unsubscribe),
            b"psubscribe" => Some(ControlKind::PSubscribe),
            b"punsubscribe" => Some(ControlKind::PUnsubscribe),
            _ => None,
        }
    }

    /// True for the kinds that drop subscriptions
    pub fn is_unsubscribe(&self) -> bool {
        matches!(self, ControlKind::Unsubscribe | ControlKind::PUnsubscribe)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlKind::Subscribe => "subscribe",
            ControlKind::Unsubscribe => "unsubscribe",
            ControlKind::PSubscribe => "psubscribe",
            ControlKind::PUnsubscribe => "punsubscribe",
        }
    }
}

/// One classified pushed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubSubEvent {
    /// `message` or `pmessage`
    Message(Message),

    /// Subscription change acknowledged by the server
    Control {
        kind: ControlKind,
        /// `None` when unsubscribing while subscribed to nothing
        channel: Option<String>,
        /// Subscriptions still active on the connection
        count: usize,
    },

    /// A frame of a type this client does not know (e.g. `pong`)
    Unknown(ReplyValue),
}

/// Classify one pushed reply by its first element
pub fn classify(reply: ReplyValue) -> Result<PubSubEvent> {
    let items = match reply {
        ReplyValue::Array(items) if !items.is_empty() => items,
        other => return Ok(PubSubEvent::Unknown(other)),
    };

    let kind = match items[0].as_bytes() {
        Some(kind) => kind.to_vec(),
        None => return Ok(PubSubEvent::Unknown(ReplyValue::Array(items))),
    };

    match (kind.as_slice(), items.len()) {
        (b"message", 3) => {
            let mut items = items.into_iter().skip(1);
            let channel = text(items.next())?;
            let payload = payload(items.next())?;
            Ok(PubSubEvent::Message(Message {
                channel,
                payload,
                pattern: None,
            }))
        }
        (b"pmessage", 4) => {
            let mut items = items.into_iter().skip(1);
            let pattern = text(items.next())?;
            let channel = text(items.next())?;
            let payload = payload(items.next())?;
            Ok(PubSubEvent::Message(Message {
                channel,
                payload,
                pattern: Some(pattern),
            }))
        }
        (name, 3) if ControlKind::from_name(name).is_some() => {
            let kind = ControlKind::from_name(name).ok_or_else(|| {
                RedwireError::decode("unknown subscription acknowledgement")
            })?;
            let mut items = items.into_iter().skip(1);
            let channel = Option::<String>::from_reply(items.next().unwrap_or(ReplyValue::Nil))?;
            let count = u64::from_reply(items.next().unwrap_or(ReplyValue::Nil))? as usize;
            Ok(PubSubEvent::Control {
                kind,
                channel,
                count,
            })
        }
        (b"message", n) | (b"pmessage", n) => Err(RedwireError::decode(format!(
            "{} frame with {} elements",
            String::from_utf8_lossy(&kind),
            n
        ))),
        _ => Ok(PubSubEvent::Unknown(ReplyValue::Array(items))),
    }
}

fn text(item: Option<ReplyValue>) -> Result<String> {
    String::from_reply(item.unwrap_or(ReplyValue::Nil))
}

fn payload(item: Option<ReplyValue>) -> Result<Bytes> {
    Bytes::from_reply(item.unwrap_or(ReplyValue::Nil))
}

/// Kind and remaining count of a subscription acknowledgement
pub(crate) fn control_ack(reply: &ReplyValue) -> Option<(ControlKind, usize)> {
    match reply.as_array() {
        Some([kind, _, ReplyValue::Integer(count)]) => {
            let kind = ControlKind::from_name(kind.as_bytes()?)?;
            Some((kind, usize::try_from(*count).ok()?))
        }
        _ => None,
    }
}
