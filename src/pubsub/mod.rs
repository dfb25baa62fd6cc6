//! Pub/Sub Module
//!
//! Once a connection has sent SUBSCRIBE or PSUBSCRIBE, the server stops
//! answering requests one-for-one and pushes arrays instead:
//!
//! ```text
//! ["message",  channel, payload]
//! ["pmessage", pattern, channel, payload]
//! ["subscribe" | "unsubscribe" | "psubscribe" | "punsubscribe", channel, count]
//! ```
//!
//! Subscribe and unsubscribe commands are written without reading a reply;
//! their acknowledgements arrive through the same read path as messages.

mod event;
mod subscriber;

pub use event::{classify, ControlKind, Message, PubSubEvent};
pub use subscriber::Subscriber;

pub(crate) use event::control_ack;
