//! Subscriber handle

use std::fmt;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use crate::error::{RedwireError, Result};
use crate::network::{Connection, Socket};
use crate::protocol::{Cmd, ToArg};

use super::event::{classify, Message, PubSubEvent};

/// Pub/sub view of a borrowed [`Connection`]
///
/// Dropping the subscriber does not unsubscribe. The connection refuses
/// ordinary commands until every pending acknowledgement has been read
/// through [`Subscriber::next_event`] and the last one reports no
/// subscriptions left.
pub struct Subscriber<'a, S: Socket = TcpStream> {
    conn: &'a mut Connection<S>,
}

impl<'a, S: Socket> Subscriber<'a, S> {
    pub(crate) fn new(conn: &'a mut Connection<S>) -> Result<Self> {
        conn.ensure_usable()?;
        if conn.in_flight() > 0 {
            return Err(RedwireError::usage(format!(
                "cannot subscribe: {} requests are pending",
                conn.in_flight()
            )));
        }
        Ok(Self { conn })
    }

    /// Subscribe to one or more channels
    pub fn subscribe<I>(&mut self, channels: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: ToArg,
    {
        let cmd = Cmd::new("SUBSCRIBE").args(channels);
        if cmd.len() < 2 {
            return Err(RedwireError::usage("SUBSCRIBE needs at least one channel"));
        }
        self.conn.send_pubsub(&cmd)
    }

    /// Subscribe to one or more glob-style patterns
    pub fn psubscribe<I>(&mut self, patterns: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: ToArg,
    {
        let cmd = Cmd::new("PSUBSCRIBE").args(patterns);
        if cmd.len() < 2 {
            return Err(RedwireError::usage("PSUBSCRIBE needs at least one pattern"));
        }
        self.conn.send_pubsub(&cmd)
    }

    /// Unsubscribe from the given channels, or from all of them when empty
    pub fn unsubscribe<I>(&mut self, channels: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: ToArg,
    {
        self.conn.send_pubsub(&Cmd::new("UNSUBSCRIBE").args(channels))
    }

    /// Unsubscribe from the given patterns, or from all of them when empty
    pub fn punsubscribe<I>(&mut self, patterns: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: ToArg,
    {
        self.conn.send_pubsub(&Cmd::new("PUNSUBSCRIBE").args(patterns))
    }

    /// Next pushed frame of any kind, or `None` if `timeout` elapses first
    pub fn next_event(&mut self, timeout: Option<Duration>) -> Result<Option<PubSubEvent>> {
        let reply = match self.conn.wait_message(timeout)? {
            Some(reply) => reply,
            None => return Ok(None),
        };

        let event = classify(reply)?;
        match &event {
            PubSubEvent::Control { kind, channel, count } => {
                tracing::debug!(
                    "{} {} ({} active)",
                    kind.as_str(),
                    channel.as_deref().unwrap_or("-"),
                    count
                );
            }
            PubSubEvent::Unknown(reply) => {
                tracing::warn!("Ignoring unexpected pub/sub frame: {:?}", reply);
            }
            PubSubEvent::Message(_) => {}
        }
        Ok(Some(event))
    }

    /// Next published message, skipping acknowledgements and unknown frames
    ///
    /// The timeout bounds the whole call, not each frame read.
    pub fn next_message(&mut self, timeout: Option<Duration>) -> Result<Option<Message>> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            match self.next_event(remaining)? {
                Some(PubSubEvent::Message(message)) => return Ok(Some(message)),
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }

    /// Active subscriptions as of the latest acknowledgement read
    ///
    /// Kept on the connection, so a new subscriber sees the count left by
    /// earlier ones.
    pub fn subscriptions(&self) -> usize {
        self.conn.subscriptions()
    }

    pub fn is_subscribed(&self) -> bool {
        self.conn.is_subscribed()
    }
}

impl<S: Socket> fmt::Debug for Subscriber<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("connection", &self.conn)
            .finish()
    }
}
