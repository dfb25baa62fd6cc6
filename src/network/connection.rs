//! Client Connection
//!
//! Owns one [`Transport`] and keeps the in-flight count: requests written (or
//! queued to be written) whose reply has not been read yet. Replies come back
//! in the order their requests were appended, which is what lets batches pair
//! them with decoders afterwards.

use std::fmt;
use std::io::{self, ErrorKind};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;

use crate::batch::Batch;
use crate::config::{Config, DEFAULT_READ_BUFFER_SIZE};
use crate::error::{RedwireError, Result};
use crate::protocol::{read_frame, read_reply, Cmd, FromReply, ReplyValue};
use crate::pubsub::{self, Subscriber};

use super::{Socket, Transport};

/// A single blocking connection to the server
pub struct Connection<S: Socket = TcpStream> {
    /// Buffered socket
    transport: Transport<S>,

    /// Requests sent or queued whose reply is still unread
    in_flight: usize,

    /// Frames appended but not yet written
    pending: Vec<Bytes>,

    /// Reason the stream was abandoned, once a fatal error is seen
    broken: Option<String>,

    /// Set by any pub/sub write, cleared once the server is known to have
    /// left subscribe mode
    subscribed: bool,

    /// Pub/sub acknowledgements still expected on the wire
    owed_acks: usize,

    /// Active subscriptions as of the latest acknowledgement
    subscriptions: usize,
}

impl Connection<TcpStream> {
    /// Connect, then authenticate and select the database
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;

        let stream = connect(config)?;
        stream.set_nodelay(config.nodelay)?;
        stream.set_read_timeout(config.read_timeout())?;
        stream.set_write_timeout(config.write_timeout())?;

        tracing::info!("Connected to {}", config.addr());

        let mut conn = Self::with_buffer_size(stream, config.read_buffer_size);
        conn.handshake(config)?;
        Ok(conn)
    }

    /// Connect using a `redis://` URL
    pub fn from_url(url: &str) -> Result<Self> {
        Self::open(&Config::from_url(url)?)
    }
}

fn connect(config: &Config) -> Result<TcpStream> {
    let addr = config.addr();
    let timeout = match config.connect_timeout() {
        Some(timeout) => timeout,
        None => return Ok(TcpStream::connect(&addr)?),
    };

    let mut last_err = None;
    for candidate in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", candidate, e);
                last_err = Some(e);
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| {
            io::Error::new(ErrorKind::NotFound, format!("{} resolved to no addresses", addr))
        })
        .into())
}

impl<S: Socket> Connection<S> {
    /// Wrap an already-connected socket. No handshake is performed.
    pub fn new(socket: S) -> Self {
        Self::with_buffer_size(socket, DEFAULT_READ_BUFFER_SIZE)
    }

    /// Wrap an already-connected socket with a custom read-ahead buffer
    pub fn with_buffer_size(socket: S, read_buffer_size: usize) -> Self {
        Self {
            transport: Transport::with_capacity(socket, read_buffer_size),
            in_flight: 0,
            pending: Vec::new(),
            broken: None,
            subscribed: false,
            owed_acks: 0,
            subscriptions: 0,
        }
    }

    fn handshake(&mut self, config: &Config) -> Result<()> {
        if let Some(password) = &config.password {
            let auth = Cmd::new("AUTH")
                .arg(config.username.as_deref())
                .arg(password.as_str());
            self.execute(&auth)?;
            tracing::debug!("Authenticated with {}", config.addr());
        }

        if config.database > 0 {
            self.execute(&Cmd::new("SELECT").arg(config.database))?;
            tracing::debug!("Selected database {}", config.database);
        }

        Ok(())
    }

    // =========================================================================
    // Single Requests
    // =========================================================================

    /// Send one framed request and read its reply
    ///
    /// Fails with a usage error, before touching the socket, while any other
    /// request is in flight. A `-` reply is returned as [`RedwireError::Server`].
    pub fn execute(&mut self, frame: impl Into<Bytes>) -> Result<ReplyValue> {
        self.ensure_idle("execute a command")?;
        self.append(frame.into());
        self.get_reply()?.into_result()
    }

    /// Run a command and decode its reply as `T`
    pub fn query<T: FromReply>(&mut self, cmd: &Cmd) -> Result<T> {
        T::from_reply(self.execute(cmd)?)
    }

    /// Run a request and decode its reply into `sink`
    ///
    /// A nil reply leaves `sink` untouched and returns `false`.
    pub fn execute_into<T: FromReply>(
        &mut self,
        frame: impl Into<Bytes>,
        sink: &mut T,
    ) -> Result<bool> {
        match self.execute(frame)? {
            ReplyValue::Nil => Ok(false),
            reply => {
                *sink = T::from_reply(reply)?;
                Ok(true)
            }
        }
    }

    // =========================================================================
    // Batches
    // =========================================================================

    /// Start an untyped pipeline
    pub fn start_pipeline(&mut self) -> Result<Batch<'_, ReplyValue, S>> {
        Batch::pipeline(self)
    }

    /// Start a pipeline whose replies decode as `T`
    pub fn pipeline<T>(&mut self) -> Result<Batch<'_, T, S>> {
        Batch::pipeline(self)
    }

    /// Start an untyped MULTI/EXEC block
    pub fn start_transaction(&mut self) -> Result<Batch<'_, ReplyValue, S>> {
        Batch::transaction(self)
    }

    /// Start a MULTI/EXEC block whose results decode as `T`
    pub fn transaction<T>(&mut self) -> Result<Batch<'_, T, S>> {
        Batch::transaction(self)
    }

    // =========================================================================
    // Pub/Sub
    // =========================================================================

    /// Borrow the connection as a pub/sub subscriber
    pub fn subscriber(&mut self) -> Result<Subscriber<'_, S>> {
        Subscriber::new(self)
    }

    /// Wait up to `timeout` for the next pushed frame
    ///
    /// `None` blocks indefinitely and `Some(Duration::ZERO)` only polls.
    /// Returns `Ok(None)` when nothing arrived in time.
    pub fn wait_message(&mut self, timeout: Option<Duration>) -> Result<Option<ReplyValue>> {
        self.ensure_usable()?;
        if self.in_flight > 0 {
            return Err(RedwireError::usage(format!(
                "cannot wait for messages: {} requests are pending",
                self.in_flight
            )));
        }

        let ready = self.transport.wait(timeout);
        if !self.track(ready)? {
            return Ok(None);
        }

        let reply = read_reply(&mut self.transport);
        let reply = self.track(reply)?;
        self.note_ack(&reply);
        Ok(Some(reply))
    }

    /// Account for a subscription acknowledgement, if `reply` is one
    ///
    /// Subscribe mode ends only on an unsubscribe ack reporting zero
    /// subscriptions while no other ack is owed.
    fn note_ack(&mut self, reply: &ReplyValue) {
        let (kind, count) = match pubsub::control_ack(reply) {
            Some(ack) => ack,
            None => return,
        };
        self.owed_acks = self.owed_acks.saturating_sub(1);
        self.subscriptions = count;
        if kind.is_unsubscribe() && count == 0 && self.owed_acks == 0 && self.subscribed {
            tracing::debug!("Left subscribe mode");
            self.subscribed = false;
        }
    }

    /// Write a pub/sub command without waiting for a reply
    ///
    /// Acknowledgements arrive later through [`Connection::wait_message`]:
    /// one per channel or pattern named, and at least one for a bare
    /// UNSUBSCRIBE/PUNSUBSCRIBE. Until they are read the connection stays in
    /// subscribe mode, whatever the command was.
    pub(crate) fn send_pubsub(&mut self, cmd: &Cmd) -> Result<()> {
        self.ensure_usable()?;
        if self.in_flight > 0 {
            return Err(RedwireError::usage(format!(
                "cannot send {}: {} requests are pending",
                cmd.name(),
                self.in_flight
            )));
        }

        let written = self.transport.write(&cmd.to_frame());
        self.track(written)?;

        let targets = cmd.len().saturating_sub(1);
        self.owed_acks += targets.max(1);
        self.subscribed = true;
        tracing::debug!("Sent {} with {} arguments", cmd.name(), targets);
        Ok(())
    }

    // =========================================================================
    // Request Bookkeeping
    // =========================================================================

    /// Queue a frame; returns the new in-flight count
    pub(crate) fn append(&mut self, frame: Bytes) -> usize {
        self.pending.push(frame);
        self.in_flight += 1;
        self.in_flight
    }

    /// Write every queued frame in one vectored write
    pub(crate) fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let written = self.transport.write_many(&self.pending);
        let count = self.pending.len();
        self.pending.clear();
        let bytes = self.track(written)?;
        tracing::trace!("Flushed {} frames ({} bytes)", count, bytes);
        Ok(())
    }

    /// Read the oldest outstanding reply
    ///
    /// Flushes queued frames first. A `-` reply comes back as
    /// [`ReplyValue::Error`] so the caller decides how to surface it.
    pub(crate) fn get_reply(&mut self) -> Result<ReplyValue> {
        self.ensure_usable()?;
        if self.in_flight == 0 {
            return Err(RedwireError::usage(
                "cannot read a reply: no requests in flight",
            ));
        }
        self.flush()?;
        self.in_flight -= 1;
        let reply = read_frame(&mut self.transport);
        self.track(reply)
    }

    /// Read and drop `count` outstanding replies, server errors included
    pub(crate) fn discard_replies(&mut self, count: usize) -> Result<()> {
        if count > self.in_flight {
            return Err(RedwireError::usage(format!(
                "cannot discard {} replies: only {} requests in flight",
                count, self.in_flight
            )));
        }
        for _ in 0..count {
            if let ReplyValue::Error(message) = self.get_reply()? {
                tracing::debug!("Discarded error reply: {}", message);
            }
        }
        Ok(())
    }

    pub(crate) fn ensure_usable(&self) -> Result<()> {
        match &self.broken {
            Some(reason) => Err(RedwireError::usage(format!(
                "connection is broken: {}",
                reason
            ))),
            None => Ok(()),
        }
    }

    /// Usable, nothing in flight and not in subscribe mode
    pub(crate) fn ensure_idle(&self, action: &str) -> Result<()> {
        self.ensure_usable()?;
        if self.in_flight > 0 {
            return Err(RedwireError::usage(format!(
                "cannot {}: {} requests are pending",
                action, self.in_flight
            )));
        }
        if self.subscribed {
            return Err(RedwireError::usage(format!(
                "cannot {}: connection is in subscribe mode",
                action
            )));
        }
        Ok(())
    }

    /// Record a fatal error so later operations refuse to touch the stream
    pub(crate) fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.poison(e))
    }

    pub(crate) fn poison(&mut self, err: RedwireError) -> RedwireError {
        if err.is_fatal() && self.broken.is_none() {
            tracing::warn!("Connection marked broken: {}", err);
            self.broken = Some(err.to_string());
        }
        err
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Requests sent or queued whose reply is still unread
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// True when nothing is in flight and no batch holds the connection
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.pending.is_empty()
    }

    /// True once a connection or protocol error has been seen
    pub fn is_broken(&self) -> bool {
        self.broken.is_some()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Active subscriptions as of the latest acknowledgement read
    pub fn subscriptions(&self) -> usize {
        self.subscriptions
    }

    /// Borrow the underlying socket
    pub fn get_ref(&self) -> &S {
        self.transport.get_ref()
    }

    /// Mutably borrow the underlying socket
    pub fn get_mut(&mut self) -> &mut S {
        self.transport.get_mut()
    }
}

impl<S: Socket> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("in_flight", &self.in_flight)
            .field("pending", &self.pending.len())
            .field("broken", &self.broken)
            .field("subscribed", &self.subscribed)
            .field("owed_acks", &self.owed_acks)
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}
