//! Batch Module
//!
//! Pipelines and MULTI/EXEC blocks borrowed from a [`Connection`].
//!
//! ## Lifecycle
//! ```text
//!   start_pipeline()/start_transaction()
//!              │
//!              ▼
//!   ┌────────────────────┐  append()   frames queue on the connection,
//!   │        Open        │◄──────────  one decoder registered per frame
//!   └─────────┬──────────┘
//!             │ resolve() / discard() / drop
//!             ▼
//!   ┌────────────────────┐
//!   │      Resolved      │  every reply read, connection idle again
//!   └────────────────────┘
//! ```
//!
//! Nothing is written until the first reply is needed, so a whole batch
//! leaves in a single vectored write.

mod queue;
mod pipeline;
mod transaction;

use std::fmt;
use std::net::TcpStream;

use bytes::Bytes;

use crate::error::{RedwireError, Result};
use crate::network::{Connection, Socket};
use crate::protocol::{Cmd, FromReply, ReplyValue, DISCARD, MULTI};

use queue::CommandQueue;

/// Decoder registered for one appended command
pub(crate) type Resolver<'a, T> = Box<dyn FnOnce(ReplyValue) -> Result<T> + 'a>;

/// Which round-trip protocol a batch follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Independent commands, one reply each
    Pipeline,

    /// Commands wrapped in MULTI ... EXEC
    Transaction,
}

/// Exclusive handle on a connection while a batch is built and resolved
///
/// Dropping an unresolved batch discards it: outstanding replies are read and
/// thrown away (a transaction sends `DISCARD` first), so the connection is
/// reusable afterwards.
pub struct Batch<'a, T = ReplyValue, S: Socket = TcpStream> {
    queue: CommandQueue<'a, S>,
    kind: BatchKind,
    resolvers: Vec<Resolver<'a, T>>,
    resolved: bool,
}

impl<'a, T, S: Socket> Batch<'a, T, S> {
    pub(crate) fn pipeline(conn: &'a mut Connection<S>) -> Result<Self> {
        let queue = CommandQueue::start(conn)?;
        tracing::trace!("Pipeline started");
        Ok(Self::with_queue(queue, BatchKind::Pipeline))
    }

    pub(crate) fn transaction(conn: &'a mut Connection<S>) -> Result<Self> {
        let mut queue = CommandQueue::start(conn)?;
        queue.append(Bytes::from_static(MULTI));
        tracing::trace!("Transaction started");
        Ok(Self::with_queue(queue, BatchKind::Transaction))
    }

    fn with_queue(queue: CommandQueue<'a, S>, kind: BatchKind) -> Self {
        Self {
            queue,
            kind,
            resolvers: Vec::new(),
            resolved: false,
        }
    }

    /// Queue a framed command with its own decoder; returns its index
    pub fn append_with<F>(&mut self, frame: impl Into<Bytes>, resolver: F) -> Result<usize>
    where
        F: FnOnce(ReplyValue) -> Result<T> + 'a,
    {
        if self.resolved {
            return Err(RedwireError::usage("cannot append: batch already resolved"));
        }
        self.queue.append(frame.into());
        self.resolvers.push(Box::new(resolver));
        Ok(self.resolvers.len() - 1)
    }

    /// Send everything and decode one result per command, in append order
    ///
    /// Every reply is read before any decoder runs, so a failing decoder
    /// still leaves the connection idle.
    pub fn resolve(&mut self) -> Result<Vec<T>> {
        self.mark_resolved()?;
        let resolvers = std::mem::take(&mut self.resolvers);
        let count = resolvers.len();
        let results = match self.kind {
            BatchKind::Pipeline => pipeline::collect(&mut self.queue, resolvers),
            BatchKind::Transaction => transaction::collect(&mut self.queue, resolvers),
        };
        tracing::debug!("Resolved {:?} of {} commands", self.kind, count);
        results
    }

    /// Abandon the batch, draining whatever replies it produced
    pub fn discard(&mut self) -> Result<()> {
        self.mark_resolved()?;
        self.resolvers.clear();
        if self.kind == BatchKind::Transaction {
            self.queue.append(Bytes::from_static(DISCARD));
        }
        self.queue.discard_all()?;
        tracing::debug!("Discarded {:?}", self.kind);
        Ok(())
    }

    pub fn kind(&self) -> BatchKind {
        self.kind
    }

    /// Number of commands appended by the caller
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    fn mark_resolved(&mut self) -> Result<()> {
        if std::mem::replace(&mut self.resolved, true) {
            return Err(RedwireError::usage("batch already resolved"));
        }
        Ok(())
    }
}

impl<'a, T: FromReply + 'a, S: Socket> Batch<'a, T, S> {
    /// Queue a framed command decoded as `T`; returns its index
    pub fn append(&mut self, frame: impl Into<Bytes>) -> Result<usize> {
        self.append_with(frame, T::from_reply)
    }

    /// Queue a [`Cmd`] decoded as `T`; returns its index
    pub fn append_cmd(&mut self, cmd: &Cmd) -> Result<usize> {
        self.append(cmd)
    }
}

impl<T, S: Socket> fmt::Debug for Batch<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("kind", &self.kind)
            .field("len", &self.resolvers.len())
            .field("resolved", &self.resolved)
            .finish()
    }
}

impl<T, S: Socket> Drop for Batch<'_, T, S> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        if let Err(e) = self.discard() {
            tracing::warn!("Failed to discard abandoned {:?}: {}", self.kind, e);
        }
    }
}
