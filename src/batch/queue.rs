//! Command queue
//!
//! The batch's exclusive hold on a [`Connection`]. Whatever it leaves in
//! flight is read back and dropped when it goes away, so the connection is
//! aligned again for the next request.

use bytes::Bytes;

use crate::error::{RedwireError, Result};
use crate::network::{Connection, Socket};
use crate::protocol::ReplyValue;

pub(crate) struct CommandQueue<'a, S: Socket> {
    conn: &'a mut Connection<S>,
}

impl<'a, S: Socket> CommandQueue<'a, S> {
    /// Take the connection; it must be idle
    pub(crate) fn start(conn: &'a mut Connection<S>) -> Result<Self> {
        conn.ensure_idle("start a batch")?;
        Ok(Self { conn })
    }

    pub(crate) fn append(&mut self, frame: Bytes) -> usize {
        self.conn.append(frame)
    }

    pub(crate) fn get_reply(&mut self) -> Result<ReplyValue> {
        self.conn.get_reply()
    }

    pub(crate) fn discard(&mut self, count: usize) -> Result<()> {
        self.conn.discard_replies(count)
    }

    /// Drain every outstanding reply
    pub(crate) fn discard_all(&mut self) -> Result<()> {
        let count = self.conn.in_flight();
        self.conn.discard_replies(count)
    }

    /// Mark the connection broken and hand the error back
    pub(crate) fn desync(&mut self, message: String) -> RedwireError {
        self.conn.poison(RedwireError::Protocol(message))
    }
}

impl<S: Socket> Drop for CommandQueue<'_, S> {
    fn drop(&mut self) {
        if self.conn.is_broken() || self.conn.in_flight() == 0 {
            return;
        }
        if let Err(e) = self.discard_all() {
            tracing::warn!("Failed to drain abandoned batch: {}", e);
        }
    }
}
