//! Buffered transport
//!
//! A read-ahead buffer in front of a [`Socket`]. Every RESP header line goes
//! through `read_line`, payloads through `read_exact`, and a whole pipeline of
//! frames leaves through one vectored `write_many`.

use std::io::{self, ErrorKind, IoSlice};
use std::time::Duration;

use crate::config::{DEFAULT_READ_BUFFER_SIZE, MIN_READ_BUFFER_SIZE};
use crate::error::{RedwireError, Result};

use super::Socket;

/// Longest header line accepted before the stream is declared corrupt
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Buffered byte stream over a socket
pub struct Transport<S> {
    /// Underlying socket
    socket: S,

    /// Fixed-size read-ahead buffer
    buf: Box<[u8]>,

    /// Next unread byte in `buf`
    pos: usize,

    /// End of valid data in `buf`
    len: usize,
}

impl<S: Socket> Transport<S> {
    /// Wrap a socket with the default read-ahead buffer
    pub fn new(socket: S) -> Self {
        Self::with_capacity(socket, DEFAULT_READ_BUFFER_SIZE)
    }

    /// Wrap a socket with a read-ahead buffer of `capacity` bytes
    pub fn with_capacity(socket: S, capacity: usize) -> Self {
        Self {
            socket,
            buf: vec![0u8; capacity.max(MIN_READ_BUFFER_SIZE)].into_boxed_slice(),
            pos: 0,
            len: 0,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fill `out` completely, blocking as needed
    ///
    /// Requests larger than the read-ahead buffer skip it and read straight
    /// into `out`.
    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        let avail = self.len - self.pos;
        if out.len() <= avail {
            out.copy_from_slice(&self.buf[self.pos..self.pos + out.len()]);
            self.pos += out.len();
            return Ok(());
        }

        let (head, tail) = out.split_at_mut(avail);
        head.copy_from_slice(&self.buf[self.pos..self.len]);
        self.pos = 0;
        self.len = 0;

        if tail.len() > self.buf.len() {
            let mut filled = 0;
            while filled < tail.len() {
                filled += read_some(&mut self.socket, &mut tail[filled..])?;
            }
            return Ok(());
        }

        self.fill_at_least(tail.len())?;
        tail.copy_from_slice(&self.buf[..tail.len()]);
        self.pos = tail.len();
        Ok(())
    }

    /// Read exactly `n` bytes into a new vector
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; n];
        self.read_exact(&mut out)?;
        Ok(out)
    }

    /// Read a single byte
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.pos == self.len {
            self.fill_at_least(1)?;
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Read up to and including the next `\r\n`, returning the bytes before it
    pub fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        loop {
            let window = &self.buf[self.pos..self.len];
            if let Some(idx) = window.iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&window[..idx]);
                self.pos += idx + 1;
                return match line.pop() {
                    Some(b'\r') => Ok(line),
                    _ => Err(RedwireError::protocol("line not terminated by CRLF")),
                };
            }

            line.extend_from_slice(window);
            self.pos = self.len;
            if line.len() > MAX_LINE_LENGTH {
                return Err(RedwireError::protocol(format!(
                    "header line exceeds {} bytes",
                    MAX_LINE_LENGTH
                )));
            }
            self.fill_at_least(1)?;
        }
    }

    /// Skip `n` bytes
    ///
    /// Bytes not yet buffered are still pulled off the socket, so the read
    /// position really moves past them.
    pub fn discard(&mut self, n: usize) -> Result<()> {
        let avail = self.len - self.pos;
        if n <= avail {
            self.pos += n;
            return Ok(());
        }

        let mut remaining = n - avail;
        self.pos = 0;
        self.len = 0;
        while remaining > 0 {
            let chunk = remaining.min(self.buf.len());
            remaining -= read_some(&mut self.socket, &mut self.buf[..chunk])?;
        }
        Ok(())
    }

    /// Report whether a read would make progress within `timeout`
    ///
    /// Buffered bytes answer immediately. `None` blocks indefinitely.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<bool> {
        if self.has_buffered() {
            return Ok(true);
        }
        Ok(self.socket.wait_readable(timeout)?)
    }

    /// True when unread bytes sit in the read-ahead buffer
    pub fn has_buffered(&self) -> bool {
        self.pos < self.len
    }

    /// Unread bytes currently held in the read-ahead buffer
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..self.len]
    }

    /// Refill an empty buffer until it holds at least `n` bytes
    fn fill_at_least(&mut self, n: usize) -> Result<()> {
        debug_assert!(self.pos == self.len && n <= self.buf.len());
        self.pos = 0;
        self.len = 0;
        while self.len < n {
            self.len += read_some(&mut self.socket, &mut self.buf[self.len..])?;
        }
        Ok(())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Send one frame
    pub fn write(&mut self, frame: &[u8]) -> Result<()> {
        self.write_many(&[frame])?;
        Ok(())
    }

    /// Send every frame, in order, as few vectored writes as the socket allows
    ///
    /// Partial writes are resumed from the first unsent byte until the whole
    /// batch is out. Returns the number of bytes sent.
    pub fn write_many<B: AsRef<[u8]>>(&mut self, frames: &[B]) -> Result<usize> {
        let total: usize = frames.iter().map(|f| f.as_ref().len()).sum();
        let mut index = 0;
        let mut offset = 0;

        while index < frames.len() {
            let first = &frames[index].as_ref()[offset..];
            let slices: Vec<IoSlice<'_>> = std::iter::once(first)
                .chain(frames[index + 1..].iter().map(|f| f.as_ref()))
                .filter(|f| !f.is_empty())
                .map(IoSlice::new)
                .collect();
            if slices.is_empty() {
                break;
            }

            let mut written = match self.socket.write_vectored(&slices) {
                Ok(0) => {
                    return Err(io::Error::new(
                        ErrorKind::WriteZero,
                        "socket accepted no bytes",
                    )
                    .into())
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            while index < frames.len() {
                let left = frames[index].as_ref().len() - offset;
                if written < left {
                    offset += written;
                    break;
                }
                written -= left;
                index += 1;
                offset = 0;
            }
        }

        self.socket.flush()?;
        tracing::trace!(frames = frames.len(), bytes = total, "frames written");
        Ok(total)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Borrow the underlying socket
    pub fn get_ref(&self) -> &S {
        &self.socket
    }

    /// Mutably borrow the underlying socket
    ///
    /// Reading from it directly bypasses the buffer and desynchronizes the stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    /// Size of the read-ahead buffer
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

/// One `read` call that retries on EINTR and treats EOF as a closed connection
fn read_some<S: Socket>(socket: &mut S, out: &mut [u8]) -> Result<usize> {
    loop {
        match socket.read(out) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed by peer",
                )
                .into())
            }
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
