//! Socket abstraction
//!
//! The transport only needs a byte stream that can also answer "is anything
//! readable within this timeout?". `TcpStream` is the production socket;
//! tests and benches plug in in-memory streams.

use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// A blocking byte stream with a bounded readiness probe
pub trait Socket: Read + Write {
    /// Wait until at least one byte (or EOF) is readable without consuming it.
    ///
    /// `None` waits forever, `Some(Duration::ZERO)` only polls.
    /// Returns `Ok(false)` when the timeout elapses first.
    fn wait_readable(&mut self, timeout: Option<Duration>) -> io::Result<bool>;
}

impl Socket for TcpStream {
    fn wait_readable(&mut self, timeout: Option<Duration>) -> io::Result<bool> {
        match timeout {
            // A zero read timeout is rejected by the OS layer, so poll in
            // non-blocking mode instead.
            Some(timeout) if timeout.is_zero() => {
                self.set_nonblocking(true)?;
                let ready = peek_ready(self);
                self.set_nonblocking(false)?;
                ready
            }
            timeout => {
                let previous = self.read_timeout()?;
                self.set_read_timeout(timeout)?;
                let ready = peek_ready(self);
                self.set_read_timeout(previous)?;
                ready
            }
        }
    }
}

fn peek_ready(stream: &TcpStream) -> io::Result<bool> {
    let mut probe = [0u8; 1];
    loop {
        match stream.peek(&mut probe) {
            // EOF counts as readable: the next read reports the closed socket.
            Ok(_) => return Ok(true),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                return Ok(false)
            }
            Err(e) => return Err(e),
        }
    }
}
