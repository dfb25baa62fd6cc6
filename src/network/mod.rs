//! Network Module
//!
//! Client side of one TCP connection.
//!
//! ## Layers
//! - `Socket`: blocking byte stream with a readiness probe
//! - `Transport`: read-ahead buffer, line reads, vectored writes
//! - `Connection`: in-flight bookkeeping, handshake, single requests

mod socket;
mod transport;
mod connection;

pub use socket::Socket;
pub use transport::{Transport, MAX_LINE_LENGTH};
pub use connection::Connection;
