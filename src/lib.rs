//! # redwire
//!
//! A blocking, single-connection client for RESP servers with:
//! - Buffered reads and vectored writes
//! - Strictly ordered request/reply bookkeeping
//! - Pipelines and MULTI/EXEC transactions as borrowed batch handles
//! - Pub/sub message retrieval with timeouts
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │        Cmd / encode_command          FromReply              │
//! │          (request frames)        (typed replies)            │
//! └─────────────────────┬──────────────────────▲────────────────┘
//!                       │                      │
//! ┌─────────────────────▼──────────────────────┴────────────────┐
//! │   Connection ◄──── Batch (pipeline / transaction)           │
//! │  (in-flight)  ◄─── Subscriber (pub/sub)                     │
//! └─────────────────────┬──────────────────────▲────────────────┘
//!                       │                      │
//!          ┌────────────▼────────┐    ┌────────┴────────┐
//!          │      Transport      │───►│  Reply decoder  │
//!          │ (read-ahead buffer) │    │  (ReplyValue)   │
//!          └────────────┬────────┘    └─────────────────┘
//!                       │
//!                       ▼
//!                  TCP socket
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use redwire::{cmd, Connection};
//!
//! # fn main() -> redwire::Result<()> {
//! let mut conn = Connection::from_url("redis://127.0.0.1:6379/0")?;
//! conn.query::<()>(&cmd!("SET", "greeting", "hello"))?;
//!
//! let mut pipe = conn.pipeline::<i64>()?;
//! pipe.append_cmd(&cmd!("INCR", "hits"))?;
//! pipe.append_cmd(&cmd!("INCR", "hits"))?;
//! let counts = pipe.resolve()?;
//! assert_eq!(counts.len(), 2);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod network;
pub mod protocol;
pub mod batch;
pub mod pubsub;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RedwireError, Result};
pub use config::{Config, ConfigBuilder};
pub use network::{Connection, Socket, Transport};
pub use protocol::{encode_command, Cmd, FromReply, ReplyValue, ToArg};
pub use batch::{Batch, BatchKind};
pub use pubsub::{ControlKind, Message, PubSubEvent, Subscriber};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of redwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
