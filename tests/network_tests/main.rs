//! Network Tests
//!
//! Buffered transport and connection bookkeeping over an in-memory socket.

#[path = "../common/mod.rs"]
mod common;
