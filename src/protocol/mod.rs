//! Protocol Module
//!
//! RESP2 framing: request encoding, reply decoding and typed conversion.
//!
//! ## Request Format
//! ```text
//! *<argc>\r\n
//! $<len>\r\n<arg bytes>\r\n        (repeated argc times)
//! ```
//!
//! ## Reply Tags
//! - `+` simple string (status)
//! - `-` error
//! - `:` signed 64-bit integer
//! - `$` bulk string, `$-1` is nil
//! - `*` array, `*-1` is nil

mod reply;
mod codec;
mod command;
mod from_reply;

pub use reply::ReplyValue;
pub use codec::{parse_integer, read_frame, read_reply, MAX_BULK_LENGTH, MAX_NESTING_DEPTH};
pub use command::{encode_command, Cmd, ToArg, DISCARD, EXEC, MULTI};
pub use from_reply::{decode, FromReply};
