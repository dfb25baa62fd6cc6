//! Reply decoder
//!
//! Reads one framed reply off a [`Transport`] and builds a [`ReplyValue`].
//!
//! ## Wire Format
//! ```text
//! +<text>\r\n                  simple string
//! -<message>\r\n               error
//! :<integer>\r\n               integer
//! $<len>\r\n<bytes>\r\n        bulk string   ($-1\r\n = nil)
//! *<count>\r\n<reply>...       array         (*-1\r\n = nil)
//! ```

use bytes::Bytes;

use crate::error::{RedwireError, Result};
use crate::network::{Socket, Transport};

use super::ReplyValue;

/// Largest bulk string the decoder will allocate for (512 MB, the server's own cap)
pub const MAX_BULK_LENGTH: i64 = 512 * 1024 * 1024;

/// Deepest array nesting accepted before the stream is declared corrupt
pub const MAX_NESTING_DEPTH: usize = 128;

const SIMPLE_STRING: u8 = b'+';
const ERROR: u8 = b'-';
const INTEGER: u8 = b':';
const BULK_STRING: u8 = b'$';
const ARRAY: u8 = b'*';

const CRLF: &[u8; 2] = b"\r\n";

/// Read one complete reply
///
/// A top-level `-` reply becomes [`RedwireError::Server`]; the reply is fully
/// consumed either way, so the stream stays aligned.
pub fn read_reply<S: Socket>(transport: &mut Transport<S>) -> Result<ReplyValue> {
    read_frame(transport)?.into_result()
}

/// Read one complete reply, keeping a top-level `-` as [`ReplyValue::Error`]
///
/// Batches use this so every reply is paired with its decoder before any
/// server error is raised.
pub fn read_frame<S: Socket>(transport: &mut Transport<S>) -> Result<ReplyValue> {
    read_value(transport, 0)
}

fn read_value<S: Socket>(transport: &mut Transport<S>, depth: usize) -> Result<ReplyValue> {
    let tag = transport.read_byte()?;
    match tag {
        SIMPLE_STRING => Ok(ReplyValue::SimpleString(read_text(transport)?)),
        ERROR => Ok(ReplyValue::Error(read_text(transport)?)),
        INTEGER => Ok(ReplyValue::Integer(read_integer(transport)?)),
        BULK_STRING => read_bulk_string(transport),
        ARRAY => read_array(transport, depth),
        other => Err(RedwireError::protocol(format!(
            "unexpected reply type byte 0x{:02x}",
            other
        ))),
    }
}

// $<length>\r\n<data>\r\n
fn read_bulk_string<S: Socket>(transport: &mut Transport<S>) -> Result<ReplyValue> {
    let length = read_integer(transport)?;
    if length == -1 {
        return Ok(ReplyValue::Nil);
    }
    if length < -1 {
        return Err(RedwireError::protocol(format!(
            "negative bulk string length: {}",
            length
        )));
    }
    if length > MAX_BULK_LENGTH {
        return Err(RedwireError::protocol(format!(
            "bulk string length {} exceeds {}",
            length, MAX_BULK_LENGTH
        )));
    }

    let data = transport.read(length as usize)?;
    let mut delimiter = [0u8; 2];
    transport.read_exact(&mut delimiter)?;
    if &delimiter != CRLF {
        return Err(RedwireError::protocol("bulk string not terminated by CRLF"));
    }

    Ok(ReplyValue::BulkString(Bytes::from(data)))
}

// *<number-of-elements>\r\n<element-1>...<element-n>
fn read_array<S: Socket>(transport: &mut Transport<S>, depth: usize) -> Result<ReplyValue> {
    let count = read_integer(transport)?;
    if count == -1 {
        return Ok(ReplyValue::Nil);
    }
    if count < -1 {
        return Err(RedwireError::protocol(format!(
            "negative array length: {}",
            count
        )));
    }
    if depth >= MAX_NESTING_DEPTH {
        return Err(RedwireError::protocol(format!(
            "arrays nested deeper than {}",
            MAX_NESTING_DEPTH
        )));
    }

    // Cap the up-front reservation; a lying header must not allocate gigabytes.
    let mut items = Vec::with_capacity((count as usize).min(1024));
    for _ in 0..count {
        items.push(read_value(transport, depth + 1)?);
    }
    Ok(ReplyValue::Array(items))
}

fn read_text<S: Socket>(transport: &mut Transport<S>) -> Result<String> {
    let line = transport.read_line()?;
    String::from_utf8(line).map_err(|_| RedwireError::protocol("reply line is not valid UTF-8"))
}

fn read_integer<S: Socket>(transport: &mut Transport<S>) -> Result<i64> {
    let line = transport.read_line()?;
    parse_integer(&line)
}

/// Parse a base-10 signed integer header line
pub fn parse_integer(line: &[u8]) -> Result<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or_else(|| {
            RedwireError::protocol(format!(
                "unable to parse {:?} as an integer",
                String::from_utf8_lossy(line)
            ))
        })
}
