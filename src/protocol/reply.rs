//! Reply values
//!
//! The decoded form of one server reply.

use std::fmt;

use bytes::Bytes;

use crate::error::{RedwireError, Result};

/// One decoded RESP reply
///
/// `Nil` (from `$-1` or `*-1`) is distinct from an empty bulk string or an
/// empty array. `Error` holds a `-` reply as data: nested inside arrays, and
/// at the top level for each reply handed to a batch decoder. Single
/// requests such as [`Connection::execute`](crate::Connection::execute)
/// raise a top-level `-` as [`RedwireError::Server`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyValue {
    /// Absent value
    Nil,

    /// `:<integer>`
    Integer(i64),

    /// `+<text>` status reply
    SimpleString(String),

    /// `$<len>` binary-safe payload
    BulkString(Bytes),

    /// `*<count>` ordered elements
    Array(Vec<ReplyValue>),

    /// `-<message>` reported by the server
    Error(String),
}

impl ReplyValue {
    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ReplyValue::Nil => "nil",
            ReplyValue::Integer(_) => "integer",
            ReplyValue::SimpleString(_) => "simple string",
            ReplyValue::BulkString(_) => "bulk string",
            ReplyValue::Array(_) => "array",
            ReplyValue::Error(_) => "error",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, ReplyValue::Nil)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ReplyValue::Error(_))
    }

    /// True for the `+OK` status reply
    pub fn is_ok(&self) -> bool {
        matches!(self, ReplyValue::SimpleString(s) if s == "OK")
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ReplyValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Payload of a bulk or simple string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ReplyValue::BulkString(data) => Some(data),
            ReplyValue::SimpleString(text) => Some(text.as_bytes()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ReplyValue]> {
        match self {
            ReplyValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Turn an `Error` variant into [`RedwireError::Server`], pass anything else through
    pub fn into_result(self) -> Result<ReplyValue> {
        match self {
            ReplyValue::Error(message) => Err(RedwireError::Server(message)),
            value => Ok(value),
        }
    }
}

impl From<i64> for ReplyValue {
    fn from(n: i64) -> Self {
        ReplyValue::Integer(n)
    }
}

impl From<&str> for ReplyValue {
    fn from(s: &str) -> Self {
        ReplyValue::BulkString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<Vec<ReplyValue>> for ReplyValue {
    fn from(items: Vec<ReplyValue>) -> Self {
        ReplyValue::Array(items)
    }
}

// Rendered the way redis-cli prints replies.
impl fmt::Display for ReplyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_indented(self, f, 0)
    }
}

fn fmt_indented(value: &ReplyValue, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    match value {
        ReplyValue::Nil => write!(f, "(nil)"),
        ReplyValue::Integer(n) => write!(f, "(integer) {}", n),
        ReplyValue::SimpleString(s) => write!(f, "{}", s),
        ReplyValue::BulkString(data) => write!(f, "\"{}\"", data.escape_ascii()),
        ReplyValue::Error(message) => write!(f, "(error) {}", message),
        ReplyValue::Array(items) if items.is_empty() => write!(f, "(empty array)"),
        ReplyValue::Array(items) => {
            let width = items.len().to_string().len();
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, "\n{:indent$}", "", indent = indent)?;
                }
                write!(f, "{:>width$}) ", i + 1, width = width)?;
                fmt_indented(item, f, indent + width + 2)?;
            }
            Ok(())
        }
    }
}
