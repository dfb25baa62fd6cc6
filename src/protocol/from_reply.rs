//! Typed reply conversion
//!
//! [`FromReply`] is the decode half of the command codec: it turns a generic
//! [`ReplyValue`] into the concrete result a caller asked for. Every impl
//! refuses `ReplyValue::Error`, so a server error can never pass as data.

use bytes::Bytes;

use crate::error::{RedwireError, Result};

use super::ReplyValue;

/// Conversion from a decoded reply into a concrete result type
pub trait FromReply: Sized {
    fn from_reply(reply: ReplyValue) -> Result<Self>;
}

fn mismatch<T>(expected: &str, reply: &ReplyValue) -> Result<T> {
    Err(RedwireError::decode(format!(
        "expected {}, got {}",
        expected,
        reply.kind()
    )))
}

impl FromReply for ReplyValue {
    fn from_reply(reply: ReplyValue) -> Result<Self> {
        reply.into_result()
    }
}

impl FromReply for i64 {
    fn from_reply(reply: ReplyValue) -> Result<Self> {
        match reply.into_result()? {
            ReplyValue::Integer(n) => Ok(n),
            other => mismatch("integer", &other),
        }
    }
}

impl FromReply for u64 {
    fn from_reply(reply: ReplyValue) -> Result<Self> {
        let n = i64::from_reply(reply)?;
        u64::try_from(n).map_err(|_| RedwireError::decode(format!("negative integer {}", n)))
    }
}

impl FromReply for bool {
    /// `:1`/`:0`, `+OK`, or nil (false)
    fn from_reply(reply: ReplyValue) -> Result<Self> {
        match reply.into_result()? {
            ReplyValue::Nil => Ok(false),
            ReplyValue::Integer(n) => Ok(n != 0),
            ReplyValue::SimpleString(ref s) if s == "OK" => Ok(true),
            other => mismatch("integer or OK status", &other),
        }
    }
}

impl FromReply for f64 {
    fn from_reply(reply: ReplyValue) -> Result<Self> {
        match reply.into_result()? {
            ReplyValue::Integer(n) => Ok(n as f64),
            ReplyValue::BulkString(data) => parse_float(&data),
            ReplyValue::SimpleString(text) => parse_float(text.as_bytes()),
            other => mismatch("number", &other),
        }
    }
}

fn parse_float(data: &[u8]) -> Result<f64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.trim().parse::<f64>().ok())
        .ok_or_else(|| {
            RedwireError::decode(format!(
                "unable to parse {:?} as a float",
                String::from_utf8_lossy(data)
            ))
        })
}

impl FromReply for String {
    fn from_reply(reply: ReplyValue) -> Result<Self> {
        match reply.into_result()? {
            ReplyValue::SimpleString(text) => Ok(text),
            ReplyValue::BulkString(data) => String::from_utf8(data.to_vec())
                .map_err(|_| RedwireError::decode("bulk string is not valid UTF-8")),
            other => mismatch("string", &other),
        }
    }
}

impl FromReply for Bytes {
    fn from_reply(reply: ReplyValue) -> Result<Self> {
        match reply.into_result()? {
            ReplyValue::BulkString(data) => Ok(data),
            ReplyValue::SimpleString(text) => Ok(Bytes::from(text)),
            other => mismatch("string", &other),
        }
    }
}

impl FromReply for Vec<u8> {
    fn from_reply(reply: ReplyValue) -> Result<Self> {
        Bytes::from_reply(reply).map(|data| data.to_vec())
    }
}

impl FromReply for () {
    fn from_reply(reply: ReplyValue) -> Result<Self> {
        reply.into_result().map(|_| ())
    }
}

impl<T: FromReply> FromReply for Option<T> {
    fn from_reply(reply: ReplyValue) -> Result<Self> {
        match reply {
            ReplyValue::Nil => Ok(None),
            other => T::from_reply(other).map(Some),
        }
    }
}

impl<T: FromReply> FromReply for Vec<T> {
    fn from_reply(reply: ReplyValue) -> Result<Self> {
        match reply.into_result()? {
            ReplyValue::Array(items) => items.into_iter().map(T::from_reply).collect(),
            other => mismatch("array", &other),
        }
    }
}

/// Keeps a per-item failure as data, e.g. one failed command in a pipeline
impl<T: FromReply> FromReply for Result<T> {
    fn from_reply(reply: ReplyValue) -> Result<Self> {
        Ok(T::from_reply(reply))
    }
}

macro_rules! tuple_from_reply {
    ($len:expr; $($name:ident),+) => {
        impl<$($name: FromReply),+> FromReply for ($($name,)+) {
            fn from_reply(reply: ReplyValue) -> Result<Self> {
                match reply.into_result()? {
                    ReplyValue::Array(items) if items.len() == $len => {
                        let mut items = items.into_iter();
                        Ok(($(
                            $name::from_reply(items.next().unwrap_or(ReplyValue::Nil))?,
                        )+))
                    }
                    ReplyValue::Array(items) => Err(RedwireError::decode(format!(
                        "expected array of {} elements, got {}",
                        $len,
                        items.len()
                    ))),
                    other => mismatch("array", &other),
                }
            }
        }
    };
}

tuple_from_reply!(2; A, B);
tuple_from_reply!(3; A, B, C);

/// Decode `reply` as `T`
pub fn decode<T: FromReply>(reply: ReplyValue) -> Result<T> {
    T::from_reply(reply)
}
