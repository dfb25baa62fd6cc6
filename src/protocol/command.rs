//! Command encoding
//!
//! Requests go out as a RESP array of bulk strings:
//!
//! ```text
//! *<argc>\r\n
//! $<len>\r\n<arg bytes>\r\n     (once per argument)
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// Pre-framed `MULTI`
pub const MULTI: &[u8] = b"*1\r\n$5\r\nMULTI\r\n";

/// Pre-framed `EXEC`
pub const EXEC: &[u8] = b"*1\r\n$4\r\nEXEC\r\n";

/// Pre-framed `DISCARD`
pub const DISCARD: &[u8] = b"*1\r\n$7\r\nDISCARD\r\n";

/// Encode an argument list into one ready-to-send frame
pub fn encode_command<A: AsRef<[u8]>>(args: &[A]) -> Bytes {
    let payload: usize = args.iter().map(|a| a.as_ref().len() + 16).sum();
    let mut out = BytesMut::with_capacity(16 + payload);
    put_header(&mut out, b'*', args.len());
    for arg in args {
        put_bulk(&mut out, arg.as_ref());
    }
    out.freeze()
}

fn put_header(out: &mut BytesMut, tag: u8, n: usize) {
    out.put_u8(tag);
    out.put_slice(n.to_string().as_bytes());
    out.put_slice(b"\r\n");
}

fn put_bulk(out: &mut BytesMut, data: &[u8]) {
    put_header(out, b'$', data.len());
    out.put_slice(data);
    out.put_slice(b"\r\n");
}

// =============================================================================
// Arguments
// =============================================================================

/// A value that can be written as command arguments
///
/// Every value writes one argument except `None`, which writes nothing.
/// Repeated arguments such as `DEL k1 k2 k3` go through [`Cmd::args`].
pub trait ToArg {
    fn write_args(&self, out: &mut Vec<Vec<u8>>);
}

impl ToArg for [u8] {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        out.push(self.to_vec());
    }
}

impl ToArg for str {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        out.push(self.as_bytes().to_vec());
    }
}

impl ToArg for String {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        self.as_str().write_args(out);
    }
}

impl ToArg for Vec<u8> {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        out.push(self.clone());
    }
}

impl ToArg for Bytes {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        out.push(self.to_vec());
    }
}

impl<const N: usize> ToArg for [u8; N] {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        out.push(self.to_vec());
    }
}

macro_rules! display_arg {
    ($($t:ty),*) => {
        $(
            impl ToArg for $t {
                fn write_args(&self, out: &mut Vec<Vec<u8>>) {
                    out.push(self.to_string().into_bytes());
                }
            }
        )*
    };
}

display_arg!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<T: ToArg + ?Sized> ToArg for &T {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        (**self).write_args(out);
    }
}

impl<T: ToArg> ToArg for Option<T> {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        if let Some(value) = self {
            value.write_args(out);
        }
    }
}

// =============================================================================
// Command Builder
// =============================================================================

/// A command under construction
///
/// ```
/// use redwire::Cmd;
///
/// let frame = Cmd::new("SET").arg("k").arg("v").arg("EX").arg(10).to_frame();
/// assert!(frame.starts_with(b"*5\r\n$3\r\nSET\r\n"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    args: Vec<Vec<u8>>,
}

impl Cmd {
    /// Start a command with its name
    pub fn new(name: &str) -> Self {
        Self {
            args: vec![name.as_bytes().to_vec()],
        }
    }

    /// Append one argument
    pub fn arg<T: ToArg>(mut self, value: T) -> Self {
        value.write_args(&mut self.args);
        self
    }

    /// Append every item as its own argument
    pub fn args<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToArg,
    {
        for value in values {
            value.write_args(&mut self.args);
        }
        self
    }

    /// Append an argument only when `condition` holds, e.g. a flag keyword
    pub fn arg_if<T: ToArg>(self, condition: bool, value: T) -> Self {
        if condition {
            self.arg(value)
        } else {
            self
        }
    }

    /// Command name as given to [`Cmd::new`]
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.args[0]).into_owned()
    }

    /// Number of arguments, including the command name
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Encode into a ready-to-send frame
    pub fn to_frame(&self) -> Bytes {
        encode_command(&self.args)
    }
}

impl From<&Cmd> for Bytes {
    fn from(cmd: &Cmd) -> Self {
        cmd.to_frame()
    }
}

impl From<Cmd> for Bytes {
    fn from(cmd: Cmd) -> Self {
        cmd.to_frame()
    }
}

/// Build a [`Cmd`] from a name and a list of arguments
///
/// ```
/// use redwire::cmd;
///
/// let frame = cmd!("INCRBY", "counter", 5).to_frame();
/// assert_eq!(&frame[..], b"*3\r\n$6\r\nINCRBY\r\n$7\r\ncounter\r\n$1\r\n5\r\n");
/// ```
#[macro_export]
macro_rules! cmd {
    ($name:expr $(, $arg:expr)* $(,)?) => {
        $crate::Cmd::new($name)$(.arg($arg))*
    };
}
