//! Runtime agnostic `COPY BINARY` reader and writer.
//!
//! All reader is fed with byte chunks of arbitrary size, and make all
//! progress possible with currently buffered bytes.
//!
//! - [`Parser`], framing state machine, the base of every reader
//! - [`RowReader`], buffer and decode whole row
//! - [`FieldReader`], per field events, honoring [`FieldMode`][crate::FieldMode]
//! - [`RawReader`], field data only
//! - [`Writer`], the inverse
use bytes::{Bytes, BytesMut};
use std::fmt;

use crate::{ext::FmtExt, postgres::HEADER_LEN};

mod parser;
mod rows;
mod fields;
mod raw;
mod writer;

pub use parser::{Event, Parser, State};
pub use rows::RowReader;
pub use fields::{Field, FieldEvent, FieldInfo, FieldReader};
pub use raw::RawReader;
pub use writer::{Writer, WriterConfig, encode_rows};

/// Field data accumulator.
///
/// Field that arrive in a single chunk is not copied.
#[derive(Debug, Default)]
pub(crate) enum Accumulator {
    #[default]
    Empty,
    One(Bytes),
    Many(BytesMut),
}

impl Accumulator {
    pub(crate) fn push(&mut self, data: Bytes) {
        *self = match std::mem::take(self) {
            Self::Empty => Self::One(data),
            Self::One(first) => {
                let mut buf = BytesMut::with_capacity(first.len() + data.len());
                buf.extend_from_slice(&first);
                buf.extend_from_slice(&data);
                Self::Many(buf)
            }
            Self::Many(mut buf) => {
                buf.extend_from_slice(&data);
                Self::Many(buf)
            }
        };
    }

    pub(crate) fn take(&mut self) -> Bytes {
        match std::mem::take(self) {
            Self::Empty => Bytes::new(),
            Self::One(data) => data,
            Self::Many(buf) => buf.freeze(),
        }
    }
}

/// Malformed framing.
#[derive(Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Stream does not start with `COPY BINARY` file header.
    Header { found: [u8; HEADER_LEN] },
    /// Field length is negative other than NULL.
    NegativeLength(i32),
}

impl std::error::Error for FormatError { }

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header { found } => write!(f, "invalid file header: {:?}", found.lossy()),
            Self::NegativeLength(len) => write!(f, "invalid field length: {len}"),
        }
    }
}

impl fmt::Debug for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Input ended in the middle of a frame.
#[derive(Clone, PartialEq, Eq)]
pub struct TruncatedError {
    state: State,
    needed: usize,
}

impl TruncatedError {
    /// The state the parser is suspended in.
    pub fn state(&self) -> State {
        self.state
    }

    /// Minimum number of bytes required to advance the state.
    pub fn needed(&self) -> usize {
        self.needed
    }
}

impl std::error::Error for TruncatedError { }

impl fmt::Display for TruncatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stream ended unexpectedly at {}, {} more bytes required",
            self.state, self.needed
        )
    }
}

impl fmt::Debug for TruncatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Streaming field handle misuse.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BackpressureError {
    /// Field data arrive with no open field.
    NoOpenField,
    /// Closing field that is already closed.
    Closed,
}

impl std::error::Error for BackpressureError { }

impl fmt::Display for BackpressureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOpenField => f.write_str("field data without open field"),
            Self::Closed => f.write_str("field is already closed"),
        }
    }
}

impl fmt::Debug for BackpressureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accumulator() {
        let mut acc = Accumulator::default();
        assert!(acc.take().is_empty());

        let data = Bytes::from_static(b"whole");
        acc.push(data.clone());
        let taken = acc.take();
        assert_eq!(taken.as_ptr(), data.as_ptr());

        for chunk in [&b"sp"[..], b"li", b"t"] {
            acc.push(Bytes::copy_from_slice(chunk));
        }
        assert_eq!(acc.take(), "split");
        assert!(matches!(acc, Accumulator::Empty));
    }
}
