//! `pgcopy` error types.
use std::{backtrace::Backtrace, fmt, io};

use crate::{
    copy::{BackpressureError, FormatError, TruncatedError},
    encode::EncodeError,
    mapping::ParseError,
    postgres::UnknownType,
    row::DecodeError,
};

/// A specialized [`Result`] type for `pgcopy` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from `pgcopy` library.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Prepend context to the error message.
    pub fn with_context(mut self, context: impl fmt::Display) -> Self {
        self.context = match self.context.is_empty() {
            true => context.to_string(),
            false => format!("{context}: {}", self.context),
        };
        self
    }

    /// Returns `true` if input ended in the middle of a frame.
    pub fn is_truncated(&self) -> bool {
        matches!(self.kind, ErrorKind::Truncated(_))
    }
}

/// All possible error kind from `pgcopy` library.
pub enum ErrorKind {
    /// Malformed framing.
    Format(FormatError),
    /// Type name or array element oid not in the catalog.
    UnknownType(UnknownType),
    /// Input ended in the middle of a frame.
    Truncated(TruncatedError),
    /// Streaming field handle misuse.
    Backpressure(BackpressureError),
    Decode(DecodeError),
    Encode(EncodeError),
    Mapping(ParseError),
    Io(io::Error),
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<FormatError>e => ErrorKind::Format(e));
from!(<UnknownType>e => ErrorKind::UnknownType(e));
from!(<TruncatedError>e => ErrorKind::Truncated(e));
from!(<BackpressureError>e => ErrorKind::Backpressure(e));
from!(<EncodeError>e => ErrorKind::Encode(e));
from!(<ParseError>e => ErrorKind::Mapping(e));
from!(<io::Error>e => ErrorKind::Io(e));

from!(<DecodeError>e => match e {
    DecodeError::UnknownType(e) => ErrorKind::UnknownType(e),
    e => ErrorKind::Decode(e),
});

impl std::error::Error for Error { }

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format(e) => e.fmt(f),
            Self::UnknownType(e) => e.fmt(f),
            Self::Truncated(e) => e.fmt(f),
            Self::Backpressure(e) => e.fmt(f),
            Self::Decode(e) => e.fmt(f),
            Self::Encode(e) => e.fmt(f),
            Self::Mapping(e) => e.fmt(f),
            Self::Io(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
