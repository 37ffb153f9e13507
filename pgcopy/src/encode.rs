//! Typed field input.
//!
//! - [`Encode`]
//! - [`Encoded`]
//! - [`EncodeError`]
use bytes::Bytes;
use std::fmt;
use time::UtcDateTime;

use crate::{
    postgres::{PgElement, PgType, Type},
    value::{Array, Value},
};

/// Value which can be written as a field.
pub trait Encode {
    /// Encode the value with its postgres type.
    fn encode(self) -> Encoded;
}

/// A value paired with the postgres type it will be written as.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    ty: Type,
    value: Value,
}

impl Encoded {
    /// Pair a value with its type.
    ///
    /// Whether the value is representable as the type is checked when
    /// the value is written.
    pub fn new(ty: Type, value: impl Into<Value>) -> Encoded {
        Encoded { ty, value: value.into() }
    }

    /// NULL value of given type.
    pub const fn null(ty: Type) -> Encoded {
        Encoded { ty, value: Value::Null }
    }

    pub const fn ty(&self) -> Type {
        self.ty
    }

    pub const fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl Encode for Encoded {
    fn encode(self) -> Encoded {
        self
    }
}

macro_rules! encode {
    ($($ty:ty),*) => {
        $(
            impl Encode for $ty {
                fn encode(self) -> Encoded {
                    Encoded::new(<$ty as PgType>::TYPE, self)
                }
            }
        )*
    };
}

encode!(bool, Bytes, i16, i32, i64, f32, f64, String, &str, serde_json::Value, UtcDateTime);

impl<T> Encode for Option<T>
where
    T: Encode + PgType,
{
    fn encode(self) -> Encoded {
        match self {
            Some(value) => value.encode(),
            None => Encoded::null(T::TYPE),
        }
    }
}

impl<T> Encode for Vec<T>
where
    T: Encode + PgElement,
{
    fn encode(self) -> Encoded {
        let array = self.into_iter().map(|e| e.encode().into_value()).collect::<Array>();
        Encoded::new(T::ARRAY, array)
    }
}

/// An error when encoding field value.
pub enum EncodeError {
    /// Value is not representable as the declared type.
    TypeMismatch { ty: Type, found: &'static str },
    /// Value is out of range of the declared type.
    OutOfRange(Type),
    /// Encoded field length exceed `i32::MAX`.
    TooLarge(usize),
    /// Row field count exceed `65534`.
    TooManyFields(usize),
    /// Array have more dimensions than supported.
    InvalidDimensions(usize),
    /// Failed to serialize using `serde_json`.
    Json(serde_json::Error),
}

impl std::error::Error for EncodeError { }

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to encode value, ")?;
        match self {
            Self::TypeMismatch { ty, found } => write!(f, "cannot encode {found} as {ty}"),
            Self::OutOfRange(ty) => write!(f, "value out of range for {ty}"),
            Self::TooLarge(len) => write!(f, "field length too large: {len}"),
            Self::TooManyFields(len) => write!(f, "too many fields in a row: {len}"),
            Self::InvalidDimensions(ndim) => write!(f, "invalid number of array dimensions: {ndim}"),
            Self::Json(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Debug for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl From<serde_json::Error> for EncodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
