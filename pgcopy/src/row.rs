//! Decoded row operation.
//!
//! - [`Row`]
//! - [`Column`]
//! - [`FromRow`]
//! - [`Decode`]
//!
//! - [`Index`]
//! - [`DecodeError`]
use bytes::Bytes;
use std::{borrow::Cow, fmt, str::Utf8Error, sync::Arc};

use crate::{
    mapping::Mapping,
    postgres::{Type, UnknownType},
    value::{Array, Value},
};

/// A decoded row.
///
/// Columns are named when row is read with a [`Mapping`].
#[derive(Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
    mapping: Option<Arc<Mapping>>,
}

impl Row {
    /// Create positional row.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values, mapping: None }
    }

    /// Create row with named columns.
    pub fn with_mapping(values: Vec<Value>, mapping: Arc<Mapping>) -> Self {
        Self { values, mapping: Some(mapping) }
    }

    /// Returns `true` if row contains no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of fields/column.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns the column value.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the column name, if the row is read with a [`Mapping`]
    /// which cover the column.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.mapping.as_ref()?.get(index).map(|spec| spec.key())
    }

    /// Returns the mapping the row is read with.
    pub fn mapping(&self) -> Option<&Arc<Mapping>> {
        self.mapping.as_ref()
    }

    /// Returns all column values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume self into column values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Try get and decode column.
    pub fn try_get<I: Index, R: Decode>(&self, idx: I) -> Result<R, DecodeError> {
        let nth = idx.position(self)?;
        R::decode(self.values[nth].clone())
    }

    /// Try decode type using [`FromRow`] implementation.
    pub fn decode<D: FromRow>(self) -> Result<D, DecodeError> {
        D::from_row(self)
    }
}

impl IntoIterator for Row {
    type Item = Column;

    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            values: self.values.into_iter(),
            mapping: self.mapping,
            iter_n: 0,
        }
    }
}

/// [`IntoIterator`] implementation from [`Row`].
#[derive(Debug)]
pub struct IntoIter {
    values: std::vec::IntoIter<Value>,
    mapping: Option<Arc<Mapping>>,
    iter_n: usize,
}

impl IntoIter {
    /// Same as [`Iterator::next`] but returns [`Result`] instead.
    pub fn try_next(&mut self) -> Result<Column, DecodeError> {
        self.next().ok_or(DecodeError::IndexOutOfBounds(self.iter_n))
    }
}

impl Iterator for IntoIter {
    type Item = Column;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.values.next()?;
        let name = self
            .mapping
            .as_ref()
            .and_then(|m| m.get(self.iter_n))
            .map(|spec| spec.key_arc());
        let index = self.iter_n;
        self.iter_n += 1;
        Some(Column { index, name, value })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_map();
        for (i, value) in self.values.iter().enumerate() {
            match self.name(i) {
                Some(name) => dbg.entry(&name, value),
                None => dbg.entry(&i, value),
            };
        }
        dbg.finish()
    }
}

/// A column of a [`Row`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    index: usize,
    name: Option<Arc<str>>,
    value: Value,
}

impl Column {
    /// Returns column position in the row.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns column name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Return `true` if value is NULL.
    pub const fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub const fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Try decode type using [`Decode`] implementation.
    pub fn decode<D: Decode>(self) -> Result<D, DecodeError> {
        D::decode(self.value)
    }
}

// ===== Traits =====

/// Type that can be constructed from a row.
pub trait FromRow: Sized {
    /// Construct self from row.
    fn from_row(row: Row) -> Result<Self, DecodeError>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self, DecodeError> {
        Ok(row)
    }
}

impl FromRow for () {
    fn from_row(_: Row) -> Result<Self, DecodeError> {
        Ok(())
    }
}

macro_rules! from_row_tuple {
    ($($t:ident),*) => {
        impl<$($t),*> FromRow for ($($t),*,)
        where
            $($t: Decode),*
        {
            fn from_row(row: Row) -> Result<Self, DecodeError> {
                let mut iter = row.into_iter();
                Ok((
                    $(iter.try_next()?.decode::<$t>()?),*,
                ))
            }
        }
    };
}

from_row_tuple!(T0);
from_row_tuple!(T0, T1);
from_row_tuple!(T0, T1, T2);
from_row_tuple!(T0, T1, T2, T3);
from_row_tuple!(T0, T1, T2, T3, T4);
from_row_tuple!(T0, T1, T2, T3, T4, T5);

/// A type that can be constructed from [`Value`].
pub trait Decode: Sized {
    /// Try decode self from value.
    fn decode(value: Value) -> Result<Self, DecodeError>;
}

impl Decode for Value {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        Ok(value)
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        match value.is_null() {
            true => Ok(None),
            false => T::decode(value).map(Some),
        }
    }
}

/// Decode every array element, flattened.
impl<T: Decode> Decode for Vec<T> {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Array(array) => array.into_values().into_iter().map(T::decode).collect(),
            value => Err(DecodeError::mismatch("array", &value)),
        }
    }
}

macro_rules! decode {
    ($($ty:ty => $variant:ident $name:literal),* $(,)?) => {
        $(
            impl Decode for $ty {
                fn decode(value: Value) -> Result<Self, DecodeError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        value => Err(DecodeError::mismatch($name, &value)),
                    }
                }
            }
        )*
    };
}

decode! {
    bool => Bool "bool",
    Bytes => Bytea "bytea",
    i16 => Int2 "int2",
    i32 => Int4 "int4",
    f32 => Float4 "float4",
    f64 => Float8 "float8",
    String => Text "text",
    serde_json::Value => Json "json",
    Array => Array "array",
}

impl Decode for i64 {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        value.as_i64().ok_or_else(|| DecodeError::mismatch("int8", &value))
    }
}

/// Type that can be used for indexing column.
pub trait Index: Sized + sealed::Sealed {
    /// Returns the column position.
    fn position(self, row: &Row) -> Result<usize, DecodeError>;
}

impl Index for usize {
    fn position(self, row: &Row) -> Result<usize, DecodeError> {
        match self < row.len() {
            true => Ok(self),
            false => Err(DecodeError::IndexOutOfBounds(self)),
        }
    }
}

impl Index for &str {
    fn position(self, row: &Row) -> Result<usize, DecodeError> {
        row.mapping
            .as_ref()
            .and_then(|m| m.position(self))
            .filter(|&i| i < row.len())
            .ok_or_else(|| DecodeError::ColumnNotFound(String::from(self).into()))
    }
}

mod sealed {
    pub trait Sealed { }
    impl Sealed for usize { }
    impl Sealed for &str { }
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for DecodeError {
            fn from($pat: $ty) -> Self {
                $body
            }
        }
    };
}

/// An error when decoding field value.
pub enum DecodeError {
    /// Array element oid not in the catalog.
    UnknownType(UnknownType),
    /// Fixed width field have wrong length.
    InvalidLength { ty: Type, expected: usize, found: usize },
    /// Array element length is negative other than NULL.
    NegativeLength(i32),
    /// Field data ended before the value is complete.
    Truncated { ty: Type },
    /// Field data have bytes after the value is complete.
    TrailingBytes { ty: Type },
    /// Array have invalid dimensions.
    InvalidDimensions(i32),
    /// Unsupported `jsonb` version.
    JsonbVersion(u8),
    /// Value is out of range of rust type.
    OutOfRange(Type),
    /// Text field is not valid utf8.
    Utf8(Utf8Error),
    /// Failed to deserialize using `serde_json`.
    Json(serde_json::Error),
    /// Value variant requested missmatch.
    TypeMismatch { expected: &'static str, found: &'static str },
    /// Value is null.
    Null,
    /// Column requested not found.
    ColumnNotFound(Cow<'static,str>),
    /// Index requested is out of bounds.
    IndexOutOfBounds(usize),
}

impl DecodeError {
    /// [`DecodeError::Null`] if value is NULL, otherwise [`DecodeError::TypeMismatch`].
    pub fn mismatch(expected: &'static str, found: &Value) -> Self {
        match found {
            Value::Null => Self::Null,
            found => Self::TypeMismatch { expected, found: found.kind() },
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::UnknownType(e) => write!(f, "{e}"),
            Self::InvalidLength { ty, expected, found } => {
                write!(f, "invalid {ty} length, expected {expected} found {found}")
            }
            Self::NegativeLength(len) => write!(f, "negative element length: {len}"),
            Self::Truncated { ty } => write!(f, "{ty} data ended unexpectedly"),
            Self::TrailingBytes { ty } => write!(f, "trailing bytes after {ty} data"),
            Self::InvalidDimensions(dim) => write!(f, "invalid array dimension: {dim}"),
            Self::JsonbVersion(v) => write!(f, "unsupported jsonb version: {v}"),
            Self::OutOfRange(ty) => write!(f, "{ty} value out of range"),
            Self::Utf8(e) => write!(f, "{e}"),
            Self::Json(e) => write!(f, "{e}"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "data type missmatch, expected {expected} found {found}")
            }
            Self::Null => write!(f, "unexpected NULL value"),
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::IndexOutOfBounds(u) => write!(f, "index out of bounds: {u:?}"),
        }
    }
}

from!(<UnknownType>e => Self::UnknownType(e));
from!(<Utf8Error>e => Self::Utf8(e));
from!(<serde_json::Error>e => Self::Json(e));

impl std::error::Error for DecodeError { }

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn row() -> Row {
        let mapping = "id:int4,name:text,tags:_text".parse::<Mapping>().unwrap();
        Row::with_mapping(
            vec![
                Value::Int4(7),
                Value::Null,
                Value::Array(["a", "b"].into_iter().collect()),
            ],
            Arc::new(mapping),
        )
    }

    #[test]
    fn try_get() {
        let row = row();
        assert_eq!(row.try_get::<_, i32>(0).unwrap(), 7);
        assert_eq!(row.try_get::<_, i64>("id").unwrap(), 7);
        assert_eq!(row.try_get::<_, Option<String>>("name").unwrap(), None);
        assert_eq!(row.try_get::<_, Vec<String>>("tags").unwrap(), ["a", "b"]);

        assert!(matches!(row.try_get::<_, String>("name"), Err(DecodeError::Null)));
        assert!(matches!(row.try_get::<_, bool>(0), Err(DecodeError::TypeMismatch { .. })));
        assert!(matches!(row.try_get::<_, i32>(3), Err(DecodeError::IndexOutOfBounds(3))));
        assert!(matches!(row.try_get::<_, i32>("nope"), Err(DecodeError::ColumnNotFound(_))));
    }

    #[test]
    fn from_row_tuple() {
        let (id, name, tags) = row().decode::<(i32, Option<String>, Vec<String>)>().unwrap();
        assert_eq!(id, 7);
        assert_eq!(name, None);
        assert_eq!(tags.len(), 2);

        let err = row().decode::<(i32, Option<String>, Value, i32)>().unwrap_err();
        assert!(matches!(err, DecodeError::IndexOutOfBounds(3)));
    }

    #[test]
    fn columns() {
        let columns = row().into_iter().collect::<Vec<_>>();
        assert_eq!(columns[1].name(), Some("name"));
        assert_eq!(columns[2].index(), 2);
        assert!(columns[1].is_null());

        let positional = Row::new(vec![Value::Bool(true)]);
        let column = positional.into_iter().next().unwrap();
        assert_eq!(column.name(), None);
        assert!(column.decode::<bool>().unwrap());
    }
}
