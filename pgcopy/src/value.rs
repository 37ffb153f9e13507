//! Decoded field value.
use bytes::Bytes;
use std::fmt;
use time::UtcDateTime;

use crate::ext::FmtExt;

/// A field value.
///
/// Variants are distinguished by its rust representation, thus `text` and
/// `varchar` are both [`Value::Text`], `json` and `jsonb` are both
/// [`Value::Json`]. The [`Type`][crate::postgres::Type] declared in mapping
/// or in array header decide the wire representation.
///
/// Field without declared type is represented as [`Value::Bytea`].
#[derive(Clone, PartialEq)]
pub enum Value {
    /// NULL field.
    Null,
    Bool(bool),
    Bytea(Bytes),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    /// `text` or `varchar`.
    Text(String),
    /// `json` or `jsonb`.
    Json(serde_json::Value),
    /// `timestamptz`, in millisecond resolution.
    Timestamptz(UtcDateTime),
    Array(Array),
}

impl Value {
    /// Return `true` if value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the variant name, used in error message.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Bytea(_) => "bytea",
            Self::Int2(_) => "int2",
            Self::Int4(_) => "int4",
            Self::Int8(_) => "int8",
            Self::Float4(_) => "float4",
            Self::Float8(_) => "float8",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
            Self::Timestamptz(_) => "timestamptz",
            Self::Array(_) => "array",
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytea(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int2(i) => Some(i.into()),
            Self::Int4(i) => Some(i.into()),
            Self::Int8(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => v.fmt(f),
            Self::Bytea(v) => v.lossy().fmt(f),
            Self::Int2(v) => v.fmt(f),
            Self::Int4(v) => v.fmt(f),
            Self::Int8(v) => v.fmt(f),
            Self::Float4(v) => v.fmt(f),
            Self::Float8(v) => v.fmt(f),
            Self::Text(v) => v.fmt(f),
            Self::Json(v) => write!(f, "{v}"),
            Self::Timestamptz(v) => write!(f, "{v}"),
            Self::Array(v) => v.fmt(f),
        }
    }
}

macro_rules! from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

from! {
    bool => Bool,
    Bytes => Bytea,
    i16 => Int2,
    i32 => Int4,
    i64 => Int8,
    f32 => Float4,
    f64 => Float8,
    String => Text,
    &str => Text,
    serde_json::Value => Json,
    UtcDateTime => Timestamptz,
    Array => Array,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A rectangular, possibly multi dimensional, array value.
///
/// Elements are stored flattened in row major order, along with the length
/// of each dimension, outermost first.
#[derive(Clone, Default, PartialEq)]
pub struct Array {
    dims: Vec<usize>,
    values: Vec<Value>,
}

impl Array {
    /// Create an array with zero dimension.
    pub const fn empty() -> Array {
        Array { dims: Vec::new(), values: Vec::new() }
    }

    /// Create array from flattened elements and its dimensions.
    ///
    /// Returns [`None`] if the product of dimensions does not equal to
    /// the elements length.
    pub fn new(dims: Vec<usize>, values: Vec<Value>) -> Option<Array> {
        if dims.is_empty() {
            return values.is_empty().then(Array::empty);
        }
        let len = dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))?;
        (len == values.len()).then_some(Array { dims, values })
    }

    /// Create one dimensional array.
    pub fn from_values(values: Vec<Value>) -> Array {
        Array { dims: vec![values.len()], values }
    }

    /// Create array from nested lists.
    ///
    /// Returns [`None`] if the lists is not rectangular. Lists with a zero
    /// length dimension, where every sibling is also empty, create an empty
    /// array.
    pub fn from_nested(nested: Nested) -> Option<Array> {
        let mut dims = vec![];
        let mut probe = &nested;
        while let Nested::List(list) = probe {
            dims.push(list.len());
            match list.first() {
                Some(first) => probe = first,
                None => break,
            }
        }

        if dims.is_empty() {
            return None;
        }

        // breadth first, one depth at a time, every node is checked
        let mut level = vec![nested];
        for &dim in &dims {
            let mut next = Vec::with_capacity(level.len().saturating_mul(dim));
            for node in level {
                match node {
                    Nested::List(list) if list.len() == dim => next.extend(list),
                    _ => return None,
                }
            }
            level = next;
        }

        let values = level
            .into_iter()
            .map(|node| match node {
                Nested::Value(value) => Some(value),
                Nested::List(_) => None,
            })
            .collect::<Option<Vec<_>>>()?;

        match values.is_empty() {
            true => Some(Array::empty()),
            false => Some(Array { dims, values }),
        }
    }

    /// Regroup the flattened elements into nested lists.
    pub fn to_nested(&self) -> Nested {
        let mut level: Vec<Nested> = self.values.iter().cloned().map(Nested::Value).collect();

        // innermost dimension first, outermost is the final single list
        for depth in (1..self.dims.len()).rev() {
            let groups = self.dims[..depth].iter().product::<usize>();
            let dim = self.dims[depth];
            let mut iter = level.into_iter();
            level = (0..groups)
                .map(|_| Nested::List(iter.by_ref().take(dim).collect()))
                .collect();
        }

        Nested::List(level)
    }

    /// Returns the length of each dimension, outermost first.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the number of dimension.
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Returns flattened elements.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns total number of elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if array contains no element.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume self into flattened elements.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl<T: Into<Value>> FromIterator<T> for Array {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Array::from_values(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_nested().fmt(f)
    }
}

/// Nested representation of [`Array`].
#[derive(Clone, PartialEq)]
pub enum Nested {
    Value(Value),
    List(Vec<Nested>),
}

impl Nested {
    /// Create a list of values.
    pub fn list<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Nested {
        Nested::List(values.into_iter().map(|v| Nested::Value(v.into())).collect())
    }
}

impl fmt::Debug for Nested {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => v.fmt(f),
            Self::List(list) => f.debug_list().entries(list).finish(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn matrix(rows: &[&[i32]]) -> Nested {
        Nested::List(rows.iter().map(|r| Nested::list(r.iter().copied())).collect())
    }

    #[test]
    fn nested_round_trip() {
        let nested = matrix(&[&[1, 2], &[3, 4], &[5, 6]]);
        let array = Array::from_nested(nested.clone()).unwrap();
        assert_eq!(array.dims(), &[3, 2]);
        assert_eq!(array.values()[2], Value::Int4(3));
        assert_eq!(array.to_nested(), nested);
    }

    #[test]
    fn three_dimension() {
        let nested = Nested::List(vec![
            matrix(&[&[1, 2, 3], &[4, 5, 6]]),
            matrix(&[&[7, 8, 9], &[10, 11, 12]]),
        ]);
        let array = Array::from_nested(nested.clone()).unwrap();
        assert_eq!(array.dims(), &[2, 2, 3]);
        assert_eq!(array.len(), 12);
        assert_eq!(array.to_nested(), nested);
    }

    #[test]
    fn irregular_rejected() {
        assert!(Array::from_nested(matrix(&[&[1, 2], &[3]])).is_none());
        assert!(Array::from_nested(Nested::Value(Value::Int4(1))).is_none());

        let empty_then_value = Nested::List(vec![Nested::List(vec![]), Nested::list([1i32])]);
        assert!(Array::from_nested(empty_then_value).is_none());
        let value_then_empty = Nested::List(vec![Nested::list([1i32]), Nested::List(vec![])]);
        assert!(Array::from_nested(value_then_empty).is_none());
        let mixed_depth = Nested::List(vec![
            Nested::list([1i32]),
            Nested::List(vec![Nested::list([2i32])]),
        ]);
        assert!(Array::from_nested(mixed_depth).is_none());
        assert!(Array::new(vec![2, 2], vec![Value::Null; 3]).is_none());
        assert!(Array::new(vec![], vec![Value::Null]).is_none());
    }

    #[test]
    fn empty() {
        let array = Array::from_nested(Nested::List(vec![])).unwrap();
        assert_eq!(array, Array::empty());
        assert_eq!(array.ndim(), 0);
        assert_eq!(array.to_nested(), Nested::List(vec![]));

        let empty_rows = Nested::List(vec![Nested::List(vec![]), Nested::List(vec![])]);
        assert_eq!(Array::from_nested(empty_rows).unwrap(), Array::empty());
    }

    #[test]
    fn zero_inner_dimension() {
        let array = Array::new(vec![2, 0], vec![]).unwrap();
        assert_eq!(array.dims(), &[2, 0]);
        assert_eq!(
            array.to_nested(),
            Nested::List(vec![Nested::List(vec![]), Nested::List(vec![])])
        );

        let array = Array::new(vec![0, 3], vec![]).unwrap();
        assert_eq!(array.to_nested(), Nested::List(vec![]));
    }

    #[test]
    fn one_dimension() {
        let array: Array = [true, false].into_iter().collect();
        assert_eq!(array.dims(), &[2]);
        assert_eq!(array.to_nested(), Nested::list([true, false]));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }
}
