//! Field mapping configuration.
//!
//! A [`Mapping`] associate each field position in a row with a key, an
//! optional [`Type`] used to decode the field, and a [`FieldMode`].
//!
//! It can be built programmatically:
//!
//! ```
//! use pgcopy::{Mapping, postgres::Type};
//!
//! let mapping = Mapping::new()
//!     .field("id", Type::Int4)
//!     .field("name", Type::Text)
//!     .stream("blob");
//! assert_eq!(mapping.position("blob"), Some(2));
//! ```
//!
//! parsed from compact `key[:type[:mode]]` list:
//!
//! ```
//! # use pgcopy::Mapping;
//! let mapping: Mapping = "id:int4,name:text,blob::async".parse().unwrap();
//! assert_eq!(mapping.len(), 3);
//! ```
//!
//! or deserialized from json:
//!
//! ```
//! # use pgcopy::Mapping;
//! let json = r#"[{"key":"id","type":"int4"},{"key":"blob","mode":"async"}]"#;
//! let mapping: Mapping = serde_json::from_str(json).unwrap();
//! assert_eq!(mapping.len(), 2);
//! ```
//!
//! Keys must be unique and non empty. The builder methods panic on a
//! duplicate key, [`Mapping::try_push`], parsing and deserialization
//! return [`ParseError`] instead.
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, env::var, fmt, str::FromStr, sync::Arc};

use crate::postgres::Type;

/// How a field is consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldMode {
    /// Buffer the whole field, then decode it.
    #[default]
    Sync,
    /// Stream raw field bytes as they arrive.
    Async,
}

/// Mapping of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    key: Arc<str>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    ty: Option<Type>,
    #[serde(default)]
    mode: FieldMode,
}

impl FieldSpec {
    pub fn new(key: impl Into<Arc<str>>, ty: Option<Type>, mode: FieldMode) -> Self {
        Self { key: key.into(), ty, mode }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn key_arc(&self) -> Arc<str> {
        self.key.clone()
    }

    /// Type used to decode the field, untyped field is kept as raw bytes.
    pub const fn ty(&self) -> Option<Type> {
        self.ty
    }

    pub const fn mode(&self) -> FieldMode {
        self.mode
    }
}

/// Ordered field mapping, see [module level docs][self].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldSpec>", into = "Vec<FieldSpec>")]
pub struct Mapping {
    fields: Vec<FieldSpec>,
}

impl Mapping {
    /// Create empty mapping.
    pub fn new() -> Mapping {
        Self::default()
    }

    /// Add buffered field decoded as `ty`.
    ///
    /// # Panics
    ///
    /// Panics if key is already mapped.
    pub fn field(self, key: impl Into<Arc<str>>, ty: Type) -> Self {
        self.push(FieldSpec::new(key, Some(ty), FieldMode::Sync))
    }

    /// Add buffered field kept as raw bytes.
    ///
    /// # Panics
    ///
    /// Panics if key is already mapped.
    pub fn untyped(self, key: impl Into<Arc<str>>) -> Self {
        self.push(FieldSpec::new(key, None, FieldMode::Sync))
    }

    /// Add streamed field.
    ///
    /// # Panics
    ///
    /// Panics if key is already mapped.
    pub fn stream(self, key: impl Into<Arc<str>>) -> Self {
        self.push(FieldSpec::new(key, None, FieldMode::Async))
    }

    /// Add field.
    ///
    /// # Panics
    ///
    /// Panics if key is already mapped, use [`try_push`][Mapping::try_push]
    /// for untrusted keys.
    pub fn push(mut self, spec: FieldSpec) -> Self {
        assert!(self.position(spec.key()).is_none(), "duplicate mapping key: {:?}", spec.key());
        self.fields.push(spec);
        self
    }

    /// Add field, returns error if key is empty or already mapped.
    pub fn try_push(mut self, spec: FieldSpec) -> Result<Self, ParseError> {
        if spec.key().is_empty() {
            return Err(ParseError::new(format!("empty key at field {}", self.len())));
        }
        if self.position(spec.key()).is_some() {
            return Err(ParseError::new(format!("duplicate key {:?}", spec.key())));
        }
        self.fields.push(spec);
        Ok(self)
    }

    /// Returns the number of mapped fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the mapping of the field at `index`.
    pub fn get(&self, index: usize) -> Option<&FieldSpec> {
        self.fields.get(index)
    }

    /// Returns the position of field with `key`.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|spec| spec.key() == key)
    }

    /// Returns the mode of field at `index`, unmapped field is buffered.
    pub fn mode(&self, index: usize) -> FieldMode {
        self.get(index).map(FieldSpec::mode).unwrap_or_default()
    }

    /// Returns the type of field at `index`.
    pub fn ty(&self, index: usize) -> Option<Type> {
        self.get(index).and_then(FieldSpec::ty)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldSpec> {
        self.fields.iter()
    }

    /// Parse compact mapping, `key[:type[:mode]]` separated by comma.
    ///
    /// Type may be left empty for untyped field, e.g. `blob::async`.
    pub fn parse(s: &str) -> Result<Mapping, ParseError> {
        let mut fields = vec![];

        for item in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let mut parts = item.split(':').map(str::trim);

            let key = match parts.next() {
                Some(key) if !key.is_empty() => key,
                _ => return Err(ParseError::new(format!("empty key in {item:?}"))),
            };

            let ty = match parts.next() {
                None | Some("") => None,
                Some(name) => Some(name.parse::<Type>().map_err(|e| ParseError::new(e.to_string()))?),
            };

            let mode = match parts.next() {
                None | Some("") | Some("sync") => FieldMode::Sync,
                Some("async") => FieldMode::Async,
                Some(mode) => return Err(ParseError::new(format!("unknown mode {mode:?}"))),
            };

            if parts.next().is_some() {
                return Err(ParseError::new(format!("too many parts in {item:?}")));
            }

            fields.push(FieldSpec::new(key, ty, mode));
        }

        Mapping::try_from(fields)
    }

    /// Read mapping from environment variable.
    ///
    /// Value starting with `[` is parsed as json, otherwise as compact
    /// mapping. Returns `Ok(None)` if the variable is not set.
    pub fn from_env(name: &str) -> Result<Option<Mapping>, ParseError> {
        let Ok(value) = var(name) else {
            return Ok(None);
        };
        let value = value.trim();
        let mapping = match value.starts_with('[') {
            true => serde_json::from_str(value).map_err(|e| ParseError::new(e.to_string()))?,
            false => Mapping::parse(value)?,
        };
        Ok(Some(mapping))
    }
}

impl TryFrom<Vec<FieldSpec>> for Mapping {
    type Error = ParseError;

    fn try_from(fields: Vec<FieldSpec>) -> Result<Self, Self::Error> {
        fields.into_iter().try_fold(Mapping::new(), Mapping::try_push)
    }
}

impl From<Mapping> for Vec<FieldSpec> {
    fn from(mapping: Mapping) -> Self {
        mapping.fields
    }
}

impl FromStr for Mapping {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'a> IntoIterator for &'a Mapping {
    type Item = &'a FieldSpec;

    type IntoIter = std::slice::Iter<'a, FieldSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Error when parsing mapping.
pub struct ParseError {
    reason: Cow<'static,str>,
}

impl ParseError {
    fn new(reason: impl Into<Cow<'static,str>>) -> Self {
        Self { reason: reason.into() }
    }
}

impl std::error::Error for ParseError { }

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f.write_str(&self.reason)
        }
        write!(f, "failed to parse mapping: {}", self.reason)
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_compact() {
        let mapping = Mapping::parse("id:int4, name:varchar , tags:text[], blob::async, raw").unwrap();
        assert_eq!(mapping.len(), 5);
        assert_eq!(mapping.ty(0), Some(Type::Int4));
        assert_eq!(mapping.ty(2), Some(Type::TextArray));
        assert_eq!(mapping.mode(3), FieldMode::Async);
        assert_eq!(mapping.ty(3), None);
        assert_eq!(mapping.ty(4), None);
        assert_eq!(mapping.mode(4), FieldMode::Sync);
        assert_eq!(mapping.mode(99), FieldMode::Sync);
        assert_eq!(mapping.position("blob"), Some(3));
        assert!(Mapping::parse("").unwrap().is_empty());
    }

    #[test]
    fn parse_error() {
        assert!(Mapping::parse("id:numeric").is_err());
        assert!(Mapping::parse("id:int4:lazy").is_err());
        assert!(Mapping::parse(":int4").is_err());
        assert!(Mapping::parse("id:int4:sync:more").is_err());
        let err = Mapping::parse("id:int4,id:text").unwrap_err();
        assert_eq!(format!("{err:#}"), "duplicate key \"id\"");
    }

    #[test]
    fn json() {
        let json = r#"[
            {"key":"c1","type":"int4"},
            {"key":"c2","type":"_jsonb","mode":"sync"},
            {"key":"c3","mode":"async"}
        ]"#;
        let mapping: Mapping = serde_json::from_str(json).unwrap();
        assert_eq!(
            mapping,
            Mapping::new()
                .field("c1", Type::Int4)
                .field("c2", Type::JsonbArray)
                .stream("c3")
        );

        let ser = serde_json::to_string(&mapping).unwrap();
        assert_eq!(serde_json::from_str::<Mapping>(&ser).unwrap(), mapping);

        assert!(serde_json::from_str::<Mapping>(r#"[{"key":"a","type":"money"}]"#).is_err());
        assert!(serde_json::from_str::<Mapping>(r#"[{"key":"a"},{"key":"a"}]"#).is_err());
    }

    #[test]
    fn try_push_duplicate() {
        let mapping = Mapping::new()
            .try_push(FieldSpec::new("a", Some(Type::Int4), FieldMode::Sync))
            .unwrap();

        let err = mapping
            .clone()
            .try_push(FieldSpec::new("a", None, FieldMode::Async))
            .unwrap_err();
        assert_eq!(format!("{err:#}"), "duplicate key \"a\"");

        let err = mapping.clone().try_push(FieldSpec::new("", None, FieldMode::Sync)).unwrap_err();
        assert_eq!(format!("{err:#}"), "empty key at field 1");

        let mapping = mapping.try_push(FieldSpec::new("b", None, FieldMode::Async)).unwrap();
        assert_eq!(mapping.position("b"), Some(1));
    }

    #[test]
    #[should_panic = "duplicate mapping key"]
    fn builder_duplicate() {
        let _ = Mapping::new().untyped("a").untyped("a");
    }
}
