use std::{fmt, str::FromStr};

use bytes::Bytes;
use time::UtcDateTime;

/// Postgres object identifier.
///
/// The oid type is implemented as an unsigned four-byte integer.
///
/// <https://www.postgresql.org/docs/current/datatype-oid.html>
pub type Oid = u32;

macro_rules! catalog {
    ($(
        $(#[doc = $doc:literal])*
        $scalar:ident $sname:literal $soid:literal,
        $array:ident $aname:literal $aoid:literal;
    )*) => {
        /// Postgres types supported in `COPY BINARY` stream.
        ///
        /// Every scalar type have its corresponding one dimensional or
        /// multi dimensional array type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Type {
            $(
                $(#[doc = $doc])*
                $scalar,
                #[doc = concat!("Array of `", $sname, "`")]
                $array,
            )*
        }

        impl Type {
            /// All supported types.
            pub const ALL: &'static [Type] = &[$(Type::$scalar, Type::$array,)*];

            /// Returns the type [`Oid`].
            pub const fn oid(self) -> Oid {
                match self {
                    $(
                        Self::$scalar => $soid,
                        Self::$array => $aoid,
                    )*
                }
            }

            /// Returns postgres type name, as in `pg_type.typname`.
            pub const fn name(self) -> &'static str {
                match self {
                    $(
                        Self::$scalar => $sname,
                        Self::$array => $aname,
                    )*
                }
            }

            /// Lookup type from its [`Oid`].
            pub const fn from_oid(oid: Oid) -> Option<Type> {
                match oid {
                    $(
                        $soid => Some(Self::$scalar),
                        $aoid => Some(Self::$array),
                    )*
                    _ => None,
                }
            }

            /// Lookup type from its name, as in `pg_type.typname`.
            ///
            /// Array types can also be written with `[]` suffix, e.g. `int4[]`.
            pub fn from_name(name: &str) -> Option<Type> {
                if let Some(base) = name.strip_suffix("[]") {
                    return Self::from_name(base).and_then(Type::array);
                }
                match name {
                    $(
                        $sname => Some(Self::$scalar),
                        $aname => Some(Self::$array),
                    )*
                    _ => None,
                }
            }

            /// Returns the element type if current type is an array.
            pub const fn element(self) -> Option<Type> {
                match self {
                    $(Self::$array => Some(Self::$scalar),)*
                    _ => None,
                }
            }

            /// Returns the array type if current type is a scalar.
            pub const fn array(self) -> Option<Type> {
                match self {
                    $(Self::$scalar => Some(Self::$array),)*
                    _ => None,
                }
            }
        }
    };
}

catalog! {
    /// `bool` boolean, 'true'/'false'
    Bool "bool" 16, BoolArray "_bool" 1000;
    /// `bytea` variable-length string, binary values escaped
    Bytea "bytea" 17, ByteaArray "_bytea" 1001;
    /// `int2` -32 thousand to 32 thousand, 2-byte storage
    Int2 "int2" 21, Int2Array "_int2" 1005;
    /// `int4` -2 billion to 2 billion integer, 4-byte storage
    Int4 "int4" 23, Int4Array "_int4" 1007;
    /// `int8` ~18 digit integer, 8-byte storage
    Int8 "int8" 20, Int8Array "_int8" 1016;
    /// `text` variable-length string, no limit specified
    Text "text" 25, TextArray "_text" 1009;
    /// `varchar` variable-length string with limit
    Varchar "varchar" 1043, VarcharArray "_varchar" 1015;
    /// `json` JSON stored as text
    Json "json" 114, JsonArray "_json" 199;
    /// `jsonb` Binary JSON
    Jsonb "jsonb" 3802, JsonbArray "_jsonb" 3807;
    /// `float4` single-precision floating point number, 4-byte storage
    Float4 "float4" 700, Float4Array "_float4" 1021;
    /// `float8` double-precision floating point number, 8-byte storage
    Float8 "float8" 701, Float8Array "_float8" 1022;
    /// `timestamptz` date and time with time zone
    Timestamptz "timestamptz" 1184, TimestamptzArray "_timestamptz" 1185;
}

impl Type {
    /// Returns `true` if current type is an array type.
    pub const fn is_array(self) -> bool {
        self.element().is_some()
    }
}

impl FromStr for Type {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Type::from_name(s).ok_or_else(|| UnknownType::Name(s.into()))
    }
}

impl TryFrom<Oid> for Type {
    type Error = UnknownType;

    fn try_from(oid: Oid) -> Result<Self, Self::Error> {
        Type::from_oid(oid).ok_or(UnknownType::Oid(oid))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<'de> serde::Deserialize<'de> for Type {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

impl serde::Serialize for Type {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

/// An error when type lookup failed.
pub enum UnknownType {
    /// Type name is not in the catalog.
    Name(String),
    /// Type oid is not in the catalog.
    Oid(Oid),
}

impl std::error::Error for UnknownType { }

impl fmt::Display for UnknownType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "unknown type name: {name:?}"),
            Self::Oid(oid) => write!(f, "unknown type oid: {oid}"),
        }
    }
}

impl fmt::Debug for UnknownType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// A type that have corresponding postgres type.
pub trait PgType {
    const TYPE: Type;
}

/// A scalar type that can be an array element.
pub trait PgElement: PgType {
    /// The array type which element is `Self`.
    const ARRAY: Type;
}

impl<T> PgType for &T where T: PgType + ?Sized {
    const TYPE: Type = T::TYPE;
}

impl<T> PgType for Option<T> where T: PgType {
    const TYPE: Type = T::TYPE;
}

impl<T> PgElement for Option<T> where T: PgElement {
    const ARRAY: Type = T::ARRAY;
}

impl<T> PgType for Vec<T> where T: PgElement {
    const TYPE: Type = T::ARRAY;
}

macro_rules! pg_type {
    ($ty:ty, $scalar:ident, $array:ident) => {
        impl PgType for $ty {
            const TYPE: Type = Type::$scalar;
        }

        impl PgElement for $ty {
            const ARRAY: Type = Type::$array;
        }
    };
}

pg_type!(bool, Bool, BoolArray);
pg_type!(Bytes, Bytea, ByteaArray);
pg_type!(i16, Int2, Int2Array);
pg_type!(i32, Int4, Int4Array);
pg_type!(i64, Int8, Int8Array);
pg_type!(str, Text, TextArray);
pg_type!(String, Text, TextArray);
pg_type!(serde_json::Value, Jsonb, JsonbArray);
pg_type!(f32, Float4, Float4Array);
pg_type!(f64, Float8, Float8Array);
pg_type!(UtcDateTime, Timestamptz, TimestamptzArray);
