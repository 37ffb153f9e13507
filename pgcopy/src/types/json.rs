use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Decode, DecodeError,
    encode::{EncodeError, Encoded},
    postgres::{PgType, Type},
    value::Value,
};

/// Decode and Encode serde types as postgres json value.
///
/// Decoding accept both `json` and `jsonb` field, encoding produce `jsonb`.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T> PgType for Json<T> {
    const TYPE: Type = Type::Jsonb;
}

impl<T: Serialize> Json<T> {
    /// Serialize inner value as `jsonb` field.
    ///
    /// This is not an [`Encode`][crate::Encode] implementation because
    /// [`Serialize`] implementation may fail.
    pub fn try_encode(&self) -> Result<Encoded, EncodeError> {
        Ok(Encoded::new(Self::TYPE, serde_json::to_value(&self.0)?))
    }
}

impl<T> Decode for Json<T>
where
    T: DeserializeOwned,
{
    fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Json(json) => Ok(Self(serde_json::from_value(json)?)),
            value => Err(DecodeError::mismatch("json", &value)),
        }
    }
}

impl<T: Serialize> Serialize for Json<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Json<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self(T::deserialize(deserializer)?))
    }
}
