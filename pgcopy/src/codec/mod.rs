//! Per type field encoding and decoding.
//!
//! Field data is in postgres binary `send`/`recv` representation, the
//! length prefix is written by [`encode_field`] and consumed by the frame
//! reader before [`decode`] is called.
use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    encode::EncodeError,
    ext::BytesMutExt,
    postgres::{NULL_LEN, Type},
    row::DecodeError,
    value::Value,
};

mod array;
mod scalar;

/// Postgres `MAXDIM`.
pub const MAX_DIMENSIONS: usize = 6;

/// Write field data of `value` as `ty`, without length prefix.
///
/// NULL is not representable as field data, use [`encode_field`] instead.
pub fn encode(ty: Type, value: &Value, dst: &mut BytesMut) -> Result<(), EncodeError> {
    match value {
        Value::Array(array) => array::encode(ty, array, dst),
        value => scalar::encode(ty, value, dst),
    }
}

/// Write length prefixed field, or `-1` if value is NULL.
pub fn encode_field(ty: Type, value: &Value, dst: &mut BytesMut) -> Result<(), EncodeError> {
    match value {
        Value::Null => {
            dst.put_i32(NULL_LEN);
            Ok(())
        }
        value => dst.put_len_prefixed(|dst| encode(ty, value, dst)),
    }
}

/// Decode field data as `ty`.
pub fn decode(ty: Type, bytes: Bytes) -> Result<Value, DecodeError> {
    use Type::*;
    let value = match ty {
        Bool => Value::Bool(scalar::decode_bool(bytes)?),
        Bytea => Value::Bytea(bytes),
        Int2 => Value::Int2(i16::from_be_bytes(scalar::fixed(ty, &bytes)?)),
        Int4 => Value::Int4(i32::from_be_bytes(scalar::fixed(ty, &bytes)?)),
        Int8 => Value::Int8(i64::from_be_bytes(scalar::fixed(ty, &bytes)?)),
        Text | Varchar => Value::Text(std::str::from_utf8(&bytes)?.to_owned()),
        Json => Value::Json(serde_json::from_slice(&bytes)?),
        Jsonb => Value::Json(scalar::decode_jsonb(&bytes)?),
        Float4 => Value::Float4(f32::from_be_bytes(scalar::fixed(ty, &bytes)?)),
        Float8 => Value::Float8(f64::from_be_bytes(scalar::fixed(ty, &bytes)?)),
        Timestamptz => Value::Timestamptz(scalar::decode_timestamptz(&bytes)?),
        BoolArray | ByteaArray | Int2Array | Int4Array | Int8Array | TextArray | VarcharArray
        | JsonArray | JsonbArray | Float4Array | Float8Array | TimestamptzArray => {
            Value::Array(array::decode(ty, bytes)?)
        }
    };
    Ok(value)
}

/// Decode a field as it appears in a row.
///
/// NULL field is [`Value::Null`] regardless of type, and field without
/// declared type is kept as [`Value::Bytea`].
pub fn decode_field(ty: Option<Type>, bytes: Option<Bytes>) -> Result<Value, DecodeError> {
    match (ty, bytes) {
        (_, None) => Ok(Value::Null),
        (None, Some(bytes)) => Ok(Value::Bytea(bytes)),
        (Some(ty), Some(bytes)) => decode(ty, bytes),
    }
}
