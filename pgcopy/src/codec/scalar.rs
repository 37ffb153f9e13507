use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    encode::EncodeError,
    postgres::Type,
    row::DecodeError,
    types::time::{from_pg_micros, to_pg_micros},
    value::Value,
};

/// `jsonb` binary format version.
const JSONB_VERSION: u8 = 1;

pub(super) fn encode(ty: Type, value: &Value, dst: &mut BytesMut) -> Result<(), EncodeError> {
    match (ty, value) {
        (Type::Bool, Value::Bool(v)) => dst.put_u8(u8::from(*v)),
        (Type::Bytea, Value::Bytea(v)) => dst.put_slice(v),
        (Type::Int2, v) if v.as_i64().is_some() => dst.put_i16(int(ty, v)?),
        (Type::Int4, v) if v.as_i64().is_some() => dst.put_i32(int(ty, v)?),
        (Type::Int8, v) if v.as_i64().is_some() => dst.put_i64(int(ty, v)?),
        (Type::Text | Type::Varchar, Value::Text(v)) => dst.put_slice(v.as_bytes()),
        (Type::Json, Value::Json(v)) => serde_json::to_writer((&mut *dst).writer(), v)?,
        (Type::Jsonb, Value::Json(v)) => {
            dst.put_u8(JSONB_VERSION);
            serde_json::to_writer((&mut *dst).writer(), v)?;
        }
        (Type::Float4, Value::Float4(v)) => dst.put_f32(*v),
        (Type::Float8, Value::Float8(v)) => dst.put_f64(*v),
        (Type::Timestamptz, Value::Timestamptz(v)) => {
            dst.put_i64(to_pg_micros(*v).ok_or(EncodeError::OutOfRange(ty))?)
        }
        (ty, value) => return Err(EncodeError::TypeMismatch { ty, found: value.kind() }),
    }
    Ok(())
}

fn int<T: TryFrom<i64>>(ty: Type, value: &Value) -> Result<T, EncodeError> {
    value
        .as_i64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or(EncodeError::OutOfRange(ty))
}

/// Exact width field data.
pub(super) fn fixed<const N: usize>(ty: Type, bytes: &[u8]) -> Result<[u8; N], DecodeError> {
    bytes.try_into().map_err(|_| DecodeError::InvalidLength {
        ty,
        expected: N,
        found: bytes.len(),
    })
}

pub(super) fn decode_bool(bytes: Bytes) -> Result<bool, DecodeError> {
    let [b] = fixed(Type::Bool, &bytes)?;
    Ok(b != 0)
}

pub(super) fn decode_jsonb(bytes: &[u8]) -> Result<serde_json::Value, DecodeError> {
    match bytes.split_first() {
        Some((&JSONB_VERSION, json)) => Ok(serde_json::from_slice(json)?),
        Some((&version, _)) => Err(DecodeError::JsonbVersion(version)),
        None => Err(DecodeError::Truncated { ty: Type::Jsonb }),
    }
}

pub(super) fn decode_timestamptz(bytes: &[u8]) -> Result<time::UtcDateTime, DecodeError> {
    let raw = i64::from_be_bytes(fixed(Type::Timestamptz, bytes)?);
    from_pg_micros(raw).ok_or(DecodeError::OutOfRange(Type::Timestamptz))
}
