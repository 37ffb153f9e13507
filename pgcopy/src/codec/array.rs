//! Array binary representation.
//!
//! ```text
//! ┏━━━━━━┳━━━━━━━━━┳━━━━━━━━━━━━━┳━━━━━━━━━━━━━━━━━━━━━━━━━━━┳━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┓
//! ┃ ndim ┃ hasnull ┃ element oid ┃ (length, lower bound) * ndim ┃ (length, data) * elements ┃
//! ┣━━━━━━╋━━━━━━━━━╋━━━━━━━━━━━━━╋━━━━━━━━━━━━━━━━━━━━━━━━━━━╋━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┫
//! ┃ i32  ┃   i32   ┃     u32     ┃        (i32, i32)         ┃         (i32, [u8])           ┃
//! ┗━━━━━━┻━━━━━━━━━┻━━━━━━━━━━━━━┻━━━━━━━━━━━━━━━━━━━━━━━━━━━┻━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛
//! ```
//!
//! Elements are flattened in row major order, NULL element have length `-1`.
use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::MAX_DIMENSIONS;
use crate::{
    common::verbose,
    encode::EncodeError,
    ext::{BufExt, UsizeExt},
    postgres::{NULL_LEN, Type},
    row::DecodeError,
    value::{Array, Value},
};

/// Lower bound of every dimension.
const LOWER_BOUND: i32 = 1;

pub(super) fn encode(ty: Type, array: &Array, dst: &mut BytesMut) -> Result<(), EncodeError> {
    let Some(elem) = ty.element() else {
        return Err(EncodeError::TypeMismatch { ty, found: "array" });
    };
    if array.ndim() > MAX_DIMENSIONS {
        return Err(EncodeError::InvalidDimensions(array.ndim()));
    }

    dst.put_i32(array.ndim().to_field_len()?);
    dst.put_i32(0);
    dst.put_u32(elem.oid());

    for &dim in array.dims() {
        dst.put_i32(dim.to_field_len()?);
        dst.put_i32(LOWER_BOUND);
    }

    for value in array.values() {
        super::encode_field(elem, value, dst)?;
    }

    Ok(())
}

/// Element type is resolved from the oid in array header.
pub(super) fn decode(ty: Type, mut bytes: Bytes) -> Result<Array, DecodeError> {
    let ndim = bytes.read_i32(ty)?;
    let _hasnull = bytes.read_i32(ty)?;
    let oid = bytes.read_u32(ty)?;

    let elem = Type::try_from(oid)?;
    if elem.is_array() {
        return Err(DecodeError::TypeMismatch { expected: "scalar element", found: elem.name() });
    }

    let ndim = match usize::try_from(ndim) {
        Ok(ndim) if ndim <= MAX_DIMENSIONS => ndim,
        _ => return Err(DecodeError::InvalidDimensions(ndim)),
    };

    verbose!(%ty, %elem, ndim, "array header");

    if ndim == 0 {
        return match bytes.has_remaining() {
            true => Err(DecodeError::TrailingBytes { ty }),
            false => Ok(Array::empty()),
        };
    }

    let mut dims = Vec::with_capacity(ndim);
    let mut total = 1usize;
    for _ in 0..ndim {
        let len = bytes.read_i32(ty)?;
        let _lower_bound = bytes.read_i32(ty)?;
        let dim = usize::try_from(len).map_err(|_| DecodeError::InvalidDimensions(len))?;
        total = total.checked_mul(dim).ok_or(DecodeError::InvalidDimensions(len))?;
        dims.push(dim);
    }

    // each element is at least its length word
    if total > bytes.remaining() / size_of::<i32>() {
        return Err(DecodeError::Truncated { ty });
    }

    let mut values = Vec::with_capacity(total);
    for _ in 0..total {
        let value = match bytes.read_i32(ty)? {
            NULL_LEN => Value::Null,
            len => {
                let len = usize::try_from(len).map_err(|_| DecodeError::NegativeLength(len))?;
                if bytes.remaining() < len {
                    return Err(DecodeError::Truncated { ty });
                }
                super::decode(elem, bytes.split_to(len))?
            }
        };
        values.push(value);
    }

    if bytes.has_remaining() {
        return Err(DecodeError::TrailingBytes { ty });
    }

    Array::new(dims, values).ok_or(DecodeError::InvalidDimensions(ndim as i32))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{postgres::UnknownType, value::Nested};

    fn int4_matrix(rows: &[&[i32]]) -> Array {
        let nested = Nested::List(rows.iter().map(|r| Nested::list(r.iter().copied())).collect());
        Array::from_nested(nested).unwrap()
    }

    fn encoded(ty: Type, array: &Array) -> Bytes {
        let mut buf = BytesMut::new();
        encode(ty, array, &mut buf).unwrap();
        buf.freeze()
    }

    #[test]
    fn bool_fixture() {
        let array: Array = [true, false].into_iter().collect();
        let mut buf = BytesMut::new();
        crate::codec::encode_field(Type::BoolArray, &Value::Array(array), &mut buf).unwrap();
        assert_eq!(
            &buf[..],
            b"\0\0\0\x1e\
              \0\0\0\x01\0\0\0\0\0\0\0\x10\
              \0\0\0\x02\0\0\0\x01\
              \0\0\0\x01\x01\0\0\0\x01\x00"
        );
    }

    #[test]
    fn int4_matrix_fixture() {
        let array = int4_matrix(&[&[1, 2], &[3, 4], &[5, 6]]);
        let bytes = encoded(Type::Int4Array, &array);
        assert_eq!(bytes.len(), 76);
        assert_eq!(&bytes[..12], b"\0\0\0\x02\0\0\0\0\0\0\0\x17");
        assert_eq!(&bytes[12..28], b"\0\0\0\x03\0\0\0\x01\0\0\0\x02\0\0\0\x01");
        assert_eq!(&bytes[28..36], b"\0\0\0\x04\0\0\0\x01");
        assert_eq!(decode(Type::Int4Array, bytes).unwrap(), array);
    }

    fn sample(elem: Type) -> Value {
        use Type::*;
        match elem {
            Bool => Value::Bool(true),
            Bytea => Value::Bytea(Bytes::from_static(b"\0\xff\r\n")),
            Int2 => Value::Int2(-32768),
            Int4 => Value::Int4(i32::MAX),
            Int8 => Value::Int8(-1),
            Text | Varchar => Value::Text("Foo, \"Bar\"".into()),
            Json | Jsonb => Value::Json(serde_json::json!({ "a": [1, null, "b"] })),
            Float4 => Value::Float4(-1.5),
            Float8 => Value::Float8(f64::MIN_POSITIVE),
            Timestamptz => {
                Value::Timestamptz(time::macros::datetime!(2024-02-29 13:37:42.123 UTC).to_utc())
            }
            _ => unreachable!("{elem} is not an element type"),
        }
    }

    #[test]
    fn every_array_type_round_trip() {
        for &ty in Type::ALL.iter().filter(|ty| ty.is_array()) {
            let value = sample(ty.element().unwrap());

            let line = Array::from_values(vec![value.clone(), Value::Null, value.clone()]);
            let square = Array::new(
                vec![2, 2],
                vec![value.clone(), Value::Null, value.clone(), value.clone()],
            )
            .unwrap();

            for array in [line, square] {
                let decoded = decode(ty, encoded(ty, &array)).unwrap();
                assert_eq!(decoded, array, "{ty}");
                assert_eq!(decoded.dims(), array.dims(), "{ty}");
            }
        }
    }

    #[test]
    fn square_round_trip() {
        let array = int4_matrix(&[&[1, 2], &[3, 4]]);
        let decoded = decode(Type::Int4Array, encoded(Type::Int4Array, &array)).unwrap();
        assert_eq!(decoded.dims(), &[2, 2]);
        assert_eq!(decoded.to_nested(), array.to_nested());
    }

    #[test]
    fn null_elements() {
        let array: Array = [Some("a"), None, Some("c")].into_iter().collect();
        let bytes = encoded(Type::TextArray, &array);
        assert_eq!(&bytes[4..8], b"\0\0\0\0", "hasnull is always zero");
        assert_eq!(decode(Type::TextArray, bytes).unwrap(), array);
    }

    #[test]
    fn empty_array() {
        let bytes = encoded(Type::Float8Array, &Array::empty());
        assert_eq!(&bytes[..], b"\0\0\0\0\0\0\0\0\0\0\x02\xbd");
        assert_eq!(decode(Type::Float8Array, bytes).unwrap(), Array::empty());
    }

    #[test]
    fn element_from_oid() {
        let array: Array = [1i64, 2].into_iter().collect();
        let bytes = encoded(Type::Int8Array, &array);
        // declared as text array, element resolved as int8 anyway
        assert_eq!(decode(Type::TextArray, bytes).unwrap(), array);
    }

    #[test]
    fn unknown_oid() {
        let bytes = Bytes::from_static(b"\0\0\0\x01\0\0\0\0\0\0\x06\xa4\0\0\0\x01\0\0\0\x01");
        let err = decode(Type::Int4Array, bytes).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownType(UnknownType::Oid(1700))));
    }

    #[test]
    fn malformed() {
        let valid = encoded(Type::Int4Array, &int4_matrix(&[&[1, 2]]));

        let err = decode(Type::Int4Array, valid.slice(..valid.len() - 1)).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));

        let mut trailing = BytesMut::from(&valid[..]);
        trailing.put_u8(0);
        let err = decode(Type::Int4Array, trailing.freeze()).unwrap_err();
        assert!(matches!(err, DecodeError::TrailingBytes { .. }));

        let mut ndim = BytesMut::from(&valid[..]);
        ndim[..4].copy_from_slice(&7i32.to_be_bytes());
        let err = decode(Type::Int4Array, ndim.freeze()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidDimensions(7)));

        // huge declared dimension with no element data
        let huge = Bytes::from_static(b"\0\0\0\x01\0\0\0\0\0\0\0\x17\x7f\xff\xff\xff\0\0\0\x01");
        let err = decode(Type::Int4Array, huge).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn nested_element_rejected() {
        let inner: Array = [1i32].into_iter().collect();
        let outer = Array::from_values(vec![Value::Array(inner)]);
        let err = encode(Type::Int4Array, &outer, &mut BytesMut::new()).unwrap_err();
        assert!(matches!(err, EncodeError::TypeMismatch { ty: Type::Int4, found: "array" }));
    }
}
