use time::UtcDateTime;

use crate::{
    Decode, DecodeError,
    postgres::PG_EPOCH_MS,
    value::Value,
};

const NANOS_PER_MILLI: i128 = 1_000_000;
const MICROS_PER_MILLI: i64 = 1_000;

/// Microseconds since postgres epoch, sub millisecond precision is discarded.
///
/// Returns [`None`] if overflow.
pub fn to_pg_micros(datetime: UtcDateTime) -> Option<i64> {
    let millis = i64::try_from(datetime.unix_timestamp_nanos().div_euclid(NANOS_PER_MILLI)).ok()?;
    millis.checked_sub(PG_EPOCH_MS)?.checked_mul(MICROS_PER_MILLI)
}

/// Datetime from microseconds since postgres epoch, truncated toward zero
/// to millisecond precision.
///
/// Returns [`None`] if out of range of [`UtcDateTime`].
pub fn from_pg_micros(micros: i64) -> Option<UtcDateTime> {
    let millis = (micros / MICROS_PER_MILLI).checked_add(PG_EPOCH_MS)?;
    UtcDateTime::from_unix_timestamp_nanos(i128::from(millis) * NANOS_PER_MILLI).ok()
}

impl Decode for UtcDateTime {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Timestamptz(datetime) => Ok(datetime),
            value => Err(DecodeError::mismatch("timestamptz", &value)),
        }
    }
}
