use std::sync::Arc;

use super::{Accumulator, Event, Parser};
use crate::{
    Result,
    codec,
    common::{span, trace},
    mapping::Mapping,
    row::Row,
    value::Value,
};

/// Buffering row reader.
///
/// Every field is buffered, then decoded with type from [`Mapping`] if
/// any. Field without mapping is kept as raw bytes.
///
/// ```
/// use pgcopy::{Encode, Mapping, copy::{RowReader, encode_rows}};
///
/// let bytes = encode_rows([[7i32.encode(), "foo".encode()]], Default::default()).unwrap();
///
/// let mapping: Mapping = "id:int4,name:text".parse().unwrap();
/// let mut reader = RowReader::with_mapping(mapping);
/// reader.feed(&bytes);
///
/// let row = reader.next_row().unwrap().unwrap();
/// assert_eq!(row.try_get::<_, i32>("id").unwrap(), 7);
/// assert!(reader.next_row().unwrap().is_none());
/// assert!(reader.finish().is_ok());
/// ```
#[derive(Debug, Default)]
pub struct RowReader {
    parser: Parser,
    mapping: Option<Arc<Mapping>>,
    values: Vec<Value>,
    field: Accumulator,
    null: bool,
    rows: u64,
}

impl RowReader {
    /// Create positional row reader, every field kept as raw bytes.
    pub fn new() -> RowReader {
        Self::default()
    }

    /// Create row reader which decode and name fields with `mapping`.
    pub fn with_mapping(mapping: impl Into<Arc<Mapping>>) -> RowReader {
        Self { mapping: Some(mapping.into()), ..Default::default() }
    }

    /// Append bytes to the internal buffer.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.parser.feed(chunk);
    }

    /// Returns the next complete row.
    ///
    /// Returns `Ok(None)` if more bytes is required, or if file trailer is
    /// reached.
    ///
    /// # Errors
    ///
    /// Returns error if framing is malformed, or a field failed to decode.
    /// Errors are fatal, the reader should be discarded.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        span!("next_row", row = self.rows);
        while let Some(event) = self.parser.next()? {
            match event {
                Event::RowStart { field_count } => {
                    self.values.clear();
                    self.values.reserve(field_count.into());
                }
                Event::FieldStart { len, .. } => self.null = len.is_none(),
                Event::FieldData { data, .. } => self.field.push(data),
                Event::FieldEnd { index } => {
                    let index = usize::from(index);
                    let bytes = match self.null {
                        true => None,
                        false => Some(self.field.take()),
                    };
                    let ty = self.mapping.as_ref().and_then(|m| m.ty(index));
                    let value = codec::decode_field(ty, bytes).map_err(|e| {
                        crate::Error::from(e)
                            .with_context(format_args!("row {}, field {index}", self.rows))
                    })?;
                    self.values.push(value);
                }
                Event::RowEnd => {
                    self.rows += 1;
                    let values = std::mem::take(&mut self.values);
                    let row = match &self.mapping {
                        Some(mapping) => Row::with_mapping(values, mapping.clone()),
                        None => Row::new(values),
                    };
                    return Ok(Some(row));
                }
                Event::Trailer => {
                    trace!("row reader complete, {} rows", self.rows);
                    return Ok(None);
                }
            }
        }
        Ok(None)
    }

    /// Returns the number of rows read.
    pub fn rows_read(&self) -> u64 {
        self.rows
    }

    /// Returns `true` if file trailer is reached.
    pub fn is_complete(&self) -> bool {
        self.parser.is_complete()
    }

    /// Signal end of input.
    ///
    /// Unterminated row, if any, is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`TruncatedError`][super::TruncatedError] if file trailer is
    /// not reached.
    pub fn finish(&self) -> Result<()> {
        Ok(self.parser.finish()?)
    }

    pub(crate) fn parser_mut(&mut self) -> &mut Parser {
        &mut self.parser
    }
}
