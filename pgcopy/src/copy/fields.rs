use bytes::Bytes;
use std::sync::Arc;

use super::{Accumulator, BackpressureError, Event, Parser};
use crate::{
    Result,
    codec,
    common::{trace, verbose},
    mapping::{FieldMode, Mapping},
    value::Value,
};

/// Field position and length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    index: usize,
    count: usize,
    len: Option<u32>,
    name: Option<Arc<str>>,
}

impl FieldInfo {
    /// Field position in the row.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of fields in the row.
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Declared field length, `None` if field is NULL.
    pub const fn len(&self) -> Option<u32> {
        self.len
    }

    /// Returns `true` if field is NULL.
    pub const fn is_null(&self) -> bool {
        self.len.is_none()
    }

    /// Field key from mapping.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// A buffered field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub info: FieldInfo,
    pub value: Value,
}

/// Field reader event.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEvent {
    /// Buffered field, decoded with type from mapping.
    Value(Field),
    /// Streamed field started, emitted before any of its data.
    Open(FieldInfo),
    /// Data of the open streamed field.
    Chunk(Bytes),
    /// Streamed field complete.
    Close(FieldInfo),
}

/// Per field reader.
///
/// Field mapped with [`FieldMode::Async`] is streamed as
/// [`FieldEvent::Open`], zero or more [`FieldEvent::Chunk`], then
/// [`FieldEvent::Close`]. Streamed field is never decoded. Other fields is
/// buffered and emitted as [`FieldEvent::Value`].
///
/// NULL streamed field is opened and closed immediately, with no chunk.
#[derive(Debug, Default)]
pub struct FieldReader {
    parser: Parser,
    mapping: Option<Arc<Mapping>>,
    count: usize,
    current: Option<(FieldInfo, FieldMode)>,
    field: Accumulator,
}

impl FieldReader {
    /// Create field reader, every field is buffered and kept as raw bytes.
    pub fn new() -> FieldReader {
        Self::default()
    }

    /// Create field reader which decode, name, and stream fields with
    /// `mapping`.
    pub fn with_mapping(mapping: impl Into<Arc<Mapping>>) -> FieldReader {
        Self { mapping: Some(mapping.into()), ..Default::default() }
    }

    /// Append bytes to the internal buffer.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.parser.feed(chunk);
    }

    /// Returns the next field event.
    ///
    /// Returns `Ok(None)` if more bytes is required, or if file trailer is
    /// reached.
    ///
    /// # Errors
    ///
    /// Returns error if framing is malformed, or a buffered field failed
    /// to decode. Errors are fatal, the reader should be discarded.
    pub fn next(&mut self) -> Result<Option<FieldEvent>> {
        while let Some(event) = self.parser.next()? {
            if let Some(event) = self.handle_event(event)? {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    pub(crate) fn handle_event(&mut self, event: Event) -> Result<Option<FieldEvent>> {
        let event = match event {
            Event::RowStart { field_count } => {
                self.count = field_count.into();
                return Ok(None);
            }
            Event::FieldStart { index, len } => {
                let index = usize::from(index);
                let spec = self.mapping.as_ref().and_then(|m| m.get(index));
                let info = FieldInfo {
                    index,
                    count: self.count,
                    len,
                    name: spec.map(|spec| spec.key_arc()),
                };
                let mode = spec.map(|spec| spec.mode()).unwrap_or_default();
                verbose!(index, ?mode, "field open");
                self.current = Some((info.clone(), mode));
                match mode {
                    FieldMode::Async => FieldEvent::Open(info),
                    FieldMode::Sync => return Ok(None),
                }
            }
            Event::FieldData { data, .. } => match &self.current {
                Some((_, FieldMode::Async)) => FieldEvent::Chunk(data),
                Some((_, FieldMode::Sync)) => {
                    self.field.push(data);
                    return Ok(None);
                }
                None => return Err(BackpressureError::NoOpenField.into()),
            },
            Event::FieldEnd { .. } => {
                let Some((info, mode)) = self.current.take() else {
                    return Err(BackpressureError::Closed.into());
                };
                match mode {
                    FieldMode::Async => FieldEvent::Close(info),
                    FieldMode::Sync => {
                        let bytes = match info.is_null() {
                            true => None,
                            false => Some(self.field.take()),
                        };
                        let ty = self.mapping.as_ref().and_then(|m| m.ty(info.index));
                        let value = codec::decode_field(ty, bytes).map_err(|e| {
                            crate::Error::from(e).with_context(format_args!("field {}", info.index))
                        })?;
                        FieldEvent::Value(Field { info, value })
                    }
                }
            }
            Event::RowEnd => return Ok(None),
            Event::Trailer => {
                trace!("field reader complete");
                return Ok(None);
            }
        };
        Ok(Some(event))
    }

    /// Returns `true` if file trailer is reached.
    pub fn is_complete(&self) -> bool {
        self.parser.is_complete()
    }

    /// Signal end of input.
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
