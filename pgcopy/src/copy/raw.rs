use bytes::Bytes;

use super::{Event, Parser};
use crate::Result;

/// Field data reader.
///
/// Emits field data as it arrives, concatenated across fields and rows,
/// all framing is dropped. NULL field contributes nothing.
#[derive(Debug, Default)]
pub struct RawReader {
    parser: Parser,
}

impl RawReader {
    pub fn new() -> RawReader {
        Self::default()
    }

    /// Append bytes to the internal buffer.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.parser.feed(chunk);
    }

    /// Returns the next field data.
    ///
    /// Returns `Ok(None)` if more bytes is required, or if file trailer is
    /// reached.
    pub fn next(&mut self) -> Result<Option<Bytes>> {
        while let Some(event) = self.parser.next()? {
            if let Event::FieldData { data, .. } = event {
                return Ok(Some(data));
            }
        }
        Ok(None)
    }

    /// Returns `true` if file trailer is reached.
    pub fn is_complete(&self) -> bool {
        self.parser.is_complete()
    }

    /// Signal end of input.
    pub fn finish(&self) -> Result<()> {
        Ok(self.parser.finish()?)
    }

    pub(crate) fn parser_mut(&mut self) -> &mut Parser {
        &mut self.parser
    }
}
