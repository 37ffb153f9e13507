use bytes::{Buf, Bytes, BytesMut};
use std::fmt;

use super::{FormatError, TruncatedError};
use crate::{
    common::{trace, verbose},
    postgres::{HEADER, HEADER_LEN, NULL_LEN, TRAILER},
};

/// Framing state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum State {
    /// Waiting for file header.
    #[default]
    Header,
    /// Waiting for tuple field count, or file trailer.
    RowStart,
    /// Waiting for field length.
    FieldStart,
    /// Waiting for field data.
    FieldData,
    /// Field data complete.
    FieldEnd,
    /// File trailer reached, terminal.
    Trailer,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "file header",
            Self::RowStart => "tuple start",
            Self::FieldStart => "field length",
            Self::FieldData => "field data",
            Self::FieldEnd => "field end",
            Self::Trailer => "file trailer",
        })
    }
}

/// Framing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// New row with `field_count` fields.
    RowStart { field_count: u16 },
    /// Field length read, `None` if field is NULL.
    FieldStart { index: u16, len: Option<u32> },
    /// Part of field data, may be emitted multiple times per field.
    FieldData { index: u16, data: Bytes },
    /// Field data complete.
    FieldEnd { index: u16 },
    /// All fields of current row complete.
    RowEnd,
    /// File trailer reached, emitted once.
    Trailer,
}

/// Incremental `COPY BINARY` framing state machine.
///
/// Parser does no io, bytes is supplied with [`feed`][Parser::feed], and
/// events is pulled with [`next`][Parser::next] until it returns `None`,
/// which means more bytes is required. Bytes are never assumed to be
/// aligned with framing boundary.
///
/// Field data is emitted as soon as it is available, without waiting for
/// the whole field, thus memory is bounded by the size of chunks fed.
/// Consumer may stop pulling events at any point to suspend the parser.
///
/// ```
/// use pgcopy::{copy::{Event, Parser}, postgres::HEADER};
///
/// let mut parser = Parser::new();
/// parser.feed(&HEADER);
/// parser.feed(b"\x00\x01\x00\x00");
/// assert_eq!(parser.next().unwrap(), Some(Event::RowStart { field_count: 1 }));
/// assert_eq!(parser.next().unwrap(), None);
///
/// parser.feed(b"\x00\x04\x00\x00\x00\x07\xff\xff");
/// assert_eq!(parser.next().unwrap(), Some(Event::FieldStart { index: 0, len: Some(4) }));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parser {
    buffer: BytesMut,
    state: State,
    field_count: u16,
    field_index: u16,
    field_len: Option<u32>,
    missing: usize,
}

impl Parser {
    /// Create new parser which expect file header.
    pub fn new() -> Parser {
        Self::default()
    }

    /// Append bytes to the internal buffer.
    ///
    /// Bytes after file trailer is ignored.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.state != State::Trailer {
            self.buffer.extend_from_slice(chunk);
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns `true` if file trailer is reached.
    pub fn is_complete(&self) -> bool {
        self.state == State::Trailer
    }

    /// Returns the number of unconsumed bytes.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the declared length of current field, `None` if field is
    /// NULL or there is no current field.
    pub fn field_len(&self) -> Option<u32> {
        self.field_len
    }

    /// Returns the number of field data bytes not yet emitted.
    pub fn missing(&self) -> usize {
        self.missing
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Pull the next event.
    ///
    /// Returns `Ok(None)` if more bytes is required, or if file trailer
    /// is reached.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] if framing is malformed. Offending bytes is
    /// not consumed, thus calling this again returns the same error.
    pub fn next(&mut self) -> Result<Option<Event>, FormatError> {
        loop {
            match self.state {
                State::Header => {
                    if self.buffer.len() < HEADER_LEN {
                        return Ok(None);
                    }
                    if self.buffer[..HEADER_LEN] != HEADER {
                        let mut found = [0u8; HEADER_LEN];
                        found.copy_from_slice(&self.buffer[..HEADER_LEN]);
                        trace!("invalid file header");
                        return Err(FormatError::Header { found });
                    }
                    self.buffer.advance(HEADER_LEN);
                    trace!("file header accepted");
                    self.state = State::RowStart;
                }
                State::RowStart => {
                    if self.buffer.len() < size_of::<u16>() {
                        return Ok(None);
                    }
                    let field_count = self.buffer.get_u16();
                    if field_count == TRAILER {
                        trace!("file trailer reached, {} bytes discarded", self.buffer.len());
                        self.buffer = BytesMut::new();
                        self.state = State::Trailer;
                        return Ok(Some(Event::Trailer));
                    }
                    verbose!(field_count, "row start");
                    self.field_count = field_count;
                    self.field_index = 0;
                    self.state = State::FieldStart;
                    return Ok(Some(Event::RowStart { field_count }));
                }
                State::FieldStart => {
                    if self.field_index == self.field_count {
                        self.state = State::RowStart;
                        return Ok(Some(Event::RowEnd));
                    }
                    if self.buffer.len() < size_of::<i32>() {
                        return Ok(None);
                    }
                    let len = match (&mut &self.buffer[..size_of::<i32>()]).get_i32() {
                        NULL_LEN => None,
                        len => match u32::try_from(len) {
                            Ok(len) => Some(len),
                            Err(_) => return Err(FormatError::NegativeLength(len)),
                        },
                    };
                    self.buffer.advance(size_of::<i32>());

                    let index = self.field_index;
                    verbose!(index, ?len, "field start");
                    self.field_len = len;
                    self.missing = len.unwrap_or(0) as usize;
                    self.state = match self.missing {
                        0 => State::FieldEnd,
                        _ => State::FieldData,
                    };
                    return Ok(Some(Event::FieldStart { index, len }));
                }
                State::FieldData => {
                    if self.buffer.is_empty() {
                        return Ok(None);
                    }
                    let n = self.buffer.len().min(self.missing);
                    let data = self.buffer.split_to(n).freeze();
                    self.missing -= n;
                    if self.missing == 0 {
                        self.state = State::FieldEnd;
                    }
                    return Ok(Some(Event::FieldData { index: self.field_index, data }));
                }
                State::FieldEnd => {
                    let index = self.field_index;
                    self.field_index += 1;
                    self.field_len = None;
                    self.state = State::FieldStart;
                    return Ok(Some(Event::FieldEnd { index }));
                }
                State::Trailer => return Ok(None),
            }
        }
    }

    /// Signal end of input.
    ///
    /// # Errors
    ///
    /// Returns [`TruncatedError`] if file trailer is not reached.
    pub fn finish(&self) -> Result<(), TruncatedError> {
        let required = match self.state {
            State::Trailer => return Ok(()),
            State::Header => HEADER_LEN,
            State::RowStart => size_of::<u16>(),
            State::FieldStart if self.field_index == self.field_count => size_of::<u16>(),
            State::FieldStart => size_of::<i32>(),
            State::FieldData => self.missing,
            State::FieldEnd => size_of::<u16>(),
        };
        let needed = required.saturating_sub(self.buffer.len()).max(1);
        trace!("input ended at {}", self.state);
        Err(TruncatedError { state: self.state, needed })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::postgres::HEADER;

    /// header, `[int4 7, NULL, text "ab"]`, `[]`, trailer
    fn stream() -> Vec<u8> {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(b"\x00\x03");
        bytes.extend_from_slice(b"\x00\x00\x00\x04\x00\x00\x00\x07");
        bytes.extend_from_slice(b"\xff\xff\xff\xff");
        bytes.extend_from_slice(b"\x00\x00\x00\x02ab");
        bytes.extend_from_slice(b"\x00\x00");
        bytes.extend_from_slice(b"\xff\xff");
        bytes
    }

    /// Drain events, merging consecutive field data.
    fn drain(parser: &mut Parser, events: &mut Vec<Event>) {
        while let Some(event) = parser.next().unwrap() {
            if let Event::FieldData { index, data } = &event {
                if let Some(Event::FieldData { index: prev_index, data: prev }) = events.last_mut() {
                    if prev_index == index {
                        *prev = [&prev[..], &data[..]].concat().into();
                        continue;
                    }
                }
            }
            events.push(event);
        }
    }

    fn expected() -> Vec<Event> {
        vec![
            Event::RowStart { field_count: 3 },
            Event::FieldStart { index: 0, len: Some(4) },
            Event::FieldData { index: 0, data: Bytes::from_static(b"\0\0\0\x07") },
            Event::FieldEnd { index: 0 },
            Event::FieldStart { index: 1, len: None },
            Event::FieldEnd { index: 1 },
            Event::FieldStart { index: 2, len: Some(2) },
            Event::FieldData { index: 2, data: Bytes::from_static(b"ab") },
            Event::FieldEnd { index: 2 },
            Event::RowEnd,
            Event::RowStart { field_count: 0 },
            Event::RowEnd,
            Event::Trailer,
        ]
    }

    #[test]
    fn whole() {
        let mut parser = Parser::new();
        let mut events = vec![];
        parser.feed(&stream());
        drain(&mut parser, &mut events);
        assert_eq!(events, expected());
        assert!(parser.is_complete());
        assert!(parser.finish().is_ok());
    }

    #[test]
    fn every_split_point() {
        let bytes = stream();
        for split in 0..=bytes.len() {
            let mut parser = Parser::new();
            let mut events = vec![];
            for chunk in [&bytes[..split], &bytes[..0], &bytes[split..]] {
                parser.feed(chunk);
                drain(&mut parser, &mut events);
            }
            assert_eq!(events, expected(), "split at {split}");
        }
    }

    #[test]
    fn single_byte_chunks() {
        let mut parser = Parser::new();
        let mut events = vec![];
        for byte in stream() {
            parser.feed(&[byte]);
            drain(&mut parser, &mut events);
            assert!(parser.buffered() <= HEADER_LEN);
        }
        assert_eq!(events, expected());
    }

    #[test]
    fn header_rejected() {
        let mut bytes = stream();
        bytes[0] = b'Q';
        let mut parser = Parser::new();
        parser.feed(&bytes);
        let err = parser.next().unwrap_err();
        assert!(matches!(err, FormatError::Header { found } if found[0] == b'Q'));
        assert_eq!(parser.next().unwrap_err(), err);
        assert_eq!(parser.state(), State::Header);
    }

    #[test]
    fn header_flags_rejected() {
        let mut bytes = HEADER.to_vec();
        bytes[14] = 1;
        let mut parser = Parser::new();
        parser.feed(&bytes);
        assert!(parser.next().is_err());
    }

    #[test]
    fn header_and_trailer_only() {
        let mut parser = Parser::new();
        parser.feed(&HEADER);
        parser.feed(b"\xff\xff");
        assert_eq!(parser.next().unwrap(), Some(Event::Trailer));
        assert_eq!(parser.next().unwrap(), None);
        assert!(parser.finish().is_ok());
    }

    #[test]
    fn bytes_after_trailer_ignored() {
        let mut parser = Parser::new();
        parser.feed(&HEADER);
        parser.feed(b"\xff\xffjunk");
        assert_eq!(parser.next().unwrap(), Some(Event::Trailer));
        parser.feed(b"more junk");
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.next().unwrap(), None);
    }

    #[test]
    fn negative_length() {
        let mut parser = Parser::new();
        parser.feed(&HEADER);
        parser.feed(b"\x00\x01\xff\xff\xff\xfe");
        assert_eq!(parser.next().unwrap(), Some(Event::RowStart { field_count: 1 }));
        assert_eq!(parser.next().unwrap_err(), FormatError::NegativeLength(-2));
        assert_eq!(parser.next().unwrap_err(), FormatError::NegativeLength(-2));
    }

    #[test]
    fn truncated() {
        let mut parser = Parser::new();
        assert_eq!(parser.finish().unwrap_err().state(), State::Header);

        let bytes = stream();
        // in the middle of "ab"
        parser.feed(&bytes[..bytes.len() - 5]);
        let mut events = vec![];
        drain(&mut parser, &mut events);
        let err = parser.finish().unwrap_err();
        assert_eq!(err.state(), State::FieldData);
        assert_eq!(err.needed(), 1);
        assert_eq!(parser.missing(), 1);
        assert_eq!(parser.field_len(), Some(2));
    }

    #[test]
    fn suspend_in_field_data() {
        let mut parser = Parser::new();
        parser.feed(&HEADER);
        parser.feed(b"\x00\x01\x00\x00\x00\x06abc");
        assert!(matches!(parser.next().unwrap(), Some(Event::RowStart { .. })));
        assert!(matches!(parser.next().unwrap(), Some(Event::FieldStart { .. })));

        // consumer stop pulling here, state is retained exactly
        let snapshot = parser.clone();
        assert_eq!(snapshot, parser);

        let Some(Event::FieldData { data, .. }) = parser.next().unwrap() else {
            panic!("expected field data");
        };
        assert_eq!(data, "abc");
        assert_eq!(parser.missing(), 3);
        assert_ne!(snapshot, parser);
    }
}
