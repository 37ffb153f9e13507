use bytes::{BufMut, BytesMut};

use crate::{
    codec,
    common::{trace, verbose},
    encode::{EncodeError, Encoded},
    ext::UsizeExt,
    postgres::{HEADER, TRAILER},
};

/// Writer configuration builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    header: bool,
    trailer: bool,
}

impl WriterConfig {
    /// Default config, header and trailer are written.
    pub const fn new() -> WriterConfig {
        Self { header: true, trailer: true }
    }

    /// Set whether file header is written before the first row.
    pub const fn header(mut self, value: bool) -> Self {
        self.header = value;
        self
    }

    /// Set whether file trailer is written on finish.
    pub const fn trailer(mut self, value: bool) -> Self {
        self.trailer = value;
        self
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// `COPY BINARY` row writer.
///
/// Writer does no io, rows are written into caller supplied buffer.
///
/// ```
/// use pgcopy::{Encode, copy::Writer, postgres::HEADER};
///
/// let mut buf = bytes::BytesMut::new();
/// let mut writer = Writer::new();
/// writer.write_row(&[7i32.encode()], &mut buf).unwrap();
/// writer.finish(&mut buf);
///
/// assert_eq!(&buf[..19], &HEADER);
/// assert_eq!(&buf[19..], b"\x00\x01\x00\x00\x00\x04\x00\x00\x00\x07\xff\xff");
/// ```
#[derive(Debug, Default)]
pub struct Writer {
    config: WriterConfig,
    started: bool,
    rows: u64,
}

impl Writer {
    /// Create writer with default config.
    pub fn new() -> Writer {
        Self::default()
    }

    pub fn with_config(config: WriterConfig) -> Writer {
        Self { config, ..Default::default() }
    }

    fn start(&mut self, dst: &mut BytesMut) {
        if !self.started {
            self.started = true;
            if self.config.header {
                dst.put_slice(&HEADER);
            }
        }
    }

    /// Write a row, file header is written before the first row.
    ///
    /// # Errors
    ///
    /// Returns error if a value is not representable as its type, or the
    /// row have more than 65534 fields. Nothing of the failed row is left
    /// in `dst`.
    pub fn write_row(&mut self, row: &[Encoded], dst: &mut BytesMut) -> Result<(), EncodeError> {
        self.start(dst);

        let offset = dst.len();
        match Self::write_fields(row, dst) {
            Ok(()) => {
                self.rows += 1;
                verbose!(fields = row.len(), "row written");
                Ok(())
            }
            Err(err) => {
                dst.truncate(offset);
                trace!("failed to write row {}: {err}", self.rows);
                Err(err)
            }
        }
    }

    fn write_fields(row: &[Encoded], dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(row.len().to_field_count()?);
        for field in row {
            codec::encode_field(field.ty(), field.value(), dst)?;
        }
        Ok(())
    }

    /// Returns the number of rows written.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Write file trailer, and file header if no row is written.
    pub fn finish(mut self, dst: &mut BytesMut) {
        self.start(dst);
        if self.config.trailer {
            dst.put_u16(TRAILER);
        }
        trace!("writer finished, {} rows", self.rows);
    }
}

/// Encode all rows into complete `COPY BINARY` stream.
pub fn encode_rows<I, R>(rows: I, config: WriterConfig) -> Result<BytesMut, EncodeError>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[Encoded]>,
{
    let mut buf = BytesMut::new();
    let mut writer = Writer::with_config(config);
    for row in rows {
        writer.write_row(row.as_ref(), &mut buf)?;
    }
    writer.finish(&mut buf);
    Ok(buf)
}
