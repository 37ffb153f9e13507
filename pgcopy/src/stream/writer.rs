use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::StreamConfig;
use crate::{
    Result,
    copy::{Writer, WriterConfig},
    encode::Encoded,
};

/// Buffered `COPY BINARY` writer to [`AsyncWrite`].
///
/// Rows are buffered until [`write_size`][StreamConfig::write_size] is
/// reached. Call [`finish`][CopyWriter::finish] to write the file trailer,
/// dropping the writer discard buffered rows.
///
/// ```
/// use pgcopy::{Encode, stream::CopyWriter};
///
/// # async fn app() -> pgcopy::Result<()> {
/// let mut writer = CopyWriter::new(Vec::new());
/// writer.write_row(&[1i32.encode(), "foo".encode()]).await?;
/// let bytes = writer.finish().await?;
/// assert_eq!(bytes.len(), 19 + 2 + 8 + 7 + 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CopyWriter<W> {
    io: W,
    writer: Writer,
    write_buf: BytesMut,
    config: StreamConfig,
}

impl<W: AsyncWrite + Unpin> CopyWriter<W> {
    pub fn new(io: W) -> Self {
        Self::with_config(io, WriterConfig::new(), StreamConfig::new())
    }

    pub fn with_config(io: W, writer: WriterConfig, config: StreamConfig) -> Self {
        Self {
            io,
            writer: Writer::with_config(writer),
            write_buf: BytesMut::with_capacity(config.write_size),
            config,
        }
    }

    /// Write a row.
    ///
    /// # Errors
    ///
    /// Returns error if the row failed to encode, the writer is still usable,
    /// or if io error occurs.
    pub async fn write_row(&mut self, row: &[Encoded]) -> Result<()> {
        self.writer.write_row(row, &mut self.write_buf)?;
        if self.write_buf.len() >= self.config.write_size {
            self.io.write_all_buf(&mut self.write_buf).await?;
        }
        Ok(())
    }

    /// Returns the number of rows written.
    pub fn rows_written(&self) -> u64 {
        self.writer.rows_written()
    }

    /// Write buffered rows and flush the underlying writer.
    pub async fn flush(&mut self) -> Result<()> {
        self.io.write_all_buf(&mut self.write_buf).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Write file trailer and flush, returns the underlying writer.
    pub async fn finish(mut self) -> Result<W> {
        self.writer.finish(&mut self.write_buf);
        self.io.write_all_buf(&mut self.write_buf).await?;
        self.io.flush().await?;
        Ok(self.io)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Encode, ErrorKind, RowReader, postgres::Type, value::Value};

    #[tokio::test]
    async fn buffered() {
        let config = StreamConfig::new().write_size(64);
        let mut writer = CopyWriter::with_config(Vec::new(), WriterConfig::new(), config);

        writer.write_row(&[1i32.encode()]).await.unwrap();
        assert!(writer.io.is_empty());

        let long = "x".repeat(64);
        writer.write_row(&[long.as_str().encode()]).await.unwrap();
        assert!(writer.write_buf.is_empty());
        assert!(writer.io.len() > 64);

        let err = writer
            .write_row(&[Encoded::new(Type::Int2, Value::Int8(1 << 20))])
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Encode(_)));

        writer.write_row(&[2i32.encode()]).await.unwrap();
        writer.flush().await.unwrap();
        assert_eq!(writer.rows_written(), 3);

        let bytes = writer.finish().await.unwrap();
        let mut reader = RowReader::new();
        reader.feed(&bytes);
        let mut rows = 0;
        while reader.next_row().unwrap().is_some() {
            rows += 1;
        }
        assert_eq!(rows, 3);
        assert!(reader.finish().is_ok());
    }

    #[tokio::test]
    async fn zero_rows() {
        let bytes = CopyWriter::new(Vec::new()).finish().await.unwrap();
        assert_eq!(bytes.len(), 21);
        assert!(bytes.ends_with(b"\xff\xff"));
    }
}
