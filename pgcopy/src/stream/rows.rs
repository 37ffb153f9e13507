use futures_core::Stream;
use std::{
    pin::Pin,
    sync::Arc,
    task::{
        Context,
        Poll::{self, *},
        ready,
    },
};
use tokio::io::AsyncRead;

use super::{StreamConfig, poll_read_buf};
use crate::{Result, copy::RowReader, mapping::Mapping, row::Row};

pin_project_lite::pin_project! {
    /// Stream of decoded rows from [`AsyncRead`].
    ///
    /// Stream ends after file trailer, bytes after it is not read. Input
    /// ending before file trailer yields a truncated error. Any error ends
    /// the stream.
    #[derive(Debug)]
    #[must_use = "streams do nothing unless polled"]
    pub struct RowStream<R> {
        #[pin]
        reader: R,
        rows: RowReader,
        config: StreamConfig,
        phase: Phase,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Read,
    Eof,
    Complete,
}

impl<R> RowStream<R> {
    /// Create positional row stream, every field kept as raw bytes.
    pub fn new(reader: R) -> Self {
        Self::from_parts(reader, RowReader::new(), StreamConfig::new())
    }

    /// Create row stream which decode and name fields with `mapping`.
    pub fn with_mapping(reader: R, mapping: impl Into<Arc<Mapping>>) -> Self {
        Self::from_parts(reader, RowReader::with_mapping(mapping), StreamConfig::new())
    }

    /// Set stream config.
    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    fn from_parts(reader: R, rows: RowReader, config: StreamConfig) -> Self {
        Self { reader, rows, config, phase: Phase::Read }
    }

    /// Returns the number of rows read.
    pub fn rows_read(&self) -> u64 {
        self.rows.rows_read()
    }

    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: AsyncRead> Stream for RowStream<R> {
    type Item = Result<Row>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut me = self.project();
        loop {
            if *me.phase == Phase::Complete {
                return Ready(None);
            }

            match me.rows.next_row() {
                Ok(Some(row)) => return Ready(Some(Ok(row))),
                Ok(None) if me.rows.is_complete() => {
                    *me.phase = Phase::Complete;
                    return Ready(None);
                }
                Ok(None) => {}
                Err(err) => {
                    *me.phase = Phase::Complete;
                    return Ready(Some(Err(err)));
                }
            }

            if *me.phase == Phase::Eof {
                *me.phase = Phase::Complete;
                return Ready(me.rows.finish().err().map(Err));
            }

            let buf = me.rows.parser_mut().buffer_mut();
            match ready!(poll_read_buf(me.reader.as_mut(), cx, buf, me.config.read_size)) {
                Ok(0) => *me.phase = Phase::Eof,
                Ok(_) => {}
                Err(err) => {
                    *me.phase = Phase::Complete;
                    return Ready(Some(Err(err.into())));
                }
            }
        }
    }
}
