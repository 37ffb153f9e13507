//! Tokio runtime adapters.
//!
//! - [`RowStream`], stream of [`Row`][crate::Row]
//! - [`FieldStream`], stream of buffered fields and [`FieldBody`] handles
//! - [`RawStream`], stream of field data
//! - [`CopyWriter`], async row writer
use bytes::{BufMut, BytesMut};
use std::{
    io,
    pin::Pin,
    task::{Context, Poll, ready},
};
use tokio::io::AsyncRead;

mod rows;
mod fields;
mod raw;
mod writer;

pub use rows::RowStream;
pub use fields::{FieldBody, FieldItem, FieldStream, StreamField};
pub use raw::RawStream;
pub use writer::CopyWriter;

const DEFAULT_READ_SIZE: usize = 8 * 1024;
const DEFAULT_WRITE_SIZE: usize = 8 * 1024;
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Async adapters configuration builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub(crate) read_size: usize,
    pub(crate) write_size: usize,
    pub(crate) channel_capacity: usize,
}

impl StreamConfig {
    pub const fn new() -> StreamConfig {
        Self {
            read_size: DEFAULT_READ_SIZE,
            write_size: DEFAULT_WRITE_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Set maximum bytes read at once, default to 8KiB.
    ///
    /// This bound the memory used by a streamed field.
    pub const fn read_size(mut self, value: usize) -> Self {
        self.read_size = if value == 0 { 1 } else { value };
        self
    }

    /// Set buffered bytes before [`CopyWriter`] write to the underlying
    /// writer, default to 8KiB.
    pub const fn write_size(mut self, value: usize) -> Self {
        self.write_size = value;
        self
    }

    /// Set number of chunks a [`FieldBody`] can hold before the reader is
    /// suspended, default to 16.
    pub const fn channel_capacity(mut self, value: usize) -> Self {
        self.channel_capacity = if value == 0 { 1 } else { value };
        self
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Read at most `max` bytes into `buf`.
pub(crate) fn poll_read_buf<R>(
    reader: Pin<&mut R>,
    cx: &mut Context<'_>,
    buf: &mut BytesMut,
    max: usize,
) -> Poll<io::Result<usize>>
where
    R: AsyncRead + ?Sized,
{
    buf.reserve(max);

    let n = {
        let dst = buf.chunk_mut();
        let len = dst.len().min(max);
        let dst = unsafe { &mut dst.as_uninit_slice_mut()[..len] };
        let mut read = tokio::io::ReadBuf::uninit(dst);
        let ptr = read.filled().as_ptr();
        ready!(reader.poll_read(cx, &mut read)?);

        // Ensure the pointer does not change from under us
        assert_eq!(ptr, read.filled().as_ptr());
        read.filled().len()
    };

    // Safety: This is guaranteed to be the number of initialized (and read)
    // bytes due to the invariants provided by `ReadBuf::filled`.
    unsafe {
        buf.advance_mut(n);
    }

    Poll::Ready(Ok(n))
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::{
        io,
        pin::Pin,
        task::{Context, Poll},
    };
    use tokio::io::{AsyncRead, ReadBuf};

    /// Reader which return at most `size` bytes per read.
    pub(crate) struct Chunked {
        data: Vec<u8>,
        pos: usize,
        size: usize,
    }

    impl Chunked {
        pub(crate) fn new(data: impl Into<Vec<u8>>, size: usize) -> Self {
            Self { data: data.into(), pos: 0, size }
        }
    }

    impl AsyncRead for Chunked {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let end = self.data.len().min(self.pos + self.size);
            let n = buf.remaining().min(end - self.pos);
            let start = self.pos;
            buf.put_slice(&self.data[start..start + n]);
            self.pos += n;
            Poll::Ready(Ok(()))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::future::poll_fn;

    #[tokio::test]
    async fn read_at_most() {
        let mut reader = test_util::Chunked::new(vec![7u8; 100], 64);
        let mut buf = BytesMut::new();

        let n = poll_fn(|cx| poll_read_buf(Pin::new(&mut reader), cx, &mut buf, 10)).await.unwrap();
        assert_eq!(n, 10);
        let n = poll_fn(|cx| poll_read_buf(Pin::new(&mut reader), cx, &mut buf, 1000)).await.unwrap();
        assert_eq!(n, 64);
        assert_eq!(buf.len(), 74);
    }

    #[test]
    fn config() {
        let config = StreamConfig::new().read_size(0).channel_capacity(0).write_size(0);
        assert_eq!(config.read_size, 1);
        assert_eq!(config.channel_capacity, 1);
        assert_eq!(config.write_size, 0);
    }
}
