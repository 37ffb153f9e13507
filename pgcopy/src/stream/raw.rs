use bytes::Bytes;
use futures_core::Stream;
use std::{
    pin::Pin,
    task::{
        Context,
        Poll::{self, *},
        ready,
    },
};
use tokio::io::AsyncRead;

use super::{StreamConfig, poll_read_buf};
use crate::{Result, copy::RawReader};

pin_project_lite::pin_project! {
    /// Stream of field data from [`AsyncRead`], all framing is dropped.
    ///
    /// Every chunk is at most [`read_size`][StreamConfig::read_size] long.
    #[derive(Debug)]
    #[must_use = "streams do nothing unless polled"]
    pub struct RawStream<R> {
        #[pin]
        reader: R,
        raw: RawReader,
        config: StreamConfig,
        eof: bool,
        done: bool,
    }
}

impl<R> RawStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            raw: RawReader::new(),
            config: StreamConfig::new(),
            eof: false,
            done: false,
        }
    }

    /// Set stream config.
    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }
}

impl<R: AsyncRead> Stream for RawStream<R> {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut me = self.project();
        while !*me.done {
            match me.raw.next() {
                Ok(Some(data)) => return Ready(Some(Ok(data))),
                Ok(None) if me.raw.is_complete() => *me.done = true,
                Ok(None) if *me.eof => {
                    *me.done = true;
                    return Ready(me.raw.finish().err().map(Err));
                }
                Ok(None) => {
                    let buf = me.raw.parser_mut().buffer_mut();
                    match ready!(poll_read_buf(me.reader.as_mut(), cx, buf, me.config.read_size)) {
                        Ok(0) => *me.eof = true,
                        Ok(_) => {}
                        Err(err) => {
                            *me.done = true;
                            return Ready(Some(Err(err.into())));
                        }
                    }
                }
                Err(err) => {
                    *me.done = true;
                    return Ready(Some(Err(err)));
                }
            }
        }
        Ready(None)
    }
}

#[cfg(test)]
mod test {
    use futures::TryStreamExt;

    use super::*;
    use crate::{Encode, ErrorKind, copy::encode_rows, stream::test_util::Chunked};

    #[tokio::test]
    async fn raw() {
        let bytes = encode_rows(
            [[Bytes::from(vec![b'a'; 300]).encode(), None::<&str>.encode(), "end".encode()]],
            Default::default(),
        )
        .unwrap();

        let config = StreamConfig::new().read_size(64);
        let chunks = RawStream::new(Chunked::new(bytes.to_vec(), 100))
            .config(config)
            .try_collect::<Vec<_>>()
            .await
            .unwrap();

        assert!(chunks.iter().all(|chunk| chunk.len() <= 64));
        let data = chunks.concat();
        assert_eq!(data.len(), 303);
        assert!(data.ends_with(b"aaend"));
    }

    #[tokio::test]
    async fn truncated() {
        let bytes = encode_rows([["abc".encode()]], Default::default()).unwrap();
        let err = RawStream::new(&bytes[..bytes.len() - 1])
            .try_collect::<Vec<_>>()
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Truncated(_)));
    }
}
