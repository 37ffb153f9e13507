use bytes::Bytes;
use futures_core::Stream;
use std::{
    fmt, mem,
    pin::Pin,
    sync::Arc,
    task::{
        Context,
        Poll::{self, *},
        ready,
    },
};
use tokio::{
    io::AsyncRead,
    sync::mpsc::{self, OwnedPermit, Receiver, Sender, error::{SendError, TrySendError}},
};

use super::{StreamConfig, poll_read_buf};
use crate::{
    Result,
    common::verbose,
    copy::{Field, FieldEvent, FieldInfo, FieldReader},
    mapping::Mapping,
};

/// Field stream item.
#[derive(Debug)]
pub enum FieldItem {
    /// Buffered field, decoded with type from mapping.
    Value(Field),
    /// Streamed field.
    Stream(StreamField),
}

/// Streamed field handle.
#[derive(Debug)]
pub struct StreamField {
    pub info: FieldInfo,
    pub body: FieldBody,
}

/// Streamed field data.
///
/// The stream ends when all field data is received. Dropping the body
/// cancel the delivery, the remaining field data is skipped.
pub struct FieldBody {
    rx: Receiver<Bytes>,
}

impl FieldBody {
    /// Receive the next field data.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

impl Stream for FieldBody {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl fmt::Debug for FieldBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBody").field("buffered", &self.rx.len()).finish()
    }
}

type Reserve = Pin<Box<dyn Future<Output = Result<OwnedPermit<Bytes>, SendError<()>>> + Send>>;

/// Chunk waiting for [`FieldBody`] capacity.
struct PendingChunk {
    chunk: Bytes,
    reserve: Reserve,
}

pin_project_lite::pin_project! {
    /// Stream of fields from [`AsyncRead`].
    ///
    /// Field mapped as [`FieldMode::Async`][crate::FieldMode::Async] is
    /// yielded as [`FieldItem::Stream`] before any of its data is read.
    /// Its data is sent to [`FieldBody`] as it arrives. When the body is
    /// full, this stream is suspended until the body is consumed.
    ///
    /// Therefore, the body must be consumed concurrently with this stream,
    /// e.g. in a spawned task, or dropped. Awaiting the body to end without
    /// polling this stream will never complete.
    #[must_use = "streams do nothing unless polled"]
    pub struct FieldStream<R> {
        #[pin]
        reader: R,
        fields: FieldReader,
        config: StreamConfig,
        sender: Option<Sender<Bytes>>,
        pending: Option<PendingChunk>,
        phase: Phase,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Read,
    Eof,
    Complete,
}

impl<R> FieldStream<R> {
    /// Create field stream, every field is buffered and kept as raw bytes.
    pub fn new(reader: R) -> Self {
        Self::from_parts(reader, FieldReader::new())
    }

    /// Create field stream which decode, name, and stream fields with
    /// `mapping`.
    pub fn with_mapping(reader: R, mapping: impl Into<Arc<Mapping>>) -> Self {
        Self::from_parts(reader, FieldReader::with_mapping(mapping))
    }

    /// Set stream config.
    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    fn from_parts(reader: R, fields: FieldReader) -> Self {
        Self {
            reader,
            fields,
            config: StreamConfig::new(),
            sender: None,
            pending: None,
            phase: Phase::Read,
        }
    }
}

impl<R: AsyncRead> Stream for FieldStream<R> {
    type Item = Result<FieldItem>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut me = self.project();
        loop {
            if *me.phase == Phase::Complete {
                return Ready(None);
            }

            if let Some(pending) = me.pending.as_mut() {
                let permit = ready!(pending.reserve.as_mut().poll(cx));
                let chunk = mem::take(&mut pending.chunk);
                *me.pending = None;
                match permit {
                    Ok(permit) => {
                        permit.send(chunk);
                    }
                    Err(_) => {
                        verbose!("field body dropped, skipping field data");
                        *me.sender = None;
                    }
                }
            }

            let event = match me.fields.next() {
                Ok(Some(event)) => event,
                Ok(None) if me.fields.is_complete() => {
                    *me.phase = Phase::Complete;
                    return Ready(None);
                }
                Ok(None) => {
                    if *me.phase == Phase::Eof {
                        *me.phase = Phase::Complete;
                        return Ready(me.fields.finish().err().map(Err));
                    }
                    let buf = me.fields.parser_mut().buffer_mut();
                    match ready!(poll_read_buf(me.reader.as_mut(), cx, buf, me.config.read_size)) {
                        Ok(0) => *me.phase = Phase::Eof,
                        Ok(_) => {}
                        Err(err) => {
                            *me.phase = Phase::Complete;
                            return Ready(Some(Err(err.into())));
                        }
                    }
                    continue;
                }
                Err(err) => {
                    *me.phase = Phase::Complete;
                    return Ready(Some(Err(err)));
                }
            };

            match event {
                FieldEvent::Value(field) => return Ready(Some(Ok(FieldItem::Value(field)))),
                FieldEvent::Open(info) => {
                    let (tx, rx) = mpsc::channel(me.config.channel_capacity);
                    *me.sender = Some(tx);
                    let body = FieldBody { rx };
                    return Ready(Some(Ok(FieldItem::Stream(StreamField { info, body }))));
                }
                FieldEvent::Chunk(chunk) => {
                    // no sender means the body is dropped
                    let Some(sender) = me.sender.as_ref() else {
                        continue;
                    };
                    match sender.try_send(chunk) {
                        Ok(()) => {}
                        Err(TrySendError::Full(chunk)) => {
                            let reserve = Box::pin(sender.clone().reserve_owned());
                            *me.pending = Some(PendingChunk { chunk, reserve });
                        }
                        Err(TrySendError::Closed(_)) => {
                            verbose!("field body dropped, skipping field data");
                            *me.sender = None;
                        }
                    }
                }
                FieldEvent::Close(_) => {
                    *me.sender = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use futures::StreamExt;
    use std::time::Duration;

    use super::*;
    use crate::{
        Encode,
        copy::encode_rows,
        stream::test_util::Chunked,
        value::Value,
    };

    const BLOB_LEN: usize = 64 * 1024;

    fn blob() -> Vec<u8> {
        (0..BLOB_LEN).map(|i| (i % 251) as u8).collect()
    }

    fn bytes() -> Vec<u8> {
        encode_rows(
            [
                [1i32.encode(), Bytes::from(blob()).encode(), "first".encode()],
                [2i32.encode(), Bytes::from_static(b"small").encode(), "second".encode()],
            ],
            Default::default(),
        )
        .unwrap()
        .to_vec()
    }

    async fn collect(body: FieldBody) -> Vec<Bytes> {
        body.collect().await
    }

    fn mapping() -> Mapping {
        "id:int4,blob::async,name:text".parse().unwrap()
    }

    #[tokio::test]
    async fn backpressure() {
        let config = StreamConfig::new().read_size(1024).channel_capacity(1);
        let mut stream = FieldStream::with_mapping(Chunked::new(bytes(), 1024), mapping())
            .config(config);

        let Some(Ok(FieldItem::Value(id))) = stream.next().await else { panic!() };
        assert_eq!(id.value, Value::Int4(1));

        let Some(Ok(FieldItem::Stream(field))) = stream.next().await else { panic!() };
        assert_eq!(field.info.len(), Some(BLOB_LEN as u32));

        // body is full and not consumed, reader is suspended inside the field
        let suspended = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(suspended.is_err());
        assert!(stream.fields.parser_mut().missing() > 0);

        let consumer = tokio::spawn(collect(field.body));

        let Some(Ok(FieldItem::Value(name))) = stream.next().await else { panic!() };
        assert_eq!(name.value, Value::Text("first".into()));
        let blob_chunks = consumer.await.unwrap();
        assert!(blob_chunks.iter().all(|chunk| chunk.len() <= 1024));
        assert_eq!(blob_chunks.concat(), blob());

        let mut rest = vec![];
        let mut bodies = vec![];
        while let Some(item) = stream.next().await {
            match item.unwrap() {
                FieldItem::Value(field) => rest.push(field.value),
                FieldItem::Stream(field) => bodies.push(tokio::spawn(collect(field.body))),
            }
        }
        assert_eq!(rest, [Value::Int4(2), Value::Text("second".into())]);
        assert_eq!(bodies.len(), 1);
        let small = bodies.pop().unwrap().await.unwrap();
        assert_eq!(small.concat(), b"small");
    }

    #[tokio::test]
    async fn dropped_body_skips_field() {
        let config = StreamConfig::new().read_size(512).channel_capacity(1);
        let stream = FieldStream::with_mapping(Chunked::new(bytes(), 100), mapping())
            .config(config);

        let values = stream
            .filter_map(|item| async move {
                match item.unwrap() {
                    FieldItem::Value(field) => Some(field.value),
                    // body dropped here
                    FieldItem::Stream(_) => None,
                }
            })
            .collect::<Vec<_>>()
            .await;

        assert_eq!(
            values,
            [
                Value::Int4(1),
                Value::Text("first".into()),
                Value::Int4(2),
                Value::Text("second".into())
            ]
        );
    }

    #[tokio::test]
    async fn null_streamed_field() {
        let bytes = encode_rows(
            [[1i32.encode(), None::<Bytes>.encode(), "x".encode()]],
            Default::default(),
        )
        .unwrap();
        let mut stream = FieldStream::with_mapping(&bytes[..], mapping());

        let _id = stream.next().await;
        let Some(Ok(FieldItem::Stream(mut field))) = stream.next().await else { panic!() };
        assert!(field.info.is_null());

        let Some(Ok(FieldItem::Value(name))) = stream.next().await else { panic!() };
        assert_eq!(name.info.index(), 2);
        assert_eq!(field.body.recv().await, None);
        assert!(stream.next().await.is_none());
    }
}
