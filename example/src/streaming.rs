use bytes::Bytes;
use futures::StreamExt;
use pgcopy::{
    Encode, Mapping, Value,
    stream::{CopyWriter, FieldItem, FieldStream, StreamConfig},
};
use tokio::io::duplex;

const BLOB_LEN: usize = 4 * 1024 * 1024;

pub async fn main() -> pgcopy::Result<()> {
    let (tx, rx) = duplex(64 * 1024);

    let producer = tokio::spawn(async move {
        let mut writer = CopyWriter::new(tx);
        for id in 0..4i32 {
            let blob = Bytes::from(vec![id as u8; BLOB_LEN]);
            writer.write_row(&[id.encode(), blob.encode()]).await?;
        }
        writer.finish().await?;
        Ok::<_, pgcopy::Error>(())
    });

    let mapping = Mapping::parse("id:int4,blob::async")?;
    let config = StreamConfig::new().read_size(16 * 1024).channel_capacity(4);
    let mut fields = FieldStream::with_mapping(rx, mapping).config(config);

    let mut consumers = vec![];
    while let Some(item) = fields.next().await {
        match item? {
            FieldItem::Value(field) => {
                tracing::debug!(id = ?field.value, "row");
                assert!(matches!(field.value, Value::Int4(_)));
            }
            FieldItem::Stream(field) => {
                let len = field.info.len();
                consumers.push(tokio::spawn(async move {
                    let mut body = field.body;
                    let mut received = 0;
                    while let Some(chunk) = body.recv().await {
                        received += chunk.len();
                    }
                    assert_eq!(len, Some(received as u32));
                    received
                }));
            }
        }
    }

    producer.await.unwrap()?;

    let mut total = 0;
    for consumer in consumers {
        total += consumer.await.unwrap();
    }
    assert_eq!(total, 4 * BLOB_LEN);

    tracing::info!(total, "streaming ok");
    Ok(())
}
