use futures::TryStreamExt;
use pgcopy::{Array, Encode, Encoded, Json, Mapping, Nested, RowStream, postgres::Type, stream::CopyWriter};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Meta {
    tags: Vec<String>,
}

pub async fn main() -> pgcopy::Result<()> {
    let now = UtcDateTime::now().replace_millisecond(0).unwrap();
    let meta = Json(Meta { tags: vec!["a".into(), "b".into()] });
    let grid = Array::from_nested(Nested::List(vec![
        Nested::list([1i32, 2]),
        Nested::list([3i32, 4]),
    ]))
    .unwrap();
    assert_eq!(grid.dims(), [2, 2]);

    let mut writer = CopyWriter::new(Vec::new());
    writer
        .write_row(&[
            1i64.encode(),
            "first".encode(),
            now.encode(),
            meta.try_encode()?,
            Encoded::new(Type::Int4Array, grid.clone()),
        ])
        .await?;
    writer
        .write_row(&[
            2i64.encode(),
            None::<&str>.encode(),
            now.encode(),
            Encoded::null(Type::Jsonb),
            Encoded::new(Type::Int4Array, Array::empty()),
        ])
        .await?;
    let bytes = writer.finish().await?;

    let mapping = Mapping::parse("id:int8,name:text,at:timestamptz,meta:jsonb,grid:int4[]")?;
    let rows = RowStream::with_mapping(&bytes[..], mapping)
        .try_collect::<Vec<_>>()
        .await?;

    let first = &rows[0];
    assert_eq!(first.try_get::<_, i64>("id")?, 1);
    assert_eq!(first.try_get::<_, UtcDateTime>("at")?, now);
    assert_eq!(first.try_get::<_, Json<Meta>>("meta")?, meta);
    assert_eq!(
        first.try_get::<_, serde_json::Value>("meta")?,
        serde_json::json!({ "tags": ["a", "b"] })
    );
    assert_eq!(first.try_get::<_, Array>("grid")?, grid);

    let second = &rows[1];
    assert_eq!(second.try_get::<_, Option<String>>("name")?, None);
    assert!(second.try_get::<_, Array>("grid")?.is_empty());

    tracing::info!(rows = rows.len(), bytes = bytes.len(), "roundtrip ok");
    Ok(())
}
