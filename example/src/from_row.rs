use futures::StreamExt;
use pgcopy::{Decode, Encode, FromRow, Mapping, RowStream, copy::encode_rows};

#[derive(Debug, FromRow)]
struct Post {
    id: PostId,
    title: String,
    tags: Vec<String>,
}

#[derive(Debug, FromRow)]
struct PostTuple(PostId, String);

#[derive(Debug, Decode)]
struct PostId(i64);

pub async fn main() -> pgcopy::Result<()> {
    let bytes = encode_rows(
        (1..=3i64).map(|id| {
            [
                id.encode(),
                format!("post {id}").encode(),
                vec![String::from("rust"), format!("tag{id}")].encode(),
            ]
        }),
        Default::default(),
    )?;

    let mapping = Mapping::parse("id:int8,title:text,tags:text[]")?;
    let mut rows = RowStream::with_mapping(&bytes[..], mapping);

    while let Some(row) = rows.next().await {
        let row = row?;
        let tuple = row.clone().decode::<PostTuple>()?;
        let post = row.decode::<Post>()?;
        assert_eq!(tuple.0.0, post.id.0);
        assert_eq!(post.tags.len(), 2);
        tracing::info!(?post, "decoded");
    }

    Ok(())
}
