use futures::StreamExt;
use pgcopy::{Mapping, RowStream};

/// Dump rows of `PGCOPY_FILE`, decoded with `PGCOPY_MAPPING` if present.
///
/// A file can be produced with:
///
/// ```sql
/// COPY table TO '/path/file' WITH (FORMAT binary);
/// ```
pub async fn main() -> pgcopy::Result<()> {
    let Ok(path) = std::env::var("PGCOPY_FILE") else {
        tracing::info!("PGCOPY_FILE not set, skipping");
        return Ok(());
    };

    let file = tokio::fs::File::open(&path).await?;
    let mut rows = match Mapping::from_env("PGCOPY_MAPPING")? {
        Some(mapping) => RowStream::with_mapping(file, mapping),
        None => RowStream::new(file),
    };

    while let Some(row) = rows.next().await {
        println!("{:?}", row?);
    }

    tracing::info!(path = %path, rows = rows.rows_read(), "file read");
    Ok(())
}
