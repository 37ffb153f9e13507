//! Postgres `COPY BINARY` Reader and Writer
//!
//! # Examples
//!
//! Write rows, then read them back:
//!
//! ```
//! use pgcopy::{Encode, Mapping, RowReader, copy::encode_rows};
//!
//! # fn app() -> pgcopy::Result<()> {
//! let bytes = encode_rows(
//!     [
//!         [1i32.encode(), "Foo".encode()],
//!         [2i32.encode(), None::<&str>.encode()],
//!     ],
//!     Default::default(),
//! )?;
//!
//! let mapping = Mapping::parse("id:int4,name:text")?;
//! let mut reader = RowReader::with_mapping(mapping);
//!
//! // any chunk size works
//! for chunk in bytes.chunks(5) {
//!     reader.feed(chunk);
//! }
//!
//! let row = reader.next_row()?.unwrap();
//! let (id, name) = row.decode::<(i32, Option<String>)>()?;
//! assert_eq!(id, 1);
//! assert_eq!(name.as_deref(), Some("Foo"));
//!
//! let row = reader.next_row()?.unwrap();
//! assert_eq!(row.try_get::<_, Option<String>>("name")?, None);
//!
//! assert!(reader.next_row()?.is_none());
//! reader.finish()?;
//! # Ok(())
//! # }
//! # app().unwrap();
//! ```
//!
//! Stream a large field without buffering it:
//!
//! ```no_run
//! use futures::StreamExt;
//! use pgcopy::stream::{FieldItem, FieldStream};
//!
//! # async fn app(file: impl tokio::io::AsyncRead + Unpin) -> pgcopy::Result<()> {
//! let mut fields = FieldStream::with_mapping(file, pgcopy::Mapping::parse("id:int4,blob::async")?);
//!
//! while let Some(item) = fields.next().await {
//!     match item? {
//!         FieldItem::Value(field) => println!("{:?}", field.value),
//!         FieldItem::Stream(field) => {
//!             tokio::spawn(async move {
//!                 let mut body = field.body;
//!                 while let Some(chunk) = body.recv().await {
//!                     println!("{} bytes", chunk.len());
//!                 }
//!             });
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod common;
mod ext;

// Format
pub mod postgres;
pub mod codec;

// Value
mod value;
pub mod encode;
pub mod row;
pub mod mapping;
mod types;

// Operation
pub mod copy;
#[cfg(feature = "tokio")]
pub mod stream;

mod error;


pub use value::{Array, Nested, Value};
pub use encode::{Encode, Encoded};
pub use row::{Column, Decode, DecodeError, FromRow, Row};
pub use mapping::{FieldMode, FieldSpec, Mapping};
pub use types::Json;

pub use copy::{FieldReader, RawReader, RowReader, Writer, WriterConfig};
#[cfg(feature = "tokio")]
pub use stream::{CopyWriter, FieldStream, RawStream, RowStream, StreamConfig};
pub use error::{Error, ErrorKind, Result};

#[cfg(feature = "macros")]
pub use pgcopy_macros::{Decode, FromRow};
