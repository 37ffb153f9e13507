//! Postgres `COPY BINARY` File Format
//!
//! Docs here mostly quoted from the official postgres documentation.
//!
//! ## File Header
//!
//! The file header consists of 15 bytes of fixed fields, followed by a variable-length
//! header extension area. In this library, the header extension area is always empty.
//!
//! ```text
//! ┏━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┳━━━━━━━━━━━━━━━━━━━┳━━━━━━━━━━━━━━━━━━━┓
//! ┃           Signature            ┃       Flags       ┃ Extension Length  ┃
//! ┣━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━━━━━━━━━━━━━━━┫
//! ┃            [u8;11]             ┃        u32        ┃        u32        ┃
//! ┣━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━━━━━━━━━━━━━━━┫
//! ┃ P G C O P Y \n \377 \r \n \0   ┃ 00 | 00 | 00 | 00 ┃ 00 | 00 | 00 | 00 ┃
//! ┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┻━━━━━━━━━━━━━━━━━━━┻━━━━━━━━━━━━━━━━━━━┛
//! ```
//!
//! ## Tuples
//!
//! Each tuple begins with a 16-bit integer count of the number of fields in the tuple.
//! Then, repeated for each field in the tuple, there is a 32-bit length word followed by
//! that many bytes of field data. The length word does not include itself, and can be zero.
//! As a special case, -1 indicates a NULL field value. No value bytes follow in the NULL case.
//!
//! ```text
//! ┏━━━━━━━━━┳━━━━━━━━━━━━━━━━━━━┳━━━━━━┳━━━━━━━━━━━━━━━━━━━┳━━━━━┓
//! ┃  Count  ┃      Length       ┃ Data ┃      Length       ┃ ... ┃
//! ┣━━━━━━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━┫
//! ┃   u16   ┃        i32        ┃ [u8] ┃        i32        ┃ ... ┃
//! ┣━━━━━━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━┫
//! ┃ 00 | 02 ┃ 00 | 00 | 00 | 04 ┃  ..  ┃ ff | ff | ff | ff ┃ ... ┃
//! ┗━━━━━━━━━┻━━━━━━━━━━━━━━━━━━━┻━━━━━━┻━━━━━━━━━━━━━━━━━━━┻━━━━━┛
//! ```
//!
//! ## File Trailer
//!
//! The file trailer consists of a 16-bit integer word containing -1.
//! This is easily distinguished from a tuple's field-count word.
//!
//! Field data is in the binary `send`/`recv` representation of its type,
//! see [`Type`] for supported types.
//!
//! <https://www.postgresql.org/docs/current/sql-copy.html#id-1.9.3.55.9.4>

mod pg_type;

pub use pg_type::{Oid, PgElement, PgType, Type, UnknownType};

/// `PGCOPY\n\377\r\n\0`
pub const SIGNATURE: [u8; 11] = *b"PGCOPY\n\xff\r\n\0";

/// Signature, flags field, and header extension area length.
pub const HEADER_LEN: usize = SIGNATURE.len() + size_of::<u32>() + size_of::<u32>();

/// Complete file header, with flags and header extension area length set to zero.
pub const HEADER: [u8; HEADER_LEN] = {
    let mut header = [0u8; HEADER_LEN];
    let mut i = 0;
    while i < SIGNATURE.len() {
        header[i] = SIGNATURE[i];
        i += 1;
    }
    header
};

/// Tuple field count which marks the file trailer.
pub const TRAILER: u16 = 0xFFFF;

/// Field length which marks a NULL value.
pub const NULL_LEN: i32 = -1;

/// Postgres epoch, `2000-01-01T00:00:00Z`, in milliseconds since unix epoch.
pub const PG_EPOCH_MS: i64 = 946_684_800_000;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_layout() {
        assert_eq!(HEADER_LEN, 19);
        assert_eq!(&HEADER[..11], b"PGCOPY\n\xff\r\n\0");
        assert_eq!(&HEADER[11..], &[0u8; 8]);
    }
}
