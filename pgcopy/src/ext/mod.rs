use bytes::{Buf, BufMut, BytesMut};

use crate::{encode::EncodeError, postgres::Type, row::DecodeError};

/// Integer signess in postgres docs is awful.
pub trait UsizeExt {
    /// Length is `usize` in rust, while field length is `i32` on the wire.
    fn to_field_len(self) -> Result<i32, EncodeError>;
    /// Count is `usize` in rust, while field count is `u16` on the wire,
    /// with `0xFFFF` reserved for the trailer.
    fn to_field_count(self) -> Result<u16, EncodeError>;
}

/// Length checked read of big endian integers.
pub trait BufExt: Buf {
    /// Read `i32`, returns [`DecodeError::Truncated`] if not enough bytes.
    fn read_i32(&mut self, ty: Type) -> Result<i32, DecodeError> {
        match self.remaining() >= size_of::<i32>() {
            true => Ok(self.get_i32()),
            false => Err(DecodeError::Truncated { ty }),
        }
    }

    /// Read `u32`, returns [`DecodeError::Truncated`] if not enough bytes.
    fn read_u32(&mut self, ty: Type) -> Result<u32, DecodeError> {
        match self.remaining() >= size_of::<u32>() {
            true => Ok(self.get_u32()),
            false => Err(DecodeError::Truncated { ty }),
        }
    }
}

impl<B: Buf + ?Sized> BufExt for B { }

/// Length prefixed write in [`BytesMut`].
pub trait BytesMutExt {
    /// Write a placeholder length, call `f`, then patch the length with
    /// the number of bytes `f` written.
    ///
    /// On error, the buffer is truncated back to its length before the call.
    fn put_len_prefixed<F, E>(&mut self, f: F) -> Result<(), E>
    where
        F: FnOnce(&mut Self) -> Result<(), E>,
        E: From<EncodeError>;
}

impl BytesMutExt for BytesMut {
    fn put_len_prefixed<F, E>(&mut self, f: F) -> Result<(), E>
    where
        F: FnOnce(&mut Self) -> Result<(), E>,
        E: From<EncodeError>,
    {
        let offset = self.len();
        self.put_i32(0);
        let written = f(self).and_then(|()| {
            Ok((self.len() - offset - size_of::<i32>()).to_field_len()?)
        });
        match written {
            Ok(len) => {
                self[offset..offset + size_of::<i32>()].copy_from_slice(&len.to_be_bytes());
                Ok(())
            }
            Err(err) => {
                self.truncate(offset);
                Err(err)
            }
        }
    }
}

/// Helper trait to [`Display`][std::fmt::Display] bytes.
pub trait FmtExt {
    /// Lossy [`Display`][std::fmt::Display] bytes.
    fn lossy(&self) -> LossyFmt<'_>;
}

/// Lossy [`Display`][std::fmt::Display] implementation for bytes.
pub struct LossyFmt<'a>(pub &'a [u8]);

impl UsizeExt for usize {
    fn to_field_len(self) -> Result<i32, EncodeError> {
        self.try_into().map_err(|_| EncodeError::TooLarge(self))
    }

    fn to_field_count(self) -> Result<u16, EncodeError> {
        match u16::try_from(self) {
            Ok(count) if count != crate::postgres::TRAILER => Ok(count),
            _ => Err(EncodeError::TooManyFields(self)),
        }
    }
}

impl FmtExt for [u8] {
    fn lossy(&self) -> LossyFmt<'_> {
        LossyFmt(self)
    }
}

impl std::fmt::Display for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn field_count_reserves_trailer() {
        assert_eq!(0usize.to_field_count().unwrap(), 0);
        assert_eq!(65534usize.to_field_count().unwrap(), 65534);
        assert!(matches!(65535usize.to_field_count(), Err(EncodeError::TooManyFields(65535))));
        assert!(matches!(70000usize.to_field_count(), Err(EncodeError::TooManyFields(70000))));
    }

    #[test]
    fn len_prefixed() {
        let mut buf = BytesMut::from(&b"ab"[..]);
        buf.put_len_prefixed(|buf| {
            buf.put_slice(b"xyz");
            Ok::<_, EncodeError>(())
        })
        .unwrap();
        assert_eq!(&buf[..], b"ab\x00\x00\x00\x03xyz");
    }

    #[test]
    fn len_prefixed_rollback() {
        let mut buf = BytesMut::from(&b"ab"[..]);
        let err = buf
            .put_len_prefixed(|buf| {
                buf.put_slice(b"partial");
                Err(EncodeError::TooManyFields(70000))
            })
            .unwrap_err();
        assert!(matches!(err, EncodeError::TooManyFields(70000)));
        assert_eq!(&buf[..], b"ab");
    }

    #[test]
    fn lossy() {
        assert_eq!(b"PGCOPY\n\xff"[..].lossy().to_string(), "PGCOPY\\x0a\\xff");
    }
}
