//! Wire-format boundary.
//!
//! Contract target:
//! - little-endian integer and length-prefixed byte string reads/writes only
//! - every declared length is checked against the remaining buffer
//! - no record semantics, no crypto

use crate::error::DecodeError;

/// Bounded cursor over an untrusted buffer.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub(crate) fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, field: &'static str, needed: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        let out = self
            .pos
            .checked_add(needed)
            .and_then(|end| self.buf.get(self.pos..end))
            .ok_or(DecodeError::Truncated {
                field,
                needed,
                remaining,
            })?;
        self.pos += needed;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }

    pub(crate) fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        let [b] = self.take_array::<1>(field)?;
        Ok(b)
    }

    pub(crate) fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        self.take_array(field).map(u32::from_le_bytes)
    }

    /// Read a `u32` length prefix followed by that many bytes.
    pub(crate) fn read_bytes(&mut self, field: &'static str) -> Result<&'a [u8], DecodeError> {
        self.read_bytes_limited(field, usize::MAX)
    }

    /// Like [`Reader::read_bytes`], rejecting declared lengths above `limit`
    /// before looking at the remaining buffer.
    pub(crate) fn read_bytes_limited(
        &mut self,
        field: &'static str,
        limit: usize,
    ) -> Result<&'a [u8], DecodeError> {
        let declared = self.read_u32(field)?;
        let len = usize::try_from(declared).map_err(|_| DecodeError::TooLong {
            field,
            len: usize::MAX,
            limit,
        })?;
        if len > limit {
            return Err(DecodeError::TooLong { field, len, limit });
        }
        self.take(field, len)
    }
}

/// Append a little-endian `u32`.
pub(crate) fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Append a little-endian `u64`.
pub(crate) fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Append a `u32` length prefix and the bytes.
///
/// Record fields are bounded far below `u32::MAX` on the decode side, so a
/// longer slice is a caller bug.
pub(crate) fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    put_u32(out, len);
    out.extend_from_slice(bytes);
}

/// Encoded size of a length-prefixed byte string.
pub(crate) fn bytes_size(bytes: &[u8]) -> usize {
    4 + bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_fixed_width_little_endian() {
        let buf = [0x02, 0, 0, 0, 0x0c, 0x01, 0x04, 0, 0];
        let mut r = Reader::new(&buf);
        assert_eq!(r.read_u32("version").unwrap(), 2);
        assert_eq!(r.read_u8("log2BlockSize").unwrap(), 12);
        assert_eq!(r.read_u32("signatureAlgorithmId").unwrap(), 0x0401);
        assert!(!r.has_remaining());
    }

    #[test]
    fn test_read_bytes_exact() {
        let mut buf = Vec::new();
        put_bytes(&mut buf, b"salt");
        put_bytes(&mut buf, b"");
        let mut r = Reader::new(&buf);
        assert_eq!(r.read_bytes("salt").unwrap(), b"salt");
        assert_eq!(r.read_bytes("rootHash").unwrap(), b"");
        assert_eq!(r.position(), buf.len());
    }

    #[test]
    fn test_declared_length_past_end_is_truncation() {
        let mut buf = Vec::new();
        put_u32(&mut buf, 10);
        buf.extend_from_slice(b"short");
        let mut r = Reader::new(&buf);
        let err = r.read_bytes("certificate").unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                field: "certificate",
                needed: 10,
                remaining: 5
            }
        );
    }

    #[test]
    fn test_huge_declared_length_does_not_allocate() {
        let buf = u32::MAX.to_le_bytes();
        let mut r = Reader::new(&buf);
        let err = r.read_bytes("signature").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Truncated { needed, .. } if needed == u32::MAX as usize
        ));
    }

    #[test]
    fn test_limit_checked_before_remaining() {
        let mut buf = Vec::new();
        put_bytes(&mut buf, &[0u8; 32]);
        let mut r = Reader::new(&buf);
        let err = r.read_bytes_limited("hashingInfo", 16).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TooLong {
                field: "hashingInfo",
                len: 32,
                limit: 16
            }
        );
    }

    #[test]
    fn test_short_integer_is_truncation() {
        let mut r = Reader::new(&[1, 2]);
        let err = r.read_u32("hashAlgorithm").unwrap_err();
        assert_eq!(err.field(), "hashAlgorithm");
        // A failed read consumes nothing.
        assert_eq!(r.remaining(), 2);
    }

    #[test]
    fn test_bytes_size() {
        assert_eq!(bytes_size(b""), 4);
        assert_eq!(bytes_size(b"abc"), 7);
    }
}
