//! Byte-slice utilities for bounds-oriented parsing.
//!
//! There are two layers:
//! - **Option layer** (`read_*`): helpers that return `Option<T>`.
//! - **Result layer** (`*_r`): wrappers that map `None` to `DeserializationError::Truncated`.
//!
//! All numeric reads are **big-endian**, which is how every PEL field is laid out.
//! Offsets are `usize` and are interpreted relative to the slice you pass in.

use byteorder::{BigEndian, ByteOrder};

use crate::err::DeserializationError;

/// Read `N` raw bytes at `offset`.
///
/// Returns `None` if the range is out of bounds.
pub(crate) fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    let bytes: [u8; N] = buf.get(offset..end)?.try_into().ok()?;
    Some(bytes)
}

pub(crate) fn read_u8(buf: &[u8], offset: usize) -> Option<u8> {
    buf.get(offset).copied()
}

pub(crate) fn read_u16_be(buf: &[u8], offset: usize) -> Option<u16> {
    Some(BigEndian::read_u16(&read_array::<2>(buf, offset)?))
}

pub(crate) fn read_u32_be(buf: &[u8], offset: usize) -> Option<u32> {
    Some(BigEndian::read_u32(&read_array::<4>(buf, offset)?))
}

#[inline]
pub(crate) fn truncated(
    what: &'static str,
    offset: usize,
    need: usize,
    len: usize,
) -> DeserializationError {
    DeserializationError::Truncated {
        what,
        offset: offset as u64,
        need,
        have: len.saturating_sub(offset),
    }
}

pub(crate) fn slice_r<'a>(
    buf: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], DeserializationError> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| truncated(what, offset, len, buf.len()))?;
    buf.get(offset..end)
        .ok_or_else(|| truncated(what, offset, len, buf.len()))
}

/// Read `N` raw bytes at `offset`, or return `DeserializationError::Truncated`.
pub(crate) fn read_array_r<const N: usize>(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<[u8; N], DeserializationError> {
    read_array::<N>(buf, offset).ok_or_else(|| truncated(what, offset, N, buf.len()))
}

pub(crate) fn read_u16_be_r(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<u16, DeserializationError> {
    read_u16_be(buf, offset).ok_or_else(|| truncated(what, offset, 2, buf.len()))
}

pub(crate) fn read_u32_be_r(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<u32, DeserializationError> {
    read_u32_be(buf, offset).ok_or_else(|| truncated(what, offset, 4, buf.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian() {
        let buf = [0xf0, 0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(read_u16_be(&buf, 0), Some(0xf0f1));
        assert_eq!(read_u32_be(&buf, 4), Some(0xf4f5f6f7));
        assert_eq!(read_u32_be(&buf, 5), None);
    }

    #[test]
    fn test_truncated_reports_what_was_missing() {
        let buf = [0_u8; 3];
        match read_u32_be_r(&buf, 1, "component id") {
            Err(DeserializationError::Truncated {
                what,
                offset,
                need,
                have,
            }) => {
                assert_eq!(what, "component id");
                assert_eq!(offset, 1);
                assert_eq!(need, 4);
                assert_eq!(have, 2);
            }
            other => panic!("expected a truncation error, got {:?}", other),
        }
    }
}
