//! Unsigned LEB128-style varints as used by archive directories.

use crate::error::{PmdemError, Result};

/// Decode one unsigned varint from `buf` starting at `pos`.
///
/// Each byte carries seven payload bits, least-significant group first; a set
/// high bit means another byte follows. Returns the value and the position of
/// the first byte after it.
///
/// # Errors
///
/// [`PmdemError::TruncatedVarint`] if the buffer ends before a terminating
/// byte, and [`PmdemError::MalformedDirectory`] if the value does not fit in
/// 64 bits.
pub fn read_varint(buf: &[u8], pos: usize) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut cursor = pos;

    loop {
        let byte = *buf
            .get(cursor)
            .ok_or(PmdemError::TruncatedVarint { offset: pos })?;
        cursor += 1;

        if shift >= 64 || (shift == 63 && byte & 0x7e != 0) {
            return Err(PmdemError::MalformedDirectory {
                reason: format!("varint at byte {pos} overflows 64 bits"),
            });
        }
        value |= u64::from(byte & 0x7f) << shift;

        if byte & 0x80 == 0 {
            return Ok((value, cursor));
        }
        shift += 7;
    }
}

/// Append `value` to `out` as a varint.
#[cfg(test)]
pub(crate) fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_byte() {
        assert_eq!(read_varint(&[0x00], 0).unwrap(), (0, 1));
        assert_eq!(read_varint(&[0x7f], 0).unwrap(), (127, 1));
    }

    #[test]
    fn test_multi_byte() {
        // 300 = 0b10_0101100
        assert_eq!(read_varint(&[0xac, 0x02], 0).unwrap(), (300, 2));
        assert_eq!(read_varint(&[0x80, 0x80, 0x01], 0).unwrap(), (16384, 3));
    }

    #[test]
    fn test_starts_at_offset() {
        let buf = [0xff, 0xff, 0x05, 0x01];
        assert_eq!(read_varint(&buf, 2).unwrap(), (5, 3));
        assert_eq!(read_varint(&buf, 3).unwrap(), (1, 4));
    }

    #[test]
    fn test_max_value() {
        let mut buf = Vec::new();
        write_varint(&mut buf, u64::MAX);
        assert_eq!(buf.len(), 10);
        assert_eq!(read_varint(&buf, 0).unwrap(), (u64::MAX, 10));
    }

    #[test]
    fn test_truncated() {
        let result = read_varint(&[0x80, 0x80], 0);
        assert!(matches!(
            result,
            Err(PmdemError::TruncatedVarint { offset: 0 })
        ));

        let result = read_varint(&[], 0);
        assert!(matches!(result, Err(PmdemError::TruncatedVarint { .. })));
    }

    #[test]
    fn test_overflow_rejected() {
        let buf = [0xff; 11];
        assert!(matches!(
            read_varint(&buf, 0),
            Err(PmdemError::MalformedDirectory { .. })
        ));
    }
}
