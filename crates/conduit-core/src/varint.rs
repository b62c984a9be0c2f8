//! Shared LEB128 varint helpers used by frame and address encoding.

/// Append `value` to `out` as an unsigned LEB128 varint.
pub fn write_u64(out: &mut Vec<u8>, value: u64) {
    leb128::write::unsigned(out, value).expect("Vec<u8> writes are infallible");
}

/// Read an unsigned LEB128 varint from the front of `buf`.
///
/// Returns the decoded value and the remaining, unconsumed slice, or `None`
/// if `buf` does not contain a complete varint.
pub fn read_u64(buf: &[u8]) -> Option<(u64, &[u8])> {
    let mut cursor = buf;
    let value = leb128::read::unsigned(&mut cursor).ok()?;
    Some((value, cursor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_and_large_values() {
        for value in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            write_u64(&mut buf, value);
            let (decoded, rest) = read_u64(&buf).unwrap();
            assert_eq!(decoded, value);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn leaves_trailing_bytes_untouched() {
        let mut buf = Vec::new();
        write_u64(&mut buf, 42);
        buf.extend_from_slice(b"tail");
        let (decoded, rest) = read_u64(&buf).unwrap();
        assert_eq!(decoded, 42);
        assert_eq!(rest, b"tail");
    }

    #[test]
    fn rejects_truncated_multi_byte_varint() {
        let mut buf = Vec::new();
        write_u64(&mut buf, 1 << 20);
        buf.truncate(1);
        assert!(read_u64(&buf).is_none());
    }
}
