use crate::cursor::ByteCursor;
use chain_lens_types::DecodeError;

/// A decoded CompactSize along with whether its wire form was minimal.
///
/// Non-minimal forms are accepted for parsing; callers surface them as
/// `NonCanonicalSize` diagnostics rather than rejecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactSize {
    pub value: u64,
    pub minimal: bool,
    /// Offset of the first encoded byte.
    pub offset: usize,
}

/// Reads the wire-format variable-length integer.
///
/// First byte `x`: below 0xFD it is the value itself; 0xFD/0xFE/0xFF select
/// a 2/4/8-byte little-endian payload.
pub fn read_compact_size(cur: &mut ByteCursor<'_>) -> Result<CompactSize, DecodeError> {
    let offset = cur.position();
    let first = cur.read_u8()?;
    let (value, minimal) = match first {
        0x00..=0xfc => (first as u64, true),
        0xfd => {
            let v = cur.read_u16_le()? as u64;
            (v, v >= 0xfd)
        }
        0xfe => {
            let v = cur.read_u32_le()? as u64;
            (v, v > u16::MAX as u64)
        }
        0xff => {
            let v = cur.read_u64_le()?;
            (v, v > u32::MAX as u64)
        }
    };
    Ok(CompactSize { value, minimal, offset })
}

/// Appends the minimal CompactSize encoding of `value`.
pub fn write_compact_size(out: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= u16::MAX as u64 {
        out.push(0xfd);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= u32::MAX as u64 {
        out.push(0xfe);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&value.to_le_bytes());
    }
}
