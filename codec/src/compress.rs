use crate::cursor::ByteCursor;
use chain_lens_types::DecodeError;

/// Longest accepted encoding of the Core-internal varint.
const MAX_VARINT_BYTES: usize = 9;

/// Reads Bitcoin Core's internal variable-length integer, as defined by the
/// `ReadVarInt` routine in Core's serialize.h.
///
/// Seven data bits per byte, MSB set meaning more bytes follow; each
/// continuation increments the accumulator before shifting, which is what
/// makes every encoding unique. Unrelated to the wire-format CompactSize.
pub fn read_core_varint(cur: &mut ByteCursor<'_>) -> Result<u64, DecodeError> {
    let start = cur.position();
    let mut n = 0u64;

    loop {
        if cur.position() - start == MAX_VARINT_BYTES {
            return Err(DecodeError::InvalidEncoding(format!(
                "varint at offset {start} exceeds {MAX_VARINT_BYTES} bytes"
            )));
        }

        let ch_data = cur.read_u8()?;

        if n > (u64::MAX >> 7) {
            return Err(DecodeError::InvalidEncoding(format!(
                "varint at offset {start} overflows u64"
            )));
        }

        n = (n << 7) | (ch_data & 0x7f) as u64;

        if ch_data & 0x80 != 0 {
            // Continuation: bump the accumulator so no value has two encodings.
            n = n.checked_add(1).ok_or_else(|| {
                DecodeError::InvalidEncoding(format!("varint at offset {start} overflows u64"))
            })?;
        } else {
            return Ok(n);
        }
    }
}

/// Expands a compressed satoshi amount back to its value.
///
/// Zero is a sentinel; otherwise `compressed - 1` decomposes into a ten's
/// power exponent `e` and digits, bit-exact to Core.
pub fn decompress_amount(compressed: u64) -> Result<u64, DecodeError> {
    if compressed == 0 {
        return Ok(0);
    }

    let mut x = compressed - 1;

    let e = (x % 10) as u32;
    x /= 10;

    let n = if e < 9 {
        let d = x % 9 + 1;
        x /= 9;
        x * 10 + d
    } else {
        x + 1
    };

    n.checked_mul(10u64.pow(e)).ok_or_else(|| {
        DecodeError::InvalidEncoding("amount overflow during decompression".to_string())
    })
}
