use byteorder::{ByteOrder, LittleEndian};
use chain_lens_types::DecodeError;

/// A read-only view of a byte buffer with a monotonically advancing cursor.
///
/// Every primitive read either advances the cursor by its exact width or
/// fails with [`DecodeError::Truncated`]; the cursor never moves past the
/// end of the buffer.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    /// Current absolute offset into the underlying buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, width: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < width {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: width - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + width];
        self.pos += width;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, DecodeError> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, DecodeError> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Reads exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.take(n)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// The next byte, without advancing.
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.take(n).map(|_| ())
    }

    /// Borrows an absolute sub-range of the underlying buffer.
    ///
    /// Both bounds must have been visited by the cursor already (offset
    /// bookkeeping guarantees they are in range).
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.data[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn reads_advance_by_exact_width() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut cur = ByteCursor::new(&data);

        assert_eq!(cur.read_u8().unwrap(), 0x01);
        assert_eq!(cur.position(), 1);
        assert_eq!(cur.read_u16_le().unwrap(), 0x0302);
        assert_eq!(cur.read_u32_le().unwrap(), 0x07060504);
        assert_eq!(cur.position(), 7);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn truncated_read_reports_missing_bytes() {
        let data = [0x01, 0x02];
        let mut cur = ByteCursor::new(&data);

        assert_matches!(
            cur.read_u32_le(),
            Err(DecodeError::Truncated { offset: 0, needed: 2 })
        );
        // A failed read does not advance.
        assert_eq!(cur.position(), 0);
        assert_eq!(cur.read_u16_le().unwrap(), 0x0201);
    }

    #[test]
    fn peek_does_not_advance() {
        let data = [0xab];
        let mut cur = ByteCursor::new(&data);
        assert_eq!(cur.peek_u8(), Some(0xab));
        assert_eq!(cur.position(), 0);
        assert_eq!(cur.read_u8().unwrap(), 0xab);
        assert_eq!(cur.peek_u8(), None);
    }

    #[test]
    fn slice_recovers_visited_ranges() {
        let data = [0x10, 0x20, 0x30, 0x40];
        let mut cur = ByteCursor::new(&data);
        cur.skip(4).unwrap();
        assert_eq!(cur.slice(1, 3), &[0x20, 0x30]);
    }
}
