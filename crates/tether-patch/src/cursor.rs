//! Bounds-checked sequential reader over container bytes.
//!
//! Every read returns `Option`: `None` means the stream ended early, which
//! callers must propagate as "cannot patch" rather than guessing a value.

/// A forkable read position over an immutable byte slice.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor at the start of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current byte offset from the start of the underlying slice.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Read one byte, or `None` at end of stream.
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    /// Read an unsigned LEB128 integer.
    ///
    /// Returns `None` if the stream ends mid-varint or the encoding
    /// carries payload past 32 bits — truncating instead would mis-frame
    /// every read after it.
    pub fn next_var_u32(&mut self) -> Option<u32> {
        let mut value: u32 = 0;
        let mut shift = 0;
        loop {
            let byte = self.next_byte()?;
            // The fifth byte only has room for the top 4 bits of a u32.
            if shift == 28 && byte & 0x70 != 0 {
                return None;
            }
            value |= u32::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Some(value);
            }
            shift += 7;
            if shift >= 32 {
                return None;
            }
        }
    }

    /// Advance past `n` bytes, or `None` if fewer remain.
    pub fn skip(&mut self, n: usize) -> Option<()> {
        if n > self.remaining() {
            return None;
        }
        self.pos += n;
        Some(())
    }
}

/// Append the minimal unsigned LEB128 encoding of `n` to `out`.
pub fn write_var_u32(out: &mut Vec<u8>, mut n: u32) {
    loop {
        let byte = (n & 0x7f) as u8;
        n >>= 7;
        if n == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Byte length of the minimal unsigned LEB128 encoding of `n`.
pub fn var_u32_len(mut n: u32) -> usize {
    let mut len = 1;
    while n >= 0x80 {
        n >>= 7;
        len += 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(n: u32) -> Vec<u8> {
        let mut out = Vec::new();
        write_var_u32(&mut out, n);
        out
    }

    #[test]
    fn varint_round_trip() {
        for n in [
            0u32,
            1,
            127,
            128,
            129,
            16_383,
            16_384,
            (1 << 21) - 1,
            1 << 21,
            (1 << 28) - 1,
            1 << 28,
            u32::MAX - 1,
            u32::MAX,
        ] {
            let bytes = encode(n);
            let mut cursor = Cursor::new(&bytes);
            assert_eq!(cursor.next_var_u32(), Some(n), "value {n}");
            assert_eq!(cursor.remaining(), 0, "value {n} left trailing bytes");
        }
    }

    #[test]
    fn varint_encoding_is_minimal() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(127), vec![0x7f]);
        assert_eq!(encode(128), vec![0x80, 0x01]);
        assert_eq!(encode(16_384), vec![0x80, 0x80, 0x01]);
        assert_eq!(encode(u32::MAX).len(), 5);
        for n in [0u32, 5, 127, 128, 300, 16_383, 16_384, u32::MAX] {
            let bytes = encode(n);
            assert_eq!(bytes.len(), var_u32_len(n));
            // The final byte never carries a continuation bit.
            assert!(bytes.last().unwrap() & 0x80 == 0);
        }
    }

    #[test]
    fn varint_truncated_stream_is_end() {
        // Continuation bit set, then nothing.
        let mut cursor = Cursor::new(&[0x80]);
        assert_eq!(cursor.next_var_u32(), None);

        let mut cursor = Cursor::new(&[0xff, 0xff]);
        assert_eq!(cursor.next_var_u32(), None);

        let mut cursor = Cursor::new(&[]);
        assert_eq!(cursor.next_var_u32(), None);
    }

    #[test]
    fn varint_unterminated_is_end() {
        // Five continuation bytes exceed 32 bits of payload.
        let mut cursor = Cursor::new(&[0xff, 0xff, 0xff, 0xff, 0xff, 0x00]);
        assert_eq!(cursor.next_var_u32(), None);
    }

    #[test]
    fn varint_overwide_final_byte_is_rejected() {
        // A terminated five-byte varint whose final byte carries data
        // above bit 31 must fail, not silently drop the top bits.
        let mut cursor = Cursor::new(&[0x80, 0x80, 0x80, 0x80, 0x7f]);
        assert_eq!(cursor.next_var_u32(), None);

        let mut cursor = Cursor::new(&[0x80, 0x80, 0x80, 0x80, 0x10]);
        assert_eq!(cursor.next_var_u32(), None);

        // The widest in-range encodings still decode.
        let mut cursor = Cursor::new(&[0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(cursor.next_var_u32(), Some(u32::MAX));
        let mut cursor = Cursor::new(&[0x80, 0x80, 0x80, 0x80, 0x08]);
        assert_eq!(cursor.next_var_u32(), Some(1 << 31));
    }

    #[test]
    fn skip_past_end_fails() {
        let mut cursor = Cursor::new(&[1, 2, 3]);
        assert_eq!(cursor.skip(2), Some(()));
        assert_eq!(cursor.pos(), 2);
        assert_eq!(cursor.skip(2), None);
        // A failed skip leaves the position untouched.
        assert_eq!(cursor.pos(), 2);
    }

    #[test]
    fn forked_cursors_are_independent() {
        let bytes = [10, 20, 30];
        let mut a = Cursor::new(&bytes);
        assert_eq!(a.next_byte(), Some(10));
        let mut b = a.clone();
        assert_eq!(a.next_byte(), Some(20));
        assert_eq!(b.next_byte(), Some(20));
        assert_eq!(b.next_byte(), Some(30));
        assert_eq!(a.pos(), 2);
    }
}
