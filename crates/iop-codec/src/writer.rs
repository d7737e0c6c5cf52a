//! Low-level member writer. Knows the framing, not the schema.

use crate::wire::{put_header, WireKind};

/// Append-only buffer of encoded members.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

/// Position of a `BLK4` length awaiting its value.
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct OpenBlock {
    len_at: usize,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// An integer in the smallest of `INT1`/`INT2`/`INT4` that holds it,
    /// `QUAD` otherwise. Values above `i64::MAX` go out as raw `u64` bits.
    pub fn put_int(&mut self, tag: u16, value: i128) {
        if let Ok(v) = i8::try_from(value) {
            put_header(WireKind::Int1, tag, &mut self.buf);
            self.buf.extend_from_slice(&v.to_le_bytes());
        } else if let Ok(v) = i16::try_from(value) {
            put_header(WireKind::Int2, tag, &mut self.buf);
            self.buf.extend_from_slice(&v.to_le_bytes());
        } else if let Ok(v) = i32::try_from(value) {
            put_header(WireKind::Int4, tag, &mut self.buf);
            self.buf.extend_from_slice(&v.to_le_bytes());
        } else if let Ok(v) = i64::try_from(value) {
            self.put_quad(tag, v as u64);
        } else {
            self.put_quad(tag, value as u64);
        }
    }

    pub fn put_quad(&mut self, tag: u16, bits: u64) {
        put_header(WireKind::Quad, tag, &mut self.buf);
        self.buf.extend_from_slice(&bits.to_le_bytes());
    }

    pub fn put_f32(&mut self, tag: u16, value: f32) {
        put_header(WireKind::Int4, tag, &mut self.buf);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_f64(&mut self, tag: u16, value: f64) {
        self.put_quad(tag, value.to_bits());
    }

    /// String or bytes payload: length + 1, the bytes, a trailing NUL.
    ///
    /// Returns `None` if the payload does not fit a 32-bit length.
    pub fn put_bytes(&mut self, tag: u16, bytes: &[u8]) -> Option<()> {
        let len = bytes.len().checked_add(1)?;
        self.put_len(tag, len)?;
        self.buf.extend_from_slice(bytes);
        self.buf.push(0);
        Some(())
    }

    /// The explicit-null marker: an empty `BLK1`.
    pub fn put_null(&mut self, tag: u16) {
        put_header(WireKind::Blk1, tag, &mut self.buf);
        self.buf.push(0);
    }

    /// Array header: `REPEAT` and the element count.
    pub fn put_repeat(&mut self, tag: u16, count: usize) -> Option<()> {
        let count = u32::try_from(count).ok()?;
        put_header(WireKind::Repeat, tag, &mut self.buf);
        self.buf.extend_from_slice(&count.to_le_bytes());
        Some(())
    }

    /// Start a nested `BLK4` member whose length is patched by
    /// [`WireWriter::close_block`].
    pub fn open_block(&mut self, tag: u16) -> OpenBlock {
        put_header(WireKind::Blk4, tag, &mut self.buf);
        let len_at = self.buf.len();
        self.buf.extend_from_slice(&[0; 4]);
        OpenBlock { len_at }
    }

    /// Patch the length of a block opened by [`WireWriter::open_block`].
    pub fn close_block(&mut self, block: OpenBlock) -> Option<()> {
        let body_start = block.len_at + 4;
        let len = u32::try_from(self.buf.len() - body_start).ok()?;
        self.buf[block.len_at..body_start].copy_from_slice(&len.to_le_bytes());
        Some(())
    }

    fn put_len(&mut self, tag: u16, len: usize) -> Option<()> {
        if len <= usize::from(u8::MAX) {
            put_header(WireKind::Blk1, tag, &mut self.buf);
            self.buf.push(len as u8);
        } else if let Ok(len) = u16::try_from(len) {
            put_header(WireKind::Blk2, tag, &mut self.buf);
            self.buf.extend_from_slice(&len.to_le_bytes());
        } else {
            let len = u32::try_from(len).ok()?;
            put_header(WireKind::Blk4, tag, &mut self.buf);
            self.buf.extend_from_slice(&len.to_le_bytes());
        }
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(f: impl FnOnce(&mut WireWriter)) -> Vec<u8> {
        let mut w = WireWriter::new();
        f(&mut w);
        w.into_bytes()
    }

    #[test]
    fn test_int_widths() {
        assert_eq!(written(|w| w.put_int(1, 1)), vec![0x81, 0x01]);
        assert_eq!(written(|w| w.put_int(128, 7)), vec![0x9e, 0x80, 0x07]);
        assert_eq!(written(|w| w.put_int(1, -1)), vec![0x81, 0xff]);
        assert_eq!(written(|w| w.put_int(1, 128)), vec![0xa1, 0x80, 0x00]);
        assert_eq!(
            written(|w| w.put_int(1, 70_000)),
            vec![0xc1, 0x70, 0x11, 0x01, 0x00]
        );
        assert_eq!(written(|w| w.put_int(1, 1 << 40))[0], 0x61);
    }

    #[test]
    fn test_u64_max_is_raw_quad() {
        let bytes = written(|w| w.put_int(2, i128::from(u64::MAX)));
        assert_eq!(bytes, vec![0x62, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_string_has_trailing_nul() {
        let bytes = written(|w| {
            w.put_bytes(0, b"a").unwrap();
        });
        assert_eq!(bytes, vec![0x00, 0x02, b'a', 0x00]);
    }

    #[test]
    fn test_long_string_uses_blk2() {
        let payload = vec![b'x'; 300];
        let bytes = written(|w| {
            w.put_bytes(3, &payload).unwrap();
        });
        assert_eq!(&bytes[..3], &[0x23, 0x2d, 0x01]);
        assert_eq!(bytes.len(), 3 + 301);
    }

    #[test]
    fn test_blk1_boundary() {
        // 254 bytes + NUL = 255, the largest BLK1 length.
        let bytes = written(|w| {
            w.put_bytes(1, &[b'y'; 254]).unwrap();
        });
        assert_eq!(&bytes[..2], &[0x01, 0xff]);
        assert_eq!(bytes.len(), 2 + 255);
        let bytes = written(|w| {
            w.put_bytes(1, &[b'y'; 255]).unwrap();
        });
        assert_eq!(&bytes[..3], &[0x21, 0x00, 0x01]);
    }

    #[test]
    fn test_null_marker() {
        assert_eq!(written(|w| w.put_null(2)), vec![0x02, 0x00]);
    }

    #[test]
    fn test_block_length_is_patched() {
        let bytes = written(|w| {
            let block = w.open_block(4);
            w.put_int(1, 1);
            w.put_int(5, 10);
            w.close_block(block).unwrap();
        });
        assert_eq!(
            bytes,
            vec![0x44, 0x04, 0x00, 0x00, 0x00, 0x81, 0x01, 0x85, 0x0a]
        );
    }

    #[test]
    fn test_repeat_header() {
        let bytes = written(|w| {
            w.put_repeat(2, 2).unwrap();
        });
        assert_eq!(bytes, vec![0xe2, 0x02, 0x00, 0x00, 0x00]);
    }
}
