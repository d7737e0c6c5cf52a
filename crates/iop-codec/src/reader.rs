//! Low-level member reader. Knows the framing, not the schema.
//!
//! Readers borrow the whole input and carry absolute offsets, so a reader
//! for a nested block still reports positions relative to the start of the
//! payload.

use crate::wire::{tag_bits, Header, WireKind};

/// Framing-level failure, turned into a [`crate::DecodeError`] by the caller
/// who knows which type was being decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameError {
    pub offset: usize,
    pub reason: String,
}

impl FrameError {
    fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }
}

pub type FrameResult<T> = Result<T, FrameError>;

#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            end: buf.len(),
        }
    }

    /// Absolute offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    fn take(&mut self, len: usize) -> FrameResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(FrameError::new(
                self.pos,
                format!("need {len} bytes, {} left", self.remaining()),
            ));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> FrameResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_header(&mut self) -> FrameResult<Header> {
        let [byte] = self.take_array::<1>()?;
        let kind = WireKind::from_header(byte);
        let tag = match tag_bits(byte) {
            (bits, 0) => u16::from(bits),
            (_, 1) => {
                let [t] = self.take_array::<1>()?;
                u16::from(t)
            }
            _ => u16::from_le_bytes(self.take_array::<2>()?),
        };
        Ok(Header { kind, tag })
    }

    /// Consume an explicit-null marker (empty `BLK1`) if one follows a
    /// `BLK1` header.
    pub fn take_null(&mut self, header: Header) -> bool {
        if header.kind == WireKind::Blk1 && self.pos < self.end && self.buf[self.pos] == 0 {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Any integer kind, sign-extended from its width.
    pub fn read_int(&mut self, kind: WireKind) -> FrameResult<i64> {
        let at = self.pos;
        Ok(match kind {
            WireKind::Int1 => i64::from(i8::from_le_bytes(self.take_array()?)),
            WireKind::Int2 => i64::from(i16::from_le_bytes(self.take_array()?)),
            WireKind::Int4 => i64::from(i32::from_le_bytes(self.take_array()?)),
            WireKind::Quad => i64::from_le_bytes(self.take_array()?),
            other => return Err(FrameError::new(at, format!("expected integer, found {other}"))),
        })
    }

    pub fn read_quad(&mut self, kind: WireKind) -> FrameResult<u64> {
        match kind {
            WireKind::Quad => Ok(u64::from_le_bytes(self.take_array()?)),
            other => Err(FrameError::new(self.pos, format!("expected QUAD, found {other}"))),
        }
    }

    pub fn read_f32(&mut self, kind: WireKind) -> FrameResult<f32> {
        match kind {
            WireKind::Int4 => Ok(f32::from_le_bytes(self.take_array()?)),
            other => Err(FrameError::new(self.pos, format!("expected INT4, found {other}"))),
        }
    }

    pub fn read_f64(&mut self, kind: WireKind) -> FrameResult<f64> {
        Ok(f64::from_bits(self.read_quad(kind)?))
    }

    fn read_len(&mut self, kind: WireKind) -> FrameResult<usize> {
        let len = match kind {
            WireKind::Blk1 => usize::from(self.take_array::<1>()?[0]),
            WireKind::Blk2 => usize::from(u16::from_le_bytes(self.take_array()?)),
            WireKind::Blk4 | WireKind::Repeat => {
                u32::from_le_bytes(self.take_array()?) as usize
            }
            other => {
                return Err(FrameError::new(
                    self.pos,
                    format!("expected block, found {other}"),
                ))
            }
        };
        Ok(len)
    }

    /// String or bytes payload, without its trailing NUL.
    pub fn read_bytes(&mut self, kind: WireKind) -> FrameResult<&'a [u8]> {
        let at = self.pos;
        let len = self.read_len(kind)?;
        if kind == WireKind::Repeat || len == 0 {
            return Err(FrameError::new(at, "expected non-empty block"));
        }
        let data = self.take(len)?;
        if data[len - 1] != 0 {
            return Err(FrameError::new(self.pos - 1, "missing trailing NUL"));
        }
        Ok(&data[..len - 1])
    }

    /// Reader over the body of a block member; `self` moves past it.
    pub fn read_block(&mut self, kind: WireKind) -> FrameResult<WireReader<'a>> {
        if !kind.is_block() {
            return Err(FrameError::new(self.pos, format!("expected block, found {kind}")));
        }
        let len = self.read_len(kind)?;
        let start = self.pos;
        self.take(len)?;
        Ok(WireReader {
            buf: self.buf,
            pos: start,
            end: start + len,
        })
    }

    /// Element count of a `REPEAT` member.
    ///
    /// Every element takes at least one byte, so a count above the bytes
    /// left is rejected before anything is allocated.
    pub fn read_repeat(&mut self, kind: WireKind) -> FrameResult<usize> {
        if kind != WireKind::Repeat {
            return Err(FrameError::new(self.pos, format!("expected REPEAT, found {kind}")));
        }
        let at = self.pos;
        let count = self.read_len(kind)?;
        if count > self.remaining() {
            return Err(FrameError::new(
                at,
                format!("element count {count} exceeds {} remaining bytes", self.remaining()),
            ));
        }
        Ok(count)
    }

    /// Skip the payload of a member of unknown meaning.
    ///
    /// `depth_left` bounds nested `REPEAT`s; `Err(None)` means it ran out.
    pub fn skip(&mut self, kind: WireKind, depth_left: usize) -> Result<(), Option<FrameError>> {
        match kind {
            WireKind::Int1 => self.take(1).map(drop)?,
            WireKind::Int2 => self.take(2).map(drop)?,
            WireKind::Int4 => self.take(4).map(drop)?,
            WireKind::Quad => self.take(8).map(drop)?,
            WireKind::Blk1 | WireKind::Blk2 | WireKind::Blk4 => {
                let len = self.read_len(kind)?;
                self.take(len)?;
            }
            WireKind::Repeat => {
                if depth_left == 0 {
                    return Err(None);
                }
                let count = self.read_repeat(kind)?;
                for _ in 0..count {
                    let at = self.pos;
                    let header = self.read_header()?;
                    if header.tag != 0 {
                        return Err(Some(FrameError::new(at, "array element with non-zero tag")));
                    }
                    self.skip(header.kind, depth_left - 1)?;
                }
            }
        }
        Ok(())
    }
}
