//! # Wire Header
//!
//! Every encoded member starts with a header byte:
//!
//! ```text
//!  7   5 4       0
//! +-----+---------+
//! | kind|   tag   |   tag <= 29: inline
//! +-----+---------+   tag == 30: one more byte holds the tag
//!                     tag == 31: two more bytes hold the tag (LE)
//! ```
//!
//! The kind alone tells a reader how many bytes follow, which is what lets
//! a decoder skip members it does not know.

/// Largest tag stored inline in the header byte.
pub const INLINE_TAG_MAX: u16 = 29;
const ONE_BYTE_TAG: u8 = 30;
const TWO_BYTE_TAG: u8 = 31;
const TAG_MASK: u8 = 0x1f;

/// The 3-bit wire kind of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireKind {
    /// 1-byte length, then that many bytes.
    Blk1 = 0 << 5,
    /// 2-byte little-endian length, then that many bytes.
    Blk2 = 1 << 5,
    /// 4-byte little-endian length, then that many bytes.
    Blk4 = 2 << 5,
    /// 8 bytes.
    Quad = 3 << 5,
    Int1 = 4 << 5,
    Int2 = 5 << 5,
    Int4 = 6 << 5,
    /// 4-byte little-endian element count, then tag-0 members.
    Repeat = 7 << 5,
}

impl WireKind {
    /// Kind encoded in the high bits of a header byte.
    pub fn from_header(byte: u8) -> Self {
        match byte >> 5 {
            0 => Self::Blk1,
            1 => Self::Blk2,
            2 => Self::Blk4,
            3 => Self::Quad,
            4 => Self::Int1,
            5 => Self::Int2,
            6 => Self::Int4,
            _ => Self::Repeat,
        }
    }

    pub fn is_block(self) -> bool {
        matches!(self, Self::Blk1 | Self::Blk2 | Self::Blk4)
    }

    pub fn is_int(self) -> bool {
        matches!(self, Self::Int1 | Self::Int2 | Self::Int4 | Self::Quad)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Blk1 => "BLK1",
            Self::Blk2 => "BLK2",
            Self::Blk4 => "BLK4",
            Self::Quad => "QUAD",
            Self::Int1 => "INT1",
            Self::Int2 => "INT2",
            Self::Int4 => "INT4",
            Self::Repeat => "REPEAT",
        }
    }
}

impl std::fmt::Display for WireKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded member header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: WireKind,
    pub tag: u16,
}

/// Number of extra bytes the header of `tag` needs after the first byte.
pub fn extra_tag_len(tag: u16) -> usize {
    if tag <= INLINE_TAG_MAX {
        0
    } else if tag <= u16::from(u8::MAX) {
        1
    } else {
        2
    }
}

/// Append the header for `(kind, tag)` to `out`.
pub fn put_header(kind: WireKind, tag: u16, out: &mut Vec<u8>) {
    let kind = kind as u8;
    match extra_tag_len(tag) {
        0 => out.push(kind | tag as u8),
        1 => {
            out.push(kind | ONE_BYTE_TAG);
            out.push(tag as u8);
        }
        _ => {
            out.push(kind | TWO_BYTE_TAG);
            out.extend_from_slice(&tag.to_le_bytes());
        }
    }
}

/// Low five bits of a header byte and how many tag bytes follow it.
pub(crate) fn tag_bits(byte: u8) -> (u8, usize) {
    let bits = byte & TAG_MASK;
    match bits {
        ONE_BYTE_TAG => (bits, 1),
        TWO_BYTE_TAG => (bits, 2),
        _ => (bits, 0),
    }
}
