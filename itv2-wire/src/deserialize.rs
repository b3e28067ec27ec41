//! The [`Cursor`] buffer and field-aware read methods.

use std::fmt;

// ─── Error ───────────────────────────────────────────────────────────────────

/// Errors that can occur while encoding or decoding message fields.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Ran out of bytes before the named field was fully read.
    ShortBuffer {
        /// Field being decoded when the buffer ran dry.
        field: &'static str,
        /// Byte offset at which decoding stopped.
        offset: usize,
        /// How many more bytes the field needed.
        needed: usize,
    },
    /// A length-prefixed field's value does not fit its prefix.
    LengthOverflow {
        /// Field being encoded.
        field: &'static str,
        /// Actual value length.
        len: usize,
        /// Largest length the prefix can describe.
        max: usize,
    },
    /// A field kind the codec has no encoding for.
    ///
    /// Hand-written codecs make this unreachable in practice; the variant
    /// exists so registry self-checks have something to report.
    Unsupported {
        /// The offending field.
        field: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortBuffer { field, offset, needed } => {
                write!(f, "short buffer decoding `{field}`: need {needed} more byte(s) at offset {offset}")
            }
            Self::LengthOverflow { field, len, max } => {
                write!(f, "`{field}` is {len} bytes, exceeds {max}-byte prefix range")
            }
            Self::Unsupported { field } => write!(f, "`{field}` has an unsupported field kind"),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for field codec operations.
pub type Result<T> = std::result::Result<T, Error>;

// ─── Prefix width ────────────────────────────────────────────────────────────

/// Width of the length prefix in front of a variable byte-array field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrefixWidth {
    /// One length byte; values up to 255 bytes.
    One,
    /// Two big-endian length bytes; values up to 65 535 bytes.
    Two,
}

impl PrefixWidth {
    /// Largest value length the prefix can describe.
    pub fn max_len(self) -> usize {
        match self {
            Self::One => u8::MAX as usize,
            Self::Two => u16::MAX as usize,
        }
    }
}

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// A cursor over an in-memory payload slice.
///
/// Every read takes the name of the field being decoded so that a short
/// buffer reports *which* field failed and at what offset, not just that
/// the payload ended early.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor positioned at the start of `buf`.
    pub fn from_slice(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current byte offset.
    pub fn pos(&self) -> usize { self.pos }

    /// Remaining bytes.
    pub fn remaining(&self) -> usize { self.buf.len() - self.pos }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::ShortBuffer {
                field,
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        Ok(self.take(1, field)?[0])
    }

    /// Read a signed byte.
    pub fn read_i8(&mut self, field: &'static str) -> Result<i8> {
        Ok(self.take(1, field)?[0] as i8)
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(&mut self, field: &'static str) -> Result<u16> {
        let b = self.take(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian `i16`.
    pub fn read_i16(&mut self, field: &'static str) -> Result<i16> {
        let b = self.take(2, field)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian `u32`.
    pub fn read_u32(&mut self, field: &'static str) -> Result<u32> {
        let b = self.take(4, field)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a big-endian `i32`.
    pub fn read_i32(&mut self, field: &'static str) -> Result<i32> {
        let b = self.take(4, field)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a [`crate::CompactInt`] (single byte today).
    pub fn read_compact(&mut self, field: &'static str) -> Result<crate::CompactInt> {
        Ok(crate::CompactInt(self.read_u8(field)?))
    }

    /// Read a fixed-length byte array of exactly `len` bytes.
    pub fn read_fixed(&mut self, len: usize, field: &'static str) -> Result<Vec<u8>> {
        Ok(self.take(len, field)?.to_vec())
    }

    /// Read a length-prefixed byte array.
    pub fn read_prefixed(&mut self, width: PrefixWidth, field: &'static str) -> Result<Vec<u8>> {
        let len = match width {
            PrefixWidth::One => self.read_u8(field)? as usize,
            PrefixWidth::Two => self.read_u16(field)? as usize,
        };
        self.read_fixed(len, field)
    }

    /// Consume all remaining bytes.
    pub fn read_to_end(&mut self) -> Vec<u8> {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice.to_vec()
    }
}
