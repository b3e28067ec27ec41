//! The [`Serializable`] trait and the two byte-array treatments.

use crate::deserialize::{Error, PrefixWidth, Result};

/// Serialize `self` into ITv2 wire format (big-endian, no padding).
pub trait Serializable {
    /// Appends the serialized form of `self` to `buf`.
    fn serialize(&self, buf: &mut Vec<u8>);

    /// Convenience: allocate a fresh `Vec<u8>` and serialize into it.
    fn to_bytes(&self) -> Vec<u8> {
        let mut v = Vec::new();
        self.serialize(&mut v);
        v
    }
}

// ─── integers ────────────────────────────────────────────────────────────────

impl Serializable for u8 {
    fn serialize(&self, buf: &mut Vec<u8>) {
        buf.push(*self);
    }
}

impl Serializable for i8 {
    fn serialize(&self, buf: &mut Vec<u8>) {
        buf.push(*self as u8);
    }
}

impl Serializable for u16 {
    fn serialize(&self, buf: &mut Vec<u8>) {
        buf.extend(self.to_be_bytes());
    }
}

impl Serializable for i16 {
    fn serialize(&self, buf: &mut Vec<u8>) {
        buf.extend(self.to_be_bytes());
    }
}

impl Serializable for u32 {
    fn serialize(&self, buf: &mut Vec<u8>) {
        buf.extend(self.to_be_bytes());
    }
}

impl Serializable for i32 {
    fn serialize(&self, buf: &mut Vec<u8>) {
        buf.extend(self.to_be_bytes());
    }
}

impl Serializable for crate::CompactInt {
    fn serialize(&self, buf: &mut Vec<u8>) {
        buf.push(self.0);
    }
}

// ─── byte arrays ─────────────────────────────────────────────────────────────

/// Write `value` as a fixed-length field of exactly `len` bytes.
///
/// Short values are right-padded with `0x00`; long values are truncated.
/// Panels allocate these fields statically, so the width never flexes.
pub fn serialize_fixed(value: &[u8], len: usize, buf: &mut Vec<u8>) {
    if value.len() >= len {
        buf.extend_from_slice(&value[..len]);
    } else {
        buf.extend_from_slice(value);
        buf.extend(std::iter::repeat_n(0u8, len - value.len()));
    }
}

/// Write `value` as a length-prefixed field.
///
/// The length is emitted big-endian in `width` bytes, then the raw bytes.
/// Fails with [`Error::LengthOverflow`] when the value cannot be described
/// by the prefix.
pub fn serialize_prefixed(
    field: &'static str,
    value: &[u8],
    width: PrefixWidth,
    buf: &mut Vec<u8>,
) -> Result<()> {
    let max = width.max_len();
    if value.len() > max {
        return Err(Error::LengthOverflow { field, len: value.len(), max });
    }
    match width {
        PrefixWidth::One => buf.push(value.len() as u8),
        PrefixWidth::Two => buf.extend((value.len() as u16).to_be_bytes()),
    }
    buf.extend_from_slice(value);
    Ok(())
}
