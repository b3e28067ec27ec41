//! Field-level binary codec for the ITv2 panel protocol.
//!
//! Everything on the ITv2 wire is big-endian. A message payload is the
//! concatenation of its fields in declared order; there are no alignment
//! gaps and no self-describing tags. Byte-array fields carry one of two
//! length treatments:
//!
//! | Treatment | Encoding |
//! |-----------|----------|
//! | fixed(N)  | exactly N bytes; short values are zero-padded, long values truncated |
//! | length-prefixed | a 1- or 2-byte big-endian length, then the bytes |
//!
//! # Overview
//!
//! | Item             | Purpose                                          |
//! |------------------|--------------------------------------------------|
//! | [`Serializable`] | Append a field's canonical bytes to a buffer     |
//! | [`Cursor`]       | Read fields back out, tracking offset + field name in errors |
//! | [`CompactInt`]   | Reserved variable-width integer hook (single byte today) |

#![deny(unsafe_code)]

pub mod deserialize;
pub mod serialize;

pub use deserialize::{Cursor, Error, PrefixWidth, Result};
pub use serialize::{Serializable, serialize_fixed, serialize_prefixed};

/// Reserved hook for the protocol's variable-width integer encoding.
///
/// Every capture seen so far carries zone/partition numbers as a single
/// byte, so the encoding is exactly a `u8` until a counter-example appears.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct CompactInt(pub u8);

impl From<u8> for CompactInt {
    fn from(v: u8) -> Self { Self(v) }
}

impl From<CompactInt> for u8 {
    fn from(v: CompactInt) -> u8 { v.0 }
}
