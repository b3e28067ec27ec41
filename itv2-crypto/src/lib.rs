//! Cryptographic envelope for the ITv2 panel protocol.
//!
//! Provides:
//! - AES-128-ECB whole-frame encryption with zero padding
//! - Type 1 key negotiation (Integration Access Code + Identification Number)
//! - Type 2 key negotiation (32-hex-digit Integration Access Code)
//! - [`FrameCipher`] — per-session cipher with independently activated directions
//!
//! ECB without IVs or MACs is dictated by the panel firmware; the only
//! integrity check above this layer is the frame CRC. Key material lives
//! inside [`FrameCipher`] and drops with the owning session.

#![deny(unsafe_code)]

pub mod ecb;
mod keys;

pub use keys::{FrameCipher, Type1Secrets, Type2Secrets};

use std::fmt;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors raised while turning configured secrets into AES keys.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyError {
    /// The configured code has the wrong number of characters.
    BadLength {
        /// Characters found.
        got: usize,
        /// Characters required.
        expected: usize,
    },
    /// The configured code contains a character outside its alphabet.
    BadCharacter {
        /// Offset of the offending character.
        offset: usize,
    },
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength { got, expected } => {
                write!(f, "code is {got} character(s), expected at least {expected}")
            }
            Self::BadCharacter { offset } => {
                write!(f, "invalid character at offset {offset}")
            }
        }
    }
}

impl std::error::Error for KeyError {}

/// Errors raised during handshake key negotiation.
#[derive(Clone, Debug, PartialEq)]
pub enum NegotiationError {
    /// The decrypted initializer's check bytes do not match the clear half.
    CheckMismatch,
    /// The peer's initializer has the wrong length for the active scheme.
    BadInitializer {
        /// Bytes received.
        got: usize,
        /// Bytes the scheme requires.
        expected: usize,
    },
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckMismatch => write!(f, "initializer check bytes do not match"),
            Self::BadInitializer { got, expected } => {
                write!(f, "initializer is {got} byte(s), scheme requires {expected}")
            }
        }
    }
}

impl std::error::Error for NegotiationError {}

/// Errors raised when decrypting an inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum CipherError {
    /// Ciphertext length is not a multiple of the AES block size.
    NotBlockAligned {
        /// Offending ciphertext length.
        len: usize,
    },
}

impl fmt::Display for CipherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotBlockAligned { len } => {
                write!(f, "ciphertext length {len} is not a multiple of 16")
            }
        }
    }
}

impl std::error::Error for CipherError {}
