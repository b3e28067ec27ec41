//! Error taxonomy for the gateway.
//!
//! Each variant maps to one failure class; the surrounding layer decides
//! recovery. Packet-level damage (`Framing`) is dropped and logged, codec
//! and negotiation trouble aborts the current transaction, and the fatal
//! kinds (`Disconnected`, `Deadlock`) unwind the whole session.

use std::{fmt, io};

use itv2_crypto::{CipherError, KeyError, NegotiationError};
use itv2_proto::FramingError;
use itv2_proto::frame::FrameError;

/// The error type returned from every gateway operation.
#[derive(Debug)]
pub enum GatewayError {
    /// The peer closed the connection.
    Disconnected,
    /// The session's shutdown token fired.
    Cancelled,
    /// Packet envelope damage: stuffing, delimiters or CRC.
    Framing(FramingError),
    /// A message field failed to encode or decode.
    Encoding(itv2_wire::Error),
    /// Handshake key negotiation failed.
    Negotiation(NegotiationError),
    /// Configured secrets could not be turned into keys.
    Key(KeyError),
    /// Inbound ciphertext was not block-aligned.
    Cipher(CipherError),
    /// A correlated reply had the wrong type.
    UnexpectedResponse {
        /// What the transaction was waiting for.
        expected: &'static str,
    },
    /// A transaction exceeded its time budget.
    Timeout,
    /// The session lock could not be acquired within its budget.
    Deadlock,
    /// A message kind arrived (or was requested) at a point that demands
    /// a supported one.
    NotSupported {
        /// Short description of the unsupported thing.
        what: String,
    },
    /// Transport I/O failure.
    Io(io::Error),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "peer disconnected"),
            Self::Cancelled => write!(f, "session shut down"),
            Self::Framing(e) => write!(f, "framing: {e}"),
            Self::Encoding(e) => write!(f, "encoding: {e}"),
            Self::Negotiation(e) => write!(f, "key negotiation: {e}"),
            Self::Key(e) => write!(f, "key material: {e}"),
            Self::Cipher(e) => write!(f, "decrypt: {e}"),
            Self::UnexpectedResponse { expected } => {
                write!(f, "correlated reply was not the expected {expected}")
            }
            Self::Timeout => write!(f, "transaction timed out"),
            Self::Deadlock => write!(f, "session lock not acquired in time"),
            Self::NotSupported { what } => write!(f, "not supported: {what}"),
            Self::Io(e) => write!(f, "i/o: {e}"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl GatewayError {
    /// Whether this error unwinds the session (as opposed to a single
    /// packet or transaction).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Disconnected | Self::Cancelled | Self::Deadlock | Self::Io(_)
        )
    }
}

impl From<io::Error> for GatewayError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<FramingError> for GatewayError {
    fn from(e: FramingError) -> Self {
        Self::Framing(e)
    }
}

impl From<itv2_wire::Error> for GatewayError {
    fn from(e: itv2_wire::Error) -> Self {
        Self::Encoding(e)
    }
}

impl From<FrameError> for GatewayError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Framing(e) => Self::Framing(e),
            FrameError::Field(e) => Self::Encoding(e),
        }
    }
}

impl From<NegotiationError> for GatewayError {
    fn from(e: NegotiationError) -> Self {
        Self::Negotiation(e)
    }
}

impl From<KeyError> for GatewayError {
    fn from(e: KeyError) -> Self {
        Self::Key(e)
    }
}

impl From<CipherError> for GatewayError {
    fn from(e: CipherError) -> Self {
        Self::Cipher(e)
    }
}
