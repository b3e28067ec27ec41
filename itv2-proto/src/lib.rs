//! ITv2 wire protocol: packets, frames, messages and the command registry.
//!
//! This crate is sans-IO. It turns typed messages into inner frames and
//! inner frames into delimiter-bounded packets (and back), leaving sockets,
//! sessions and encryption scheduling to the gateway crate. The layering,
//! outermost first:
//!
//! ```text
//! packet   [header?] 0x7E [byte-stuffed body] 0x7F          — stuffing
//! frame    [length][sender][receiver][command?][app?][payload][crc]
//! message  typed fields, big-endian, per-command codec      — messages
//! ```
//!
//! Encryption slots between the two outer layers: an inner frame is AES'd
//! as a whole, then stuffed. [`framing`] therefore exposes the frame seal
//! and packet wrap as separate steps.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod frame;
pub mod framing;
pub mod messages;
pub mod registry;
pub mod stuffing;

pub use command::Command;
pub use frame::{Frame, FrameBody, FrameError};
pub use framing::FramingError;
pub use messages::Message;
pub use registry::{Registration, TransactionKind};
