//! Ergonomic facade over the ITv2 panel-integration stack.
//!
//! Re-exports the four protocol crates under one roof:
//!
//! | Module      | Crate          | Contents                                |
//! |-------------|----------------|-----------------------------------------|
//! | [`wire`]    | `itv2-wire`    | Field codec: big-endian primitives, arrays |
//! | [`crypto`]  | `itv2-crypto`  | AES-ECB envelope, key negotiation       |
//! | [`proto`]   | `itv2-proto`   | Packets, frames, messages, registry     |
//! | [`gateway`] | `itv2-gateway` | TCP listener, sessions, transactions    |
//!
//! Most applications only need [`Gateway`], [`GatewayConfig`] and the
//! [`Message`] enum.

pub use itv2_crypto as crypto;
pub use itv2_gateway as gateway;
pub use itv2_proto as proto;
pub use itv2_wire as wire;

pub use itv2_gateway::{EventStream, Gateway, GatewayConfig, GatewayError, PanelEvent, SessionHandle};
pub use itv2_proto::{Command, Message};
