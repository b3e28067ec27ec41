//! # itv2-gateway
//!
//! Async gateway core for DSC PowerSeries NEO panels speaking ITv2.
//!
//! Panels dial in over TCP; each connection becomes a [`SessionHandle`]
//! that negotiates a mutually-keyed AES session and then multiplexes
//! typed, sequenced transactions over the socket. The gateway is passive
//! in the transport sense and active in the application sense: it answers
//! inbound notifications and initiates its own commands (heartbeats,
//! version probes, anything the embedding application sends).
//!
//! ```rust,no_run
//! use itv2_gateway::{Gateway, GatewayConfig};
//!
//! # async fn demo() -> Result<(), itv2_gateway::GatewayError> {
//! let cfg = GatewayConfig {
//!     access_code_type2: Some("0123456789abcdef0123456789abcdef".into()),
//!     ..Default::default()
//! };
//! let (gateway, mut events) = Gateway::bind(cfg).await?;
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         println!("panel {} sent {:?}", event.session_id, event.message);
//!     }
//! });
//! gateway.run().await
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod errors;
mod event;
mod listener;
mod session;
mod transaction;
mod transport;

pub use config::{DEFAULT_LISTEN_PORT, GatewayConfig};
pub use errors::GatewayError;
pub use event::{EventStream, PanelEvent};
pub use listener::Gateway;
pub use session::SessionHandle;
pub use transaction::Outcome;
pub use transport::{PacketReader, PacketWriter};

/// Version string mirrored to panels during the handshake.
pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");
