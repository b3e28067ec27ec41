//! Gateway configuration, supplied by the embedding application.

use std::time::Duration;

/// Default TCP port panels dial.
pub const DEFAULT_LISTEN_PORT: u16 = 3072;

/// Everything the gateway needs from its host.
///
/// The secrets mirror what is provisioned on the panel: Type 1 keying
/// uses `access_code_type1` + `id_number`, Type 2 uses the 32-hex-digit
/// `access_code_type2`. A panel asking for a scheme whose secrets are
/// absent is refused during handshake.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GatewayConfig {
    /// TCP port to listen on.
    pub listen_port: u16,
    /// Type 1 Integration Access Code (8+ decimal digits).
    pub access_code_type1: Option<String>,
    /// Type 1 Integration Identification Number (8+ decimal digits).
    pub id_number: Option<String>,
    /// Type 2 Integration Access Code (32 hex characters).
    pub access_code_type2: Option<String>,
    /// Budget for an ordinary transaction.
    pub transaction_timeout: Duration,
    /// Budget for the whole handshake exchange.
    pub handshake_timeout: Duration,
    /// Budget for acquiring the session lock before declaring deadlock.
    pub lock_timeout: Duration,
    /// Delay before the post-handshake software version probe.
    pub heartbeat_initial: Duration,
    /// Interval between connection polls.
    pub heartbeat_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            access_code_type1: None,
            id_number: None,
            access_code_type2: None,
            transaction_timeout: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(60),
            lock_timeout: Duration::from_secs(30),
            heartbeat_initial: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}
