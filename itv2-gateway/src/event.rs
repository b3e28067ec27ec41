//! The event surface exposed to the embedding application.

use chrono::{DateTime, Utc};
use itv2_proto::Message;
use tokio::sync::mpsc;

/// One decoded inbound message, stamped and attributed to its session.
#[derive(Clone, Debug)]
pub struct PanelEvent {
    /// The connection the message arrived on.
    pub session_id: u64,
    /// Wall-clock arrival time.
    pub received_at: DateTime<Utc>,
    /// The decoded message.
    pub message: Message,
}

/// Receiving end of the gateway's notification channel.
///
/// Yields every decoded inbound message across all sessions, in arrival
/// order per session.
pub struct EventStream {
    pub(crate) rx: mpsc::UnboundedReceiver<PanelEvent>,
}

impl EventStream {
    /// Wait for the next event. `None` once the gateway has shut down.
    pub async fn recv(&mut self) -> Option<PanelEvent> {
        self.rx.recv().await
    }
}
