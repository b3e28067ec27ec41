//! The TCP listener: accepts panel connections and runs one session per
//! socket.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::errors::GatewayError;
use crate::event::{EventStream, PanelEvent};
use crate::session::{self, SessionHandle};
use crate::transport::PacketReader;

/// The panel-integration gateway.
///
/// Binds the listen socket, accepts connections, and owns the registry of
/// live sessions. Decoded inbound messages from every session surface on
/// the [`EventStream`] returned by [`Gateway::bind`].
pub struct Gateway {
    listener: TcpListener,
    cfg: Arc<GatewayConfig>,
    shutdown_token: CancellationToken,
    sessions: Arc<Mutex<HashMap<u64, SessionHandle>>>,
    next_session_id: AtomicU64,
    event_tx: mpsc::UnboundedSender<PanelEvent>,
}

impl Gateway {
    /// Bind the configured listen port and return the gateway plus the
    /// stream of decoded panel messages.
    pub async fn bind(cfg: GatewayConfig) -> Result<(Self, EventStream), GatewayError> {
        let listener = TcpListener::bind(("0.0.0.0", cfg.listen_port)).await?;
        info!("listening on {}", listener.local_addr()?);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let gateway = Self {
            listener,
            cfg: Arc::new(cfg),
            shutdown_token: CancellationToken::new(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_session_id: AtomicU64::new(1),
            event_tx,
        };
        Ok((gateway, EventStream { rx: event_rx }))
    }

    /// The bound socket address (useful when the port was 0).
    pub fn local_addr(&self) -> Result<SocketAddr, GatewayError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until [`Gateway::shutdown`] is called.
    pub async fn run(&self) -> Result<(), GatewayError> {
        loop {
            let (stream, peer) = tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("accept failed: {e}");
                        continue;
                    }
                },
            };

            if let Err(e) = stream.set_nodelay(true) {
                warn!("set_nodelay for {peer}: {e}");
            }

            let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
            info!("session {id}: panel connected from {peer}");

            let (read_half, write_half) = stream.into_split();
            let handle = SessionHandle::new(id, self.cfg.clone(), Box::new(write_half));
            self.sessions.lock().await.insert(id, handle.clone());

            let reader = PacketReader::new(Box::new(read_half) as session::BoxedRead);
            let events = self.event_tx.clone();
            let sessions = self.sessions.clone();
            tokio::spawn(async move {
                session::run_session(handle, reader, events).await;
                sessions.lock().await.remove(&id);
                info!("session {id}: closed");
            });
        }

        // stop every session the accept loop created
        for (_, handle) in self.sessions.lock().await.drain() {
            handle.shutdown();
        }
        Ok(())
    }

    /// Look up a live session by id.
    pub async fn session(&self, id: u64) -> Option<SessionHandle> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Handles to every live session.
    pub async fn sessions(&self) -> Vec<SessionHandle> {
        self.sessions.lock().await.values().cloned().collect()
    }

    /// Stop accepting and shut every session down.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }
}
