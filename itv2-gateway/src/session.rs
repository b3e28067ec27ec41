//! Per-connection session: sequences, encryption state, transaction
//! multiplexing, heartbeat.
//!
//! Two entry points mutate a session: the listen loop (decoded inbound
//! frames) and the public send API. Both go through one async mutex with
//! a bounded acquire; outbound frames therefore leave the socket in the
//! order their sequence numbers were allocated.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{Mutex, MutexGuard, oneshot};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use itv2_crypto::{FrameCipher, Type1Secrets, Type2Secrets};
use itv2_proto::frame::{Frame, FrameBody};
use itv2_proto::framing;
use itv2_proto::messages::{ConnectionPoll, Message, SoftwareVersionRequest};
use itv2_proto::registry::{self, TransactionKind};

use crate::config::GatewayConfig;
use crate::errors::GatewayError;
use crate::event::PanelEvent;
use crate::transaction::{
    ActiveTransaction, CommandResponseTx, HandshakeTx, Outcome, SimpleAckTx,
};
use crate::transport::{PacketReader, PacketWriter};

pub(crate) type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

// ─── SessionCore ─────────────────────────────────────────────────────────────

/// The lock-guarded heart of a session: counters, cipher, write half.
///
/// Transactions receive `&mut SessionCore` for the duration of a step;
/// everything they send goes through [`SessionCore::send_message`] or
/// [`SessionCore::send_ack`] so sequence allocation can't be bypassed.
pub(crate) struct SessionCore {
    session_id: u64,
    cfg: Arc<GatewayConfig>,
    /// Last allocated outbound sequence; the next frame carries `+1`.
    local_seq: u8,
    /// Last seen `sender_seq` from the panel.
    remote_seq: u8,
    /// Application sequence: tracks the panel inbound, allocates outbound.
    app_seq: u8,
    cipher: FrameCipher,
    writer: PacketWriter<BoxedWrite>,
    handshake_done: bool,
    heartbeat_started: bool,
    /// Logged counter: how many transactions this session has aborted.
    aborts: u64,
}

impl SessionCore {
    pub(crate) fn session_id(&self) -> u64 {
        self.session_id
    }

    pub(crate) fn remote_seq(&self) -> u8 {
        self.remote_seq
    }

    fn next_local_seq(&mut self) -> u8 {
        self.local_seq = self.local_seq.wrapping_add(1);
        self.local_seq
    }

    fn next_app_seq(&mut self) -> u8 {
        self.app_seq = self.app_seq.wrapping_add(1);
        self.app_seq
    }

    fn note_inbound(&mut self, frame: &Frame) {
        self.remote_seq = frame.sender_seq;
        if let Some(seq) = frame.app_seq() {
            // the counter follows the panel's value on inbound
            self.app_seq = seq;
        }
        if frame.receiver_seq != self.local_seq {
            // lenient by observation: panels echo stale sequences
            debug!(
                "session {}: frame echoes receiver_seq {:#04x}, last emitted {:#04x}",
                self.session_id, frame.receiver_seq, self.local_seq
            );
        }
    }

    pub(crate) fn type1_secrets(&self) -> Result<Type1Secrets, GatewayError> {
        match (&self.cfg.access_code_type1, &self.cfg.id_number) {
            (Some(access), Some(ident)) => Ok(Type1Secrets::new(access, ident)?),
            _ => Err(GatewayError::NotSupported {
                what: "type 1 keying requested but secrets are not configured".into(),
            }),
        }
    }

    pub(crate) fn type2_secrets(&self) -> Result<Type2Secrets, GatewayError> {
        match &self.cfg.access_code_type2 {
            Some(access) => Ok(Type2Secrets::new(access)?),
            None => Err(GatewayError::NotSupported {
                what: "type 2 keying requested but secrets are not configured".into(),
            }),
        }
    }

    pub(crate) fn activate_outbound(&mut self, key: [u8; 16]) {
        self.cipher.activate_outbound(key);
    }

    pub(crate) fn activate_inbound(&mut self, key: [u8; 16]) {
        self.cipher.activate_inbound(key);
    }

    pub(crate) fn mark_handshake_done(&mut self) {
        self.handshake_done = true;
    }

    fn note_abort(&mut self) {
        self.aborts += 1;
        debug!("session {}: {} transaction(s) aborted so far", self.session_id, self.aborts);
    }

    /// Send a typed message, allocating the transport sequence and, when
    /// the command is flagged, the application sequence. Returns the
    /// transport sequence the frame carried.
    pub(crate) async fn send_message(
        &mut self,
        message: Message,
        receiver_seq: u8,
    ) -> Result<u8, GatewayError> {
        let sender_seq = self.next_local_seq();
        let app_seq = registry::is_app_sequenced(message.command_code())
            .then(|| self.next_app_seq());
        let frame = Frame::message(sender_seq, receiver_seq, app_seq, message);
        self.write_frame(&frame).await?;
        Ok(sender_seq)
    }

    /// Send the bare acknowledgement.
    pub(crate) async fn send_ack(&mut self, receiver_seq: u8) -> Result<u8, GatewayError> {
        let sender_seq = self.next_local_seq();
        let frame = Frame::ack(sender_seq, receiver_seq);
        self.write_frame(&frame).await?;
        Ok(sender_seq)
    }

    async fn write_frame(&mut self, frame: &Frame) -> Result<(), GatewayError> {
        let mut inner = frame.encode()?;
        self.cipher.encrypt_outbound(&mut inner);
        let packet = framing::wrap_packet(&inner);
        self.writer.write_packet(&packet).await
    }
}

// ─── SessionState / SessionHandle ────────────────────────────────────────────

pub(crate) struct SessionState {
    pub(crate) core: SessionCore,
    pub(crate) transactions: Vec<ActiveTransaction>,
    next_tx_id: u64,
}

/// Cloneable handle to one panel connection.
///
/// Obtained from the gateway's session registry. Sending resolves when
/// the underlying transaction does; the session keeps serving other
/// traffic in the meantime.
#[derive(Clone)]
pub struct SessionHandle {
    id: u64,
    cfg: Arc<GatewayConfig>,
    state: Arc<Mutex<SessionState>>,
    shutdown_token: CancellationToken,
}

impl SessionHandle {
    pub(crate) fn new(id: u64, cfg: Arc<GatewayConfig>, writer: BoxedWrite) -> Self {
        let core = SessionCore {
            session_id: id,
            cfg: cfg.clone(),
            local_seq: 0,
            remote_seq: 0,
            app_seq: 0,
            cipher: FrameCipher::new(),
            writer: PacketWriter::new(writer),
            handshake_done: false,
            heartbeat_started: false,
            aborts: 0,
        };
        Self {
            id,
            cfg,
            state: Arc::new(Mutex::new(SessionState {
                core,
                transactions: Vec::new(),
                next_tx_id: 1,
            })),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// The session's id, unique within the gateway process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request a clean shutdown: aborts active transactions, drops key
    /// material, releases the transport.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    /// Whether the session is still alive.
    pub fn is_open(&self) -> bool {
        !self.shutdown_token.is_cancelled()
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    async fn lock(&self) -> Result<MutexGuard<'_, SessionState>, GatewayError> {
        timeout(self.cfg.lock_timeout, self.state.lock())
            .await
            .map_err(|_| GatewayError::Deadlock)
    }

    /// Send a typed message to the panel and wait for its transaction to
    /// resolve. The transaction pattern comes from the registry; unknown
    /// commands run as plain ack'd data messages.
    pub async fn send(&self, message: Message) -> Result<Outcome, GatewayError> {
        if self.shutdown_token.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        let kind = registry::lookup(message.command_code())
            .map(|r| r.kind)
            .unwrap_or(TransactionKind::SimpleAck);
        let (done_tx, done_rx) = oneshot::channel();

        {
            let mut guard = self.lock().await?;
            let id = guard.next_tx_id;
            guard.next_tx_id += 1;
            let token = self.shutdown_token.child_token();
            let SessionState { core, transactions, .. } = &mut *guard;

            let tx = match kind {
                TransactionKind::SimpleAck => {
                    let mut tx = SimpleAckTx::new(id, token.clone());
                    tx.begin_outbound(core, message, done_tx).await?;
                    ActiveTransaction::SimpleAck(tx)
                }
                TransactionKind::CommandResponse => {
                    let mut tx = CommandResponseTx::new(id, token.clone());
                    tx.begin_outbound(core, message, done_tx).await?;
                    ActiveTransaction::CommandResponse(tx)
                }
                TransactionKind::Handshake => {
                    return Err(GatewayError::NotSupported {
                        what: "the panel initiates the handshake, not the gateway".into(),
                    });
                }
            };

            if tx.can_continue() {
                arm_timeout(
                    self.state.clone(),
                    id,
                    token,
                    self.cfg.transaction_timeout,
                );
                transactions.push(tx);
            }
        }

        done_rx.await.map_err(|_| GatewayError::Cancelled)?
    }

    /// Keep-alive probe.
    pub async fn poll(&self) -> Result<Outcome, GatewayError> {
        self.send(ConnectionPoll.into()).await
    }

    /// Ask the panel for its firmware version.
    pub async fn request_software_version(&self) -> Result<Outcome, GatewayError> {
        self.send(SoftwareVersionRequest.into()).await
    }
}

// ─── Timeout timers ──────────────────────────────────────────────────────────

/// Arm the timeout for a freshly inserted transaction. Completing or
/// aborting the transaction cancels `token` and the timer just exits.
fn arm_timeout(
    state: Arc<Mutex<SessionState>>,
    id: u64,
    token: CancellationToken,
    budget: Duration,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = sleep(budget) => {
                let mut guard = state.lock().await;
                if let Some(pos) = guard.transactions.iter().position(|t| t.id() == id) {
                    let mut tx = guard.transactions.remove(pos);
                    tx.abort(GatewayError::Timeout);
                    guard.core.note_abort();
                }
            }
        }
    });
}

// ─── Listen loop ─────────────────────────────────────────────────────────────

/// Drive one session until disconnect or shutdown.
pub(crate) async fn run_session(
    handle: SessionHandle,
    mut reader: PacketReader<BoxedRead>,
    events: UnboundedSender<PanelEvent>,
) {
    let shutdown = handle.shutdown_token();
    let session_id = handle.id();

    let result: Result<(), GatewayError> = async {
        loop {
            let packet = tokio::select! {
                _ = shutdown.cancelled() => return Err(GatewayError::Cancelled),
                packet = reader.read_packet() => packet?,
            };

            let inner = match framing::unwrap_packet(&packet) {
                Ok(inner) => inner,
                Err(e) => {
                    warn!("session {session_id}: dropping damaged packet: {e}");
                    continue;
                }
            };

            let mut guard = handle.lock().await?;
            let frame = {
                let mut inner = inner;
                if let Err(e) = guard.core.cipher.decrypt_inbound(&mut inner) {
                    warn!("session {session_id}: dropping packet: {e}");
                    continue;
                }
                match Frame::decode(&inner) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("session {session_id}: undecodable frame: {e}");
                        continue;
                    }
                }
            };

            dispatch(&handle, &mut guard, &frame).await?;
            drop(guard);

            if let FrameBody::Message { message, .. } = &frame.body {
                let _ = events.send(PanelEvent {
                    session_id,
                    received_at: Utc::now(),
                    message: message.clone(),
                });
            }
        }
    }
    .await;

    match &result {
        Err(GatewayError::Disconnected) => info!("session {session_id}: panel disconnected"),
        Err(GatewayError::Cancelled) => info!("session {session_id}: shut down"),
        Err(e) => warn!("session {session_id}: terminated: {e}"),
        Ok(()) => {}
    }

    // teardown: abort whatever is still in flight, drop key material
    shutdown.cancel();
    if let Ok(mut guard) = timeout(handle.cfg.lock_timeout, handle.state.lock()).await {
        for mut tx in guard.transactions.drain(..) {
            tx.abort(GatewayError::Cancelled);
        }
        guard.core.cipher = FrameCipher::new();
    }
}

/// Offer one decoded frame to the active transactions, falling back to a
/// new inbound transaction per the registry.
async fn dispatch(
    handle: &SessionHandle,
    state: &mut SessionState,
    frame: &Frame,
) -> Result<(), GatewayError> {
    let new_tx_id = state.next_tx_id;
    let mut began_new = false;
    {
        let SessionState { core, transactions, .. } = &mut *state;
        core.note_inbound(frame);

        let mut taken = false;
        let mut index = 0;
        while index < transactions.len() {
            match transactions[index].try_continue(core, frame).await {
                Ok(true) => {
                    taken = true;
                    break;
                }
                Ok(false) => index += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    transactions[index].abort(e);
                    core.note_abort();
                    index += 1;
                }
            }
        }

        if !taken {
            match &frame.body {
                FrameBody::Ack => {
                    debug!(
                        "session {}: ack for receiver_seq {:#04x} correlates no transaction",
                        core.session_id(),
                        frame.receiver_seq
                    );
                }
                FrameBody::Message { message, .. } => {
                    begin_inbound(handle, core, transactions, new_tx_id, frame, message).await?;
                    began_new = true;
                }
            }
        }
    }

    if began_new {
        state.next_tx_id = new_tx_id + 1;
    }
    state.transactions.retain(|t| t.can_continue());

    if state.core.handshake_done && !state.core.heartbeat_started {
        state.core.heartbeat_started = true;
        tokio::spawn(run_heartbeat(handle.clone()));
    }
    Ok(())
}

async fn begin_inbound(
    handle: &SessionHandle,
    core: &mut SessionCore,
    transactions: &mut Vec<ActiveTransaction>,
    id: u64,
    frame: &Frame,
    message: &Message,
) -> Result<(), GatewayError> {
    let kind = registry::lookup(message.command_code())
        .map(|r| r.kind)
        .unwrap_or(TransactionKind::SimpleAck);
    let token = handle.shutdown_token().child_token();

    let tx = match (kind, message) {
        (TransactionKind::Handshake, Message::OpenSession(opener)) => {
            let mut tx = HandshakeTx::new(id, token.clone(), handle.shutdown_token(), opener);
            tx.begin_inbound(core, frame).await?;
            ActiveTransaction::Handshake(tx)
        }
        (TransactionKind::Handshake, _) | (TransactionKind::CommandResponse, _) => {
            let mut tx = CommandResponseTx::new(id, token.clone());
            tx.begin_inbound(core, frame).await?;
            ActiveTransaction::CommandResponse(tx)
        }
        (TransactionKind::SimpleAck, _) => {
            let mut tx = SimpleAckTx::new(id, token.clone());
            tx.begin_inbound(core, frame).await?;
            ActiveTransaction::SimpleAck(tx)
        }
    };

    if tx.can_continue() {
        let budget = if matches!(tx, ActiveTransaction::Handshake(_)) {
            handle.cfg.handshake_timeout
        } else {
            handle.cfg.transaction_timeout
        };
        arm_timeout(handle.state.clone(), id, token, budget);
        transactions.push(tx);
    }
    Ok(())
}

// ─── Heartbeat ───────────────────────────────────────────────────────────────

/// Post-handshake keep-alive: one software version probe, then periodic
/// connection polls until shutdown.
async fn run_heartbeat(handle: SessionHandle) {
    let cfg = handle.cfg.clone();
    let shutdown = handle.shutdown_token();
    let session_id = handle.id();

    tokio::select! {
        _ = shutdown.cancelled() => return,
        _ = sleep(cfg.heartbeat_initial) => {}
    }
    match handle.request_software_version().await {
        Ok(outcome) => debug!("session {session_id}: version probe: {outcome:?}"),
        Err(e) if e.is_fatal() => return,
        Err(e) => warn!("session {session_id}: version probe failed: {e}"),
    }

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = sleep(cfg.heartbeat_interval) => {}
        }
        match handle.poll().await {
            Ok(_) => debug!("session {session_id}: poll answered"),
            Err(e) if e.is_fatal() => return,
            Err(e) => warn!("session {session_id}: poll failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itv2_proto::messages::SoftwareVersionRequest;

    fn test_handle() -> (SessionHandle, tokio::io::DuplexStream) {
        let (client, server) = tokio::io::duplex(8192);
        let (_read, write) = tokio::io::split(server);
        let handle = SessionHandle::new(7, Arc::new(GatewayConfig::default()), Box::new(write));
        (handle, client)
    }

    #[tokio::test]
    async fn local_sequence_counts_outbound_frames() {
        let (handle, _peer) = test_handle();
        let mut guard = handle.state.lock().await;
        for expected in 1..=5u8 {
            let seq = guard.core.send_ack(0).await.unwrap();
            assert_eq!(seq, expected);
        }
        // wrap at 256 is legal
        guard.core.local_seq = 0xFF;
        assert_eq!(guard.core.send_ack(0).await.unwrap(), 0x00);
    }

    #[tokio::test]
    async fn first_added_transaction_wins_correlation() {
        let (handle, _peer) = test_handle();
        let mut guard = handle.state.lock().await;

        // two inbound command transactions on the same remote sequence
        let request = Frame::message(0x09, 0x00, None, SoftwareVersionRequest.into());
        let SessionState { core, transactions, .. } = &mut *guard;
        for id in [1, 2] {
            let mut tx = CommandResponseTx::new(id, CancellationToken::new());
            tx.begin_inbound(core, &request).await.unwrap();
            transactions.push(ActiveTransaction::CommandResponse(tx));
        }

        let ack = Frame::ack(0x09, 0x01);
        dispatch(&handle, &mut guard, &ack).await.unwrap();

        // the first took the ack and completed; the second never saw it
        assert_eq!(guard.transactions.len(), 1);
        assert_eq!(guard.transactions[0].id(), 2);
        assert!(guard.transactions[0].can_continue());
    }

    #[tokio::test]
    async fn unsequenced_acks_do_not_touch_the_app_counter() {
        let (handle, _peer) = test_handle();
        let mut guard = handle.state.lock().await;
        guard.core.app_seq = 9;
        guard.core.note_inbound(&Frame::ack(0x01, 0x00));
        assert_eq!(guard.core.app_seq, 9);
        assert_eq!(guard.core.remote_seq, 0x01);
    }
}
