//! The three transaction state machines.
//!
//! A transaction owns a temporarily-exclusive correlation window spanning
//! two or three frames. Inbound transactions are created by the listen
//! loop when an unsolicited message arrives; outbound transactions are
//! created by the send path. Every step runs under the session lock, so
//! the machines themselves hold no synchronisation.
//!
//! Correlation is by sequence number: an inbound transaction owns frames
//! whose `sender_seq` equals the remote sequence captured at begin, an
//! outbound transaction owns frames whose `receiver_seq` equals the last
//! local sequence it emitted. The handshake refines this per phase.

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use itv2_crypto::{Type1Secrets, Type2Secrets};
use itv2_proto::frame::{Frame, FrameBody};
use itv2_proto::messages::{
    CommandResponse, EncryptionType, Message, OpenSession, RequestAccess, ResponseCode,
};
use itv2_proto::messages::DeviceType;

use crate::errors::GatewayError;
use crate::session::SessionCore;

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// What an outbound transaction resolved to.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The peer acknowledged the message.
    Acked,
    /// The peer answered a data message with a `CommandError` NACK.
    Nacked {
        /// Raw error code from the NACK.
        code: u8,
    },
    /// The peer answered a command request; the code is informational,
    /// `Success` or not.
    Response(ResponseCode),
}

pub(crate) type Completion = oneshot::Sender<Result<Outcome, GatewayError>>;

// ─── Common state ────────────────────────────────────────────────────────────

pub(crate) struct TxCommon {
    id: u64,
    label: &'static str,
    /// Last local sequence this transaction emitted.
    local_seq: u8,
    /// Sender sequence of the remote message that began the window.
    remote_seq: u8,
    timeout_token: CancellationToken,
    completion: Option<Completion>,
    open: bool,
}

impl TxCommon {
    fn new(id: u64, label: &'static str, timeout_token: CancellationToken) -> Self {
        Self {
            id,
            label,
            local_seq: 0,
            remote_seq: 0,
            timeout_token,
            completion: None,
            open: true,
        }
    }

    fn complete(&mut self, outcome: Outcome) {
        if !self.open {
            return;
        }
        debug!("tx#{} {} complete: {outcome:?}", self.id, self.label);
        self.open = false;
        self.timeout_token.cancel();
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(Ok(outcome));
        }
    }

    fn abort(&mut self, reason: GatewayError) {
        if !self.open {
            return;
        }
        warn!("tx#{} {} aborted: {reason}", self.id, self.label);
        self.open = false;
        self.timeout_token.cancel();
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(Err(reason));
        }
    }
}

// ─── SimpleAck ───────────────────────────────────────────────────────────────

/// Data message acknowledged with a bare ack.
pub(crate) struct SimpleAckTx {
    common: TxCommon,
    awaiting_ack: bool,
}

impl SimpleAckTx {
    pub(crate) fn new(id: u64, timeout_token: CancellationToken) -> Self {
        Self { common: TxCommon::new(id, "simple-ack", timeout_token), awaiting_ack: false }
    }

    /// Inbound: acknowledge the message and finish immediately.
    pub(crate) async fn begin_inbound(
        &mut self,
        core: &mut SessionCore,
        frame: &Frame,
    ) -> Result<(), GatewayError> {
        self.common.remote_seq = frame.sender_seq;
        core.send_ack(frame.sender_seq).await?;
        self.common.complete(Outcome::Acked);
        Ok(())
    }

    /// Outbound: send the data message and wait for the ack.
    pub(crate) async fn begin_outbound(
        &mut self,
        core: &mut SessionCore,
        message: Message,
        completion: Completion,
    ) -> Result<(), GatewayError> {
        self.common.completion = Some(completion);
        self.common.remote_seq = core.remote_seq();
        self.common.local_seq = core.send_message(message, core.remote_seq()).await?;
        self.awaiting_ack = true;
        Ok(())
    }

    async fn try_continue(
        &mut self,
        _core: &mut SessionCore,
        frame: &Frame,
    ) -> Result<bool, GatewayError> {
        if !self.awaiting_ack || frame.receiver_seq != self.common.local_seq {
            return Ok(false);
        }
        match &frame.body {
            FrameBody::Ack => {
                self.common.complete(Outcome::Acked);
                Ok(true)
            }
            FrameBody::Message { message: Message::CommandError(e), .. } => {
                // NACK completes the transaction; the caller sees the code
                warn!("tx#{} nacked with code {:#04x}", self.common.id, e.code);
                self.common.complete(Outcome::Nacked { code: e.code });
                Ok(true)
            }
            FrameBody::Message { message, .. } => {
                // wrong type: give the frame back to the new-inbound path
                self.common.abort(GatewayError::UnexpectedResponse { expected: "ack" });
                debug!(
                    "tx#{} released correlated {:#06x} to the inbound path",
                    self.common.id,
                    message.command_code()
                );
                Ok(false)
            }
        }
    }
}

// ─── CommandResponse ─────────────────────────────────────────────────────────

enum CommandResponsePhase {
    /// Inbound: response sent, waiting for the peer's ack.
    AwaitAck,
    /// Outbound: request sent, waiting for the peer's response.
    AwaitResponse,
}

/// Command request answered with a coded response, then acked.
pub(crate) struct CommandResponseTx {
    common: TxCommon,
    phase: CommandResponsePhase,
}

impl CommandResponseTx {
    pub(crate) fn new(id: u64, timeout_token: CancellationToken) -> Self {
        Self {
            common: TxCommon::new(id, "command-response", timeout_token),
            phase: CommandResponsePhase::AwaitAck,
        }
    }

    /// Inbound: answer the command with `Success`, then wait to be acked.
    pub(crate) async fn begin_inbound(
        &mut self,
        core: &mut SessionCore,
        frame: &Frame,
    ) -> Result<(), GatewayError> {
        self.common.remote_seq = frame.sender_seq;
        self.common.local_seq = core
            .send_message(
                CommandResponse { code: ResponseCode::Success }.into(),
                frame.sender_seq,
            )
            .await?;
        self.phase = CommandResponsePhase::AwaitAck;
        Ok(())
    }

    /// Outbound: send the request and wait for the coded response.
    pub(crate) async fn begin_outbound(
        &mut self,
        core: &mut SessionCore,
        message: Message,
        completion: Completion,
    ) -> Result<(), GatewayError> {
        self.common.completion = Some(completion);
        self.common.remote_seq = core.remote_seq();
        self.common.local_seq = core.send_message(message, core.remote_seq()).await?;
        self.phase = CommandResponsePhase::AwaitResponse;
        Ok(())
    }

    async fn try_continue(
        &mut self,
        core: &mut SessionCore,
        frame: &Frame,
    ) -> Result<bool, GatewayError> {
        match self.phase {
            CommandResponsePhase::AwaitAck => {
                if frame.sender_seq != self.common.remote_seq {
                    return Ok(false);
                }
                if frame.is_ack() {
                    self.common.complete(Outcome::Acked);
                    Ok(true)
                } else {
                    self.common.abort(GatewayError::UnexpectedResponse { expected: "ack" });
                    Ok(false)
                }
            }
            CommandResponsePhase::AwaitResponse => {
                if frame.receiver_seq != self.common.local_seq {
                    return Ok(false);
                }
                match frame.message_ref() {
                    Some(Message::CommandResponse(m)) => {
                        // the protocol acks the response whatever its code
                        core.send_ack(frame.sender_seq).await?;
                        self.common.complete(Outcome::Response(m.code));
                        Ok(true)
                    }
                    _ => {
                        self.common.abort(GatewayError::UnexpectedResponse {
                            expected: "command response",
                        });
                        Ok(false)
                    }
                }
            }
        }
    }
}

// ─── Handshake ───────────────────────────────────────────────────────────────

enum Scheme {
    Type1(Type1Secrets),
    Type2(Type2Secrets),
}

impl Scheme {
    fn derive_outbound(&self, initializer: &[u8]) -> Result<[u8; 16], GatewayError> {
        match self {
            Self::Type1(s) => Ok(s.derive_outbound(initializer)?),
            Self::Type2(s) => Ok(s.derive_outbound(initializer)?),
        }
    }

    fn make_inbound(&self) -> ([u8; 16], Vec<u8>) {
        match self {
            Self::Type1(s) => s.make_inbound(),
            Self::Type2(s) => s.make_inbound(),
        }
    }
}

enum HandshakePhase {
    /// A: our response to the panel's opener is out, waiting for its ack.
    AckOpen,
    /// B: our mirrored opener is out, waiting for the panel's response.
    MirrorResponse,
    /// Between B and C: waiting for the panel's key-exchange request.
    AwaitRequestAccess,
    /// C: our response to the key-exchange request is out; outbound
    /// encryption is already live.
    AckAccess,
    /// D: our own key-exchange request is out; both directions live.
    AccessResponse,
}

/// The four-phase session-opening exchange.
///
/// Three command/response/ack exchanges run back to back; the key
/// activations happen at the points the protocol fixes: outbound on
/// receiving the panel's initializer, inbound just before ours is sent.
/// Any abort also tears the session down — there is no unkeyed fallback.
pub(crate) struct HandshakeTx {
    common: TxCommon,
    phase: HandshakePhase,
    scheme: Option<Scheme>,
    opener: OpenSession,
    /// Cancelling this kills the whole session.
    session_token: CancellationToken,
}

impl HandshakeTx {
    pub(crate) fn new(
        id: u64,
        timeout_token: CancellationToken,
        session_token: CancellationToken,
        opener: &OpenSession,
    ) -> Self {
        Self {
            common: TxCommon::new(id, "handshake", timeout_token),
            phase: HandshakePhase::AckOpen,
            scheme: None,
            opener: opener.clone(),
            session_token,
        }
    }

    /// Phase A: pick the keying scheme and answer the opener.
    pub(crate) async fn begin_inbound(
        &mut self,
        core: &mut SessionCore,
        frame: &Frame,
    ) -> Result<(), GatewayError> {
        let scheme = match self.opener.encryption_type {
            EncryptionType::Type1 => {
                match core.type1_secrets() {
                    Ok(s) => Scheme::Type1(s),
                    Err(e) => return self.refuse(core, frame, e).await,
                }
            }
            EncryptionType::Type2 => {
                match core.type2_secrets() {
                    Ok(s) => Scheme::Type2(s),
                    Err(e) => return self.refuse(core, frame, e).await,
                }
            }
            other => {
                let e = GatewayError::NotSupported {
                    what: format!("encryption scheme {other:?}"),
                };
                return self.refuse(core, frame, e).await;
            }
        };
        info!(
            "session {} opening: scheme {:?}, panel fw {:?}",
            core.session_id(),
            self.opener.encryption_type,
            String::from_utf8_lossy(&self.opener.software_version)
        );
        self.scheme = Some(scheme);
        self.common.remote_seq = frame.sender_seq;
        self.common.local_seq = core
            .send_message(
                CommandResponse { code: ResponseCode::Success }.into(),
                frame.sender_seq,
            )
            .await?;
        self.phase = HandshakePhase::AckOpen;
        Ok(())
    }

    async fn refuse(
        &mut self,
        core: &mut SessionCore,
        frame: &Frame,
        reason: GatewayError,
    ) -> Result<(), GatewayError> {
        core.send_message(
            CommandResponse { code: ResponseCode::NotAuthorized }.into(),
            frame.sender_seq,
        )
        .await?;
        self.abort(reason);
        Ok(())
    }

    /// The capabilities we mirror back in phase B.
    fn mirror(&self) -> OpenSession {
        let mut version = crate::GATEWAY_VERSION.as_bytes().to_vec();
        version.resize(8, 0);
        OpenSession {
            device_type: DeviceType::Integration,
            protocol_version: self.opener.protocol_version,
            tx_buffer_size: self.opener.rx_buffer_size,
            rx_buffer_size: self.opener.tx_buffer_size,
            encryption_type: self.opener.encryption_type,
            software_version: version,
        }
    }

    async fn try_continue(
        &mut self,
        core: &mut SessionCore,
        frame: &Frame,
    ) -> Result<bool, GatewayError> {
        match self.phase {
            HandshakePhase::AckOpen => {
                if frame.receiver_seq != self.common.local_seq || !frame.is_ack() {
                    return Ok(false);
                }
                // B: mirror the opener back; this allocates an app sequence
                self.common.local_seq = core.send_message(self.mirror().into(), frame.sender_seq).await?;
                self.phase = HandshakePhase::MirrorResponse;
                Ok(true)
            }
            HandshakePhase::MirrorResponse => {
                if frame.receiver_seq != self.common.local_seq {
                    return Ok(false);
                }
                match frame.message_ref() {
                    Some(Message::CommandResponse(m)) => {
                        if m.code != ResponseCode::Success {
                            debug!("panel answered mirrored opener with {:?}", m.code);
                        }
                        core.send_ack(frame.sender_seq).await?;
                        self.phase = HandshakePhase::AwaitRequestAccess;
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }
            HandshakePhase::AwaitRequestAccess => {
                let Some(Message::RequestAccess(req)) = frame.message_ref() else {
                    return Ok(false);
                };
                // C: the panel's initializer keys our outbound direction,
                // effective from the very next frame we send
                let scheme = self.scheme.as_ref().ok_or(GatewayError::NotSupported {
                    what: "handshake continued without a scheme".into(),
                })?;
                let key = match scheme.derive_outbound(&req.initializer) {
                    Ok(key) => key,
                    Err(e) => {
                        self.abort(e);
                        return Ok(true);
                    }
                };
                core.activate_outbound(key);
                self.common.remote_seq = frame.sender_seq;
                self.common.local_seq = core
                    .send_message(
                        CommandResponse { code: ResponseCode::Success }.into(),
                        frame.sender_seq,
                    )
                    .await?;
                self.phase = HandshakePhase::AckAccess;
                Ok(true)
            }
            HandshakePhase::AckAccess => {
                if frame.receiver_seq != self.common.local_seq || !frame.is_ack() {
                    return Ok(false);
                }
                // D: activate inbound *before* the panel learns the key;
                // its very next frame may already be encrypted
                let scheme = self.scheme.as_ref().ok_or(GatewayError::NotSupported {
                    what: "handshake continued without a scheme".into(),
                })?;
                let (key, initializer) = scheme.make_inbound();
                core.activate_inbound(key);
                self.common.local_seq = core
                    .send_message(RequestAccess { initializer }.into(), frame.sender_seq)
                    .await?;
                self.phase = HandshakePhase::AccessResponse;
                Ok(true)
            }
            HandshakePhase::AccessResponse => {
                if frame.receiver_seq != self.common.local_seq {
                    return Ok(false);
                }
                match frame.message_ref() {
                    Some(Message::CommandResponse(m)) => {
                        if m.code != ResponseCode::Success {
                            debug!("panel answered key exchange with {:?}", m.code);
                        }
                        core.send_ack(frame.sender_seq).await?;
                        core.mark_handshake_done();
                        info!("session {} keyed both ways", core.session_id());
                        self.common.complete(Outcome::Acked);
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }
        }
    }

    fn abort(&mut self, reason: GatewayError) {
        self.common.abort(reason);
        // no unkeyed fallback: a failed handshake ends the session
        self.session_token.cancel();
    }
}

// ─── Dispatch enum ───────────────────────────────────────────────────────────

/// A transaction in the session's active list.
pub(crate) enum ActiveTransaction {
    SimpleAck(SimpleAckTx),
    CommandResponse(CommandResponseTx),
    Handshake(HandshakeTx),
}

impl ActiveTransaction {
    pub(crate) fn id(&self) -> u64 {
        self.common().id
    }

    pub(crate) fn can_continue(&self) -> bool {
        self.common().open
    }

    fn common(&self) -> &TxCommon {
        match self {
            Self::SimpleAck(tx) => &tx.common,
            Self::CommandResponse(tx) => &tx.common,
            Self::Handshake(tx) => &tx.common,
        }
    }

    /// Offer a decoded frame; `true` means the frame was consumed.
    pub(crate) async fn try_continue(
        &mut self,
        core: &mut SessionCore,
        frame: &Frame,
    ) -> Result<bool, GatewayError> {
        if !self.can_continue() {
            return Ok(false);
        }
        match self {
            Self::SimpleAck(tx) => tx.try_continue(core, frame).await,
            Self::CommandResponse(tx) => tx.try_continue(core, frame).await,
            Self::Handshake(tx) => tx.try_continue(core, frame).await,
        }
    }

    /// Abort with a reason. Idempotent; aborting a handshake also ends
    /// the session.
    pub(crate) fn abort(&mut self, reason: GatewayError) {
        match self {
            Self::SimpleAck(tx) => tx.common.abort(reason),
            Self::CommandResponse(tx) => tx.common.abort(reason),
            Self::Handshake(tx) => tx.abort(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn abort_is_idempotent() {
        let (done_tx, mut done_rx) = oneshot::channel();
        let token = CancellationToken::new();
        let mut tx = SimpleAckTx::new(1, token.clone());
        tx.common.completion = Some(done_tx);

        tx.common.abort(GatewayError::Timeout);
        assert!(!tx.common.open);
        assert!(token.is_cancelled());
        assert!(matches!(done_rx.try_recv(), Ok(Err(GatewayError::Timeout))));

        // second abort is a no-op: nothing to resolve, no panic
        tx.common.abort(GatewayError::Cancelled);
        assert!(!tx.common.open);
    }

    #[tokio::test]
    async fn complete_after_abort_is_a_no_op() {
        let token = CancellationToken::new();
        let mut tx = SimpleAckTx::new(2, token);
        tx.common.abort(GatewayError::Timeout);
        tx.common.complete(Outcome::Acked);
        assert!(!tx.common.open);
    }
}
