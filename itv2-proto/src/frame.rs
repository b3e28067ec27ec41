//! The inner frame: sequences, optional command word, optional app
//! sequence, typed payload.

use itv2_wire::Cursor;

use std::fmt;

use crate::framing::{self, FramingError};
use crate::messages::Message;
use crate::registry;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors surfaced while encoding or decoding a whole frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameError {
    /// The envelope itself was malformed.
    Framing(FramingError),
    /// A message field failed to encode or decode.
    Field(itv2_wire::Error),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Framing(e) => write!(f, "{e}"),
            Self::Field(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<FramingError> for FrameError {
    fn from(e: FramingError) -> Self { Self::Framing(e) }
}

impl From<itv2_wire::Error> for FrameError {
    fn from(e: itv2_wire::Error) -> Self { Self::Field(e) }
}

// ─── Frame ───────────────────────────────────────────────────────────────────

/// What a frame carries after its two sequence bytes.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameBody {
    /// The bare acknowledgement: no command word, no payload.
    Ack,
    /// A typed message, with its app sequence when the command is flagged.
    Message {
        /// Application sequence byte, present iff the registry demands it.
        app_seq: Option<u8>,
        /// The typed payload.
        message: Message,
    },
}

/// One inner frame, decrypted and de-enveloped.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// The sender's transport sequence number.
    pub sender_seq: u8,
    /// The sequence number of the frame this one answers.
    pub receiver_seq: u8,
    /// Acknowledgement or typed message.
    pub body: FrameBody,
}

impl Frame {
    /// Build an acknowledgement frame.
    pub fn ack(sender_seq: u8, receiver_seq: u8) -> Self {
        Self { sender_seq, receiver_seq, body: FrameBody::Ack }
    }

    /// Build a message frame. `app_seq` must be `Some` exactly when the
    /// message's command is app-sequenced; the encoder trusts the caller
    /// (the session allocates the value).
    pub fn message(sender_seq: u8, receiver_seq: u8, app_seq: Option<u8>, message: Message) -> Self {
        Self { sender_seq, receiver_seq, body: FrameBody::Message { app_seq, message } }
    }

    /// The typed message, if this is not an ack.
    pub fn message_ref(&self) -> Option<&Message> {
        match &self.body {
            FrameBody::Ack => None,
            FrameBody::Message { message, .. } => Some(message),
        }
    }

    /// The app sequence byte, if present.
    pub fn app_seq(&self) -> Option<u8> {
        match &self.body {
            FrameBody::Ack => None,
            FrameBody::Message { app_seq, .. } => *app_seq,
        }
    }

    /// Whether this frame is the bare acknowledgement.
    pub fn is_ack(&self) -> bool {
        matches!(self.body, FrameBody::Ack)
    }

    /// Encode into a sealed inner frame (`length ‖ body ‖ crc`), ready for
    /// encryption and packet wrapping.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let mut body = Vec::with_capacity(16);
        body.push(self.sender_seq);
        body.push(self.receiver_seq);
        if let FrameBody::Message { app_seq, message } = &self.body {
            body.extend(message.command_code().to_be_bytes());
            if let Some(seq) = app_seq {
                body.push(*seq);
            }
            message.encode_payload(&mut body)?;
        }
        Ok(framing::seal_frame(&body))
    }

    /// Decode a sealed inner frame (post-decrypt).
    pub fn decode(inner: &[u8]) -> Result<Self, FrameError> {
        let body = framing::open_frame(inner)?;
        let mut cur = Cursor::from_slice(body);
        let sender_seq = cur.read_u8("sender_seq")?;
        let receiver_seq = cur.read_u8("receiver_seq")?;

        if cur.remaining() == 0 {
            // no command word: the bare acknowledgement
            return Ok(Self::ack(sender_seq, receiver_seq));
        }

        let code = cur.read_u16("command")?;
        let app_seq = if registry::is_app_sequenced(code) {
            Some(cur.read_u8("app_seq")?)
        } else {
            None
        };
        let payload = cur.read_to_end();
        let message = Message::decode(code, &payload)?;
        Ok(Self::message(sender_seq, receiver_seq, app_seq, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ConnectionPoll, OpenSession, DeviceType, EncryptionType};

    #[test]
    fn poll_frame_layout() {
        // len=0x06, seqs, command word, crc — no payload
        let frame = Frame::message(0x01, 0x00, None, ConnectionPoll.into());
        let inner = frame.encode().unwrap();
        assert_eq!(inner.len(), 7);
        assert_eq!(inner[0], 0x06);
        assert_eq!(&inner[1..5], &[0x01, 0x00, 0x05, 0x00]);
        assert_eq!(Frame::decode(&inner).unwrap(), frame);
    }

    #[test]
    fn ack_frame_has_no_command_word() {
        let frame = Frame::ack(0x10, 0x0F);
        let inner = frame.encode().unwrap();
        // [0x04, sender, receiver, crcHi, crcLo]
        assert_eq!(inner.len(), 5);
        assert_eq!(inner[0], 0x04);
        assert_eq!(&inner[1..3], &[0x10, 0x0F]);

        let decoded = Frame::decode(&inner).unwrap();
        assert!(decoded.is_ack());
        assert_eq!(decoded, frame);
    }

    #[test]
    fn app_sequenced_commands_roundtrip_their_byte() {
        let open = OpenSession {
            device_type: DeviceType::Panel,
            protocol_version: 0x0201,
            tx_buffer_size: 512,
            rx_buffer_size: 512,
            encryption_type: EncryptionType::Type2,
            software_version: b"5.22".to_vec(),
        };
        let frame = Frame::message(0x02, 0x01, Some(0x7F_u8), open.into());
        let inner = frame.encode().unwrap();
        let decoded = Frame::decode(&inner).unwrap();
        assert_eq!(decoded.app_seq(), Some(0x7F));
        // fixed(8) pads the short version string
        match decoded.message_ref().unwrap() {
            Message::OpenSession(m) => {
                assert_eq!(m.software_version, b"5.22\0\0\0\0");
            }
            other => panic!("decoded {other:?}"),
        }
    }

    #[test]
    fn unknown_commands_decode_as_unknown() {
        let frame = Frame::message(
            0x05,
            0x04,
            None,
            Message::Unknown { command: 0x7777, payload: vec![0xAA, 0xBB] },
        );
        let inner = frame.encode().unwrap();
        let decoded = Frame::decode(&inner).unwrap();
        assert_eq!(decoded, frame);
    }
}
