//! Typed messages and their payload codecs.
//!
//! One struct per known command, plus the open-world [`Message::Unknown`]
//! variant for codes the registry has never heard of. Field order in each
//! `encode`/`decode` pair is the wire order; all integers are big-endian.

use itv2_wire::{CompactInt, Cursor, PrefixWidth, Serializable, serialize_fixed, serialize_prefixed};

use crate::command::Command;

type Result<T> = itv2_wire::Result<T>;

// ─── Field enums ─────────────────────────────────────────────────────────────

/// What kind of device opened the session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceType {
    /// An alarm panel.
    Panel,
    /// An integration endpoint (this gateway mirrors the opener with this).
    Integration,
    /// Anything the registry doesn't recognise.
    Other(u8),
}

impl DeviceType {
    /// Backing wire byte.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Panel => 0x01,
            Self::Integration => 0x02,
            Self::Other(v) => v,
        }
    }

    /// From the wire byte.
    pub fn from_u8(v: u8) -> Self {
        match v {
            0x01 => Self::Panel,
            0x02 => Self::Integration,
            other => Self::Other(other),
        }
    }
}

/// Keying scheme requested in the session opener.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EncryptionType {
    /// Cleartext session.
    None,
    /// Access-code + identification-number keying.
    Type1,
    /// 32-hex-digit access-code keying.
    Type2,
    /// A scheme this gateway does not implement.
    Other(u8),
}

impl EncryptionType {
    /// Backing wire byte.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Type1 => 0x01,
            Self::Type2 => 0x02,
            Self::Other(v) => v,
        }
    }

    /// From the wire byte.
    pub fn from_u8(v: u8) -> Self {
        match v {
            0x00 => Self::None,
            0x01 => Self::Type1,
            0x02 => Self::Type2,
            other => Self::Other(other),
        }
    }
}

/// Outcome code carried by a [`CommandResponse`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseCode {
    /// The request was accepted.
    Success,
    /// The command code was not understood.
    InvalidCommand,
    /// The request arrived out of sequence.
    SequenceError,
    /// The integration is not authorised for the request.
    NotAuthorized,
    /// Any other outcome; preserved verbatim.
    Other(u8),
}

impl ResponseCode {
    /// Backing wire byte.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::InvalidCommand => 0x01,
            Self::SequenceError => 0x02,
            Self::NotAuthorized => 0x21,
            Self::Other(v) => v,
        }
    }

    /// From the wire byte.
    pub fn from_u8(v: u8) -> Self {
        match v {
            0x00 => Self::Success,
            0x01 => Self::InvalidCommand,
            0x02 => Self::SequenceError,
            0x21 => Self::NotAuthorized,
            other => Self::Other(other),
        }
    }
}

// ─── Message structs ─────────────────────────────────────────────────────────

/// Positive response to a command request.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandResponse {
    /// Outcome reported by the responder.
    pub code: ResponseCode,
}

/// Negative acknowledgement of a data message.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandError {
    /// Raw error code; panels are not consistent enough to enumerate.
    pub code: u8,
}

/// Keep-alive probe. Zero payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionPoll;

/// Firmware version probe. Zero payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SoftwareVersionRequest;

/// Handshake opener: capabilities plus the requested keying scheme.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenSession {
    /// Kind of device speaking.
    pub device_type: DeviceType,
    /// Protocol revision the device implements.
    pub protocol_version: u16,
    /// Largest frame the device will send.
    pub tx_buffer_size: u16,
    /// Largest frame the device will accept.
    pub rx_buffer_size: u16,
    /// Keying scheme for the rest of the session.
    pub encryption_type: EncryptionType,
    /// Firmware identification, fixed 8 bytes.
    pub software_version: Vec<u8>,
}

/// Handshake key-exchange step.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestAccess {
    /// Scheme-dependent initializer blob (48 bytes Type 1, 16 bytes Type 2).
    pub initializer: Vec<u8>,
}

/// Partition state change pushed by the panel.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionStatus {
    /// Partition number.
    pub partition: CompactInt,
    /// Raw status byte; meaning belongs to the layer above.
    pub status: u8,
}

/// Zone state change pushed by the panel.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneStatus {
    /// Zone number.
    pub zone: CompactInt,
    /// Raw status byte; meaning belongs to the layer above.
    pub status: u8,
}

// ─── Message enum ────────────────────────────────────────────────────────────

/// Any inbound or outbound typed message.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// See [`CommandResponse`].
    CommandResponse(CommandResponse),
    /// See [`CommandError`].
    CommandError(CommandError),
    /// See [`ConnectionPoll`].
    ConnectionPoll(ConnectionPoll),
    /// See [`SoftwareVersionRequest`].
    SoftwareVersionRequest(SoftwareVersionRequest),
    /// See [`OpenSession`].
    OpenSession(OpenSession),
    /// See [`RequestAccess`].
    RequestAccess(RequestAccess),
    /// See [`PartitionStatus`].
    PartitionStatus(PartitionStatus),
    /// See [`ZoneStatus`].
    ZoneStatus(ZoneStatus),
    /// A command code outside the registry; payload preserved verbatim.
    Unknown {
        /// The unrecognised wire code.
        command: u16,
        /// Raw payload bytes.
        payload: Vec<u8>,
    },
}

impl Message {
    /// The wire command code, or `None` only for unknown codes the registry
    /// can't name (the raw code is still carried in the variant).
    pub fn command(&self) -> Option<Command> {
        match self {
            Self::CommandResponse(_) => Some(Command::CommandResponse),
            Self::CommandError(_) => Some(Command::CommandError),
            Self::ConnectionPoll(_) => Some(Command::ConnectionPoll),
            Self::SoftwareVersionRequest(_) => Some(Command::SoftwareVersionRequest),
            Self::OpenSession(_) => Some(Command::OpenSession),
            Self::RequestAccess(_) => Some(Command::RequestAccess),
            Self::PartitionStatus(_) => Some(Command::PartitionStatus),
            Self::ZoneStatus(_) => Some(Command::ZoneStatus),
            Self::Unknown { .. } => None,
        }
    }

    /// The raw wire code, known or not.
    pub fn command_code(&self) -> u16 {
        match self {
            Self::Unknown { command, .. } => *command,
            Self::CommandResponse(_) => Command::CommandResponse.code(),
            Self::CommandError(_) => Command::CommandError.code(),
            Self::ConnectionPoll(_) => Command::ConnectionPoll.code(),
            Self::SoftwareVersionRequest(_) => Command::SoftwareVersionRequest.code(),
            Self::OpenSession(_) => Command::OpenSession.code(),
            Self::RequestAccess(_) => Command::RequestAccess.code(),
            Self::PartitionStatus(_) => Command::PartitionStatus.code(),
            Self::ZoneStatus(_) => Command::ZoneStatus.code(),
        }
    }

    /// Serialize the payload (fields after command word and app sequence).
    pub fn encode_payload(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::CommandResponse(m) => {
                m.code.as_u8().serialize(buf);
                Ok(())
            }
            Self::CommandError(m) => {
                m.code.serialize(buf);
                Ok(())
            }
            Self::ConnectionPoll(_) | Self::SoftwareVersionRequest(_) => Ok(()),
            Self::OpenSession(m) => {
                m.device_type.as_u8().serialize(buf);
                m.protocol_version.serialize(buf);
                m.tx_buffer_size.serialize(buf);
                m.rx_buffer_size.serialize(buf);
                m.encryption_type.as_u8().serialize(buf);
                serialize_fixed(&m.software_version, 8, buf);
                Ok(())
            }
            Self::RequestAccess(m) => {
                serialize_prefixed("initializer", &m.initializer, PrefixWidth::One, buf)
            }
            Self::PartitionStatus(m) => {
                m.partition.serialize(buf);
                m.status.serialize(buf);
                Ok(())
            }
            Self::ZoneStatus(m) => {
                m.zone.serialize(buf);
                m.status.serialize(buf);
                Ok(())
            }
            Self::Unknown { payload, .. } => {
                buf.extend_from_slice(payload);
                Ok(())
            }
        }
    }

    /// Decode a payload for `code`. Unknown codes always succeed as
    /// [`Message::Unknown`].
    pub fn decode(code: u16, payload: &[u8]) -> Result<Self> {
        let mut cur = Cursor::from_slice(payload);
        let Some(command) = Command::from_code(code) else {
            return Ok(Self::Unknown { command: code, payload: cur.read_to_end() });
        };
        let message = match command {
            Command::CommandResponse => Self::CommandResponse(CommandResponse {
                code: ResponseCode::from_u8(cur.read_u8("code")?),
            }),
            Command::CommandError => Self::CommandError(CommandError {
                code: cur.read_u8("code")?,
            }),
            Command::ConnectionPoll => Self::ConnectionPoll(ConnectionPoll),
            Command::SoftwareVersionRequest => Self::SoftwareVersionRequest(SoftwareVersionRequest),
            Command::OpenSession => Self::OpenSession(OpenSession {
                device_type: DeviceType::from_u8(cur.read_u8("device_type")?),
                protocol_version: cur.read_u16("protocol_version")?,
                tx_buffer_size: cur.read_u16("tx_buffer_size")?,
                rx_buffer_size: cur.read_u16("rx_buffer_size")?,
                encryption_type: EncryptionType::from_u8(cur.read_u8("encryption_type")?),
                software_version: cur.read_fixed(8, "software_version")?,
            }),
            Command::RequestAccess => Self::RequestAccess(RequestAccess {
                initializer: cur.read_prefixed(PrefixWidth::One, "initializer")?,
            }),
            Command::PartitionStatus => Self::PartitionStatus(PartitionStatus {
                partition: cur.read_compact("partition")?,
                status: cur.read_u8("status")?,
            }),
            Command::ZoneStatus => Self::ZoneStatus(ZoneStatus {
                zone: cur.read_compact("zone")?,
                status: cur.read_u8("status")?,
            }),
        };
        Ok(message)
    }
}

impl From<CommandResponse> for Message {
    fn from(m: CommandResponse) -> Self { Self::CommandResponse(m) }
}
impl From<CommandError> for Message {
    fn from(m: CommandError) -> Self { Self::CommandError(m) }
}
impl From<ConnectionPoll> for Message {
    fn from(m: ConnectionPoll) -> Self { Self::ConnectionPoll(m) }
}
impl From<SoftwareVersionRequest> for Message {
    fn from(m: SoftwareVersionRequest) -> Self { Self::SoftwareVersionRequest(m) }
}
impl From<OpenSession> for Message {
    fn from(m: OpenSession) -> Self { Self::OpenSession(m) }
}
impl From<RequestAccess> for Message {
    fn from(m: RequestAccess) -> Self { Self::RequestAccess(m) }
}
impl From<PartitionStatus> for Message {
    fn from(m: PartitionStatus) -> Self { Self::PartitionStatus(m) }
}
impl From<ZoneStatus> for Message {
    fn from(m: ZoneStatus) -> Self { Self::ZoneStatus(m) }
}
