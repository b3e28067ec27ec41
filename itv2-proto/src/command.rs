//! The closed set of known command codes.

use std::fmt;

/// A known ITv2 command, 16 bits big-endian on the wire.
///
/// The acknowledgement frame carries no command word at all and therefore
/// has no variant here; it is recognised by absence at the frame layer.
/// Codes outside this set decode as [`crate::Message::Unknown`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u16)]
pub enum Command {
    /// Negative acknowledgement of a data message.
    CommandError = 0x0001,
    /// Response to a command request, carrying a response code.
    CommandResponse = 0x0002,
    /// Keep-alive probe; expects a bare acknowledgement.
    ConnectionPoll = 0x0500,
    /// Ask the panel for its firmware version.
    SoftwareVersionRequest = 0x0501,
    /// Handshake opener carrying capabilities and the encryption scheme.
    OpenSession = 0x060A,
    /// Handshake key-exchange step carrying an initializer blob.
    RequestAccess = 0x060C,
    /// Partition state change notification.
    PartitionStatus = 0x0814,
    /// Zone state change notification.
    ZoneStatus = 0x0841,
}

impl Command {
    /// The wire code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a known command by wire code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0001 => Some(Self::CommandError),
            0x0002 => Some(Self::CommandResponse),
            0x0500 => Some(Self::ConnectionPoll),
            0x0501 => Some(Self::SoftwareVersionRequest),
            0x060A => Some(Self::OpenSession),
            0x060C => Some(Self::RequestAccess),
            0x0814 => Some(Self::PartitionStatus),
            0x0841 => Some(Self::ZoneStatus),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}({:#06x})", self.code())
    }
}
