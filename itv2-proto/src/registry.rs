//! The command registry: one row per known message type.
//!
//! The table is a compile-time constant; lookups are read-only and
//! lock-free. Each row answers the three questions the session layer
//! asks about a command: which transaction pattern governs it when it
//! arrives unsolicited, whether its frames carry an application sequence
//! byte, and what it is called in logs.

use crate::command::Command;

/// Which transaction state machine a message type is governed by.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionKind {
    /// Data message acknowledged with a bare ack.
    SimpleAck,
    /// Command request answered with a coded response, then acked.
    CommandResponse,
    /// The four-phase session-opening exchange.
    Handshake,
}

/// One registry row.
#[derive(Clone, Copy, Debug)]
pub struct Registration {
    /// The command this row describes.
    pub command: Command,
    /// Pattern instantiated when this command starts a new inbound
    /// transaction.
    pub kind: TransactionKind,
    /// Whether frames carrying this command include the application
    /// sequence byte between command word and payload.
    pub app_sequenced: bool,
}

/// Every known command, in ascending code order.
pub const ALL: &[Registration] = &[
    Registration { command: Command::CommandError, kind: TransactionKind::SimpleAck, app_sequenced: false },
    Registration { command: Command::CommandResponse, kind: TransactionKind::SimpleAck, app_sequenced: false },
    Registration { command: Command::ConnectionPoll, kind: TransactionKind::SimpleAck, app_sequenced: false },
    Registration { command: Command::SoftwareVersionRequest, kind: TransactionKind::CommandResponse, app_sequenced: false },
    Registration { command: Command::OpenSession, kind: TransactionKind::Handshake, app_sequenced: true },
    Registration { command: Command::RequestAccess, kind: TransactionKind::CommandResponse, app_sequenced: false },
    Registration { command: Command::PartitionStatus, kind: TransactionKind::SimpleAck, app_sequenced: true },
    Registration { command: Command::ZoneStatus, kind: TransactionKind::SimpleAck, app_sequenced: true },
];

/// Look up the registration for a wire code.
///
/// `None` for unknown codes; the session treats those as un-sequenced
/// [`TransactionKind::SimpleAck`] traffic.
pub fn lookup(code: u16) -> Option<&'static Registration> {
    let command = Command::from_code(code)?;
    ALL.iter().find(|r| r.command == command)
}

/// Whether frames with this code carry the application sequence byte.
pub fn is_app_sequenced(code: u16) -> bool {
    lookup(code).is_some_and(|r| r.app_sequenced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_command_has_exactly_one_row() {
        for reg in ALL {
            let dup = ALL.iter().filter(|r| r.command == reg.command).count();
            assert_eq!(dup, 1, "{} registered {dup} times", reg.command);
        }
    }

    #[test]
    fn lookup_agrees_with_the_table() {
        for reg in ALL {
            let found = lookup(reg.command.code()).unwrap();
            assert_eq!(found.command, reg.command);
            assert_eq!(found.app_sequenced, reg.app_sequenced);
        }
        assert!(lookup(0x7777).is_none());
    }

    #[test]
    fn handshake_traffic_is_flagged_correctly() {
        assert_eq!(lookup(Command::OpenSession.code()).unwrap().kind, TransactionKind::Handshake);
        assert!(is_app_sequenced(Command::OpenSession.code()));
        assert!(!is_app_sequenced(Command::RequestAccess.code()));
        assert!(!is_app_sequenced(0x7777));
    }
}
