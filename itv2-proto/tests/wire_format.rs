use itv2_proto::frame::{Frame, FrameBody};
use itv2_proto::framing;
use itv2_proto::messages::{
    CommandError, CommandResponse, ConnectionPoll, DeviceType, EncryptionType, Message,
    OpenSession, PartitionStatus, RequestAccess, ResponseCode, SoftwareVersionRequest, ZoneStatus,
};
use itv2_proto::registry;
use itv2_proto::stuffing;
use itv2_wire::CompactInt;

fn sample(command: itv2_proto::Command) -> Message {
    use itv2_proto::Command;
    match command {
        Command::CommandError => Message::CommandError(CommandError { code: 0x04 }),
        Command::CommandResponse => Message::CommandResponse(CommandResponse {
            code: ResponseCode::NotAuthorized,
        }),
        Command::ConnectionPoll => Message::ConnectionPoll(ConnectionPoll),
        Command::SoftwareVersionRequest => {
            Message::SoftwareVersionRequest(SoftwareVersionRequest)
        }
        Command::OpenSession => Message::OpenSession(OpenSession {
            device_type: DeviceType::Integration,
            protocol_version: 0x0200,
            tx_buffer_size: 1024,
            rx_buffer_size: 1024,
            encryption_type: EncryptionType::Type1,
            software_version: b"IT-2.10\0".to_vec(),
        }),
        Command::RequestAccess => Message::RequestAccess(RequestAccess {
            initializer: (0u8..48).collect(),
        }),
        Command::PartitionStatus => Message::PartitionStatus(PartitionStatus {
            partition: CompactInt(2),
            status: 0x01,
        }),
        Command::ZoneStatus => Message::ZoneStatus(ZoneStatus { zone: CompactInt(14), status: 0x02 }),
    }
}

// ── Codec round-trip over every registered type ───────────────────────────────

#[test]
fn every_registered_message_roundtrips() {
    for reg in registry::ALL {
        let message = sample(reg.command);
        let mut payload = Vec::new();
        message.encode_payload(&mut payload).unwrap();
        let back = Message::decode(reg.command.code(), &payload).unwrap();
        assert_eq!(back, message, "{} did not round-trip", reg.command);
    }
}

#[test]
fn every_registered_message_roundtrips_through_a_frame() {
    for (i, reg) in registry::ALL.iter().enumerate() {
        let app_seq = reg.app_sequenced.then_some(i as u8);
        let frame = Frame::message(i as u8, i as u8 ^ 0xFF, app_seq, sample(reg.command));
        let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(decoded, frame, "{} frame round-trip", reg.command);
    }
}

// ── Seed scenarios ────────────────────────────────────────────────────────────

#[test]
fn s1_raw_stuff_vector() {
    let raw = [0x01, 0x7E, 0x7D, 0x7F, 0x02];
    let stuffed = stuffing::stuff(&raw);
    assert_eq!(stuffed, [0x01, 0x7D, 0x01, 0x7D, 0x00, 0x7D, 0x02, 0x02]);
    assert_eq!(stuffing::unstuff(&stuffed).unwrap(), raw);
}

#[test]
fn s2_connection_poll_packet_pre_handshake() {
    let frame = Frame::message(0x01, 0x00, None, ConnectionPoll.into());
    let inner = frame.encode().unwrap();

    // [len=0x06, 0x01, 0x00, cmdHi, cmdLo, crcHi, crcLo]
    assert_eq!(inner[0], 0x06);
    assert_eq!(&inner[1..3], &[0x01, 0x00]);
    assert_eq!(&inner[3..5], &0x0500u16.to_be_bytes());
    let crc = framing::crc16(&inner[1..5]);
    assert_eq!(&inner[5..7], &crc.to_be_bytes());

    // outer packet: 0x7E <stuffed inner> 0x7F
    let packet = framing::wrap_packet(&inner);
    assert_eq!(packet[0], 0x7E);
    assert_eq!(*packet.last().unwrap(), 0x7F);
    assert_eq!(framing::unwrap_packet(&packet).unwrap(), inner);
}

#[test]
fn s3_ack_inner_frame_is_five_bytes() {
    let inner = Frame::ack(0x03, 0x02).encode().unwrap();
    assert_eq!(inner.len(), 5);
    assert_eq!(inner[0], 0x04);
}

#[test]
fn s4_fixed_array_pads_and_returns_full_width() {
    let open = OpenSession {
        device_type: DeviceType::Panel,
        protocol_version: 1,
        tx_buffer_size: 256,
        rx_buffer_size: 256,
        encryption_type: EncryptionType::None,
        software_version: vec![0xAA, 0xBB, 0xCC],
    };
    let mut payload = Vec::new();
    Message::from(open).encode_payload(&mut payload).unwrap();
    let tail = &payload[payload.len() - 8..];
    assert_eq!(tail, &[0xAA, 0xBB, 0xCC, 0, 0, 0, 0, 0]);

    match Message::decode(0x060A, &payload).unwrap() {
        Message::OpenSession(m) => assert_eq!(m.software_version.len(), 8),
        other => panic!("decoded {other:?}"),
    }
}

#[test]
fn s5_one_byte_prefix_overflow_fails() {
    let message = Message::RequestAccess(RequestAccess { initializer: vec![0u8; 300] });
    let mut payload = Vec::new();
    let err = message.encode_payload(&mut payload).unwrap_err();
    assert!(matches!(err, itv2_wire::Error::LengthOverflow { max: 255, .. }));
}

// ── Open-world receive ────────────────────────────────────────────────────────

#[test]
fn unknown_command_never_fails_to_decode() {
    let decoded = Message::decode(0x4242, &[1, 2, 3]).unwrap();
    assert_eq!(decoded, Message::Unknown { command: 0x4242, payload: vec![1, 2, 3] });
    // zero-payload unknown too
    let empty = Message::decode(0x4242, &[]).unwrap();
    assert_eq!(empty, Message::Unknown { command: 0x4242, payload: vec![] });
}

#[test]
fn ack_is_recognised_by_absence_of_command() {
    let inner = Frame::ack(1, 1).encode().unwrap();
    let decoded = Frame::decode(&inner).unwrap();
    assert!(matches!(decoded.body, FrameBody::Ack));
}
