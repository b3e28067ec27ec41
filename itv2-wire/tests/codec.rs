use itv2_wire::{
    CompactInt, Cursor, Error, PrefixWidth, Serializable, serialize_fixed, serialize_prefixed,
};

// ── Primitive round-trips ─────────────────────────────────────────────────────

#[test]
fn u16_is_big_endian() {
    assert_eq!(0x0102u16.to_bytes(), [0x01, 0x02]);
    assert_eq!(0xBEEFu16.to_bytes(), [0xBE, 0xEF]);
}

#[test]
fn u32_is_big_endian() {
    assert_eq!(0x01020304u32.to_bytes(), [0x01, 0x02, 0x03, 0x04]);
}

#[test]
fn roundtrip_integers() {
    let mut buf = Vec::new();
    0xABu8.serialize(&mut buf);
    0x0102u16.serialize(&mut buf);
    0xDEADBEEFu32.serialize(&mut buf);
    (-5i8).serialize(&mut buf);
    (-300i16).serialize(&mut buf);

    let mut cur = Cursor::from_slice(&buf);
    assert_eq!(cur.read_u8("a").unwrap(), 0xAB);
    assert_eq!(cur.read_u16("b").unwrap(), 0x0102);
    assert_eq!(cur.read_u32("c").unwrap(), 0xDEADBEEF);
    assert_eq!(cur.read_i8("d").unwrap(), -5);
    assert_eq!(cur.read_i16("e").unwrap(), -300);
    assert_eq!(cur.remaining(), 0);
}

#[test]
fn compact_int_is_one_byte() {
    assert_eq!(CompactInt(7).to_bytes(), [0x07]);
    let mut cur = Cursor::from_slice(&[0x2A]);
    assert_eq!(cur.read_compact("zone").unwrap(), CompactInt(42));
}

// ── Fixed-length arrays ───────────────────────────────────────────────────────

#[test]
fn fixed_pads_short_values() {
    // 3 payload bytes into a fixed(8) field: five 0x00 follow
    let mut buf = Vec::new();
    serialize_fixed(&[0x01, 0x02, 0x03], 8, &mut buf);
    assert_eq!(buf, [0x01, 0x02, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00]);

    let mut cur = Cursor::from_slice(&buf);
    assert_eq!(cur.read_fixed(8, "data").unwrap().len(), 8);
}

#[test]
fn fixed_truncates_long_values() {
    let mut buf = Vec::new();
    serialize_fixed(&[1, 2, 3, 4, 5], 2, &mut buf);
    assert_eq!(buf, [1, 2]);
}

// ── Length-prefixed arrays ────────────────────────────────────────────────────

#[test]
fn prefixed_one_byte_roundtrip() {
    let mut buf = Vec::new();
    serialize_prefixed("init", &[0xAA, 0xBB], PrefixWidth::One, &mut buf).unwrap();
    assert_eq!(buf, [0x02, 0xAA, 0xBB]);

    let mut cur = Cursor::from_slice(&buf);
    assert_eq!(cur.read_prefixed(PrefixWidth::One, "init").unwrap(), vec![0xAA, 0xBB]);
}

#[test]
fn prefixed_two_byte_roundtrip() {
    let value = vec![0x55u8; 300];
    let mut buf = Vec::new();
    serialize_prefixed("blob", &value, PrefixWidth::Two, &mut buf).unwrap();
    assert_eq!(&buf[..2], &(300u16).to_be_bytes());

    let mut cur = Cursor::from_slice(&buf);
    assert_eq!(cur.read_prefixed(PrefixWidth::Two, "blob").unwrap(), value);
}

#[test]
fn prefixed_overflow_is_an_error() {
    // 300 bytes cannot be described by a 1-byte prefix
    let value = vec![0u8; 300];
    let mut buf = Vec::new();
    let err = serialize_prefixed("data", &value, PrefixWidth::One, &mut buf).unwrap_err();
    assert_eq!(err, Error::LengthOverflow { field: "data", len: 300, max: 255 });
}

// ── Short buffers name the field ──────────────────────────────────────────────

#[test]
fn short_buffer_reports_field_and_offset() {
    let mut cur = Cursor::from_slice(&[0x01, 0x02]);
    cur.read_u8("first").unwrap();
    let err = cur.read_u32("second").unwrap_err();
    assert_eq!(err, Error::ShortBuffer { field: "second", offset: 1, needed: 3 });
}

#[test]
fn prefixed_with_truncated_body_fails() {
    // prefix says 4 bytes, only 2 present
    let mut cur = Cursor::from_slice(&[0x04, 0xAA, 0xBB]);
    assert!(matches!(
        cur.read_prefixed(PrefixWidth::One, "init"),
        Err(Error::ShortBuffer { field: "init", .. })
    ));
}
