//! Byte stuffing for the three reserved wire bytes.
//!
//! `0x7E` and `0x7F` bound a packet; `0x7D` escapes. Inside a stuffed body
//! none of the three ever appears raw:
//!
//! | Raw    | Stuffed      |
//! |--------|--------------|
//! | `0x7D` | `0x7D 0x00`  |
//! | `0x7E` | `0x7D 0x01`  |
//! | `0x7F` | `0x7D 0x02`  |

use crate::framing::FramingError;

/// Escape byte.
pub const ESCAPE: u8 = 0x7D;
/// Packet-body delimiter (separates the optional header from the body).
pub const HEAD: u8 = 0x7E;
/// Packet terminator.
pub const TAIL: u8 = 0x7F;

/// Escape every reserved byte in `data`.
pub fn stuff(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 8);
    for &b in data {
        match b {
            ESCAPE => out.extend([ESCAPE, 0x00]),
            HEAD => out.extend([ESCAPE, 0x01]),
            TAIL => out.extend([ESCAPE, 0x02]),
            other => out.push(other),
        }
    }
    out
}

/// Undo [`stuff`].
///
/// Fails when an escape is followed by anything but `0x00`–`0x02`, when the
/// data ends mid-escape, or when a reserved byte leaks through raw.
pub fn unstuff(data: &[u8]) -> Result<Vec<u8>, FramingError> {
    let mut out = Vec::with_capacity(data.len());
    let mut iter = data.iter().copied();
    while let Some(b) = iter.next() {
        match b {
            ESCAPE => match iter.next() {
                Some(0x00) => out.push(ESCAPE),
                Some(0x01) => out.push(HEAD),
                Some(0x02) => out.push(TAIL),
                Some(other) => return Err(FramingError::InvalidEscape { byte: other }),
                None => return Err(FramingError::DanglingEscape),
            },
            HEAD | TAIL => return Err(FramingError::ReservedByte { byte: b }),
            other => out.push(other),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuff_escapes_all_three_reserved_bytes() {
        let raw = [0x01, 0x7E, 0x7D, 0x7F, 0x02];
        let stuffed = stuff(&raw);
        assert_eq!(stuffed, [0x01, 0x7D, 0x01, 0x7D, 0x00, 0x7D, 0x02, 0x02]);
        assert_eq!(unstuff(&stuffed).unwrap(), raw);
    }

    #[test]
    fn stuffed_output_never_contains_delimiters() {
        let all: Vec<u8> = (0u8..=255).collect();
        let stuffed = stuff(&all);
        assert!(!stuffed.contains(&HEAD));
        assert!(!stuffed.contains(&TAIL));
        assert_eq!(unstuff(&stuffed).unwrap(), all);
    }

    #[test]
    fn unknown_escape_byte_is_an_error() {
        assert!(matches!(
            unstuff(&[0x7D, 0x33]),
            Err(FramingError::InvalidEscape { byte: 0x33 })
        ));
    }

    #[test]
    fn truncated_escape_is_an_error() {
        assert!(matches!(unstuff(&[0x01, 0x7D]), Err(FramingError::DanglingEscape)));
    }

    #[test]
    fn raw_reserved_byte_is_an_error() {
        assert!(matches!(
            unstuff(&[0x01, 0x7F]),
            Err(FramingError::ReservedByte { byte: 0x7F })
        ));
    }
}
