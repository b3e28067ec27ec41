//! Key negotiation for the two ITv2 keying schemes.
//!
//! Both schemes yield one AES-128 key per direction. The server derives
//! its **outbound** key from the initializer the panel sends, and invents
//! the **inbound** key itself, handing the panel enough material to derive
//! the same key on its side.
//!
//! # Scheme summary
//!
//! | Scheme | Secrets | Panel → server | Server → panel |
//! |--------|---------|----------------|----------------|
//! | Type 1 | 8-digit IAC + 8-digit IIN | 48 bytes: `check ‖ E_IIN(interleaved)` | 48 bytes: `check ‖ E_IAC(interleaved)` |
//! | Type 2 | 32-hex-digit IAC | 16 plaintext bytes | 16 plaintext bytes |

use aes::Aes128;

use crate::ecb;
use crate::{CipherError, KeyError, NegotiationError};

// ─── Key material from configured codes ──────────────────────────────────────

/// Expand an 8-digit decimal code into a 16-byte AES key.
///
/// The 8 digits are repeated four times to form 32 hex characters, which
/// parse directly as 16 raw bytes (decimal digits are valid hex).
fn key_from_digits(code: &str) -> Result<[u8; 16], KeyError> {
    let digits: Vec<u8> = code.bytes().take(8).collect();
    if digits.len() < 8 {
        return Err(KeyError::BadLength { got: code.len(), expected: 8 });
    }
    if let Some(offset) = digits.iter().position(|b| !b.is_ascii_digit()) {
        return Err(KeyError::BadCharacter { offset });
    }

    let mut key = [0u8; 16];
    for (i, slot) in key.iter_mut().enumerate() {
        // repeating the 8 digits: hex pair (digits[2i mod 8], digits[2i+1 mod 8])
        let hi = digits[(2 * i) % 8] - b'0';
        let lo = digits[(2 * i + 1) % 8] - b'0';
        *slot = (hi << 4) | lo;
    }
    Ok(key)
}

/// Parse a 32-hex-character code into a 16-byte AES key.
fn key_from_hex(code: &str) -> Result<[u8; 16], KeyError> {
    if code.len() != 32 {
        return Err(KeyError::BadLength { got: code.len(), expected: 32 });
    }
    let hex_val = |b: u8, offset: usize| -> Result<u8, KeyError> {
        match b {
            b'0'..=b'9' => Ok(b - b'0'),
            b'a'..=b'f' => Ok(b - b'a' + 10),
            b'A'..=b'F' => Ok(b - b'A' + 10),
            _ => Err(KeyError::BadCharacter { offset }),
        }
    };
    let bytes = code.as_bytes();
    let mut key = [0u8; 16];
    for (i, slot) in key.iter_mut().enumerate() {
        *slot = (hex_val(bytes[2 * i], 2 * i)? << 4) | hex_val(bytes[2 * i + 1], 2 * i + 1)?;
    }
    Ok(key)
}

// ─── Interleaving helpers (Type 1) ───────────────────────────────────────────

/// Split 32 interleaved bytes into `(even-indexed, odd-indexed)` halves.
fn deinterleave(data: &[u8; 32]) -> ([u8; 16], [u8; 16]) {
    let mut even = [0u8; 16];
    let mut odd = [0u8; 16];
    for i in 0..16 {
        even[i] = data[2 * i];
        odd[i] = data[2 * i + 1];
    }
    (even, odd)
}

/// Inverse of [`deinterleave`].
fn interleave(even: &[u8; 16], odd: &[u8; 16]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..16 {
        out[2 * i] = even[i];
        out[2 * i + 1] = odd[i];
    }
    out
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf).expect("getrandom");
    buf
}

// ─── Type 1 ──────────────────────────────────────────────────────────────────

/// Type 1 scheme secrets: Integration Access Code + Identification Number.
pub struct Type1Secrets {
    access: Aes128,
    ident: Aes128,
}

impl Type1Secrets {
    /// Initializer length on the wire (`check ‖ ciphertext`).
    pub const INITIALIZER_LEN: usize = 48;

    /// Build the scheme keys from the two configured 8-digit codes.
    pub fn new(access_code: &str, id_number: &str) -> Result<Self, KeyError> {
        Ok(Self {
            access: ecb::cipher(&key_from_digits(access_code)?),
            ident: ecb::cipher(&key_from_digits(id_number)?),
        })
    }

    /// Derive the **outbound** key from the panel's 48-byte initializer.
    ///
    /// Layout: `check[0..16] ‖ ciphertext[16..48]`. The ciphertext decrypts
    /// under the IIN key to 32 interleaved bytes whose even-indexed half
    /// must equal `check`; the odd-indexed half is the key.
    pub fn derive_outbound(&self, initializer: &[u8]) -> Result<[u8; 16], NegotiationError> {
        if initializer.len() != Self::INITIALIZER_LEN {
            return Err(NegotiationError::BadInitializer {
                got: initializer.len(),
                expected: Self::INITIALIZER_LEN,
            });
        }
        let check: [u8; 16] = initializer[..16].try_into().unwrap();
        let plain = ecb::decrypt(&self.ident, &initializer[16..])
            .map_err(|CipherError::NotBlockAligned { len }| NegotiationError::BadInitializer {
                got: len,
                expected: 32,
            })?;
        let plain: [u8; 32] = plain.as_slice().try_into().unwrap();

        let (even, odd) = deinterleave(&plain);
        if even != check {
            return Err(NegotiationError::CheckMismatch);
        }
        Ok(odd)
    }

    /// Invent the **inbound** key and the 48-byte initializer telling the
    /// panel how to derive it.
    ///
    /// Returns `(key, wire_bytes)`. The key must be activated before the
    /// wire bytes are sent.
    pub fn make_inbound(&self) -> ([u8; 16], Vec<u8>) {
        self.do_make_inbound(&random_bytes::<32>())
    }

    fn do_make_inbound(&self, random: &[u8; 32]) -> ([u8; 16], Vec<u8>) {
        let (check, key) = deinterleave(random);
        let ciphertext = ecb::encrypt(&self.access, &interleave(&check, &key));

        let mut wire = Vec::with_capacity(Self::INITIALIZER_LEN);
        wire.extend_from_slice(&check);
        wire.extend_from_slice(&ciphertext);
        (key, wire)
    }
}

// ─── Type 2 ──────────────────────────────────────────────────────────────────

/// Type 2 scheme secret: a 32-hex-digit Integration Access Code.
pub struct Type2Secrets {
    access: Aes128,
}

impl Type2Secrets {
    /// Initializer length on the wire.
    pub const INITIALIZER_LEN: usize = 16;

    /// Build the scheme key from the configured 32-hex-character code.
    pub fn new(access_code: &str) -> Result<Self, KeyError> {
        Ok(Self { access: ecb::cipher(&key_from_hex(access_code)?) })
    }

    /// Derive the **outbound** key: `AES-ECB(IAC, initializer)`.
    pub fn derive_outbound(&self, initializer: &[u8]) -> Result<[u8; 16], NegotiationError> {
        if initializer.len() != Self::INITIALIZER_LEN {
            return Err(NegotiationError::BadInitializer {
                got: initializer.len(),
                expected: Self::INITIALIZER_LEN,
            });
        }
        let ct = ecb::encrypt(&self.access, initializer);
        Ok(ct.as_slice().try_into().unwrap())
    }

    /// Invent the **inbound** key; the panel receives the 16 plaintext
    /// bytes and encrypts them with its own copy of the IAC to match.
    pub fn make_inbound(&self) -> ([u8; 16], Vec<u8>) {
        self.do_make_inbound(&random_bytes::<16>())
    }

    fn do_make_inbound(&self, random: &[u8; 16]) -> ([u8; 16], Vec<u8>) {
        let key: [u8; 16] = ecb::encrypt(&self.access, random).as_slice().try_into().unwrap();
        (key, random.to_vec())
    }
}

// ─── FrameCipher ─────────────────────────────────────────────────────────────

/// Per-session frame cipher with independently activated directions.
///
/// Both directions start inactive (handshake traffic is cleartext).
/// Activation is one-way; there is no downgrade path.
#[derive(Default)]
pub struct FrameCipher {
    inbound: Option<Aes128>,
    outbound: Option<Aes128>,
}

impl FrameCipher {
    /// A cipher with both directions inactive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate decryption of panel → server frames.
    pub fn activate_inbound(&mut self, key: [u8; 16]) {
        self.inbound = Some(ecb::cipher(&key));
    }

    /// Activate encryption of server → panel frames.
    pub fn activate_outbound(&mut self, key: [u8; 16]) {
        self.outbound = Some(ecb::cipher(&key));
    }

    /// Whether inbound frames are expected to arrive encrypted.
    pub fn inbound_active(&self) -> bool {
        self.inbound.is_some()
    }

    /// Whether outbound frames leave encrypted.
    pub fn outbound_active(&self) -> bool {
        self.outbound.is_some()
    }

    /// Encrypt an outbound inner frame in place, if the direction is active.
    pub fn encrypt_outbound(&self, frame: &mut Vec<u8>) {
        if let Some(cipher) = &self.outbound {
            ecb::encrypt_in_place(cipher, frame);
        }
    }

    /// Decrypt an inbound inner frame in place, if the direction is active.
    pub fn decrypt_inbound(&self, frame: &mut Vec<u8>) -> Result<(), CipherError> {
        if let Some(cipher) = &self.inbound {
            ecb::decrypt_in_place(cipher, frame)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T2_CODE: &str = "000102030405060708090a0b0c0d0e0f";

    #[test]
    fn digit_key_repeats_the_code() {
        // "12345678" ×4 → hex "12345678123456781234567812345678"
        let key = key_from_digits("12345678").unwrap();
        assert_eq!(key[..4], [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(key[..4], key[4..8]);
        assert_eq!(key[..8], key[8..16]);
    }

    #[test]
    fn digit_key_rejects_short_codes() {
        assert_eq!(
            key_from_digits("1234567").unwrap_err(),
            KeyError::BadLength { got: 7, expected: 8 }
        );
    }

    #[test]
    fn digit_key_rejects_non_digits() {
        assert_eq!(
            key_from_digits("1234x678").unwrap_err(),
            KeyError::BadCharacter { offset: 4 }
        );
    }

    #[test]
    fn hex_key_parses() {
        let key = key_from_hex(T2_CODE).unwrap();
        assert_eq!(key, core::array::from_fn(|i| i as u8));
    }

    #[test]
    fn type1_negotiation_roundtrip() {
        // The server's own outbound derivation must invert what a panel
        // with the same secrets produces. Model the panel with a second
        // Type1Secrets whose IIN doubles as its encryption key.
        let server = Type1Secrets::new("12345678", "87654321").unwrap();

        // Panel side: random 32, even = check, odd = key, ciphertext under IIN.
        let random: [u8; 32] = core::array::from_fn(|i| (i * 7 + 3) as u8);
        let (check, key) = deinterleave(&random);
        let panel_iin = ecb::cipher(&key_from_digits("87654321").unwrap());
        let ct = ecb::encrypt(&panel_iin, &interleave(&check, &key));
        let mut wire = check.to_vec();
        wire.extend_from_slice(&ct);

        assert_eq!(server.derive_outbound(&wire).unwrap(), key);
    }

    #[test]
    fn type1_check_mismatch_is_rejected() {
        let server = Type1Secrets::new("12345678", "87654321").unwrap();
        let (_, wire) = server.do_make_inbound(&core::array::from_fn(|i| i as u8));
        // do_make_inbound encrypts under the IAC, derive_outbound decrypts
        // under the IIN; with distinct codes the check bytes cannot line up.
        assert!(matches!(
            server.derive_outbound(&wire),
            Err(NegotiationError::CheckMismatch)
        ));
    }

    #[test]
    fn type1_inbound_wire_is_48_bytes() {
        let server = Type1Secrets::new("12345678", "87654321").unwrap();
        let (key, wire) = server.make_inbound();
        assert_eq!(wire.len(), Type1Secrets::INITIALIZER_LEN);
        // panel derives the same key: decrypt ciphertext under IAC, odd half
        let panel_iac = ecb::cipher(&key_from_digits("12345678").unwrap());
        let plain = ecb::decrypt(&panel_iac, &wire[16..]).unwrap();
        let plain: [u8; 32] = plain.as_slice().try_into().unwrap();
        let (check, derived) = deinterleave(&plain);
        assert_eq!(check, wire[..16]);
        assert_eq!(derived, key);
    }

    #[test]
    fn type2_outbound_key_is_encrypted_initializer() {
        let secrets = Type2Secrets::new(T2_CODE).unwrap();
        let initializer = [0xA5u8; 16];
        let key = secrets.derive_outbound(&initializer).unwrap();

        let iac = ecb::cipher(&key_from_hex(T2_CODE).unwrap());
        assert_eq!(key.to_vec(), ecb::encrypt(&iac, &initializer));
    }

    #[test]
    fn type2_inbound_key_derivable_from_wire_bytes() {
        let secrets = Type2Secrets::new(T2_CODE).unwrap();
        let (key, wire) = secrets.make_inbound();
        assert_eq!(wire.len(), Type2Secrets::INITIALIZER_LEN);
        // the panel encrypts the received plaintext with its IAC copy
        assert_eq!(secrets.derive_outbound(&wire).unwrap(), key);
    }

    #[test]
    fn type2_rejects_wrong_initializer_length() {
        let secrets = Type2Secrets::new(T2_CODE).unwrap();
        assert_eq!(
            secrets.derive_outbound(&[0u8; 48]).unwrap_err(),
            NegotiationError::BadInitializer { got: 48, expected: 16 }
        );
    }

    #[test]
    fn frame_cipher_directions_are_independent() {
        let mut cipher = FrameCipher::new();
        assert!(!cipher.inbound_active() && !cipher.outbound_active());

        cipher.activate_outbound([1; 16]);
        assert!(cipher.outbound_active());
        assert!(!cipher.inbound_active());

        // inactive inbound leaves the frame untouched
        let mut frame = vec![1, 2, 3];
        cipher.decrypt_inbound(&mut frame).unwrap();
        assert_eq!(frame, [1, 2, 3]);

        // active outbound pads and encrypts
        let mut out = vec![0u8; 5];
        cipher.encrypt_outbound(&mut out);
        assert_eq!(out.len(), 16);
    }
}
