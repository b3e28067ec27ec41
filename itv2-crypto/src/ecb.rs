//! AES-128-ECB with zero padding, applied to whole buffers.
//!
//! The panel encrypts each inner frame as one unit. Plaintext length is
//! recovered after decryption from the frame's own length prefix, so the
//! trailing zero pad never needs to be stripped here.

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

use crate::CipherError;

/// AES block size in bytes.
pub const BLOCK: usize = 16;

/// Build a cipher from raw key bytes.
pub fn cipher(key: &[u8; 16]) -> Aes128 {
    Aes128::new(GenericArray::from_slice(key))
}

/// Encrypt `data` in place, first zero-padding it to a block multiple.
pub fn encrypt_in_place(cipher: &Aes128, data: &mut Vec<u8>) {
    let rem = data.len() % BLOCK;
    if rem != 0 {
        data.extend(std::iter::repeat_n(0u8, BLOCK - rem));
    }
    for block in data.chunks_exact_mut(BLOCK) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
}

/// Decrypt `data` in place. The buffer must already be block-aligned.
pub fn decrypt_in_place(cipher: &Aes128, data: &mut [u8]) -> Result<(), CipherError> {
    if data.len() % BLOCK != 0 {
        return Err(CipherError::NotBlockAligned { len: data.len() });
    }
    for block in data.chunks_exact_mut(BLOCK) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(())
}

/// Encrypt a copy of `data` (zero-padded) and return the ciphertext.
pub fn encrypt(cipher: &Aes128, data: &[u8]) -> Vec<u8> {
    let mut buf = data.to_vec();
    encrypt_in_place(cipher, &mut buf);
    buf
}

/// Decrypt a copy of `data` and return the plaintext.
pub fn decrypt(cipher: &Aes128, data: &[u8]) -> Result<Vec<u8>, CipherError> {
    let mut buf = data.to_vec();
    decrypt_in_place(cipher, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_pads_to_block_multiple() {
        let c = cipher(&[0x11; 16]);
        let mut data = vec![0xAA; 5];
        encrypt_in_place(&c, &mut data);
        assert_eq!(data.len(), 16);
    }

    #[test]
    fn roundtrip_preserves_plaintext_prefix() {
        let c = cipher(&[0x42; 16]);
        let plain: Vec<u8> = (0u8..40).collect();
        let ct = encrypt(&c, &plain);
        assert_eq!(ct.len(), 48);
        let pt = decrypt(&c, &ct).unwrap();
        // first 40 bytes are the original, the rest is the zero pad
        assert_eq!(&pt[..40], &plain[..]);
        assert_eq!(&pt[40..], &[0u8; 8]);
    }

    #[test]
    fn decrypt_rejects_ragged_buffers() {
        let c = cipher(&[0; 16]);
        assert_eq!(
            decrypt(&c, &[0u8; 17]),
            Err(CipherError::NotBlockAligned { len: 17 })
        );
    }
}
