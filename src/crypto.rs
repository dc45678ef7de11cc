//! Authenticated encryption of password strings.
//!
//! Every value stored in the `password` column passes through this module.
//! The envelope is `nonce || ciphertext+tag`, base64 encoded so it fits in
//! a text column.

use base64::{Engine as _, engine::general_purpose};
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};
use rand::{TryRngCore, rngs::OsRng};
use thiserror::Error;

/// Nonce size of ChaCha20-Poly1305.
pub const NONCE_LEN: usize = 12;

/// Key size of ChaCha20-Poly1305.
pub const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption key must be {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("stored value is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("stored value is too short to contain a nonce")]
    Truncated,

    #[error("authentication failed: wrong key or tampered data")]
    Authentication,

    #[error("failed to generate a random nonce")]
    NonceGeneration,

    #[error("encryption failed")]
    Encryption,
}

fn cipher(key: &[u8]) -> Result<ChaCha20Poly1305, CipherError> {
    ChaCha20Poly1305::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength(key.len()))
}

/// Encrypts a password with a fresh random nonce.
///
/// The nonce comes from the OS random generator on every call, so two
/// encryptions of the same plaintext produce different envelopes.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<String, CipherError> {
    let cipher = cipher(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|_| CipherError::NonceGeneration)?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let sealed = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CipherError::Encryption)?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + sealed.len());
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&sealed);

    Ok(general_purpose::STANDARD.encode(envelope))
}

/// Decrypts an envelope produced by [`encrypt`].
///
/// Fails with [`CipherError::Authentication`] when the tag does not verify
/// and with [`CipherError::Decode`] / [`CipherError::Truncated`] when the
/// input is not a well-formed envelope.
pub fn decrypt(encoded: &str, key: &[u8]) -> Result<String, CipherError> {
    let envelope = general_purpose::STANDARD.decode(encoded)?;
    if envelope.len() < NONCE_LEN {
        return Err(CipherError::Truncated);
    }

    let cipher = cipher(key)?;
    let (nonce_bytes, sealed) = envelope.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, sealed)
        .map_err(|_| CipherError::Authentication)?;

    String::from_utf8(plaintext).map_err(|_| CipherError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn test_round_trip() {
        let encoded = encrypt("Tr0ub4dor&3", KEY).unwrap();
        let plaintext = decrypt(&encoded, KEY).unwrap();
        assert_eq!(plaintext, "Tr0ub4dor&3");
    }

    #[test]
    fn test_round_trip_empty_plaintext() {
        let encoded = encrypt("", KEY).unwrap();
        assert_eq!(decrypt(&encoded, KEY).unwrap(), "");
    }

    #[test]
    fn test_nonce_randomization() {
        let first = encrypt("same input", KEY).unwrap();
        let second = encrypt("same input", KEY).unwrap();
        assert_ne!(first, second, "two encryptions must not share a nonce");
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let other_key = b"fedcba9876543210fedcba9876543210";
        let encoded = encrypt("secret", KEY).unwrap();
        let err = decrypt(&encoded, other_key).unwrap_err();
        assert!(matches!(err, CipherError::Authentication));
    }

    #[test]
    fn test_tampered_ciphertext_fails_authentication() {
        let encoded = encrypt("secret", KEY).unwrap();
        let mut envelope = general_purpose::STANDARD.decode(&encoded).unwrap();

        // Flip one bit in every position of the envelope; the tag must
        // catch each of them.
        for i in 0..envelope.len() {
            envelope[i] ^= 0x01;
            let tampered = general_purpose::STANDARD.encode(&envelope);
            let err = decrypt(&tampered, KEY).unwrap_err();
            assert!(matches!(err, CipherError::Authentication));
            envelope[i] ^= 0x01;
        }
    }

    #[test]
    fn test_invalid_base64_is_decode_error() {
        let err = decrypt("not base64!!!", KEY).unwrap_err();
        assert!(matches!(err, CipherError::Decode(_)));
    }

    #[test]
    fn test_too_short_envelope() {
        let short = general_purpose::STANDARD.encode([0u8; NONCE_LEN - 1]);
        let err = decrypt(&short, KEY).unwrap_err();
        assert!(matches!(err, CipherError::Truncated));
    }

    #[test]
    fn test_wrong_key_length_rejected() {
        let err = encrypt("x", b"too short").unwrap_err();
        assert!(matches!(err, CipherError::InvalidKeyLength(9)));
    }
}
