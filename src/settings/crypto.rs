// ABOUTME: AES-256-GCM encryption for credentials stored at rest.
// ABOUTME: Blob layout: 12-byte nonce || ciphertext || 16-byte tag, base64-encoded.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
use thiserror::Error;

pub const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid encryption key (must be {KEY_LEN} bytes)")]
    InvalidKey,

    #[error("encryption failed")]
    Encryption,

    #[error("decryption failed: invalid or tampered data")]
    Decryption,
}

/// Generate a fresh AES-256 key.
pub fn generate_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    rand::rng().fill_bytes(&mut key);
    key
}

pub fn encrypt(key: &[u8], plaintext: &str) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKey)?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| CryptoError::Encryption)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(blob))
}

pub fn decrypt(key: &[u8], blob_b64: &str) -> Result<String, CryptoError> {
    let blob = STANDARD.decode(blob_b64).map_err(|_| CryptoError::Decryption)?;
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Decryption);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKey)?;
    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Decryption)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plaintext() {
        let key = generate_key();
        let blob = encrypt(&key, "sk-test-12345").unwrap();
        assert_eq!(decrypt(&key, &blob).unwrap(), "sk-test-12345");
    }

    #[test]
    fn each_encryption_uses_a_fresh_nonce() {
        let key = generate_key();
        let a = encrypt(&key, "same input").unwrap();
        let b = encrypt(&key, "same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_input_fails_to_decrypt() {
        let key = generate_key();
        assert!(matches!(decrypt(&key, "not base64 at all!"), Err(CryptoError::Decryption)));
        assert!(matches!(decrypt(&key, "aGVsbG8="), Err(CryptoError::Decryption)));
    }

    #[test]
    fn tampered_blob_fails_authentication() {
        let key = generate_key();
        let blob = encrypt(&key, "secret").unwrap();
        let mut bytes = STANDARD.decode(&blob).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let tampered = STANDARD.encode(bytes);
        assert!(matches!(decrypt(&key, &tampered), Err(CryptoError::Decryption)));
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let blob = encrypt(&generate_key(), "secret").unwrap();
        assert!(decrypt(&generate_key(), &blob).is_err());
    }

    #[test]
    fn short_key_is_rejected() {
        assert!(matches!(encrypt(&[0u8; 16], "x"), Err(CryptoError::InvalidKey)));
    }
}
