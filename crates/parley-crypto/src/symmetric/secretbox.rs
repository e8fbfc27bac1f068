//! Secretbox-style authenticated framing
//!
//! Matches the NaCl secretbox envelope: a random 24-byte nonce prepended to
//! an XChaCha20-Poly1305 ciphertext, the whole thing base64url-encoded for
//! transport as a text frame. Associated data is always empty; every seal
//! uses a fresh nonce from the OS random source.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use rand_core::OsRng;

use crate::error::{CryptoError, Result};

/// Nonce length in bytes, per the secretbox framing contract.
pub const NONCE_LEN: usize = 24;

/// Seal `plaintext` under `key`, returning the base64url text frame
/// `nonce || ciphertext`.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> String {
    let cipher = XChaCha20Poly1305::new(key.into());

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    // XChaCha20-Poly1305 only fails to encrypt on plaintexts exceeding its
    // internal counter limit, far beyond anything this control plane sends.
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .expect("secretbox plaintext within XChaCha20-Poly1305 limits");

    let mut frame = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    frame.extend_from_slice(&nonce_bytes);
    frame.extend_from_slice(&ciphertext);

    URL_SAFE_NO_PAD.encode(frame)
}

/// Open a base64url text frame sealed by [`seal`]. Any authentication
/// failure — wrong key, truncated frame, corrupted ciphertext — returns
/// [`CryptoError::BadKey`], which callers MUST treat as terminal for the
/// session rather than retrying.
pub fn open(key: &[u8; 32], frame: &str) -> Result<Vec<u8>> {
    let raw = URL_SAFE_NO_PAD
        .decode(frame)
        .map_err(|_| CryptoError::BadKey)?;

    if raw.len() < NONCE_LEN {
        return Err(CryptoError::BadKey);
    }
    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
    let nonce = XNonce::from_slice(nonce_bytes);

    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::BadKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let key = [7u8; 32];
        let plaintext = b"hello world";

        let frame = seal(&key, plaintext);
        let opened = open(&key, &frame).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn wrong_key_is_bad_key() {
        let key = [1u8; 32];
        let other = [2u8; 32];
        let frame = seal(&key, b"secret");

        let err = open(&other, &frame).unwrap_err();
        assert_eq!(err, CryptoError::BadKey);
    }

    #[test]
    fn truncated_frame_is_bad_key() {
        let key = [3u8; 32];
        let frame = seal(&key, b"secret");
        let truncated = &frame[..frame.len() / 2];

        assert!(open(&key, truncated).is_err());
    }

    #[test]
    fn documented_ciphertext_length() {
        // Scenario 3: "hello" (5 bytes) under a fixed key yields 21 raw
        // bytes of ciphertext (5 + 16-byte Poly1305 tag), independent of
        // the 24-byte nonce and its base64url encoding.
        let key = [0u8; 32];
        let cipher = XChaCha20Poly1305::new((&key).into());
        let nonce = XNonce::from_slice(&[0u8; NONCE_LEN]);
        let ciphertext = cipher.encrypt(nonce, b"hello".as_slice()).unwrap();

        assert_eq!(ciphertext.len(), 21);
    }

    #[test]
    fn each_seal_uses_a_fresh_nonce() {
        let key = [9u8; 32];
        let frame1 = seal(&key, b"same message");
        let frame2 = seal(&key, b"same message");

        assert_ne!(frame1, frame2);
    }
}
