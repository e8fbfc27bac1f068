//! HKDF (HMAC-based Key Derivation Function) implementation

use crate::error::{CryptoError, Result};
use hkdf::Hkdf;
use sha2::Sha256;

/// Derive key material using HKDF-SHA256
///
/// # Arguments
///
/// * `salt` - Optional salt value (use empty slice for no salt)
/// * `ikm` - Input key material
/// * `info` - Application-specific context information
/// * `len` - Length of output key material in bytes
///
/// # Returns
///
/// Derived key material of the requested length
///
/// # Example
///
/// ```ignore
/// let derived = derive(b"salt", b"input_key_material", b"app_context", 32)?;
/// ```
pub fn derive(salt: &[u8], ikm: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);

    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyGeneration(format!("HKDF expansion failed: {}", e)))?;

    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hkdf_derive() {
        let ikm = b"input key material";
        let salt = b"salt";
        let info = b"context";

        let key1 = derive(salt, ikm, info, 32).unwrap();
        let key2 = derive(salt, ikm, info, 32).unwrap();

        assert_eq!(key1, key2);
        assert_eq!(key1.len(), 32);
    }

    #[test]
    fn test_hkdf_different_info() {
        let ikm = b"input key material";
        let salt = b"salt";

        let key1 = derive(salt, ikm, b"context1", 32).unwrap();
        let key2 = derive(salt, ikm, b"context2", 32).unwrap();

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_hkdf_different_length() {
        let ikm = b"input key material";
        let salt = b"salt";
        let info = b"context";

        let key1 = derive(salt, ikm, info, 32).unwrap();
        let key2 = derive(salt, ikm, info, 64).unwrap();

        assert_eq!(key1.len(), 32);
        assert_eq!(key2.len(), 64);
        // First 32 bytes should be the same
        assert_eq!(key1, &key2[..32]);
    }
}
