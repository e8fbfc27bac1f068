//! CPace PAKE (Password-Authenticated Key Exchange) over Ristretto255
//!
//! Implements the CPace protocol using Ristretto255 from curve25519-dalek.
//! The password is hashed, together with the session id used for channel
//! binding, to a group generator — preventing offline dictionary attacks
//! against a relay that only ever sees the public messages.

use crate::error::{CryptoError, Result};
use crate::hash::blake3;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand_core::OsRng;

/// Domain separator for CPace generator derivation
const CPACE_DOMAIN: &str = "parley-cpace-v1";

/// Ownership-transferring state produced by [`start`]. Consumed exactly once
/// by [`finish`]; there is no way to read the scalar back out, and it is
/// zeroized on drop whether or not it was ever consumed.
pub struct PakeState(Initiator);

struct Initiator {
    scalar: Scalar,
    public: CompressedRistretto,
}

impl Drop for Initiator {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.scalar.zeroize();
    }
}

/// Derive the CPace generator from a password and a channel-binding session id.
///
/// Uses BLAKE3 to hash the password with domain separation, then maps to a
/// Ristretto point using hash-to-group (uniform, no cofactor issues).
fn derive_generator(password: &[u8], session_id: &[u8]) -> RistrettoPoint {
    let mut input = Vec::new();
    input.extend_from_slice(CPACE_DOMAIN.as_bytes());
    input.push(0x00);
    input.extend_from_slice(password);
    input.push(0x00);
    input.extend_from_slice(session_id);

    let h1 = blake3::hash(&input);
    input.push(0x01);
    let h2 = blake3::hash(&input);

    let mut wide = [0u8; 64];
    wide[..32].copy_from_slice(&h1);
    wide[32..].copy_from_slice(&h2);

    RistrettoPoint::from_uniform_bytes(&wide)
}

fn decompress_public(their_public: &[u8]) -> Result<RistrettoPoint> {
    if their_public.len() != 32 {
        return Err(CryptoError::InvalidKey(
            "CPace public message must be 32 bytes".to_string(),
        ));
    }
    let bytes: [u8; 32] = their_public.try_into().expect("length checked above");
    CompressedRistretto(bytes)
        .decompress()
        .ok_or_else(|| CryptoError::PakeFailure("invalid Ristretto point from peer".to_string()))
}

fn transcript_key(a_public: &[u8; 32], b_public: &[u8; 32], shared: &[u8; 32]) -> [u8; 32] {
    let mut transcript = Vec::with_capacity(CPACE_DOMAIN.len() + 96);
    transcript.extend_from_slice(CPACE_DOMAIN.as_bytes());
    transcript.extend_from_slice(a_public);
    transcript.extend_from_slice(b_public);
    transcript.extend_from_slice(shared);
    blake3::derive_key("cpace-master-key", &transcript)
}

/// Start the handshake as the side that will send the first message.
///
/// Returns the public message to send to the peer and the state to retain
/// until the peer's reply arrives.
pub fn start(password: &[u8], session_id: &[u8]) -> (Vec<u8>, PakeState) {
    let generator = derive_generator(password, session_id);
    let scalar = Scalar::random(&mut OsRng);
    let public = (scalar * generator).compress();

    (public.to_bytes().to_vec(), PakeState(Initiator { scalar, public }))
}

/// Respond to an already-received public message, producing a reply and the
/// master key in a single step (the responding side never needs its own
/// ownership-transferring state: it has the peer's message in hand already).
pub fn exchange(password: &[u8], session_id: &[u8], msg_a: &[u8]) -> Result<(Vec<u8>, [u8; 32])> {
    let their_point = decompress_public(msg_a)?;

    let generator = derive_generator(password, session_id);
    let mut scalar = Scalar::random(&mut OsRng);
    let public = (scalar * generator).compress();

    let shared = (scalar * their_point).compress().to_bytes();
    let a_public: [u8; 32] = msg_a.try_into().expect("length checked by decompress_public");
    let master_key = transcript_key(&a_public, &public.to_bytes(), &shared);

    use zeroize::Zeroize;
    scalar.zeroize();

    Ok((public.to_bytes().to_vec(), master_key))
}

/// Finish the handshake on the side that called [`start`], given the peer's
/// reply. Consumes the state: it cannot be reused for a second attempt.
pub fn finish(state: PakeState, msg_b: &[u8]) -> Result<[u8; 32]> {
    let their_point = decompress_public(msg_b)?;
    let Initiator { scalar, public } = state.0;

    let shared = (scalar * their_point).compress().to_bytes();
    let b_public: [u8; 32] = msg_b.try_into().expect("length checked by decompress_public");
    Ok(transcript_key(&public.to_bytes(), &b_public, &shared))
}
