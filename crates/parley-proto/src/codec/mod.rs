//! The human-readable code codec.
//!
//! A code is the external representation of `(slot, password)`: the slot's
//! unsigned-varint bytes followed by the password bytes, each byte turned
//! into a dictionary word that also encodes the byte's position parity.
//! `decode` additionally accepts two compatibility forms on read, but
//! `encode` only ever produces the primary varint form.

mod dictionary;
mod varint;

use crate::{ProtocolError, Result};

/// Encode `(slot, pass)` as a dash-separated code. Returns the empty string
/// if `pass` is empty — an encoding with no password bytes carries no secret
/// and is not a valid code.
pub fn encode(slot: u64, pass: &[u8]) -> String {
    if pass.is_empty() {
        return String::new();
    }

    let mut bytes = varint::encode(slot);
    bytes.extend_from_slice(pass);

    bytes
        .iter()
        .enumerate()
        .map(|(i, &byte)| dictionary::primary_word(byte, i % 2))
        .collect::<Vec<_>>()
        .join("-")
}

/// Decode a code produced by [`encode`], or one of its compatibility forms.
pub fn decode(code: &str) -> Result<(u64, Vec<u8>)> {
    let tokens = normalize(code);
    if tokens.is_empty() {
        return Err(ProtocolError::InvalidCode("empty code".into()));
    }

    decode_primary(&tokens)
        .or_else(|| decode_wormhole_compat(&tokens))
        .or_else(|| decode_octal(&tokens))
        .ok_or_else(|| ProtocolError::InvalidCode(code.to_string()))
}

/// First dictionary word whose lowercased form starts with `prefix`.
pub fn match_prefix(prefix: &str) -> String {
    dictionary::match_prefix(prefix)
}

fn normalize(code: &str) -> Vec<String> {
    code.split(|c: char| c == '-' || c == '+' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

fn decode_primary(tokens: &[String]) -> Option<(u64, Vec<u8>)> {
    let mut bytes = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let index = dictionary::primary_index(token)?;
        if index % 2 != i % 2 {
            return None;
        }
        bytes.push((index / 2) as u8);
    }

    let (slot, consumed) = varint::decode(&bytes)?;
    if consumed >= bytes.len() {
        return None;
    }
    Some((slot, bytes[consumed..].to_vec()))
}

/// The Magic-Wormhole-compatible form: a plain decimal slot number followed
/// by dictionary words for the password bytes, each still carrying the same
/// positional parity scheme but starting fresh at position 0 for the first
/// password word.
fn decode_wormhole_compat(tokens: &[String]) -> Option<(u64, Vec<u8>)> {
    if tokens.len() < 2 {
        return None;
    }
    let slot: u64 = tokens[0].parse().ok()?;

    let mut pass = Vec::with_capacity(tokens.len() - 1);
    for (i, token) in tokens[1..].iter().enumerate() {
        let index = dictionary::primary_index(token)?;
        if index % 2 != i % 2 {
            return None;
        }
        pass.push((index / 2) as u8);
    }
    Some((slot, pass))
}

/// The purely octal form: `<oct>-<ooo>-<ooo>-...`, every token base-8 digits
/// only, each password token exactly 3 digits wide.
fn decode_octal(tokens: &[String]) -> Option<(u64, Vec<u8>)> {
    if tokens.len() < 2 {
        return None;
    }
    let slot = u64::from_str_radix(&tokens[0], 8).ok()?;

    let mut pass = Vec::with_capacity(tokens.len() - 1);
    for token in &tokens[1..] {
        if token.len() != 3 || !token.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return None;
        }
        let byte = u8::from_str_radix(token, 8).ok()?;
        pass.push(byte);
    }
    Some((slot, pass))
}
