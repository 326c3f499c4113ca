#![forbid(unsafe_code)]

//! Key derivation for UsernameToken keys: the UsernameToken Profile 1.1
//! iterated SHA-1 derivation and the P_SHA1 secret key.

use rand::RngCore;
use wssec_core::Error;

use crate::digest::sha1_of;
use crate::sign::hmac_sha1;

/// Iteration count used when none (or zero) is configured.
pub const DEFAULT_ITERATION: u32 = 1000;

/// Label mixed into the P_SHA1 seed of a UsernameToken secret key.
pub const SECRET_KEY_LABEL: &str = "WS-Security";

/// Length of a UsernameToken secret key when none is requested.
pub const SECRET_KEY_LENGTH: usize = 16;

/// A 16 byte random salt whose last byte marks the key usage:
/// `0x01` for MAC keys, `0x02` for encryption keys.
pub fn generate_salt(for_mac: bool) -> Vec<u8> {
    let mut salt = vec![0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    salt[15] = if for_mac { 0x01 } else { 0x02 };
    salt
}

/// Derived key = SHA-1(password || salt), hashed again `iterations - 1` times.
pub fn derive_key(password: &[u8], salt: &[u8], iterations: u32) -> Vec<u8> {
    let iterations = if iterations == 0 { DEFAULT_ITERATION } else { iterations };
    let mut key = sha1_of(&[password, salt]);
    for _ in 1..iterations {
        key = sha1_of(&[key.as_slice()]);
    }
    key
}

/// P_SHA1(secret, seed) from RFC 2246, truncated to `length` bytes.
pub fn p_sha1(secret: &[u8], seed: &[u8], length: usize) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(length);
    // A(0) is the seed
    let mut a = seed.to_vec();
    while out.len() < length {
        a = hmac_sha1(secret, &a)?;
        let mut input = a.clone();
        input.extend_from_slice(seed);
        let block = hmac_sha1(secret, &input)?;
        let take = (length - out.len()).min(block.len());
        out.extend_from_slice(&block[..take]);
    }
    Ok(out)
}

/// Secret key of a UsernameToken without Salt/Iteration:
/// P_SHA1(password, label || nonce || created).
pub fn secret_key(
    password: &[u8],
    label: &str,
    nonce: &[u8],
    created: &str,
    length: usize,
) -> Result<Vec<u8>, Error> {
    let mut seed = Vec::with_capacity(label.len() + nonce.len() + created.len());
    seed.extend_from_slice(label.as_bytes());
    seed.extend_from_slice(nonce);
    seed.extend_from_slice(created.as_bytes());
    p_sha1(password, &seed, length)
}
