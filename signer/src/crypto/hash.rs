//! # Hashing Utilities
//!
//! The device speaks Ethereum, so the hash that matters is Keccak-256. Not
//! SHA3-256: Ethereum froze the pre-standard padding in 2015 and everyone has
//! been explaining the difference at conferences ever since. The `sha3`
//! crate's `Keccak256` is the pre-standard one, which is what we want.
//!
//! SHA-256 only shows up inside HMAC, and HMAC-SHA256 only shows up inside
//! the RFC 6979 nonce derivation. Both are exposed here so the nonce module
//! doesn't need to know which crate provides them.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use sha3::{Digest, Keccak256};

type HmacSha256 = Hmac<Sha256>;

/// Keccak-256 of `data`.
///
/// ```
/// use bubbl_signer::crypto::keccak256;
///
/// assert_eq!(
///     hex::encode(keccak256(b"")),
///     "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
/// );
/// ```
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Keccak-256 over several parts, as if they were concatenated.
///
/// Saves building a temporary buffer when hashing `typeHash ‖ field ‖ ...`.
pub fn keccak256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// HMAC-SHA256 keyed by `key` over the concatenation of `parts`.
pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    // HMAC accepts keys of any length, so construction cannot fail.
    HmacSha256::new_from_slice(key)
        .map(|mut mac| {
            for part in parts {
                mac.update(part);
            }
            mac.finalize().into_bytes().into()
        })
        .unwrap_or_default()
}
