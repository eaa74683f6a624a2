//! Deterministic nonces, RFC 6979 style, over HMAC-SHA256.
//!
//! Random `k` values have a long history of leaking private keys (one repeated
//! nonce is enough), so the device never draws `k` from an RNG. The same key
//! and hash always produce the same candidate sequence, and `attempt` picks a
//! position in it.
//!
//! The hash bytes go into the HMAC as-is, without the `bits2octets` reduction
//! mod `n` the RFC prescribes. That keeps signatures byte-identical with the
//! firmware already in the field. The result is still deterministic and
//! uniformly distributed; it is just not the RFC's exact sequence.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use super::curve::to_be_bytes_32;
use super::hash::hmac_sha256;
use crate::config::{N, SCALAR_LENGTH};

/// The `attempt`-th valid nonce candidate for `(private_key, message_hash)`.
///
/// Walks the candidate sequence `attempt + 1` steps and returns the last
/// candidate. If that one falls outside `[1, n)` the result is `1`; the
/// chance of that is below 2^-127.
pub fn generate_k(private_key: &BigUint, message_hash: &[u8; 32], attempt: u32) -> BigUint {
    let private_bytes = to_be_bytes_32(private_key);

    let mut v = [0x01u8; SCALAR_LENGTH];
    let mut k = [0x00u8; SCALAR_LENGTH];

    k = hmac_sha256(&k, &[&v, &[0x00u8], &private_bytes, message_hash]);
    v = hmac_sha256(&k, &[&v]);
    k = hmac_sha256(&k, &[&v, &[0x01u8], &private_bytes, message_hash]);
    v = hmac_sha256(&k, &[&v]);

    for i in 0..=attempt {
        let mut t = Vec::with_capacity(SCALAR_LENGTH);
        while t.len() < SCALAR_LENGTH {
            v = hmac_sha256(&k, &[&v]);
            t.extend_from_slice(&v);
        }

        let candidate = BigUint::from_bytes_be(&t[..SCALAR_LENGTH]);
        if i == attempt && !candidate.is_zero() && candidate < *N {
            return candidate;
        }

        k = hmac_sha256(&k, &[&v, &[0x00u8]]);
        v = hmac_sha256(&k, &[&v]);
    }

    BigUint::one()
}
