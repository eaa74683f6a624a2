//! # Digital Signatures
//!
//! ECDSA over secp256k1, the way Ethereum wants it: deterministic nonces,
//! low-s normalization, and a recovery id folded into `v` so verifiers can
//! recover the signer's public key from the signature alone.
//!
//! ## Recovery id
//!
//! Low-s normalization can flip the parity of `R.y` after `k` is chosen, so
//! `v` is not read off the nonce point. [`recovery_id`] tries all four ids
//! against the signer's real public key instead.

use num_bigint::BigUint;
use num_traits::Zero;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::curve::{point_add, scalar_mult, CurvePoint};
use super::field::{mod_inverse, mul_mod, pow_mod, FieldError};
use super::keys::{EthSignature, KeyPair};
use super::nonce::generate_k;
use crate::config::{HALF_N, MAX_SIGNING_ATTEMPTS, N, P, RECOVERY_ID_OFFSET, SECP256K1_B};
use crate::typed_data::{encode_typed_data, hash_personal_message, TypeSchema, TypedDataError};

/// Errors during signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("modular inverse does not exist")]
    NoInverse,

    #[error("failed to generate signature after {attempts} attempts")]
    SigningExhausted { attempts: u32 },

    #[error(transparent)]
    TypedData(#[from] TypedDataError),
}

impl From<FieldError> for SignatureError {
    fn from(_: FieldError) -> Self {
        SignatureError::NoInverse
    }
}

fn hash_scalar(hash: &[u8; 32]) -> BigUint {
    BigUint::from_bytes_be(hash) % &*N
}

/// One signing attempt. `None` means "try the next nonce".
fn try_sign(private_key: &BigUint, z: &BigUint, k: &BigUint) -> Option<(BigUint, BigUint)> {
    if k.is_zero() {
        return None;
    }
    let r_point = scalar_mult(k, &CurvePoint::generator()).ok()?;
    let (rx, _) = r_point.coordinates()?;
    let r = rx % &*N;
    if r.is_zero() {
        return None;
    }

    let n = &*N;
    let k_inv = mod_inverse(k, n).ok()?;
    let s = mul_mod(&k_inv, &((z + mul_mod(&r, private_key, n)) % n), n);
    if s.is_zero() {
        return None;
    }

    let s = if s > *HALF_N { n - s } else { s };
    Some((r, s))
}

/// Raw ECDSA: `(r, s)` with `s <= n/2`.
///
/// Walks up to [`MAX_SIGNING_ATTEMPTS`] deterministic nonces and returns the
/// first that yields non-zero `r` and `s`. In practice that is always the
/// first one.
pub fn sign_hash(private_key: &BigUint, hash: &[u8; 32]) -> Result<(BigUint, BigUint), SignatureError> {
    let z = hash_scalar(hash);
    let private_key = private_key % &*N;

    for attempt in 0..MAX_SIGNING_ATTEMPTS {
        let k = generate_k(&private_key, hash, attempt);
        match try_sign(&private_key, &z, &k) {
            Some(rs) => return Ok(rs),
            None => warn!(attempt, "nonce candidate rejected, retrying"),
        }
    }

    Err(SignatureError::SigningExhausted {
        attempts: MAX_SIGNING_ATTEMPTS,
    })
}

/// Rebuild the signer's public key from `(r, s)` and a recovery id.
///
/// `id / 2` says whether `R.x` overflowed `n`; `id % 2` is the parity of
/// `R.y`. Returns `None` if `r` or `s` is out of range, if the candidate `x`
/// is not a field element on the curve, or if the arithmetic degenerates.
pub fn recover_public_key(
    hash: &[u8; 32],
    r: &BigUint,
    s: &BigUint,
    recovery_id: u8,
) -> Option<CurvePoint> {
    let n = &*N;
    let p = &*P;
    if r.is_zero() || r >= n || s.is_zero() || s >= n || recovery_id > 3 {
        return None;
    }

    let x = r + n * BigUint::from(recovery_id / 2);
    if &x >= p {
        return None;
    }

    // p ≡ 3 (mod 4), so sqrt(a) = a^((p+1)/4).
    let y_squared = (mul_mod(&mul_mod(&x, &x, p), &x, p) + SECP256K1_B) % p;
    let mut y = pow_mod(&y_squared, &((p + 1u32) >> 2u32), p);
    if mul_mod(&y, &y, p) != y_squared {
        return None;
    }
    if y.bit(0) != (recovery_id % 2 == 1) {
        y = p - y;
    }
    let big_r = CurvePoint::new(x, y);

    let e = hash_scalar(hash);
    let r_inv = mod_inverse(r, n).ok()?;

    // Q = r^-1 (sR - eG)
    let s_r = scalar_mult(s, &big_r).ok()?;
    let e_g = scalar_mult(&e, &CurvePoint::generator()).ok()?;
    let difference = point_add(&s_r, &e_g.negate()).ok()?;
    let q = scalar_mult(&r_inv, &difference).ok()?;

    if q.is_infinity() {
        None
    } else {
        Some(q)
    }
}

/// The recovery id in `0..4` under which `(r, s)` recovers `public_key`.
///
/// Falls back to `0`, with a warning, if no id matches. That cannot happen
/// for a signature this module produced.
pub fn recovery_id(public_key: &CurvePoint, hash: &[u8; 32], r: &BigUint, s: &BigUint) -> u8 {
    for id in 0..4u8 {
        if recover_public_key(hash, r, s, id).as_ref() == Some(public_key) {
            return id;
        }
    }
    warn!("no recovery id reproduces the signing key, defaulting to 0");
    0
}

/// Sign a 32-byte digest and attach `v = 27 + recovery_id`.
pub fn sign(keypair: &KeyPair, hash: &[u8; 32]) -> Result<EthSignature, SignatureError> {
    let (r, s) = sign_hash(keypair.private_key(), hash)?;
    let id = recovery_id(keypair.public_key(), hash, &r, &s);
    Ok(EthSignature::new(r, s, RECOVERY_ID_OFFSET + id))
}

/// Check `(r, s)` against a public key.
///
/// Out-of-range `r` or `s`, or a public key at infinity, is simply `false`.
pub fn verify(public_key: &CurvePoint, hash: &[u8; 32], r: &BigUint, s: &BigUint) -> bool {
    let n = &*N;
    if r.is_zero() || r >= n || s.is_zero() || s >= n || public_key.is_infinity() {
        return false;
    }

    let Ok(s_inv) = mod_inverse(s, n) else {
        return false;
    };
    let z = hash_scalar(hash);
    let u1 = mul_mod(&z, &s_inv, n);
    let u2 = mul_mod(r, &s_inv, n);

    let point = scalar_mult(&u1, &CurvePoint::generator())
        .and_then(|a| scalar_mult(&u2, public_key).and_then(|b| point_add(&a, &b)));

    match point {
        Ok(point) => match point.coordinates() {
            Some((x, _)) => &(x % n) == r,
            None => false,
        },
        Err(_) => false,
    }
}

/// `personal_sign`: ERC-191 prefix, Keccak-256, sign.
pub fn sign_personal_message(keypair: &KeyPair, message: &[u8]) -> Result<EthSignature, SignatureError> {
    sign(keypair, &hash_personal_message(message))
}

/// `eth_signTypedData`: EIP-712 digest, sign.
pub fn sign_typed_data(
    keypair: &KeyPair,
    domain: &Value,
    types: &TypeSchema,
    primary_type: &str,
    message: &Value,
) -> Result<EthSignature, SignatureError> {
    let digest = encode_typed_data(domain, types, primary_type, message)?;
    sign(keypair, &digest)
}

/// Verify a `personal_sign` signature against a public key.
pub fn verify_personal_message(public_key: &CurvePoint, message: &[u8], signature: &EthSignature) -> bool {
    verify(public_key, &hash_personal_message(message), &signature.r, &signature.s)
}

/// Verify an EIP-712 signature against a public key. Payloads that fail to
/// encode do not verify.
pub fn verify_typed_data(
    public_key: &CurvePoint,
    domain: &Value,
    types: &TypeSchema,
    primary_type: &str,
    message: &Value,
    signature: &EthSignature,
) -> bool {
    match encode_typed_data(domain, types, primary_type, message) {
        Ok(digest) => verify(public_key, &digest, &signature.r, &signature.s),
        Err(_) => false,
    }
}
