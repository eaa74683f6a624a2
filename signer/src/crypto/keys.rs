//! # Key Management
//!
//! secp256k1 key pairs for the two signing roles, and the `(r, s, v)` shape
//! every signature takes once it leaves the device.
//!
//! ## Security considerations
//!
//! - Private scalars come from `OsRng` by rejection sampling, so they are
//!   uniform on `[1, n)` with no modulo bias.
//! - `KeyPair` does not print its secret in `Debug`. Key material is never
//!   logged. If you add logging to this module, you will be asked to leave.
//! - Scalars are plain `BigUint`s and are not zeroized on drop.

use num_bigint::BigUint;
use num_traits::Zero;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::curve::{derive_ethereum_address, public_key_for, to_be_bytes_32, CurvePoint};
use crate::config::{N, SCALAR_LENGTH};

/// Errors from key construction and parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("private key is outside [1, n)")]
    InvalidSecretKey,

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),
}

/// Which of the two device keys is in play.
///
/// `USER` signs whatever the human approves with their PIN. `LLM` co-signs
/// only after the decision oracle says yes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "LLM")]
    Llm,
}

impl Role {
    /// Both roles in key-file order.
    pub const ALL: [Role; 2] = [Role::User, Role::Llm];

    /// The tag used in key files and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Llm => "LLM",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "LLM" => Ok(Role::Llm),
            other => Err(KeyError::UnknownRole(other.to_string())),
        }
    }
}

/// Draw a private scalar uniformly from `[1, n)`.
///
/// Samples 32 random bytes and rejects anything outside the range. The
/// expected number of draws is a hair above one.
pub fn generate_private_key<R: RngCore + CryptoRng>(rng: &mut R) -> BigUint {
    let mut bytes = [0u8; SCALAR_LENGTH];
    loop {
        rng.fill_bytes(&mut bytes);
        let candidate = BigUint::from_bytes_be(&bytes);
        if !candidate.is_zero() && candidate < *N {
            return candidate;
        }
    }
}

/// A private scalar and the public point it generates.
///
/// Invariant: `public == private · G` and `1 <= private < n`.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    private: BigUint,
    public: CurvePoint,
}

impl KeyPair {
    /// Fresh key pair from `rng`.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let private = generate_private_key(rng);
        // private is in [1, n), so private·G is finite and the only fallible
        // step in from_private cannot trigger.
        match Self::from_private(private) {
            Ok(pair) => pair,
            Err(_) => Self::generate(rng),
        }
    }

    /// Derive the public half from a known private scalar.
    pub fn from_private(private: BigUint) -> Result<Self, KeyError> {
        if private.is_zero() || private >= *N {
            return Err(KeyError::InvalidSecretKey);
        }
        let public = public_key_for(&private).map_err(|_| KeyError::InvalidSecretKey)?;
        if public.is_infinity() {
            return Err(KeyError::InvalidSecretKey);
        }
        Ok(Self { private, public })
    }

    /// The private scalar. Handle with care.
    pub fn private_key(&self) -> &BigUint {
        &self.private
    }

    /// The public point.
    pub fn public_key(&self) -> &CurvePoint {
        &self.public
    }

    /// `(x, y)` of the public point.
    pub fn public_coordinates(&self) -> (BigUint, BigUint) {
        match self.public.coordinates() {
            Some((x, y)) => (x.clone(), y.clone()),
            None => (BigUint::zero(), BigUint::zero()),
        }
    }

    /// `0x`-prefixed lowercase Ethereum address.
    pub fn address(&self) -> String {
        let (x, y) = self.public_coordinates();
        derive_ethereum_address(&x, &y)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// An Ethereum-style ECDSA signature.
///
/// On the wire: `{"r": "0x<64 hex>", "s": "0x<64 hex>", "v": 27|28}`.
/// Invariants for anything this device produces: `1 <= r, s < n`,
/// `s <= n/2`, `v ∈ {27, 28}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireSignature", try_from = "WireSignature")]
pub struct EthSignature {
    pub r: BigUint,
    pub s: BigUint,
    pub v: u8,
}

impl EthSignature {
    pub fn new(r: BigUint, s: BigUint, v: u8) -> Self {
        Self { r, s, v }
    }

    /// `0x` + 64 lowercase hex digits.
    pub fn r_hex(&self) -> String {
        format!("0x{}", hex::encode(to_be_bytes_32(&self.r)))
    }

    /// `0x` + 64 lowercase hex digits.
    pub fn s_hex(&self) -> String {
        format!("0x{}", hex::encode(to_be_bytes_32(&self.s)))
    }

    /// The recovery id, `v - 27`.
    pub fn recovery_id(&self) -> u8 {
        self.v.saturating_sub(crate::config::RECOVERY_ID_OFFSET)
    }

    /// 65-byte `r ‖ s ‖ v` encoding, as accepted by `ecrecover` tooling.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&to_be_bytes_32(&self.r));
        out[32..64].copy_from_slice(&to_be_bytes_32(&self.s));
        out[64] = self.v;
        out
    }
}

impl fmt::Display for EthSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_bytes()))
    }
}

#[derive(Serialize, Deserialize)]
struct WireSignature {
    r: String,
    s: String,
    v: u8,
}

impl From<EthSignature> for WireSignature {
    fn from(sig: EthSignature) -> Self {
        WireSignature {
            r: sig.r_hex(),
            s: sig.s_hex(),
            v: sig.v,
        }
    }
}

impl TryFrom<WireSignature> for EthSignature {
    type Error = KeyError;

    fn try_from(wire: WireSignature) -> Result<Self, Self::Error> {
        Ok(EthSignature {
            r: parse_hex_scalar(&wire.r)?,
            s: parse_hex_scalar(&wire.s)?,
            v: wire.v,
        })
    }
}

fn parse_hex_scalar(value: &str) -> Result<BigUint, KeyError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| KeyError::InvalidSignature(value.to_string()))
}
