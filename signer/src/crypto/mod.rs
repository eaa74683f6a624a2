//! # Cryptographic Primitives for the Device
//!
//! Everything that touches a key goes through here.
//!
//! - **field**: modular reduction and inversion over `p` and `n`.
//! - **curve**: affine secp256k1 point arithmetic and address derivation.
//! - **hash**: Keccak-256, SHA-256 and HMAC-SHA256 (RustCrypto crates).
//! - **nonce**: RFC 6979 deterministic `k` candidates.
//! - **signatures**: ECDSA sign / verify / public-key recovery.
//! - **keys**: roles, key pairs and the Ethereum signature wire form.
//!
//! ## On side channels
//!
//! The point arithmetic is plain double-and-add over affine coordinates and
//! the inverse is a textbook extended Euclid. Neither is constant-time. The
//! device makes no claim of resisting timing or power analysis.

pub mod curve;
pub mod field;
pub mod hash;
pub mod keys;
pub mod nonce;
pub mod signatures;

pub use curve::{derive_ethereum_address, CurvePoint};
pub use hash::{keccak256, sha256};
pub use keys::{EthSignature, KeyPair, Role};
pub use signatures::{sign, sign_personal_message, sign_typed_data, verify};
