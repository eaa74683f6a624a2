// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # bubbl Signer: Device Core
//!
//! The engine that runs on the bubbl signing device. A small board holds two
//! secp256k1 key pairs, one for the human (`USER`) and one for the
//! automated co-signer (`LLM`), and signs Ethereum personal messages and
//! EIP-712 typed data over a line-oriented serial protocol, gated by a PIN.
//!
//! There is no hardware crypto acceleration on the target and no curve
//! library to lean on, so the curve arithmetic is built here from modular
//! arithmetic up. Hashing primitives (Keccak-256, SHA-256, HMAC) come from
//! the RustCrypto crates.
//!
//! ## Architecture
//!
//! - **crypto**: field arithmetic, curve ops, RFC 6979 nonces, ECDSA.
//! - **typed_data**: EIP-712 struct hashing and ERC-191 message hashing.
//! - **storage**: whole-file JSON tables with atomic replacement.
//! - **vault**: the wallet: key pairs, PIN, name.
//! - **transaction**: the co-signed transaction ledger and its states.
//! - **command**: the wire protocol dispatcher and serve loop.
//! - **oracle**: the seam to the external approve/deny decision maker.
//! - **config**: constants and the storage layout.
//! - **error**: the error taxonomy surfaced over the wire.
//!
//! ## Design Philosophy
//!
//! 1. One command at a time. No threads, no locks, no background work.
//! 2. Determinism everywhere it matters: same key + same digest = same
//!    signature, every retry, every power cycle.
//! 3. Storage failures on write are best-effort; the previous file stays
//!    authoritative because every write is a full atomic replacement.
//! 4. If it touches a key, it has tests. Plural.

pub mod command;
pub mod config;
pub mod crypto;
pub mod error;
pub mod oracle;
pub mod storage;
pub mod transaction;
pub mod typed_data;
pub mod vault;

pub use command::{Dispatcher, Outcome};
pub use config::StorageConfig;
pub use error::SignerError;
