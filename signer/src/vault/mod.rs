//! # Vault Module
//!
//! Where the keys live. The rest of the crate asks the vault for a
//! [`KeyPair`](crate::crypto::KeyPair) by role, for an address, or whether
//! a PIN is right; it never touches the key files itself.

pub mod wallet;

pub use wallet::{WalletError, WalletStore, WalletSummary};
