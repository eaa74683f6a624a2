//! # Device Wallet
//!
//! A [`WalletStore`] owns the files that make up the wallet on the SD card:
//! two role-tagged private keys, their public keys, the PIN and a display
//! name. It is the only code that ever reads a private key file.
//!
//! ## File formats
//!
//! ```text
//! private_key.txt   USER:<decimal scalar>\nLLM:<decimal scalar>\n
//! public_key.txt    USER:<x decimal>,<y decimal>\nLLM:<x>,<y>\n
//! pin.txt           <pin>
//! name.txt          <name>
//! ```
//!
//! ## Lifecycle
//!
//! A wallet exists iff the private key file holds exactly two role-tagged
//! entries. Initializing with `force_new` wipes every wallet artifact,
//! transaction ledger included, before generating fresh keys; there is no
//! way to reset one without the others.
//!
//! The PIN is stored and compared in cleartext with no attempt throttling.

use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{StorageConfig, TRANSACTIONS_TABLE};
use crate::crypto::curve::derive_ethereum_address;
use crate::crypto::keys::{KeyPair, Role};
use crate::storage::fs::{read_text, remove_if_exists, write_atomic};
use crate::storage::TableDb;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// No key file, or no PIN file, on the card.
    #[error("wallet not initialized")]
    NotInitialized,

    /// The private key file has no line for this role.
    #[error("role {0} not found in private key file")]
    RoleNotFound(String),

    /// The public key file has no line for this role.
    #[error("role {0} not found in public key file")]
    PublicKeyNotFound(String),

    /// A key line exists but does not parse.
    #[error("corrupt key file: {0}")]
    CorruptKeyFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// `initialize` was called with an empty PIN.
    #[error("a PIN is required")]
    MissingPin,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// What `init_wallet` reports back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub name: String,
    pub user_address: String,
    pub llm_address: String,
}

// ---------------------------------------------------------------------------
// Key file parsing
// ---------------------------------------------------------------------------

/// `ROLE:<rest>` lines with a recognized role tag.
fn role_lines(text: &str) -> impl Iterator<Item = (Role, &str)> {
    text.lines().filter_map(|line| {
        let (tag, rest) = line.trim().split_once(':')?;
        let role = tag.parse::<Role>().ok()?;
        Some((role, rest))
    })
}

fn parse_decimal(role: Role, digits: &str) -> Result<BigUint, WalletError> {
    BigUint::parse_bytes(digits.trim().as_bytes(), 10)
        .ok_or_else(|| WalletError::CorruptKeyFile(format!("{role} entry is not a decimal integer")))
}

fn format_private_keys(user: &KeyPair, llm: &KeyPair) -> String {
    format!(
        "{}:{}\n{}:{}\n",
        Role::User,
        user.private_key(),
        Role::Llm,
        llm.private_key()
    )
}

fn format_public_keys(user: &KeyPair, llm: &KeyPair) -> String {
    let (ux, uy) = user.public_coordinates();
    let (lx, ly) = llm.public_coordinates();
    format!("{}:{ux},{uy}\n{}:{lx},{ly}\n", Role::User, Role::Llm)
}

// ---------------------------------------------------------------------------
// WalletStore
// ---------------------------------------------------------------------------

/// The wallet files under one [`StorageConfig`].
#[derive(Debug, Clone)]
pub struct WalletStore {
    config: StorageConfig,
    db: TableDb,
}

impl WalletStore {
    pub fn new(config: StorageConfig) -> Self {
        let db = TableDb::new(config.clone());
        Self { config, db }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// True iff the private key file holds exactly two role-tagged entries.
    pub fn exists(&self) -> bool {
        match read_text(&self.config.private_key_path()) {
            Some(text) => role_lines(&text).count() == 2,
            None => false,
        }
    }

    /// Create the wallet, or return the existing one.
    ///
    /// With `force_new == false` and a wallet already on the card, nothing is
    /// touched and the current summary comes back. Otherwise every wallet
    /// artifact is deleted and two fresh keys are generated from `OsRng`.
    pub fn initialize(&self, pin: &str, name: &str, force_new: bool) -> Result<WalletSummary, WalletError> {
        self.initialize_with_rng(pin, name, force_new, &mut OsRng)
    }

    /// [`initialize`](Self::initialize) with a caller-supplied RNG.
    pub fn initialize_with_rng<R: RngCore + CryptoRng>(
        &self,
        pin: &str,
        name: &str,
        force_new: bool,
        rng: &mut R,
    ) -> Result<WalletSummary, WalletError> {
        if !force_new && self.exists() {
            info!("wallet already initialized, keeping existing keys");
            return self.summary();
        }
        if pin.is_empty() {
            return Err(WalletError::MissingPin);
        }

        self.reset()?;

        info!("generating wallet keys");
        let user = KeyPair::generate(rng);
        let llm = KeyPair::generate(rng);

        write_atomic(
            &self.config.private_key_path(),
            format_private_keys(&user, &llm).as_bytes(),
        )?;
        write_atomic(
            &self.config.public_key_path(),
            format_public_keys(&user, &llm).as_bytes(),
        )?;
        write_atomic(&self.config.pin_path(), pin.as_bytes())?;
        write_atomic(&self.config.name_path(), name.as_bytes())?;

        self.db.create_table(TRANSACTIONS_TABLE);

        let summary = WalletSummary {
            name: name.to_string(),
            user_address: user.address(),
            llm_address: llm.address(),
        };
        info!(
            user_address = %summary.user_address,
            llm_address = %summary.llm_address,
            "wallet initialized"
        );
        Ok(summary)
    }

    /// Delete every wallet artifact. Missing files are fine.
    pub fn reset(&self) -> Result<(), WalletError> {
        for path in self.config.wallet_artifacts() {
            remove_if_exists(&path)?;
        }
        Ok(())
    }

    /// The display name, trimmed.
    pub fn name(&self) -> Result<String, WalletError> {
        read_text(&self.config.name_path())
            .map(|name| name.trim().to_string())
            .ok_or(WalletError::NotInitialized)
    }

    /// Ethereum address of `role`'s key, from the public key file.
    pub fn public_address(&self, role: Role) -> Result<String, WalletError> {
        let text = read_text(&self.config.public_key_path()).ok_or(WalletError::NotInitialized)?;
        let (_, coords) = role_lines(&text)
            .find(|(r, _)| *r == role)
            .ok_or_else(|| WalletError::PublicKeyNotFound(role.to_string()))?;

        let (x, y) = coords
            .split_once(',')
            .ok_or_else(|| WalletError::CorruptKeyFile(format!("{role} public key is not x,y")))?;
        Ok(derive_ethereum_address(&parse_decimal(role, x)?, &parse_decimal(role, y)?))
    }

    /// `role`'s key pair. The public half is re-derived, not read.
    pub fn keypair(&self, role: Role) -> Result<KeyPair, WalletError> {
        let text = read_text(&self.config.private_key_path()).ok_or(WalletError::NotInitialized)?;
        let (_, digits) = role_lines(&text)
            .find(|(r, _)| *r == role)
            .ok_or_else(|| WalletError::RoleNotFound(role.to_string()))?;

        let private = parse_decimal(role, digits)?;
        KeyPair::from_private(private)
            .map_err(|_| WalletError::CorruptKeyFile(format!("{role} private key out of range")))
    }

    /// Exact comparison against the stored PIN.
    ///
    /// Surrounding whitespace in the file (a trailing newline from a text
    /// editor, say) is ignored; the candidate is taken as-is.
    pub fn verify_pin(&self, candidate: &str) -> Result<bool, WalletError> {
        let stored = read_text(&self.config.pin_path()).ok_or(WalletError::NotInitialized)?;
        let ok = stored.trim() == candidate;
        if !ok {
            warn!("invalid PIN supplied");
        }
        Ok(ok)
    }

    /// Name and both addresses.
    pub fn summary(&self) -> Result<WalletSummary, WalletError> {
        Ok(WalletSummary {
            name: self.name()?,
            user_address: self.public_address(Role::User)?,
            llm_address: self.public_address(Role::Llm)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn temp_store() -> (TempDir, WalletStore) {
        let dir = tempdir().unwrap();
        let store = WalletStore::new(StorageConfig::new(dir.path()));
        (dir, store)
    }

    fn is_address(s: &str) -> bool {
        s.len() == 42 && s.starts_with("0x") && s[2..].chars().all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn empty_card_has_no_wallet() {
        let (_dir, store) = temp_store();
        assert!(!store.exists());
        assert!(matches!(store.name(), Err(WalletError::NotInitialized)));
        assert!(matches!(store.verify_pin("1234"), Err(WalletError::NotInitialized)));
        assert!(matches!(store.keypair(Role::User), Err(WalletError::NotInitialized)));
    }

    #[test]
    fn initialize_creates_two_distinct_keys() {
        let (_dir, store) = temp_store();
        let summary = store.initialize("1234", "Test", false).unwrap();

        assert!(store.exists());
        assert_eq!(summary.name, "Test");
        assert!(is_address(&summary.user_address));
        assert!(is_address(&summary.llm_address));
        assert_ne!(summary.user_address, summary.llm_address);
    }

    #[test]
    fn addresses_match_private_keys() {
        let (_dir, store) = temp_store();
        let summary = store.initialize("1234", "Test", false).unwrap();
        assert_eq!(store.keypair(Role::User).unwrap().address(), summary.user_address);
        assert_eq!(store.keypair(Role::Llm).unwrap().address(), summary.llm_address);
        assert_eq!(store.public_address(Role::Llm).unwrap(), summary.llm_address);
    }

    #[test]
    fn initialize_is_idempotent_without_force() {
        let (_dir, store) = temp_store();
        let first = store.initialize("1234", "Test", false).unwrap();
        let second = store.initialize("9999", "Other", false).unwrap();
        assert_eq!(first, second);
        // The PIN was not overwritten either.
        assert!(store.verify_pin("1234").unwrap());
    }

    #[test]
    fn force_new_replaces_everything() {
        let (dir, store) = temp_store();
        let first = store.initialize("1234", "Test", false).unwrap();
        fs::write(dir.path().join("transactions.json"), r#"{"old": {}}"#).unwrap();

        let second = store.initialize("4321", "Fresh", true).unwrap();
        assert_ne!(first.user_address, second.user_address);
        assert_eq!(store.name().unwrap(), "Fresh");
        assert!(store.verify_pin("4321").unwrap());
        assert!(!store.verify_pin("1234").unwrap());

        let table = fs::read_to_string(dir.path().join("transactions.json")).unwrap();
        assert_eq!(table, "{}");
    }

    #[test]
    fn seeded_rng_reproduces_addresses() {
        let (_a, store_a) = temp_store();
        let (_b, store_b) = temp_store();
        let a = store_a
            .initialize_with_rng("1", "n", false, &mut StdRng::seed_from_u64(42))
            .unwrap();
        let b = store_b
            .initialize_with_rng("1", "n", false, &mut StdRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn key_file_layout() {
        let (dir, store) = temp_store();
        store.initialize("1234", "Test", false).unwrap();

        let private = fs::read_to_string(dir.path().join("private_key.txt")).unwrap();
        let lines: Vec<_> = private.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("USER:"));
        assert!(lines[1].starts_with("LLM:"));
        assert!(lines[0][5..].chars().all(|c| c.is_ascii_digit()));

        let public = fs::read_to_string(dir.path().join("public_key.txt")).unwrap();
        assert!(public.lines().all(|l| l.split_once(',').is_some()));

        assert_eq!(fs::read_to_string(dir.path().join("pin.txt")).unwrap(), "1234");
    }

    #[test]
    fn pin_comparison_is_exact() {
        let (_dir, store) = temp_store();
        store.initialize("1234", "Test", false).unwrap();
        assert!(store.verify_pin("1234").unwrap());
        assert!(!store.verify_pin("1234 ").unwrap());
        assert!(!store.verify_pin("").unwrap());
    }

    #[test]
    fn single_key_line_is_not_a_wallet() {
        let (dir, store) = temp_store();
        fs::write(dir.path().join("private_key.txt"), "USER:5\n").unwrap();
        assert!(!store.exists());
        assert!(matches!(store.keypair(Role::Llm), Err(WalletError::RoleNotFound(r)) if r == "LLM"));
        assert_eq!(store.keypair(Role::User).unwrap().private_key(), &BigUint::from(5u32));
    }

    #[test]
    fn corrupt_key_line_is_reported() {
        let (dir, store) = temp_store();
        fs::write(dir.path().join("private_key.txt"), "USER:abc\nLLM:0\n").unwrap();
        assert!(matches!(store.keypair(Role::User), Err(WalletError::CorruptKeyFile(_))));
        assert!(matches!(store.keypair(Role::Llm), Err(WalletError::CorruptKeyFile(_))));
    }

    #[test]
    fn missing_public_role() {
        let (dir, store) = temp_store();
        fs::write(dir.path().join("public_key.txt"), "USER:1,2\n").unwrap();
        assert!(matches!(
            store.public_address(Role::Llm),
            Err(WalletError::PublicKeyNotFound(_))
        ));
    }

    #[test]
    fn empty_pin_rejected() {
        let (_dir, store) = temp_store();
        assert!(matches!(store.initialize("", "x", true), Err(WalletError::MissingPin)));
        assert!(!store.exists());
    }
}
