//! # Device Configuration & Constants
//!
//! Every magic number on the device lives here: the secp256k1 domain
//! parameters, the signing retry bound, and the names of the files that make
//! up a wallet on the SD card.
//!
//! The storage layout is captured once in a [`StorageConfig`] built from a
//! data directory. It is handed to the wallet, the table store and the
//! dispatcher at construction and never changes afterwards. There is no
//! global "am I on the device?" switch flipping paths at runtime.

use num_bigint::BigUint;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// secp256k1 Domain Parameters
// ---------------------------------------------------------------------------

/// Field prime `p = 2^256 - 2^32 - 977`.
pub const SECP256K1_P_HEX: &str =
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F";

/// Group order `n`.
pub const SECP256K1_N_HEX: &str =
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141";

/// Generator x-coordinate.
pub const SECP256K1_GX_HEX: &str =
    "79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798";

/// Generator y-coordinate.
pub const SECP256K1_GY_HEX: &str =
    "483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8";

/// Curve equation constant: `y^2 = x^3 + 7`.
pub const SECP256K1_B: u32 = 7;

fn parse_hex_constant(hex_str: &str) -> BigUint {
    // The constants above are compile-time literals; a parse failure here is
    // a typo in this file, caught by the tests below on every build.
    BigUint::parse_bytes(hex_str.as_bytes(), 16).unwrap_or_default()
}

/// The field prime as a big integer.
pub static P: Lazy<BigUint> = Lazy::new(|| parse_hex_constant(SECP256K1_P_HEX));

/// The group order as a big integer.
pub static N: Lazy<BigUint> = Lazy::new(|| parse_hex_constant(SECP256K1_N_HEX));

/// Generator x-coordinate as a big integer.
pub static GX: Lazy<BigUint> = Lazy::new(|| parse_hex_constant(SECP256K1_GX_HEX));

/// Generator y-coordinate as a big integer.
pub static GY: Lazy<BigUint> = Lazy::new(|| parse_hex_constant(SECP256K1_GY_HEX));

/// `n / 2`, the low-s ceiling.
pub static HALF_N: Lazy<BigUint> = Lazy::new(|| &*N >> 1u32);

/// Scalar and field element width in bytes.
pub const SCALAR_LENGTH: usize = 32;

/// Ethereum address width in bytes.
pub const ADDRESS_LENGTH: usize = 20;

// ---------------------------------------------------------------------------
// Signing Parameters
// ---------------------------------------------------------------------------

/// How many RFC 6979 candidates `sign` walks before giving up. The chance of
/// needing even a second one is around 2^-128, so 50 is generous.
pub const MAX_SIGNING_ATTEMPTS: u32 = 50;

/// Added to the recovery id to form the Ethereum `v` byte.
pub const RECOVERY_ID_OFFSET: u8 = 27;

/// ERC-191 prefix for `personal_sign` messages.
pub const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

// ---------------------------------------------------------------------------
// Storage Layout
// ---------------------------------------------------------------------------

/// `ROLE:<decimal scalar>` per line.
pub const PRIVATE_KEY_FILE: &str = "private_key.txt";

/// `ROLE:<x>,<y>` per line.
pub const PUBLIC_KEY_FILE: &str = "public_key.txt";

/// The PIN, cleartext, whole file.
pub const PIN_FILE: &str = "pin.txt";

/// The wallet name, whole file.
pub const NAME_FILE: &str = "name.txt";

/// JSON array of table names.
pub const TABLE_CATALOG_FILE: &str = "pico_tables.json";

/// Prompt handed to the decision oracle by the host.
pub const SYSTEM_PROMPT_FILE: &str = "system_prompt.txt";

/// The one table the ledger uses.
pub const TRANSACTIONS_TABLE: &str = "transactions";

/// Used when `init_wallet` arrives without a name.
pub const DEFAULT_WALLET_NAME: &str = "MyWallet";

/// Where the SD card is mounted on the device.
pub const DEFAULT_DATA_DIR: &str = "/sd";

/// Resolved file locations for one wallet.
///
/// Build it once with [`StorageConfig::new`] and clone it into whoever needs
/// it. The fields are private so nobody re-points a path mid-session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Lay out the wallet files under `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The data directory itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.root.join(PRIVATE_KEY_FILE)
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.root.join(PUBLIC_KEY_FILE)
    }

    pub fn pin_path(&self) -> PathBuf {
        self.root.join(PIN_FILE)
    }

    pub fn name_path(&self) -> PathBuf {
        self.root.join(NAME_FILE)
    }

    pub fn table_catalog_path(&self) -> PathBuf {
        self.root.join(TABLE_CATALOG_FILE)
    }

    pub fn system_prompt_path(&self) -> PathBuf {
        self.root.join(SYSTEM_PROMPT_FILE)
    }

    /// Backing file for a named table: `<root>/<name>.json`.
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.json"))
    }

    /// Every file that belongs to a wallet, ledger included. Deleted as a set
    /// when the wallet is reset.
    pub fn wallet_artifacts(&self) -> Vec<PathBuf> {
        vec![
            self.private_key_path(),
            self.public_key_path(),
            self.pin_path(),
            self.name_path(),
            self.table_catalog_path(),
            self.table_path(TRANSACTIONS_TABLE),
        ]
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}
