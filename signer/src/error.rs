//! Error taxonomy for the device core.
//!
//! Every command that can fail ends up as a [`SignerError`], which the
//! dispatcher renders as `{"error": "<message>"}` on the wire. Module-level
//! errors convert into it so call sites can stay on `?`.

use thiserror::Error;

use crate::crypto::field::FieldError;
use crate::crypto::signatures::SignatureError;
use crate::transaction::ledger::LedgerError;
use crate::typed_data::TypedDataError;
use crate::vault::wallet::WalletError;

/// Errors visible across the protocol boundary.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The supplied PIN does not match the stored one.
    #[error("Invalid PIN")]
    InvalidPin,

    /// A role, transaction or table does not exist.
    #[error("{0}")]
    NotFound(String),

    /// No keys or PIN on disk yet.
    #[error("Wallet not initialized. Please initialize the wallet.")]
    WalletNotInitialized,

    /// A modular inverse was requested for a non-invertible value.
    #[error("modular inverse does not exist")]
    NoInverse,

    /// Every deterministic nonce candidate was rejected.
    #[error("failed to generate signature after {attempts} attempts")]
    SigningExhausted {
        /// How many candidates were tried.
        attempts: u32,
    },

    /// An I/O error on a table or key file.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// A payload field could not be parsed or encoded.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// An LLM-role signature was requested without naming the transaction.
    #[error("No transaction ID provided for LLM signature")]
    MissingTransactionId,

    /// The command prefix is not one the device understands.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A freshly produced signature did not verify under its own key.
    #[error("signature failed verification")]
    SignatureMismatch,
}

impl From<FieldError> for SignerError {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::NoInverse => SignerError::NoInverse,
        }
    }
}

impl From<SignatureError> for SignerError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::NoInverse => SignerError::NoInverse,
            SignatureError::SigningExhausted { attempts } => {
                SignerError::SigningExhausted { attempts }
            }
            SignatureError::TypedData(e) => SignerError::MalformedInput(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(err: serde_json::Error) -> Self {
        SignerError::MalformedInput(err.to_string())
    }
}

impl From<TypedDataError> for SignerError {
    fn from(err: TypedDataError) -> Self {
        SignerError::MalformedInput(err.to_string())
    }
}

impl From<WalletError> for SignerError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::NotInitialized => SignerError::WalletNotInitialized,
            WalletError::RoleNotFound(role) => {
                SignerError::NotFound(format!("Role {role} not found in private key file."))
            }
            WalletError::PublicKeyNotFound(role) => {
                SignerError::NotFound(format!("Role {role} not found in public key file."))
            }
            WalletError::CorruptKeyFile(detail) => SignerError::StorageFailure(detail),
            WalletError::Io(e) => SignerError::StorageFailure(e.to_string()),
            WalletError::MissingPin => {
                SignerError::MalformedInput("a PIN is required to initialize the wallet".into())
            }
        }
    }
}

impl From<LedgerError> for SignerError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::TransactionNotFound(_) => {
                SignerError::NotFound("Transaction ID not found".to_string())
            }
            LedgerError::TableMissing(table) => {
                SignerError::NotFound(format!("table {table} does not exist"))
            }
            LedgerError::Encoding(e) => SignerError::StorageFailure(e.to_string()),
        }
    }
}
