//! Record types for the transaction ledger.
//!
//! These are stored verbatim as JSON in the `transactions` table and sent
//! verbatim to the host by `get_transaction`, so the field names are part of
//! the wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::crypto::keys::EthSignature;
use crate::typed_data::TypeSchema;

// ---------------------------------------------------------------------------
// TransactionStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a transaction.
///
/// Every record starts `Queued`. The host moves it to `Success` once the
/// transaction is mined (`confirm_transaction`) or to `Failed` if it gave up
/// (`fail_transaction`). Neither transition checks the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Queued,
    Success,
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "Queued"),
            Self::Success => write!(f, "Success"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The EIP-712 request as the host sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedDataPayload {
    pub domain: Value,
    pub types: TypeSchema,
    pub primary_type: String,
    pub message: Value,
}

/// What was signed. Flattened into the record as either a `message` or a
/// `typed_data` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionPayload {
    /// An ERC-191 personal message.
    Message(String),
    /// An EIP-712 typed data request.
    TypedData(TypedDataPayload),
}

// ---------------------------------------------------------------------------
// TransactionRecord
// ---------------------------------------------------------------------------

/// One row of the `transactions` table.
///
/// ```json
/// {
///   "id": "…uuid…",
///   "message": "hello",
///   "signature": [{"r": "0x…", "s": "0x…", "v": 27}],
///   "transaction_hash": null,
///   "transaction_status": "Queued",
///   "nonce": null
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,

    #[serde(flatten)]
    pub payload: TransactionPayload,

    /// USER signature first, then the LLM co-signature if any. Append-only.
    #[serde(rename = "signature")]
    pub signatures: Vec<EthSignature>,

    pub transaction_hash: Option<String>,

    pub transaction_status: TransactionStatus,

    pub nonce: Option<u64>,
}

impl TransactionRecord {
    /// A fresh `Queued` record carrying its first signature.
    pub fn queued(id: String, payload: TransactionPayload, signature: EthSignature) -> Self {
        Self {
            id,
            payload,
            signatures: vec![signature],
            transaction_hash: None,
            transaction_status: TransactionStatus::Queued,
            nonce: None,
        }
    }
}
