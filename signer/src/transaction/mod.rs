//! # Transaction Module
//!
//! Every USER signature opens a transaction; the LLM co-signature, the
//! on-chain hash and the final status are attached to it afterwards.
//!
//! ## Architecture
//!
//! ```text
//! types.rs   : TransactionRecord, payloads, TransactionStatus
//! ledger.rs  : TransactionLedger over the `transactions` table
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Sign (USER)**: `sign_personal_message` / `sign_typed_data` with the
//!    USER role creates a `Queued` record holding one signature.
//! 2. **Co-sign (LLM)**: the same command with the LLM role and the
//!    transaction id appends a second signature.
//! 3. **Settle**: the host reports `confirm_transaction` (PIN required,
//!    stores hash and nonce) or `fail_transaction`.

pub mod ledger;
pub mod types;

pub use ledger::{LedgerError, TransactionLedger};
pub use types::{TransactionPayload, TransactionRecord, TransactionStatus, TypedDataPayload};
