//! The transaction ledger: one record per USER-signed request, co-signed at
//! most once per LLM call, then confirmed or failed by the host.
//!
//! ```text
//!   record_user_signature ──► Queued ──confirm──► Success
//!                               │  ▲
//!     append_cosigner_signature─┘  │
//!                               └──fail──► Failed
//! ```
//!
//! Neither `confirm` nor `fail` checks the current status, so a `Failed`
//! transaction can still be confirmed and vice versa. PIN checks happen in
//! the dispatcher, not here.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{TransactionPayload, TransactionRecord, TransactionStatus};
use crate::config::TRANSACTIONS_TABLE;
use crate::crypto::keys::EthSignature;
use crate::storage::TableDb;

/// Errors from ledger mutations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transaction {0} not found")]
    TransactionNotFound(String),

    /// The `transactions` table was never created (wallet not initialized).
    #[error("table {0} does not exist")]
    TableMissing(String),

    #[error("could not encode transaction record: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// The `transactions` table, typed.
#[derive(Debug, Clone)]
pub struct TransactionLedger {
    db: TableDb,
}

impl TransactionLedger {
    pub fn new(db: TableDb) -> Self {
        Self { db }
    }

    /// Open a new `Queued` transaction with the USER signature. Returns the
    /// fresh id.
    pub fn record_user_signature(
        &self,
        payload: TransactionPayload,
        signature: EthSignature,
    ) -> Result<String, LedgerError> {
        let id = Uuid::new_v4().to_string();
        let record = TransactionRecord::queued(id.clone(), payload, signature);
        let entry = serde_json::to_value(&record)?;

        match self.db.add_entry(TRANSACTIONS_TABLE, entry, Some(&id)) {
            Some(id) => {
                info!(transaction_id = %id, "transaction queued");
                Ok(id)
            }
            None => Err(LedgerError::TableMissing(TRANSACTIONS_TABLE.to_string())),
        }
    }

    /// Append the LLM co-signature to an existing transaction. Status is
    /// unchanged.
    pub fn append_cosigner_signature(
        &self,
        transaction_id: &str,
        signature: EthSignature,
    ) -> Result<(), LedgerError> {
        let mut record = self
            .get(transaction_id)
            .ok_or_else(|| LedgerError::TransactionNotFound(transaction_id.to_string()))?;
        record.signatures.push(signature);

        let mut patch = Map::new();
        patch.insert("signature".into(), serde_json::to_value(&record.signatures)?);
        if !self.db.update_entry(TRANSACTIONS_TABLE, transaction_id, &patch) {
            return Err(LedgerError::TransactionNotFound(transaction_id.to_string()));
        }
        info!(
            transaction_id,
            signatures = record.signatures.len(),
            "co-signature appended"
        );
        Ok(())
    }

    fn patch(&self, transaction_id: &str, fields: Value) -> bool {
        let Value::Object(patch) = fields else {
            return false;
        };
        self.db.update_entry(TRANSACTIONS_TABLE, transaction_id, &patch)
    }

    /// Mark a transaction mined. `false` if the id is unknown.
    pub fn confirm(&self, transaction_id: &str, transaction_hash: &str, nonce: Option<u64>) -> bool {
        let updated = self.patch(
            transaction_id,
            json!({
                "transaction_hash": transaction_hash,
                "transaction_status": TransactionStatus::Success,
                "nonce": nonce,
            }),
        );
        if updated {
            info!(transaction_id, transaction_hash, "transaction confirmed");
        } else {
            warn!(transaction_id, "confirm for unknown transaction");
        }
        updated
    }

    /// Mark a transaction failed. `false` if the id is unknown.
    pub fn fail(&self, transaction_id: &str) -> bool {
        let updated = self.patch(
            transaction_id,
            json!({ "transaction_status": TransactionStatus::Failed }),
        );
        if updated {
            info!(transaction_id, "transaction failed");
        } else {
            warn!(transaction_id, "fail for unknown transaction");
        }
        updated
    }

    /// One record, or `None` if missing or unreadable.
    pub fn get(&self, transaction_id: &str) -> Option<TransactionRecord> {
        let entry = self.db.get_entry(TRANSACTIONS_TABLE, transaction_id)?;
        match serde_json::from_value(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(transaction_id, error = %e, "skipping unreadable transaction record");
                None
            }
        }
    }

    /// Every readable record, keyed by id. Entries that do not parse as a
    /// record are left out, as [`get`](Self::get) does.
    pub fn get_all(&self) -> Map<String, Value> {
        let records: Map<String, Value> = self
            .db
            .get_all_entries(TRANSACTIONS_TABLE)
            .into_iter()
            .filter(|(transaction_id, entry)| match TransactionRecord::deserialize(entry) {
                Ok(_) => true,
                Err(e) => {
                    warn!(transaction_id = %transaction_id, error = %e, "skipping unreadable transaction record");
                    false
                }
            })
            .collect();
        debug!(count = records.len(), "listing transactions");
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use num_bigint::BigUint;
    use tempfile::{tempdir, TempDir};

    fn sig(v: u8) -> EthSignature {
        EthSignature::new(BigUint::from(11u32), BigUint::from(22u32), v)
    }

    fn ledger() -> (TempDir, TransactionLedger) {
        let dir = tempdir().unwrap();
        let db = TableDb::new(StorageConfig::new(dir.path()));
        db.create_table(TRANSACTIONS_TABLE);
        (dir, TransactionLedger::new(db))
    }

    fn queue(ledger: &TransactionLedger) -> String {
        ledger
            .record_user_signature(TransactionPayload::Message("hello".into()), sig(27))
            .unwrap()
    }

    #[test]
    fn new_transaction_is_queued_with_one_signature() {
        let (_dir, ledger) = ledger();
        let id = queue(&ledger);
        let record = ledger.get(&id).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.transaction_status, TransactionStatus::Queued);
        assert_eq!(record.signatures, vec![sig(27)]);
        assert_eq!(record.payload, TransactionPayload::Message("hello".into()));
    }

    #[test]
    fn ids_are_unique() {
        let (_dir, ledger) = ledger();
        let a = queue(&ledger);
        let b = queue(&ledger);
        assert_ne!(a, b);
        assert_eq!(ledger.get_all().len(), 2);
    }

    #[test]
    fn missing_table_is_an_error() {
        let dir = tempdir().unwrap();
        let ledger = TransactionLedger::new(TableDb::new(StorageConfig::new(dir.path())));
        let err = ledger
            .record_user_signature(TransactionPayload::Message("x".into()), sig(27))
            .unwrap_err();
        assert!(matches!(err, LedgerError::TableMissing(_)));
    }

    #[test]
    fn cosign_appends_without_changing_status() {
        let (_dir, ledger) = ledger();
        let id = queue(&ledger);
        ledger.append_cosigner_signature(&id, sig(28)).unwrap();

        let record = ledger.get(&id).unwrap();
        assert_eq!(record.signatures, vec![sig(27), sig(28)]);
        assert_eq!(record.transaction_status, TransactionStatus::Queued);
    }

    #[test]
    fn cosign_unknown_id() {
        let (_dir, ledger) = ledger();
        let err = ledger.append_cosigner_signature("nope", sig(28)).unwrap_err();
        assert!(matches!(err, LedgerError::TransactionNotFound(id) if id == "nope"));
    }

    #[test]
    fn confirm_sets_hash_nonce_and_status() {
        let (_dir, ledger) = ledger();
        let id = queue(&ledger);
        assert!(ledger.confirm(&id, "0xabc", Some(1)));

        let record = ledger.get(&id).unwrap();
        assert_eq!(record.transaction_status, TransactionStatus::Success);
        assert_eq!(record.transaction_hash.as_deref(), Some("0xabc"));
        assert_eq!(record.nonce, Some(1));
        assert_eq!(record.signatures.len(), 1);
    }

    #[test]
    fn fail_and_confirm_unknown() {
        let (_dir, ledger) = ledger();
        assert!(!ledger.fail("ghost"));
        assert!(!ledger.confirm("ghost", "0x1", None));
    }

    #[test]
    fn terminal_states_are_not_enforced() {
        let (_dir, ledger) = ledger();
        let id = queue(&ledger);
        assert!(ledger.fail(&id));
        assert_eq!(ledger.get(&id).unwrap().transaction_status, TransactionStatus::Failed);

        assert!(ledger.confirm(&id, "0xdef", Some(7)));
        assert_eq!(ledger.get(&id).unwrap().transaction_status, TransactionStatus::Success);

        assert!(ledger.fail(&id));
        assert_eq!(ledger.get(&id).unwrap().transaction_status, TransactionStatus::Failed);
    }

    #[test]
    fn get_all_skips_unreadable_records() {
        let dir = tempdir().unwrap();
        let db = TableDb::new(StorageConfig::new(dir.path()));
        db.create_table(TRANSACTIONS_TABLE);
        let ledger = TransactionLedger::new(db.clone());
        let id = queue(&ledger);
        db.add_entry(TRANSACTIONS_TABLE, json!({"garbage": true}), Some("broken"));

        let all = ledger.get_all();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key(&id));
        assert!(ledger.get("broken").is_none());
    }

    #[test]
    fn get_unknown_is_none() {
        let (_dir, ledger) = ledger();
        assert!(ledger.get("missing").is_none());
    }
}
