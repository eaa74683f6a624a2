//! # TableDb: JSON Tables on the SD Card
//!
//! A tiny document store. A catalog file lists the table names; each table
//! is one JSON object file mapping entry id to entry.
//!
//! | File               | Contents                          |
//! |--------------------|-----------------------------------|
//! | `pico_tables.json` | `["transactions", ...]`           |
//! | `<table>.json`     | `{"<id>": {...entry...}, ...}`    |
//!
//! Every operation consults the catalog first; a table that is not listed
//! does not exist, whatever files happen to be lying around.
//!
//! ## Failure policy
//!
//! Reads that fail (missing file, bad JSON) behave like an empty table.
//! Writes that fail are logged and swallowed: the previous file stays on
//! disk, and because writes are atomic it stays intact. Callers get a
//! `bool` for "did the table/entry exist", not for "did the disk cooperate".

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use super::fs::{read_json, write_json};
use crate::config::StorageConfig;

/// One table's contents: entry id → entry.
pub type Entries = Map<String, Value>;

/// Handle on the table store under one data directory.
#[derive(Debug, Clone)]
pub struct TableDb {
    config: StorageConfig,
}

impl TableDb {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn table_file(&self, table: &str) -> PathBuf {
        self.config.table_path(table)
    }

    fn persist(&self, path: &Path, value: &impl serde::Serialize) {
        if let Err(e) = write_json(path, value) {
            warn!(path = %path.display(), error = %e, "table write failed, keeping previous contents");
        }
    }

    /// Names in the catalog, or empty if the catalog is missing or corrupt.
    pub fn get_tables(&self) -> Vec<String> {
        read_json(&self.config.table_catalog_path()).unwrap_or_default()
    }

    /// Overwrite the catalog.
    pub fn set_tables(&self, tables: &[String]) {
        self.persist(&self.config.table_catalog_path(), &tables);
    }

    /// Whether `table` is in the catalog.
    pub fn has_table(&self, table: &str) -> bool {
        self.get_tables().iter().any(|t| t == table)
    }

    /// Register `table` and give it an empty backing file.
    ///
    /// Returns `false` if the table already existed; its contents are left
    /// alone in that case.
    pub fn create_table(&self, table: &str) -> bool {
        let mut tables = self.get_tables();
        if tables.iter().any(|t| t == table) {
            return false;
        }
        tables.push(table.to_string());
        self.set_tables(&tables);
        self.persist(&self.table_file(table), &Entries::new());
        debug!(table, "created table");
        true
    }

    fn load(&self, table: &str) -> Option<Entries> {
        read_json(&self.table_file(table))
    }

    /// Insert or replace an entry.
    ///
    /// `id = None` assigns a fresh UUID v4. Returns the id used, or `None`
    /// if the table does not exist.
    pub fn add_entry(&self, table: &str, entry: Value, id: Option<&str>) -> Option<String> {
        if !self.has_table(table) {
            return None;
        }
        let mut entries = self.load(table).unwrap_or_default();
        let id = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        entries.insert(id.clone(), entry);
        self.persist(&self.table_file(table), &entries);
        Some(id)
    }

    /// The entry, or `None` if the table or entry does not exist.
    pub fn get_entry(&self, table: &str, id: &str) -> Option<Value> {
        if !self.has_table(table) {
            return None;
        }
        self.load(table)?.remove(id)
    }

    /// Every entry, or empty if the table does not exist.
    pub fn get_all_entries(&self, table: &str) -> Entries {
        if !self.has_table(table) {
            return Entries::new();
        }
        self.load(table).unwrap_or_default()
    }

    /// Shallow-merge `patch`'s fields into an existing entry.
    ///
    /// Returns `false` if the table or entry does not exist. An existing
    /// entry that is not an object is replaced by the patch.
    pub fn update_entry(&self, table: &str, id: &str, patch: &Map<String, Value>) -> bool {
        if !self.has_table(table) {
            return false;
        }
        let Some(mut entries) = self.load(table) else {
            return false;
        };
        let Some(existing) = entries.get_mut(id) else {
            return false;
        };
        match existing {
            Value::Object(fields) => {
                for (key, value) in patch {
                    fields.insert(key.clone(), value.clone());
                }
            }
            other => *other = Value::Object(patch.clone()),
        }
        self.persist(&self.table_file(table), &entries);
        true
    }

    /// Remove an entry. Returns `false` if the table or entry does not exist.
    pub fn delete_entry(&self, table: &str, id: &str) -> bool {
        if !self.has_table(table) {
            return false;
        }
        let Some(mut entries) = self.load(table) else {
            return false;
        };
        if entries.remove(id).is_none() {
            return false;
        }
        self.persist(&self.table_file(table), &entries);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    fn temp_db() -> (TempDir, TableDb) {
        let dir = tempdir().unwrap();
        let db = TableDb::new(StorageConfig::new(dir.path()));
        (dir, db)
    }

    #[test]
    fn fresh_store_has_no_tables() {
        let (_dir, db) = temp_db();
        assert!(db.get_tables().is_empty());
        assert!(!db.has_table("transactions"));
    }

    #[test]
    fn create_table_once() {
        let (dir, db) = temp_db();
        assert!(db.create_table("transactions"));
        assert!(!db.create_table("transactions"));
        assert_eq!(db.get_tables(), vec!["transactions".to_string()]);
        assert!(dir.path().join("transactions.json").exists());
    }

    #[test]
    fn recreate_does_not_wipe_entries() {
        let (_dir, db) = temp_db();
        db.create_table("t");
        db.add_entry("t", json!({"a": 1}), Some("x"));
        assert!(!db.create_table("t"));
        assert_eq!(db.get_entry("t", "x"), Some(json!({"a": 1})));
    }

    #[test]
    fn entries_need_a_catalogued_table() {
        let (dir, db) = temp_db();
        // A stray file is not a table.
        std::fs::write(dir.path().join("ghost.json"), r#"{"x": {}}"#).unwrap();
        assert_eq!(db.add_entry("ghost", json!({}), Some("y")), None);
        assert_eq!(db.get_entry("ghost", "x"), None);
        assert!(db.get_all_entries("ghost").is_empty());
        assert!(!db.update_entry("ghost", "x", &Map::new()));
        assert!(!db.delete_entry("ghost", "x"));
    }

    #[test]
    fn add_with_and_without_id() {
        let (_dir, db) = temp_db();
        db.create_table("t");
        assert_eq!(db.add_entry("t", json!({"n": 1}), Some("fixed")).as_deref(), Some("fixed"));

        let generated = db.add_entry("t", json!({"n": 2}), None).unwrap();
        assert!(Uuid::parse_str(&generated).is_ok());
        assert_eq!(db.get_all_entries("t").len(), 2);
    }

    #[test]
    fn update_merges_shallowly() {
        let (_dir, db) = temp_db();
        db.create_table("t");
        db.add_entry("t", json!({"status": "Queued", "sig": [1]}), Some("id"));

        let patch = json!({"status": "Success", "hash": "0xabc"});
        assert!(db.update_entry("t", "id", patch.as_object().unwrap()));
        assert_eq!(
            db.get_entry("t", "id"),
            Some(json!({"status": "Success", "sig": [1], "hash": "0xabc"}))
        );
        assert!(!db.update_entry("t", "missing", patch.as_object().unwrap()));
    }

    #[test]
    fn delete_entry_removes_only_that_entry() {
        let (_dir, db) = temp_db();
        db.create_table("t");
        db.add_entry("t", json!(1), Some("a"));
        db.add_entry("t", json!(2), Some("b"));
        assert!(db.delete_entry("t", "a"));
        assert!(!db.delete_entry("t", "a"));
        assert_eq!(db.get_entry("t", "b"), Some(json!(2)));
    }

    #[test]
    fn corrupt_table_reads_as_empty() {
        let (dir, db) = temp_db();
        db.create_table("t");
        std::fs::write(dir.path().join("t.json"), "garbage").unwrap();
        assert!(db.get_all_entries("t").is_empty());
        assert_eq!(db.get_entry("t", "x"), None);
        // Adding starts over from an empty table.
        assert!(db.add_entry("t", json!({}), Some("x")).is_some());
        assert_eq!(db.get_all_entries("t").len(), 1);
    }
}
