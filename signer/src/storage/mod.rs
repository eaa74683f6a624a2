//! # Storage Module
//!
//! Everything the device persists lives as plain files in one data
//! directory (the SD card on real hardware).
//!
//! ```text
//! fs.rs  : atomic whole-file writes, forgiving reads
//! db.rs  : TableDb: a catalog of named JSON tables
//! ```
//!
//! The wallet's key, PIN and name files go through `fs` directly; the
//! transaction ledger goes through `db`.

pub mod db;
pub mod fs;

pub use db::{Entries, TableDb};
