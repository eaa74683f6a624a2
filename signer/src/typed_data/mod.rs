//! # Typed Data Hashing
//!
//! Two ways a human-readable payload becomes a 32-byte digest the device will
//! sign:
//!
//! - **EIP-712** structured data: a type schema, a primary type, a message
//!   object and a domain. [`encode_typed_data`] produces
//!   `keccak256(0x19 0x01 ‖ domainSeparator ‖ hashStruct(message))`.
//! - **ERC-191** personal messages: [`hash_personal_message`] prefixes the
//!   message with `"\x19Ethereum Signed Message:\n<len>"` before hashing.
//!
//! Payloads arrive as JSON from the host, so values are `serde_json::Value`
//! throughout. Missing fields encode as zero words and unknown types hash
//! their text. A value that does not fit its declared type is rejected with
//! [`TypedDataError`].

mod encode;
mod personal;
mod schema;

pub use encode::{domain_separator, encode_typed_data, encode_value, hash_struct};
pub use personal::hash_personal_message;
pub use schema::{encode_type, hash_type, referenced_types};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Name of the domain struct in every EIP-712 schema.
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// One `{"name": ..., "type": ...}` member of a struct definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedField {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Struct name → ordered field list.
pub type TypeSchema = BTreeMap<String, Vec<TypedField>>;

/// The fixed four-field domain schema the device hashes domains with.
///
/// Domains with other fields (e.g. `salt`) still hash, but only these four
/// contribute.
pub fn domain_schema() -> TypeSchema {
    let mut schema = TypeSchema::new();
    schema.insert(
        DOMAIN_TYPE.to_string(),
        vec![
            TypedField::new("name", "string"),
            TypedField::new("version", "string"),
            TypedField::new("chainId", "uint256"),
            TypedField::new("verifyingContract", "address"),
        ],
    );
    schema
}

/// A value that cannot be encoded as its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypedDataError {
    #[error("cannot encode {value} as {kind}: {reason}")]
    MalformedValue {
        kind: String,
        value: String,
        reason: String,
    },
}

impl TypedDataError {
    pub(crate) fn malformed(kind: &str, value: &serde_json::Value, reason: impl Into<String>) -> Self {
        TypedDataError::MalformedValue {
            kind: kind.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
