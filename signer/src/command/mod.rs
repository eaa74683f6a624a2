//! # Command Protocol
//!
//! The host talks to the device over a serial line, one command per line:
//!
//! ```text
//! > sign_personal_message:{"pin":"1234","message":"hello"}
//! < sign_personal_message:{"transaction_id":"…","signature":{"r":"0x…","s":"0x…","v":27}}
//! ```
//!
//! | Command                 | Reply                                         |
//! |-------------------------|-----------------------------------------------|
//! | `is_wallet_exists`      | `{"exists": bool}`                            |
//! | `init_wallet`           | `{"name", "user_address", "llm_address"}`     |
//! | `get_wallet_name`       | `{"name"}`                                    |
//! | `get_public_key`        | `{"address"}`                                 |
//! | `sign_personal_message` | `{"transaction_id", "signature"}`             |
//! | `sign_typed_data`       | `{"transaction_id", "signature"}`             |
//! | `confirm_transaction`   | `true` / `false`                              |
//! | `fail_transaction`      | `true` / `false`                              |
//! | `get_transaction`       | the record, or `{}`                           |
//! | `get_all_transactions`  | `{id: record, ...}`                           |
//! | `get_system_prompt`     | `{"system_prompt"}`                           |
//! | `disconnect_usb`        | no reply; the loop ends                       |
//!
//! Any failure replies `{"error": "<message>"}` under the same prefix.

pub mod dispatcher;
pub mod request;

pub use dispatcher::{CosignOutcome, Dispatcher, Outcome};
pub use request::Command;
