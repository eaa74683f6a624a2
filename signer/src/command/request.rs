//! Wire request types.
//!
//! Each inbound line is `<command>:<json payload>`. Payload fields the host
//! leaves out take the device's documented defaults: `role` is `USER`,
//! `name` is `MyWallet`, `new_wallet` is false and `transaction_id` is
//! absent. Commands without arguments ignore whatever follows the colon.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::config::DEFAULT_WALLET_NAME;
use crate::crypto::keys::Role;
use crate::error::SignerError;
use crate::typed_data::TypeSchema;

fn default_role() -> String {
    Role::User.to_string()
}

fn default_wallet_name() -> String {
    DEFAULT_WALLET_NAME.to_string()
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InitWalletRequest {
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default = "default_wallet_name")]
    pub name: String,
    #[serde(default)]
    pub new_wallet: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublicKeyRequest {
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignPersonalMessageRequest {
    #[serde(default)]
    pub pin: Option<String>,
    pub message: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignTypedDataRequest {
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub domain: Value,
    #[serde(default)]
    pub types: TypeSchema,
    pub primary_type: String,
    #[serde(default)]
    pub message: Value,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfirmTransactionRequest {
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub transaction_hash: String,
    #[serde(default)]
    pub nonce: Option<u64>,
}

/// `fail_transaction` and `get_transaction`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionIdRequest {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A parsed inbound command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    IsWalletExists,
    InitWallet(InitWalletRequest),
    GetWalletName,
    GetPublicKey(PublicKeyRequest),
    SignPersonalMessage(SignPersonalMessageRequest),
    SignTypedData(SignTypedDataRequest),
    ConfirmTransaction(ConfirmTransactionRequest),
    FailTransaction(TransactionIdRequest),
    GetTransaction(TransactionIdRequest),
    GetAllTransactions,
    GetSystemPrompt,
    DisconnectUsb,
}

/// An absent or blank payload reads as `{}` so that every default applies.
fn payload<T: DeserializeOwned>(raw: &str) -> Result<T, SignerError> {
    let raw = raw.trim();
    let raw = if raw.is_empty() { "{}" } else { raw };
    Ok(serde_json::from_str(raw)?)
}

impl Command {
    /// Parse the command name and its JSON payload.
    pub fn parse(name: &str, raw: &str) -> Result<Self, SignerError> {
        let command = match name {
            "is_wallet_exists" => Command::IsWalletExists,
            "init_wallet" => Command::InitWallet(payload(raw)?),
            "get_wallet_name" => Command::GetWalletName,
            "get_public_key" => Command::GetPublicKey(payload(raw)?),
            "sign_personal_message" => Command::SignPersonalMessage(payload(raw)?),
            "sign_typed_data" => Command::SignTypedData(payload(raw)?),
            "confirm_transaction" => Command::ConfirmTransaction(payload(raw)?),
            "fail_transaction" => Command::FailTransaction(payload(raw)?),
            "get_transaction" => Command::GetTransaction(payload(raw)?),
            "get_all_transactions" => Command::GetAllTransactions,
            "get_system_prompt" => Command::GetSystemPrompt,
            "disconnect_usb" => Command::DisconnectUsb,
            other => return Err(SignerError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    /// The wire name, used as the reply prefix.
    pub fn name(&self) -> &'static str {
        match self {
            Command::IsWalletExists => "is_wallet_exists",
            Command::InitWallet(_) => "init_wallet",
            Command::GetWalletName => "get_wallet_name",
            Command::GetPublicKey(_) => "get_public_key",
            Command::SignPersonalMessage(_) => "sign_personal_message",
            Command::SignTypedData(_) => "sign_typed_data",
            Command::ConfirmTransaction(_) => "confirm_transaction",
            Command::FailTransaction(_) => "fail_transaction",
            Command::GetTransaction(_) => "get_transaction",
            Command::GetAllTransactions => "get_all_transactions",
            Command::GetSystemPrompt => "get_system_prompt",
            Command::DisconnectUsb => "disconnect_usb",
        }
    }
}

/// Split `<command>:<payload>`. A line without a colon is all command.
pub fn split_line(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(':') {
        Some((name, rest)) => (name.trim(), rest),
        None => (line, ""),
    }
}
