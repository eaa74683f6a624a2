//! The command dispatcher and serve loop.
//!
//! One line in, one line out, strictly in order. A failing command answers
//! `<command>:{"error": "<message>"}` and the loop carries on; only
//! `disconnect_usb`, end of input or a hard I/O error stop it.

use serde::Serialize;
use serde_json::{json, Value};
use std::io::{self, BufRead, ErrorKind, Write};
use tracing::{debug, error, info, info_span, warn};

use super::request::{
    split_line, Command, ConfirmTransactionRequest, InitWalletRequest, SignPersonalMessageRequest,
    SignTypedDataRequest,
};
use crate::config::StorageConfig;
use crate::crypto::keys::{EthSignature, KeyPair, Role};
use crate::crypto::signatures::{
    sign_personal_message, sign_typed_data, verify_personal_message, verify_typed_data,
};
use crate::error::SignerError;
use crate::oracle::{DecisionOracle, Verdict};
use crate::storage::fs::read_text;
use crate::storage::TableDb;
use crate::transaction::{LedgerError, TransactionLedger, TransactionPayload, TypedDataPayload};
use crate::vault::WalletStore;

/// What the serve loop should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Write this line (no trailing newline) back to the host.
    Reply(String),
    /// Stop serving. Nothing is written.
    Disconnect,
}

/// Result of [`Dispatcher::cosign_with_oracle`]: the verdict, plus the
/// co-signature when it was an approval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CosignOutcome {
    #[serde(flatten)]
    pub verdict: Verdict,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<EthSignature>,
}

fn parse_role(role: &str, key_file: &str) -> Result<Role, SignerError> {
    role.parse::<Role>()
        .map_err(|_| SignerError::NotFound(format!("Role {role} not found in {key_file} key file.")))
}

fn sign_payload(keypair: &KeyPair, payload: &TransactionPayload) -> Result<EthSignature, SignerError> {
    let signature = match payload {
        TransactionPayload::Message(message) => sign_personal_message(keypair, message.as_bytes())?,
        TransactionPayload::TypedData(data) => sign_typed_data(
            keypair,
            &data.domain,
            &data.types,
            &data.primary_type,
            &data.message,
        )?,
    };
    Ok(signature)
}

fn verify_payload(keypair: &KeyPair, payload: &TransactionPayload, signature: &EthSignature) -> bool {
    match payload {
        TransactionPayload::Message(message) => {
            verify_personal_message(keypair.public_key(), message.as_bytes(), signature)
        }
        TransactionPayload::TypedData(data) => verify_typed_data(
            keypair.public_key(),
            &data.domain,
            &data.types,
            &data.primary_type,
            &data.message,
            signature,
        ),
    }
}

/// Routes wire commands to the wallet and the ledger.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: StorageConfig,
    wallet: WalletStore,
    ledger: TransactionLedger,
}

impl Dispatcher {
    pub fn new(config: StorageConfig) -> Self {
        let wallet = WalletStore::new(config.clone());
        let ledger = TransactionLedger::new(TableDb::new(config.clone()));
        Self {
            config,
            wallet,
            ledger,
        }
    }

    pub fn wallet(&self) -> &WalletStore {
        &self.wallet
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    /// Handle one raw line from the host.
    pub fn handle_line(&self, line: &str) -> Outcome {
        let (name, raw) = split_line(line);
        let _span = info_span!("command", name).entered();

        let result = Command::parse(name, raw).and_then(|command| {
            if command == Command::DisconnectUsb {
                return Ok(None);
            }
            self.execute(command).map(Some)
        });

        let body = match result {
            Ok(Some(body)) => body,
            Ok(None) => {
                info!("host requested disconnect");
                return Outcome::Disconnect;
            }
            Err(e) => {
                warn!(error = %e, "command failed");
                json!({ "error": e.to_string() })
            }
        };
        Outcome::Reply(format!("{name}:{body}"))
    }

    /// Run a parsed command and produce its JSON reply.
    pub fn execute(&self, command: Command) -> Result<Value, SignerError> {
        debug!(command = command.name(), "executing");
        match command {
            Command::IsWalletExists => Ok(json!({ "exists": self.wallet.exists() })),
            Command::InitWallet(req) => self.init_wallet(req),
            Command::GetWalletName => Ok(json!({ "name": self.wallet.name()? })),
            Command::GetPublicKey(req) => {
                let role = parse_role(&req.role, "public")?;
                Ok(json!({ "address": self.wallet.public_address(role)? }))
            }
            Command::SignPersonalMessage(req) => self.sign_personal_message(req),
            Command::SignTypedData(req) => self.sign_typed_data(req),
            Command::ConfirmTransaction(req) => Ok(json!(self.confirm_transaction(req))),
            Command::FailTransaction(req) => {
                let id = req.transaction_id.unwrap_or_default();
                Ok(json!(self.ledger.fail(&id)))
            }
            Command::GetTransaction(req) => {
                let id = req.transaction_id.unwrap_or_default();
                match self.ledger.get(&id) {
                    Some(record) => Ok(serde_json::to_value(record)?),
                    None => Ok(json!({})),
                }
            }
            Command::GetAllTransactions => Ok(Value::Object(self.ledger.get_all())),
            Command::GetSystemPrompt => Ok(json!({ "system_prompt": self.system_prompt()? })),
            Command::DisconnectUsb => Ok(Value::Null),
        }
    }

    fn init_wallet(&self, req: InitWalletRequest) -> Result<Value, SignerError> {
        let pin = req.pin.unwrap_or_default();
        let summary = self.wallet.initialize(&pin, &req.name, req.new_wallet)?;
        Ok(serde_json::to_value(summary)?)
    }

    fn require_pin(&self, pin: Option<&str>) -> Result<(), SignerError> {
        if self.wallet.verify_pin(pin.unwrap_or_default())? {
            Ok(())
        } else {
            Err(SignerError::InvalidPin)
        }
    }

    fn sign_personal_message(&self, req: SignPersonalMessageRequest) -> Result<Value, SignerError> {
        self.sign_request(
            req.pin.as_deref(),
            &req.role,
            req.transaction_id,
            TransactionPayload::Message(req.message),
        )
    }

    fn sign_typed_data(&self, req: SignTypedDataRequest) -> Result<Value, SignerError> {
        let payload = TransactionPayload::TypedData(TypedDataPayload {
            domain: req.domain,
            types: req.types,
            primary_type: req.primary_type,
            message: req.message,
        });
        self.sign_request(req.pin.as_deref(), &req.role, req.transaction_id, payload)
    }

    /// PIN, then the role's key, then (for LLM) the transaction, then sign.
    fn sign_request(
        &self,
        pin: Option<&str>,
        role: &str,
        transaction_id: Option<String>,
        payload: TransactionPayload,
    ) -> Result<Value, SignerError> {
        self.require_pin(pin)?;
        let role = parse_role(role, "private")?;
        let keypair = self.wallet.keypair(role)?;

        let (transaction_id, signature) = match role {
            Role::User => {
                let signature = sign_payload(&keypair, &payload)?;
                let id = self.ledger.record_user_signature(payload, signature.clone())?;
                (id, signature)
            }
            Role::Llm => {
                let id = transaction_id.ok_or(SignerError::MissingTransactionId)?;
                if self.ledger.get(&id).is_none() {
                    warn!(transaction_id = %id, "LLM signature for unknown transaction");
                    return Err(LedgerError::TransactionNotFound(id).into());
                }
                let signature = sign_payload(&keypair, &payload)?;
                self.ledger.append_cosigner_signature(&id, signature.clone())?;
                (id, signature)
            }
        };

        info!(role = %role, transaction_id = %transaction_id, "payload signed");
        Ok(json!({
            "transaction_id": transaction_id,
            "signature": signature,
        }))
    }

    /// `false` for a wrong PIN, a missing wallet or an unknown id.
    fn confirm_transaction(&self, req: ConfirmTransactionRequest) -> bool {
        match self.require_pin(req.pin.as_deref()) {
            Ok(()) => {}
            Err(e) => {
                warn!(error = %e, "refusing to confirm transaction");
                return false;
            }
        }
        let id = req.transaction_id.unwrap_or_default();
        self.ledger.confirm(&id, &req.transaction_hash, req.nonce)
    }

    fn system_prompt(&self) -> Result<String, SignerError> {
        read_text(&self.config.system_prompt_path())
            .ok_or_else(|| SignerError::NotFound("system prompt not found".to_string()))
    }

    /// Ask `oracle` whether the LLM role should co-sign `transaction_id`, and
    /// if so sign the stored payload and append the signature.
    ///
    /// A denial, an unreadable answer or an unreachable oracle all come back
    /// as `Ok` with `decision == false` and nothing signed.
    pub fn cosign_with_oracle(
        &self,
        oracle: &dyn DecisionOracle,
        pin: &str,
        transaction_id: &str,
        user_prompt: &str,
    ) -> Result<CosignOutcome, SignerError> {
        self.require_pin(Some(pin))?;
        let record = self
            .ledger
            .get(transaction_id)
            .ok_or_else(|| LedgerError::TransactionNotFound(transaction_id.to_string()))?;
        let system_prompt = self.system_prompt()?;

        let verdict = match oracle.decide(&system_prompt, user_prompt) {
            Ok(text) => Verdict::parse(&text),
            Err(e) => {
                warn!(error = %e, "decision oracle failed, treating as denial");
                Verdict::deny(e.to_string())
            }
        };

        if !verdict.approved() {
            info!(transaction_id, "co-signature denied");
            return Ok(CosignOutcome {
                verdict,
                transaction_id: None,
                signature: None,
            });
        }

        let keypair = self.wallet.keypair(Role::Llm)?;
        let signature = sign_payload(&keypair, &record.payload)?;
        if !verify_payload(&keypair, &record.payload, &signature) {
            error!(transaction_id, "co-signature does not verify");
            return Err(SignerError::SignatureMismatch);
        }
        self.ledger
            .append_cosigner_signature(transaction_id, signature.clone())?;

        info!(transaction_id, "co-signature approved and appended");
        Ok(CosignOutcome {
            verdict,
            transaction_id: Some(transaction_id.to_string()),
            signature: Some(signature),
        })
    }

    /// Serve the host until it disconnects or the input ends.
    ///
    /// Read timeouts from a serial port are not errors: the partial line is
    /// kept and reading resumes. Bytes that are not UTF-8 are replaced.
    pub fn serve<R: BufRead, W: Write>(&self, mut reader: R, mut writer: W) -> io::Result<()> {
        info!(data_dir = %self.config.root().display(), "serving commands");
        let mut buf = Vec::new();

        loop {
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) if buf.is_empty() => {
                    info!("input closed");
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                    continue;
                }
                Err(e) => return Err(e),
            }

            // A final line without a newline still counts.
            let at_eof = !buf.ends_with(b"\n");
            let line = String::from_utf8_lossy(&buf).into_owned();
            buf.clear();

            if !line.trim().is_empty() {
                match self.handle_line(&line) {
                    Outcome::Reply(reply) => {
                        writer.write_all(reply.as_bytes())?;
                        writer.write_all(b"\n")?;
                        writer.flush()?;
                    }
                    Outcome::Disconnect => return Ok(()),
                }
            }

            if at_eof {
                return Ok(());
            }
        }
    }
}
