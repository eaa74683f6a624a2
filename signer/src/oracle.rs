//! # Decision Oracle
//!
//! The LLM co-signer never signs on its own say-so: something outside the
//! device (a local model on the host) reads the system prompt stored on the
//! card plus a description of the transaction and answers approve or deny.
//! This module is the seam to that collaborator.
//!
//! Models do not reliably emit clean JSON, so [`Verdict::parse`] accepts a
//! bare object, a fenced code block, or an object buried in prose. Anything
//! it cannot read as `{"decision": <bool>, ...}` becomes a denial that says
//! why.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Failures talking to the oracle itself.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("oracle failed: {0}")]
    Failed(String),
}

/// Anything that can approve or deny a co-signature.
pub trait DecisionOracle {
    /// Raw model output for a system and user prompt pair.
    fn decide(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError>;
}

/// An approve/deny answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub decision: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// Set when the answer could not be read and was turned into a denial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    /// A denial carrying `reason` as its error.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            decision: false,
            confidence_score: None,
            reasoning: None,
            error: Some(reason.into()),
        }
    }

    pub fn approved(&self) -> bool {
        self.decision
    }

    /// Read a verdict out of raw model output.
    pub fn parse(text: &str) -> Self {
        let Some(object) = extract_object(text) else {
            return Self::deny("response does not contain a JSON object");
        };
        let Some(decision) = object.get("decision") else {
            return Self::deny("response does not contain 'decision' key");
        };
        let Some(decision) = decision.as_bool() else {
            return Self::deny("'decision' is not a boolean");
        };

        Self {
            decision,
            confidence_score: object.get("confidence_score").and_then(number_like),
            reasoning: object
                .get("reasoning")
                .and_then(Value::as_str)
                .map(str::to_string),
            error: object.get("error").and_then(Value::as_str).map(str::to_string),
        }
    }
}

fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The whole text as a JSON object, or else the widest `{...}` span in it.
fn extract_object(text: &str) -> Option<Map<String, Value>> {
    let text = text.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str(text) {
        return Some(map);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
