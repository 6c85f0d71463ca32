//! JSON envelope protocol exchanged between the model and the agent loop
//!
//! Every user and assistant message carries exactly one envelope, a JSON
//! object whose `type` field selects the variant:
//!
//! ```text
//! {"type":"user","user":"<text>"}
//! {"type":"plan","plan":"<text>"}
//! {"type":"action","function":"<tool name>","input":"<string arg>"}
//! {"type":"observation","observation":"<string result>"}
//! {"type":"output","output":"<text>"}
//! ```
//!
//! Parsing is strict: a known tag with a missing or non-string field is
//! rejected rather than partially accepted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Tags accepted in the `type` field
pub const ENVELOPE_TYPES: &[&str] = &["user", "plan", "action", "observation", "output"];

/// A single protocol message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    User { user: String },
    Plan { plan: String },
    Action { function: String, input: String },
    Observation { observation: String },
    Output { output: String },
}

impl Envelope {
    pub fn user(text: impl Into<String>) -> Self {
        Envelope::User { user: text.into() }
    }

    pub fn observation(text: impl Into<String>) -> Self {
        Envelope::Observation {
            observation: text.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::User { .. } => "user",
            Envelope::Plan { .. } => "plan",
            Envelope::Action { .. } => "action",
            Envelope::Observation { .. } => "observation",
            Envelope::Output { .. } => "output",
        }
    }

    /// Serialize to the single-line JSON form stored in the conversation
    pub fn to_json(&self) -> String {
        // Every variant is a flat map of strings
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Why a model response could not be accepted as an envelope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("response is not a JSON object")]
    NotAnObject,
    #[error("response has no string `type` field")]
    MissingType,
    #[error("unrecognized envelope type {0:?}")]
    UnknownType(String),
    #[error("invalid `{kind}` envelope: {message}")]
    InvalidFields { kind: String, message: String },
}

/// Parse raw model output into an envelope.
///
/// Markdown code fences are stripped first since not every provider honours
/// JSON mode.
pub fn parse_envelope(raw: &str) -> Result<Envelope, ProtocolError> {
    let body = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;

    let Value::Object(map) = &value else {
        return Err(ProtocolError::NotAnObject);
    };

    let kind = map
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    if !ENVELOPE_TYPES.contains(&kind) {
        return Err(ProtocolError::UnknownType(kind.to_string()));
    }
    let kind = kind.to_string();

    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidFields {
        kind,
        message: e.to_string(),
    })
}

/// Remove a surrounding Markdown code fence, e.g. "```json\n{..}\n```".
///
/// Text without a leading fence is returned trimmed but otherwise untouched.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.split_once('\n') {
        Some((_info, body)) => body,
        // Single-line fence: drop a language tag glued to the opening fence
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}
