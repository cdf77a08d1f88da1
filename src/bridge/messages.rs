//! Port Message Types
//!
//! Defines the wire schema spoken over the two ports connecting the UI
//! runtime to the storage bridge: commands on the outbound port, responses
//! (and unsolicited change notifications) on the inbound port.
//!
//! Commands travel as raw JSON so a malformed message can be answered with
//! a `MalformedCommand` error response instead of being dropped at the
//! channel boundary.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::store::error::StoreError;

/// A storage operation requested by the UI runtime
///
/// Exactly the fields required by the operation must be present; extra
/// fields are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum Command {
    /// Look up the value stored under `key`
    Get { key: String },
    /// Store `value` under `key`, replacing any existing entry
    Set { key: String, value: Value },
    /// Delete the entry for `key` if present
    Remove { key: String },
    /// Delete every entry in the application's namespace
    Clear,
    /// List the keys currently present, in unspecified order
    ListKeys,
}

impl Command {
    /// Decode a wire message, producing the ready-to-send error response
    /// when the command is malformed
    pub fn decode(raw: &Value) -> Result<Self, Response> {
        serde_json::from_value(raw.clone()).map_err(|e| Response::malformed(raw, &e.to_string()))
    }

    /// The wire name of this command's operation
    pub fn operation(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::Remove { .. } => "remove",
            Command::Clear => "clear",
            Command::ListKeys => "listKeys",
        }
    }

    /// The key this command targets, if it has one
    pub fn key(&self) -> Option<&str> {
        match self {
            Command::Get { key } | Command::Set { key, .. } | Command::Remove { key } => Some(key),
            Command::Clear | Command::ListKeys => None,
        }
    }

    /// Encode this command into its wire shape
    pub fn to_wire(&self) -> Value {
        match self {
            Command::Get { key } => json!({"operation": "get", "key": key}),
            Command::Set { key, value } => {
                json!({"operation": "set", "key": key, "value": value})
            }
            Command::Remove { key } => json!({"operation": "remove", "key": key}),
            Command::Clear => json!({"operation": "clear"}),
            Command::ListKeys => json!({"operation": "listKeys"}),
        }
    }
}

/// Error kinds reported to the UI runtime
///
/// `NotFound` is a normal `get` outcome, not a failure; it travels in the
/// error slot of the wire shape so callers can distinguish it from a
/// retrieved `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    SerializationError,
    QuotaExceeded,
    StoreUnavailable,
    MalformedCommand,
}

impl From<&StoreError> for ErrorKind {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::Serialization(_) => ErrorKind::SerializationError,
            StoreError::QuotaExceeded(_, _) => ErrorKind::QuotaExceeded,
            StoreError::Unavailable(_) | StoreError::Io(_) => ErrorKind::StoreUnavailable,
        }
    }
}

/// Error payload carried inside a [`Response`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// The outcome of one command, sent back on the inbound port
///
/// Exactly one of `result` / `error` is populated. `operation` and `key`
/// echo the originating command; `notification` marks unsolicited messages
/// describing external store changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub operation: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,

    #[serde(skip_serializing_if = "is_false")]
    pub notification: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl Response {
    /// Unit success (`set`, `remove`, `clear`)
    pub fn ok(operation: &str, key: Option<&str>) -> Self {
        Self::success(operation, key, Value::Null)
    }

    /// Success carrying a retrieved value or key list
    pub fn success(operation: &str, key: Option<&str>, result: Value) -> Self {
        Self {
            operation: operation.to_string(),
            key: key.map(String::from),
            result: Some(result),
            error: None,
            notification: false,
        }
    }

    /// Normal `get` outcome for an absent key
    pub fn not_found(key: &str) -> Self {
        Self {
            operation: "get".to_string(),
            key: Some(key.to_string()),
            result: None,
            error: Some(ErrorBody {
                kind: ErrorKind::NotFound,
                message: format!("no entry for key {:?}", key),
            }),
            notification: false,
        }
    }

    /// Failure reported once to the UI runtime, never retried
    pub fn failure(operation: &str, key: Option<&str>, kind: ErrorKind, message: String) -> Self {
        Self {
            operation: operation.to_string(),
            key: key.map(String::from),
            result: None,
            error: Some(ErrorBody { kind, message }),
            notification: false,
        }
    }

    /// Immediate answer to a command that failed validation; echoes whatever
    /// operation/key text the raw message carried
    pub fn malformed(raw: &Value, message: &str) -> Self {
        let operation = raw
            .get("operation")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let key = raw.get("key").and_then(Value::as_str);

        Self::failure(operation, key, ErrorKind::MalformedCommand, message.to_string())
    }

    /// Unsolicited notification of an external store change
    pub fn change_notification(operation: &str, key: Option<&str>, result: Value) -> Self {
        Self {
            operation: operation.to_string(),
            key: key.map(String::from),
            result: Some(result),
            error: None,
            notification: true,
        }
    }

    /// True if the response reports a failure (excluding `NotFound`, which
    /// is a normal outcome)
    pub fn is_failure(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|e| e.kind != ErrorKind::NotFound)
    }
}
