//! Shared wire types for the BiDi/CDP bridge core.
//!
//! Everything that crosses a crate boundary lives here: the command and
//! response envelopes exchanged with BiDi clients, the event envelope, the
//! closed set of protocol error codes, and the id newtypes used to key
//! routing and subscription state.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A browsing context (tab/frame) identifier scoping events and subscriptions.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct BrowsingContextId(pub String);

impl BrowsingContextId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for BrowsingContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a virtual CDP session multiplexed over the physical transport.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CdpSessionId(pub String);

impl CdpSessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for CdpSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-chosen label partitioning event delivery streams. `None` on the
/// wire means the default, unnamed channel.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Channel(pub String);

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Incoming BiDi command envelope. Immutable once decoded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Command {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
}

/// Outgoing BiDi response envelope, tagged by `type` on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CommandResponse {
    Success {
        id: u64,
        result: Value,
    },
    Error {
        id: u64,
        error: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stacktrace: Option<String>,
    },
}

impl CommandResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self::Success { id, result }
    }

    /// The originating command id, whichever arm this is.
    pub fn id(&self) -> u64 {
        match self {
            Self::Success { id, .. } | Self::Error { id, .. } => *id,
        }
    }
}

/// Outgoing BiDi event envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Event {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Closed enumeration of protocol error kinds, serialized as the protocol's
/// space-separated strings.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "invalid argument")]
    InvalidArgument,
    #[serde(rename = "invalid session id")]
    InvalidSessionId,
    #[serde(rename = "no such frame")]
    NoSuchFrame,
    #[serde(rename = "no such intercept")]
    NoSuchIntercept,
    #[serde(rename = "unknown command")]
    UnknownCommand,
    #[serde(rename = "unknown error")]
    UnknownError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "invalid argument",
            ErrorCode::InvalidSessionId => "invalid session id",
            ErrorCode::NoSuchFrame => "no such frame",
            ErrorCode::NoSuchIntercept => "no such intercept",
            ErrorCode::UnknownCommand => "unknown command",
            ErrorCode::UnknownError => "unknown error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Protocol-shaped failure: carries the error code, a human-readable message
/// and an optional diagnostic stacktrace for unexpected internal errors.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{code}: {message}")]
pub struct ProtocolError {
    pub code: ErrorCode,
    pub message: String,
    pub stacktrace: Option<String>,
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

impl ProtocolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            stacktrace: None,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn invalid_session_id(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidSessionId, message)
    }

    pub fn no_such_frame(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoSuchFrame, message)
    }

    pub fn no_such_intercept(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoSuchIntercept, message)
    }

    pub fn unknown_command(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnknownCommand, message)
    }

    pub fn unknown_error(message: impl Into<String>, stacktrace: Option<String>) -> Self {
        Self {
            code: ErrorCode::UnknownError,
            message: message.into(),
            stacktrace,
        }
    }

    /// Shape this failure into the error response for the given command id.
    pub fn to_error_response(&self, id: u64) -> CommandResponse {
        CommandResponse::Error {
            id,
            error: self.code,
            message: self.message.clone(),
            stacktrace: self.stacktrace.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_decodes_optional_channel() {
        let cmd: Command =
            serde_json::from_value(json!({"id": 7, "method": "session.status", "params": {}}))
                .unwrap();
        assert_eq!(cmd.id, 7);
        assert_eq!(cmd.channel, None);

        let cmd: Command = serde_json::from_value(
            json!({"id": 8, "method": "session.subscribe", "params": {}, "channel": "ch1"}),
        )
        .unwrap();
        assert_eq!(cmd.channel, Some(Channel::new("ch1")));
    }

    #[test]
    fn responses_are_type_tagged() {
        let ok = CommandResponse::success(3, json!({"ready": true}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"type": "success", "id": 3, "result": {"ready": true}})
        );

        let err = ProtocolError::unknown_command("Unknown command 'foo.bar'.")
            .to_error_response(4);
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({
                "type": "error",
                "id": 4,
                "error": "unknown command",
                "message": "Unknown command 'foo.bar'.",
            })
        );
    }

    #[test]
    fn stacktrace_serialized_when_present() {
        let err = ProtocolError::unknown_error("boom", Some("trace".into())).to_error_response(1);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["error"], "unknown error");
        assert_eq!(value["stacktrace"], "trace");
    }
}
