//! CDP Protocol Types
//!
//! Wire shapes for requests, replies and events, plus the classifier that
//! sorts raw inbound frames. Payloads stay opaque `Value`s at this layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

use crate::config::IdStrategy;

/// Session ID for attached targets
pub type SessionId = String;

/// Request ID - a string or an integer, echoed back verbatim by the endpoint.
/// Fractional numeric ids are not supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        RequestId::Number(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        RequestId::String(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        RequestId::String(value)
    }
}

/// Produces ids for outbound requests.
pub(crate) enum IdGenerator {
    Uuid,
    Counter(AtomicI64),
}

impl IdGenerator {
    pub(crate) fn new(strategy: IdStrategy) -> Self {
        match strategy {
            IdStrategy::Uuid => IdGenerator::Uuid,
            IdStrategy::Counter => IdGenerator::Counter(AtomicI64::new(1)),
        }
    }

    pub(crate) fn next_id(&self) -> RequestId {
        match self {
            IdGenerator::Uuid => RequestId::String(Uuid::new_v4().to_string()),
            IdGenerator::Counter(next) => {
                RequestId::Number(next.fetch_add(1, Ordering::SeqCst))
            }
        }
    }
}

/// CDP Request sent to browser
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CDPRequest {
    pub id: RequestId,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub method: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

/// Error object carried by a failed reply
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProtocolError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProtocolError {
    /// Lenient decode: an error field that is not a well-formed error object
    /// (not an object, or without a string `message`) is kept whole in `data`.
    fn from_value(value: Value) -> Self {
        match serde_json::from_value::<ProtocolError>(value.clone()) {
            Ok(error) => error,
            Err(_) => ProtocolError {
                code: value.get("code").and_then(Value::as_i64),
                message: match &value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
                data: Some(value),
            },
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} - {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// CDP Response from browser
#[derive(Debug, Clone, PartialEq)]
pub enum CDPResponse {
    Success { id: RequestId, result: Value },
    Failure { id: RequestId, error: ProtocolError },
}

impl CDPResponse {
    pub fn id(&self) -> &RequestId {
        match self {
            CDPResponse::Success { id, .. } | CDPResponse::Failure { id, .. } => id,
        }
    }
}

/// CDP Event from browser (no request ID)
#[derive(Debug, Clone, PartialEq)]
pub struct CDPEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<SessionId>,
}

/// Outcome of classifying one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum CDPMessage {
    Response(CDPResponse),
    Event(CDPEvent),
    /// Frame is not a reply or an event; the string says why.
    Unrecognized(String),
}

/// Classify a raw inbound frame. Never fails: anything that is not a reply or
/// an event comes back as `CDPMessage::Unrecognized`.
///
/// A reply carrying both `result` and `error` is treated as a success.
pub fn classify(raw: &str) -> CDPMessage {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => return CDPMessage::Unrecognized(format!("parse error: {}", e)),
    };

    let Value::Object(mut fields) = value else {
        return CDPMessage::Unrecognized("not a JSON object".to_string());
    };

    if let Some(id) = fields.get("id") {
        if !fields.contains_key("result") && !fields.contains_key("error") {
            return CDPMessage::Unrecognized("id without result or error".to_string());
        }
        let id = match RequestId::deserialize(id) {
            Ok(id) => id,
            Err(_) => return CDPMessage::Unrecognized(format!("unsupported id {}", id)),
        };
        return CDPMessage::Response(match fields.remove("result") {
            Some(result) => CDPResponse::Success { id, result },
            None => CDPResponse::Failure {
                id,
                error: ProtocolError::from_value(fields.remove("error").unwrap_or(Value::Null)),
            },
        });
    }

    classify_event(fields)
}

fn classify_event(mut fields: Map<String, Value>) -> CDPMessage {
    let method = match fields.remove("method") {
        Some(Value::String(method)) => method,
        Some(_) => return CDPMessage::Unrecognized("method is not a string".to_string()),
        None => return CDPMessage::Unrecognized("no id and no method".to_string()),
    };
    let Some(params) = fields.remove("params") else {
        return CDPMessage::Unrecognized(format!("event {} has no params", method));
    };
    let session_id = match fields.remove("sessionId") {
        Some(Value::String(session_id)) => Some(session_id),
        _ => None,
    };

    CDPMessage::Event(CDPEvent {
        method,
        params,
        session_id,
    })
}
