//! Error types for CDP operations
//!
//! Flat hierarchy. Only failures a caller can act on live here; malformed
//! inbound frames and unmatched replies are logged and dropped by the pump.

use thiserror::Error;

use crate::cdp::protocol::{CDPRequest, ProtocolError};

pub type Result<T> = std::result::Result<T, CDPError>;

#[derive(Error, Debug)]
pub enum CDPError {
    #[error("Invalid endpoint address {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote endpoint answered with an error reply.
    #[error("CDP request {} failed: {error}", .request.method)]
    RequestFailed {
        request: Box<CDPRequest>,
        error: ProtocolError,
    },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Request id {0} is already pending")]
    DuplicateRequestId(String),
}

impl CDPError {
    /// Protocol error details, if this is a `RequestFailed`.
    pub fn protocol_error(&self) -> Option<&ProtocolError> {
        match self {
            CDPError::RequestFailed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_connection_closed(&self) -> bool {
        matches!(self, CDPError::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_failed_display() {
        let err = CDPError::RequestFailed {
            request: Box::new(CDPRequest {
                id: 1_i64.into(),
                session_id: None,
                method: "DOM.getDocument".to_string(),
                params: json!({}),
            }),
            error: ProtocolError {
                code: Some(-32000),
                message: "DOM agent is not enabled".to_string(),
                data: None,
            },
        };

        assert_eq!(
            err.to_string(),
            "CDP request DOM.getDocument failed: -32000 - DOM agent is not enabled"
        );
        assert_eq!(err.protocol_error().and_then(|e| e.code), Some(-32000));
        assert!(!err.is_connection_closed());
    }
}
