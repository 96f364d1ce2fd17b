//! CDP Session - Represents a connection to a specific browser target
//!
//! Design: Lightweight wrapper around CDPClient with target-specific context.
//! All sessions share the same connection - no per-session overhead.

use serde_json::Value;
use std::sync::Arc;

use super::client::CDPClient;
use super::command::Command;
use super::protocol::SessionId;
use crate::error::Result;

/// CDP Session bound to a specific target
#[derive(Clone)]
pub struct CDPSession {
    /// Shared CDP client
    client: Arc<CDPClient>,

    /// Session ID assigned by the browser
    session_id: SessionId,
}

impl CDPSession {
    pub fn new(client: Arc<CDPClient>, session_id: SessionId) -> Self {
        Self { client, session_id }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn client(&self) -> &Arc<CDPClient> {
        &self.client
    }

    /// Send command within this session's context
    pub async fn send(&self, method: impl Into<String>, params: Value) -> Result<Value> {
        self.client
            .call(method, params, Some(self.session_id.clone()))
            .await
    }

    /// Send a typed command within this session's context
    pub async fn execute<C: Command>(&self, command: &C) -> Result<C::Response> {
        self.client
            .execute(command, Some(self.session_id.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::transport::MemoryTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_requests_carry_session_id() {
        let (transport, inbound, mut peer) = MemoryTransport::pair();
        let client =
            CDPClient::with_transport(Arc::new(transport), inbound, &ClientConfig::default());
        let session = client.session("8F2A");
        assert_eq!(session.session_id(), "8F2A");

        let task = {
            let session = session.clone();
            tokio::spawn(async move {
                let params = json!({"expression": "document.title", "returnByValue": true});
                session.send("Runtime.evaluate", params).await
            })
        };

        let sent = peer.recv_json().await.unwrap();
        assert_eq!(sent["sessionId"], "8F2A");
        assert_eq!(sent["method"], "Runtime.evaluate");

        peer.push_json(&json!({
            "id": sent["id"],
            "result": {"result": {"type": "string", "value": "Example"}}
        }));
        let result = task.await.unwrap().unwrap();
        assert_eq!(result["result"]["value"], "Example");
    }
}
