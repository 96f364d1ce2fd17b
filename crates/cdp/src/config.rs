//! Client configuration

use serde::{Deserialize, Serialize};

/// How outbound request ids are generated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Random v4 UUID strings
    #[default]
    Uuid,
    /// Per-client counter starting at 1
    Counter,
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub ws_url: String,
    pub id_strategy: IdStrategy,
    /// Largest inbound message accepted by the WebSocket layer (bytes).
    /// Screenshots and DOM snapshots routinely exceed tungstenite's default.
    pub max_message_size: Option<usize>,
    /// Buffer size of the lifecycle event bus
    pub lifecycle_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:9222/devtools/browser".to_string(),
            id_strategy: IdStrategy::Uuid,
            max_message_size: Some(64 << 20),
            lifecycle_capacity: 16,
        }
    }
}

impl ClientConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            ..Self::default()
        }
    }
}
