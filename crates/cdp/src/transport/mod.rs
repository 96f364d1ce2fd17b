//! Transport layer - moves text frames, knows nothing about JSON-RPC
//!
//! Outbound frames go through the `Transport` trait. Inbound frames arrive on
//! a single channel; the channel ending means the connection is gone.

pub mod memory;
pub mod websocket;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;

pub use memory::{MemoryPeer, MemoryTransport};
pub use websocket::WebSocketTransport;

/// Receiving half of a connection. Exactly one consumer.
pub type Inbound = mpsc::UnboundedReceiver<String>;

/// Sending half of a duplex message connection
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one text frame
    async fn send(&self, frame: String) -> Result<()>;

    /// Close the connection. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}

pub type TransportPtr = Arc<dyn Transport>;
