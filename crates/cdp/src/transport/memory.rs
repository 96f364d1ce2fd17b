//! In-memory transport
//!
//! Connects a client to a `MemoryPeer` living in the same process. The peer
//! plays the remote endpoint: it reads what the client sent and pushes
//! replies and events back. No network, deterministic ordering.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use tokio::sync::mpsc;

use super::{Inbound, Transport};
use crate::error::{CDPError, Result};

/// Client side of an in-memory connection
pub struct MemoryTransport {
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

/// Remote side of an in-memory connection
pub struct MemoryPeer {
    outbound: mpsc::UnboundedReceiver<String>,
    inbound: Option<mpsc::UnboundedSender<String>>,
}

impl MemoryTransport {
    /// Create a connected transport, its inbound stream, and the peer.
    pub fn pair() -> (Self, Inbound, MemoryPeer) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        let transport = Self {
            outbound: Mutex::new(Some(out_tx)),
        };
        let peer = MemoryPeer {
            outbound: out_rx,
            inbound: Some(in_tx),
        };
        (transport, in_rx, peer)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, frame: String) -> Result<()> {
        let outbound = self.outbound.lock().map_err(|_| CDPError::ConnectionClosed)?;
        match outbound.as_ref() {
            Some(tx) => tx.send(frame).map_err(|_| CDPError::ConnectionClosed),
            None => Err(CDPError::ConnectionClosed),
        }
    }

    async fn close(&self) -> Result<()> {
        if let Ok(mut outbound) = self.outbound.lock() {
            outbound.take();
        }
        Ok(())
    }
}

impl MemoryPeer {
    /// Next frame sent by the client, `None` once the client closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    /// Next frame sent by the client, parsed as JSON.
    pub async fn recv_json(&mut self) -> Option<Value> {
        let frame = self.recv().await?;
        serde_json::from_str(&frame).ok()
    }

    /// Deliver a frame to the client. Returns false once disconnected.
    pub fn push(&self, frame: impl Into<String>) -> bool {
        match &self.inbound {
            Some(tx) => tx.send(frame.into()).is_ok(),
            None => false,
        }
    }

    pub fn push_json(&self, value: &Value) -> bool {
        self.push(value.to_string())
    }

    /// Hang up from the remote side.
    pub fn disconnect(&mut self) {
        self.inbound.take();
    }
}
