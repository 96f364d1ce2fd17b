//! Connection lifecycle events
//!
//! Design: plain enum over a tokio broadcast channel. Subscribers that lag
//! lose old events, nobody blocks the pump.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::broadcast;

/// Who ended the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// `close()` was called or the client was dropped
    Local,
    /// The remote end hung up or the transport failed
    Remote,
}

/// Connection lifecycle events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionEvent {
    Opened,
    Closed { reason: CloseReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// Lifecycle state plus the bus that announces transitions
pub struct EventBus {
    tx: broadcast::Sender<ConnectionEvent>,
    state: AtomicU8,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            state: AtomicU8::new(ConnectionState::Connecting as u8),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Move to `Open` and announce it.
    pub(crate) fn opened(&self) {
        self.state.store(ConnectionState::Open as u8, Ordering::SeqCst);
        self.publish(ConnectionEvent::Opened);
    }

    /// Move to `Closing`. Returns false if teardown already started.
    pub(crate) fn begin_close(&self) -> bool {
        let closing = ConnectionState::Closing as u8;
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| {
                (s < closing).then_some(closing)
            })
            .is_ok()
    }

    /// Move to `Closed` and announce it.
    pub(crate) fn closed(&self, reason: CloseReason) {
        self.state.store(ConnectionState::Closed as u8, Ordering::SeqCst);
        self.publish(ConnectionEvent::Closed { reason });
    }

    fn publish(&self, event: ConnectionEvent) {
        let _ = self.tx.send(event); // Ignore error if no subscribers
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}
