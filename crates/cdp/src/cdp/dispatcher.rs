//! Event dispatcher - routes unsolicited events by method name
//!
//! One handler per method; registering again replaces the old one.
//! Events nobody subscribed to are dropped, CDP emits plenty of those.

use dashmap::DashMap;
use std::sync::Arc;

use super::protocol::CDPEvent;

/// Event handler callback
pub type EventCallback = Arc<dyn Fn(&CDPEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct EventDispatcher {
    /// Key: method name (e.g., "Page.loadEventFired")
    handlers: DashMap<String, EventCallback>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the handler for `method`.
    pub fn on(&self, method: impl Into<String>, callback: EventCallback) {
        let method = method.into();
        if self.handlers.insert(method.clone(), callback).is_some() {
            tracing::debug!("Replaced handler for {}", method);
        }
    }

    pub fn off(&self, method: &str) -> bool {
        self.handlers.remove(method).is_some()
    }

    /// Invoke the handler registered for the event, if any.
    /// Returns whether a handler ran.
    pub fn dispatch(&self, event: &CDPEvent) -> bool {
        // Clone out of the map so the handler may call on()/off().
        let Some(callback) = self.handlers.get(&event.method).map(|h| h.value().clone()) else {
            tracing::trace!("No handler for event {}", event.method);
            return false;
        };
        callback(event);
        true
    }
}
