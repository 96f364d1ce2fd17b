//! CDP Client - The Core Communication Layer
//!
//! Design decisions:
//! 1. One connection per client, any number of sessions multiplexed over it
//! 2. A single pump task reads inbound frames in order and routes them
//! 3. Request/response matching via ID, events go to one handler per method
//! 4. Fail fast - no retries, no queuing. Let the caller decide.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use super::command::{Command, EventParams};
use super::dispatcher::EventDispatcher;
use super::pending::{PendingGuard, PendingRequests};
use super::protocol::*;
use super::session::CDPSession;
use crate::config::ClientConfig;
use crate::error::{CDPError, Result};
use crate::events::{CloseReason, ConnectionEvent, ConnectionState, EventBus};
use crate::transport::{Inbound, TransportPtr, WebSocketTransport};

/// CDP Client - correlates requests with replies over a single connection
pub struct CDPClient {
    ids: IdGenerator,

    /// Pending requests waiting for responses
    pending: Arc<PendingRequests>,

    /// Event handlers, one per method name
    dispatcher: Arc<EventDispatcher>,

    lifecycle: Arc<EventBus>,

    transport: TransportPtr,

    /// Stops the pump. Dropping the client drops this and stops it too.
    shutdown_tx: mpsc::Sender<()>,
}

impl CDPClient {
    /// Connect to Chrome DevTools Protocol endpoint
    pub async fn connect(ws_url: &str) -> Result<Arc<Self>> {
        Self::connect_with_config(ClientConfig::new(ws_url)).await
    }

    pub async fn connect_with_config(config: ClientConfig) -> Result<Arc<Self>> {
        let lifecycle = Arc::new(EventBus::new(config.lifecycle_capacity));
        Self::connect_with_event_bus(config, lifecycle).await
    }

    /// Connect, announcing lifecycle events on a bus the caller already
    /// subscribed to. This is the only way to observe `Opened`.
    pub async fn connect_with_event_bus(
        config: ClientConfig,
        lifecycle: Arc<EventBus>,
    ) -> Result<Arc<Self>> {
        let (transport, inbound) = WebSocketTransport::connect(&config).await?;
        Ok(Self::with_event_bus(
            Arc::new(transport),
            inbound,
            &config,
            lifecycle,
        ))
    }

    /// Build a client over an already open transport.
    ///
    /// Spawns the inbound pump, so this must run inside a tokio runtime.
    pub fn with_transport(
        transport: TransportPtr,
        inbound: Inbound,
        config: &ClientConfig,
    ) -> Arc<Self> {
        let lifecycle = Arc::new(EventBus::new(config.lifecycle_capacity));
        Self::with_event_bus(transport, inbound, config, lifecycle)
    }

    /// Like `with_transport`, publishing lifecycle events on `lifecycle`.
    /// Subscribe before calling to receive `Opened`.
    pub fn with_event_bus(
        transport: TransportPtr,
        inbound: Inbound,
        config: &ClientConfig,
        lifecycle: Arc<EventBus>,
    ) -> Arc<Self> {
        let pending = Arc::new(PendingRequests::new());
        let dispatcher = Arc::new(EventDispatcher::new());
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        lifecycle.opened();

        tokio::spawn(pump(
            inbound,
            shutdown_rx,
            pending.clone(),
            dispatcher.clone(),
            lifecycle.clone(),
            transport.clone(),
        ));

        Arc::new(Self {
            ids: IdGenerator::new(config.id_strategy),
            pending,
            dispatcher,
            lifecycle,
            transport,
            shutdown_tx,
        })
    }

    /// Send CDP request and wait for response
    ///
    /// Resolves with the raw `result` payload. An error reply becomes
    /// `CDPError::RequestFailed`; losing the connection first becomes
    /// `CDPError::ConnectionClosed`.
    pub async fn call(
        &self,
        method: impl Into<String>,
        params: Value,
        session_id: Option<SessionId>,
    ) -> Result<Value> {
        let request = CDPRequest {
            id: self.ids.next_id(),
            session_id,
            method: method.into(),
            params,
        };
        let json = serde_json::to_string(&request)?;
        let id = request.id.clone();
        tracing::debug!("-> {} {}", id, request.method);

        // Registered before sending so a fast reply always finds its entry
        let rx = self.pending.register(request)?;
        let _guard = PendingGuard::new(&self.pending, id);

        self.transport.send(json).await?;

        rx.await.map_err(|_| CDPError::ConnectionClosed)?
    }

    /// Send a typed command and decode its result
    pub async fn execute<C: Command>(
        &self,
        command: &C,
        session_id: Option<SessionId>,
    ) -> Result<C::Response> {
        let params = serde_json::to_value(command)?;
        let result = self.call(C::METHOD, params, session_id).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Register the handler for an event method, replacing any previous one.
    ///
    /// Handlers run on the pump: a slow handler delays every later message.
    /// Spawn a task for anything that waits.
    pub fn on<F>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(&CDPEvent) + Send + Sync + 'static,
    {
        self.dispatcher.on(method, Arc::new(handler));
    }

    /// Register a handler receiving decoded params of `E`
    pub fn on_event<E, F>(&self, handler: F)
    where
        E: EventParams + 'static,
        F: Fn(E) + Send + Sync + 'static,
    {
        self.on(E::METHOD, move |event: &CDPEvent| {
            match serde_json::from_value::<E>(event.params.clone()) {
                Ok(params) => handler(params),
                Err(e) => tracing::warn!("Failed to decode {} params: {}", event.method, e),
            }
        });
    }

    /// Remove the handler for an event method
    pub fn off(&self, method: &str) -> bool {
        self.dispatcher.off(method)
    }

    /// Handle bound to a target session
    pub fn session(self: &Arc<Self>, session_id: impl Into<SessionId>) -> CDPSession {
        CDPSession::new(self.clone(), session_id.into())
    }

    pub fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    /// Subscribe to connection lifecycle events.
    ///
    /// Only events after this call are seen; the client is already open by
    /// now. Use `with_event_bus` to catch `Opened`.
    pub fn lifecycle(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.lifecycle.subscribe()
    }

    /// Number of requests still waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Close connection. Every pending call fails with `ConnectionClosed`.
    /// Calling it again is a no-op.
    pub async fn close(&self) -> Result<()> {
        if !self.lifecycle.begin_close() {
            return Ok(());
        }

        let failed = self.pending.close_all();
        if failed > 0 {
            tracing::info!("Closing with {} pending requests", failed);
        }

        let result = self.transport.close().await;
        let _ = self.shutdown_tx.try_send(());
        self.lifecycle.closed(CloseReason::Local);
        result
    }
}

/// Inbound pump: one message at a time, in arrival order.
async fn pump(
    mut inbound: Inbound,
    mut shutdown_rx: mpsc::Receiver<()>,
    pending: Arc<PendingRequests>,
    dispatcher: Arc<EventDispatcher>,
    lifecycle: Arc<EventBus>,
    transport: TransportPtr,
) {
    let reason = loop {
        tokio::select! {
            msg = inbound.recv() => match msg {
                Some(text) => handle_message(&text, &pending, &dispatcher),
                None => {
                    tracing::info!("Connection closed by remote");
                    break CloseReason::Remote;
                }
            },
            _ = shutdown_rx.recv() => {
                tracing::debug!("Shutdown signal received");
                break CloseReason::Local;
            }
        }
    };

    // close() already tore everything down if it got here first
    if lifecycle.begin_close() {
        let failed = pending.close_all();
        if failed > 0 {
            tracing::warn!("Failed {} pending requests: connection closed", failed);
        }
        if let Err(e) = transport.close().await {
            tracing::debug!("Transport close after disconnect: {}", e);
        }
        lifecycle.closed(reason);
    }
}

/// Classify one inbound frame and route it
fn handle_message(text: &str, pending: &PendingRequests, dispatcher: &EventDispatcher) {
    match classify(text) {
        CDPMessage::Response(response) => {
            let id = response.id().clone();
            tracing::debug!("<- {}", id);
            if !pending.complete(response) {
                tracing::warn!("Received response for unknown request: {}", id);
            }
        }
        CDPMessage::Event(event) => {
            tracing::trace!("<- event {}", event.method);
            dispatcher.dispatch(&event);
        }
        CDPMessage::Unrecognized(reason) => {
            tracing::warn!("Discarding unrecognized message ({}): {:.200}", reason, text);
        }
    }
}
