//! Chrome DevTools Protocol client core
//!
//! Sends JSON-RPC style requests over a single WebSocket, matches replies to
//! their requests by id, and routes unsolicited events to handlers by method
//! name. The protocol's method catalog is not modelled here: payloads pass
//! through as `serde_json::Value`, or as caller supplied types via
//! [`Command`] and [`EventParams`].
//!
//! ```no_run
//! use cdp::CDPClient;
//! use serde_json::json;
//!
//! # async fn run() -> cdp::Result<()> {
//! let client = CDPClient::connect("ws://localhost:9222/devtools/browser").await?;
//! client.on("Target.targetCreated", |event| println!("{:?}", event.params));
//! let version = client.call("Browser.getVersion", json!({}), None).await?;
//! println!("{}", version["product"]);
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod cdp;
pub mod config;
pub mod error;
pub mod events;
pub mod transport;

pub use cdp::{CDPClient, CDPEvent, CDPSession, Command, EventParams};
pub use config::{ClientConfig, IdStrategy};
pub use error::{CDPError, Result};
pub use events::{CloseReason, ConnectionEvent, ConnectionState, EventBus};
pub use transport::{MemoryPeer, MemoryTransport, Transport, WebSocketTransport};
