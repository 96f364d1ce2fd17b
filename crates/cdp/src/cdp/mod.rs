//! CDP (Chrome DevTools Protocol) Client Implementation
//!
//! Core principle: Single connection, multiplexed sessions.
//! Replies are matched to requests by id, events routed by method name.

pub mod client;
pub mod command;
mod dispatcher;
mod pending;
pub mod protocol;
pub mod session;

pub use client::CDPClient;
pub use command::{Command, EventParams};
pub use dispatcher::EventCallback;
pub use protocol::{
    classify, CDPEvent, CDPMessage, CDPRequest, CDPResponse, ProtocolError, RequestId, SessionId,
};
pub use session::CDPSession;
