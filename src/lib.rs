//! # wsgate - HTTP to WebSocket Upgrade Engine
//!
//! `wsgate` turns an in-flight HTTP request into a live WebSocket connection
//! and runs it for the application: handshake negotiation, ownership transfer
//! away from the HTTP layer, ordered frame dispatch with per-message
//! backpressure, and an exactly-once close lifecycle.
//!
//! ## Features
//!
//! - **RFC 6455 handshake** over an already-accepted connection
//! - **Irreversible ownership transfer** away from HTTP processing
//! - **Strict delivery order** with at most one data message in flight
//! - **Read-pause backpressure** driven by a per-message [`Release`] token
//! - **Exactly-once close notification** regardless of who initiated it
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wsgate::{connect, UpgradeConfig, UpgradeContext};
//!
//! let config = UpgradeConfig::new("/chat").with_subprotocol("chat.v1");
//! let ctx = UpgradeContext::new(request, public_address, channel, gate, inbound, errors);
//! connect(ctx, &config, Arc::new(handler)).await?;
//! ```

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod handler;
pub mod message;
pub mod protocol;
pub mod transport;

pub use config::{DEFAULT_MAX_FRAME_LENGTH, UpgradeConfig};
pub use connection::{ConnectionState, WebSocket};
pub use dispatch::{INBOUND_PIPELINE_CAPACITY, Release};
pub use engine::{UpgradeContext, connect};
pub use error::{Error, Result};
pub use handler::WebSocketHandler;
pub use message::{CloseCode, CloseFrame, InboundMessage, Message};
pub use protocol::{
    Frame, HandshakeResponse, Handshaker, UpgradeRequest, WS_GUID, compute_accept_key,
    websocket_uri,
};
pub use transport::{Channel, ReadGate};
