//! Protocol-level pieces of the upgrade engine: the RFC 6455 handshake and
//! the decoded frame model handed over by the wire codec.

pub mod frame;
pub mod handshake;

pub use frame::Frame;
pub use handshake::{
    HandshakeResponse, Handshaker, UpgradeRequest, WS_GUID, compute_accept_key, websocket_uri,
};
