//! Decoded WebSocket frames as handed over by the wire codec.
//!
//! The engine never parses wire bytes; the transport's codec (a trusted
//! primitive) yields complete frames and this module only classifies them.

use bytes::Bytes;

use crate::message::{CloseFrame, Message};

/// One discrete protocol-level unit on an upgraded connection.
///
/// Fragmentation is the codec's concern: `Text` and `Binary` frames arrive
/// fully reassembled.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Frame {
    /// A complete text message (UTF-8 validated by the codec).
    Text(String),
    /// A complete binary message.
    Binary(Bytes),
    /// A ping control frame (payload <= 125 bytes).
    Ping(Bytes),
    /// A pong control frame (payload <= 125 bytes).
    Pong(Bytes),
    /// A close control frame, with optional status code and reason.
    Close(Option<CloseFrame>),
}

impl Frame {
    /// Create a close frame with the given status code and reason.
    #[must_use]
    pub fn close(code: crate::message::CloseCode, reason: impl Into<String>) -> Self {
        Frame::Close(Some(CloseFrame::new(code, reason)))
    }

    /// Returns `true` if this is a data frame (text or binary).
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Frame::Text(_) | Frame::Binary(_))
    }

    /// Returns `true` if this is a control frame (ping, pong, or close).
    #[must_use]
    pub const fn is_control(&self) -> bool {
        matches!(self, Frame::Ping(_) | Frame::Pong(_) | Frame::Close(_))
    }
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Frame::Text(text),
            Message::Binary(data) => Frame::Binary(data),
        }
    }
}
