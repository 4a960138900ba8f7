//! Message types and close codes as defined in RFC 6455.

use bytes::Bytes;

use crate::connection::WebSocket;
use crate::transport::Channel;

/// WebSocket close status code per RFC 6455 Section 7.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// Normal closure (1000). The connection successfully completed.
    #[default]
    Normal,
    /// Going away (1001). Endpoint is going away (e.g., server shutdown).
    GoingAway,
    /// Protocol error (1002). Endpoint received a malformed frame or protocol violation.
    ProtocolError,
    /// Unsupported data (1003). Endpoint received data type it cannot handle.
    UnsupportedData,
    /// Invalid payload (1007). Endpoint received a message with invalid data.
    InvalidPayload,
    /// Policy violation (1008). Endpoint received a message that violates its policy.
    PolicyViolation,
    /// Message too big (1009). Endpoint received a message too large to process.
    MessageTooBig,
    /// Mandatory extension (1010). Client expected server to negotiate an extension.
    MandatoryExtension,
    /// Internal error (1011). Server encountered an unexpected condition.
    InternalError,
    /// Custom close code (3000-4999 for applications, 1012-1014 for registered codes).
    Other(u16),
}

impl CloseCode {
    /// Create a `CloseCode` from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1007 => CloseCode::InvalidPayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1010 => CloseCode::MandatoryExtension,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    /// Get the numeric value of this close code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::MandatoryExtension => 1010,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }

    /// Check if this close code is valid for sending per RFC 6455 Section 7.4.1.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        let code = self.as_u16();
        matches!(code, 1000..=1003 | 1007..=1014 | 3000..=4999)
    }

    /// Check if this close code is reserved and MUST NOT be sent in a Close frame.
    ///
    /// Reserved codes per RFC 6455 Section 7.4.1: 1004, 1005 (No Status
    /// Received), 1006 (Abnormal Closure), 1015 (TLS Handshake).
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        let code = self.as_u16();
        matches!(code, 1004..=1006 | 1015)
    }
}

/// Close frame containing status code and optional reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// The close status code.
    pub code: CloseCode,
    /// Human-readable reason for closing (UTF-8, max 123 bytes).
    pub reason: String,
}

impl CloseFrame {
    /// Create a new close frame with the given code and reason.
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Outbound data message the application can send on an open connection.
///
/// Control frames are never sent through this type: pongs are produced by the
/// dispatcher and close frames by [`WebSocket::close_with`](crate::WebSocket::close_with).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Message {
    /// A text message (UTF-8 encoded).
    Text(String),
    /// A binary message (arbitrary bytes).
    Binary(Bytes),
}

impl Message {
    /// Create a text message.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Text(s.into())
    }

    /// Create a binary message.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Message::Binary(data.into())
    }

    /// Returns `true` if this is a text message.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Message::Text(_))
    }

    /// Returns `true` if this is a binary message.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Message::Binary(_))
    }
}

/// A classified, complete data frame ready for delivery to the application.
///
/// Carries a back-reference to the owning connection so the handler can reply
/// in place. The payload buffer is reclaimed when the message is dropped;
/// inbound reads stay paused until the accompanying
/// [`Release`](crate::dispatch::Release) token is consumed.
#[derive(Debug)]
#[non_exhaustive]
pub enum InboundMessage<C: Channel> {
    /// A complete text message.
    Text {
        /// The connection this message arrived on.
        socket: WebSocket<C>,
        /// UTF-8 payload.
        payload: String,
    },
    /// A complete binary message.
    Binary {
        /// The connection this message arrived on.
        socket: WebSocket<C>,
        /// Raw payload.
        payload: Bytes,
    },
}

impl<C: Channel> InboundMessage<C> {
    /// The connection this message arrived on.
    #[must_use]
    pub fn socket(&self) -> &WebSocket<C> {
        match self {
            InboundMessage::Text { socket, .. } | InboundMessage::Binary { socket, .. } => socket,
        }
    }

    /// Returns `true` if this is a text message.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, InboundMessage::Text { .. })
    }

    /// Returns `true` if this is a binary message.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, InboundMessage::Binary { .. })
    }

    /// Borrow the text payload, if this is a text message.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            InboundMessage::Text { payload, .. } => Some(payload),
            InboundMessage::Binary { .. } => None,
        }
    }

    /// Borrow the binary payload, if this is a binary message.
    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            InboundMessage::Binary { payload, .. } => Some(payload),
            InboundMessage::Text { .. } => None,
        }
    }

    /// Consume and return the text payload, if this is a text message.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            InboundMessage::Text { payload, .. } => Some(payload),
            InboundMessage::Binary { .. } => None,
        }
    }

    /// Consume and return the binary payload, if this is a binary message.
    #[must_use]
    pub fn into_binary(self) -> Option<Bytes> {
        match self {
            InboundMessage::Binary { payload, .. } => Some(payload),
            InboundMessage::Text { .. } => None,
        }
    }
}
