//! The public-facing handle for one open WebSocket connection.

use std::sync::Arc;

use tracing::debug;

use crate::connection::state::{CloseNotifier, ConnectionState, StateCell};
use crate::error::{Error, Result};
use crate::message::{CloseCode, CloseFrame, Message};
use crate::protocol::Frame;
use crate::transport::Channel;

/// One upgraded WebSocket connection.
///
/// The engine mutates the handle's state as frames arrive; the application
/// holds clones and uses them to reply or close. Cloning is cheap (shared
/// `Arc`s). The application never touches the transport directly, only
/// through these operations.
///
/// ## Example
///
/// ```rust,ignore
/// use wsgate::{Message, WebSocket};
///
/// async fn greet<C: wsgate::Channel>(socket: &WebSocket<C>) -> wsgate::Result<()> {
///     if socket.is_open() {
///         socket.send_text("welcome").await?;
///     }
///     Ok(())
/// }
/// ```
pub struct WebSocket<C: Channel> {
    channel: Arc<C>,
    state: Arc<StateCell>,
    notifier: Arc<CloseNotifier>,
}

// Manual impl: deriving would require C: Clone, but only the Arcs are cloned.
impl<C: Channel> Clone for WebSocket<C> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            state: self.state.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<C: Channel> std::fmt::Debug for WebSocket<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocket")
            .field("state", &self.state.get())
            .finish()
    }
}

impl<C: Channel> WebSocket<C> {
    pub(crate) fn new(
        channel: Arc<C>,
        state: Arc<StateCell>,
        notifier: Arc<CloseNotifier>,
    ) -> Self {
        Self {
            channel,
            state,
            notifier,
        }
    }

    /// Whether the connection is open for sending.
    ///
    /// Flips false at the start of the close sequence, before network teardown
    /// completes.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Send a data message to the peer.
    ///
    /// # Errors
    ///
    /// Fails fast with [`Error::ConnectionClosed`] once the close sequence has
    /// started, without touching the transport.
    pub async fn send(&self, message: Message) -> Result<()> {
        if !self.state.is_open() {
            return Err(Error::ConnectionClosed);
        }
        self.channel.write_frame(Frame::from(message)).await
    }

    /// Send a text message to the peer.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(Message::Text(text.into())).await
    }

    /// Send a binary message to the peer.
    pub async fn send_binary(&self, data: impl Into<bytes::Bytes>) -> Result<()> {
        self.send(Message::Binary(data.into())).await
    }

    /// Close the connection with status code 1000 and no reason.
    pub async fn close(&self) -> Result<()> {
        self.close_with(CloseCode::Normal, "").await
    }

    /// Close the connection with the given status code and reason.
    ///
    /// Writes a close frame, shuts the transport down, and fires the
    /// application's close notification once the teardown attempt resolves,
    /// successfully or not. A repeat call, or a call racing another close
    /// trigger, is a no-op.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCloseCode`] for codes RFC 6455 forbids on the wire.
    /// - Transport errors from the shutdown itself.
    pub async fn close_with(&self, code: CloseCode, reason: &str) -> Result<()> {
        if code.is_reserved() {
            return Err(Error::InvalidCloseCode(code.as_u16()));
        }

        if !self.state.begin_close() {
            return Ok(());
        }

        debug!(code = code.as_u16(), reason, "closing connection");

        // The close frame is best-effort: a peer that already dropped the
        // socket must not prevent local teardown.
        let _ = self
            .channel
            .write_frame(Frame::Close(Some(CloseFrame::new(code, reason))))
            .await;

        // Notify even when teardown fails: the connection is unusable either
        // way, and a repeat close() is already a no-op past begin_close.
        let result = self.channel.shutdown().await;
        self.state.finish_close();
        self.notifier.notify();
        result
    }

    /// Whether the underlying transport is still open. Used by the dispatcher
    /// for its live-channel check; the application should consult
    /// [`WebSocket::is_open`] instead.
    pub(crate) fn channel_open(&self) -> bool {
        self.channel.is_open()
    }

    pub(crate) fn channel(&self) -> &Arc<C> {
        &self.channel
    }

    pub(crate) fn state_cell(&self) -> &Arc<StateCell> {
        &self.state
    }

    pub(crate) fn notifier(&self) -> &Arc<CloseNotifier> {
        &self.notifier
    }
}
