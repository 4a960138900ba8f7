//! The application callback contract.

use std::future::Future;

use crate::connection::WebSocket;
use crate::dispatch::Release;
use crate::error::Result;
use crate::message::InboundMessage;
use crate::transport::Channel;

/// Application callbacks for one WebSocket connection.
///
/// Implemented by the application, consumed by the engine. All callbacks for a
/// given connection run from that connection's dispatch context; they may
/// perform asynchronous work of their own.
///
/// ## Example
///
/// ```rust,ignore
/// use wsgate::{InboundMessage, Release, WebSocketHandler, WebSocket};
///
/// struct Echo;
///
/// impl<C: wsgate::Channel> WebSocketHandler<C> for Echo {
///     async fn on_open(&self, _socket: WebSocket<C>) -> wsgate::Result<()> {
///         Ok(())
///     }
///
///     async fn on_message(&self, message: InboundMessage<C>, done: Release) {
///         if let Some(text) = message.as_text() {
///             let _ = message.socket().send_text(text).await;
///         }
///         done.done();
///     }
///
///     fn on_close(&self) {}
/// }
/// ```
pub trait WebSocketHandler<C: Channel>: Send + Sync + 'static {
    /// Invoked once, after the handshake succeeds and the engine has taken
    /// ownership of the connection. No message is delivered before this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returning an error aborts the upgrade post-hoc: the engine sends a
    /// close frame with code 1011 carrying the error's display text.
    fn on_open(&self, socket: WebSocket<C>) -> impl Future<Output = Result<()>> + Send;

    /// Invoked for every inbound data frame, strictly in arrival order, at
    /// most one in flight per connection. Reads stay paused until `done` is
    /// consumed; a handler that never consumes it stalls this connection's
    /// inbound side permanently.
    fn on_message(&self, message: InboundMessage<C>, done: Release)
    -> impl Future<Output = ()> + Send;

    /// Invoked exactly once when the connection becomes fully closed, whether
    /// the peer, the application, or a transport error initiated it.
    fn on_close(&self);
}
