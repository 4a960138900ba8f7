//! The seam between the engine and the wire transport.
//!
//! The engine never touches raw bytes. A [`Channel`] is the frame-level view
//! of one upgraded connection, implemented by the transport integration that
//! owns the socket and the wire codec. Inbound frames reach the engine through
//! a bounded `tokio::sync::mpsc` channel whose reader task honors the shared
//! [`ReadGate`], giving the transport a pause/resume primitive.

use std::future::Future;

use tokio::sync::watch;

use crate::error::Result;
use crate::protocol::{Frame, HandshakeResponse};

/// Frame-level handle to one connection's underlying byte-stream channel.
///
/// Implementations wrap the socket plus the trusted wire codec. All methods
/// take `&self` so the engine and the application-facing
/// [`WebSocket`](crate::WebSocket) handle can share one instance behind an
/// `Arc`; writes may therefore be issued concurrently with reads.
///
/// Futures are required to be `Send` because the engine drives them from
/// spawned tasks.
pub trait Channel: Send + Sync + 'static {
    /// Encode and write one frame to the peer.
    fn write_frame(&self, frame: Frame) -> impl Future<Output = Result<()>> + Send;

    /// Write the `101 Switching Protocols` response. The transport switches
    /// from HTTP to frame encoding once this resolves.
    fn send_upgrade_response(
        &self,
        response: HandshakeResponse,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Close the underlying transport. Resolves when teardown has completed.
    fn shutdown(&self) -> impl Future<Output = Result<()>> + Send;

    /// Resolves when the transport has fully closed, whatever the cause
    /// (local shutdown, peer reset, network error).
    fn closed(&self) -> impl Future<Output = ()> + Send;

    /// Whether the underlying transport is still open.
    fn is_open(&self) -> bool;
}

/// Read-enable toggle for one connection.
///
/// The transport's frame reader awaits [`ReadGate::wait_enabled`] before
/// pulling the next frame off the wire; the dispatcher disables the gate
/// before each data-frame callback and the application re-enables it through
/// the [`Release`](crate::dispatch::Release) token. This turns the push-based
/// inbound stream into an application-paced pull.
#[derive(Debug)]
pub struct ReadGate {
    changed: watch::Sender<bool>,
}

impl ReadGate {
    /// Create a gate in the given initial state. Connections handed over from
    /// HTTP processing may arrive with reads disabled.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        let (changed, _) = watch::channel(enabled);
        Self { changed }
    }

    /// Enable reads and wake anything waiting on the gate.
    pub fn enable(&self) {
        self.changed.send_replace(true);
    }

    /// Disable reads. The next data frame will not be pulled until
    /// [`ReadGate::enable`] is called.
    pub fn disable(&self) {
        self.changed.send_replace(false);
    }

    /// Current state of the gate.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        *self.changed.borrow()
    }

    /// Wait until the gate is enabled. Returns immediately if it already is.
    pub async fn wait_enabled(&self) {
        let mut rx = self.changed.subscribe();
        // wait_for checks the current value first, so an enable() racing with
        // the subscription cannot be missed.
        let _ = rx.wait_for(|enabled| *enabled).await;
    }
}

impl Default for ReadGate {
    fn default() -> Self {
        Self::new(true)
    }
}
