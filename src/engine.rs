//! Connection upgrade: handshake negotiation and ownership transfer.
//!
//! [`connect`] is the once-per-connection entry point. It validates the
//! upgrade request against the configured endpoint, performs the handshake on
//! the live connection, and on success detaches the connection's byte stream
//! from HTTP processing: the dispatcher becomes the sole consumer of inbound
//! frames and the HTTP layer never sees traffic on this connection again.

use std::sync::Arc;

use http::Uri;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::UpgradeConfig;
use crate::connection::{CloseNotifier, OpenLatch, StateCell, WebSocket};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::handler::WebSocketHandler;
use crate::message::{CloseCode, CloseFrame};
use crate::protocol::{Frame, Handshaker, UpgradeRequest, websocket_uri};
use crate::transport::{Channel, ReadGate};

/// Everything the engine needs from the surrounding HTTP server to upgrade
/// one connection.
///
/// Built by the transport integration before routing decided this request is
/// a WebSocket upgrade. The inbound frame receiver is moved out during
/// ownership transfer, which is what makes the handoff irreversible.
pub struct UpgradeContext<C: Channel> {
    request: UpgradeRequest,
    public_address: Uri,
    channel: Arc<C>,
    gate: Arc<ReadGate>,
    inbound: mpsc::Receiver<Frame>,
    errors: mpsc::UnboundedSender<Error>,
}

impl<C: Channel> UpgradeContext<C> {
    /// Assemble an upgrade context.
    ///
    /// `inbound` is the frame pipeline fed by the transport's reader, which
    /// must honor `gate` and should be bounded at
    /// [`INBOUND_PIPELINE_CAPACITY`](crate::dispatch::INBOUND_PIPELINE_CAPACITY).
    /// `errors` is the server's generic error channel; handshake failures are
    /// reported there exactly once.
    #[must_use]
    pub fn new(
        request: UpgradeRequest,
        public_address: Uri,
        channel: Arc<C>,
        gate: Arc<ReadGate>,
        inbound: mpsc::Receiver<Frame>,
        errors: mpsc::UnboundedSender<Error>,
    ) -> Self {
        Self {
            request,
            public_address,
            channel,
            gate,
            inbound,
            errors,
        }
    }

    /// The in-flight request being upgraded.
    #[must_use]
    pub fn request(&self) -> &UpgradeRequest {
        &self.request
    }

    /// The server's externally visible base address.
    #[must_use]
    pub fn public_address(&self) -> &Uri {
        &self.public_address
    }
}

/// Upgrade one HTTP connection to a WebSocket and hand it to `handler`.
///
/// The full sequence: derive the public `ws`/`wss` URI, enable reads, perform
/// the handshake, transfer ownership of the inbound stream to the dispatcher,
/// invoke `on_open`, then release the latch that gates frame delivery. When
/// this returns the dispatcher runs for the life of the connection.
///
/// # Errors
///
/// Only configuration errors ([`Error::InvalidUpgradeUri`]) are returned
/// directly; they abort before any handshake I/O. Handshake failures are
/// reported through the context's error channel and no connection is created.
/// An `on_open` failure is recovered locally by closing with code 1011.
pub async fn connect<C, H>(
    ctx: UpgradeContext<C>,
    config: &UpgradeConfig,
    handler: Arc<H>,
) -> Result<()>
where
    C: Channel,
    H: WebSocketHandler<C>,
{
    let uri = websocket_uri(&ctx.public_address, &config.path)?;

    let mut handshaker = Handshaker::new(uri, config.max_frame_length)
        .with_allow_extensions(config.allow_extensions);
    if let Some(ref protocol) = config.subprotocol {
        handshaker = handshaker.with_subprotocol(protocol.clone());
    }

    // Earlier HTTP processing may have left the connection with reads
    // disabled; the handshake needs them on.
    ctx.gate.enable();

    let minimal = ctx.request.minimal();
    if let Err(e) = handshaker.handshake(ctx.channel.as_ref(), &minimal).await {
        warn!(uri = %handshaker.uri(), error = %e, "handshake failed");
        let _ = ctx.errors.send(e);
        return Ok(());
    }
    debug!(uri = %handshaker.uri(), "handshake complete");

    let state = Arc::new(StateCell::new());
    let notifier = {
        let handler = handler.clone();
        Arc::new(CloseNotifier::new(move || handler.on_close()))
    };

    // Transport-level close listener, registered before any application
    // callback so an on_open failure cannot leak a half-wired connection.
    {
        let channel = ctx.channel.clone();
        let state = state.clone();
        let notifier = notifier.clone();
        tokio::spawn(async move {
            channel.closed().await;
            state.finish_close();
            notifier.notify();
        });
    }

    let socket = WebSocket::new(ctx.channel.clone(), state.clone(), notifier.clone());
    let latch = OpenLatch::new();

    // Ownership transfer: the receiver moves into the dispatcher task, the
    // sole consumer of inbound frames from here on.
    let dispatcher = Dispatcher::new(
        socket.clone(),
        handler.clone(),
        ctx.gate.clone(),
        latch.clone(),
    );
    tokio::spawn(dispatcher.run(ctx.inbound));

    if let Err(e) = handler.on_open(socket).await {
        // Abort the handshake post-hoc rather than leave the socket
        // half-open: 1011 carrying the application's message.
        warn!(error = %e, "on_open failed, aborting connection");
        state.begin_close();
        let _ = handshaker
            .close(
                ctx.channel.as_ref(),
                Some(CloseFrame::new(CloseCode::InternalError, e.to_string())),
            )
            .await;
        // The closed() listener fires the notification on a clean teardown;
        // a failed one must not leave the abort unreported.
        state.finish_close();
        notifier.notify();
    }

    // Frames that arrived while on_open ran are delivered only now; after an
    // abort the dispatcher's live-channel check discards them.
    latch.release();
    Ok(())
}
