//! Frame classification and per-message backpressure.
//!
//! The dispatcher is the sole consumer of a connection's inbound frames after
//! ownership transfer. It runs as one task per connection, which is what makes
//! the ordering guarantee hold: frames are classified strictly in arrival
//! order, and a data-frame callback must hand back its [`Release`] token
//! before the next data frame is delivered.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::connection::{OpenLatch, WebSocket};
use crate::handler::WebSocketHandler;
use crate::message::InboundMessage;
use crate::protocol::Frame;
use crate::transport::{Channel, ReadGate};

/// Capacity of the inbound frame pipeline between the transport reader and
/// the dispatcher: at most one undelivered frame is held while reads are
/// paused.
pub const INBOUND_PIPELINE_CAPACITY: usize = 1;

/// Backpressure token accompanying every delivered data message.
///
/// Consuming it re-enables reads on the connection; the message buffer itself
/// is reclaimed when the [`InboundMessage`] is dropped. The engine never
/// resumes reads on the application's behalf: an unconsumed token stalls the
/// connection's inbound side rather than dropping frames.
#[derive(Debug)]
pub struct Release {
    gate: Arc<ReadGate>,
}

impl Release {
    pub(crate) fn new(gate: Arc<ReadGate>) -> Self {
        Self { gate }
    }

    /// Signal that the message has been processed and reads may resume.
    pub fn done(self) {
        self.gate.enable();
    }
}

pub(crate) struct Dispatcher<C: Channel, H: WebSocketHandler<C>> {
    socket: WebSocket<C>,
    handler: Arc<H>,
    gate: Arc<ReadGate>,
    latch: OpenLatch,
}

impl<C: Channel, H: WebSocketHandler<C>> Dispatcher<C, H> {
    pub(crate) fn new(
        socket: WebSocket<C>,
        handler: Arc<H>,
        gate: Arc<ReadGate>,
        latch: OpenLatch,
    ) -> Self {
        Self {
            socket,
            handler,
            gate,
            latch,
        }
    }

    /// Consume inbound frames until the peer closes, the transport dies, or
    /// the frame source ends.
    pub(crate) async fn run(self, mut inbound: mpsc::Receiver<Frame>) {
        while let Some(frame) = inbound.recv().await {
            // Blocks only until on_open has returned; a no-op afterwards.
            self.latch.wait().await;

            if !self.socket.channel_open() {
                trace!("discarding frame on closed transport");
                continue;
            }

            match frame {
                Frame::Close(close_frame) => {
                    // Open flips false on classification, before the
                    // acknowledgment is written.
                    self.socket.state_cell().begin_close();
                    debug!(
                        code = close_frame.as_ref().map(|cf| cf.code.as_u16()),
                        "peer initiated close"
                    );

                    let channel = self.socket.channel();
                    let _ = channel.write_frame(Frame::Close(close_frame)).await;
                    let _ = channel.shutdown().await;
                    self.socket.state_cell().finish_close();
                    self.socket.notifier().notify();
                    break;
                }
                Frame::Ping(payload) => {
                    trace!(len = payload.len(), "ping");
                    let _ = self.socket.channel().write_frame(Frame::Pong(payload)).await;
                }
                Frame::Text(payload) => {
                    self.deliver(InboundMessage::Text {
                        socket: self.socket.clone(),
                        payload,
                    })
                    .await;
                }
                Frame::Binary(payload) => {
                    self.deliver(InboundMessage::Binary {
                        socket: self.socket.clone(),
                        payload,
                    })
                    .await;
                }
                // Pong and any future frame kinds are not ours to handle.
                _ => {}
            }
        }
    }

    /// Deliver one data message under the backpressure discipline: wait for
    /// the previous message's release, pause reads, then hand the message and
    /// its token to the application.
    async fn deliver(&self, message: InboundMessage<C>) {
        self.gate.wait_enabled().await;
        self.gate.disable();
        let done = Release::new(self.gate.clone());
        self.handler.on_message(message, done).await;
    }
}
