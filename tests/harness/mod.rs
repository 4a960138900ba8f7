//! Test doubles for driving the upgrade engine without a network.
//!
//! `MockChannel` stands in for the transport integration: it records every
//! frame and upgrade response written to it and exposes knobs for simulating
//! transport failure. `RecordingHandler` logs the callback sequence so tests
//! can assert ordering and exactly-once properties.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use http::header::{SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_VERSION};
use http::{HeaderMap, HeaderValue, Method, Uri};
use tokio::sync::{mpsc, watch};
use tokio::time::Duration;

use wsgate::{
    Channel, Error, Frame, HandshakeResponse, InboundMessage, ReadGate, Release, Result,
    UpgradeContext, UpgradeRequest, WebSocket, WebSocketHandler,
};

/// A frame write recorded by [`MockChannel`], with the value the state probe
/// returned at write time (if a probe was installed).
#[derive(Debug, Clone)]
pub struct WrittenFrame {
    pub frame: Frame,
    pub open_at_write: Option<bool>,
}

type StateProbe = Box<dyn Fn() -> bool + Send + Sync>;

/// In-memory stand-in for one upgraded connection's transport.
pub struct MockChannel {
    open: AtomicBool,
    fail_upgrade: AtomicBool,
    fail_shutdown: AtomicBool,
    writes: Mutex<Vec<WrittenFrame>>,
    upgrade_responses: Mutex<Vec<HandshakeResponse>>,
    probe: Mutex<Option<StateProbe>>,
    closed: watch::Sender<bool>,
}

impl MockChannel {
    pub fn new() -> Arc<Self> {
        let (closed, _) = watch::channel(false);
        Arc::new(Self {
            open: AtomicBool::new(true),
            fail_upgrade: AtomicBool::new(false),
            fail_shutdown: AtomicBool::new(false),
            writes: Mutex::new(Vec::new()),
            upgrade_responses: Mutex::new(Vec::new()),
            probe: Mutex::new(None),
            closed,
        })
    }

    /// Make the next `send_upgrade_response` fail with an I/O error.
    pub fn fail_upgrade(&self) {
        self.fail_upgrade.store(true, Ordering::SeqCst);
    }

    /// Make `shutdown` fail with an I/O error. The channel then never
    /// resolves `closed()`, like a transport that died without confirming
    /// teardown.
    pub fn fail_shutdown(&self) {
        self.fail_shutdown.store(true, Ordering::SeqCst);
    }

    /// Install a probe sampled at every frame write. Tests use this to observe
    /// the connection handle's state at the moment a frame hits the wire.
    pub fn set_state_probe(&self, probe: impl Fn() -> bool + Send + Sync + 'static) {
        *self.probe.lock().unwrap() = Some(Box::new(probe));
    }

    /// Simulate the transport dying underneath the engine (peer reset).
    pub fn force_close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.closed.send_replace(true);
    }

    /// All frames written so far, in order.
    pub fn written(&self) -> Vec<WrittenFrame> {
        self.writes.lock().unwrap().clone()
    }

    /// Just the frames, without probe samples.
    pub fn written_frames(&self) -> Vec<Frame> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|w| w.frame.clone())
            .collect()
    }

    pub fn upgrade_responses(&self) -> Vec<HandshakeResponse> {
        self.upgrade_responses.lock().unwrap().clone()
    }

    pub fn was_shut_down(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Channel for MockChannel {
    async fn write_frame(&self, frame: Frame) -> Result<()> {
        let open_at_write = self.probe.lock().unwrap().as_ref().map(|p| p());
        self.writes.lock().unwrap().push(WrittenFrame {
            frame,
            open_at_write,
        });
        Ok(())
    }

    async fn send_upgrade_response(&self, response: HandshakeResponse) -> Result<()> {
        if self.fail_upgrade.swap(false, Ordering::SeqCst) {
            return Err(Error::Io("simulated upgrade write failure".into()));
        }
        self.upgrade_responses.lock().unwrap().push(response);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        if self.fail_shutdown.load(Ordering::SeqCst) {
            self.open.store(false, Ordering::SeqCst);
            return Err(Error::Io("simulated shutdown failure".into()));
        }
        self.open.store(false, Ordering::SeqCst);
        self.closed.send_replace(true);
        Ok(())
    }

    async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// One observed application callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open,
    Message(String),
    Binary(bytes::Bytes),
    Close,
}

/// Handler that records the callback sequence and exposes failure/stall knobs.
pub struct RecordingHandler {
    events: Mutex<Vec<Event>>,
    socket: Mutex<Option<WebSocket<MockChannel>>>,
    fail_open: Mutex<Option<String>>,
    open_delay: Mutex<Option<Duration>>,
    hold_releases: AtomicBool,
    held: Mutex<Vec<Release>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            socket: Mutex::new(None),
            fail_open: Mutex::new(None),
            open_delay: Mutex::new(None),
            hold_releases: AtomicBool::new(false),
            held: Mutex::new(Vec::new()),
        })
    }

    /// Make `on_open` return an application error with this message.
    pub fn fail_open(&self, message: impl Into<String>) {
        *self.fail_open.lock().unwrap() = Some(message.into());
    }

    /// Make `on_open` sleep before returning, to widen open/dispatch races.
    pub fn delay_open(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = Some(delay);
    }

    /// Stash [`Release`] tokens instead of consuming them immediately. The
    /// test then drives backpressure by calling [`release_next`].
    ///
    /// [`release_next`]: RecordingHandler::release_next
    pub fn hold_releases(&self) {
        self.hold_releases.store(true, Ordering::SeqCst);
    }

    /// Consume the oldest held token. Panics if none is held.
    pub fn release_next(&self) {
        let release = self.held.lock().unwrap().remove(0);
        release.done();
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().unwrap().len()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Close))
            .count()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// The connection handle captured in `on_open`.
    pub fn socket(&self) -> WebSocket<MockChannel> {
        self.socket
            .lock()
            .unwrap()
            .clone()
            .expect("on_open has not run")
    }
}

impl WebSocketHandler<MockChannel> for RecordingHandler {
    async fn on_open(&self, socket: WebSocket<MockChannel>) -> Result<()> {
        let delay = *self.open_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        *self.socket.lock().unwrap() = Some(socket);
        self.events.lock().unwrap().push(Event::Open);

        match self.fail_open.lock().unwrap().take() {
            Some(message) => Err(Error::app(message)),
            None => Ok(()),
        }
    }

    async fn on_message(&self, message: InboundMessage<MockChannel>, done: Release) {
        let event = if message.is_text() {
            Event::Message(message.into_text().expect("text payload"))
        } else {
            Event::Binary(message.into_binary().expect("binary payload"))
        };
        self.events.lock().unwrap().push(event);

        if self.hold_releases.load(Ordering::SeqCst) {
            self.held.lock().unwrap().push(done);
        } else {
            done.done();
        }
    }

    fn on_close(&self) {
        self.events.lock().unwrap().push(Event::Close);
    }
}

/// Poll `cond` until it holds, panicking after one second.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// A well-formed upgrade request for the given path.
pub fn valid_request(path: &str) -> UpgradeRequest {
    let mut headers = HeaderMap::new();
    headers.insert(SEC_WEBSOCKET_VERSION, HeaderValue::from_static("13"));
    headers.insert(
        SEC_WEBSOCKET_KEY,
        HeaderValue::from_static("dGhlIHNhbXBsZSBub25jZQ=="),
    );
    headers.insert(http::header::HOST, HeaderValue::from_static("example.com"));
    UpgradeRequest::new(Method::GET, path.parse().unwrap(), headers)
}

/// Everything a test needs to drive one connection through the engine.
pub struct Rig {
    pub channel: Arc<MockChannel>,
    pub gate: Arc<ReadGate>,
    pub frames: mpsc::Sender<Frame>,
    pub errors: mpsc::UnboundedReceiver<Error>,
    pub ctx: UpgradeContext<MockChannel>,
}

impl Rig {
    pub fn new(request: UpgradeRequest) -> Self {
        let channel = MockChannel::new();
        let gate = Arc::new(ReadGate::new(true));
        // Wider than the production pipeline so tests can queue several
        // frames up front; delivery pacing is still the gate's job.
        let (frames, inbound) = mpsc::channel(16);
        let (errors_tx, errors) = mpsc::unbounded_channel();

        let public_address: Uri = "http://127.0.0.1:5050/".parse().unwrap();
        let ctx = UpgradeContext::new(
            request,
            public_address,
            channel.clone(),
            gate.clone(),
            inbound,
            errors_tx,
        );

        Self {
            channel,
            gate,
            frames,
            errors,
            ctx,
        }
    }
}
