//! Per-connection state: the public handle, the lifecycle state machine, and
//! the open latch.
//!
//! ## Connection lifecycle
//!
//! 1. **Open** - after a successful handshake and ownership transfer
//! 2. **Closing** - close sequence started (peer, application, or transport)
//! 3. **Closed** - transport fully torn down; `on_close` has fired

mod handle;
mod latch;
mod state;

pub use handle::WebSocket;
pub use latch::OpenLatch;
pub use state::{CloseNotifier, ConnectionState, StateCell};
