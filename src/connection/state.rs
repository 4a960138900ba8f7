//! Connection lifecycle state machine and the exactly-once close notifier.
//!
//! The open flag the rest of the engine consults is an explicit
//! `{Open, Closing, Closed}` state machine with guarded transitions. All three
//! close triggers (peer close frame, transport closure, application close)
//! converge on one [`CloseNotifier`], whose compare-and-set guarantees the
//! application sees a single teardown notification.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// WebSocket connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Connection is open and ready for data transfer.
    #[default]
    Open,
    /// Close sequence started; the transport may still be tearing down.
    Closing,
    /// Connection is fully closed.
    Closed,
}

impl ConnectionState {
    /// Check if sending data is allowed in this state.
    ///
    /// Returns `true` only for `Open`. The flag flips at the *start* of the
    /// close sequence, before any network teardown completes.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Check if the connection is in an active state.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closing => write!(f, "Closing"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}

const STATE_OPEN: u8 = 0;
const STATE_CLOSING: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// Atomic cell holding the connection state.
///
/// Stored atomically because close triggers may run from a different
/// completion context than the dispatcher.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    /// Create a cell in the `Open` state.
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicU8::new(STATE_OPEN))
    }

    /// Read the current state.
    #[must_use]
    pub fn get(&self) -> ConnectionState {
        match self.0.load(Ordering::Acquire) {
            STATE_OPEN => ConnectionState::Open,
            STATE_CLOSING => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }

    /// Single source of truth for whether sends and closes are valid.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire) == STATE_OPEN
    }

    /// Guarded `Open -> Closing` transition. Returns `true` only for the one
    /// caller that initiated the close sequence.
    pub fn begin_close(&self) -> bool {
        self.0
            .compare_exchange(
                STATE_OPEN,
                STATE_CLOSING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Mark the connection fully closed, from any prior state. Returns `true`
    /// if this call performed the transition.
    pub fn finish_close(&self) -> bool {
        self.0.swap(STATE_CLOSED, Ordering::AcqRel) != STATE_CLOSED
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot teardown notification.
///
/// Fires the wrapped action exactly once regardless of how many triggers race
/// to report closure. The action is the application's `on_close` callback.
pub struct CloseNotifier {
    fired: AtomicBool,
    action: Box<dyn Fn() + Send + Sync>,
}

impl CloseNotifier {
    /// Wrap the given action.
    #[must_use]
    pub fn new(action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            fired: AtomicBool::new(false),
            action: Box::new(action),
        }
    }

    /// Invoke the action if no other trigger has fired it yet. Returns `true`
    /// if this call performed the notification.
    pub fn notify(&self) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            (self.action)();
            true
        } else {
            false
        }
    }

    /// Whether the notification has already fired.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CloseNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseNotifier")
            .field("fired", &self.has_fired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_initial_state() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), ConnectionState::Open);
        assert!(cell.is_open());
    }

    #[test]
    fn test_can_send_in_each_state() {
        assert!(ConnectionState::Open.can_send());
        assert!(!ConnectionState::Closing.can_send());
        assert!(!ConnectionState::Closed.can_send());
    }

    #[test]
    fn test_is_active() {
        assert!(ConnectionState::Open.is_active());
        assert!(ConnectionState::Closing.is_active());
        assert!(!ConnectionState::Closed.is_active());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Open.to_string(), "Open");
        assert_eq!(ConnectionState::Closing.to_string(), "Closing");
        assert_eq!(ConnectionState::Closed.to_string(), "Closed");
    }

    #[test]
    fn test_begin_close_is_exclusive() {
        let cell = StateCell::new();
        assert!(cell.begin_close());
        assert_eq!(cell.get(), ConnectionState::Closing);
        assert!(!cell.is_open());

        // second initiator loses the race
        assert!(!cell.begin_close());
    }

    #[test]
    fn test_finish_close_from_any_state() {
        let cell = StateCell::new();
        assert!(cell.finish_close());
        assert_eq!(cell.get(), ConnectionState::Closed);
        assert!(!cell.finish_close());

        let cell = StateCell::new();
        cell.begin_close();
        assert!(cell.finish_close());
        assert_eq!(cell.get(), ConnectionState::Closed);
    }

    #[test]
    fn test_begin_close_after_closed_fails() {
        let cell = StateCell::new();
        cell.finish_close();
        assert!(!cell.begin_close());
        assert_eq!(cell.get(), ConnectionState::Closed);
    }

    #[test]
    fn test_notifier_fires_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let notifier = {
            let count = count.clone();
            CloseNotifier::new(move || {
                count.fetch_add(1, Ordering::Relaxed);
            })
        };

        assert!(!notifier.has_fired());
        assert!(notifier.notify());
        assert!(!notifier.notify());
        assert!(!notifier.notify());
        assert!(notifier.has_fired());
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_notifier_fires_once_across_threads() {
        let count = Arc::new(AtomicUsize::new(0));
        let notifier = {
            let count = count.clone();
            Arc::new(CloseNotifier::new(move || {
                count.fetch_add(1, Ordering::Relaxed);
            }))
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let notifier = notifier.clone();
                std::thread::spawn(move || notifier.notify())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|fired| *fired)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
