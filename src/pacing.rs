//! Call pacing: throttle and debounce.
//!
//! Both run on tokio's clock, so they follow paused time in tests.
//!
//! | Type | Behavior |
//! |------|----------|
//! | [`Throttle`] | At most one call per interval; extra calls are dropped |
//! | [`Debouncer`] | Only the last call of a burst runs, `delay` after it |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

// ============================================================================
// Throttle
// ============================================================================

/// Lets a call through only if `interval` has passed since the last one
/// that was let through.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    /// Creates a throttle. The first call always passes.
    #[inline]
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns `true` and records the call if it may proceed now.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last
            && now.duration_since(last) < self.interval
        {
            return false;
        }

        self.last = Some(now);
        true
    }

    /// Runs `f` if the throttle allows it.
    pub fn call<R>(&mut self, f: impl FnOnce() -> R) -> Option<R> {
        self.ready().then(f)
    }

    /// Returns the interval.
    #[inline]
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

// ============================================================================
// Debouncer
// ============================================================================

/// Delays a call until `delay` has passed without another call.
///
/// Each [`call`](Self::call) cancels the one scheduled before it. Must be
/// used inside a tokio runtime. Dropping the debouncer cancels any pending
/// call.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Creates a debouncer.
    #[inline]
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedules `f`, replacing any call still waiting.
    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            f();
        });

        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Cancels the pending call, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    /// Returns `true` while a call is waiting to run.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================================
// Tests
// ============================================================================
