//! # Wake Coordination
//!
//! The main loop blocks in the lowest-power state the hardware allows until
//! the interval timer wakes it. The [`WakeToken`] is the handoff: the timer
//! context raises it, the coordinator consumes it.
//!
//! The token is a counter rather than a flag so that an overrun (the timer
//! firing again before the loop woke) is observable instead of silent.
//! Consuming takes every pending raise at once; the loop then processes the
//! latest accumulated state, never a queued history, which is what makes a
//! missed wake idempotent.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// How deep the main loop may sleep while waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepDepth {
    /// Keep peripheral clocks alive; an analog conversion is in flight.
    Shallow,
    /// Everything but the wake source may stop.
    Deep,
}

/// Pick the deepest sleep state compatible with pending peripheral work.
pub fn sleep_depth(conversion_in_flight: bool) -> SleepDepth {
    if conversion_in_flight {
        SleepDepth::Shallow
    } else {
        SleepDepth::Deep
    }
}

/// Monotonic-until-consumed wake counter.
#[derive(Debug, Default)]
pub struct WakeToken {
    pending: Mutex<u32>,
    wakeup: Condvar,
}

impl WakeToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timer context: record one wake and rouse the waiter.
    pub fn raise(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        *pending = pending.saturating_add(1);
        self.wakeup.notify_one();
    }

    /// Take all pending wakes without blocking. Returns how many had
    /// accumulated; values above one mean the loop overran.
    pub fn try_consume(&self) -> u32 {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *pending)
    }

    /// Block until at least one wake is pending or `timeout` elapses, then
    /// take all pending wakes. Returns 0 on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> u32 {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if *pending == 0 {
            let (guard, _result) = self
                .wakeup
                .wait_timeout_while(pending, timeout, |p| *p == 0)
                .unwrap_or_else(|e| e.into_inner());
            pending = guard;
        }
        std::mem::take(&mut *pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn consume_drains_all_pending_raises() {
        let token = WakeToken::new();
        token.raise();
        token.raise();
        token.raise();
        assert_eq!(token.try_consume(), 3, "overrun is visible in the count");
        assert_eq!(token.try_consume(), 0, "consumption is complete");
    }

    #[test]
    fn wait_times_out_empty() {
        let token = WakeToken::new();
        assert_eq!(token.wait_timeout(Duration::from_millis(10)), 0);
    }

    #[test]
    fn wait_observes_cross_thread_raise() {
        let token = Arc::new(WakeToken::new());
        let raiser = {
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                token.raise();
            })
        };
        let consumed = token.wait_timeout(Duration::from_secs(5));
        raiser.join().unwrap();
        assert_eq!(consumed, 1);
    }

    #[test]
    fn depth_follows_conversion_state() {
        assert_eq!(sleep_depth(true), SleepDepth::Shallow);
        assert_eq!(sleep_depth(false), SleepDepth::Deep);
    }
}
