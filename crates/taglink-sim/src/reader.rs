//! Scripted protocol engine.
//!
//! [`SimReader`] stands in for the external RFID engine: each
//! `run_session` call plays one [`SessionScript`] against the registered
//! event sink, honoring the abort signal between messages exactly the way
//! the real engine polls its abort flag between protocol replies.

use crate::profile::{LinkProfile, SessionPlanner};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use taglink_core::{EventSink as _, ProtocolEngine, SessionContext, SessionOutcome, TemperatureProbe};
use tracing::trace;

/// Shared tallies of what the simulated reader saw.
#[derive(Debug, Default)]
pub struct SimCounters {
    pub sessions: AtomicU64,
    pub completed: AtomicU64,
    pub aborted: AtomicU64,
    pub no_reader: AtomicU64,
}

impl SimCounters {
    pub fn sessions(&self) -> u64 {
        self.sessions.load(Ordering::Acquire)
    }

    pub fn aborted(&self) -> u64 {
        self.aborted.load(Ordering::Acquire)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn no_reader(&self) -> u64 {
        self.no_reader.load(Ordering::Acquire)
    }
}

/// Deterministic reader-side engine.
pub struct SimReader {
    planner: SessionPlanner,
    counters: Arc<SimCounters>,
}

impl SimReader {
    pub fn new(profile: LinkProfile) -> Self {
        SimReader {
            planner: SessionPlanner::new(profile),
            counters: Arc::new(SimCounters::default()),
        }
    }

    /// Handle to the tallies, valid after the reader moves into a runtime.
    pub fn counters(&self) -> Arc<SimCounters> {
        self.counters.clone()
    }
}

impl ProtocolEngine for SimReader {
    fn run_session(&mut self, ctx: SessionContext<'_>) -> SessionOutcome {
        self.counters.sessions.fetch_add(1, Ordering::AcqRel);
        let script = self.planner.next_session();
        trace!(?script, "session start");

        if script.handshakes == 0 {
            self.counters.no_reader.fetch_add(1, Ordering::AcqRel);
            return SessionOutcome::NoReader;
        }

        // Acknowledged messages first, each preceded by its handshake; the
        // abort flag is polled after every reply like the real engine does.
        for _ in 0..script.acks {
            ctx.events.on_preamble();
            ctx.events.on_ack();
            if ctx.abort.is_raised() {
                self.counters.aborted.fetch_add(1, Ordering::AcqRel);
                return SessionOutcome::Aborted;
            }
        }
        // Handshakes that never made it to an acknowledged message.
        for _ in script.acks..script.handshakes {
            ctx.events.on_preamble();
        }

        self.counters.completed.fetch_add(1, Ordering::AcqRel);
        SessionOutcome::Completed
    }
}

/// Temperature probe producing a slow deterministic ramp. Never busy, so
/// the coordinator always picks the deep sleep state.
#[derive(Debug, Default)]
pub struct RampProbe {
    value: u16,
}

impl TemperatureProbe for RampProbe {
    fn read(&mut self) -> Option<u16> {
        self.value = self.value.wrapping_add(3);
        Some(self.value)
    }
}
