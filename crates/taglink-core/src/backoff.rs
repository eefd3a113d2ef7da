//! # Backoff Scheduler
//!
//! Suppresses protocol sessions for a random, bounded number of reporting
//! intervals after the link goes poor, so the tag stops paying the fixed
//! energy cost of a session it expects to fail, while still re-probing
//! within a bounded horizon.
//!
//! ```text
//!              poor verdict, n_skip == 0
//!        ┌──────────────────────────────────┐
//!        │                                  ▼
//!   ┌─────────┐                      ┌─────────────┐
//!   │ ENGAGED │                      │ BACKING_OFF │──┐
//!   └─────────┘                      └─────────────┘  │ wake tick:
//!        ▲                                  │         │ n_skip -= 1
//!        └──────────────────────────────────┴─────────┘
//!                     n_skip reaches 0
//! ```
//!
//! A good verdict never transitions; a poor verdict while already backing
//! off never re-seeds. Seeded values are drawn from a fixed entropy table
//! and reduced modulo the configured maximum, so `0 <= n_skip < max` always
//! holds and ENGAGED is re-entered within at most `max` ticks.

use rand::rngs::SmallRng;
use rand::{RngExt as _, SeedableRng};
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use tracing::debug;

/// Length of the entropy table. On the reference hardware this is the
/// reserved info-segment random block; a power of two keeps the wrapping
/// cursor exact even across counter overflow.
pub const ENTROPY_TABLE_LEN: usize = 64;

/// Fixed read-only byte table with a rolling draw cursor.
///
/// The table contents never change after construction; only the cursor
/// advances, by exactly one per draw, wrapping at the table length.
pub struct EntropyTable {
    bytes: [u8; ENTROPY_TABLE_LEN],
    cursor: AtomicUsize,
}

impl EntropyTable {
    /// Wrap an existing table image.
    pub fn new(bytes: [u8; ENTROPY_TABLE_LEN]) -> Self {
        EntropyTable {
            bytes,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Fill a table from a seed, for hosts without a hardware table.
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut bytes = [0u8; ENTROPY_TABLE_LEN];
        for byte in bytes.iter_mut() {
            *byte = rng.random();
        }
        Self::new(bytes)
    }

    /// Take the next byte and advance the cursor.
    pub fn draw(&self) -> u8 {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % ENTROPY_TABLE_LEN;
        self.bytes[index]
    }
}

/// Fold a raw table byte into a small bounded value before the modulo.
fn fold(raw: u8) -> u16 {
    u16::from((raw & 0x0f) + (raw >> 4))
}

/// Where the scheduler currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffState {
    /// Sessions run normally.
    Engaged,
    /// Sessions are suppressed for this many more wake ticks.
    BackingOff(u16),
}

/// Randomized bounded session suppression.
///
/// Shared between the timer context, which seeds on a poor verdict, and the
/// main-loop context, which decrements on every suppressed wake. Both sides
/// operate on a single atomic, so neither can observe a half-applied
/// transition.
pub struct BackoffScheduler {
    n_skip: AtomicU16,
    max_ticks: u16,
    table: EntropyTable,
}

impl BackoffScheduler {
    /// # Panics
    /// Panics when `max_ticks` is zero; configuration validation rejects
    /// that before a scheduler is built.
    pub fn new(max_ticks: u16, table: EntropyTable) -> Self {
        assert!(max_ticks > 0, "backoff maximum must be nonzero");
        BackoffScheduler {
            n_skip: AtomicU16::new(0),
            max_ticks,
            table,
        }
    }

    pub fn state(&self) -> BackoffState {
        match self.n_skip.load(Ordering::Acquire) {
            0 => BackoffState::Engaged,
            n => BackoffState::BackingOff(n),
        }
    }

    /// Current countdown value.
    pub fn n_skip(&self) -> u16 {
        self.n_skip.load(Ordering::Acquire)
    }

    /// Timer context: react to a poor verdict. Seeds the countdown only
    /// when it is already zero; returns the seeded value when a transition
    /// to BACKING_OFF happened.
    pub fn note_poor_verdict(&self) -> Option<u16> {
        if self.n_skip.load(Ordering::Acquire) != 0 {
            return None;
        }
        let skip = fold(self.table.draw()) % self.max_ticks;
        match self
            .n_skip
            .compare_exchange(0, skip, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) if skip > 0 => {
                debug!(skip, "link poor, backing off");
                Some(skip)
            }
            _ => None,
        }
    }

    /// Main-loop context: called once per wake. Returns `true` when a
    /// session may run this tick; otherwise consumes one unit of countdown.
    pub fn should_engage(&self) -> bool {
        self.n_skip
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_err()
    }
}
