//! # Sliding Success Window
//!
//! Ring of per-slot success counters fed by the protocol engine's callbacks
//! and drained once per reporting interval.
//!
//! ## Concurrency discipline
//!
//! The window is shared between the engine's callback context (increments)
//! and the timer context (advance and drain). It uses lock-free atomics with
//! a single-writer-per-operation split:
//! - callbacks only ever increment a slot counter (one atomic RMW),
//! - the timer context is the only caller of [`advance`](SlidingWindow::advance)
//!   and [`drain`](SlidingWindow::drain), both built from single RMWs.
//!
//! An increment that races an advance lands in the slot that was active when
//! the callback sampled the index; that slot is never zeroed by the advance
//! (only the next slot is), so the total count across all slots is conserved
//! under every interleaving. Counters saturate at `u16::MAX` instead of
//! wrapping, so an overflow can never be misread as a low count.

use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};

/// Sums over every slot of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowTotals {
    pub acks: u32,
    pub preambles: u32,
}

#[derive(Default)]
struct Slot {
    acks: AtomicU16,
    preambles: AtomicU16,
}

/// Fixed-size circular buffer of success counters with one active slot.
pub struct SlidingWindow {
    slots: Box<[Slot]>,
    active: AtomicUsize,
}

/// Saturating increment; a counter pinned at `u16::MAX` stays there.
fn bump(counter: &AtomicU16) {
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_add(1));
}

impl SlidingWindow {
    /// Create a window with `slots` zeroed slots; slot 0 starts active.
    ///
    /// # Panics
    /// Panics when `slots` is zero. [`TagConfig::validate`] rejects that
    /// value before any window is built.
    ///
    /// [`TagConfig::validate`]: crate::config::TagConfig::validate
    pub fn new(slots: usize) -> Self {
        assert!(slots > 0, "window needs at least one slot");
        SlidingWindow {
            slots: (0..slots).map(|_| Slot::default()).collect(),
            active: AtomicUsize::new(0),
        }
    }

    /// Number of slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Count one full-message acknowledgment in the active slot.
    pub fn record_ack(&self) {
        bump(&self.slots[self.active.load(Ordering::Acquire)].acks);
    }

    /// Count one preamble acknowledgment in the active slot.
    pub fn record_preamble(&self) {
        bump(&self.slots[self.active.load(Ordering::Acquire)].preambles);
    }

    /// Move the active slot forward circularly, zeroing the new slot before
    /// it becomes active. Timer context only.
    pub fn advance(&self) {
        let next = (self.active.load(Ordering::Acquire) + 1) % self.slots.len();
        self.slots[next].acks.store(0, Ordering::Release);
        self.slots[next].preambles.store(0, Ordering::Release);
        self.active.store(next, Ordering::Release);
    }

    /// Read and clear every slot, returning the sums. Timer context only.
    ///
    /// For a one-slot window this is the atomic read-then-clear the
    /// single-slot firmware builds perform directly.
    pub fn drain(&self) -> WindowTotals {
        let mut totals = WindowTotals::default();
        for slot in self.slots.iter() {
            totals.acks += u32::from(slot.acks.swap(0, Ordering::AcqRel));
            totals.preambles += u32::from(slot.preambles.swap(0, Ordering::AcqRel));
        }
        totals
    }

    /// Non-destructive sums, for observability.
    pub fn totals(&self) -> WindowTotals {
        let mut totals = WindowTotals::default();
        for slot in self.slots.iter() {
            totals.acks += u32::from(slot.acks.load(Ordering::Acquire));
            totals.preambles += u32::from(slot.preambles.load(Ordering::Acquire));
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counts_land_in_active_slot() {
        let window = SlidingWindow::new(3);
        window.record_ack();
        window.record_preamble();
        window.record_preamble();
        let totals = window.totals();
        assert_eq!(totals.acks, 1);
        assert_eq!(totals.preambles, 2);
    }

    #[test]
    fn advance_zeroes_the_new_slot_only() {
        let window = SlidingWindow::new(2);
        window.record_ack();
        window.advance();
        // Counts from the previously active slot survive the advance.
        assert_eq!(window.totals().acks, 1);
        window.record_ack();
        assert_eq!(window.totals().acks, 2);
        // Coming back around clears what slot 0 held.
        window.advance();
        assert_eq!(window.totals().acks, 1);
    }

    #[test]
    fn conservation_across_interleaved_advances() {
        let window = SlidingWindow::new(10);
        let mut recorded = 0u32;
        for round in 0..50 {
            for _ in 0..round % 7 {
                window.record_ack();
                recorded += 1;
            }
            window.advance();
        }
        // Only the last 9 advances can have dropped counts out of the ring;
        // with 50 rounds of at most 6 acks the window holds the tail.
        let in_window = window.totals().acks;
        assert!(in_window <= recorded);
        let tail: u32 = (41..50).map(|round| round % 7).sum();
        assert_eq!(in_window, tail);
    }

    #[test]
    fn drain_conserves_and_clears() {
        let window = SlidingWindow::new(4);
        for _ in 0..5 {
            window.record_ack();
            window.record_preamble();
            window.advance();
        }
        let first = window.drain();
        // Each advance pre-zeroes the slot it moves into, so on a 4-slot
        // ring the 5 rounds evicted the two oldest pairs.
        assert_eq!(first.acks, 3);
        assert_eq!(first.preambles, 3);
        assert_eq!(window.drain(), WindowTotals::default());
    }

    #[test]
    fn single_slot_drain_is_read_then_clear() {
        let window = SlidingWindow::new(1);
        window.record_ack();
        window.record_ack();
        assert_eq!(window.drain().acks, 2);
        assert_eq!(window.totals(), WindowTotals::default());
    }

    #[test]
    fn counters_saturate_instead_of_wrapping() {
        let window = SlidingWindow::new(1);
        for _ in 0..u32::from(u16::MAX) + 10 {
            window.record_ack();
        }
        assert_eq!(window.drain().acks, u32::from(u16::MAX));
    }

    #[test]
    fn no_counts_lost_under_concurrent_increments() {
        let window = Arc::new(SlidingWindow::new(10));
        const PER_THREAD: u32 = 2_000;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let window = window.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..PER_THREAD {
                    window.record_ack();
                }
            }));
        }
        // Advance concurrently; the ring is larger than the advance count,
        // so nothing is evicted while producers run.
        for _ in 0..9 {
            window.advance();
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(window.drain().acks, 4 * PER_THREAD);
    }
}
