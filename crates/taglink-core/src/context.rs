//! # Control-Loop Context
//!
//! All cross-context mutable state lives in one struct, created once at
//! boot and shared by reference between the timer context, the engine's
//! callback context, and the cooperative main loop. Single-instance
//! semantics without free-standing statics, so the whole loop is testable
//! off-hardware.

use crate::backoff::{BackoffScheduler, EntropyTable};
use crate::config::TagConfig;
use crate::engine::{AbortSignal, EpcBuffer, EventSink, MessageBudget};
use crate::sensor::TickSensor;
use crate::wake::WakeToken;
use crate::window::SlidingWindow;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Shared state of one tag's control loop.
pub struct TagContext {
    /// Success-event accumulator.
    pub window: SlidingWindow,
    /// Session suppression state.
    pub backoff: BackoffScheduler,
    /// Timer-to-main-loop wake handoff.
    pub wake: WakeToken,
    /// Early session termination request.
    pub abort: AbortSignal,
    /// Per-burst acknowledgment budget.
    pub budget: MessageBudget,
    /// Elapsed-time proxy.
    pub sensor: TickSensor,
    /// Latest converted temperature word, zero until first conversion.
    temperature: AtomicU32,
    /// Outgoing message buffer shared with the engine.
    pub epc: EpcBuffer,
    /// Latest verdict, as published for observers.
    link_good: AtomicBool,
    /// One pending forced probe session, set by the timer context.
    force_probe: AtomicBool,
    /// Fully delivered transmission bursts since boot.
    bursts_completed: AtomicU32,
}

impl TagContext {
    /// Build the context for a validated configuration.
    pub fn new(config: &TagConfig, table: EntropyTable) -> Self {
        TagContext {
            window: SlidingWindow::new(config.window_slots),
            backoff: BackoffScheduler::new(config.backoff_max_ticks, table),
            wake: WakeToken::new(),
            abort: AbortSignal::new(),
            budget: MessageBudget::new(config.messages_per_transmission()),
            sensor: TickSensor::new(),
            temperature: AtomicU32::new(0),
            epc: EpcBuffer::new(usize::from(config.bytes_per_message)),
            link_good: AtomicBool::new(false),
            force_probe: AtomicBool::new(false),
            bursts_completed: AtomicU32::new(0),
        }
    }

    /// Latest published verdict.
    pub fn link_good(&self) -> bool {
        self.link_good.load(Ordering::Acquire)
    }

    pub(crate) fn publish_link_good(&self, good: bool) {
        self.link_good.store(good, Ordering::Release);
    }

    /// Latest temperature word.
    pub fn temperature(&self) -> u16 {
        self.temperature.load(Ordering::Acquire) as u16
    }

    pub(crate) fn store_temperature(&self, value: u16) {
        self.temperature.store(u32::from(value), Ordering::Release);
    }

    /// Request one probe session regardless of the backoff countdown.
    pub(crate) fn request_force_probe(&self) {
        self.force_probe.store(true, Ordering::Release);
    }

    /// Consume a pending forced probe, if any.
    pub(crate) fn take_force_probe(&self) -> bool {
        self.force_probe.swap(false, Ordering::AcqRel)
    }

    /// Fully delivered transmission bursts since boot.
    pub fn bursts_completed(&self) -> u32 {
        self.bursts_completed.load(Ordering::Acquire)
    }
}

/// The production [`EventSink`]: wires the engine's callbacks to the
/// accumulator, the message budget, and the abort signal.
#[derive(Clone)]
pub struct LinkEvents {
    context: Arc<TagContext>,
}

impl LinkEvents {
    pub fn new(context: Arc<TagContext>) -> Self {
        LinkEvents { context }
    }
}

impl EventSink for LinkEvents {
    fn on_preamble(&self) {
        self.context.window.record_preamble();
    }

    fn on_ack(&self) {
        let ctx = &self.context;
        if ctx.budget.note_ack() {
            // Quota met: the chunked payload is fully delivered, stop
            // polling the reader for this burst.
            ctx.abort.raise();
            ctx.bursts_completed.fetch_add(1, Ordering::AcqRel);
        }
        ctx.window.record_ack();
    }
}
