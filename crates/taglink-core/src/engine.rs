//! # Protocol Engine Boundary
//!
//! The RFID engine itself (reader handshake, EPC Gen2 state machine, bit
//! banging) is an external collaborator. The control loop consumes it
//! through a small capability set:
//! - it registers an [`EventSink`] whose callbacks the engine fires on
//!   protocol-level successes,
//! - it may raise an [`AbortSignal`] the engine polls to cut a session
//!   short,
//! - it fills the shared [`EpcBuffer`] the engine transmits from,
//! - it invokes [`ProtocolEngine::run_session`] for exactly one blocking
//!   reader interaction at a time.
//!
//! Which sensors exist and how status is reported are configuration decided
//! at construction; the engine boundary is the same for every build.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Mutex;

/// Callbacks the protocol engine fires from its own context. Every
/// implementation must return quickly; a slow callback stalls the radio
/// protocol mid-handshake.
pub trait EventSink: Send + Sync {
    /// A preamble (RN16 handshake) transmission was acknowledged.
    fn on_preamble(&self);
    /// A full data-carrying message was acknowledged.
    fn on_ack(&self);
    /// Reserved extension points; no control-loop logic.
    fn on_read(&self) {}
    fn on_write(&self) {}
    fn on_block_write(&self) {}
}

/// Latched request to end the current session early.
///
/// Raised by the ack sink when the message budget fills, polled by the
/// engine between protocol messages, cleared by the coordinator before the
/// next session.
#[derive(Debug, Default)]
pub struct AbortSignal(AtomicBool);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Counts acknowledged messages within the current transmission burst.
///
/// Owned by the ack sink; the rest of the loop sees only its side effect on
/// the abort signal. On reaching the threshold the counter resets to zero
/// in the same atomic step, ready to count the next burst identically.
#[derive(Debug)]
pub struct MessageBudget {
    count: AtomicU16,
    threshold: u16,
}

impl MessageBudget {
    /// # Panics
    /// Panics when `threshold` is zero; the threshold is derived by ceiling
    /// division and is therefore always at least one.
    pub fn new(threshold: u16) -> Self {
        assert!(threshold > 0, "message budget threshold must be nonzero");
        MessageBudget {
            count: AtomicU16::new(0),
            threshold,
        }
    }

    /// Count one acknowledged message. Returns `true` exactly when this ack
    /// completed the burst.
    pub fn note_ack(&self) -> bool {
        let threshold = self.threshold;
        let previous = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                let next = c.saturating_add(1);
                Some(if next >= threshold { 0 } else { next })
            })
            .unwrap_or(0);
        previous.saturating_add(1) >= threshold
    }

    /// Messages counted so far in the current burst.
    pub fn count(&self) -> u16 {
        self.count.load(Ordering::Acquire)
    }
}

/// Capacity of the outgoing message buffer in bytes.
pub const EPC_CAPACITY: usize = 12;

/// The shared outgoing message buffer the engine transmits from.
///
/// The coordinator writes the latest sensor snapshot into it before each
/// session; the engine reads it during the session. Writes are word-sized
/// and held under a lock only long enough to store two bytes.
pub struct EpcBuffer {
    bytes: Mutex<[u8; EPC_CAPACITY]>,
    len: usize,
}

impl EpcBuffer {
    /// Buffer carrying `len` useful bytes (clamped to [`EPC_CAPACITY`]).
    pub fn new(len: usize) -> Self {
        EpcBuffer {
            bytes: Mutex::new([0; EPC_CAPACITY]),
            len: len.min(EPC_CAPACITY),
        }
    }

    /// Useful length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Boot-time fill of the unused data fields with a nibble identity
    /// pattern (`0x00, 0x11, 0x22, ...`), so an otherwise idle tag still
    /// transmits recognizable bytes.
    pub fn fill_identity(&self) {
        let mut bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        for (i, byte) in bytes[..self.len].iter_mut().enumerate() {
            let nibble = (i as u8) & 0x0f;
            *byte = nibble << 4 | nibble;
        }
    }

    /// Write a big-endian word at `offset`. Out-of-range writes for short
    /// message layouts are silently skipped; the field simply is not part
    /// of this build's message.
    pub fn put_word_be(&self, offset: usize, value: u16) {
        if offset + 2 > self.len {
            return;
        }
        let mut bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        bytes[offset] = (value >> 8) as u8;
        bytes[offset + 1] = (value & 0xff) as u8;
    }

    /// Copy of the full buffer contents.
    pub fn snapshot(&self) -> [u8; EPC_CAPACITY] {
        *self.bytes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Byte offset of the tick-sensor word in the outgoing message.
pub const EPC_SENSOR_OFFSET: usize = 3;
/// Byte offset of the temperature word in the outgoing message.
pub const EPC_TEMPERATURE_OFFSET: usize = 5;

/// How a protocol session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The reader interaction ran to its natural end.
    Completed,
    /// The abort signal cut the session short (quota met).
    Aborted,
    /// No reader energy or no reader response at all.
    NoReader,
}

/// Everything the engine may touch during one session.
pub struct SessionContext<'a> {
    pub events: &'a dyn EventSink,
    pub abort: &'a AbortSignal,
    pub epc: &'a EpcBuffer,
}

/// One blocking reader interaction.
pub trait ProtocolEngine: Send {
    fn run_session(&mut self, ctx: SessionContext<'_>) -> SessionOutcome;
}
