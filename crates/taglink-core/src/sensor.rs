//! Sensor seams.
//!
//! The control loop needs two readings for its outgoing message and status
//! datagram: the free-running tick sensor (an elapsed-time proxy advanced by
//! the interval timer, no hardware involved) and an optional temperature
//! word from an external probe. Actual sampling hardware stays outside the
//! crate behind [`TemperatureProbe`].

use std::sync::atomic::{AtomicU16, Ordering};

/// Elapsed-time proxy: counts base timer firings, wrapping at `u16::MAX`
/// like the hardware counter it stands in for.
#[derive(Debug, Default)]
pub struct TickSensor(AtomicU16);

impl TickSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one tick. Timer context only.
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    pub fn value(&self) -> u16 {
        self.0.load(Ordering::Acquire)
    }
}

/// External temperature sampling.
pub trait TemperatureProbe: Send {
    /// Latest converted reading, `None` when no conversion has completed.
    fn read(&mut self) -> Option<u16>;

    /// Whether a conversion is in flight. While true the coordinator must
    /// not enter a sleep state deep enough to stop the converter's clock.
    fn busy(&self) -> bool {
        false
    }
}

/// Probe for builds without a temperature sensor.
#[derive(Debug, Default)]
pub struct NoProbe;

impl TemperatureProbe for NoProbe {
    fn read(&mut self) -> Option<u16> {
        None
    }
}
