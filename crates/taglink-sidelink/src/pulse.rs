//! GPIO pulse signaling for builds without a UART.
//!
//! Instead of a datagram, the tag strobes one of two dedicated pins: the
//! "engage" pin when the companion radio should take over, the "disable"
//! pin when it should stand down. The pulse width is the pin driver's
//! concern, not this crate's.

/// One output pin that can emit a single set/clear strobe.
pub trait PulsePin: Send {
    fn pulse(&mut self);
}

/// Counts strobes instead of driving hardware.
#[derive(Debug, Default)]
pub struct CountingPin {
    pub pulses: u32,
}

impl PulsePin for CountingPin {
    fn pulse(&mut self) {
        self.pulses += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_pin_counts() {
        let mut pin = CountingPin::default();
        pin.pulse();
        pin.pulse();
        assert_eq!(pin.pulses, 2);
    }
}
