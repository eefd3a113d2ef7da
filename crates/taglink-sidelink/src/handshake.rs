//! # RTS/CTS Handshake
//!
//! The tag raises a request-to-send line, waits for the companion radio to
//! assert clear-to-send, clocks the frame out, then drops the request line.
//!
//! The wait is the one blocking operation anywhere near the tag's interrupt
//! path, so it is modeled as a bounded-retry loop: at most
//! [`HandshakeConfig::poll_budget`] polls spaced by an injected [`Pacer`].
//! When the budget runs out the send is abandoned with
//! [`SidelinkError::ClearToSendTimeout`] and the request line is released;
//! the caller treats the secondary channel as unavailable for that tick
//! rather than hanging on it.

use crate::port::SidelinkPort;
use crate::SidelinkError;
use std::time::Duration;

/// The two dedicated signal lines of the handshake.
pub trait SignalLines: Send {
    fn raise_rts(&mut self);
    fn drop_rts(&mut self);
    /// Sample the clear-to-send line.
    fn cts_asserted(&mut self) -> bool;
}

/// Injected delay between CTS polls, so the handshake is testable without
/// real timing.
pub trait Pacer: Send {
    fn pause(&mut self, interval: Duration);
}

/// Pacer that really sleeps. For use on hosts and in the simulator.
#[derive(Debug, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// Signal lines with clear-to-send permanently asserted, for builds whose
/// companion radio has no flow control.
#[derive(Debug, Default)]
pub struct AlwaysClear;

impl SignalLines for AlwaysClear {
    fn raise_rts(&mut self) {}
    fn drop_rts(&mut self) {}
    fn cts_asserted(&mut self) -> bool {
        true
    }
}

/// Poll budget for the clear-to-send wait.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Maximum number of CTS polls before giving up.
    pub poll_budget: u32,
    /// Pause between polls.
    pub poll_interval: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        HandshakeConfig {
            poll_budget: 200,
            poll_interval: Duration::from_micros(50),
        }
    }
}

/// Send one frame under the RTS/CTS handshake.
///
/// The request line is released on every exit path, including timeout.
pub fn send_with_handshake(
    port: &mut dyn SidelinkPort,
    lines: &mut dyn SignalLines,
    pacer: &mut dyn Pacer,
    config: &HandshakeConfig,
    frame: &[u8],
) -> Result<(), SidelinkError> {
    lines.raise_rts();
    for _ in 0..config.poll_budget {
        if lines.cts_asserted() {
            let sent = port.send(frame);
            lines.drop_rts();
            return sent;
        }
        pacer.pause(config.poll_interval);
    }
    lines.drop_rts();
    Err(SidelinkError::ClearToSendTimeout)
}
