//! Per-tick advice delivery to the companion radio.
//!
//! The control loop hands a [`StatusFrame`] to an [`AdviceSink`] once per
//! reporting interval and does not care which physical shape the advice
//! takes. Two shapes exist: [`StatusReporter`] serializes the frame and
//! pushes it over a UART-style port under the RTS/CTS handshake, and
//! [`PulseAdviser`] strobes one of two GPIO pins and ignores the payload
//! fields.

use crate::frame::{ChannelAdvice, StatusFrame, FRAME_MAX};
use crate::handshake::{send_with_handshake, HandshakeConfig, Pacer, SignalLines};
use crate::port::SidelinkPort;
use crate::pulse::PulsePin;
use crate::SidelinkError;

/// Destination for per-tick channel advice.
pub trait AdviceSink: Send {
    fn advise(&mut self, frame: &StatusFrame) -> Result<(), SidelinkError>;
}

/// Frame-over-UART advice: encode, handshake, send.
pub struct StatusReporter {
    port: Box<dyn SidelinkPort>,
    lines: Box<dyn SignalLines>,
    pacer: Box<dyn Pacer>,
    handshake: HandshakeConfig,
    scratch: [u8; FRAME_MAX],
}

impl StatusReporter {
    pub fn new(
        port: Box<dyn SidelinkPort>,
        lines: Box<dyn SignalLines>,
        pacer: Box<dyn Pacer>,
        handshake: HandshakeConfig,
    ) -> Self {
        StatusReporter {
            port,
            lines,
            pacer,
            handshake,
            scratch: [0; FRAME_MAX],
        }
    }
}

impl AdviceSink for StatusReporter {
    fn advise(&mut self, frame: &StatusFrame) -> Result<(), SidelinkError> {
        let len = frame.encoded_len();
        let mut cursor = &mut self.scratch[..];
        frame.encode(&mut cursor);
        send_with_handshake(
            self.port.as_mut(),
            self.lines.as_mut(),
            self.pacer.as_mut(),
            &self.handshake,
            &self.scratch[..len],
        )
    }
}

/// GPIO strobe advice for UART-less builds.
pub struct PulseAdviser {
    engage: Box<dyn PulsePin>,
    disable: Box<dyn PulsePin>,
}

impl PulseAdviser {
    pub fn new(engage: Box<dyn PulsePin>, disable: Box<dyn PulsePin>) -> Self {
        PulseAdviser { engage, disable }
    }
}

impl AdviceSink for PulseAdviser {
    fn advise(&mut self, frame: &StatusFrame) -> Result<(), SidelinkError> {
        match frame.advice {
            ChannelAdvice::Engage => self.engage.pulse(),
            ChannelAdvice::Disable => self.disable.pulse(),
        }
        Ok(())
    }
}
