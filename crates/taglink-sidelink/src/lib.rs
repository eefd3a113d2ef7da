//! Secondary-channel surface for the taglink control loop.
//!
//! When the primary backscatter link degrades, the tag hands communication
//! duties to a companion low-power radio. This crate owns everything on that
//! boundary:
//! - **Status datagrams** - the short fixed-format frame carrying the link
//!   verdict and the latest sensor readings ([`frame`])
//! - **RTS/CTS handshake** - a bounded-retry send over two signal lines with
//!   an injected pacer, so the poll-wait is testable and cannot hang
//!   ([`handshake`])
//! - **Pulse advice** - the UART-less variant that signals the companion
//!   radio with bare GPIO pulses ([`pulse`])
//!
//! All hardware access goes through the [`port::SidelinkPort`],
//! [`handshake::SignalLines`], and [`pulse::PulsePin`] traits; the crate
//! itself performs no I/O.

pub mod frame;
pub mod handshake;
pub mod port;
pub mod pulse;
pub mod reporter;

pub use frame::{ChannelAdvice, FrameLayout, StatusFrame, FRAME_MAX};
pub use handshake::{send_with_handshake, AlwaysClear, HandshakeConfig, Pacer, SignalLines, ThreadPacer};
pub use port::{LoopbackPort, SidelinkPort};
pub use reporter::{AdviceSink, StatusReporter};

use thiserror::Error;

/// Errors on the secondary-channel boundary.
#[derive(Debug, Error)]
pub enum SidelinkError {
    /// The companion radio never asserted clear-to-send within the poll
    /// budget. The caller should treat the channel as unavailable for this
    /// tick and skip the send.
    #[error("clear-to-send was not asserted within the poll budget")]
    ClearToSendTimeout,

    /// A decode was attempted on fewer bytes than the layout requires.
    #[error("frame truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    /// The leading verdict byte was neither `'D'` nor `'U'`.
    #[error("unknown advice byte {0:#04x}")]
    BadAdvice(u8),

    /// The underlying port failed to accept the frame.
    #[error("sidelink transport failure: {0}")]
    Transport(String),
}
