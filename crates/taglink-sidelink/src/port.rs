//! Byte-level transport to the companion radio.
//!
//! On the reference hardware this is a UART; in tests and simulation it is a
//! loopback capture. The port only ever sees fully-assembled frames; flow
//! control lives in [`crate::handshake`].

use crate::SidelinkError;
use std::sync::{Arc, Mutex};

/// Write-only frame transport to the companion radio.
pub trait SidelinkPort: Send {
    /// Deliver one complete frame. Must not block beyond the time needed to
    /// clock the bytes out.
    fn send(&mut self, frame: &[u8]) -> Result<(), SidelinkError>;
}

/// In-memory port that records every frame it is given.
///
/// Cloning shares the capture buffer, so a test can keep one handle while
/// the reporter owns the other.
#[derive(Debug, Clone, Default)]
pub struct LoopbackPort {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl LoopbackPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// All frames sent so far, oldest first.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SidelinkPort for LoopbackPort {
    fn send(&mut self, frame: &[u8]) -> Result<(), SidelinkError> {
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(frame.to_vec());
        Ok(())
    }
}
