//! # Link Quality Verdict
//!
//! Turns one reporting interval's accumulated success counts into a verdict.
//! Pure and total: no hidden state, so the policy is testable in isolation
//! and two calls with the same inputs always agree.

use serde::{Deserialize, Serialize};

/// Health of the primary backscatter link over the last window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// At least one full burst was acknowledged; keep using the primary link.
    Good,
    /// The reader is not hearing us reliably; prefer the secondary channel.
    Poor,
}

impl Verdict {
    pub fn is_good(self) -> bool {
        matches!(self, Verdict::Good)
    }
}

/// Parameters of the verdict computation.
#[derive(Debug, Clone, Copy)]
pub struct QualityPolicy {
    /// Acknowledgments required within the window: the number of messages
    /// that make up one full transmission burst.
    pub burst_threshold: u16,
    /// Optional confidence factor `k`. When set, the link must also satisfy
    /// `preambles > 0 && acks * k >= preambles`: plenty of handshakes with
    /// few completions means the reader hears the tag but the tag's replies
    /// are being lost.
    pub ratio: Option<u16>,
}

/// Compute the verdict for one reporting interval.
pub fn evaluate(ack_sum: u32, preamble_sum: u32, policy: &QualityPolicy) -> Verdict {
    if ack_sum < u32::from(policy.burst_threshold) {
        return Verdict::Poor;
    }
    if let Some(k) = policy.ratio {
        if preamble_sum == 0 || ack_sum.saturating_mul(u32::from(k)) < preamble_sum {
            return Verdict::Poor;
        }
    }
    Verdict::Good
}
