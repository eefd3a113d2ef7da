//! # taglink-core
//!
//! Control loop of a battery-free, RF-powered sensor tag: decide, every
//! fixed interval, whether the backscatter link to the RFID reader is
//! healthy enough to keep using, or whether to back off and hand traffic to
//! a companion low-power radio.
//!
//! The loop is the interesting part; the RFID protocol engine, the
//! companion radio transport, and the sensors are external collaborators
//! behind traits. Data flows in a cycle:
//!
//! ```text
//! engine callbacks ─▶ success window ─▶ (interval tick) quality verdict
//!        ▲                                   │
//!        │                         backoff + status datagram
//!        │                                   │
//!   one session ◀── main loop ◀───────── wake token
//! ```
//!
//! - [`window`] accumulates protocol success events over a sliding window
//! - [`quality`] turns window sums into a [`Verdict`]
//! - [`backoff`] suppresses sessions for a bounded random number of ticks
//! - [`interval`] orchestrates the per-tick decision work
//! - [`runtime`] hosts the cooperative main loop and the timer cadences
//! - [`engine`] and [`sensor`] define the external seams
//!
//! All cross-context state sits in one [`TagContext`]; the concurrency
//! rules are documented on [`window`] and [`interval`].

pub mod backoff;
pub mod config;
pub mod context;
pub mod engine;
pub mod interval;
pub mod quality;
pub mod runtime;
pub mod sensor;
pub mod wake;
pub mod window;

pub use backoff::{BackoffScheduler, BackoffState, EntropyTable};
pub use config::{ConfigError, TagConfig};
pub use context::{LinkEvents, TagContext};
pub use engine::{
    AbortSignal, EpcBuffer, EventSink, MessageBudget, ProtocolEngine, SessionContext,
    SessionOutcome,
};
pub use interval::{StatusOutcome, TickEngine, TickOutcome};
pub use quality::{evaluate, QualityPolicy, Verdict};
pub use runtime::{Coordinator, StepReport, TagRuntime};
pub use sensor::{NoProbe, TemperatureProbe, TickSensor};
pub use wake::{sleep_depth, SleepDepth, WakeToken};
pub use window::{SlidingWindow, WindowTotals};

/// Initialize structured logging for binaries and integration harnesses.
///
/// Controlled by `RUST_LOG` (e.g. `RUST_LOG=info,taglink_core=debug`).
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}
