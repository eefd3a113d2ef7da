//! # Interval Tick
//!
//! The decision heartbeat of the tag. The base timer fires at a fixed
//! cadence; every `interval_multiplier` firings the tick engine runs the
//! reporting work, in a fixed order:
//!
//! 1. advance the free-running tick sensor (every base firing),
//! 2. read and clear the success window,
//! 3. evaluate link quality,
//! 4. seed the backoff countdown on a poor verdict,
//! 5. emit the status datagram to the companion radio (bounded CTS wait;
//!    on expiry the channel is treated as unavailable this tick and the
//!    send is skipped),
//! 6. raise the wake token for the main loop.
//!
//! The whole sequence is O(1) and free of unbounded blocking. It must be
//! driven from a single thread; that single-driver rule is this crate's
//! equivalent of the reference hardware's interrupt-disable-on-entry, and
//! the shared state it touches is additionally safe against the engine's
//! callback context (see [`crate::window`]).

use crate::context::TagContext;
use crate::quality::{evaluate, QualityPolicy, Verdict};
use crate::window::WindowTotals;
use std::sync::Arc;
use taglink_sidelink::{AdviceSink, ChannelAdvice, SidelinkError, StatusFrame};
use tracing::{debug, trace, warn};

/// What happened to the status datagram this interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Reporting is not configured.
    Disabled,
    /// The frame went out.
    Sent,
    /// The companion radio was unreachable; the send was skipped.
    ChannelUnavailable,
}

/// Observable result of one reporting interval.
#[derive(Debug, Clone, Copy)]
pub struct TickOutcome {
    pub totals: WindowTotals,
    pub verdict: Verdict,
    /// Countdown value seeded this interval, if a backoff began.
    pub backoff_seeded: Option<u16>,
    /// Countdown after this interval's decisions.
    pub n_skip: u16,
    pub status: StatusOutcome,
    /// Whether this interval scheduled a forced probe session.
    pub forced_probe: bool,
}

/// Per-tick orchestration. Owns no timers; the runtime (or a test) drives
/// [`tick`](TickEngine::tick) at the base cadence.
pub struct TickEngine {
    context: Arc<TagContext>,
    policy: QualityPolicy,
    multiplier: u16,
    base_ticks: u16,
    poor_streak: u16,
    force_probe_period: Option<u16>,
    advice: Option<Box<dyn AdviceSink>>,
    report_sensor: bool,
    report_temperature: bool,
}

impl TickEngine {
    pub fn new(
        context: Arc<TagContext>,
        config: &crate::config::TagConfig,
        advice: Option<Box<dyn AdviceSink>>,
    ) -> Self {
        TickEngine {
            context,
            policy: config.quality_policy(),
            multiplier: config.interval_multiplier().max(1),
            base_ticks: 0,
            poor_streak: 0,
            force_probe_period: config.force_probe_period,
            advice: if config.report_status { advice } else { None },
            report_sensor: config.report_sensor,
            report_temperature: config.report_temperature,
        }
    }

    /// One base timer firing. Returns the reporting outcome when this
    /// firing completed an interval, `None` when the multiplier swallowed
    /// it.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        self.context.sensor.bump();
        self.base_ticks += 1;
        if self.base_ticks < self.multiplier {
            trace!(fired = self.base_ticks, of = self.multiplier, "base tick");
            return None;
        }
        self.base_ticks = 0;
        Some(self.report_interval())
    }

    fn report_interval(&mut self) -> TickOutcome {
        let context = self.context.clone();

        let totals = context.window.drain();
        let verdict = evaluate(totals.acks, totals.preambles, &self.policy);

        let backoff_seeded = if verdict.is_good() {
            None
        } else {
            context.backoff.note_poor_verdict()
        };

        let forced_probe = self.update_poor_streak(verdict, &context);
        let status = self.report_status(verdict, &context);

        context.publish_link_good(verdict.is_good());
        context.wake.raise();

        let outcome = TickOutcome {
            totals,
            verdict,
            backoff_seeded,
            n_skip: context.backoff.n_skip(),
            status,
            forced_probe,
        };
        debug!(
            acks = totals.acks,
            preambles = totals.preambles,
            verdict = ?verdict,
            n_skip = outcome.n_skip,
            "interval"
        );
        outcome
    }

    /// Track consecutive poor intervals; after `force_probe_period` of them
    /// schedule one session regardless of the backoff countdown, so the tag
    /// keeps re-testing the primary link.
    fn update_poor_streak(&mut self, verdict: Verdict, context: &TagContext) -> bool {
        if verdict.is_good() {
            self.poor_streak = 0;
            return false;
        }
        self.poor_streak = self.poor_streak.saturating_add(1);
        match self.force_probe_period {
            Some(period) if self.poor_streak >= period => {
                self.poor_streak = 0;
                context.request_force_probe();
                debug!("forcing a probe session");
                true
            }
            _ => false,
        }
    }

    fn report_status(&mut self, verdict: Verdict, context: &TagContext) -> StatusOutcome {
        let Some(sink) = self.advice.as_mut() else {
            return StatusOutcome::Disabled;
        };
        let frame = StatusFrame {
            advice: if verdict.is_good() {
                ChannelAdvice::Disable
            } else {
                ChannelAdvice::Engage
            },
            sensor: self.report_sensor.then(|| context.sensor.value()),
            temperature: self.report_temperature.then(|| context.temperature()),
        };
        match sink.advise(&frame) {
            Ok(()) => StatusOutcome::Sent,
            Err(SidelinkError::ClearToSendTimeout) => {
                warn!("companion radio did not clear the send; skipping status this interval");
                StatusOutcome::ChannelUnavailable
            }
            Err(err) => {
                warn!(error = %err, "status send failed");
                StatusOutcome::ChannelUnavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::{EntropyTable, ENTROPY_TABLE_LEN};
    use crate::config::TagConfig;
    use taglink_sidelink::{
        AlwaysClear, HandshakeConfig, LoopbackPort, Pacer, StatusReporter,
    };
    use std::time::Duration;

    struct NoopPacer;
    impl Pacer for NoopPacer {
        fn pause(&mut self, _interval: Duration) {}
    }

    fn context_with(config: &TagConfig, table: EntropyTable) -> Arc<TagContext> {
        Arc::new(TagContext::new(config, table))
    }

    fn reporter(port: &LoopbackPort) -> Box<dyn AdviceSink> {
        Box::new(StatusReporter::new(
            Box::new(port.clone()),
            Box::new(AlwaysClear),
            Box::new(NoopPacer),
            HandshakeConfig::default(),
        ))
    }

    #[test]
    fn good_link_keeps_backoff_clear_and_reports_disable() {
        let config = TagConfig::default();
        let ctx = context_with(&config, EntropyTable::from_seed(3));
        let port = LoopbackPort::new();
        let mut engine = TickEngine::new(ctx.clone(), &config, Some(reporter(&port)));

        for _ in 0..config.messages_per_transmission() {
            ctx.window.record_ack();
        }
        let outcome = engine.tick().expect("multiplier of one reports every tick");

        assert_eq!(outcome.verdict, Verdict::Good);
        assert_eq!(outcome.n_skip, 0);
        assert_eq!(outcome.backoff_seeded, None);
        assert_eq!(outcome.status, StatusOutcome::Sent);
        assert!(ctx.link_good());
        let frames = port.sent();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0][0], b'D');
    }

    #[test]
    fn poor_link_seeds_backoff_and_reports_engage() {
        let config = TagConfig::default();
        let ctx = context_with(&config, EntropyTable::from_seed(11));
        let port = LoopbackPort::new();
        let mut engine = TickEngine::new(ctx.clone(), &config, Some(reporter(&port)));

        for _ in 0..50 {
            ctx.window.record_preamble();
        }
        let outcome = engine.tick().unwrap();

        assert_eq!(outcome.verdict, Verdict::Poor);
        assert!(outcome.n_skip < config.backoff_max_ticks);
        assert!(!ctx.link_good());
        assert_eq!(port.sent()[0][0], b'U');
    }

    #[test]
    fn interval_multiplier_gates_the_decision_work() {
        let config = TagConfig {
            interval_ms: 400,
            report_period_ms: 1_000,
            ..TagConfig::default()
        };
        let ctx = context_with(&config, EntropyTable::from_seed(0));
        let mut engine = TickEngine::new(ctx.clone(), &config, None);

        assert!(engine.tick().is_none());
        assert!(engine.tick().is_none());
        assert!(engine.tick().is_some(), "third firing completes the interval");
        assert_eq!(ctx.sensor.value(), 3, "sensor advances on every firing");
        assert_eq!(ctx.wake.try_consume(), 1, "only the interval wakes the loop");
    }

    #[test]
    fn window_is_cleared_between_intervals() {
        let config = TagConfig::default();
        let ctx = context_with(&config, EntropyTable::from_seed(0));
        let mut engine = TickEngine::new(ctx.clone(), &config, None);

        for _ in 0..config.messages_per_transmission() {
            ctx.window.record_ack();
        }
        assert_eq!(engine.tick().unwrap().verdict, Verdict::Good);
        // Nothing new arrived; the drained window must read empty.
        let second = engine.tick().unwrap();
        assert_eq!(second.totals, WindowTotals::default());
        assert_eq!(second.verdict, Verdict::Poor);
    }

    #[test]
    fn forced_probe_after_consecutive_poor_intervals() {
        let config = TagConfig {
            force_probe_period: Some(3),
            ..TagConfig::default()
        };
        // All-zero table: backoff never seeds, so forcing is the only
        // re-probe mechanism exercised here.
        let ctx = context_with(&config, EntropyTable::new([0; ENTROPY_TABLE_LEN]));
        let mut engine = TickEngine::new(ctx.clone(), &config, None);

        assert!(!engine.tick().unwrap().forced_probe);
        assert!(!engine.tick().unwrap().forced_probe);
        assert!(engine.tick().unwrap().forced_probe);
        assert!(ctx.take_force_probe());
        // Streak restarts after a force.
        assert!(!engine.tick().unwrap().forced_probe);
    }

    #[test]
    fn good_interval_resets_the_poor_streak() {
        let config = TagConfig {
            force_probe_period: Some(2),
            ..TagConfig::default()
        };
        let ctx = context_with(&config, EntropyTable::new([0; ENTROPY_TABLE_LEN]));
        let mut engine = TickEngine::new(ctx.clone(), &config, None);

        assert!(!engine.tick().unwrap().forced_probe);
        for _ in 0..config.messages_per_transmission() {
            ctx.window.record_ack();
        }
        assert_eq!(engine.tick().unwrap().verdict, Verdict::Good);
        assert!(!engine.tick().unwrap().forced_probe, "streak restarted");
        assert!(engine.tick().unwrap().forced_probe);
    }

    #[test]
    fn cts_starvation_skips_the_send_but_finishes_the_tick() {
        struct DeafSink;
        impl AdviceSink for DeafSink {
            fn advise(&mut self, _frame: &StatusFrame) -> Result<(), SidelinkError> {
                Err(SidelinkError::ClearToSendTimeout)
            }
        }

        let config = TagConfig::default();
        let ctx = context_with(&config, EntropyTable::from_seed(5));
        let mut engine = TickEngine::new(ctx.clone(), &config, Some(Box::new(DeafSink)));

        let outcome = engine.tick().unwrap();
        assert_eq!(outcome.status, StatusOutcome::ChannelUnavailable);
        assert_eq!(ctx.wake.try_consume(), 1, "the loop is still woken");
    }

    #[test]
    fn frame_layout_follows_report_toggles() {
        let config = TagConfig {
            report_temperature: false,
            ..TagConfig::default()
        };
        let ctx = context_with(&config, EntropyTable::from_seed(5));
        let port = LoopbackPort::new();
        let mut engine = TickEngine::new(ctx, &config, Some(reporter(&port)));

        engine.tick().unwrap();
        assert_eq!(port.sent()[0].len(), 3, "verdict byte plus sensor word");
    }

    #[test]
    fn status_disabled_by_config_even_with_a_sink() {
        let config = TagConfig {
            report_status: false,
            ..TagConfig::default()
        };
        let ctx = context_with(&config, EntropyTable::from_seed(5));
        let port = LoopbackPort::new();
        let mut engine = TickEngine::new(ctx, &config, Some(reporter(&port)));

        assert_eq!(engine.tick().unwrap().status, StatusOutcome::Disabled);
        assert!(port.sent().is_empty());
    }
}
