//! # Coordinator and Threaded Runtime
//!
//! [`Coordinator`] is the cooperative main loop: write the latest sensor
//! snapshot into the outgoing message buffer, sleep until the interval tick
//! raises the wake token, then either burn one unit of backoff countdown or
//! run exactly one protocol session. Each iteration is independent; all
//! carried state lives in the shared [`TagContext`].
//!
//! [`TagRuntime`] is the hosted harness around it: a timer thread drives
//! the interval and window cadences over crossbeam tick channels (additive
//! scheduling, so late handling does not accumulate drift), a second thread
//! runs the coordinator, and shutdown is a flag plus a wake so both threads
//! exit promptly. Dropping the runtime shuts it down.

use crate::config::{ConfigError, TagConfig};
use crate::context::{LinkEvents, TagContext};
use crate::engine::{
    ProtocolEngine, SessionContext, SessionOutcome, EPC_SENSOR_OFFSET, EPC_TEMPERATURE_OFFSET,
};
use crate::interval::TickEngine;
use crate::sensor::TemperatureProbe;
use crate::wake::{sleep_depth, SleepDepth};
use crate::backoff::EntropyTable;
use crossbeam_channel::{bounded, select, tick, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use taglink_sidelink::AdviceSink;
use tracing::{debug, trace};

/// How long the coordinator sleeps before re-checking for shutdown when no
/// wake arrives.
const WAKE_POLL: Duration = Duration::from_millis(50);

/// Result of one main-loop iteration.
#[derive(Debug, Clone, Copy)]
pub struct StepReport {
    /// Whether a session was allowed to run this wake.
    pub engaged: bool,
    /// How the session ended, when one ran.
    pub outcome: Option<SessionOutcome>,
    /// Sleep depth chosen before the wait.
    pub depth: SleepDepth,
    /// Wake raises consumed; above one means the loop overran an interval.
    pub pending_wakes: u32,
}

/// The cooperative main loop.
pub struct Coordinator<E: ProtocolEngine> {
    context: Arc<TagContext>,
    engine: E,
    events: LinkEvents,
    probe: Box<dyn TemperatureProbe>,
}

impl<E: ProtocolEngine> Coordinator<E> {
    pub fn new(context: Arc<TagContext>, engine: E, probe: Box<dyn TemperatureProbe>) -> Self {
        let events = LinkEvents::new(context.clone());
        Coordinator {
            context,
            engine,
            events,
            probe,
        }
    }

    /// Write the latest readings into the outgoing message buffer so the
    /// next session transmits current data.
    fn prepare_session(&mut self) {
        let context = &self.context;
        context.epc.put_word_be(EPC_SENSOR_OFFSET, context.sensor.value());
        if let Some(value) = self.probe.read() {
            context.store_temperature(value);
        }
        context
            .epc
            .put_word_be(EPC_TEMPERATURE_OFFSET, context.temperature());
    }

    /// One non-blocking iteration, for deterministic tests and manual
    /// drivers: prepare, consume whatever wakes are pending, decide, and
    /// possibly run a session.
    pub fn step(&mut self) -> StepReport {
        self.prepare_session();
        let depth = sleep_depth(self.probe.busy());
        let pending = self.context.wake.try_consume();
        self.decide_and_run(pending, depth)
    }

    fn decide_and_run(&mut self, pending_wakes: u32, depth: SleepDepth) -> StepReport {
        let forced = self.context.take_force_probe();
        let engaged = self.context.backoff.should_engage() || forced;
        if !engaged {
            trace!(n_skip = self.context.backoff.n_skip(), "session suppressed");
            return StepReport {
                engaged: false,
                outcome: None,
                depth,
                pending_wakes,
            };
        }

        self.context.abort.clear();
        let outcome = self.engine.run_session(SessionContext {
            events: &self.events,
            abort: &self.context.abort,
            epc: &self.context.epc,
        });
        trace!(outcome = ?outcome, forced, "session finished");
        StepReport {
            engaged: true,
            outcome: Some(outcome),
            depth,
            pending_wakes,
        }
    }

    /// Run until `shutdown` is set. Consumes the coordinator.
    pub fn run(mut self, shutdown: Arc<AtomicBool>) {
        while !shutdown.load(Ordering::Relaxed) {
            self.prepare_session();
            let depth = sleep_depth(self.probe.busy());
            trace!(depth = ?depth, "entering sleep");
            let pending = self.context.wake.wait_timeout(WAKE_POLL);
            if pending == 0 || shutdown.load(Ordering::Relaxed) {
                continue;
            }
            self.decide_and_run(pending, depth);
        }
        debug!("coordinator stopped");
    }
}

/// Owns the timer and coordinator threads of one tag.
///
/// Dropping the runtime triggers a graceful shutdown of both threads.
pub struct TagRuntime {
    context: Arc<TagContext>,
    shutdown: Arc<AtomicBool>,
    stop_tx: Sender<()>,
    timer: Option<JoinHandle<()>>,
    coordinator: Option<JoinHandle<()>>,
}

impl TagRuntime {
    /// Validate `config` and start the loop against the given engine,
    /// probe, and optional status sink.
    pub fn start<E, P>(
        config: TagConfig,
        engine: E,
        probe: P,
        advice: Option<Box<dyn AdviceSink>>,
        table: EntropyTable,
    ) -> Result<Self, ConfigError>
    where
        E: ProtocolEngine + 'static,
        P: TemperatureProbe + 'static,
    {
        config.validate()?;

        let context = Arc::new(TagContext::new(&config, table));
        context.epc.fill_identity();

        let shutdown = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let mut tick_engine = TickEngine::new(context.clone(), &config, advice);
        let interval_rx = tick(config.interval_period());
        let window_rx = tick(config.window_period());
        let timer_context = context.clone();
        let timer = thread::Builder::new()
            .name("taglink-timer".into())
            .spawn(move || {
                loop {
                    select! {
                        recv(interval_rx) -> _ => { tick_engine.tick(); }
                        recv(window_rx) -> _ => { timer_context.window.advance(); }
                        recv(stop_rx) -> _ => break,
                    }
                }
                debug!("timer stopped");
            })
            .expect("failed to spawn taglink timer thread");

        let coordinator = Coordinator::new(context.clone(), engine, Box::new(probe));
        let coordinator_shutdown = shutdown.clone();
        let coordinator = thread::Builder::new()
            .name("taglink-main".into())
            .spawn(move || coordinator.run(coordinator_shutdown))
            .expect("failed to spawn taglink coordinator thread");

        Ok(TagRuntime {
            context,
            shutdown,
            stop_tx,
            timer: Some(timer),
            coordinator: Some(coordinator),
        })
    }

    /// Shared control-loop state, for observation.
    pub fn context(&self) -> Arc<TagContext> {
        self.context.clone()
    }

    /// Gracefully stop both threads. Idempotent.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.stop_tx.try_send(());
        // Pop the coordinator out of its wait immediately.
        self.context.wake.raise();
        if let Some(handle) = self.timer.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.coordinator.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TagRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
