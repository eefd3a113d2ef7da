use std::env;
use std::fs;
use std::thread;
use std::time::Duration;

use taglink_core::{EntropyTable, TagConfig, TagRuntime};
use taglink_sidelink::{
    AlwaysClear, HandshakeConfig, LoopbackPort, StatusReporter, ThreadPacer,
};
use taglink_sim::{LinkProfile, RampProbe, SimReader};
use tracing::info;

const HELP: &str = r#"
USAGE: taglink-node [OPTIONS]

Runs the tag control loop against a simulated RFID reader and prints the
per-interval verdicts.

OPTIONS:
  --profile <name>    Reader behavior (default: solid)
                        solid  - every session delivers a full burst
                        dead   - no reader in range
                        fading - ack rate wanders by a seeded random walk
  --intervals <n>     Reporting intervals to run (default: 20)
  --seed <n>          Seed for the entropy table and the fading profile
                      (default: 1)
  --config <path>     Path to a TOML TagConfig file; unlisted fields keep
                      their defaults
  --help              Show this help

EXAMPLES:
  # Watch a healthy link hold the primary channel
  taglink-node --profile solid --intervals 10

  # Watch backoff kick in on a dead link
  RUST_LOG=debug taglink-node --profile dead --intervals 30

  # Reproducible fading-link run
  taglink-node --profile fading --seed 7 --intervals 50
"#;

fn main() -> anyhow::Result<()> {
    taglink_core::init();

    let args: Vec<String> = env::args().collect();
    let mut profile_name = "solid".to_string();
    let mut intervals: u32 = 20;
    let mut seed: u64 = 1;
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(());
            }
            "--profile" => {
                i += 1;
                profile_name = args
                    .get(i)
                    .ok_or_else(|| anyhow::anyhow!("--profile needs a value"))?
                    .clone();
            }
            "--intervals" => {
                i += 1;
                intervals = args
                    .get(i)
                    .ok_or_else(|| anyhow::anyhow!("--intervals needs a value"))?
                    .parse()?;
            }
            "--seed" => {
                i += 1;
                seed = args
                    .get(i)
                    .ok_or_else(|| anyhow::anyhow!("--seed needs a value"))?
                    .parse()?;
            }
            "--config" => {
                i += 1;
                config_path = Some(
                    args.get(i)
                        .ok_or_else(|| anyhow::anyhow!("--config needs a value"))?
                        .clone(),
                );
            }
            other => anyhow::bail!("unknown option {other}; try --help"),
        }
        i += 1;
    }

    let config = match &config_path {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        // Fast cadences by default so a demo run finishes in seconds.
        None => TagConfig {
            interval_ms: 100,
            report_period_ms: 100,
            window_ms: 100,
            ..TagConfig::default()
        },
    };
    config.validate()?;

    let quota = config.messages_per_transmission();
    let profile = match profile_name.as_str() {
        "solid" => LinkProfile::Solid {
            handshakes: quota + 2,
            acks: quota,
        },
        "dead" => LinkProfile::Dead,
        "fading" => LinkProfile::Fading {
            seed,
            handshakes: quota + 2,
            step: 0.3,
        },
        other => anyhow::bail!("unknown profile {other}; try --help"),
    };

    let reader = SimReader::new(profile);
    let counters = reader.counters();
    let port = LoopbackPort::new();
    let reporter = StatusReporter::new(
        Box::new(port.clone()),
        Box::new(AlwaysClear),
        Box::new(ThreadPacer),
        HandshakeConfig::default(),
    );

    info!(profile = %profile_name, intervals, seed, "starting tag control loop");
    let report_period = Duration::from_millis(config.report_period_ms);
    let mut runtime = TagRuntime::start(
        config,
        reader,
        RampProbe::default(),
        Some(Box::new(reporter)),
        EntropyTable::from_seed(seed),
    )?;

    let context = runtime.context();
    for interval in 1..=intervals {
        thread::sleep(report_period);
        info!(
            interval,
            link_good = context.link_good(),
            n_skip = context.backoff.n_skip(),
            bursts = context.bursts_completed(),
            "status"
        );
    }
    runtime.shutdown();

    let frames = port.sent();
    let engaged_frames = frames.iter().filter(|f| f.first() == Some(&b'U')).count();
    info!(
        sessions = counters.sessions(),
        completed = counters.completed(),
        aborted = counters.aborted(),
        no_reader = counters.no_reader(),
        status_frames = frames.len(),
        secondary_engaged = engaged_frames,
        "run finished"
    );
    Ok(())
}
