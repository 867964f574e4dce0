//! Pellet gauge trace replay host.
//!
//! Drives one tracker from a recorded trace on stdin and prints the final
//! display snapshot as JSON.
//!
//! ```text
//!  stdin trace ─▶ ReplayObservations ─▶ UpdateScheduler ─▶ TrackerService
//!                                                            │    │
//!                                   FileStore (state dir) ◀──┘    └─▶ LogEventSink
//! ```
//!
//! Usage: `pelletgauge <config.json> [state-dir]`
//!
//! Trace lines (times are seconds from process start):
//!
//! ```text
//! <secs> <signal-id> <value>
//! <secs> refill
//! <secs> set <kg> [calibrate]
//! <secs> tick
//! ```
#![deny(unused_must_use)]

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use pelletgauge::TrackerService;
use pelletgauge::adapters::kv_store::{FileStore, JsonConfigFile};
use pelletgauge::adapters::log_sink::LogEventSink;
use pelletgauge::adapters::replay::ReplayObservations;
use pelletgauge::adapters::time::SystemClock;
use pelletgauge::app::commands::TrackerCommand;
use pelletgauge::app::ports::{ClockPort, ConfigPort, SchedulerDelegate, UpdateReason};
use pelletgauge::estimator::Timestamp;
use pelletgauge::scheduler::UpdateScheduler;

const USAGE: &str = "usage: pelletgauge <config.json> [state-dir]";
const DEFAULT_STATE_DIR: &str = ".pelletgauge";

// ── Scheduler delegate ────────────────────────────────────────
//
// Bridges the scheduler (which knows nothing about the tracker) to
// `TrackerService::update`.

struct UpdateDelegate<'a> {
    service: &'a mut TrackerService,
    observations: &'a mut ReplayObservations,
}

impl SchedulerDelegate for UpdateDelegate<'_> {
    fn on_update_due(&mut self, at: Timestamp, reason: UpdateReason) {
        if let Err(e) = self.service.update(at, &mut *self.observations) {
            warn!("Update ({:?}) at {} failed: {}", reason, at, e);
        }
    }
}

// ── Trace parsing ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum TraceAction {
    Signal { id: String, value: String },
    Command(TrackerCommand),
}

#[derive(Debug, Clone, PartialEq)]
struct TraceEntry {
    offset_ms: i64,
    action: TraceAction,
}

fn parse_line(line: &str) -> Result<TraceEntry> {
    let mut parts = line.split_whitespace();
    let secs: f64 = parts
        .next()
        .context("empty line")?
        .parse()
        .context("time offset is not a number")?;
    if !secs.is_finite() || secs < 0.0 {
        bail!("time offset must be a non-negative number");
    }
    let millis = (secs * 1000.0).round();
    // i64::MAX as f64 rounds up to 2^63, itself out of range.
    if millis >= i64::MAX as f64 {
        bail!("time offset {}s is out of range", secs);
    }
    let offset_ms = millis as i64;

    let action = match parts.next().context("missing action")? {
        "refill" => TraceAction::Command(TrackerCommand::Refill),
        "tick" => TraceAction::Command(TrackerCommand::Update),
        "set" => {
            let kg: f64 = parts
                .next()
                .context("set needs a level in kg")?
                .parse()
                .context("level is not a number")?;
            let calibrate = match parts.next() {
                None => false,
                Some("calibrate") => true,
                Some(other) => bail!("unexpected '{}' after set level", other),
            };
            TraceAction::Command(TrackerCommand::set_level_kg(kg, calibrate))
        }
        id => {
            let value: Vec<&str> = parts.by_ref().collect();
            if value.is_empty() {
                bail!("signal '{}' has no value", id);
            }
            TraceAction::Signal {
                id: id.to_owned(),
                value: value.join(" "),
            }
        }
    };

    if parts.next().is_some() {
        bail!("trailing input");
    }
    Ok(TraceEntry { offset_ms, action })
}

// ── Entry point ───────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = PathBuf::from(args.next().context(USAGE)?);
    let state_dir = args.next().map_or_else(|| PathBuf::from(DEFAULT_STATE_DIR), PathBuf::from);

    let config = JsonConfigFile::new(&config_path)
        .load()
        .with_context(|| format!("loading {}", config_path.display()))?;
    let mut store = FileStore::open(&state_dir)
        .with_context(|| format!("opening state dir {}", state_dir.display()))?;

    let start = SystemClock::new().now();
    let mut service = TrackerService::new(config.clone())?;
    service.add_listener(LogEventSink::new(config.name.clone()))?;
    service.initialize(start, &store)?;

    let mut observations = ReplayObservations::for_config(&config);
    let mut scheduler = UpdateScheduler::new(config.update_interval_secs, start);

    for (index, line) in io::stdin().lock().lines().enumerate() {
        let line = line.context("reading trace")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry = parse_line(line).with_context(|| format!("trace line {}: '{}'", index + 1, line))?;
        let at = start.offset_millis(entry.offset_ms);

        scheduler.advance_to(
            at,
            &mut UpdateDelegate {
                service: &mut service,
                observations: &mut observations,
            },
        );

        match entry.action {
            TraceAction::Signal { id, value } => {
                if observations.apply(&id, &value) {
                    let status = observations.status().map(str::to_owned);
                    let power = observations.power_level().map(str::to_owned);
                    scheduler.observe(
                        at,
                        status.as_deref(),
                        power.as_deref(),
                        &mut UpdateDelegate {
                            service: &mut service,
                            observations: &mut observations,
                        },
                    );
                }
            }
            TraceAction::Command(cmd) => service.handle_command(cmd, at, &mut observations)?,
        }

        service.save_if_dirty(&mut store);
    }

    if service.is_persist_pending() && !service.save_if_dirty(&mut store) {
        warn!("Final state could not be saved to {}", state_dir.display());
    }
    info!("Replay finished after {} updates", service.update_count());
    println!("{}", serde_json::to_string_pretty(&service.snapshot())?);
    service.close();
    Ok(())
}
