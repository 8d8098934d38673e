use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use replay_engine::{ReplayConfig, ReplayController, TickStats};
use replay_geodesy::SphericalEarth;
use replay_tools::ReplayInspector;
use replay_world::{FileLocator, World};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "replay-cli", about = "Inspect and play back trajectory logs")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a log and print the histories it describes
    Inspect {
        /// Trajectory log file
        log: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Step a replay through host time against an in-memory world
    Play {
        /// Trajectory log file; overrides `log_path` from --config
        log: Option<PathBuf>,
        /// YAML replay configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Host time at which replay time zero occurs; overrides --config
        #[arg(long)]
        offset: Option<f64>,
        /// First host time; defaults to the start of the log
        #[arg(long)]
        start: Option<f64>,
        /// Last host time; defaults to the end of the log
        #[arg(long)]
        end: Option<f64>,
        /// Host time increment per tick
        #[arg(long, default_value = "1.0")]
        step: f64,
        /// Emit one JSON object per tick
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { log, json } => inspect(&log, json),
        Commands::Play {
            log,
            config,
            offset,
            start,
            end,
            step,
            json,
        } => {
            let mut replay = match &config {
                Some(path) => ReplayConfig::from_yaml_file(path)
                    .with_context(|| format!("reading config {}", path.display()))?,
                None => ReplayConfig::default(),
            };
            if let Some(log) = log {
                replay.log_path = log.display().to_string();
            }
            if let Some(offset) = offset {
                replay.time_offset = offset;
            }
            if replay.log_path.is_empty() {
                bail!("no log given; pass a log file or a config with log_path");
            }
            let base = config.as_deref().and_then(Path::parent);
            play(replay, base, start, end, step, json)
        }
    }
}

fn inspect(log: &Path, json: bool) -> anyhow::Result<()> {
    let histories = replay_track::load_histories(log, SphericalEarth::default())
        .with_context(|| format!("loading {}", log.display()))?;
    let summary = ReplayInspector::history_summary(&histories);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
        for entity in &summary.entities {
            println!("  {entity}");
        }
    }
    Ok(())
}

fn play(
    config: ReplayConfig,
    base: Option<&Path>,
    start: Option<f64>,
    end: Option<f64>,
    step: f64,
    json: bool,
) -> anyhow::Result<()> {
    if !(step.is_finite() && step > 0.0) {
        bail!("--step must be a positive number, got {step}");
    }

    let mut locator = FileLocator::new().with_search_path(".");
    if let Some(dir) = base {
        locator.add_search_path(dir);
    }
    let earth = SphericalEarth::default();
    let world = World::new().with_locator(locator);
    let mut controller = ReplayController::new(world, earth);

    let offset = config.time_offset;
    for change in config.into_changes() {
        controller.on_config_changed(change)?;
    }
    if let Some(err) = controller.last_load_error() {
        bail!("failed to load replay log: {err}");
    }

    let span = controller.histories().time_span();
    let (Some(start), Some(end)) = (
        start.or(span.map(|(s, _)| s + offset)),
        end.or(span.map(|(_, e)| e + offset)),
    ) else {
        bail!("log holds no timed events; pass --start and --end");
    };
    tracing::info!(start, end, step, offset, "playing replay");

    let ticks = ((end - start) / step).floor().max(0.0) as u64;
    run_ticks(&mut controller, start, step, ticks, |host_time, stats, events| {
        if json {
            println!("{}", serde_json::to_string(stats)?);
        } else {
            println!(
                "t={host_time:.3} replay={:.3} +{} ~{} -{} live={} events={events}",
                stats.query_time, stats.created, stats.updated, stats.removed, stats.materialized
            );
        }
        Ok(())
    })?;

    if !json {
        println!("{}", ReplayInspector::world_summary(controller.host()));
        for entity in ReplayInspector::list_entities(controller.host(), &earth) {
            println!("  {entity}");
        }
    }

    controller.teardown();
    Ok(())
}

/// Tick host time `start`, `start + step`, ... over `ticks + 1` ticks.
///
/// The world's event log is drained after the initial seek and after every
/// tick; `report` receives the number of host mutations the tick made.
fn run_ticks(
    controller: &mut ReplayController<World, SphericalEarth>,
    start: f64,
    step: f64,
    ticks: u64,
    mut report: impl FnMut(f64, &TickStats, usize) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    controller.host_mut().drain_events();
    for i in 0..=ticks {
        let host_time = start + i as f64 * step;
        controller.host_mut().set_time(host_time);
        let stats = controller.on_time_tick(host_time)?;
        let events = controller.host_mut().drain_events().len();
        report(host_time, &stats, events)?;
    }
    Ok(())
}
