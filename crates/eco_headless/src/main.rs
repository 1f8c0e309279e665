//! Headless ecosystem runner CLI.
//!
//! Usage:
//!   eco_headless run [--seed N] [--frames N]     # Interactive JSON session
//!   eco_headless batch --count N --output dir    # Many seeds in parallel
//!   eco_headless benchmark --ticks N             # Raw step throughput
//!   eco_headless verify --seed N --ticks N       # Delta replay and determinism

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eco_core::config::EcosystemConfig;
use eco_core::simulation::Simulation;
use eco_headless::batch::{run_batch, BatchConfig};
use eco_headless::config::{load_ecosystem, HeadlessConfig};
use eco_headless::protocol::{Event, PROTOCOL_VERSION};
use eco_headless::session::{forward_control_lines, Session};
use eco_headless::verify::{replay_hashes, verify_delta_replay};
use eco_headless::Result;

#[derive(Parser)]
#[command(name = "eco_headless")]
#[command(about = "Headless ecosystem simulation runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// World config file (RON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive session (stdin control, stdout events)
    Run {
        /// World seed
        #[arg(short, long, default_value = "1")]
        seed: u64,

        /// Stop after this many frames (0 = until quit)
        #[arg(short, long, default_value = "0")]
        frames: u64,

        /// Frame period in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: u64,

        /// Start paused
        #[arg(long)]
        paused: bool,
    },

    /// Run many seeds in parallel and save population metrics
    Batch {
        /// Number of worlds
        #[arg(short = 'n', long, default_value = "16")]
        count: u32,

        /// Steps per world
        #[arg(short, long, default_value = "2000")]
        ticks: u64,

        /// Worker threads (0 = all cores)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// First seed
        #[arg(short, long, default_value = "0")]
        seed: u64,
    },

    /// Measure raw step throughput
    Benchmark {
        /// Steps to run
        #[arg(short, long, default_value = "1000")]
        ticks: u64,

        /// World seed
        #[arg(short, long, default_value = "1")]
        seed: u64,
    },

    /// Check delta replay and seeded determinism
    Verify {
        /// World seed
        #[arg(short, long, default_value = "1")]
        seed: u64,

        /// Steps to run
        #[arg(short, long, default_value = "600")]
        ticks: u64,

        /// Steps between deltas
        #[arg(short, long, default_value = "1")]
        every: u64,

        /// Determinism replays
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let config_path = cli.config;
    let result = match cli.command {
        Some(Commands::Run {
            seed,
            frames,
            frame_ms,
            paused,
        }) => cmd_run(&HeadlessConfig {
            config_path,
            seed,
            frame_ms,
            max_frames: frames,
            start_paused: paused,
        }),
        Some(Commands::Batch {
            count,
            ticks,
            parallel,
            output,
            seed,
        }) => load_ecosystem(config_path.as_deref()).and_then(|ecosystem| {
            cmd_batch(
                BatchConfig::new(count)
                    .with_seed(seed)
                    .with_ticks(ticks)
                    .with_parallel(parallel)
                    .with_ecosystem(ecosystem),
                &output,
            )
        }),
        Some(Commands::Benchmark { ticks, seed }) => load_ecosystem(config_path.as_deref())
            .map(|ecosystem| cmd_benchmark(ecosystem, seed, ticks)),
        Some(Commands::Verify {
            seed,
            ticks,
            every,
            runs,
        }) => load_ecosystem(config_path.as_deref())
            .and_then(|ecosystem| cmd_verify(&ecosystem, seed, ticks, every, runs)),
        None => cmd_run(&HeadlessConfig {
            config_path,
            ..HeadlessConfig::default()
        }),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

/// Run an interactive session until quit or the frame limit.
fn cmd_run(config: &HeadlessConfig) -> Result<()> {
    let ecosystem = config.ecosystem()?;
    let sim = Simulation::new(ecosystem, config.seed);
    tracing::info!(seed = config.seed, "Starting interactive session");

    let ready = Event::Ready {
        version: PROTOCOL_VERSION.to_string(),
        seed: sim.seed(),
        width: sim.config().world.width,
        height: sim.config().world.height,
    };
    emit(&ready)?;

    let session = Session::spawn(sim, config, io::stdout())?;
    let control = session.control();
    // Detached: a blocked stdin read must not keep the process alive
    std::thread::spawn(move || {
        let forwarded = forward_control_lines(io::stdin().lock(), &control);
        tracing::debug!(forwarded, "Control input closed");
    });

    let (owner, consumer) = session.join()?;
    tracing::info!(
        applied = consumer.applied,
        rejected = consumer.rejected,
        resyncs = consumer.resyncs,
        "Session finished"
    );
    emit(&Event::Stopped {
        frames: owner.frames,
        steps: owner.steps,
        resets: owner.resets,
        tick: owner.tick,
    })
}

fn emit(event: &Event) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(event.to_json_line().as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Run many seeds and save the results.
fn cmd_batch(config: BatchConfig, output: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(output)?;
    let results = run_batch(config)?;

    let results_path = output.join("batch_results.json");
    results.save(&results_path)?;

    let s = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Worlds run: {}", results.runs.len());
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Worlds with reset: {} ({} resets total)",
        s.runs_with_reset, s.total_resets
    );
    eprintln!("Mean final creatures: {:.1}", s.mean_final_creatures);
    eprintln!("Mean peak agents: {:.1}", s.mean_peak_agents);
    eprintln!("Kills: {}", s.total_predations);
    eprintln!("\nResults saved to: {}", results_path.display());
    Ok(())
}

/// Time raw steps with no snapshot traffic.
fn cmd_benchmark(ecosystem: EcosystemConfig, seed: u64, ticks: u64) {
    let dt = ecosystem.timing.fixed_dt;
    let mut sim = Simulation::new(ecosystem, seed);
    let start_creatures = sim.store().creature_count();

    let start = Instant::now();
    let mut slowest_ms = 0.0_f64;
    for _ in 0..ticks {
        let step_start = Instant::now();
        sim.step(dt);
        let step_ms = step_start.elapsed().as_secs_f64() * 1000.0;
        slowest_ms = slowest_ms.max(step_ms);
        sim.record_step_time(step_ms);
    }
    let elapsed = start.elapsed();

    let tps = ticks as f64 / elapsed.as_secs_f64().max(1e-9);
    eprintln!("Benchmark Results:");
    eprintln!("  Ticks: {ticks}");
    eprintln!("  Creatures: {start_creatures} -> {}", sim.store().creature_count());
    eprintln!("  Time: {:.3}s", elapsed.as_secs_f64());
    eprintln!("  TPS: {tps:.0}");
    eprintln!("  Avg step: {:.3}ms", sim.governor().avg_step_ms());
    eprintln!("  Slowest step: {slowest_ms:.3}ms");
    eprintln!("  Load band: {:?}", sim.governor().band());
    eprintln!("  Resets: {}", sim.resets());
}

/// Check delta replay and seeded determinism.
fn cmd_verify(
    ecosystem: &EcosystemConfig,
    seed: u64,
    ticks: u64,
    every: u64,
    runs: u32,
) -> Result<()> {
    let report = verify_delta_replay(ecosystem, seed, ticks, every)?;
    eprintln!("Delta replay: {} messages ({} full)", report.messages, report.fulls);
    eprintln!("  Delta/full size: {:.3}", report.delta_ratio());

    let hashes = replay_hashes(ecosystem, seed, ticks, runs);
    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    if report.passed() && deterministic {
        eprintln!("✓ Replay verified ({runs} runs, {ticks} ticks)");
        return Ok(());
    }
    if !report.passed() {
        eprintln!("✗ Mirror diverged at ticks {:?}", report.mismatched_ticks);
    }
    if !deterministic {
        eprintln!("✗ Final hashes differ: {hashes:?}");
    }
    std::process::exit(1);
}
