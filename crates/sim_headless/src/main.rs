//! Headless Bastion Defense runner.
//!
//! Plays sessions with a scripted autopilot. Designed for CI, balance
//! testing and checking that recorded sessions verify.
//!
//! # Usage
//!
//! ```bash
//! # Play one session, save submissions and a replay
//! cargo run -p sim_headless -- play --seed 7 --strategy turtle --output s.json --replay s.replay
//!
//! # Verify a recording segment by segment
//! cargo run -p sim_headless -- verify --input s.json
//!
//! # Balance sweep
//! cargo run -p sim_headless -- batch --count 500 --output results/batch.json
//!
//! # Determinism across seeds
//! cargo run -p sim_headless -- determinism --count 100 --runs 3
//!
//! # Check a replay file
//! cargo run -p sim_headless -- replay --file s.replay
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sim_core::config::SimConfig;
use sim_core::replay::{Replay, ReplayPlayer};
use sim_headless::{
    batch::{check_determinism, run_batch, BatchConfig},
    runner::{HeadlessRunner, SessionRecording, DEFAULT_MAX_TICKS},
    strategies::Strategy,
    verify::{first_rejection, verify_recording},
    Result,
};

#[derive(Parser)]
#[command(name = "sim_headless")]
#[command(about = "Headless Bastion Defense runner for CI and balance testing")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one session with the autopilot
    Play {
        /// Session seed
        #[arg(long, default_value = "12345")]
        seed: u32,

        /// Strategy preset (balanced, turtle, greedy, idle) or a .ron file
        #[arg(short, long, default_value = "balanced")]
        strategy: String,

        /// Loadout RON file (default loadout if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Tick budget
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,

        /// Write segment submissions to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a session replay to this file
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Verify a recorded session segment by segment
    Verify {
        /// Recording JSON file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Run many seeds for balance testing
    Batch {
        /// Number of sessions
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// First seed
        #[arg(long, default_value = "0")]
        seed: u32,

        /// Strategy preset or .ron file
        #[arg(short, long, default_value = "balanced")]
        strategy: String,

        /// Loadout RON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum parallel sessions (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: usize,

        /// Tick budget per session
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,

        /// Save results JSON here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run every seed several times and compare final hashes
    Determinism {
        /// Number of seeds
        #[arg(short = 'n', long, default_value = "50")]
        count: u32,

        /// First seed
        #[arg(long, default_value = "0")]
        seed: u32,

        /// Runs per seed
        #[arg(short, long, default_value = "2")]
        runs: u32,

        /// Strategy preset or .ron file
        #[arg(short, long, default_value = "balanced")]
        strategy: String,

        /// Tick budget per run
        #[arg(long, default_value = "6000")]
        max_ticks: u64,

        /// Maximum parallel runs (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: usize,
    },

    /// Replay a session replay file and check its final hash
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for results)
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

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether the command's check passed.
fn run(command: Commands) -> Result<bool> {
    match command {
        Commands::Play {
            seed,
            strategy,
            config,
            max_ticks,
            output,
            replay,
        } => cmd_play(seed, &strategy, config, max_ticks, output, replay),
        Commands::Verify { input } => cmd_verify(input),
        Commands::Batch {
            count,
            seed,
            strategy,
            config,
            parallel,
            max_ticks,
            output,
        } => {
            let mut batch = BatchConfig::new(Strategy::resolve(&strategy)?, count)
                .with_seed(seed)
                .with_max_ticks(max_ticks);
            batch.config = load_config(config)?;
            batch.parallel_games = parallel;
            cmd_batch(batch, output)
        }
        Commands::Determinism {
            count,
            seed,
            runs,
            strategy,
            max_ticks,
            parallel,
        } => {
            let mut batch = BatchConfig::new(Strategy::resolve(&strategy)?, count)
                .with_seed(seed)
                .with_max_ticks(max_ticks);
            batch.parallel_games = parallel;
            let report = check_determinism(&batch, runs)?;
            println!("{}", serde_json::to_string(&report)?);
            Ok(report.is_deterministic())
        }
        Commands::Replay { file } => cmd_replay(file),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<SimConfig> {
    match path {
        Some(path) => Ok(SimConfig::load(path)?),
        None => Ok(SimConfig::default()),
    }
}

fn cmd_play(
    seed: u32,
    strategy: &str,
    config: Option<PathBuf>,
    max_ticks: u64,
    output: Option<PathBuf>,
    replay: Option<PathBuf>,
) -> Result<bool> {
    let config = load_config(config)?;
    let runner = HeadlessRunner::new(seed, &config, Strategy::resolve(strategy)?)?;
    let run = runner.run(max_ticks)?;

    if let Some(path) = output {
        run.recording()?.save(&path)?;
        tracing::info!("Wrote {} segments to {}", run.segments.len(), path.display());
    }
    if let Some(path) = replay {
        run.replay.save(&path)?;
        tracing::info!("Wrote replay to {}", path.display());
    }
    println!("{}", serde_json::to_string(&run.metrics)?);
    Ok(true)
}

fn cmd_verify(input: PathBuf) -> Result<bool> {
    let recording = SessionRecording::load(&input)?;
    let reports = verify_recording(&recording)?;
    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }
    match first_rejection(&reports) {
        None => {
            tracing::info!("All {} segments verified", reports.len());
            Ok(true)
        }
        Some(code) => {
            tracing::warn!("Recording rejected: {code}");
            Ok(false)
        }
    }
}

fn cmd_batch(batch: BatchConfig, output: Option<PathBuf>) -> Result<bool> {
    let results = run_batch(batch)?;
    if let Some(path) = output {
        results.save(&path)?;
        tracing::info!("Results saved to {}", path.display());
    }
    println!("{}", serde_json::to_string(&results.summary)?);
    Ok(results.errors.is_empty())
}

fn cmd_replay(file: PathBuf) -> Result<bool> {
    let replay = Replay::load(&file)?;
    tracing::info!(
        "Replay: seed {}, {} events, {} ticks",
        replay.seed,
        replay.event_count(),
        replay.final_tick
    );
    let mut player = ReplayPlayer::new(replay)?;
    let matches = player.verify()?;
    if matches {
        tracing::info!("Replay verified at tick {}", player.current_tick());
    } else {
        tracing::warn!("Replay diverged from its recorded hash");
    }
    Ok(matches)
}
