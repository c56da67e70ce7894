//! Batch session runner for balance and determinism testing.
//!
//! Runs many seeds in parallel using rayon. Each session is itself
//! single-threaded.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sim_core::config::SimConfig;
use tracing::{debug, info, warn};

use crate::error::{HeadlessError, Result};
use crate::metrics::{BatchSummary, SessionMetrics};
use crate::runner::{HeadlessRunner, DEFAULT_MAX_TICKS};
use crate::strategies::Strategy;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of sessions to run
    pub game_count: u32,
    /// Seed of the first session; the rest follow consecutively
    pub seed_start: u32,
    /// Maximum parallel sessions (0 = use rayon default)
    pub parallel_games: usize,
    /// Tick budget per session
    pub max_ticks: u64,
    /// Autopilot
    pub strategy: Strategy,
    /// Starting loadout
    pub config: SimConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            seed_start: 0,
            parallel_games: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            strategy: Strategy::default(),
            config: SimConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` sessions of `strategy`
    pub fn new(strategy: Strategy, game_count: u32) -> Self {
        Self {
            strategy,
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set tick budget
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    fn seeds(&self) -> impl ParallelIterator<Item = u32> + '_ {
        (0..self.game_count)
            .into_par_iter()
            .map(move |i| self.seed_start.wrapping_add(i))
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Per-session metrics, in seed order
    pub games: Vec<SessionMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Sessions that failed to run
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Seed used
    pub seed: u32,
    /// Error message
    pub message: String,
}

fn run_single(config: &BatchConfig, seed: u32) -> Result<SessionMetrics> {
    let runner = HeadlessRunner::new(seed, &config.config, config.strategy.clone())?;
    Ok(runner.run(config.max_ticks)?.metrics)
}

/// Run `f` on a pool of `threads` (0 = rayon's global pool).
fn in_pool<T: Send>(threads: usize, f: impl FnOnce() -> T + Send) -> Result<T> {
    if threads == 0 {
        return Ok(f());
    }
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    Ok(pool.install(f))
}

/// Run a batch of sessions
pub fn run_batch(config: BatchConfig) -> Result<BatchResults> {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(
        "Starting batch run: {} sessions of '{}'",
        config.game_count, config.strategy.name
    );

    let results: Vec<(u32, Result<SessionMetrics>)> = in_pool(config.parallel_games, || {
        config
            .seeds()
            .map(|seed| {
                let result = run_single(&config, seed);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 10 == 0 {
                    debug!("Progress: {}/{}", done, config.game_count);
                }
                (seed, result)
            })
            .collect()
    })?;

    let mut games = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for (seed, result) in results {
        match result {
            Ok(metrics) => games.push(metrics),
            Err(e) => {
                warn!("Session {} failed: {}", seed, e);
                errors.push(BatchError {
                    seed,
                    message: e.to_string(),
                });
            }
        }
    }

    let summary = BatchSummary::from_sessions(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        "Batch complete: {} sessions in {:.1}s, avg wave {:.1}, win rate {:.0}%",
        games.len(),
        duration_seconds,
        summary.avg_wave,
        summary.win_rate() * 100.0
    );

    Ok(BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    })
}

/// One seed whose runs disagreed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divergence {
    /// Seed.
    pub seed: u32,
    /// Final hash of each run, hex.
    pub hashes: Vec<String>,
}

/// Outcome of a determinism sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismReport {
    /// Seeds checked.
    pub checked: usize,
    /// Runs per seed.
    pub runs: u32,
    /// Seeds whose runs disagreed, ascending.
    pub divergent: Vec<Divergence>,
}

impl DeterminismReport {
    /// Whether every seed agreed with itself.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.divergent.is_empty()
    }

    /// Error if any seed diverged.
    pub fn into_result(self) -> Result<Self> {
        match self.divergent.first() {
            None => Ok(self),
            Some(first) => Err(HeadlessError::NonDeterministic {
                checked: self.checked,
                count: self.divergent.len(),
                first_seed: first.seed,
            }),
        }
    }
}

/// Play every seed `runs` times and compare final hashes.
///
/// Runs of one seed execute on different pool threads, so a hash that
/// depends on scheduling shows up here.
pub fn check_determinism(config: &BatchConfig, runs: u32) -> Result<DeterminismReport> {
    let runs = runs.max(2);
    let outcomes: Vec<(u32, String)> = in_pool(config.parallel_games, || {
        config
            .seeds()
            .flat_map(|seed| (0..runs).into_par_iter().map(move |_| seed))
            .map(|seed| run_single(config, seed).map(|m| (seed, m.final_state_hash)))
            .collect::<Result<Vec<_>>>()
    })??;

    let mut divergent = Vec::new();
    for chunk in outcomes.chunks(runs as usize) {
        let seed = chunk[0].0;
        let hashes: Vec<String> = chunk.iter().map(|(_, h)| h.clone()).collect();
        if hashes.iter().any(|h| *h != hashes[0]) {
            warn!(seed, ?hashes, "Seed diverged");
            divergent.push(Divergence { seed, hashes });
        }
    }

    info!(
        seeds = config.game_count,
        runs,
        divergent = divergent.len(),
        "Determinism check complete"
    );
    Ok(DeterminismReport {
        checked: config.game_count as usize,
        runs,
        divergent,
    })
}
