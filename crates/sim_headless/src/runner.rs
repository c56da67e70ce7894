//! Headless session runner.
//!
//! Plays one session with an [`Autopilot`], recording closed segments in
//! the submission wire format and the whole session as a [`Replay`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use sim_core::config::SimConfig;
use sim_core::replay::Replay;
use sim_core::segment::{Segment, SegmentRecorder, SegmentSubmission};
use tracing::{debug, info};

use crate::error::Result;
use crate::metrics::SessionMetrics;
use crate::strategies::{Autopilot, Strategy};

/// Default tick budget: final wave 50 finishes well inside this.
pub const DEFAULT_MAX_TICKS: u64 = 60_000;

/// Drives a session to completion.
#[derive(Debug)]
pub struct HeadlessRunner {
    seed: u32,
    recorder: SegmentRecorder,
    autopilot: Autopilot,
    replay: Replay,
    segments: Vec<Segment>,
}

impl HeadlessRunner {
    /// Runner at tick 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the loadout is invalid.
    pub fn new(seed: u32, config: &SimConfig, strategy: Strategy) -> Result<Self> {
        Ok(Self {
            seed,
            recorder: SegmentRecorder::new(seed, config)?,
            autopilot: Autopilot::new(strategy),
            replay: Replay::new(seed, config.clone()),
            segments: Vec::new(),
        })
    }

    /// Play one tick. Returns false once the session has ended.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder refuses an event.
    pub fn tick(&mut self) -> Result<bool> {
        let sim = self.recorder.simulation();
        if sim.is_ended() {
            return Ok(false);
        }
        let tick = sim.tick();
        let events = self.autopilot.decide(sim.snapshot());
        for event in events {
            self.recorder.submit(event, tick)?;
            self.replay.record_event(tick, event);
        }
        if let Some(segment) = self.recorder.step() {
            debug!(
                seed = self.seed,
                index = segment.index,
                end_tick = segment.end_tick,
                "Segment recorded"
            );
            self.segments.push(segment);
        }
        Ok(!self.recorder.simulation().is_ended())
    }

    /// Play until the session ends or `max_ticks` is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder refuses an event.
    pub fn run(mut self, max_ticks: u64) -> Result<SessionRun> {
        while self.recorder.simulation().tick() < max_ticks && self.tick()? {}

        let sim = self.recorder.simulation();
        self.replay.finalize(sim);
        let metrics = SessionMetrics::collect(
            self.seed,
            self.autopilot.name(),
            sim,
            self.segments.len() as u32,
        );
        info!(
            seed = self.seed,
            strategy = %metrics.strategy,
            wave = metrics.wave,
            won = metrics.won,
            ticks = metrics.duration_ticks,
            "Session finished"
        );
        Ok(SessionRun {
            metrics,
            config: self.replay.config.clone(),
            segments: self.segments,
            replay: self.replay,
        })
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct SessionRun {
    /// Outcome.
    pub metrics: SessionMetrics,
    /// Starting loadout.
    pub config: SimConfig,
    /// Closed segments in order.
    pub segments: Vec<Segment>,
    /// Full-session replay.
    pub replay: Replay,
}

impl SessionRun {
    /// Package the closed segments as a recording file.
    ///
    /// # Errors
    ///
    /// Returns an error if an event cannot be put in wire form.
    pub fn recording(&self) -> Result<SessionRecording> {
        let submissions = self
            .segments
            .iter()
            .map(Segment::to_submission)
            .collect::<sim_core::error::Result<Vec<_>>>()?;
        Ok(SessionRecording {
            seed: self.metrics.seed,
            strategy: self.metrics.strategy.clone(),
            config: self.config.clone(),
            submissions,
        })
    }
}

/// What a client would have sent, segment by segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecording {
    /// Session seed.
    pub seed: u32,
    /// Strategy that played it.
    pub strategy: String,
    /// Starting loadout.
    pub config: SimConfig,
    /// Submissions in segment order.
    pub submissions: Vec<SegmentSubmission>,
}

impl SessionRecording {
    /// Save as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
