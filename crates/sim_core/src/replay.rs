//! Session replays.
//!
//! A replay stores the seed, the starting configuration and every event the
//! player submitted. Feeding those back into a fresh [`Simulation`]
//! recreates the session exactly.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{SimConfig, SIM_VERSION};
use crate::error::{Result, SimError};
use crate::events::{GameEvent, PlayerEvent};
use crate::simulation::Simulation;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Engine build the replay was recorded with.
    pub sim_version: String,
    /// Session seed.
    pub seed: u32,
    /// Starting configuration.
    pub config: SimConfig,
    /// Events in submission order.
    pub events: Vec<PlayerEvent>,
    /// Tick the recording stopped at.
    pub final_tick: u64,
    /// Snapshot hash at `final_tick`.
    pub final_hash: u32,
}

impl Replay {
    /// Start an empty replay for a session.
    #[must_use]
    pub fn new(seed: u32, config: SimConfig) -> Self {
        Self {
            version: REPLAY_VERSION,
            sim_version: SIM_VERSION.to_string(),
            seed,
            config,
            events: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        }
    }

    /// Record an event for replay.
    pub fn record_event(&mut self, tick: u64, event: GameEvent) {
        self.events.push(PlayerEvent { tick, event });
    }

    /// Finalize the replay with the end state of `sim`.
    pub fn finalize(&mut self, sim: &Simulation) {
        self.final_tick = sim.tick();
        self.final_hash = sim.state_hash();
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| SimError::Serialization(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if reading or decoding fails, or if the replay was
    /// recorded by another format version or engine build.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| SimError::Serialization(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(SimError::IncompatibleReplay(format!(
                "format {} (expected {REPLAY_VERSION})",
                replay.version
            )));
        }
        if replay.sim_version != SIM_VERSION {
            return Err(SimError::IncompatibleReplay(format!(
                "recorded with {} (running {SIM_VERSION})",
                replay.sim_version
            )));
        }

        Ok(replay)
    }

    /// Fresh simulation with every recorded event queued.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn start(&self) -> Result<Simulation> {
        let mut sim = Simulation::create(self.seed, &self.config)?;
        for recorded in &self.events {
            sim.submit_event(recorded.event, recorded.tick)?;
        }
        Ok(sim)
    }

    /// Events targeting a specific tick.
    #[must_use]
    pub fn events_at_tick(&self, tick: u64) -> Vec<&PlayerEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Total duration of the replay in ticks.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.final_tick
    }

    /// Number of recorded events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    simulation: Simulation,
    /// Whether playback is paused.
    pub paused: bool,
}

impl ReplayPlayer {
    /// Create a player positioned at tick 0.
    ///
    /// # Errors
    /// Returns an error if the replay cannot be started.
    pub fn new(replay: Replay) -> Result<Self> {
        let simulation = replay.start()?;
        Ok(Self {
            replay,
            simulation,
            paused: false,
        })
    }

    /// Advance the replay by one tick.
    ///
    /// Returns true if there are more ticks to play.
    pub fn advance(&mut self) -> bool {
        if !self.paused && !self.is_finished() {
            self.simulation.step();
        }
        !self.is_finished()
    }

    /// Seek to a specific tick. Seeking backwards restarts from tick 0.
    ///
    /// # Errors
    /// Returns an error if the replay cannot be restarted.
    pub fn seek(&mut self, target_tick: u64) -> Result<()> {
        if target_tick < self.simulation.tick() {
            self.simulation = self.replay.start()?;
        }
        self.simulation
            .run_until(target_tick.min(self.replay.final_tick));
        Ok(())
    }

    /// Current tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.simulation.tick()
    }

    /// Current simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// The replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Whether playback reached the end of the recording.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.simulation.tick() >= self.replay.final_tick || self.simulation.is_ended()
    }

    /// Replay to the end and compare the final snapshot hash.
    ///
    /// # Errors
    /// Returns an error if the replay cannot be restarted.
    pub fn verify(&mut self) -> Result<bool> {
        self.seek(self.replay.final_tick)?;
        Ok(self.simulation.tick() == self.replay.final_tick
            && self.simulation.state_hash() == self.replay.final_hash)
    }

    /// Toggle pause state.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Progress through the recording, in whole percent.
    #[must_use]
    pub fn progress_percent(&self) -> u32 {
        if self.replay.final_tick == 0 {
            100
        } else {
            (self.simulation.tick() * 100 / self.replay.final_tick) as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TurretKind;

    fn recorded(ticks: u64) -> Replay {
        let config = SimConfig::default();
        let mut replay = Replay::new(12345, config.clone());
        let mut sim = Simulation::create(12345, &config).unwrap();
        let events = [
            (
                20,
                GameEvent::PlaceTurret {
                    slot: 3,
                    kind: TurretKind::Arc,
                },
            ),
            (95, GameEvent::DeployMilitia { count: 2 }),
        ];
        for (tick, event) in events {
            sim.submit_event(event, tick).unwrap();
            replay.record_event(tick, event);
        }
        sim.run_until(ticks);
        replay.finalize(&sim);
        replay
    }

    #[test]
    fn test_replay_create() {
        let replay = Replay::new(7, SimConfig::default());
        assert_eq!(replay.version, REPLAY_VERSION);
        assert_eq!(replay.sim_version, SIM_VERSION);
        assert_eq!(replay.seed, 7);
        assert!(replay.events.is_empty());
    }

    #[test]
    fn test_replay_record_events() {
        let replay = recorded(10);
        assert_eq!(replay.event_count(), 2);
        assert_eq!(replay.events_at_tick(20).len(), 1);
        assert_eq!(replay.events_at_tick(21).len(), 0);
        assert_eq!(replay.duration(), 10);
    }

    #[test]
    fn test_replay_save_load() {
        let replay = recorded(100);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.replay");
        replay.save(&path).unwrap();

        let loaded = Replay::load(&path).unwrap();
        assert_eq!(loaded, replay);
    }

    #[test]
    fn test_replay_load_rejects_other_build() {
        let mut replay = recorded(5);
        replay.sim_version = "sim-core/0.0.1".to_string();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.replay");
        replay.save(&path).unwrap();

        assert!(matches!(
            Replay::load(&path),
            Err(SimError::IncompatibleReplay(_))
        ));
    }

    #[test]
    fn test_replay_player_advance() {
        let mut player = ReplayPlayer::new(recorded(10)).unwrap();
        for _ in 0..5 {
            assert!(player.advance());
        }
        assert_eq!(player.current_tick(), 5);
        assert!(!player.is_finished());

        while player.advance() {}
        assert!(player.is_finished());
        assert_eq!(player.current_tick(), 10);
    }

    #[test]
    fn test_replay_player_seek() {
        let mut player = ReplayPlayer::new(recorded(200)).unwrap();
        player.seek(150).unwrap();
        assert_eq!(player.current_tick(), 150);
        let forward = player.simulation().state_hash();

        player.seek(10).unwrap();
        assert_eq!(player.current_tick(), 10);
        player.seek(150).unwrap();
        assert_eq!(player.simulation().state_hash(), forward);
    }

    #[test]
    fn test_replay_player_pause() {
        let mut player = ReplayPlayer::new(recorded(100)).unwrap();
        player.paused = true;
        player.advance();
        assert_eq!(player.current_tick(), 0);

        player.toggle_pause();
        player.advance();
        assert_eq!(player.current_tick(), 1);
    }

    #[test]
    fn test_replay_verify() {
        let mut player = ReplayPlayer::new(recorded(300)).unwrap();
        assert!(player.verify().unwrap());
        assert_eq!(player.progress_percent(), 100);

        let mut tampered = recorded(300);
        tampered.events.pop();
        let mut player = ReplayPlayer::new(tampered).unwrap();
        assert!(!player.verify().unwrap());
    }
}
