//! Balance testing utilities for headless sessions.
//!
//! Runs sessions across many seeds and summarizes how far a loadout gets,
//! to spot difficulty regressions when wave or combat numbers change.

use sim_core::config::SimConfig;
use sim_core::events::PlayerEvent;
use sim_core::simulation::Simulation;

/// Result of one simulated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Seed the session ran with.
    pub seed: u32,
    /// Whether the session ended before the tick budget.
    pub ended: bool,
    /// Whether it ended in victory.
    pub won: bool,
    /// Highest wave reached.
    pub wave: u32,
    /// Ticks simulated.
    pub ticks: u64,
    /// Fortress health left.
    pub fortress_hp: u32,
    /// Enemies killed.
    pub kills: u32,
    /// Enemies that reached the fortress.
    pub leaks: u32,
    /// Final snapshot hash.
    pub final_hash: u32,
}

/// Statistics for a set of sessions.
#[derive(Debug, Clone, Default)]
pub struct OutcomeStats {
    /// Sessions run.
    pub total_sessions: u32,
    /// Sessions won.
    pub wins: u32,
    /// Sessions lost.
    pub losses: u32,
    /// Sessions still running at the tick budget.
    pub unfinished: u32,
    /// Average wave reached.
    pub avg_wave: f64,
    /// Lowest wave reached.
    pub min_wave: u32,
    /// Highest wave reached.
    pub max_wave: u32,
    /// Average leaks per session.
    pub avg_leaks: f64,
}

impl OutcomeStats {
    /// Summarize a batch of outcomes.
    #[must_use]
    pub fn from_outcomes(outcomes: &[SessionOutcome]) -> Self {
        if outcomes.is_empty() {
            return Self::default();
        }
        let total = outcomes.len() as f64;
        Self {
            total_sessions: outcomes.len() as u32,
            wins: outcomes.iter().filter(|o| o.won).count() as u32,
            losses: outcomes.iter().filter(|o| o.ended && !o.won).count() as u32,
            unfinished: outcomes.iter().filter(|o| !o.ended).count() as u32,
            avg_wave: outcomes.iter().map(|o| f64::from(o.wave)).sum::<f64>() / total,
            min_wave: outcomes.iter().map(|o| o.wave).min().unwrap_or(0),
            max_wave: outcomes.iter().map(|o| o.wave).max().unwrap_or(0),
            avg_leaks: outcomes.iter().map(|o| f64::from(o.leaks)).sum::<f64>() / total,
        }
    }

    /// Win rate (0.0 to 1.0).
    pub fn win_rate(&self) -> f64 {
        if self.total_sessions == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(self.total_sessions)
    }

    /// Check if the average wave reached lies within a band.
    pub fn is_within(&self, min_wave: f64, max_wave: f64) -> bool {
        self.avg_wave >= min_wave && self.avg_wave <= max_wave
    }
}

/// Run one session for at most `max_ticks`.
///
/// # Panics
///
/// Panics if the config is invalid or an event targets tick order badly.
#[must_use]
pub fn run_session(
    seed: u32,
    config: &SimConfig,
    events: &[PlayerEvent],
    max_ticks: u64,
) -> SessionOutcome {
    let sim = crate::fixtures::simulation_with_events(seed, config, events);
    finish(seed, sim, max_ticks)
}

fn finish(seed: u32, mut sim: Simulation, max_ticks: u64) -> SessionOutcome {
    sim.run_until(max_ticks);
    let state = sim.snapshot();
    tracing::debug!(seed, wave = state.wave, won = state.won, "Session finished");
    SessionOutcome {
        seed,
        ended: state.ended,
        won: state.won,
        wave: state.wave,
        ticks: state.tick,
        fortress_hp: state.store.fortress.health.current,
        kills: state.analytics.kills,
        leaks: state.analytics.leaks,
        final_hash: sim.state_hash(),
    }
}

/// Run the same loadout across `seeds`.
#[must_use]
pub fn sweep_seeds(
    seeds: impl IntoIterator<Item = u32>,
    config: &SimConfig,
    max_ticks: u64,
) -> Vec<SessionOutcome> {
    seeds
        .into_iter()
        .map(|seed| run_session(seed, config, &[], max_ticks))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{default_config, defenseless_config};

    fn outcome(seed: u32, wave: u32, ended: bool, won: bool) -> SessionOutcome {
        SessionOutcome {
            seed,
            ended,
            won,
            wave,
            ticks: 0,
            fortress_hp: 0,
            kills: 0,
            leaks: 2,
            final_hash: 0,
        }
    }

    #[test]
    fn test_outcome_stats() {
        let stats = OutcomeStats::from_outcomes(&[
            outcome(1, 10, true, false),
            outcome(2, 20, true, true),
            outcome(3, 30, false, false),
            outcome(4, 40, true, true),
        ]);
        assert_eq!(stats.total_sessions, 4);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.unfinished, 1);
        assert_eq!(stats.min_wave, 10);
        assert_eq!(stats.max_wave, 40);
        assert!((stats.avg_wave - 25.0).abs() < 0.001);
        assert!((stats.win_rate() - 0.5).abs() < 0.001);
        assert!(stats.is_within(20.0, 30.0));
    }

    #[test]
    fn test_empty_stats() {
        let stats = OutcomeStats::from_outcomes(&[]);
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.win_rate(), 0.0);
    }

    #[test]
    fn test_defenseless_fortress_falls() {
        let outcome = run_session(3, &defenseless_config(), &[], 20_000);
        assert!(outcome.ended);
        assert!(!outcome.won);
        assert_eq!(outcome.fortress_hp, 0);
        assert!(outcome.leaks > 0);
    }

    #[test]
    fn test_sweep_is_reproducible() {
        let first = sweep_seeds(1..4, &default_config(), 600);
        let second = sweep_seeds(1..4, &default_config(), 600);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
