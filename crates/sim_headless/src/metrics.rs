//! Session metrics for balance analysis.

use serde::{Deserialize, Serialize};
use sim_core::checkpoint::hash_hex;
use sim_core::simulation::Simulation;

/// Metrics for a single session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Seed used.
    pub seed: u32,
    /// Strategy name.
    pub strategy: String,
    /// Ticks simulated.
    pub duration_ticks: u64,
    /// Whether the session ended before the tick budget.
    pub ended: bool,
    /// Whether it was won.
    pub won: bool,
    /// Highest wave reached.
    pub wave: u32,
    /// Fortress health left.
    pub fortress_hp: u32,

    // === Combat ===
    /// Enemies killed.
    pub kills: u32,
    /// Elites killed.
    pub elite_kills: u32,
    /// Bosses killed.
    pub boss_kills: u32,
    /// Enemies that reached the fortress.
    pub leaks: u32,
    /// Damage dealt to enemies.
    pub damage_dealt: u64,
    /// Damage taken by the fortress.
    pub damage_taken: u64,
    /// Elemental combos triggered.
    pub combos: u32,

    // === Economy ===
    /// Gold earned from kills.
    pub gold_earned: u32,
    /// Gold spent.
    pub gold_spent: u32,

    // === Input ===
    /// Events applied.
    pub events_applied: u32,
    /// Events dropped as invalid.
    pub events_dropped: u32,

    /// Segments closed.
    pub segments: u32,
    /// Final snapshot hash, hex.
    pub final_state_hash: String,
}

impl SessionMetrics {
    /// Collect from a finished (or stopped) session.
    #[must_use]
    pub fn collect(seed: u32, strategy: &str, sim: &Simulation, segments: u32) -> Self {
        let state = sim.snapshot();
        let a = &state.analytics;
        Self {
            seed,
            strategy: strategy.to_string(),
            duration_ticks: state.tick,
            ended: state.ended,
            won: state.won,
            wave: state.wave,
            fortress_hp: state.store.fortress.health.current,
            kills: a.kills,
            elite_kills: a.elite_kills,
            boss_kills: a.boss_kills,
            leaks: a.leaks,
            damage_dealt: a.damage_dealt,
            damage_taken: a.damage_taken,
            combos: a.combos,
            gold_earned: state.economy.earned,
            gold_spent: state.economy.spent,
            events_applied: a.events_applied,
            events_dropped: a.events_dropped,
            segments,
            final_state_hash: hash_hex(sim.state_hash()),
        }
    }
}

/// Aggregate over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Sessions run.
    pub total_games: u32,
    /// Sessions won.
    pub wins: u32,
    /// Sessions lost.
    pub losses: u32,
    /// Sessions stopped at the tick budget.
    pub unfinished: u32,
    /// Average wave reached.
    pub avg_wave: f64,
    /// Lowest wave reached.
    pub min_wave: u32,
    /// Highest wave reached.
    pub max_wave: u32,
    /// Average kills.
    pub avg_kills: f64,
    /// Average leaks.
    pub avg_leaks: f64,
    /// Average dropped events. Non-zero means the strategy issues bad input.
    pub avg_events_dropped: f64,
}

impl BatchSummary {
    /// Summarize sessions.
    #[must_use]
    pub fn from_sessions(sessions: &[SessionMetrics]) -> Self {
        if sessions.is_empty() {
            return Self::default();
        }
        let n = sessions.len() as f64;
        let mean = |f: fn(&SessionMetrics) -> f64| sessions.iter().map(f).sum::<f64>() / n;
        Self {
            total_games: sessions.len() as u32,
            wins: sessions.iter().filter(|s| s.won).count() as u32,
            losses: sessions.iter().filter(|s| s.ended && !s.won).count() as u32,
            unfinished: sessions.iter().filter(|s| !s.ended).count() as u32,
            avg_wave: mean(|s| f64::from(s.wave)),
            min_wave: sessions.iter().map(|s| s.wave).min().unwrap_or(0),
            max_wave: sessions.iter().map(|s| s.wave).max().unwrap_or(0),
            avg_kills: mean(|s| f64::from(s.kills)),
            avg_leaks: mean(|s| f64::from(s.leaks)),
            avg_events_dropped: mean(|s| f64::from(s.events_dropped)),
        }
    }

    /// Win rate (0.0 to 1.0).
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        if self.total_games == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(self.total_games)
    }
}
