//! The tick scheduler.
//!
//! [`Simulation`] owns the session state and the pending event queue and
//! advances one fixed tick per [`Simulation::step`] call. Phases always run
//! in the same order and never concurrently.
//!
//! # Phase Order
//!
//! 1. **Events** - apply player commands due this tick
//! 2. **AI** - heroes, then turrets, then militia
//! 3. **Physics** - enemy movement, blocking and leaks
//! 4. **Projectiles** - ray-march hits, then status effect decay
//! 5. **Damage** - fortress, enemy abilities, regen, combos
//! 6. **Cleanup** - remove the dead, run wave flow, check game over

use serde::{Deserialize, Serialize};

use crate::checkpoint::snapshot_hash;
use crate::combat::abilities::{regenerate_enemies, resolve_combos, run_enemy_abilities};
use crate::combat::fortress::run_fortress;
use crate::combat::hero::run_heroes;
use crate::combat::militia::run_militia;
use crate::combat::projectile::{decay_status_effects, run_projectiles};
use crate::combat::synergy::Bonuses;
use crate::combat::turret::run_turrets;
use crate::components::{Enemy, EnemyTier};
use crate::config::{
    SimConfig, MAX_LIVE_ENEMIES, SPAWN_BATCHES_PER_WAVE, SPAWN_BATCH_INTERVAL,
    WAVE_INTERVAL_TICKS,
};
use crate::error::{Result, SimError};
use crate::events::{apply_due_events, EventQueue, GameEvent, PlayerEvent};
use crate::math::scale_u32;
use crate::state::SimulationState;
use crate::systems::physics_system;
use crate::waves::generate_wave;

/// A running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simulation {
    state: SimulationState,
    queue: EventQueue,
}

impl Simulation {
    /// Start a session at tick 0.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if the loadout is rejected.
    pub fn create(seed: u32, config: &SimConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(seed, final_wave = config.final_wave, "Creating simulation");
        Ok(Self {
            state: SimulationState::new(seed, config),
            queue: EventQueue::default(),
        })
    }

    /// Queue an event for `target_tick`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SessionEnded`] once the session is over and
    /// [`SimError::StaleEvent`] for a tick that has already run.
    pub fn submit_event(&mut self, event: GameEvent, target_tick: u64) -> Result<()> {
        if self.state.ended {
            return Err(SimError::SessionEnded);
        }
        if target_tick < self.state.tick {
            return Err(SimError::StaleEvent {
                target_tick,
                current_tick: self.state.tick,
            });
        }
        self.queue.push(PlayerEvent {
            tick: target_tick,
            event,
        });
        Ok(())
    }

    /// Read-only view of the state.
    #[must_use]
    pub const fn snapshot(&self) -> &SimulationState {
        &self.state
    }

    /// Next tick to run.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.state.tick
    }

    /// Whether the session is over.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.state.ended
    }

    /// Events queued for future ticks.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Canonical snapshot hash of the current state.
    #[must_use]
    pub fn state_hash(&self) -> u32 {
        snapshot_hash(&self.state)
    }

    /// Advance one tick. Does nothing once the session has ended.
    pub fn step(&mut self) {
        if self.state.ended {
            return;
        }
        let state = &mut self.state;
        state.bonuses = Bonuses::compute(state);

        // 1. Events
        let due = self.queue.drain_due(state.tick);
        apply_due_events(state, due);

        // 2. AI
        run_heroes(state);
        run_turrets(state);
        run_militia(state);

        // 3. Physics
        physics_system(state);

        // 4. Projectiles
        run_projectiles(state);
        decay_status_effects(state);

        // 5. Damage
        run_fortress(state);
        run_enemy_abilities(state);
        regenerate_enemies(state);
        resolve_combos(state);

        // 6. Cleanup
        remove_finished_enemies(state);
        state.store.projectiles.retain(|p| p.alive);
        state.store.walls.retain(|w| !w.health.is_dead());
        state.store.militia.retain(|m| !m.health.is_dead());
        decay_buffs(state);
        advance_waves(state);
        check_game_over(state);

        state.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.state.tick, state_hash = hash, "Simulation state hash");
        }
    }

    /// Step until `tick` has been reached or the session ends.
    pub fn run_until(&mut self, tick: u64) {
        while self.state.tick < tick && !self.state.ended {
            self.step();
        }
    }

    /// Serialize the whole session, queue included.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Serialization`] if encoding fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SimError::Serialization(format!("Failed to serialize simulation: {e}")))
    }

    /// Restore a session produced by [`Simulation::serialize`].
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Serialization`] if the bytes are not a session.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| SimError::Serialization(format!("Failed to deserialize simulation: {e}")))
    }
}

/// Drop dead and leaked enemies in id order, paying out kills.
fn remove_finished_enemies(state: &mut SimulationState) {
    let gold_factor = state.bonuses.gold;
    let SimulationState {
        store,
        economy,
        loadout,
        analytics,
        tick,
        ..
    } = state;

    for enemy in store.enemies.iter().filter(|e| !e.leaked && e.health.is_dead()) {
        economy.earn(scale_u32(enemy.reward, gold_factor));
        analytics.kills += 1;
        match enemy.tier {
            EnemyTier::Elite => analytics.elite_kills += 1,
            EnemyTier::Boss => {
                analytics.boss_kills += 1;
                loadout.pending_relic_picks += 1;
                tracing::info!(tick = *tick, boss = ?enemy.kind, "Boss defeated");
            }
            EnemyTier::Common => {}
        }
    }
    store.enemies.retain(Enemy::is_alive);
}

fn decay_buffs(state: &mut SimulationState) {
    for buff in &mut state.buffs {
        buff.remaining = buff.remaining.saturating_sub(1);
    }
    state.buffs.retain(|b| b.remaining > 0);
}

/// Start the next wave when due, then spawn the current batch.
fn advance_waves(state: &mut SimulationState) {
    let tick = state.tick;
    let waves = &state.waves;
    let elapsed = tick - waves.started_at;
    let drained = waves.queue.is_empty() || waves.capped;
    if state.wave < waves.final_wave && elapsed >= WAVE_INTERVAL_TICKS && drained {
        start_wave(state);
    }

    let waves = &mut state.waves;
    if waves.queue.is_empty() || tick < waves.next_batch_at {
        return;
    }
    waves.next_batch_at = tick + SPAWN_BATCH_INTERVAL;
    waves.capped = false;
    for _ in 0..state.waves.batch_size {
        if state.store.live_enemy_count() >= MAX_LIVE_ENEMIES {
            state.waves.capped = true;
            break;
        }
        let Some(entry) = state.waves.queue.pop_front() else {
            break;
        };
        let id = state.store.allocate_id();
        state
            .store
            .push_enemy(Enemy::spawn(id, &entry, Enemy::lane_spawn_point(id)));
    }
}

fn start_wave(state: &mut SimulationState) {
    let leftover = state.waves.queue.len();
    if leftover > 0 {
        state.analytics.spawns_capped += leftover as u32;
        tracing::debug!(wave = state.wave, leftover, "Dropping capped spawns");
    }

    state.wave += 1;
    let plan = generate_wave(state.wave, &mut state.rng);
    let count = plan.entries.len() as u32;
    let waves = &mut state.waves;
    waves.started_at = state.tick;
    waves.modifier = plan.modifier;
    waves.queue = plan.entries.into();
    waves.batch_size = count.div_ceil(SPAWN_BATCHES_PER_WAVE).max(1);
    waves.next_batch_at = state.tick;
    waves.capped = false;

    tracing::info!(
        tick = state.tick,
        wave = state.wave,
        modifier = ?plan.modifier,
        pillar = ?plan.pillar,
        count,
        "Wave started"
    );
}

fn check_game_over(state: &mut SimulationState) {
    if state.store.fortress.health.is_dead() {
        state.ended = true;
        state.won = false;
        tracing::info!(tick = state.tick, wave = state.wave, "Fortress destroyed");
        return;
    }
    let cleared = state.waves.queue.is_empty() && state.store.live_enemy_count() == 0;
    if state.wave >= state.waves.final_wave && state.wave > 0 && cleared {
        state.ended = true;
        state.won = true;
        tracing::info!(tick = state.tick, wave = state.wave, "Final wave cleared");
    }
}
