//! Simulation state and the entity store.
//!
//! Every collection is a `Vec` in a fixed order. Enemies and projectiles
//! are sorted by id (ids only grow, so pushing keeps them sorted), heroes by
//! loadout slot, turrets by placement. Removal happens once per tick in
//! cleanup with an order-preserving `retain`, never by swapping.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::combat::synergy::Bonuses;
use crate::components::{
    commander_multiplier, Enemy, EntityId, Fortress, Health, Hero, HeroState, Militia, Projectile,
    Turret, Wall,
};
use crate::config::{Crystal, Relic, SimConfig, FORTRESS_BASE_HP, HERO_HOMES, TURRET_SLOTS};
use crate::math::{mult_pct, scale_u32};
use crate::rng::DeterministicRng;
use crate::waves::{SpawnEntry, WaveModifier};

/// Every gameplay entity in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStore {
    /// The fortress.
    pub fortress: Fortress,
    /// Heroes in slot order.
    pub heroes: Vec<Hero>,
    /// Turrets in placement order.
    pub turrets: Vec<Turret>,
    /// Enemies sorted by id.
    pub enemies: Vec<Enemy>,
    /// Projectiles sorted by id.
    pub projectiles: Vec<Projectile>,
    /// Walls in placement order.
    pub walls: Vec<Wall>,
    /// Militia in deployment order.
    pub militia: Vec<Militia>,
    /// Next id to hand out.
    pub next_id: EntityId,
}

impl EntityStore {
    /// Allocate a fresh entity id.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Enemy by id.
    #[must_use]
    pub fn enemy(&self, id: EntityId) -> Option<&Enemy> {
        self.enemies
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|index| &self.enemies[index])
    }

    /// Mutable enemy by id.
    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        self.enemies
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|index| &mut self.enemies[index])
    }

    /// Live enemy by id. Weak references resolve through this.
    #[must_use]
    pub fn live_enemy(&self, id: EntityId) -> Option<&Enemy> {
        self.enemy(id).filter(|e| e.is_alive())
    }

    /// Number of enemies still in play.
    #[must_use]
    pub fn live_enemy_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.is_alive()).count()
    }

    /// Append an enemy. Its id must be newer than every stored enemy.
    pub fn push_enemy(&mut self, enemy: Enemy) {
        debug_assert!(self.enemies.last().map_or(true, |last| last.id < enemy.id));
        self.enemies.push(enemy);
    }

    /// Turret by id.
    #[must_use]
    pub fn turret(&self, id: EntityId) -> Option<&Turret> {
        self.turrets.iter().find(|t| t.id == id)
    }

    /// Mutable turret by id.
    pub fn turret_mut(&mut self, id: EntityId) -> Option<&mut Turret> {
        self.turrets.iter_mut().find(|t| t.id == id)
    }

    /// Hero by loadout slot.
    pub fn hero_mut(&mut self, slot: u8) -> Option<&mut Hero> {
        self.heroes.get_mut(usize::from(slot))
    }
}

/// Gold accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Economy {
    /// Spendable gold.
    pub gold: u32,
    /// Total gold earned from kills.
    pub earned: u32,
    /// Total gold spent.
    pub spent: u32,
}

impl Economy {
    /// Spend `amount` if affordable.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SimError::InsufficientGold`] when short.
    pub fn spend(&mut self, amount: u32) -> crate::error::Result<()> {
        if self.gold < amount {
            return Err(crate::error::SimError::InsufficientGold {
                needed: amount,
                available: self.gold,
            });
        }
        self.gold -= amount;
        self.spent = self.spent.saturating_add(amount);
        Ok(())
    }

    /// Add earned gold.
    pub fn earn(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
        self.earned = self.earned.saturating_add(amount);
    }

    /// Return gold without counting it as earned.
    pub fn refund(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }
}

/// Owned relics and loadout crystals.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Loadout {
    /// Relics in acquisition order.
    pub relics: Vec<Relic>,
    /// Relic picks granted by boss kills and not yet used.
    pub pending_relic_picks: u32,
    /// Equipped crystals.
    pub crystals: Vec<Crystal>,
}

impl Loadout {
    /// Whether a relic is owned.
    #[must_use]
    pub fn has_relic(&self, relic: Relic) -> bool {
        self.relics.contains(&relic)
    }

    /// Whether a crystal is equipped.
    #[must_use]
    pub fn has_crystal(&self, crystal: Crystal) -> bool {
        self.crystals.contains(&crystal)
    }
}

/// A timed buff on every friendly attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimedBuff {
    /// Percent added to the buff sum.
    pub percent: u32,
    /// Ticks left.
    pub remaining: u32,
}

/// Wave progression.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WaveState {
    /// Tick the current wave started on.
    pub started_at: u64,
    /// Modifier of the current wave.
    pub modifier: WaveModifier,
    /// Spawns not yet on the field.
    pub queue: VecDeque<SpawnEntry>,
    /// Spawns per batch for the current wave.
    pub batch_size: u32,
    /// Next tick a batch may spawn.
    pub next_batch_at: u64,
    /// The last batch was cut short by the live-enemy cap.
    pub capped: bool,
    /// Clearing this wave ends the session with a win.
    pub final_wave: u32,
}

/// Running totals for post-session analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Analytics {
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
    /// Combos triggered.
    pub combos: u32,
    /// Player events applied.
    pub events_applied: u32,
    /// Player events dropped as invalid.
    pub events_dropped: u32,
    /// Projectiles fired.
    pub projectiles_fired: u32,
    /// Spawns discarded because of the live-enemy cap.
    pub spawns_capped: u32,
}

/// The root aggregate. Mutated only by the tick phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Ticks simulated so far.
    pub tick: u64,
    /// Current wave number (0 before the first wave).
    pub wave: u32,
    /// Session is over.
    pub ended: bool,
    /// Session ended in victory.
    pub won: bool,
    /// The only randomness source.
    pub rng: DeterministicRng,
    /// Wave progression.
    pub waves: WaveState,
    /// Entities.
    pub store: EntityStore,
    /// Gold.
    pub economy: Economy,
    /// Relics and crystals.
    pub loadout: Loadout,
    /// Active timed buffs.
    pub buffs: Vec<TimedBuff>,
    /// Derived modifiers, recomputed at the start of every tick.
    pub bonuses: Bonuses,
    /// Totals.
    pub analytics: Analytics,
}

impl SimulationState {
    /// Build the tick-0 state from a validated configuration.
    #[must_use]
    pub fn new(seed: u32, config: &SimConfig) -> Self {
        let mut max_hp = scale_u32(
            scale_u32(FORTRESS_BASE_HP, config.fortress_class.hp_multiplier()),
            commander_multiplier(config.commander_level),
        );
        if config.relics.contains(&Relic::GlassCannon) {
            max_hp = scale_u32(max_hp, mult_pct(80));
        }

        let fortress = Fortress {
            health: Health::new(max_hp),
            class: config.fortress_class,
            commander_level: config.commander_level,
            auras: config.auras.clone(),
            attack_cooldown: crate::config::FORTRESS_ATTACK_INTERVAL,
            skill_cooldowns: [0; 3],
            pending_skills: Vec::new(),
            shield: 0,
            shield_ticks: 0,
        };

        let heroes = config
            .heroes
            .iter()
            .zip(HERO_HOMES)
            .enumerate()
            .map(|(slot, (loadout, home))| Hero {
                slot: slot as u8,
                class: loadout.class,
                tier: loadout.tier,
                passive: loadout.passive,
                artifact: loadout.artifact,
                state: HeroState::Idle,
                position: home,
                home,
                command_target: None,
                target: None,
                forced_target: false,
                attack_cooldown: 0,
                skill_cooldown: 0,
                skill_pending: false,
                disabled_ticks: 0,
            })
            .collect();

        let mut store = EntityStore {
            fortress,
            heroes,
            turrets: Vec::new(),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            walls: Vec::new(),
            militia: Vec::new(),
            next_id: 1,
        };

        for placed in &config.turrets {
            let id = store.allocate_id();
            store.turrets.push(Turret {
                id,
                kind: placed.kind,
                slot: placed.slot,
                level: 1,
                mode: crate::components::TargetingMode::default(),
                overcharge: crate::components::OverchargeState::Inactive,
                cooldown: 0,
                position: TURRET_SLOTS[usize::from(placed.slot)],
            });
        }

        let loadout = Loadout {
            relics: config.relics.clone(),
            pending_relic_picks: 0,
            crystals: config.crystals.clone(),
        };

        let mut state = Self {
            tick: 0,
            wave: 0,
            ended: false,
            won: false,
            rng: DeterministicRng::new(seed),
            waves: WaveState {
                final_wave: config.final_wave,
                ..WaveState::default()
            },
            store,
            economy: Economy {
                gold: config.starting_gold,
                earned: 0,
                spent: 0,
            },
            loadout,
            buffs: Vec::new(),
            bonuses: Bonuses::default(),
            analytics: Analytics::default(),
        };
        state.bonuses = Bonuses::compute(&state);
        state
    }

    /// Sum of active timed buffs, in percent.
    #[must_use]
    pub fn timed_buff_percent(&self) -> u32 {
        self.buffs.iter().map(|b| b.percent).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::FortressClass;
    use crate::config::TurretLoadout;

    #[test]
    fn test_new_state_from_default_config() {
        let config = SimConfig::default();
        let state = SimulationState::new(42, &config);
        assert_eq!(state.tick, 0);
        assert_eq!(state.store.heroes.len(), 2);
        assert_eq!(state.store.turrets.len(), 2);
        assert_eq!(state.store.turrets[0].id, 1);
        assert_eq!(state.store.next_id, 3);
        assert_eq!(state.economy.gold, 200);
        // 110% is 18022/16384, so 1000 floors to 1099
        assert_eq!(state.store.fortress.health.max, 1099);
    }

    #[test]
    fn test_glass_cannon_reduces_fortress_health() {
        let config = SimConfig {
            fortress_class: FortressClass::Support,
            relics: vec![Relic::GlassCannon],
            turrets: vec![TurretLoadout {
                slot: 5,
                kind: crate::components::TurretKind::Arc,
            }],
            ..SimConfig::default()
        };
        let state = SimulationState::new(1, &config);
        assert_eq!(state.store.fortress.health.max, 799);
    }

    #[test]
    fn test_economy_spend_checks_balance() {
        let mut economy = Economy {
            gold: 40,
            ..Economy::default()
        };
        assert!(economy.spend(50).is_err());
        assert!(economy.spend(40).is_ok());
        assert_eq!(economy.spent, 40);
        economy.earn(10);
        assert_eq!(economy.gold, 10);
        assert_eq!(economy.earned, 10);
    }
}
