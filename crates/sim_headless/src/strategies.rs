//! Scripted autopilot strategies for headless sessions.
//!
//! A strategy is a build order (turrets, upgrades, walls, militia, gated on
//! gold, wave or tick) plus tactical rules for skills, overcharge and relic
//! picks. The autopilot reads only the public simulation state, so the
//! events it produces are exactly what a player client would submit.

use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sim_core::combat::turret::upgrade_cost;
use sim_core::components::{
    EnemyTier, FortressSkill, OverchargeState, TargetingMode, TurretKind,
};
use sim_core::config::{Relic, MILITIA_COST, WALL_COST};
use sim_core::events::GameEvent;
use sim_core::math::fx;
use sim_core::state::SimulationState;
use thiserror::Error;

/// Error type for strategy operations.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// File not found.
    #[error("Strategy file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read strategy file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse strategy: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// No built-in strategy by that name.
    #[error("Unknown strategy: {0}")]
    UnknownPreset(String),
}

/// A complete autopilot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Build order to follow.
    pub build_order: Vec<BuildOrderItem>,
    /// Tactical rules checked every tick.
    #[serde(default)]
    pub tactics: Tactics,
}

impl Default for Strategy {
    fn default() -> Self {
        Self {
            name: "Balanced".to_string(),
            description: "Mixed turrets, one wall, steady upgrades".to_string(),
            build_order: vec![
                BuildOrderItem::PlaceTurret {
                    slot: 2,
                    kind: TurretKind::Artillery,
                },
                BuildOrderItem::WaitForWave(2),
                BuildOrderItem::PlaceWall(16),
                BuildOrderItem::WaitForGold(150),
                BuildOrderItem::PlaceTurret {
                    slot: 3,
                    kind: TurretKind::Arc,
                },
                BuildOrderItem::UpgradeSlot(0),
                BuildOrderItem::UpgradeSlot(2),
                BuildOrderItem::WaitForWave(8),
                BuildOrderItem::PlaceTurret {
                    slot: 4,
                    kind: TurretKind::Railgun,
                },
                BuildOrderItem::UpgradeSlot(1),
                BuildOrderItem::UpgradeSlot(3),
                BuildOrderItem::UpgradeSlot(0),
                BuildOrderItem::PlaceTurret {
                    slot: 5,
                    kind: TurretKind::Cryo,
                },
            ],
            tactics: Tactics::default(),
        }
    }
}

impl Strategy {
    /// Load a strategy from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StrategyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StrategyError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, StrategyError> {
        let strategy: Strategy = ron::from_str(ron)?;
        Ok(strategy)
    }

    /// Built-in strategy by name, or a RON file path.
    pub fn resolve(name_or_path: &str) -> Result<Self, StrategyError> {
        match name_or_path {
            "balanced" => Ok(Self::default()),
            "turtle" => Ok(Self::turtle()),
            "greedy" => Ok(Self::greedy()),
            "idle" => Ok(Self::idle()),
            other if other.ends_with(".ron") => Self::load(other),
            other => Err(StrategyError::UnknownPreset(other.to_string())),
        }
    }

    /// Walls and slows, skills used early.
    #[must_use]
    pub fn turtle() -> Self {
        Self {
            name: "Turtle".to_string(),
            description: "Walls, cryo and militia hold the lane".to_string(),
            build_order: vec![
                BuildOrderItem::PlaceWall(20),
                BuildOrderItem::PlaceWall(12),
                BuildOrderItem::SetTargeting {
                    slot: 1,
                    mode: TargetingMode::Fastest,
                },
                BuildOrderItem::WaitForGold(90),
                BuildOrderItem::PlaceTurret {
                    slot: 2,
                    kind: TurretKind::Cryo,
                },
                BuildOrderItem::DeployMilitia(2),
                BuildOrderItem::PlaceTurret {
                    slot: 3,
                    kind: TurretKind::Artillery,
                },
                BuildOrderItem::PlaceWall(8),
                BuildOrderItem::UpgradeSlot(3),
                BuildOrderItem::UpgradeSlot(0),
                BuildOrderItem::DeployMilitia(3),
            ],
            tactics: Tactics {
                barrage_at_enemies: 4,
                cryo_pulse_at_enemies: 3,
                bulwark_below_pct: 70,
                danger_x: 12,
                relic_preference: vec![Relic::IronWalls, Relic::ColdCore, Relic::Bounty],
                ..Tactics::default()
            },
        }
    }

    /// Few turrets, upgraded hard.
    #[must_use]
    pub fn greedy() -> Self {
        Self {
            name: "Greedy".to_string(),
            description: "Saves gold for max-level turrets".to_string(),
            build_order: vec![
                BuildOrderItem::SetTargeting {
                    slot: 0,
                    mode: TargetingMode::Strongest,
                },
                BuildOrderItem::UpgradeSlot(0),
                BuildOrderItem::UpgradeSlot(0),
                BuildOrderItem::UpgradeSlot(1),
                BuildOrderItem::UpgradeSlot(0),
                BuildOrderItem::UpgradeSlot(1),
                BuildOrderItem::UpgradeSlot(0),
                BuildOrderItem::PlaceTurret {
                    slot: 2,
                    kind: TurretKind::Railgun,
                },
                BuildOrderItem::UpgradeSlot(2),
                BuildOrderItem::UpgradeSlot(2),
            ],
            tactics: Tactics {
                relic_preference: vec![Relic::Bounty, Relic::SharpenedRounds, Relic::Overclock],
                ..Tactics::default()
            },
        }
    }

    /// Submits nothing. Baseline for balance runs.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            name: "Idle".to_string(),
            description: "Starting loadout only, no input".to_string(),
            build_order: Vec::new(),
            tactics: Tactics::passive(),
        }
    }
}

/// A single item in a build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildOrderItem {
    /// Buy a turret.
    PlaceTurret {
        /// Slot.
        slot: u8,
        /// Kind.
        kind: TurretKind,
    },
    /// Upgrade the turret in a slot. Skipped if the slot is empty or maxed.
    UpgradeSlot(u8),
    /// Build a wall at a whole-unit lane position.
    PlaceWall(i32),
    /// Deploy militia.
    DeployMilitia(u8),
    /// Change the targeting mode of the turret in a slot.
    SetTargeting {
        /// Slot.
        slot: u8,
        /// Mode.
        mode: TargetingMode,
    },
    /// Wait until this much gold is banked.
    WaitForGold(u32),
    /// Wait for a wave.
    WaitForWave(u32),
    /// Wait for a specific tick.
    WaitForTick(u64),
}

/// Tactical rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tactics {
    /// Enemies with `x` at or below this count as close to the fortress.
    pub danger_x: i32,
    /// Fire Barrage when this many enemies are close (0 = never).
    pub barrage_at_enemies: u32,
    /// Fire Cryo Pulse when this many enemies are close (0 = never).
    pub cryo_pulse_at_enemies: u32,
    /// Raise Bulwark below this fortress health percent (0 = never).
    pub bulwark_below_pct: u32,
    /// Use hero skills whenever enemies are on the field.
    pub hero_skills: bool,
    /// Overcharge every turret while a boss is alive.
    pub overcharge_on_boss: bool,
    /// Relics to pick, most wanted first.
    pub relic_preference: Vec<Relic>,
}

impl Default for Tactics {
    fn default() -> Self {
        Self {
            danger_x: 10,
            barrage_at_enemies: 6,
            cryo_pulse_at_enemies: 0,
            bulwark_below_pct: 50,
            hero_skills: true,
            overcharge_on_boss: true,
            relic_preference: vec![Relic::SharpenedRounds, Relic::Bounty, Relic::Overclock],
        }
    }
}

impl Tactics {
    /// Never acts.
    #[must_use]
    pub fn passive() -> Self {
        Self {
            danger_x: 0,
            barrage_at_enemies: 0,
            cryo_pulse_at_enemies: 0,
            bulwark_below_pct: 0,
            hero_skills: false,
            overcharge_on_boss: false,
            relic_preference: Vec::new(),
        }
    }
}

/// Runtime state for executing a build order.
#[derive(Debug, Clone)]
pub struct StrategyExecutor {
    /// The strategy being executed.
    strategy: Strategy,
    /// Remaining build order items.
    build_queue: VecDeque<BuildOrderItem>,
    /// Items consumed so far.
    current_index: usize,
}

impl StrategyExecutor {
    /// Create a new executor for a strategy.
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        let build_queue = strategy.build_order.iter().copied().collect();
        Self {
            strategy,
            build_queue,
            current_index: 0,
        }
    }

    /// Next buildable item, or `None` while waiting.
    ///
    /// `gold` is what remains after anything already bought this tick.
    pub fn next_item(&mut self, state: &SimulationState, gold: u32) -> Option<BuildOrderItem> {
        loop {
            let item = *self.build_queue.front()?;
            let ready = match item {
                BuildOrderItem::WaitForGold(amount) => gold >= amount,
                BuildOrderItem::WaitForWave(wave) => state.wave >= wave,
                BuildOrderItem::WaitForTick(tick) => state.tick >= tick,
                _ => match item_cost(state, item) {
                    ItemCost::Skip => {
                        self.advance();
                        continue;
                    }
                    ItemCost::Gold(cost) => {
                        if gold < cost {
                            return None;
                        }
                        self.advance();
                        return Some(item);
                    }
                },
            };
            if !ready {
                return None;
            }
            self.advance();
        }
    }

    fn advance(&mut self) {
        self.build_queue.pop_front();
        self.current_index += 1;
    }

    /// Get the strategy name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.strategy.name
    }

    /// Whether the build order is exhausted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.build_queue.is_empty()
    }

    /// Progress through the build order.
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        (self.current_index, self.strategy.build_order.len())
    }
}

enum ItemCost {
    Gold(u32),
    Skip,
}

fn item_cost(state: &SimulationState, item: BuildOrderItem) -> ItemCost {
    let turret_in = |slot: u8| state.store.turrets.iter().find(|t| t.slot == slot);
    match item {
        BuildOrderItem::PlaceTurret { slot, kind } => match turret_in(slot) {
            Some(_) => ItemCost::Skip,
            None => ItemCost::Gold(kind.stats().cost),
        },
        BuildOrderItem::UpgradeSlot(slot) => turret_in(slot)
            .and_then(upgrade_cost)
            .map_or(ItemCost::Skip, ItemCost::Gold),
        BuildOrderItem::SetTargeting { slot, .. } => match turret_in(slot) {
            Some(_) => ItemCost::Gold(0),
            None => ItemCost::Skip,
        },
        BuildOrderItem::PlaceWall(_) => ItemCost::Gold(WALL_COST),
        BuildOrderItem::DeployMilitia(count) => ItemCost::Gold(MILITIA_COST * u32::from(count)),
        BuildOrderItem::WaitForGold(_)
        | BuildOrderItem::WaitForWave(_)
        | BuildOrderItem::WaitForTick(_) => ItemCost::Gold(0),
    }
}

/// Plays a session: turns the current state into this tick's events.
#[derive(Debug, Clone)]
pub struct Autopilot {
    executor: StrategyExecutor,
    tactics: Tactics,
}

impl Autopilot {
    /// Autopilot for `strategy`.
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        let tactics = strategy.tactics.clone();
        Self {
            executor: StrategyExecutor::new(strategy),
            tactics,
        }
    }

    /// Strategy name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.executor.name()
    }

    /// Build-order executor.
    #[must_use]
    pub fn executor(&self) -> &StrategyExecutor {
        &self.executor
    }

    /// Events to submit for the tick about to run.
    pub fn decide(&mut self, state: &SimulationState) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if state.ended {
            return events;
        }
        self.build(state, &mut events);
        self.fortress_skills(state, &mut events);
        self.hero_skills(state, &mut events);
        self.overcharge(state, &mut events);
        self.relics(state, &mut events);
        events
    }

    fn build(&mut self, state: &SimulationState, events: &mut Vec<GameEvent>) {
        let mut gold = state.economy.gold;
        while let Some(item) = self.executor.next_item(state, gold) {
            let ItemCost::Gold(cost) = item_cost(state, item) else {
                continue;
            };
            gold -= cost;
            let turret_id = |slot: u8| {
                state
                    .store
                    .turrets
                    .iter()
                    .find(|t| t.slot == slot)
                    .map(|t| t.id)
            };
            let event = match item {
                BuildOrderItem::PlaceTurret { slot, kind } => {
                    Some(GameEvent::PlaceTurret { slot, kind })
                }
                BuildOrderItem::UpgradeSlot(slot) => {
                    turret_id(slot).map(|turret| GameEvent::UpgradeTurret { turret })
                }
                BuildOrderItem::SetTargeting { slot, mode } => {
                    turret_id(slot).map(|turret| GameEvent::SetTargeting { turret, mode })
                }
                BuildOrderItem::PlaceWall(x) => Some(GameEvent::PlaceWall { x: fx(x) }),
                BuildOrderItem::DeployMilitia(count) => Some(GameEvent::DeployMilitia { count }),
                BuildOrderItem::WaitForGold(_)
                | BuildOrderItem::WaitForWave(_)
                | BuildOrderItem::WaitForTick(_) => None,
            };
            if let Some(event) = event {
                tracing::debug!(tick = state.tick, event = event.name(), "Autopilot build");
                events.push(event);
            }
            // One purchase per tick keeps the slot and id lookups current.
            if !matches!(item, BuildOrderItem::SetTargeting { .. }) {
                break;
            }
        }
    }

    fn fortress_skills(&self, state: &SimulationState, events: &mut Vec<GameEvent>) {
        let fortress = &state.store.fortress;
        let ready = |skill: FortressSkill| fortress.skill_cooldowns[skill.index()] == 0;
        let danger = fx(self.tactics.danger_x);
        let close = state
            .store
            .enemies
            .iter()
            .filter(|e| !e.health.is_dead() && e.position.x <= danger)
            .count() as u32;

        let at = |threshold: u32| threshold > 0 && close >= threshold;
        if at(self.tactics.barrage_at_enemies) && ready(FortressSkill::Barrage) {
            events.push(GameEvent::FortressSkill {
                skill: FortressSkill::Barrage,
            });
        }
        if at(self.tactics.cryo_pulse_at_enemies) && ready(FortressSkill::CryoPulse) {
            events.push(GameEvent::FortressSkill {
                skill: FortressSkill::CryoPulse,
            });
        }
        let hp_pct = fortress.health.current * 100 / fortress.health.max.max(1);
        if hp_pct < self.tactics.bulwark_below_pct && ready(FortressSkill::Bulwark) {
            events.push(GameEvent::FortressSkill {
                skill: FortressSkill::Bulwark,
            });
        }
    }

    fn hero_skills(&self, state: &SimulationState, events: &mut Vec<GameEvent>) {
        if !self.tactics.hero_skills || state.store.enemies.iter().all(|e| e.health.is_dead()) {
            return;
        }
        for hero in &state.store.heroes {
            if hero.skill_cooldown == 0 && !hero.skill_pending && hero.disabled_ticks == 0 {
                events.push(GameEvent::HeroSkill { slot: hero.slot });
            }
        }
    }

    fn overcharge(&self, state: &SimulationState, events: &mut Vec<GameEvent>) {
        let boss_alive = state
            .store
            .enemies
            .iter()
            .any(|e| e.tier == EnemyTier::Boss && !e.health.is_dead());
        if !self.tactics.overcharge_on_boss || !boss_alive {
            return;
        }
        for turret in &state.store.turrets {
            if turret.overcharge == OverchargeState::Inactive {
                events.push(GameEvent::Overcharge { turret: turret.id });
            }
        }
    }

    fn relics(&self, state: &SimulationState, events: &mut Vec<GameEvent>) {
        if state.loadout.pending_relic_picks == 0 {
            return;
        }
        let wanted = self
            .tactics
            .relic_preference
            .iter()
            .chain(Relic::ALL.iter())
            .find(|r| !state.loadout.has_relic(**r));
        if let Some(&relic) = wanted {
            events.push(GameEvent::ChooseRelic { relic });
        }
    }
}
