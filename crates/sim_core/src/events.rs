//! Player events.
//!
//! Events are queued against a target tick and applied at the start of that
//! tick, in the order they were submitted. Applying an event never fails the
//! tick: a rejected event is logged, counted and dropped.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::combat::militia::deploy;
use crate::combat::scaled_cooldown;
use crate::combat::turret::{overcharge_ticks, refund_value, upgrade_cost};
use crate::components::{
    EntityId, FortressSkill, Health, Hero, HeroState, OverchargeState, TargetingMode, Turret,
    TurretKind, Wall, MAX_TURRET_LEVEL,
};
use crate::config::{
    Relic, FIELD_HALF_HEIGHT, FIELD_MAX_X, FIELD_MIN_X, MAX_MILITIA, MAX_WALLS, MILITIA_COST,
    SKILL_COOLDOWN_TICKS, TURRET_SLOTS, WALL_COST, WALL_HP, WALL_MAX_X, WALL_MIN_X,
};
use crate::error::{Result, SimError};
use crate::math::{fixed_serde, mult_pct, scale_u32, Fixed, Vec2Fixed};
use crate::state::SimulationState;

/// A player command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEvent {
    /// Send a hero to a point.
    MoveHero {
        /// Hero slot.
        slot: u8,
        /// Destination x.
        #[serde(with = "fixed_serde")]
        x: Fixed,
        /// Destination y.
        #[serde(with = "fixed_serde")]
        y: Fixed,
    },
    /// Force a hero onto a target.
    AttackTarget {
        /// Hero slot.
        slot: u8,
        /// Enemy id.
        enemy: EntityId,
    },
    /// Return a hero to automatic behaviour.
    ReleaseHero {
        /// Hero slot.
        slot: u8,
    },
    /// Build a turret.
    PlaceTurret {
        /// Slot index.
        slot: u8,
        /// Turret type.
        kind: TurretKind,
    },
    /// Sell a turret.
    RemoveTurret {
        /// Turret id.
        turret: EntityId,
    },
    /// Upgrade a turret one level.
    UpgradeTurret {
        /// Turret id.
        turret: EntityId,
    },
    /// Change a turret's targeting rule.
    SetTargeting {
        /// Turret id.
        turret: EntityId,
        /// New rule.
        mode: TargetingMode,
    },
    /// Activate overcharge.
    Overcharge {
        /// Turret id.
        turret: EntityId,
    },
    /// Build a wall.
    PlaceWall {
        /// Lane coordinate.
        #[serde(with = "fixed_serde")]
        x: Fixed,
    },
    /// Demolish a wall.
    RemoveWall {
        /// Wall id.
        wall: EntityId,
    },
    /// Deploy militia.
    DeployMilitia {
        /// Units to deploy.
        count: u8,
    },
    /// Activate a hero's skill.
    HeroSkill {
        /// Hero slot.
        slot: u8,
    },
    /// Activate a fortress skill.
    FortressSkill {
        /// Skill.
        skill: FortressSkill,
    },
    /// Spend a relic pick.
    ChooseRelic {
        /// Relic.
        relic: Relic,
    },
}

impl GameEvent {
    /// Snake-case event type name used on the wire and in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MoveHero { .. } => "move_hero",
            Self::AttackTarget { .. } => "attack_target",
            Self::ReleaseHero { .. } => "release_hero",
            Self::PlaceTurret { .. } => "place_turret",
            Self::RemoveTurret { .. } => "remove_turret",
            Self::UpgradeTurret { .. } => "upgrade_turret",
            Self::SetTargeting { .. } => "set_targeting",
            Self::Overcharge { .. } => "overcharge",
            Self::PlaceWall { .. } => "place_wall",
            Self::RemoveWall { .. } => "remove_wall",
            Self::DeployMilitia { .. } => "deploy_militia",
            Self::HeroSkill { .. } => "hero_skill",
            Self::FortressSkill { .. } => "fortress_skill",
            Self::ChooseRelic { .. } => "choose_relic",
        }
    }
}

/// An event bound to the tick it applies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerEvent {
    /// Target tick.
    pub tick: u64,
    /// Command.
    pub event: GameEvent,
}

/// Pending events, ordered by tick and then by submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQueue {
    pending: VecDeque<PlayerEvent>,
}

impl EventQueue {
    /// Queue an event behind every event for the same or an earlier tick.
    pub fn push(&mut self, event: PlayerEvent) {
        let at = self.pending.partition_point(|e| e.tick <= event.tick);
        self.pending.insert(at, event);
    }

    /// Remove and return the events due on `tick`, in submission order.
    pub fn drain_due(&mut self, tick: u64) -> Vec<GameEvent> {
        let mut due = Vec::new();
        while let Some(front) = self.pending.front() {
            if front.tick > tick {
                break;
            }
            if let Some(event) = self.pending.pop_front() {
                due.push(event.event);
            }
        }
        due
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Apply every event due this tick, dropping the ones that fail.
pub fn apply_due_events(state: &mut SimulationState, events: Vec<GameEvent>) {
    for event in events {
        match apply_event(state, event) {
            Ok(()) => state.analytics.events_applied += 1,
            Err(reason) => {
                state.analytics.events_dropped += 1;
                tracing::warn!(tick = state.tick, event = event.name(), %reason, "Dropped event");
            }
        }
    }
}

fn turret_index(state: &SimulationState, id: EntityId) -> Result<usize> {
    state
        .store
        .turrets
        .iter()
        .position(|t| t.id == id)
        .ok_or(SimError::UnknownTurret(id))
}

fn active_hero(state: &mut SimulationState, slot: u8) -> Result<&mut Hero> {
    let hero = state
        .store
        .hero_mut(slot)
        .ok_or(SimError::UnknownHero(slot))?;
    if hero.is_disabled() {
        return Err(SimError::HeroDisabled(slot));
    }
    Ok(hero)
}

fn in_field(point: Vec2Fixed) -> bool {
    point.x >= FIELD_MIN_X
        && point.x <= FIELD_MAX_X
        && point.y >= -FIELD_HALF_HEIGHT
        && point.y <= FIELD_HALF_HEIGHT
}

/// Apply one event to the state.
pub fn apply_event(state: &mut SimulationState, event: GameEvent) -> Result<()> {
    match event {
        GameEvent::MoveHero { slot, x, y } => {
            let destination = Vec2Fixed::new(x, y);
            if !in_field(destination) {
                return Err(SimError::InvalidPosition);
            }
            let hero = active_hero(state, slot)?;
            hero.state = HeroState::Commanded;
            hero.command_target = Some(destination);
            hero.target = None;
            hero.forced_target = false;
        }
        GameEvent::AttackTarget { slot, enemy } => {
            if state.store.live_enemy(enemy).is_none() {
                return Err(SimError::UnknownEnemy(enemy));
            }
            let hero = active_hero(state, slot)?;
            hero.state = HeroState::Combat;
            hero.command_target = None;
            hero.target = Some(enemy);
            hero.forced_target = true;
        }
        GameEvent::ReleaseHero { slot } => {
            let hero = state
                .store
                .hero_mut(slot)
                .ok_or(SimError::UnknownHero(slot))?;
            hero.state = HeroState::Idle;
            hero.command_target = None;
            hero.target = None;
            hero.forced_target = false;
        }
        GameEvent::PlaceTurret { slot, kind } => {
            let position = *TURRET_SLOTS
                .get(usize::from(slot))
                .ok_or(SimError::InvalidSlot(slot))?;
            if state.store.turrets.iter().any(|t| t.slot == slot) {
                return Err(SimError::SlotOccupied(slot));
            }
            state.economy.spend(kind.stats().cost)?;
            let id = state.store.allocate_id();
            state.store.turrets.push(Turret {
                id,
                kind,
                slot,
                level: 1,
                mode: TargetingMode::default(),
                overcharge: OverchargeState::Inactive,
                cooldown: 0,
                position,
            });
        }
        GameEvent::RemoveTurret { turret } => {
            let index = turret_index(state, turret)?;
            let removed = state.store.turrets.remove(index);
            state.economy.refund(refund_value(&removed));
        }
        GameEvent::UpgradeTurret { turret } => {
            let index = turret_index(state, turret)?;
            let cost = upgrade_cost(&state.store.turrets[index]).ok_or(SimError::MaxLevel(turret))?;
            state.economy.spend(cost)?;
            let upgraded = &mut state.store.turrets[index];
            upgraded.level = (upgraded.level + 1).min(MAX_TURRET_LEVEL);
        }
        GameEvent::SetTargeting { turret, mode } => {
            let index = turret_index(state, turret)?;
            state.store.turrets[index].mode = mode;
        }
        GameEvent::Overcharge { turret } => {
            let index = turret_index(state, turret)?;
            let ticks = overcharge_ticks(&state.bonuses);
            let target = &mut state.store.turrets[index];
            if target.overcharge != OverchargeState::Inactive {
                return Err(SimError::OverchargeUnavailable(turret));
            }
            target.overcharge = OverchargeState::Active { remaining: ticks };
        }
        GameEvent::PlaceWall { x } => {
            if x < WALL_MIN_X || x > WALL_MAX_X {
                return Err(SimError::InvalidPosition);
            }
            let standing = state.store.walls.iter().filter(|w| !w.health.is_dead()).count();
            if standing >= MAX_WALLS {
                return Err(SimError::LimitReached("walls"));
            }
            state.economy.spend(WALL_COST)?;
            let id = state.store.allocate_id();
            let hp = scale_u32(WALL_HP, state.bonuses.wall_hp);
            state.store.walls.push(Wall {
                id,
                x,
                health: Health::new(hp),
            });
        }
        GameEvent::RemoveWall { wall } => {
            let index = state
                .store
                .walls
                .iter()
                .position(|w| w.id == wall && !w.health.is_dead())
                .ok_or(SimError::UnknownWall(wall))?;
            state.store.walls.remove(index);
        }
        GameEvent::DeployMilitia { count } => {
            let alive = state
                .store
                .militia
                .iter()
                .filter(|m| !m.health.is_dead())
                .count();
            if count == 0 || alive + usize::from(count) > MAX_MILITIA {
                return Err(SimError::LimitReached("militia"));
            }
            state.economy.spend(MILITIA_COST * u32::from(count))?;
            for _ in 0..count {
                deploy(&mut state.store);
            }
        }
        GameEvent::HeroSkill { slot } => {
            let hero = active_hero(state, slot)?;
            if hero.skill_cooldown > 0 || hero.skill_pending {
                return Err(SimError::SkillOnCooldown {
                    remaining: hero.skill_cooldown,
                });
            }
            hero.skill_pending = true;
        }
        GameEvent::FortressSkill { skill } => {
            let cooldown = scaled_cooldown(SKILL_COOLDOWN_TICKS, state.bonuses.cooldown);
            let fortress = &mut state.store.fortress;
            let remaining = fortress.skill_cooldowns[skill.index()];
            if remaining > 0 {
                return Err(SimError::SkillOnCooldown { remaining });
            }
            fortress.skill_cooldowns[skill.index()] = cooldown;
            fortress.pending_skills.push(skill);
        }
        GameEvent::ChooseRelic { relic } => {
            let loadout = &mut state.loadout;
            if loadout.pending_relic_picks == 0 {
                return Err(SimError::RelicUnavailable("no pick pending".into()));
            }
            if loadout.has_relic(relic) {
                return Err(SimError::RelicUnavailable(format!("{relic:?} already owned")));
            }
            loadout.pending_relic_picks -= 1;
            loadout.relics.push(relic);
            if relic == Relic::GlassCannon {
                let health = &mut state.store.fortress.health;
                health.max = scale_u32(health.max, mult_pct(80)).max(1);
                health.current = health.current.min(health.max);
            }
            tracing::info!(tick = state.tick, ?relic, "Relic chosen");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::math::fx;

    fn state() -> SimulationState {
        SimulationState::new(41, &SimConfig::default())
    }

    #[test]
    fn test_queue_orders_by_tick_then_submission() {
        let mut queue = EventQueue::default();
        let skill = |slot| GameEvent::HeroSkill { slot };
        queue.push(PlayerEvent { tick: 5, event: skill(0) });
        queue.push(PlayerEvent { tick: 3, event: skill(1) });
        queue.push(PlayerEvent { tick: 5, event: skill(2) });
        queue.push(PlayerEvent { tick: 3, event: skill(3) });

        assert_eq!(queue.drain_due(2), Vec::new());
        assert_eq!(queue.drain_due(3), vec![skill(1), skill(3)]);
        assert_eq!(queue.drain_due(5), vec![skill(0), skill(2)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_place_and_sell_turret() {
        let mut state = state();
        let gold = state.economy.gold;
        apply_event(
            &mut state,
            GameEvent::PlaceTurret {
                slot: 2,
                kind: TurretKind::Railgun,
            },
        )
        .unwrap();
        assert_eq!(state.economy.gold, gold - 100);
        let id = state.store.turrets.last().unwrap().id;

        let occupied = apply_event(
            &mut state,
            GameEvent::PlaceTurret {
                slot: 2,
                kind: TurretKind::Cryo,
            },
        );
        assert!(matches!(occupied, Err(SimError::SlotOccupied(2))));

        apply_event(&mut state, GameEvent::RemoveTurret { turret: id }).unwrap();
        assert_eq!(state.economy.gold, gold - 50);
    }

    #[test]
    fn test_rejected_events_are_counted_not_fatal() {
        let mut state = state();
        apply_due_events(
            &mut state,
            vec![
                GameEvent::UpgradeTurret { turret: 999 },
                GameEvent::PlaceTurret {
                    slot: 9,
                    kind: TurretKind::Arc,
                },
                GameEvent::ReleaseHero { slot: 0 },
            ],
        );
        assert_eq!(state.analytics.events_dropped, 2);
        assert_eq!(state.analytics.events_applied, 1);
    }

    #[test]
    fn test_insufficient_gold() {
        let mut state = state();
        state.economy.gold = 10;
        let result = apply_event(&mut state, GameEvent::PlaceWall { x: fx(10) });
        assert!(matches!(
            result,
            Err(SimError::InsufficientGold {
                needed: 50,
                available: 10
            })
        ));
        assert!(state.store.walls.is_empty());
    }

    #[test]
    fn test_wall_position_checked() {
        let mut state = state();
        assert!(matches!(
            apply_event(&mut state, GameEvent::PlaceWall { x: fx(2) }),
            Err(SimError::InvalidPosition)
        ));
    }

    #[test]
    fn test_fortress_skill_cooldown() {
        let mut state = state();
        let barrage = GameEvent::FortressSkill {
            skill: FortressSkill::Barrage,
        };
        apply_event(&mut state, barrage).unwrap();
        assert!(matches!(
            apply_event(&mut state, barrage),
            Err(SimError::SkillOnCooldown { remaining: 300 })
        ));
        assert_eq!(state.store.fortress.pending_skills, vec![FortressSkill::Barrage]);
    }

    #[test]
    fn test_overcharge_only_when_inactive() {
        let mut state = state();
        let id = state.store.turrets[0].id;
        apply_event(&mut state, GameEvent::Overcharge { turret: id }).unwrap();
        assert!(matches!(
            apply_event(&mut state, GameEvent::Overcharge { turret: id }),
            Err(SimError::OverchargeUnavailable(_))
        ));
    }

    #[test]
    fn test_relic_requires_pick() {
        let mut state = state();
        let pick = GameEvent::ChooseRelic {
            relic: Relic::GlassCannon,
        };
        assert!(apply_event(&mut state, pick).is_err());

        state.loadout.pending_relic_picks = 1;
        let max = state.store.fortress.health.max;
        apply_event(&mut state, pick).unwrap();
        assert!(state.loadout.has_relic(Relic::GlassCannon));
        assert_eq!(state.store.fortress.health.max, scale_u32(max, mult_pct(80)));
        assert_eq!(state.loadout.pending_relic_picks, 0);
    }

    #[test]
    fn test_move_hero_commands_and_validates() {
        let mut state = state();
        apply_event(
            &mut state,
            GameEvent::MoveHero {
                slot: 0,
                x: fx(10),
                y: fx(3),
            },
        )
        .unwrap();
        assert_eq!(state.store.heroes[0].state, HeroState::Commanded);
        assert!(apply_event(
            &mut state,
            GameEvent::MoveHero {
                slot: 0,
                x: fx(100),
                y: fx(0),
            }
        )
        .is_err());
        assert!(matches!(
            apply_event(&mut state, GameEvent::ReleaseHero { slot: 7 }),
            Err(SimError::UnknownHero(7))
        ));
    }

    #[test]
    fn test_event_wire_names() {
        let event = GameEvent::SetTargeting {
            turret: 3,
            mode: TargetingMode::Weakest,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["set_targeting"]["mode"], "weakest");
        assert_eq!(event.name(), "set_targeting");
    }
}
