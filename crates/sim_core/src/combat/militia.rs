//! Militia AI.
//!
//! Militia are short-lived blockers. They hold the rally line, step out to
//! engage the nearest enemy in aggro range and attack in melee. Blocking
//! itself happens in the physics phase.

use crate::combat::targeting::{contact_distance_squared, nearest};
use crate::combat::{spawn_projectile, DamageChain, Hit, ProjectileSpec};
use crate::components::{Element, EntityId, Health, Militia, ProjectileOwner};
use crate::config::{
    LANE_OFFSETS, MILITIA_ATTACK_INTERVAL, MILITIA_DAMAGE, MILITIA_HP, MILITIA_LIFETIME,
    MILITIA_RALLY_X, MILITIA_RANGE, MILITIA_SPEED,
};
use crate::math::{fx, Fixed, Vec2Fixed, MULT_ONE};
use crate::state::{EntityStore, SimulationState};

/// Militia look for enemies this far from themselves.
pub const MILITIA_AGGRO_RANGE: Fixed = fx(6);
/// Melee swing travel per tick.
const MILITIA_STRIKE_SPEED: Fixed = fx(2);
/// Militia spawn just in front of the fortress.
const MILITIA_SPAWN_X: Fixed = fx(2);

/// Add a militia unit on the lane picked by its id.
pub fn deploy(store: &mut EntityStore) -> EntityId {
    let id = store.allocate_id();
    let lane = fx(LANE_OFFSETS[(id % 5) as usize]);
    store.militia.push(Militia {
        id,
        position: Vec2Fixed::new(MILITIA_SPAWN_X, lane),
        health: Health::new(MILITIA_HP),
        attack_cooldown: 0,
        lifetime: MILITIA_LIFETIME,
        target: None,
    });
    id
}

/// Run every militia unit for one tick, in id order.
pub fn run_militia(state: &mut SimulationState) {
    let chain = DamageChain {
        stone: state.bonuses.stone,
        artifact: MULT_ONE,
        hero_passive: MULT_ONE,
        buff_pct: state.bonuses.shared_buff_pct() + state.timed_buff_percent(),
        global: state.bonuses.global,
    };
    let SimulationState {
        store, analytics, ..
    } = state;

    let mut strikes = Vec::new();
    for unit in store.militia.iter_mut().filter(|m| !m.health.is_dead()) {
        unit.lifetime = unit.lifetime.saturating_sub(1);
        if unit.lifetime == 0 {
            unit.health.current = 0;
            continue;
        }
        unit.attack_cooldown = unit.attack_cooldown.saturating_sub(1);

        let current = unit
            .target
            .and_then(|id| store.enemies.binary_search_by_key(&id, |e| e.id).ok())
            .map(|index| &store.enemies[index])
            .filter(|e| e.is_alive() && e.position.within(unit.position, MILITIA_AGGRO_RANGE));
        let target = match current {
            Some(enemy) => Some(enemy),
            None => nearest(unit.position, MILITIA_AGGRO_RANGE, &store.enemies)
                .and_then(|id| store.enemies.binary_search_by_key(&id, |e| e.id).ok())
                .map(|index| &store.enemies[index]),
        };
        unit.target = target.map(|e| e.id);

        let Some(enemy) = target else {
            let rally = Vec2Fixed::new(MILITIA_RALLY_X, unit.position.y);
            unit.position = unit.position.step_toward(rally, MILITIA_SPEED);
            continue;
        };

        let reach = contact_distance_squared(MILITIA_RANGE, enemy.radius);
        if unit.position.distance_squared(enemy.position) > reach {
            unit.position = unit.position.step_toward(enemy.position, MILITIA_SPEED);
        } else if unit.attack_cooldown == 0 {
            strikes.push(ProjectileSpec {
                owner: ProjectileOwner::Militia(unit.id),
                origin: unit.position,
                aim: enemy.position,
                speed: MILITIA_STRIKE_SPEED,
                hit: Hit {
                    damage: chain.resolve(MILITIA_DAMAGE),
                    element: Element::Physical,
                    status: None,
                },
                pierce: 0,
                splash: Fixed::ZERO,
                chain: 0,
            });
            unit.attack_cooldown = MILITIA_ATTACK_INTERVAL;
        }
    }

    for spec in strikes {
        spawn_projectile(store, analytics, spec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Enemy, EnemyTier};
    use crate::config::SimConfig;
    use crate::enemy_kind::EnemyKind;
    use crate::waves::{spawn_entry, WaveModifier};

    fn bare_state() -> SimulationState {
        let config = SimConfig {
            heroes: Vec::new(),
            turrets: Vec::new(),
            auras: Vec::new(),
            ..SimConfig::default()
        };
        SimulationState::new(23, &config)
    }

    #[test]
    fn test_idle_militia_walk_to_rally_line() {
        let mut state = bare_state();
        deploy(&mut state.store);
        for _ in 0..200 {
            run_militia(&mut state);
        }
        assert_eq!(state.store.militia[0].position.x, MILITIA_RALLY_X);
        assert!(state.store.projectiles.is_empty());
    }

    #[test]
    fn test_militia_engage_and_strike() {
        let mut state = bare_state();
        deploy(&mut state.store);
        let id = state.store.allocate_id();
        let entry = spawn_entry(EnemyKind::Grunt, EnemyTier::Common, 1, WaveModifier::Calm);
        let lane_y = state.store.militia[0].position.y;
        state.store.push_enemy(Enemy::spawn(
            id,
            &entry,
            Vec2Fixed::new(fx(5), lane_y),
        ));
        for _ in 0..60 {
            run_militia(&mut state);
        }
        assert_eq!(state.store.militia[0].target, Some(id));
        assert!(!state.store.projectiles.is_empty());
        assert_eq!(state.store.projectiles[0].damage, MILITIA_DAMAGE);
    }

    #[test]
    fn test_militia_disband_after_lifetime() {
        let mut state = bare_state();
        deploy(&mut state.store);
        for _ in 0..MILITIA_LIFETIME {
            run_militia(&mut state);
        }
        assert!(state.store.militia[0].health.is_dead());
    }
}
