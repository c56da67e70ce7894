//! Physics phase.
//!
//! Enemies walk straight down their lane toward the fortress. Walls stop
//! them at the wall face and militia stop them on contact; a blocked enemy
//! attacks its blocker instead of moving. An enemy that crosses
//! [`LEAK_X`] hits the fortress and leaves play.

use crate::combat::fortress::damage_fortress;
use crate::combat::targeting::contact_distance_squared;
use crate::components::{AuraKind, Blocker, Enemy, Health, Militia, Wall};
use crate::config::{ENEMY_ATTACK_INTERVAL, FROST_FIELD_FACTOR, FROST_FIELD_RANGE, LEAK_X};
use crate::math::{fx_ratio, scale_fixed, Fixed};
use crate::state::{EntityStore, SimulationState};

/// Militia body radius for blocking.
pub const MILITIA_RADIUS: Fixed = fx_ratio(1, 2);

/// Lane speed for this tick after status effects and Frost Field.
#[must_use]
pub fn lane_speed(enemy: &Enemy, frost_field: bool) -> Fixed {
    let speed = enemy.effective_speed();
    if frost_field && enemy.position.x <= FROST_FIELD_RANGE {
        scale_fixed(speed, FROST_FIELD_FACTOR)
    } else {
        speed
    }
}

/// Lowest-id living militia touching `enemy`.
fn touching_militia<'a>(enemy: &Enemy, militia: &'a mut [Militia]) -> Option<&'a mut Militia> {
    militia.iter_mut().find(|m| {
        !m.health.is_dead()
            && m.position.distance_squared(enemy.position)
                <= contact_distance_squared(MILITIA_RADIUS, enemy.radius)
    })
}

/// Closest standing wall ahead of `enemy`, by face position.
fn wall_ahead<'a>(enemy: &Enemy, walls: &'a mut [Wall]) -> Option<&'a mut Wall> {
    walls
        .iter_mut()
        .filter(|w| !w.health.is_dead() && w.x + enemy.radius <= enemy.position.x)
        .max_by_key(|w| (w.x, std::cmp::Reverse(w.id)))
}

fn strike(enemy: &mut Enemy, health: &mut Health) {
    if enemy.attack_cooldown == 0 && !enemy.status.is_immobilized() {
        health.apply_damage(enemy.damage);
        enemy.attack_cooldown = ENEMY_ATTACK_INTERVAL;
    }
}

/// Move every enemy one tick, in id order, and resolve blocking and leaks.
pub fn physics_system(state: &mut SimulationState) {
    let frost_field = state.store.fortress.has_aura(AuraKind::FrostField);
    let SimulationState {
        store, analytics, ..
    } = state;
    let EntityStore {
        fortress,
        enemies,
        walls,
        militia,
        ..
    } = store;

    for enemy in enemies.iter_mut().filter(|e| e.is_alive()) {
        enemy.attack_cooldown = enemy.attack_cooldown.saturating_sub(1);
        enemy.blocked_by = None;

        if let Some(unit) = touching_militia(enemy, militia) {
            enemy.blocked_by = Some(Blocker::Militia(unit.id));
            strike(enemy, &mut unit.health);
            continue;
        }

        let speed = lane_speed(enemy, frost_field);
        let mut next_x = enemy.position.x - speed;
        if let Some(wall) = wall_ahead(enemy, walls) {
            let face = wall.x + enemy.radius;
            if next_x <= face {
                next_x = face;
                enemy.blocked_by = Some(Blocker::Wall(wall.id));
            }
            let moved = enemy.position.x - next_x;
            enemy.position.x = next_x;
            enemy.progress += moved;
            if enemy.blocked_by.is_some() {
                strike(enemy, &mut wall.health);
            }
            continue;
        }

        enemy.position.x = next_x;
        enemy.progress += speed;
        if enemy.position.x <= LEAK_X {
            enemy.leaked = true;
            damage_fortress(fortress, enemy.damage, analytics);
            analytics.leaks += 1;
            tracing::debug!(enemy = enemy.id, kind = ?enemy.kind, damage = enemy.damage, "Enemy leaked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::militia::deploy;
    use crate::combat::status::StatusApplication;
    use crate::components::{EnemyTier, EntityId};
    use crate::config::SimConfig;
    use crate::enemy_kind::EnemyKind;
    use crate::math::{fx, Vec2Fixed};
    use crate::waves::{spawn_entry, WaveModifier};

    fn bare_state(auras: Vec<AuraKind>) -> SimulationState {
        let config = SimConfig {
            heroes: Vec::new(),
            turrets: Vec::new(),
            auras,
            ..SimConfig::default()
        };
        SimulationState::new(29, &config)
    }

    fn add_grunt(state: &mut SimulationState, x: Fixed) -> EntityId {
        let id = state.store.allocate_id();
        let entry = spawn_entry(EnemyKind::Grunt, EnemyTier::Common, 1, WaveModifier::Calm);
        state
            .store
            .push_enemy(Enemy::spawn(id, &entry, Vec2Fixed::new(x, Fixed::ZERO)));
        id
    }

    #[test]
    fn test_enemies_walk_and_track_progress() {
        let mut state = bare_state(Vec::new());
        let id = add_grunt(&mut state, fx(20));
        for _ in 0..20 {
            physics_system(&mut state);
        }
        let enemy = state.store.enemy(id).unwrap();
        assert_eq!(enemy.progress, enemy.speed * 20);
        assert_eq!(enemy.position.x, fx(20) - enemy.progress);
    }

    #[test]
    fn test_frozen_enemy_stays_put() {
        let mut state = bare_state(Vec::new());
        let id = add_grunt(&mut state, fx(20));
        state
            .store
            .enemy_mut(id)
            .unwrap()
            .status
            .apply(StatusApplication::Freeze { duration: 10 });
        physics_system(&mut state);
        assert_eq!(state.store.enemy(id).unwrap().position.x, fx(20));
    }

    #[test]
    fn test_frost_field_slows_near_fortress() {
        let entry = spawn_entry(EnemyKind::Grunt, EnemyTier::Common, 1, WaveModifier::Calm);
        let near = Enemy::spawn(1, &entry, Vec2Fixed::from_ints(6, 0));
        let far = Enemy::spawn(2, &entry, Vec2Fixed::from_ints(20, 0));
        assert!(lane_speed(&near, true) < near.speed);
        assert_eq!(lane_speed(&far, true), far.speed);
        assert_eq!(lane_speed(&near, false), near.speed);
    }

    #[test]
    fn test_wall_blocks_and_takes_damage() {
        let mut state = bare_state(Vec::new());
        let wall_id = state.store.allocate_id();
        state.store.walls.push(Wall {
            id: wall_id,
            x: fx(10),
            health: Health::new(300),
        });
        let id = add_grunt(&mut state, fx(11));
        for _ in 0..40 {
            physics_system(&mut state);
        }
        let enemy = state.store.enemy(id).unwrap();
        assert_eq!(enemy.position.x, fx(10) + enemy.radius);
        assert_eq!(enemy.blocked_by, Some(Blocker::Wall(wall_id)));
        assert!(state.store.walls[0].health.current < 300);
    }

    #[test]
    fn test_militia_blocks_on_contact() {
        let mut state = bare_state(Vec::new());
        let unit = deploy(&mut state.store);
        let y = state.store.militia[0].position.y;
        let id = state.store.allocate_id();
        let entry = spawn_entry(EnemyKind::Grunt, EnemyTier::Common, 1, WaveModifier::Calm);
        state
            .store
            .push_enemy(Enemy::spawn(id, &entry, Vec2Fixed::new(fx(3), y)));
        physics_system(&mut state);
        let enemy = state.store.enemy(id).unwrap();
        assert_eq!(enemy.blocked_by, Some(Blocker::Militia(unit)));
        assert_eq!(enemy.position.x, fx(3));
        assert_eq!(state.store.militia[0].health.current, 50);
    }

    #[test]
    fn test_leak_damages_fortress() {
        let mut state = bare_state(Vec::new());
        let id = add_grunt(&mut state, LEAK_X);
        let before = state.store.fortress.health.current;
        physics_system(&mut state);
        let enemy = state.store.enemy(id).unwrap();
        assert!(enemy.leaked);
        assert!(!enemy.is_alive());
        assert_eq!(state.store.fortress.health.current, before - 10);
        assert_eq!(state.analytics.leaks, 1);
        assert_eq!(state.analytics.damage_taken, 10);
    }
}
