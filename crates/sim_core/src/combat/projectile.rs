//! Projectile flight, hit detection and status decay.
//!
//! Each projectile ray-marches its per-tick movement in
//! [`PROJECTILE_SUBSTEPS`] sub-steps. At each sub-step the lowest-id live
//! enemy overlapping the projectile that it has not already hit is struck.
//! Pierce lets a projectile keep flying after a hit; with none left it is
//! spent.

use crate::combat::targeting::contact_distance_squared;
use crate::combat::{apply_hit, Hit};
use crate::components::{Enemy, EntityId, Projectile};
use crate::config::{
    CHAIN_RANGE, FIELD_HALF_HEIGHT, FIELD_MAX_X, FIELD_MIN_X, PROJECTILE_SUBSTEPS,
};
use crate::math::{fx_ratio, Vec2Fixed};
use crate::state::{Analytics, EntityStore, SimulationState};

/// Splash damage as percent of the hit.
pub const SPLASH_PERCENT: u32 = 50;
/// Each chain jump keeps this percent of the previous jump's damage.
pub const CHAIN_FALLOFF_PERCENT: u32 = 75;

fn out_of_bounds(position: Vec2Fixed) -> bool {
    position.x < FIELD_MIN_X
        || position.x > FIELD_MAX_X
        || position.y > FIELD_HALF_HEIGHT
        || position.y < -FIELD_HALF_HEIGHT
}

fn index_of(enemies: &[Enemy], id: EntityId) -> Option<usize> {
    enemies.binary_search_by_key(&id, |e| e.id).ok()
}

/// Lowest-id live enemy touching `point` that the projectile has not hit.
fn first_contact(projectile: &Projectile, point: Vec2Fixed, enemies: &[Enemy]) -> Option<EntityId> {
    enemies
        .iter()
        .find(|e| {
            e.is_alive()
                && !projectile.hits.contains(&e.id)
                && e.position.distance_squared(point)
                    <= contact_distance_squared(e.radius, projectile.radius)
        })
        .map(|e| e.id)
}

fn resolve_impact(
    projectile: &mut Projectile,
    target: EntityId,
    enemies: &mut [Enemy],
    analytics: &mut Analytics,
) {
    let Some(index) = index_of(enemies, target) else {
        return;
    };
    let hit = Hit {
        damage: projectile.damage,
        element: projectile.element,
        status: projectile.status,
    };
    apply_hit(&mut enemies[index], &hit, analytics);
    projectile.hits.push(target);
    let impact = enemies[index].position;

    if projectile.splash > crate::math::Fixed::ZERO {
        let splash = Hit {
            damage: hit.damage * SPLASH_PERCENT / 100,
            ..hit
        };
        for enemy in enemies.iter_mut().filter(|e| {
            e.id != target && e.is_alive() && e.position.within(impact, projectile.splash)
        }) {
            apply_hit(enemy, &splash, analytics);
        }
    }

    let mut from = impact;
    let mut damage = hit.damage;
    for _ in 0..projectile.chain {
        damage = damage * CHAIN_FALLOFF_PERCENT / 100;
        let next = enemies
            .iter()
            .filter(|e| {
                e.is_alive()
                    && !projectile.hits.contains(&e.id)
                    && e.position.within(from, CHAIN_RANGE)
            })
            .min_by_key(|e| (e.position.distance_squared(from), e.id))
            .map(|e| e.id);
        let Some(next) = next.and_then(|id| index_of(enemies, id)) else {
            break;
        };
        let jump = Hit { damage, ..hit };
        apply_hit(&mut enemies[next], &jump, analytics);
        projectile.hits.push(enemies[next].id);
        from = enemies[next].position;
    }

    if projectile.pierce == 0 {
        projectile.alive = false;
    } else {
        projectile.pierce -= 1;
    }
}

/// Move every projectile and resolve its hits, in id order.
pub fn run_projectiles(state: &mut SimulationState) {
    let SimulationState {
        store, analytics, ..
    } = state;
    let EntityStore {
        projectiles,
        enemies,
        ..
    } = store;

    for projectile in projectiles.iter_mut().filter(|p| p.alive) {
        let start = projectile.position;
        for step in 1..=PROJECTILE_SUBSTEPS {
            let point = start + projectile.velocity.scale(fx_ratio(step, PROJECTILE_SUBSTEPS));
            projectile.position = point;
            if let Some(target) = first_contact(projectile, point, enemies) {
                resolve_impact(projectile, target, enemies, analytics);
                if !projectile.alive {
                    break;
                }
            }
        }
        projectile.ttl = projectile.ttl.saturating_sub(1);
        if projectile.ttl == 0 || out_of_bounds(projectile.position) {
            projectile.alive = false;
        }
    }
}

/// Apply damage over time and advance every status timer.
pub fn decay_status_effects(state: &mut SimulationState) {
    let SimulationState {
        store, analytics, ..
    } = state;
    for enemy in store.enemies.iter_mut().filter(|e| e.is_alive()) {
        let dot = enemy.status.tick();
        if dot > 0 {
            let dealt = enemy.health.apply_damage(dot);
            analytics.damage_dealt += u64::from(dealt);
        }
    }
}
