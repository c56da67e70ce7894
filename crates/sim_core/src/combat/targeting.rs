//! Target selection.
//!
//! Selection is a pure scan over enemies in ascending id order. A candidate
//! only replaces the current best when it is strictly better, so ties always
//! resolve to the lowest id.

use std::cmp::Ordering;

use crate::components::{Enemy, EntityId, TargetingMode};
use crate::math::{fx_mul, Fixed, Vec2Fixed};

/// Whether `enemy` is alive and within `range` of `origin`.
#[must_use]
pub fn in_range(enemy: &Enemy, origin: Vec2Fixed, range: Fixed) -> bool {
    enemy.is_alive() && enemy.position.within(origin, range)
}

/// Compare two candidates; `Greater` means `a` is the better target.
fn compare(mode: TargetingMode, origin: Vec2Fixed, a: &Enemy, b: &Enemy) -> Ordering {
    match mode {
        TargetingMode::ClosestToFortress => a.progress.cmp(&b.progress),
        TargetingMode::Weakest => b.health.current.cmp(&a.health.current),
        TargetingMode::Strongest => a.health.current.cmp(&b.health.current),
        TargetingMode::NearestToTurret => b
            .position
            .distance_squared(origin)
            .cmp(&a.position.distance_squared(origin)),
        TargetingMode::Fastest => a.effective_speed().cmp(&b.effective_speed()),
    }
}

/// Pick a target in range using `mode`.
#[must_use]
pub fn select_target(
    mode: TargetingMode,
    origin: Vec2Fixed,
    range: Fixed,
    enemies: &[Enemy],
) -> Option<EntityId> {
    let mut best: Option<&Enemy> = None;
    for enemy in enemies.iter().filter(|e| in_range(e, origin, range)) {
        best = match best {
            Some(current) if compare(mode, origin, enemy, current) != Ordering::Greater => {
                Some(current)
            }
            _ => Some(enemy),
        };
    }
    best.map(|e| e.id)
}

/// Nearest live enemy in range.
#[must_use]
pub fn nearest(origin: Vec2Fixed, range: Fixed, enemies: &[Enemy]) -> Option<EntityId> {
    select_target(TargetingMode::NearestToTurret, origin, range, enemies)
}

/// Up to `limit` live enemies in range, nearest first, ties by id.
#[must_use]
pub fn nearest_n(origin: Vec2Fixed, range: Fixed, enemies: &[Enemy], limit: usize) -> Vec<EntityId> {
    let mut candidates: Vec<(Fixed, EntityId)> = enemies
        .iter()
        .filter(|e| in_range(e, origin, range))
        .map(|e| (e.position.distance_squared(origin), e.id))
        .collect();
    candidates.sort_unstable();
    candidates.into_iter().take(limit).map(|(_, id)| id).collect()
}

/// Every live enemy within `radius` of `center`, in id order.
#[must_use]
pub fn within_radius(center: Vec2Fixed, radius: Fixed, enemies: &[Enemy]) -> Vec<EntityId> {
    enemies
        .iter()
        .filter(|e| in_range(e, center, radius))
        .map(|e| e.id)
        .collect()
}

/// Squared reach for a collision between two radii.
#[must_use]
pub fn contact_distance_squared(a: Fixed, b: Fixed) -> Fixed {
    let reach = a + b;
    fx_mul(reach, reach)
}
