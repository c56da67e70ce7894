//! Turret targeting and fire.

use crate::combat::status::StatusApplication;
use crate::combat::synergy::{Bonuses, Synergy, WILDFIRE_BUFF_PCT};
use crate::combat::targeting::select_target;
use crate::combat::{scaled_cooldown, spawn_projectile, DamageChain, Hit, ProjectileSpec};
use crate::components::{
    AuraKind, OverchargeState, ProjectileOwner, Turret, TurretKind, MAX_TURRET_LEVEL,
};
use crate::config::{
    HASTE_COOLDOWN, OVERCHARGE_ACTIVE_TICKS, OVERCHARGE_COOLDOWN_TICKS, TURRET_LEVEL_BONUS_PCT,
    TURRET_REFUND_PCT,
};
use crate::math::{mult_mul, mult_pct, scale_fixed, scale_u32, MULT_ONE};
use crate::state::SimulationState;

/// Damage per shot before the chain.
#[must_use]
pub fn base_damage(turret: &Turret) -> u32 {
    let level_bonus = TURRET_LEVEL_BONUS_PCT * (u32::from(turret.level) - 1);
    turret.kind.stats().damage * (100 + level_bonus) / 100
}

/// Gold to go from the current level to the next.
#[must_use]
pub fn upgrade_cost(turret: &Turret) -> Option<u32> {
    (turret.level < MAX_TURRET_LEVEL).then(|| turret.kind.stats().cost * u32::from(turret.level))
}

/// Gold returned when the turret is removed: half of everything spent on it.
#[must_use]
pub fn refund_value(turret: &Turret) -> u32 {
    let cost = turret.kind.stats().cost;
    let level = u32::from(turret.level);
    let invested = cost + cost * (level - 1) * level / 2;
    invested * TURRET_REFUND_PCT / 100
}

/// Overcharge duration after relics.
#[must_use]
pub fn overcharge_ticks(bonuses: &Bonuses) -> u32 {
    scale_u32(OVERCHARGE_ACTIVE_TICKS, bonuses.overcharge_duration)
}

/// Advance the overcharge state machine by one tick.
pub fn tick_overcharge(turret: &mut Turret) {
    turret.overcharge = match turret.overcharge {
        OverchargeState::Active { remaining } if remaining > 1 => OverchargeState::Active {
            remaining: remaining - 1,
        },
        OverchargeState::Active { .. } => OverchargeState::CoolingDown {
            remaining: OVERCHARGE_COOLDOWN_TICKS,
        },
        OverchargeState::CoolingDown { remaining } if remaining > 1 => {
            OverchargeState::CoolingDown {
                remaining: remaining - 1,
            }
        }
        OverchargeState::CoolingDown { .. } | OverchargeState::Inactive => {
            OverchargeState::Inactive
        }
    };
}

fn fire_interval(turret: &Turret, bonuses: &Bonuses, haste: bool) -> u32 {
    let mut factor = bonuses.cooldown;
    if haste {
        factor = mult_mul(factor, HASTE_COOLDOWN);
    }
    if matches!(turret.overcharge, OverchargeState::Active { .. }) {
        factor = mult_mul(factor, mult_pct(50));
    }
    scaled_cooldown(turret.kind.stats().fire_interval, factor)
}

fn shot_status(kind: TurretKind, bonuses: &Bonuses) -> Option<StatusApplication> {
    let status = kind.stats().status?;
    let mut duration = bonuses.status_duration;
    if kind == TurretKind::Cryo && bonuses.has(Synergy::Permafrost) {
        duration = mult_mul(duration, mult_pct(150));
    }
    Some(status.scaled(duration, bonuses.slow_strength))
}

/// Run every turret for one tick, in placement order.
pub fn run_turrets(state: &mut SimulationState) {
    let shared_buff = state.bonuses.shared_buff_pct() + state.timed_buff_percent();
    let haste = state.store.fortress.has_aura(AuraKind::Haste);
    let SimulationState {
        store,
        bonuses,
        analytics,
        ..
    } = state;

    let mut shots = Vec::new();
    for turret in &mut store.turrets {
        tick_overcharge(turret);
        turret.cooldown = turret.cooldown.saturating_sub(1);
        if turret.cooldown > 0 {
            continue;
        }

        let stats = turret.kind.stats();
        let range = scale_fixed(stats.range, bonuses.range);
        let Some(target_id) = select_target(turret.mode, turret.position, range, &store.enemies)
        else {
            continue;
        };
        let Ok(index) = store.enemies.binary_search_by_key(&target_id, |e| e.id) else {
            continue;
        };
        let target = &store.enemies[index];

        let mut buff_pct = shared_buff;
        if turret.kind == TurretKind::Artillery && bonuses.has(Synergy::Wildfire) {
            buff_pct += WILDFIRE_BUFF_PCT;
        }
        let chain = DamageChain {
            stone: bonuses.stone,
            artifact: MULT_ONE,
            hero_passive: MULT_ONE,
            buff_pct,
            global: bonuses.global,
        };
        let extra_chain = u8::from(turret.kind == TurretKind::Arc && bonuses.has(Synergy::Conduction));

        shots.push(ProjectileSpec {
            owner: ProjectileOwner::Turret(turret.id),
            origin: turret.position,
            aim: target.position,
            speed: stats.projectile_speed,
            hit: Hit {
                damage: chain.resolve(base_damage(turret)),
                element: stats.element,
                status: shot_status(turret.kind, bonuses),
            },
            pierce: stats.pierce,
            splash: stats.splash,
            chain: stats.chain + extra_chain,
        });
        turret.cooldown = fire_interval(turret, bonuses, haste);
    }

    for spec in shots {
        spawn_projectile(store, analytics, spec);
    }
}
