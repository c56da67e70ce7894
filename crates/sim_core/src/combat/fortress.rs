//! Fortress auto-attack, skills and regen.

use crate::combat::status::StatusApplication;
use crate::combat::targeting::{select_target, within_radius};
use crate::combat::{apply_hit, scaled_cooldown, spawn_projectile, DamageChain, Hit, ProjectileSpec};
use crate::components::{AuraKind, Element, Fortress, FortressSkill, ProjectileOwner, TargetingMode};
use crate::config::{
    BARRAGE_DAMAGE_FACTOR, BARRAGE_RANGE, BULWARK_SHIELD_PERCENT, BULWARK_TICKS,
    CRYO_PULSE_FREEZE_TICKS, CRYO_PULSE_RANGE, FORTRESS_ATTACK_INTERVAL, FORTRESS_POSITION,
    FORTRESS_RANGE, RENEWAL_INTERVAL,
};
use crate::math::{fx_ratio, scale_fixed, Fixed, MULT_ONE};
use crate::state::{Analytics, SimulationState};

/// Fortress projectile speed.
pub const FORTRESS_PROJECTILE_SPEED: Fixed = fx_ratio(3, 2);

/// Damage the fortress: Bulwark shield first, then health.
pub fn damage_fortress(fortress: &mut Fortress, amount: u32, analytics: &mut Analytics) -> u32 {
    let absorbed = fortress.shield.min(amount);
    fortress.shield -= absorbed;
    let dealt = fortress.health.apply_damage(amount - absorbed);
    analytics.damage_taken += u64::from(dealt);
    absorbed + dealt
}

/// Hit points regenerated per Renewal pulse.
#[must_use]
pub fn renewal_amount(commander_level: u8) -> u32 {
    (u32::from(commander_level) / 10).max(1)
}

fn fortress_chain(state: &SimulationState) -> DamageChain {
    DamageChain {
        stone: state.bonuses.stone,
        artifact: MULT_ONE,
        hero_passive: MULT_ONE,
        buff_pct: state.bonuses.shared_buff_pct() + state.timed_buff_percent(),
        global: state.bonuses.global,
    }
}

/// Run the fortress for one tick: auto-attack, queued skills, timers.
pub fn run_fortress(state: &mut SimulationState) {
    let chain = fortress_chain(state);
    let renewal = state.store.fortress.has_aura(AuraKind::Renewal)
        && state.tick > 0
        && state.tick % RENEWAL_INTERVAL == 0;
    let base = state.store.fortress.base_damage();

    let SimulationState {
        store,
        bonuses,
        analytics,
        ..
    } = state;

    let fortress = &mut store.fortress;
    fortress.attack_cooldown = fortress.attack_cooldown.saturating_sub(1);
    if fortress.attack_cooldown == 0 {
        let range = scale_fixed(FORTRESS_RANGE, bonuses.range);
        let target = select_target(
            TargetingMode::ClosestToFortress,
            FORTRESS_POSITION,
            range,
            &store.enemies,
        )
        .and_then(|id| store.live_enemy(id))
        .map(|e| e.position);
        if let Some(aim) = target {
            spawn_projectile(
                store,
                analytics,
                ProjectileSpec {
                    owner: ProjectileOwner::Fortress,
                    origin: FORTRESS_POSITION,
                    aim,
                    speed: FORTRESS_PROJECTILE_SPEED,
                    hit: Hit {
                        damage: chain.resolve(base),
                        element: Element::Physical,
                        status: None,
                    },
                    pierce: 0,
                    splash: Fixed::ZERO,
                    chain: 0,
                },
            );
            store.fortress.attack_cooldown =
                scaled_cooldown(FORTRESS_ATTACK_INTERVAL, bonuses.cooldown);
        }
    }

    let pending = std::mem::take(&mut store.fortress.pending_skills);
    for skill in pending {
        tracing::debug!(?skill, "Fortress skill");
        match skill {
            FortressSkill::Barrage => {
                let hit = Hit {
                    damage: chain.resolve(base * BARRAGE_DAMAGE_FACTOR),
                    element: Element::Physical,
                    status: None,
                };
                for id in within_radius(FORTRESS_POSITION, BARRAGE_RANGE, &store.enemies) {
                    if let Some(enemy) = store.enemy_mut(id) {
                        apply_hit(enemy, &hit, analytics);
                    }
                }
            }
            FortressSkill::Bulwark => {
                let fortress = &mut store.fortress;
                fortress.shield = fortress.health.max * BULWARK_SHIELD_PERCENT / 100;
                fortress.shield_ticks = BULWARK_TICKS;
            }
            FortressSkill::CryoPulse => {
                let freeze = StatusApplication::Freeze {
                    duration: CRYO_PULSE_FREEZE_TICKS,
                }
                .scaled(bonuses.status_duration, bonuses.slow_strength);
                for enemy in store
                    .enemies
                    .iter_mut()
                    .filter(|e| e.is_alive() && e.position.within(FORTRESS_POSITION, CRYO_PULSE_RANGE))
                {
                    enemy.status.apply(freeze);
                }
            }
        }
    }

    let fortress = &mut store.fortress;
    for cooldown in &mut fortress.skill_cooldowns {
        *cooldown = cooldown.saturating_sub(1);
    }
    if fortress.shield_ticks > 0 {
        fortress.shield_ticks -= 1;
        if fortress.shield_ticks == 0 {
            fortress.shield = 0;
        }
    }
    if renewal && !fortress.health.is_dead() {
        fortress.health.heal(renewal_amount(fortress.commander_level));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Enemy, EnemyTier};
    use crate::config::SimConfig;
    use crate::enemy_kind::EnemyKind;
    use crate::math::Vec2Fixed;
    use crate::waves::{spawn_entry, WaveModifier};

    fn bare_state(auras: Vec<AuraKind>) -> SimulationState {
        let config = SimConfig {
            heroes: Vec::new(),
            turrets: Vec::new(),
            auras,
            ..SimConfig::default()
        };
        SimulationState::new(3, &config)
    }

    fn add_brute(state: &mut SimulationState, x: i32) -> u32 {
        let id = state.store.allocate_id();
        let entry = spawn_entry(EnemyKind::Brute, EnemyTier::Common, 1, WaveModifier::Calm);
        state
            .store
            .push_enemy(Enemy::spawn(id, &entry, Vec2Fixed::from_ints(x, 0)));
        id
    }

    #[test]
    fn test_auto_attack_waits_for_cooldown() {
        let mut state = bare_state(Vec::new());
        add_brute(&mut state, 10);
        for _ in 0..FORTRESS_ATTACK_INTERVAL - 1 {
            run_fortress(&mut state);
        }
        assert!(state.store.projectiles.is_empty());
        run_fortress(&mut state);
        assert_eq!(state.store.projectiles.len(), 1);
        // Balanced: 20 * 110% floors to 21
        assert_eq!(state.store.projectiles[0].damage, 21);
        assert_eq!(state.store.fortress.attack_cooldown, FORTRESS_ATTACK_INTERVAL);
    }

    #[test]
    fn test_barrage_hits_everything_in_reach() {
        let mut state = bare_state(Vec::new());
        let near = add_brute(&mut state, 10);
        let far = add_brute(&mut state, 20);
        state.store.fortress.pending_skills.push(FortressSkill::Barrage);
        run_fortress(&mut state);
        assert_eq!(state.store.enemy(near).unwrap().health.current, 78);
        assert_eq!(state.store.enemy(far).unwrap().health.current, 120);
        assert!(state.store.fortress.pending_skills.is_empty());
    }

    #[test]
    fn test_bulwark_shield_absorbs_then_expires() {
        let mut state = bare_state(Vec::new());
        state.store.fortress.pending_skills.push(FortressSkill::Bulwark);
        run_fortress(&mut state);
        let max = state.store.fortress.health.max;
        assert_eq!(state.store.fortress.shield, max / 4);

        let mut analytics = Analytics::default();
        damage_fortress(&mut state.store.fortress, max / 4 + 10, &mut analytics);
        assert_eq!(state.store.fortress.shield, 0);
        assert_eq!(state.store.fortress.health.current, max - 10);
        assert_eq!(analytics.damage_taken, 10);

        state.store.fortress.shield = 5;
        for _ in 0..BULWARK_TICKS {
            run_fortress(&mut state);
        }
        assert_eq!(state.store.fortress.shield, 0);
    }

    #[test]
    fn test_cryo_pulse_freezes_nearby() {
        let mut state = bare_state(Vec::new());
        let near = add_brute(&mut state, 5);
        state.store.fortress.pending_skills.push(FortressSkill::CryoPulse);
        run_fortress(&mut state);
        let enemy = state.store.enemy(near).unwrap();
        assert!(enemy.status.is_immobilized());
        assert_eq!(enemy.health.current, 120);
    }

    #[test]
    fn test_renewal_heals_on_interval() {
        let mut state = bare_state(vec![AuraKind::Renewal]);
        state.store.fortress.health.current -= 20;
        state.tick = RENEWAL_INTERVAL - 1;
        run_fortress(&mut state);
        let before = state.store.fortress.health.current;
        state.tick = RENEWAL_INTERVAL;
        run_fortress(&mut state);
        assert_eq!(state.store.fortress.health.current, before + renewal_amount(1));
        assert_eq!(renewal_amount(35), 3);
    }
}
