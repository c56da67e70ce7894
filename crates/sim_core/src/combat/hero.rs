//! Hero AI.
//!
//! Heroes run in slot order. Each hero is a small state machine:
//!
//! - `Commanded`: walk to the ordered point, ignore enemies, then idle there.
//! - `Idle`: acquire the nearest enemy in aggro range, otherwise walk home.
//! - `Combat`: close to attack range and attack when the cooldown is ready.
//!
//! Every attack draws once from the RNG to roll a flurry (halved cooldown).

use crate::combat::status::StatusApplication;
use crate::combat::synergy::Bonuses;
use crate::combat::targeting::{nearest, nearest_n, within_radius};
use crate::combat::{apply_hit, scaled_cooldown, spawn_projectile, DamageChain, Hit, ProjectileSpec};
use crate::components::{Enemy, Hero, HeroClass, HeroPassive, HeroState, ProjectileOwner};
use crate::config::SKILL_COOLDOWN_TICKS;
use crate::math::{fx, mult_pct, scale_fixed, scale_u32, Fixed, MULT_ONE};
use crate::rng::DeterministicRng;
use crate::state::{SimulationState, TimedBuff};

/// Percent chance that an attack is a flurry.
pub const FLURRY_CHANCE_PCT: u32 = 10;
/// Rally buff.
pub const RALLY_BUFF_PCT: u32 = 20;
/// Rally duration.
pub const RALLY_TICKS: u32 = 150;
/// Most targets of a Volley.
pub const VOLLEY_TARGETS: usize = 5;
/// Inferno burn per tick.
pub const INFERNO_BURN: u32 = 4;
/// Inferno burn duration.
pub const INFERNO_TICKS: u32 = 150;
/// Inferno and Blizzard reach.
pub const NOVA_RADIUS: Fixed = fx(6);
/// Blizzard freeze duration.
pub const BLIZZARD_FREEZE_TICKS: u32 = 60;
/// Thunderclap reach.
pub const THUNDERCLAP_RADIUS: Fixed = fx(7);
/// Thunderclap damage as a multiple of an attack.
pub const THUNDERCLAP_FACTOR: u32 = 3;
/// Thunderclap stun duration.
pub const THUNDERCLAP_STUN_TICKS: u32 = 30;

/// Per-attack damage before the chain.
#[must_use]
pub fn base_damage(hero: &Hero) -> u32 {
    scale_u32(hero.class.stats().damage, hero.tier.multiplier())
}

/// Damage chain for `hero` attacking `target`.
#[must_use]
pub fn damage_chain(hero: &Hero, target: &Enemy, bonuses: &Bonuses, buff_pct: u32) -> DamageChain {
    let element = hero.class.stats().element;
    let hero_passive = match hero.passive {
        HeroPassive::Veteran => mult_pct(110),
        HeroPassive::Executioner if target.health.percentage() < 30 => mult_pct(150),
        HeroPassive::Sharpshooter if target.is_elite_or_boss() => mult_pct(115),
        _ => MULT_ONE,
    };
    DamageChain {
        stone: bonuses.stone,
        artifact: hero.artifact.map_or(MULT_ONE, |a| a.bonus(element)),
        hero_passive,
        buff_pct,
        global: bonuses.global,
    }
}

/// Status a hero applies, after duration and strength bonuses.
#[must_use]
pub fn scaled_status(
    hero: &Hero,
    status: StatusApplication,
    bonuses: &Bonuses,
) -> StatusApplication {
    let duration = if hero.passive == HeroPassive::Elementalist {
        crate::math::mult_mul(bonuses.status_duration, mult_pct(125))
    } else {
        bonuses.status_duration
    };
    status.scaled(duration, bonuses.slow_strength)
}

fn attack_spec(hero: &Hero, target: &Enemy, bonuses: &Bonuses, buff_pct: u32) -> ProjectileSpec {
    let stats = hero.class.stats();
    let chain = damage_chain(hero, target, bonuses, buff_pct);
    ProjectileSpec {
        owner: ProjectileOwner::Hero(hero.slot),
        origin: hero.position,
        aim: target.position,
        speed: stats.projectile_speed,
        hit: Hit {
            damage: chain.resolve(base_damage(hero)),
            element: stats.element,
            status: stats.status.map(|s| scaled_status(hero, s, bonuses)),
        },
        pierce: stats.pierce,
        splash: stats.splash,
        chain: stats.chain,
    }
}

/// Drop a target that died or, for acquired targets, wandered out of aggro range.
fn revalidate_target(hero: &mut Hero, enemies: &[Enemy], aggro: Fixed) {
    let Some(id) = hero.target else { return };
    let valid = enemies
        .binary_search_by_key(&id, |e| e.id)
        .ok()
        .map(|index| &enemies[index])
        .is_some_and(|e| e.is_alive() && (hero.forced_target || e.position.within(hero.position, aggro)));
    if !valid {
        hero.target = None;
        hero.forced_target = false;
        if hero.state == HeroState::Combat {
            hero.state = HeroState::Idle;
        }
    }
}

/// Run every hero for one tick.
pub fn run_heroes(state: &mut SimulationState) {
    let buff_pct = state.bonuses.shared_buff_pct() + state.timed_buff_percent();
    let SimulationState {
        rng,
        store,
        bonuses,
        buffs,
        analytics,
        ..
    } = state;

    let mut shots = Vec::new();
    for hero in &mut store.heroes {
        if hero.disabled_ticks > 0 {
            hero.disabled_ticks -= 1;
            continue;
        }
        hero.attack_cooldown = hero.attack_cooldown.saturating_sub(1);
        hero.skill_cooldown = hero.skill_cooldown.saturating_sub(1);

        let stats = hero.class.stats();
        let range = scale_fixed(stats.range, bonuses.range);
        let aggro = scale_fixed(stats.aggro_range, bonuses.range);

        if hero.skill_pending {
            hero.skill_pending = false;
            hero.skill_cooldown = scaled_cooldown(SKILL_COOLDOWN_TICKS, bonuses.cooldown);
            cast_skill(hero, &mut store.enemies, bonuses, buff_pct, buffs, analytics, &mut shots, range);
        }

        if hero.state == HeroState::Commanded {
            if let Some(destination) = hero.command_target {
                hero.position = hero.position.step_toward(destination, stats.speed);
                if hero.position == destination {
                    hero.home = destination;
                    hero.command_target = None;
                    hero.state = HeroState::Idle;
                }
                continue;
            }
            hero.state = HeroState::Idle;
        }

        revalidate_target(hero, &store.enemies, aggro);
        if hero.target.is_none() {
            hero.target = nearest(hero.position, aggro, &store.enemies);
            if hero.target.is_some() {
                hero.state = HeroState::Combat;
            }
        }

        let Some(target_id) = hero.target else {
            hero.position = hero.position.step_toward(hero.home, stats.speed);
            continue;
        };
        let Ok(index) = store.enemies.binary_search_by_key(&target_id, |e| e.id) else {
            continue;
        };
        let target = &store.enemies[index];

        if !target.position.within(hero.position, range) {
            hero.position = hero.position.step_toward(target.position, stats.speed);
            continue;
        }

        if hero.attack_cooldown == 0 {
            shots.push(attack_spec(hero, target, bonuses, buff_pct));
            hero.attack_cooldown = attack_cooldown(rng, stats.attack_interval, bonuses);
        }
    }

    for spec in shots {
        spawn_projectile(store, analytics, spec);
    }
}

/// Roll the flurry and return the next cooldown.
fn attack_cooldown(rng: &mut DeterministicRng, interval: u32, bonuses: &Bonuses) -> u32 {
    let flurry = rng.next_u32() % 100 < FLURRY_CHANCE_PCT;
    let interval = if flurry { interval / 2 } else { interval };
    scaled_cooldown(interval, bonuses.cooldown)
}

#[allow(clippy::too_many_arguments)]
fn cast_skill(
    hero: &Hero,
    enemies: &mut [Enemy],
    bonuses: &Bonuses,
    buff_pct: u32,
    buffs: &mut Vec<TimedBuff>,
    analytics: &mut crate::state::Analytics,
    shots: &mut Vec<ProjectileSpec>,
    range: Fixed,
) {
    tracing::debug!(slot = hero.slot, class = ?hero.class, "Hero skill");
    match hero.class {
        HeroClass::Vanguard => buffs.push(TimedBuff {
            percent: RALLY_BUFF_PCT,
            remaining: RALLY_TICKS,
        }),
        HeroClass::Ranger => {
            for id in nearest_n(hero.position, range, enemies, VOLLEY_TARGETS) {
                if let Ok(index) = enemies.binary_search_by_key(&id, |e| e.id) {
                    shots.push(attack_spec(hero, &enemies[index], bonuses, buff_pct));
                }
            }
        }
        HeroClass::Pyromancer => {
            let burn = scaled_status(
                hero,
                StatusApplication::Burn {
                    per_tick: INFERNO_BURN,
                    duration: INFERNO_TICKS,
                },
                bonuses,
            );
            for enemy in enemies
                .iter_mut()
                .filter(|e| e.is_alive() && e.position.within(hero.position, NOVA_RADIUS))
            {
                enemy.status.apply(burn);
            }
        }
        HeroClass::Frostweaver => {
            let freeze = scaled_status(
                hero,
                StatusApplication::Freeze {
                    duration: BLIZZARD_FREEZE_TICKS,
                },
                bonuses,
            );
            for enemy in enemies
                .iter_mut()
                .filter(|e| e.is_alive() && e.position.within(hero.position, NOVA_RADIUS))
            {
                enemy.status.apply(freeze);
            }
        }
        HeroClass::Stormcaller => {
            let stun = scaled_status(
                hero,
                StatusApplication::Stun {
                    duration: THUNDERCLAP_STUN_TICKS,
                },
                bonuses,
            );
            let element = hero.class.stats().element;
            let base = base_damage(hero) * THUNDERCLAP_FACTOR;
            for id in within_radius(hero.position, THUNDERCLAP_RADIUS, enemies) {
                if let Ok(index) = enemies.binary_search_by_key(&id, |e| e.id) {
                    let chain = damage_chain(hero, &enemies[index], bonuses, buff_pct);
                    let hit = Hit {
                        damage: chain.resolve(base),
                        element,
                        status: Some(stun),
                    };
                    apply_hit(&mut enemies[index], &hit, analytics);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{EnemyTier, HeroTier};
    use crate::config::{HeroLoadout, SimConfig};
    use crate::enemy_kind::EnemyKind;
    use crate::math::Vec2Fixed;
    use crate::waves::{spawn_entry, WaveModifier};

    fn state_with_hero(class: HeroClass) -> SimulationState {
        let config = SimConfig {
            heroes: vec![HeroLoadout::basic(class)],
            turrets: Vec::new(),
            auras: Vec::new(),
            ..SimConfig::default()
        };
        SimulationState::new(3, &config)
    }

    fn add_enemy(state: &mut SimulationState, x: i32, y: i32) -> u32 {
        let id = state.store.allocate_id();
        let entry = spawn_entry(EnemyKind::Brute, EnemyTier::Common, 1, WaveModifier::Calm);
        state
            .store
            .push_enemy(Enemy::spawn(id, &entry, Vec2Fixed::from_ints(x, y)));
        id
    }

    #[test]
    fn test_idle_hero_acquires_and_fires() {
        let mut state = state_with_hero(HeroClass::Ranger);
        let id = add_enemy(&mut state, 9, -2);
        run_heroes(&mut state);
        let hero = &state.store.heroes[0];
        assert_eq!(hero.target, Some(id));
        assert_eq!(hero.state, HeroState::Combat);
        assert_eq!(state.store.projectiles.len(), 1);
        assert!(hero.attack_cooldown == 24 || hero.attack_cooldown == 12);
    }

    #[test]
    fn test_commanded_hero_ignores_enemies_until_arrival() {
        let mut state = state_with_hero(HeroClass::Ranger);
        add_enemy(&mut state, 9, -2);
        let hero = &mut state.store.heroes[0];
        hero.state = HeroState::Commanded;
        hero.command_target = Some(Vec2Fixed::from_ints(20, 0));
        run_heroes(&mut state);
        assert!(state.store.projectiles.is_empty());
        assert_eq!(state.store.heroes[0].state, HeroState::Commanded);
    }

    #[test]
    fn test_disabled_hero_does_nothing() {
        let mut state = state_with_hero(HeroClass::Ranger);
        add_enemy(&mut state, 9, -2);
        state.store.heroes[0].disabled_ticks = 2;
        run_heroes(&mut state);
        assert!(state.store.projectiles.is_empty());
        assert_eq!(state.store.heroes[0].disabled_ticks, 1);
    }

    #[test]
    fn test_each_attack_draws_once() {
        let mut state = state_with_hero(HeroClass::Ranger);
        add_enemy(&mut state, 9, -2);
        let mut expected = state.rng;
        expected.next_u32();
        run_heroes(&mut state);
        assert_eq!(state.rng, expected);
    }

    #[test]
    fn test_rally_adds_timed_buff() {
        let mut state = state_with_hero(HeroClass::Vanguard);
        state.store.heroes[0].skill_pending = true;
        run_heroes(&mut state);
        assert_eq!(state.timed_buff_percent(), RALLY_BUFF_PCT);
        assert_eq!(state.store.heroes[0].skill_cooldown, SKILL_COOLDOWN_TICKS);
    }

    #[test]
    fn test_thunderclap_stuns_and_damages() {
        let mut state = state_with_hero(HeroClass::Stormcaller);
        let id = add_enemy(&mut state, 8, 0);
        state.store.heroes[0].skill_pending = true;
        run_heroes(&mut state);
        let enemy = state.store.enemy(id).unwrap();
        assert!(enemy.status.stun > 0);
        assert_eq!(enemy.health.current, 120 - 48);
    }

    #[test]
    fn test_tier_scales_base_damage() {
        let mut state = state_with_hero(HeroClass::Vanguard);
        state.store.heroes[0].tier = HeroTier::Legendary;
        assert_eq!(base_damage(&state.store.heroes[0]), 40);
    }
}
