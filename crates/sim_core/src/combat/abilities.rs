//! Enemy abilities, modifier regen and combo resolution.
//!
//! All three run in the damage phase, scanning enemies in id order.

use crate::combat::combo::{
    Combo, OVERLOAD_STUN_TICKS, SHATTER_PERCENT, STEAM_BURST_DAMAGE, STEAM_BURST_RADIUS,
    TOXIC_BLAZE_ARMOR_BREAK_TICKS, TOXIC_BLAZE_DAMAGE,
};
use crate::combat::damage_enemy;
use crate::combat::status::StatusApplication;
use crate::components::{Enemy, EnemyTier, EntityId};
use crate::config::MAX_LIVE_ENEMIES;
use crate::enemy_kind::{EnemyAbility, EnemyKind};
use crate::math::{Fixed, Vec2Fixed};
use crate::state::SimulationState;
use crate::waves::spawn_entry;

/// Ticks between modifier regen pulses.
pub const REGEN_INTERVAL: u64 = 30;

fn allies_in_radius(
    enemies: &mut [Enemy],
    caster: EntityId,
    origin: Vec2Fixed,
    radius: Fixed,
) -> impl Iterator<Item = &mut Enemy> {
    enemies
        .iter_mut()
        .filter(move |e| e.id != caster && e.is_alive() && e.position.within(origin, radius))
}

/// Tick ability cooldowns and resolve every cast that comes due.
pub fn run_enemy_abilities(state: &mut SimulationState) {
    let mut casts = Vec::new();
    for enemy in state.store.enemies.iter_mut().filter(|e| e.is_alive()) {
        let Some(ability) = enemy.kind.profile().ability else {
            continue;
        };
        enemy.ability_cooldown = enemy.ability_cooldown.saturating_sub(1);
        if enemy.ability_cooldown > 0 || enemy.status.is_stunned() {
            continue;
        }
        enemy.ability_cooldown = ability.interval();
        casts.push((enemy.id, enemy.position, ability));
    }

    let mut summons: Vec<(EnemyKind, Vec2Fixed)> = Vec::new();
    for (caster, origin, ability) in casts {
        tracing::trace!(caster, ?ability, "Enemy ability");
        match ability {
            EnemyAbility::Shield {
                percent, radius, ..
            } => {
                for ally in allies_in_radius(&mut state.store.enemies, caster, origin, radius) {
                    let grant = ally.health.max * percent / 100;
                    ally.shield = (ally.shield + grant).min(ally.health.max);
                }
            }
            EnemyAbility::Heal {
                percent, radius, ..
            } => {
                for ally in allies_in_radius(&mut state.store.enemies, caster, origin, radius) {
                    ally.health.heal((ally.health.max * percent / 100).max(1));
                }
            }
            EnemyAbility::Summon { minion, count, .. } => {
                summons.extend(std::iter::repeat((minion, origin)).take(count as usize));
            }
            EnemyAbility::Stun {
                duration, range, ..
            } => {
                let victim = state
                    .store
                    .heroes
                    .iter_mut()
                    .filter(|h| h.position.within(origin, range))
                    .min_by_key(|h| (h.position.distance_squared(origin), h.slot));
                if let Some(hero) = victim {
                    hero.disabled_ticks = hero.disabled_ticks.max(duration);
                }
            }
        }
    }

    spawn_summons(state, summons);
}

fn spawn_summons(state: &mut SimulationState, summons: Vec<(EnemyKind, Vec2Fixed)>) {
    let wave = state.wave.max(1);
    let modifier = state.waves.modifier;
    for (kind, position) in summons {
        if state.store.live_enemy_count() >= MAX_LIVE_ENEMIES {
            state.analytics.spawns_capped += 1;
            continue;
        }
        let id = state.store.allocate_id();
        let entry = spawn_entry(kind, EnemyTier::Common, wave, modifier);
        state.store.push_enemy(Enemy::spawn(id, &entry, position));
    }
}

/// Heal enemies carrying a regen modifier.
pub fn regenerate_enemies(state: &mut SimulationState) {
    if state.tick == 0 || state.tick % REGEN_INTERVAL != 0 {
        return;
    }
    for enemy in state
        .store
        .enemies
        .iter_mut()
        .filter(|e| e.is_alive() && e.regen_percent > 0)
    {
        enemy
            .health
            .heal((enemy.health.max * enemy.regen_percent / 100).max(1));
    }
}

/// Feed this tick's elemental hits into each enemy's combo tracker and
/// apply the combos they trigger.
pub fn resolve_combos(state: &mut SimulationState) {
    let tick = state.tick;
    let SimulationState {
        store, analytics, ..
    } = state;

    let mut bursts = Vec::new();
    for enemy in &mut store.enemies {
        let hits = std::mem::take(&mut enemy.pending_hits);
        if !enemy.is_alive() {
            continue;
        }
        for element in hits {
            let Some(combo) = enemy.combo.record(element, tick) else {
                continue;
            };
            analytics.combos += 1;
            tracing::debug!(enemy = enemy.id, ?combo, tick, "Combo");
            match combo {
                Combo::SteamBurst => bursts.push(enemy.position),
                Combo::Shatter => {
                    let amount = (enemy.health.max * SHATTER_PERCENT / 100).max(1);
                    analytics.damage_dealt += u64::from(damage_enemy(enemy, amount));
                }
                Combo::Overload => enemy.status.apply(StatusApplication::Stun {
                    duration: OVERLOAD_STUN_TICKS,
                }),
                Combo::ToxicBlaze => {
                    analytics.damage_dealt += u64::from(damage_enemy(enemy, TOXIC_BLAZE_DAMAGE));
                    enemy.status.apply(StatusApplication::ArmorBreak {
                        duration: TOXIC_BLAZE_ARMOR_BREAK_TICKS,
                    });
                }
            }
        }
    }

    for center in bursts {
        for enemy in store
            .enemies
            .iter_mut()
            .filter(|e| e.is_alive() && e.position.within(center, STEAM_BURST_RADIUS))
        {
            analytics.damage_dealt += u64::from(damage_enemy(enemy, STEAM_BURST_DAMAGE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Element, HeroClass};
    use crate::config::{HeroLoadout, SimConfig};
    use crate::waves::WaveModifier;

    fn state_with_heroes(heroes: Vec<HeroLoadout>) -> SimulationState {
        let config = SimConfig {
            heroes,
            turrets: Vec::new(),
            ..SimConfig::default()
        };
        SimulationState::new(17, &config)
    }

    fn add(state: &mut SimulationState, kind: EnemyKind, x: i32, y: i32) -> EntityId {
        let id = state.store.allocate_id();
        let entry = spawn_entry(kind, EnemyTier::Common, 1, WaveModifier::Calm);
        state
            .store
            .push_enemy(Enemy::spawn(id, &entry, Vec2Fixed::from_ints(x, y)));
        id
    }

    fn run_for(state: &mut SimulationState, ticks: u32) {
        for _ in 0..ticks {
            run_enemy_abilities(state);
        }
    }

    #[test]
    fn test_medic_heals_allies_not_itself() {
        let mut state = state_with_heroes(Vec::new());
        let medic = add(&mut state, EnemyKind::Medic, 20, 0);
        let ally = add(&mut state, EnemyKind::Brute, 21, 0);
        state.store.enemy_mut(medic).unwrap().health.current = 10;
        state.store.enemy_mut(ally).unwrap().health.current = 100;

        run_for(&mut state, 119);
        assert_eq!(state.store.enemy(ally).unwrap().health.current, 100);
        run_for(&mut state, 1);
        // 5% of 120
        assert_eq!(state.store.enemy(ally).unwrap().health.current, 106);
        assert_eq!(state.store.enemy(medic).unwrap().health.current, 10);
    }

    #[test]
    fn test_shield_bot_grants_shields() {
        let mut state = state_with_heroes(Vec::new());
        add(&mut state, EnemyKind::ShieldBot, 20, 0);
        let ally = add(&mut state, EnemyKind::Brute, 22, 0);
        let far = add(&mut state, EnemyKind::Brute, 30, 0);
        run_for(&mut state, 150);
        assert_eq!(state.store.enemy(ally).unwrap().shield, 12);
        assert_eq!(state.store.enemy(far).unwrap().shield, 0);
    }

    #[test]
    fn test_broodmother_summons_in_id_order() {
        let mut state = state_with_heroes(Vec::new());
        add(&mut state, EnemyKind::Broodmother, 20, 0);
        run_for(&mut state, 240);
        let kinds: Vec<_> = state.store.enemies.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EnemyKind::Broodmother, EnemyKind::Swarmling, EnemyKind::Swarmling]
        );
        assert!(state.store.enemies.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_stunned_caster_waits() {
        let mut state = state_with_heroes(Vec::new());
        let medic = add(&mut state, EnemyKind::Medic, 20, 0);
        let ally = add(&mut state, EnemyKind::Brute, 21, 0);
        state.store.enemy_mut(ally).unwrap().health.current = 100;
        state
            .store
            .enemy_mut(medic)
            .unwrap()
            .status
            .apply(StatusApplication::Stun { duration: 500 });
        run_for(&mut state, 200);
        assert_eq!(state.store.enemy(ally).unwrap().health.current, 100);
        assert_eq!(state.store.enemy(medic).unwrap().ability_cooldown, 0);
    }

    #[test]
    fn test_overmind_disables_nearest_hero() {
        let mut state = state_with_heroes(vec![
            HeroLoadout::basic(HeroClass::Vanguard),
            HeroLoadout::basic(HeroClass::Ranger),
        ]);
        add(&mut state, EnemyKind::Overmind, 12, 2);
        run_for(&mut state, 300);
        // slot 1 sits at (5, 2)
        assert_eq!(state.store.heroes[0].disabled_ticks, 0);
        assert!(state.store.heroes[1].disabled_ticks > 0);
    }

    #[test]
    fn test_regen_pulse() {
        let mut state = state_with_heroes(Vec::new());
        let id = add(&mut state, EnemyKind::Brute, 20, 0);
        let enemy = state.store.enemy_mut(id).unwrap();
        enemy.regen_percent = 2;
        enemy.health.current = 50;
        state.tick = REGEN_INTERVAL;
        regenerate_enemies(&mut state);
        assert_eq!(state.store.enemy(id).unwrap().health.current, 52);
        state.tick += 1;
        regenerate_enemies(&mut state);
        assert_eq!(state.store.enemy(id).unwrap().health.current, 52);
    }

    #[test]
    fn test_steam_burst_splashes_neighbors() {
        let mut state = state_with_heroes(Vec::new());
        let target = add(&mut state, EnemyKind::Brute, 20, 0);
        let neighbor = add(&mut state, EnemyKind::Brute, 21, 0);
        let far = add(&mut state, EnemyKind::Brute, 25, 0);

        state.tick = 10;
        state.store.enemy_mut(target).unwrap().pending_hits.push(Element::Fire);
        resolve_combos(&mut state);
        assert_eq!(state.analytics.combos, 0);

        state.tick = 20;
        state.store.enemy_mut(target).unwrap().pending_hits.push(Element::Ice);
        resolve_combos(&mut state);
        assert_eq!(state.analytics.combos, 1);
        assert_eq!(state.store.enemy(target).unwrap().health.current, 80);
        assert_eq!(state.store.enemy(neighbor).unwrap().health.current, 80);
        assert_eq!(state.store.enemy(far).unwrap().health.current, 120);
        assert!(state.store.enemy(target).unwrap().pending_hits.is_empty());
    }

    #[test]
    fn test_toxic_blaze_breaks_armor() {
        let mut state = state_with_heroes(Vec::new());
        let target = add(&mut state, EnemyKind::Brute, 20, 0);
        let enemy = state.store.enemy_mut(target).unwrap();
        enemy.pending_hits.extend([Element::Poison, Element::Fire]);
        resolve_combos(&mut state);
        let enemy = state.store.enemy(target).unwrap();
        assert_eq!(enemy.health.current, 95);
        assert!(enemy.status.armor_break > 0);
    }
}
