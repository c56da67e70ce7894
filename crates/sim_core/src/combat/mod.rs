//! Combat resolution.
//!
//! Every attack goes through the same damage chain:
//!
//! ```text
//! base × stone × artifact × heroPassive × (1 + Σ buff) × global
//! ```
//!
//! evaluated left to right in scale-16384 fixed point, floored once at the
//! end. The chain result is what a projectile carries; on impact armor
//! break scales it again and shields absorb before health.
//!
//! Crit, dodge and block never enter the chain; see
//! [`crate::config::StatCap`].

pub mod abilities;
pub mod combo;
pub mod fortress;
pub mod hero;
pub mod militia;
pub mod projectile;
pub mod status;
pub mod synergy;
pub mod targeting;
pub mod turret;

use crate::components::{Element, Enemy, Projectile, ProjectileOwner, TrailKind};
use crate::config::{PROJECTILE_RADIUS, PROJECTILE_TTL};
use crate::math::{mult_pct, scale_u32, Fixed, Multiplier, Vec2Fixed, MULT_FRAC_BITS, MULT_ONE};
use crate::state::{Analytics, EntityStore};

use status::StatusApplication;

/// Terms of the damage chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageChain {
    /// Crystal bonus.
    pub stone: Multiplier,
    /// Artifact bonus.
    pub artifact: Multiplier,
    /// Hero passive bonus.
    pub hero_passive: Multiplier,
    /// Sum of buffs, in percent.
    pub buff_pct: u32,
    /// Relic bonus.
    pub global: Multiplier,
}

impl DamageChain {
    /// Chain with every term neutral.
    pub const NEUTRAL: Self = Self {
        stone: MULT_ONE,
        artifact: MULT_ONE,
        hero_passive: MULT_ONE,
        buff_pct: 0,
        global: MULT_ONE,
    };

    /// Resolve `base` through the chain.
    #[must_use]
    pub fn resolve(&self, base: u32) -> u32 {
        let buff = MULT_ONE + mult_pct(self.buff_pct as i32);
        let mut acc = i64::from(base) << MULT_FRAC_BITS;
        for term in [self.stone, self.artifact, self.hero_passive, buff, self.global] {
            acc = (acc * i64::from(term.to_bits())) >> MULT_FRAC_BITS;
        }
        (acc >> MULT_FRAC_BITS).clamp(0, i64::from(u32::MAX)) as u32
    }
}

/// What lands on an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Damage before armor break and shields.
    pub damage: u32,
    /// Element, recorded for combos unless physical.
    pub element: Element,
    /// Status applied on impact.
    pub status: Option<StatusApplication>,
}

/// Land a hit on an enemy and return the damage it absorbed in total.
pub fn apply_hit(enemy: &mut Enemy, hit: &Hit, analytics: &mut Analytics) -> u32 {
    if !enemy.is_alive() {
        return 0;
    }
    let dealt = damage_enemy(enemy, scale_u32(hit.damage, enemy.status.damage_taken_multiplier()));
    if let Some(status) = hit.status {
        enemy.status.apply(status);
    }
    if hit.element != Element::Physical {
        enemy.pending_hits.push(hit.element);
    }
    analytics.damage_dealt += u64::from(dealt);
    dealt
}

/// Apply raw damage: shield first, then health.
pub fn damage_enemy(enemy: &mut Enemy, amount: u32) -> u32 {
    let absorbed = enemy.shield.min(amount);
    enemy.shield -= absorbed;
    absorbed + enemy.health.apply_damage(amount - absorbed)
}

/// Parameters for a new projectile.
#[derive(Debug, Clone, Copy)]
pub struct ProjectileSpec {
    /// Who fires.
    pub owner: ProjectileOwner,
    /// Launch point.
    pub origin: Vec2Fixed,
    /// Aim point.
    pub aim: Vec2Fixed,
    /// Travel per tick.
    pub speed: Fixed,
    /// Payload.
    pub hit: Hit,
    /// Extra enemies it may pass through.
    pub pierce: u8,
    /// Splash radius.
    pub splash: Fixed,
    /// Chain jumps.
    pub chain: u8,
}

/// Spawn a projectile aimed at a point.
pub fn spawn_projectile(store: &mut EntityStore, analytics: &mut Analytics, spec: ProjectileSpec) {
    let id = store.allocate_id();
    let velocity = (spec.aim - spec.origin).normalize().scale(spec.speed);
    store.projectiles.push(Projectile {
        id,
        owner: spec.owner,
        position: spec.origin,
        velocity,
        damage: spec.hit.damage,
        element: spec.hit.element,
        pierce: spec.pierce,
        splash: spec.splash,
        chain: spec.chain,
        status: spec.hit.status,
        radius: PROJECTILE_RADIUS,
        ttl: PROJECTILE_TTL,
        trail: TrailKind::for_element(spec.hit.element),
        hits: Vec::new(),
        alive: true,
    });
    analytics.projectiles_fired += 1;
}

/// Scale a cooldown by a factor, never below one tick.
#[must_use]
pub fn scaled_cooldown(ticks: u32, factor: Multiplier) -> u32 {
    scale_u32(ticks, factor).max(1)
}
