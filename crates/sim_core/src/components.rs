//! Entity data definitions.
//!
//! Components are plain data. Behaviour that mutates them lives in the
//! [`crate::combat`] subsystems and the [`crate::simulation`] tick phases.
//! Every field is an integer or fixed-point value so snapshots hash the
//! same on every platform.

use serde::{Deserialize, Serialize};

use crate::combat::combo::ComboTracker;
use crate::combat::status::{StatusApplication, StatusEffects};
use crate::config::{LANE_OFFSETS, SPAWN_X};
use crate::enemy_kind::{EnemyKind, Pillar};
use crate::math::{fixed_serde, fx, fx_ratio, mult_pct, Fixed, Multiplier, Vec2Fixed};
use crate::waves::SpawnEntry;

/// Unique identifier for entities.
///
/// Ids are allocated from a single monotonically increasing counter per
/// session and are never reused.
pub type EntityId = u32;

// ============================================================================
// Shared
// ============================================================================

/// Health component for damageable entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if entity is dead (health == 0).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    /// Uses saturating subtraction to prevent underflow.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current -= actual;
        actual
    }

    /// Heal the entity, returning actual amount healed.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let headroom = self.max.saturating_sub(self.current);
        let actual = amount.min(headroom);
        self.current += actual;
        actual
    }

    /// Get health as a percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.max == 0 {
            0
        } else {
            ((u64::from(self.current) * 100) / u64::from(self.max)) as u32
        }
    }
}

/// Elemental tag carried by every hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Element {
    /// No element; never participates in combos.
    #[default]
    Physical,
    /// Fire.
    Fire,
    /// Ice.
    Ice,
    /// Lightning.
    Lightning,
    /// Poison.
    Poison,
}

impl Element {
    /// Stable byte code used by the checkpoint codec.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

// ============================================================================
// Fortress
// ============================================================================

/// Fortress class chosen for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FortressClass {
    /// Extra hit points, weaker attack.
    Defender,
    /// Stronger attack, fewer hit points.
    Striker,
    /// Stronger auras.
    Support,
    /// Small bonus to everything.
    #[default]
    Balanced,
}

impl FortressClass {
    /// Max HP multiplier.
    #[must_use]
    pub const fn hp_multiplier(self) -> Multiplier {
        match self {
            Self::Defender => mult_pct(130),
            Self::Striker => mult_pct(90),
            Self::Support => mult_pct(100),
            Self::Balanced => mult_pct(110),
        }
    }

    /// Fortress attack damage multiplier.
    #[must_use]
    pub const fn damage_multiplier(self) -> Multiplier {
        match self {
            Self::Defender => mult_pct(90),
            Self::Striker => mult_pct(125),
            Self::Support => mult_pct(100),
            Self::Balanced => mult_pct(110),
        }
    }

    /// Aura strength multiplier.
    #[must_use]
    pub const fn aura_multiplier(self) -> Multiplier {
        match self {
            Self::Defender | Self::Striker => mult_pct(100),
            Self::Support => mult_pct(150),
            Self::Balanced => mult_pct(110),
        }
    }
}

/// Passive fortress auras; up to three may be equipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuraKind {
    /// Adds to the buff sum of every friendly attack.
    Might,
    /// Shortens turret cooldowns.
    Haste,
    /// Regenerates fortress hit points.
    Renewal,
    /// Slows enemies close to the fortress.
    FrostField,
}

/// Player-activated fortress skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FortressSkill {
    /// Damage every enemy within range.
    Barrage,
    /// Temporary shield on the fortress.
    Bulwark,
    /// Freeze enemies near the fortress.
    CryoPulse,
}

impl FortressSkill {
    /// All skills in cooldown-slot order.
    pub const ALL: [Self; 3] = [Self::Barrage, Self::Bulwark, Self::CryoPulse];

    /// Index into [`Fortress::skill_cooldowns`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// The player's fortress. One per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fortress {
    /// Hit points; the session is lost when they reach zero.
    pub health: Health,
    /// Chosen class.
    pub class: FortressClass,
    /// Commander level (1..=50).
    pub commander_level: u8,
    /// Equipped auras in loadout order.
    pub auras: Vec<AuraKind>,
    /// Ticks until the next auto-attack.
    pub attack_cooldown: u32,
    /// Remaining cooldown per [`FortressSkill`].
    pub skill_cooldowns: [u32; 3],
    /// Skills activated this tick, resolved in the damage phase.
    pub pending_skills: Vec<FortressSkill>,
    /// Remaining shield points from Bulwark.
    pub shield: u32,
    /// Ticks until the shield expires.
    pub shield_ticks: u32,
}

impl Fortress {
    /// Attack damage before the damage chain.
    #[must_use]
    pub fn base_damage(&self) -> u32 {
        crate::math::scale_u32(
            crate::math::scale_u32(20, self.class.damage_multiplier()),
            commander_multiplier(self.commander_level),
        )
    }

    /// Whether an aura is equipped.
    #[must_use]
    pub fn has_aura(&self, aura: AuraKind) -> bool {
        self.auras.contains(&aura)
    }
}

/// +2% per commander level above the first.
#[must_use]
pub const fn commander_multiplier(level: u8) -> Multiplier {
    let level = if level == 0 { 1 } else { level as i32 };
    mult_pct(100 + 2 * (level - 1))
}

// ============================================================================
// Heroes
// ============================================================================

/// Hero class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeroClass {
    /// Melee bruiser; skill rallies every attacker.
    Vanguard,
    /// Long-range piercing poison arrows.
    Ranger,
    /// Fire splash with burn.
    Pyromancer,
    /// Ice bolts that slow.
    Frostweaver,
    /// Lightning that chains.
    Stormcaller,
}

/// Static per-class combat numbers at the Basic tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeroStats {
    /// Damage per attack.
    pub damage: u32,
    /// Attack range.
    pub range: Fixed,
    /// Distance at which an idle hero acquires targets.
    pub aggro_range: Fixed,
    /// Movement per tick.
    pub speed: Fixed,
    /// Ticks between attacks.
    pub attack_interval: u32,
    /// Element of each hit.
    pub element: Element,
    /// Projectile travel per tick.
    pub projectile_speed: Fixed,
    /// Extra enemies a projectile passes through.
    pub pierce: u8,
    /// Splash radius (zero for single target).
    pub splash: Fixed,
    /// Extra chain jumps.
    pub chain: u8,
    /// Status applied on hit.
    pub status: Option<StatusApplication>,
}

impl HeroClass {
    /// Combat numbers for this class.
    #[must_use]
    pub const fn stats(self) -> HeroStats {
        match self {
            Self::Vanguard => HeroStats {
                damage: 18,
                range: fx_ratio(3, 2),
                aggro_range: fx(8),
                speed: fx_ratio(3, 20),
                attack_interval: 20,
                element: Element::Physical,
                projectile_speed: fx(2),
                pierce: 0,
                splash: Fixed::ZERO,
                chain: 0,
                status: None,
            },
            Self::Ranger => HeroStats {
                damage: 14,
                range: fx(9),
                aggro_range: fx(10),
                speed: fx_ratio(3, 25),
                attack_interval: 24,
                element: Element::Poison,
                projectile_speed: fx_ratio(6, 5),
                pierce: 1,
                splash: Fixed::ZERO,
                chain: 0,
                status: Some(StatusApplication::Poison {
                    per_stack: 1,
                    duration: 90,
                }),
            },
            Self::Pyromancer => HeroStats {
                damage: 12,
                range: fx(7),
                aggro_range: fx(9),
                speed: fx_ratio(1, 10),
                attack_interval: 30,
                element: Element::Fire,
                projectile_speed: fx_ratio(9, 10),
                pierce: 0,
                splash: fx_ratio(3, 2),
                chain: 0,
                status: Some(StatusApplication::Burn {
                    per_tick: 2,
                    duration: 90,
                }),
            },
            Self::Frostweaver => HeroStats {
                damage: 9,
                range: fx(8),
                aggro_range: fx(9),
                speed: fx_ratio(1, 10),
                attack_interval: 26,
                element: Element::Ice,
                projectile_speed: fx(1),
                pierce: 0,
                splash: Fixed::ZERO,
                chain: 0,
                status: Some(StatusApplication::Slow {
                    factor: mult_pct(70),
                    duration: 60,
                }),
            },
            Self::Stormcaller => HeroStats {
                damage: 16,
                range: fx(8),
                aggro_range: fx(9),
                speed: fx_ratio(1, 10),
                attack_interval: 32,
                element: Element::Lightning,
                projectile_speed: fx(2),
                pierce: 0,
                splash: Fixed::ZERO,
                chain: 1,
                status: None,
            },
        }
    }
}

/// Hero rarity tier (0–2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HeroTier {
    /// Tier 0.
    #[default]
    Basic,
    /// Tier 1.
    Epic,
    /// Tier 2.
    Legendary,
}

impl HeroTier {
    /// Damage multiplier for the tier.
    #[must_use]
    pub const fn multiplier(self) -> Multiplier {
        match self {
            Self::Basic => mult_pct(100),
            Self::Epic => mult_pct(150),
            Self::Legendary => mult_pct(225),
        }
    }
}

/// Hero passive ability, feeding the `heroPassive` term of the damage chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HeroPassive {
    /// No passive.
    #[default]
    None,
    /// Flat +10% damage.
    Veteran,
    /// +50% damage against enemies below 30% health.
    Executioner,
    /// Status effects from this hero last 25% longer.
    Elementalist,
    /// +15% damage against elites and bosses.
    Sharpshooter,
}

/// Equipped hero artifact, feeding the `artifactBonus` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Artifact {
    /// +20% damage.
    Warblade,
    /// +15% damage for fire heroes, +5% otherwise.
    EmberSigil,
    /// +15% damage for ice heroes, +5% otherwise.
    FrostSigil,
    /// +15% damage for lightning heroes, +5% otherwise.
    StormSigil,
}

impl Artifact {
    /// Damage bonus for a hero attacking with `element`.
    #[must_use]
    pub const fn bonus(self, element: Element) -> Multiplier {
        match (self, element) {
            (Self::Warblade, _) => mult_pct(120),
            (Self::EmberSigil, Element::Fire)
            | (Self::FrostSigil, Element::Ice)
            | (Self::StormSigil, Element::Lightning) => mult_pct(115),
            _ => mult_pct(105),
        }
    }
}

/// Hero behaviour state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HeroState {
    /// Holding position, scanning for targets.
    #[default]
    Idle,
    /// Engaging a target.
    Combat,
    /// Moving to a player-commanded point; ignores enemies until arrival.
    Commanded,
}

/// A hero. Heroes are never removed mid-session so slot indices stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    /// Loadout slot, also the hero's id.
    pub slot: u8,
    /// Class.
    pub class: HeroClass,
    /// Tier.
    pub tier: HeroTier,
    /// Passive.
    pub passive: HeroPassive,
    /// Equipped artifact.
    pub artifact: Option<Artifact>,
    /// Behaviour state.
    pub state: HeroState,
    /// Current position.
    pub position: Vec2Fixed,
    /// Point the hero returns to when idle.
    pub home: Vec2Fixed,
    /// Commanded destination.
    pub command_target: Option<Vec2Fixed>,
    /// Current target, revalidated every tick.
    pub target: Option<EntityId>,
    /// Target was chosen by the player rather than acquired.
    pub forced_target: bool,
    /// Ticks until the next attack.
    pub attack_cooldown: u32,
    /// Ticks until the skill is ready.
    pub skill_cooldown: u32,
    /// Skill activated this tick, resolved during the AI phase.
    pub skill_pending: bool,
    /// Ticks the hero remains disabled (stunned by a boss).
    pub disabled_ticks: u32,
}

impl Hero {
    /// Whether the hero can act this tick.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled_ticks > 0
    }
}

// ============================================================================
// Turrets
// ============================================================================

/// Turret type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurretKind {
    /// High damage, piercing slug.
    Railgun,
    /// Slow explosive shell with splash and burn.
    Artillery,
    /// Lightning that chains between enemies.
    Arc,
    /// Ice shot that slows.
    Cryo,
}

/// Static per-kind turret numbers at level 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurretStats {
    /// Damage per shot.
    pub damage: u32,
    /// Targeting range.
    pub range: Fixed,
    /// Ticks between shots.
    pub fire_interval: u32,
    /// Element of each hit.
    pub element: Element,
    /// Projectile travel per tick.
    pub projectile_speed: Fixed,
    /// Extra enemies a shot passes through.
    pub pierce: u8,
    /// Splash radius.
    pub splash: Fixed,
    /// Chain jumps.
    pub chain: u8,
    /// Status applied on hit.
    pub status: Option<StatusApplication>,
    /// Gold cost to place.
    pub cost: u32,
}

impl TurretKind {
    /// Level-1 numbers for this kind.
    #[must_use]
    pub const fn stats(self) -> TurretStats {
        match self {
            Self::Railgun => TurretStats {
                damage: 40,
                range: fx(14),
                fire_interval: 45,
                element: Element::Physical,
                projectile_speed: fx(3),
                pierce: 2,
                splash: Fixed::ZERO,
                chain: 0,
                status: None,
                cost: 100,
            },
            Self::Artillery => TurretStats {
                damage: 30,
                range: fx(11),
                fire_interval: 60,
                element: Element::Fire,
                projectile_speed: fx_ratio(4, 5),
                pierce: 0,
                splash: fx(2),
                chain: 0,
                status: Some(StatusApplication::Burn {
                    per_tick: 1,
                    duration: 60,
                }),
                cost: 120,
            },
            Self::Arc => TurretStats {
                damage: 14,
                range: fx(8),
                fire_interval: 25,
                element: Element::Lightning,
                projectile_speed: fx_ratio(5, 2),
                pierce: 0,
                splash: Fixed::ZERO,
                chain: 2,
                status: None,
                cost: 110,
            },
            Self::Cryo => TurretStats {
                damage: 6,
                range: fx(9),
                fire_interval: 30,
                element: Element::Ice,
                projectile_speed: fx_ratio(3, 2),
                pierce: 0,
                splash: Fixed::ZERO,
                chain: 0,
                status: Some(StatusApplication::Slow {
                    factor: mult_pct(60),
                    duration: 45,
                }),
                cost: 90,
            },
        }
    }

    /// Stable byte code used by the checkpoint codec.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Turret target selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetingMode {
    /// Enemy with the most path progress.
    #[default]
    ClosestToFortress,
    /// Lowest current health.
    Weakest,
    /// Highest current health.
    Strongest,
    /// Smallest distance to the turret.
    NearestToTurret,
    /// Highest effective speed.
    Fastest,
}

/// Overcharge state machine: Inactive → Active → CoolingDown → Inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OverchargeState {
    /// Available.
    #[default]
    Inactive,
    /// Doubled fire rate.
    Active {
        /// Ticks left.
        remaining: u32,
    },
    /// Recharging.
    CoolingDown {
        /// Ticks left.
        remaining: u32,
    },
}

/// A placed turret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turret {
    /// Unique id.
    pub id: EntityId,
    /// Kind.
    pub kind: TurretKind,
    /// Slot index in the turret slot table.
    pub slot: u8,
    /// Upgrade level (1..=5).
    pub level: u8,
    /// Targeting rule.
    pub mode: TargetingMode,
    /// Overcharge state.
    pub overcharge: OverchargeState,
    /// Ticks until the next shot.
    pub cooldown: u32,
    /// World position (fixed by slot).
    pub position: Vec2Fixed,
}

/// Highest turret upgrade level.
pub const MAX_TURRET_LEVEL: u8 = 5;

// ============================================================================
// Enemies
// ============================================================================

/// Enemy tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EnemyTier {
    /// Regular enemy.
    #[default]
    Common,
    /// Stronger variant rolled by the wave generator.
    Elite,
    /// Boss.
    Boss,
}

impl EnemyTier {
    /// Stable byte code used by the checkpoint codec.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// What is holding an enemy in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Blocker {
    /// A wall.
    Wall(EntityId),
    /// A militia unit.
    Militia(EntityId),
}

/// An enemy walking toward the fortress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    /// Unique, monotonically increasing id.
    pub id: EntityId,
    /// Catalog entry.
    pub kind: EnemyKind,
    /// Tier.
    pub tier: EnemyTier,
    /// Pillar the enemy was spawned under.
    pub pillar: Pillar,
    /// Hit points.
    pub health: Health,
    /// Shield points absorbed before health.
    pub shield: u32,
    /// Base movement per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Contact damage against walls, militia and the fortress.
    pub damage: u32,
    /// Collision radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Position on the field.
    pub position: Vec2Fixed,
    /// Distance travelled from the spawn line.
    #[serde(with = "fixed_serde")]
    pub progress: Fixed,
    /// Active status effects.
    pub status: StatusEffects,
    /// Ticks until the special ability fires.
    pub ability_cooldown: u32,
    /// Ticks until the next contact attack.
    pub attack_cooldown: u32,
    /// Gold awarded on kill.
    pub reward: u32,
    /// Percent of max health regenerated per regen pulse.
    pub regen_percent: u32,
    /// Elemental hit history for combo detection.
    pub combo: ComboTracker,
    /// Elemental hits landed this tick, consumed in the damage phase.
    pub pending_hits: Vec<Element>,
    /// Current blocker, if any.
    pub blocked_by: Option<Blocker>,
    /// Reached the fortress; removed without reward.
    pub leaked: bool,
}

impl Enemy {
    /// Build an enemy from a resolved spawn entry.
    #[must_use]
    pub fn spawn(id: EntityId, entry: &SpawnEntry, position: Vec2Fixed) -> Self {
        Self {
            id,
            kind: entry.kind,
            tier: entry.tier,
            pillar: entry.pillar,
            health: Health::new(entry.hp),
            shield: entry.shield,
            speed: entry.speed,
            damage: entry.damage,
            radius: entry.radius,
            position,
            progress: Fixed::ZERO,
            status: StatusEffects::default(),
            ability_cooldown: entry.ability_cooldown,
            attack_cooldown: 0,
            reward: entry.reward,
            regen_percent: entry.regen_percent,
            combo: ComboTracker::default(),
            pending_hits: Vec::new(),
            blocked_by: None,
            leaked: false,
        }
    }

    /// Lane spawn point for a new enemy id.
    #[must_use]
    pub fn lane_spawn_point(id: EntityId) -> Vec2Fixed {
        Vec2Fixed::new(SPAWN_X, fx(LANE_OFFSETS[(id % 5) as usize]))
    }

    /// Whether the enemy is still in play.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.health.is_dead() && !self.leaked
    }

    /// Movement per tick after status effects.
    #[must_use]
    pub fn effective_speed(&self) -> Fixed {
        if self.status.is_immobilized() {
            return Fixed::ZERO;
        }
        self.status.apply_slow(self.speed)
    }

    /// Whether the enemy is an elite or boss.
    #[must_use]
    pub const fn is_elite_or_boss(&self) -> bool {
        matches!(self.tier, EnemyTier::Elite | EnemyTier::Boss)
    }
}

// ============================================================================
// Projectiles, walls, militia
// ============================================================================

/// Who fired a projectile. Owners are referenced by id, never by pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileOwner {
    /// Hero in a loadout slot.
    Hero(u8),
    /// Turret by id.
    Turret(EntityId),
    /// The fortress.
    Fortress,
    /// Militia unit by id.
    Militia(EntityId),
}

/// Visual trail; carried in state so renderers can interpolate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TrailKind {
    /// No trail.
    #[default]
    None,
    /// Kinetic tracer.
    Tracer,
    /// Smoke plume.
    Smoke,
    /// Frost mist.
    Frost,
    /// Electric arc.
    Spark,
}

impl TrailKind {
    /// Default trail for an element.
    #[must_use]
    pub const fn for_element(element: Element) -> Self {
        match element {
            Element::Physical => Self::Tracer,
            Element::Fire => Self::Smoke,
            Element::Ice => Self::Frost,
            Element::Lightning => Self::Spark,
            Element::Poison => Self::None,
        }
    }
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique id.
    pub id: EntityId,
    /// Who fired it.
    pub owner: ProjectileOwner,
    /// Current position.
    pub position: Vec2Fixed,
    /// Movement per tick.
    pub velocity: Vec2Fixed,
    /// Damage dealt on each hit, already resolved through the damage chain.
    pub damage: u32,
    /// Element of each hit.
    pub element: Element,
    /// Remaining extra enemies it may pass through.
    pub pierce: u8,
    /// Splash radius around each hit.
    #[serde(with = "fixed_serde")]
    pub splash: Fixed,
    /// Remaining chain jumps.
    pub chain: u8,
    /// Status applied on hit.
    pub status: Option<StatusApplication>,
    /// Collision radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Ticks before it expires.
    pub ttl: u32,
    /// Trail.
    pub trail: TrailKind,
    /// Enemies already hit, in hit order.
    pub hits: Vec<EntityId>,
    /// Cleared on impact or expiry; removed in cleanup.
    pub alive: bool,
}

/// A wall across the lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    /// Unique id.
    pub id: EntityId,
    /// Lane coordinate of the wall face.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Hit points.
    pub health: Health,
}

/// A temporary militia blocker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Militia {
    /// Unique id.
    pub id: EntityId,
    /// Position.
    pub position: Vec2Fixed,
    /// Hit points.
    pub health: Health,
    /// Ticks until the next attack.
    pub attack_cooldown: u32,
    /// Ticks until the unit disbands.
    pub lifetime: u32,
    /// Current target, revalidated every tick.
    pub target: Option<EntityId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage_and_heal() {
        let mut health = Health::new(100);
        assert_eq!(health.apply_damage(30), 30);
        assert_eq!(health.current, 70);
        assert_eq!(health.apply_damage(500), 70);
        assert!(health.is_dead());
        assert_eq!(health.heal(250), 100);
        assert_eq!(health.percentage(), 100);
    }

    #[test]
    fn test_commander_multiplier() {
        assert_eq!(commander_multiplier(1), mult_pct(100));
        assert_eq!(commander_multiplier(11), mult_pct(120));
        assert_eq!(commander_multiplier(0), mult_pct(100));
    }

    #[test]
    fn test_artifact_bonus_matches_element() {
        assert_eq!(Artifact::EmberSigil.bonus(Element::Fire), mult_pct(115));
        assert_eq!(Artifact::EmberSigil.bonus(Element::Ice), mult_pct(105));
        assert_eq!(Artifact::Warblade.bonus(Element::Physical), mult_pct(120));
    }

    #[test]
    fn test_fortress_base_damage_scales_with_class() {
        let mut fortress = Fortress {
            health: Health::new(1000),
            class: FortressClass::Striker,
            commander_level: 1,
            auras: Vec::new(),
            attack_cooldown: 0,
            skill_cooldowns: [0; 3],
            pending_skills: Vec::new(),
            shield: 0,
            shield_ticks: 0,
        };
        assert_eq!(fortress.base_damage(), 25);
        // 90% is 14745/16384, so 20 floors to 17
        fortress.class = FortressClass::Defender;
        assert_eq!(fortress.base_damage(), 17);
    }
}
