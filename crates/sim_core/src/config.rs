//! Engine constants and per-session starting configuration.
//!
//! Constants are part of the determinism contract and identical on client
//! and server. [`SimConfig`] is what a session starts from and travels with
//! replays; it can be written by hand in RON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::{
    Artifact, AuraKind, FortressClass, HeroClass, HeroPassive, HeroTier, TurretKind,
};
use crate::error::{Result, SimError};
use crate::math::{fx, fx_ratio, mult_pct, Fixed, Multiplier, Vec2Fixed, MULT_ONE};

/// Engine build identifier. Hashes from different versions are not comparable.
pub const SIM_VERSION: &str = concat!("sim-core/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Timing
// ============================================================================

/// Ticks per second.
pub const TICK_HZ: u32 = 30;
/// Minimum ticks between wave starts.
pub const WAVE_INTERVAL_TICKS: u64 = 90;
/// Hero and fortress skill cooldown.
pub const SKILL_COOLDOWN_TICKS: u32 = 300;
/// Ticks between fortress auto-attacks.
pub const FORTRESS_ATTACK_INTERVAL: u32 = 30;
/// Waves per verification segment.
pub const SEGMENT_SIZE_WAVES: u32 = 5;
/// Hard cap on the length of one segment.
pub const MAX_TICKS_PER_SEGMENT: u64 = 9000;
/// Checkpoint grid spacing.
pub const CHECKPOINT_INTERVAL_TICKS: u64 = 30;
/// Combo window, inclusive.
pub const COMBO_WINDOW_TICKS: u64 = 30;
/// Ticks between spawn batches.
pub const SPAWN_BATCH_INTERVAL: u64 = 2;
/// A wave's spawn list drains in this many batches.
pub const SPAWN_BATCHES_PER_WAVE: u32 = 40;

// ============================================================================
// Limits
// ============================================================================

/// Live enemies allowed on the field at once.
pub const MAX_LIVE_ENEMIES: usize = 400;
/// Heroes per loadout.
pub const MAX_HEROES: usize = 4;
/// Fortress auras per loadout.
pub const MAX_AURAS: usize = 3;
/// Walls standing at once.
pub const MAX_WALLS: usize = 4;
/// Militia alive at once.
pub const MAX_MILITIA: usize = 12;
/// Highest commander level.
pub const MAX_COMMANDER_LEVEL: u8 = 50;

// ============================================================================
// Field geometry
// ============================================================================

/// Fortress position.
pub const FORTRESS_POSITION: Vec2Fixed = Vec2Fixed::ZERO;
/// Enemies enter the field here.
pub const SPAWN_X: Fixed = fx(40);
/// Enemies at or past this line leak into the fortress.
pub const LEAK_X: Fixed = fx_ratio(3, 2);
/// Lane offsets, chosen by enemy id modulo 5.
pub const LANE_OFFSETS: [i32; 5] = [-4, -2, 0, 2, 4];
/// Projectiles leaving this box are discarded.
pub const FIELD_MIN_X: Fixed = fx(-4);
/// See [`FIELD_MIN_X`].
pub const FIELD_MAX_X: Fixed = fx(46);
/// Half-height of the field.
pub const FIELD_HALF_HEIGHT: Fixed = fx(12);
/// Turret slot positions.
pub const TURRET_SLOTS: [Vec2Fixed; 6] = [
    Vec2Fixed::from_ints(3, -5),
    Vec2Fixed::from_ints(3, 5),
    Vec2Fixed::from_ints(6, -3),
    Vec2Fixed::from_ints(6, 3),
    Vec2Fixed::from_ints(9, -5),
    Vec2Fixed::from_ints(9, 5),
];
/// Hero home positions by loadout slot.
pub const HERO_HOMES: [Vec2Fixed; MAX_HEROES] = [
    Vec2Fixed::from_ints(5, -2),
    Vec2Fixed::from_ints(5, 2),
    Vec2Fixed::from_ints(7, 0),
    Vec2Fixed::from_ints(4, 0),
];

// ============================================================================
// Fortress
// ============================================================================

/// Fortress max health before class and commander multipliers.
pub const FORTRESS_BASE_HP: u32 = 1000;
/// Fortress auto-attack range.
pub const FORTRESS_RANGE: Fixed = fx(12);
/// Barrage reach.
pub const BARRAGE_RANGE: Fixed = fx(14);
/// Barrage damage as a multiple of fortress base damage.
pub const BARRAGE_DAMAGE_FACTOR: u32 = 2;
/// Bulwark shield as percent of max health.
pub const BULWARK_SHIELD_PERCENT: u32 = 25;
/// Bulwark duration.
pub const BULWARK_TICKS: u32 = 150;
/// Cryo Pulse reach.
pub const CRYO_PULSE_RANGE: Fixed = fx(10);
/// Cryo Pulse freeze duration.
pub const CRYO_PULSE_FREEZE_TICKS: u32 = 60;
/// Might aura buff.
pub const MIGHT_BUFF: Multiplier = mult_pct(10);
/// Haste aura cooldown factor.
pub const HASTE_COOLDOWN: Multiplier = mult_pct(85);
/// Ticks between Renewal regen pulses.
pub const RENEWAL_INTERVAL: u64 = 30;
/// Frost Field slow factor.
pub const FROST_FIELD_FACTOR: Multiplier = mult_pct(80);
/// Frost Field reach.
pub const FROST_FIELD_RANGE: Fixed = fx(8);

// ============================================================================
// Turrets, walls, militia
// ============================================================================

/// Damage bonus per turret level above 1.
pub const TURRET_LEVEL_BONUS_PCT: u32 = 20;
/// Overcharge active duration.
pub const OVERCHARGE_ACTIVE_TICKS: u32 = 150;
/// Overcharge cooldown.
pub const OVERCHARGE_COOLDOWN_TICKS: u32 = 600;
/// Share of placement and upgrade spend returned on removal.
pub const TURRET_REFUND_PCT: u32 = 50;
/// Wall price.
pub const WALL_COST: u32 = 50;
/// Wall health before relics.
pub const WALL_HP: u32 = 300;
/// Closest wall placement to the fortress.
pub const WALL_MIN_X: Fixed = fx(4);
/// Farthest wall placement.
pub const WALL_MAX_X: Fixed = fx(30);
/// Militia price per unit.
pub const MILITIA_COST: u32 = 30;
/// Militia health.
pub const MILITIA_HP: u32 = 60;
/// Militia melee damage.
pub const MILITIA_DAMAGE: u32 = 8;
/// Ticks between militia attacks.
pub const MILITIA_ATTACK_INTERVAL: u32 = 20;
/// Militia melee reach.
pub const MILITIA_RANGE: Fixed = fx_ratio(6, 5);
/// Militia movement per tick.
pub const MILITIA_SPEED: Fixed = fx_ratio(3, 25);
/// Militia lifetime.
pub const MILITIA_LIFETIME: u32 = 600;
/// Militia rally line.
pub const MILITIA_RALLY_X: Fixed = fx(8);
/// Ticks between enemy contact attacks on blockers.
pub const ENEMY_ATTACK_INTERVAL: u32 = 30;
/// Projectile sub-steps per tick for hit detection.
pub const PROJECTILE_SUBSTEPS: i32 = 4;
/// Projectile lifetime.
pub const PROJECTILE_TTL: u32 = 90;
/// Projectile collision radius.
pub const PROJECTILE_RADIUS: Fixed = fx_ratio(1, 4);
/// Chain jump reach.
pub const CHAIN_RANGE: Fixed = fx(4);

// ============================================================================
// Stat caps
// ============================================================================

/// Caps for secondary combat stats.
///
/// Crit, dodge and block are not part of the damage chain; these caps are
/// defined but nothing reads them, and clients match that behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatCap {
    /// Critical hit chance.
    Crit,
    /// Dodge chance.
    Dodge,
    /// Block chance.
    Block,
}

impl StatCap {
    /// Cap value.
    #[must_use]
    pub const fn cap(self) -> Multiplier {
        match self {
            Self::Crit => mult_pct(75),
            Self::Dodge => mult_pct(50),
            Self::Block => mult_pct(60),
        }
    }
}

// ============================================================================
// Loadout
// ============================================================================

/// Infinity-style crystals feeding the stone bonus and other modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Crystal {
    /// +25% damage.
    Power,
    /// Cooldowns ×0.85.
    Time,
    /// +10% range.
    Space,
    /// +20% status duration.
    Reality,
    /// +10% kill gold.
    Soul,
    /// Carried for parity; its crit bonus is part of the stat-cap gap.
    Mind,
}

/// Run relics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relic {
    /// +10% global damage.
    SharpenedRounds,
    /// +25% global damage, fortress max health ×0.8.
    GlassCannon,
    /// +25% kill gold.
    Bounty,
    /// Wall health ×1.5.
    IronWalls,
    /// Slows 25% stronger.
    ColdCore,
    /// Overcharge lasts 50% longer.
    Overclock,
}

impl Relic {
    /// Every relic in pick order.
    pub const ALL: [Self; 6] = [
        Self::SharpenedRounds,
        Self::GlassCannon,
        Self::Bounty,
        Self::IronWalls,
        Self::ColdCore,
        Self::Overclock,
    ];

    /// Stable byte code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Contribution to the `globalBonus` term.
    #[must_use]
    pub const fn global_damage(self) -> Multiplier {
        match self {
            Self::SharpenedRounds => mult_pct(110),
            Self::GlassCannon => mult_pct(125),
            _ => MULT_ONE,
        }
    }
}

/// A hero in the starting loadout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroLoadout {
    /// Class.
    pub class: HeroClass,
    /// Tier.
    #[serde(default)]
    pub tier: HeroTier,
    /// Passive.
    #[serde(default)]
    pub passive: HeroPassive,
    /// Artifact.
    #[serde(default)]
    pub artifact: Option<Artifact>,
}

impl HeroLoadout {
    /// Basic-tier hero without passive or artifact.
    #[must_use]
    pub const fn basic(class: HeroClass) -> Self {
        Self {
            class,
            tier: HeroTier::Basic,
            passive: HeroPassive::None,
            artifact: None,
        }
    }
}

/// A turret placed before the first tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurretLoadout {
    /// Slot index into [`TURRET_SLOTS`].
    pub slot: u8,
    /// Kind.
    pub kind: TurretKind,
}

/// Starting configuration for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fortress class.
    pub fortress_class: FortressClass,
    /// Commander level (1..=50).
    pub commander_level: u8,
    /// Equipped auras.
    pub auras: Vec<AuraKind>,
    /// Heroes in slot order.
    pub heroes: Vec<HeroLoadout>,
    /// Turrets placed for free at session start.
    pub turrets: Vec<TurretLoadout>,
    /// Equipped crystals.
    pub crystals: Vec<Crystal>,
    /// Relics owned at session start.
    pub relics: Vec<Relic>,
    /// Gold at session start.
    pub starting_gold: u32,
    /// Clearing this wave wins the session.
    pub final_wave: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fortress_class: FortressClass::Balanced,
            commander_level: 1,
            auras: vec![AuraKind::Might],
            heroes: vec![
                HeroLoadout::basic(HeroClass::Vanguard),
                HeroLoadout::basic(HeroClass::Pyromancer),
            ],
            turrets: vec![
                TurretLoadout {
                    slot: 0,
                    kind: TurretKind::Railgun,
                },
                TurretLoadout {
                    slot: 1,
                    kind: TurretKind::Cryo,
                },
            ],
            crystals: Vec::new(),
            relics: Vec::new(),
            starting_gold: 200,
            final_wave: 50,
        }
    }
}

impl SimConfig {
    /// Load a configuration from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse and validate a configuration from a RON string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject loadouts the engine cannot start from.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.commander_level == 0 || self.commander_level > MAX_COMMANDER_LEVEL {
            return Err(invalid(format!(
                "commander level {} outside 1..={MAX_COMMANDER_LEVEL}",
                self.commander_level
            )));
        }
        if self.auras.len() > MAX_AURAS {
            return Err(invalid(format!("{} auras, at most {MAX_AURAS}", self.auras.len())));
        }
        if has_duplicates(&self.auras) {
            return Err(invalid("duplicate aura".to_string()));
        }
        if self.heroes.len() > MAX_HEROES {
            return Err(invalid(format!(
                "{} heroes, at most {MAX_HEROES}",
                self.heroes.len()
            )));
        }
        for turret in &self.turrets {
            if usize::from(turret.slot) >= TURRET_SLOTS.len() {
                return Err(invalid(format!("turret slot {} does not exist", turret.slot)));
            }
        }
        let slots: Vec<u8> = self.turrets.iter().map(|t| t.slot).collect();
        if has_duplicates(&slots) {
            return Err(invalid("two turrets share a slot".to_string()));
        }
        if has_duplicates(&self.crystals) {
            return Err(invalid("duplicate crystal".to_string()));
        }
        if has_duplicates(&self.relics) {
            return Err(invalid("duplicate relic".to_string()));
        }
        if self.final_wave == 0 {
            return Err(invalid("final wave must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Whether a crystal is equipped.
    #[must_use]
    pub fn has_crystal(&self, crystal: Crystal) -> bool {
        self.crystals.contains(&crystal)
    }
}

fn invalid(message: String) -> SimError {
    SimError::InvalidConfig(message)
}

fn has_duplicates<T: PartialEq>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, item)| items[i + 1..].contains(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_loadouts() {
        let mut config = SimConfig {
            commander_level: 0,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        config.commander_level = 1;
        config.turrets.push(TurretLoadout {
            slot: 0,
            kind: TurretKind::Arc,
        });
        assert!(config.validate().is_err());

        config.turrets.truncate(1);
        config.auras = vec![
            AuraKind::Might,
            AuraKind::Haste,
            AuraKind::Renewal,
            AuraKind::FrostField,
        ];
        assert!(config.validate().is_err());

        config.auras.truncate(2);
        config.heroes = vec![HeroLoadout::basic(HeroClass::Ranger); 5];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ron_round_trip_with_defaults() {
        let ron = r"(
            fortress_class: Striker,
            commander_level: 12,
            heroes: [(class: Stormcaller, tier: Epic)],
            relics: [Bounty],
        )";
        let config = SimConfig::from_ron_str(ron).unwrap();
        assert_eq!(config.fortress_class, FortressClass::Striker);
        assert_eq!(config.heroes[0].tier, HeroTier::Epic);
        assert_eq!(config.heroes[0].passive, HeroPassive::None);
        assert_eq!(config.final_wave, 50);
        assert_eq!(config.relics, vec![Relic::Bounty]);
    }

    #[test]
    fn test_ron_parse_error_is_reported() {
        assert!(matches!(
            SimConfig::from_ron_str("(commander_level: )"),
            Err(SimError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_stat_caps_are_bounded() {
        for cap in [StatCap::Crit, StatCap::Dodge, StatCap::Block] {
            assert!(cap.cap() < MULT_ONE);
        }
    }

    #[test]
    fn test_sim_version_names_the_engine() {
        assert!(SIM_VERSION.starts_with("sim-core/"));
    }
}
