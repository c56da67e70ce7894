//! Wave generation.
//!
//! [`generate_wave`] is a pure function of the wave number and the RNG. It
//! draws exactly one `next_u32` for the modifier, then one `next_float01`
//! per non-guaranteed common slot in spawn order. Nothing else touches the
//! RNG while a wave is generated.

use serde::{Deserialize, Serialize};

use crate::components::EnemyTier;
use crate::enemy_kind::{EnemyAbility, EnemyKind, Pillar, PILLAR_ROTATION};
use crate::math::{fixed_serde, mult_pct, scale_fixed, scale_u32, Fixed, Multiplier, MULT_ONE};
use crate::rng::DeterministicRng;

/// Waves per composition cycle.
pub const COMPOSITION_CYCLE: u32 = 10;
/// Waves per scaling cycle.
pub const WAVES_PER_CYCLE: u32 = 100;
/// Wave from which the late elite cap applies.
pub const LATE_ELITE_WAVE: u32 = 60;
/// Elite chance cap before [`LATE_ELITE_WAVE`], in basis points.
pub const EARLY_ELITE_CAP_BP: u32 = 3500;
/// Elite chance from [`LATE_ELITE_WAVE`] on, in basis points.
pub const LATE_ELITE_CAP_BP: u32 = 5000;
/// Modifiers are forced to Calm before this wave.
pub const FIRST_MODIFIER_WAVE: u32 = 5;

/// Per-position composition in the ten-wave cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionSlot {
    /// Leading spawns that are always elite.
    pub guaranteed_elites: u32,
    /// Whether the pillar boss closes the wave.
    pub boss: bool,
}

const fn slot(guaranteed_elites: u32, boss: bool) -> CompositionSlot {
    CompositionSlot {
        guaranteed_elites,
        boss,
    }
}

/// Indexed by `(wave - 1) % 10`; position 9 is the boss wave.
pub const COMPOSITION: [CompositionSlot; 10] = [
    slot(0, false),
    slot(0, false),
    slot(1, false),
    slot(0, false),
    slot(2, false),
    slot(0, false),
    slot(1, false),
    slot(2, false),
    slot(3, false),
    slot(2, true),
];

/// One of twelve wave-wide modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WaveModifier {
    /// No change.
    #[default]
    Calm,
    /// Tougher, slower.
    Armored,
    /// Faster, frailer.
    Swift,
    /// Many weak enemies.
    Horde,
    /// Few huge enemies.
    Giants,
    /// Fragile but numerous.
    Brittle,
    /// Enemies regenerate.
    Regenerating,
    /// Enemies spawn with shields.
    Shielded,
    /// Faster and harder hitting.
    Frenzied,
    /// More elites.
    EliteSurge,
    /// Hit very hard.
    Volatile,
    /// Tougher, shielded, regenerating, well rewarded.
    Blessed,
}

/// Numbers a modifier applies to every spawn of its wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifierEffects {
    /// Health.
    pub hp: Multiplier,
    /// Speed.
    pub speed: Multiplier,
    /// Contact damage.
    pub damage: Multiplier,
    /// Enemy count.
    pub count: Multiplier,
    /// Collision radius.
    pub radius: Multiplier,
    /// Starting shield as percent of health.
    pub shield_percent: u32,
    /// Percent of max health regenerated per pulse.
    pub regen_percent: u32,
    /// Added elite chance in basis points.
    pub elite_bonus_bp: u32,
    /// Kill reward.
    pub reward: Multiplier,
}

#[allow(clippy::too_many_arguments)]
const fn effects(
    hp: i32,
    speed: i32,
    damage: i32,
    count: i32,
    radius: i32,
    shield_percent: u32,
    regen_percent: u32,
    elite_bonus_bp: u32,
    reward: i32,
) -> ModifierEffects {
    ModifierEffects {
        hp: mult_pct(hp),
        speed: mult_pct(speed),
        damage: mult_pct(damage),
        count: mult_pct(count),
        radius: mult_pct(radius),
        shield_percent,
        regen_percent,
        elite_bonus_bp,
        reward: mult_pct(reward),
    }
}

impl WaveModifier {
    /// Every modifier, indexed by the selection draw.
    pub const ALL: [Self; 12] = [
        Self::Calm,
        Self::Armored,
        Self::Swift,
        Self::Horde,
        Self::Giants,
        Self::Brittle,
        Self::Regenerating,
        Self::Shielded,
        Self::Frenzied,
        Self::EliteSurge,
        Self::Volatile,
        Self::Blessed,
    ];

    /// Stable byte code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// What the modifier does.
    #[must_use]
    pub const fn effects(self) -> ModifierEffects {
        match self {
            Self::Calm => effects(100, 100, 100, 100, 100, 0, 0, 0, 100),
            Self::Armored => effects(140, 90, 100, 100, 100, 0, 0, 0, 120),
            Self::Swift => effects(85, 140, 100, 100, 100, 0, 0, 0, 115),
            Self::Horde => effects(75, 100, 100, 150, 100, 0, 0, 0, 110),
            Self::Giants => effects(180, 80, 130, 70, 130, 0, 0, 0, 125),
            Self::Brittle => effects(60, 100, 100, 120, 100, 0, 0, 0, 90),
            Self::Regenerating => effects(100, 100, 100, 100, 100, 0, 2, 0, 120),
            Self::Shielded => effects(100, 100, 100, 100, 100, 25, 0, 0, 120),
            Self::Frenzied => effects(100, 120, 140, 100, 100, 0, 0, 0, 130),
            Self::EliteSurge => effects(100, 100, 100, 100, 100, 0, 0, 1500, 140),
            Self::Volatile => effects(90, 110, 160, 100, 100, 0, 0, 0, 115),
            Self::Blessed => effects(120, 100, 100, 100, 100, 10, 1, 0, 150),
        }
    }

    /// Reward multiplier.
    #[must_use]
    pub const fn reward_multiplier(self) -> Multiplier {
        self.effects().reward
    }
}

/// Enemies in a wave before modifiers.
///
/// `(8 + w*2.5) * 2` up to wave 30, `(8 + 75 + (w-30)*1.8) * 2` after. The
/// inner term is floored before doubling.
#[must_use]
pub const fn enemy_count(wave: u32) -> u32 {
    if wave <= 30 {
        2 * (8 + wave * 5 / 2)
    } else {
        2 * (8 + 75 + (wave - 30) * 18 / 10)
    }
}

/// Elite chance in basis points.
///
/// `0.05 + w*0.004` capped at 0.35 before wave 60. From wave 60 on the
/// late cap of 0.50 applies as a flat rate.
#[must_use]
pub const fn elite_chance_bp(wave: u32) -> u32 {
    if wave >= LATE_ELITE_WAVE {
        return LATE_ELITE_CAP_BP;
    }
    let raw = 500 + 40 * wave;
    if raw > EARLY_ELITE_CAP_BP {
        EARLY_ELITE_CAP_BP
    } else {
        raw
    }
}

/// Convert basis points to a Q16.16 probability.
#[must_use]
pub const fn bp_to_fixed(bp: u32) -> Fixed {
    Fixed::from_bits((bp as i64 * 65536 / 10_000) as i32)
}

/// Elite chance as a Q16.16 probability.
#[must_use]
pub const fn elite_chance(wave: u32) -> Fixed {
    bp_to_fixed(elite_chance_bp(wave))
}

/// `1 + (wave - 1) * 0.12`.
#[must_use]
pub const fn wave_scale(wave: u32) -> Fixed {
    let steps = if wave == 0 { 0 } else { wave as i64 - 1 };
    Fixed::from_bits((65_536 + steps * 12 * 65_536 / 100) as i32)
}

/// `1.6 ^ (wave / 100)`, by repeated ×8/5 on the raw bits.
#[must_use]
pub const fn cycle_scale(wave: u32) -> Fixed {
    let mut bits: i64 = 65_536;
    let mut cycle = wave / WAVES_PER_CYCLE;
    while cycle > 0 {
        bits = bits * 8 / 5;
        if bits > i32::MAX as i64 {
            bits = i32::MAX as i64;
        }
        cycle -= 1;
    }
    Fixed::from_bits(bits as i32)
}

/// Pillar for a wave.
#[must_use]
pub const fn pillar_for_wave(wave: u32) -> Pillar {
    PILLAR_ROTATION[((wave / COMPOSITION_CYCLE) % 6) as usize]
}

/// Composition entry for a wave.
#[must_use]
pub const fn composition(wave: u32) -> CompositionSlot {
    COMPOSITION[(wave.saturating_sub(1) % COMPOSITION_CYCLE) as usize]
}

/// Boss for a boss wave. Every fiftieth wave brings the Overlord.
#[must_use]
pub const fn boss_for_wave(wave: u32) -> EnemyKind {
    if wave % 50 == 0 {
        EnemyKind::Overlord
    } else {
        pillar_for_wave(wave).boss()
    }
}

/// Fully resolved stats for one spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnEntry {
    /// Kind.
    pub kind: EnemyKind,
    /// Tier.
    pub tier: EnemyTier,
    /// Pillar.
    pub pillar: Pillar,
    /// Health.
    pub hp: u32,
    /// Movement per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Contact damage.
    pub damage: u32,
    /// Collision radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Gold on kill, modifier included.
    pub reward: u32,
    /// Starting shield.
    pub shield: u32,
    /// Percent of max health regenerated per pulse.
    pub regen_percent: u32,
    /// First ability cooldown.
    pub ability_cooldown: u32,
}

/// Resolve stats for a kind and tier at a wave.
#[must_use]
pub fn spawn_entry(
    kind: EnemyKind,
    tier: EnemyTier,
    wave: u32,
    modifier: WaveModifier,
) -> SpawnEntry {
    let profile = kind.profile();
    let fx_mods = modifier.effects();
    let (tier_hp, tier_damage, tier_reward, tier_radius) = match tier {
        EnemyTier::Elite => (mult_pct(300), mult_pct(150), mult_pct(200), mult_pct(120)),
        EnemyTier::Common | EnemyTier::Boss => (MULT_ONE, MULT_ONE, MULT_ONE, MULT_ONE),
    };

    let scaled_hp = scale_by_fixed(scale_by_fixed(profile.hp, wave_scale(wave)), cycle_scale(wave));
    let hp = scale_u32(scale_u32(scaled_hp, tier_hp), fx_mods.hp).max(1);
    let damage = scale_u32(
        scale_u32(scale_by_fixed(profile.damage, wave_scale(wave)), tier_damage),
        fx_mods.damage,
    );
    let reward = scale_u32(scale_u32(profile.reward, tier_reward), fx_mods.reward);

    SpawnEntry {
        kind,
        tier,
        pillar: pillar_for_wave(wave),
        hp,
        speed: scale_fixed(profile.speed, fx_mods.speed),
        damage,
        radius: scale_fixed(scale_fixed(profile.radius, tier_radius), fx_mods.radius),
        reward,
        shield: hp * fx_mods.shield_percent / 100,
        regen_percent: fx_mods.regen_percent,
        ability_cooldown: profile.ability.map_or(0, EnemyAbility::interval),
    }
}

fn scale_by_fixed(amount: u32, factor: Fixed) -> u32 {
    let scaled = (u64::from(amount) * factor.to_bits().max(0) as u64) >> 16;
    scaled.min(u64::from(u32::MAX)) as u32
}

/// A generated wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavePlan {
    /// Wave number.
    pub wave: u32,
    /// Pillar.
    pub pillar: Pillar,
    /// Modifier.
    pub modifier: WaveModifier,
    /// Spawns in order.
    pub entries: Vec<SpawnEntry>,
}

impl WavePlan {
    /// Elite count.
    #[must_use]
    pub fn elites(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.tier == EnemyTier::Elite)
            .count()
    }
}

/// Generate a wave.
pub fn generate_wave(wave: u32, rng: &mut DeterministicRng) -> WavePlan {
    let draw = rng.next_u32();
    let modifier = if wave < FIRST_MODIFIER_WAVE {
        WaveModifier::Calm
    } else {
        WaveModifier::ALL[(draw % 12) as usize]
    };
    let fx_mods = modifier.effects();
    let pillar = pillar_for_wave(wave);
    let layout = composition(wave);
    let count = scale_u32(enemy_count(wave), fx_mods.count).max(1);
    let chance = bp_to_fixed((elite_chance_bp(wave) + fx_mods.elite_bonus_bp).min(LATE_ELITE_CAP_BP));

    let mut entries = Vec::with_capacity(count as usize + 1);
    for i in 0..count {
        let kind = pillar.pool_kind(i as usize + wave as usize);
        let tier = if i < layout.guaranteed_elites || rng.next_float01() < chance {
            EnemyTier::Elite
        } else {
            EnemyTier::Common
        };
        entries.push(spawn_entry(kind, tier, wave, modifier));
    }
    if layout.boss {
        entries.push(spawn_entry(boss_for_wave(wave), EnemyTier::Boss, wave, modifier));
    }

    tracing::debug!(
        wave,
        ?pillar,
        ?modifier,
        count = entries.len(),
        "Generated wave"
    );

    WavePlan {
        wave,
        pillar,
        modifier,
        entries,
    }
}
