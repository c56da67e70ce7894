//! Enemy catalog.
//!
//! 26 common kinds spread over six pillar pools plus seven bosses. Stats
//! here are wave-1 baselines; [`crate::waves`] scales them per wave.

use serde::{Deserialize, Serialize};

use crate::math::{fx, fx_ratio, Fixed};

/// Thematic pillar; waves rotate through pillars every ten waves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Pillar {
    /// Street gangs.
    #[default]
    Streets,
    /// Rogue machines.
    Science,
    /// Mutated beasts.
    Mutants,
    /// Invaders from orbit.
    Cosmos,
    /// Arcane horrors.
    Magic,
    /// Fallen divinities.
    Gods,
}

/// Pillar order indexed by `(wave / 10) % 6`.
pub const PILLAR_ROTATION: [Pillar; 6] = [
    Pillar::Streets,
    Pillar::Science,
    Pillar::Mutants,
    Pillar::Cosmos,
    Pillar::Magic,
    Pillar::Gods,
];

/// Kinds that appear in every pillar.
const UNIVERSAL: [EnemyKind; 4] = [
    EnemyKind::Grunt,
    EnemyKind::Runner,
    EnemyKind::Brute,
    EnemyKind::Swarmling,
];

impl Pillar {
    /// Stable byte code used by the checkpoint codec.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Pillar-specific common kinds.
    #[must_use]
    pub const fn natives(self) -> &'static [EnemyKind] {
        match self {
            Self::Streets => &[
                EnemyKind::Thug,
                EnemyKind::Biker,
                EnemyKind::Enforcer,
                EnemyKind::Medic,
            ],
            Self::Science => &[
                EnemyKind::Drone,
                EnemyKind::Cyborg,
                EnemyKind::ShieldBot,
                EnemyKind::Replicator,
            ],
            Self::Mutants => &[
                EnemyKind::Crawler,
                EnemyKind::Spitter,
                EnemyKind::Behemoth,
                EnemyKind::Broodmother,
            ],
            Self::Cosmos => &[
                EnemyKind::Voidling,
                EnemyKind::StarKnight,
                EnemyKind::Nebula,
                EnemyKind::Comet,
            ],
            Self::Magic => &[EnemyKind::Imp, EnemyKind::Golem, EnemyKind::Shaman],
            Self::Gods => &[EnemyKind::Acolyte, EnemyKind::Seraph, EnemyKind::Titan],
        }
    }

    /// Number of kinds in this pillar's spawn pool.
    #[must_use]
    pub const fn pool_len(self) -> usize {
        UNIVERSAL.len() + self.natives().len()
    }

    /// Kind at `index` in the pool (natives first, then universal kinds).
    #[must_use]
    pub fn pool_kind(self, index: usize) -> EnemyKind {
        let natives = self.natives();
        let index = index % self.pool_len();
        if index < natives.len() {
            natives[index]
        } else {
            UNIVERSAL[index - natives.len()]
        }
    }

    /// The pillar's boss.
    #[must_use]
    pub const fn boss(self) -> EnemyKind {
        match self {
            Self::Streets => EnemyKind::Kingpin,
            Self::Science => EnemyKind::Overmind,
            Self::Mutants => EnemyKind::HiveQueen,
            Self::Cosmos => EnemyKind::StarDevourer,
            Self::Magic => EnemyKind::Archlich,
            Self::Gods => EnemyKind::Avatar,
        }
    }
}

/// Enemy special ability, resolved during the damage phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyAbility {
    /// Grant nearby allies a shield worth a percentage of their max health.
    Shield {
        /// Shield as percent of each ally's max health.
        percent: u32,
        /// Effect radius.
        radius: Fixed,
        /// Ticks between casts.
        interval: u32,
    },
    /// Spawn minions at the caster's position.
    Summon {
        /// Minion kind.
        minion: EnemyKind,
        /// Minions per cast.
        count: u32,
        /// Ticks between casts.
        interval: u32,
    },
    /// Heal nearby allies by a percentage of their max health.
    Heal {
        /// Heal as percent of each ally's max health.
        percent: u32,
        /// Effect radius.
        radius: Fixed,
        /// Ticks between casts.
        interval: u32,
    },
    /// Disable the closest hero in range.
    Stun {
        /// Disable duration in ticks.
        duration: u32,
        /// Reach.
        range: Fixed,
        /// Ticks between casts.
        interval: u32,
    },
}

impl EnemyAbility {
    /// Ticks between casts.
    #[must_use]
    pub const fn interval(self) -> u32 {
        match self {
            Self::Shield { interval, .. }
            | Self::Summon { interval, .. }
            | Self::Heal { interval, .. }
            | Self::Stun { interval, .. } => interval,
        }
    }
}

const SHIELD: EnemyAbility = EnemyAbility::Shield {
    percent: 10,
    radius: fx(4),
    interval: 150,
};
const HEAL: EnemyAbility = EnemyAbility::Heal {
    percent: 5,
    radius: fx(4),
    interval: 120,
};
const STUN: EnemyAbility = EnemyAbility::Stun {
    duration: 60,
    range: fx(12),
    interval: 300,
};

const fn summon(minion: EnemyKind, count: u32) -> EnemyAbility {
    EnemyAbility::Summon {
        minion,
        count,
        interval: 240,
    }
}

/// Wave-1 baseline numbers for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyProfile {
    /// Hit points.
    pub hp: u32,
    /// Movement per tick.
    pub speed: Fixed,
    /// Contact damage.
    pub damage: u32,
    /// Collision radius.
    pub radius: Fixed,
    /// Gold on kill.
    pub reward: u32,
    /// Special ability.
    pub ability: Option<EnemyAbility>,
}

const fn profile(
    hp: u32,
    speed: Fixed,
    damage: u32,
    radius: Fixed,
    reward: u32,
    ability: Option<EnemyAbility>,
) -> EnemyProfile {
    EnemyProfile {
        hp,
        speed,
        damage,
        radius,
        reward,
        ability,
    }
}

/// Enemy kind: 26 commons followed by 7 bosses.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    Grunt,
    Runner,
    Brute,
    Swarmling,
    Thug,
    Biker,
    Enforcer,
    Medic,
    Drone,
    Cyborg,
    ShieldBot,
    Replicator,
    Crawler,
    Spitter,
    Behemoth,
    Broodmother,
    Voidling,
    StarKnight,
    Nebula,
    Comet,
    Imp,
    Golem,
    Shaman,
    Acolyte,
    Seraph,
    Titan,
    Kingpin,
    Overmind,
    HiveQueen,
    StarDevourer,
    Archlich,
    Avatar,
    Overlord,
}

impl EnemyKind {
    /// Stable byte code used by the checkpoint codec.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Whether this kind is a boss.
    #[must_use]
    pub const fn is_boss(self) -> bool {
        matches!(
            self,
            Self::Kingpin
                | Self::Overmind
                | Self::HiveQueen
                | Self::StarDevourer
                | Self::Archlich
                | Self::Avatar
                | Self::Overlord
        )
    }

    /// Wave-1 baseline numbers.
    #[must_use]
    pub const fn profile(self) -> EnemyProfile {
        match self {
            Self::Grunt => profile(40, fx_ratio(1, 20), 10, fx_ratio(1, 2), 5, None),
            Self::Runner => profile(25, fx_ratio(1, 10), 6, fx_ratio(2, 5), 5, None),
            Self::Brute => profile(120, fx_ratio(1, 30), 25, fx_ratio(4, 5), 12, None),
            Self::Swarmling => profile(12, fx_ratio(3, 40), 3, fx_ratio(3, 10), 2, None),
            Self::Thug => profile(55, fx_ratio(1, 20), 12, fx_ratio(1, 2), 6, None),
            Self::Biker => profile(35, fx_ratio(1, 8), 8, fx_ratio(1, 2), 7, None),
            Self::Enforcer => profile(150, fx_ratio(1, 30), 20, fx_ratio(4, 5), 14, None),
            Self::Medic => profile(45, fx_ratio(1, 20), 5, fx_ratio(1, 2), 9, Some(HEAL)),
            Self::Drone => profile(30, fx_ratio(1, 10), 6, fx_ratio(2, 5), 6, None),
            Self::Cyborg => profile(90, fx_ratio(1, 25), 18, fx_ratio(3, 5), 10, None),
            Self::ShieldBot => profile(80, fx_ratio(1, 25), 10, fx_ratio(3, 5), 11, Some(SHIELD)),
            Self::Replicator => profile(
                70,
                fx_ratio(1, 25),
                8,
                fx_ratio(3, 5),
                12,
                Some(summon(Self::Drone, 1)),
            ),
            Self::Crawler => profile(45, fx_ratio(3, 50), 10, fx_ratio(1, 2), 6, None),
            Self::Spitter => profile(40, fx_ratio(1, 20), 14, fx_ratio(1, 2), 7, None),
            Self::Behemoth => profile(220, fx_ratio(1, 40), 35, fx(1), 20, None),
            Self::Broodmother => profile(
                110,
                fx_ratio(1, 30),
                10,
                fx_ratio(4, 5),
                15,
                Some(summon(Self::Swarmling, 2)),
            ),
            Self::Voidling => profile(35, fx_ratio(1, 12), 9, fx_ratio(2, 5), 6, None),
            Self::StarKnight => profile(130, fx_ratio(1, 25), 22, fx_ratio(3, 5), 13, None),
            Self::Nebula => profile(75, fx_ratio(1, 25), 8, fx_ratio(3, 5), 11, Some(SHIELD)),
            Self::Comet => profile(30, fx_ratio(3, 20), 12, fx_ratio(2, 5), 8, None),
            Self::Imp => profile(30, fx_ratio(1, 12), 8, fx_ratio(2, 5), 5, None),
            Self::Golem => profile(200, fx_ratio(1, 40), 30, fx(1), 18, None),
            Self::Shaman => profile(60, fx_ratio(1, 20), 6, fx_ratio(1, 2), 10, Some(HEAL)),
            Self::Acolyte => profile(50, fx_ratio(1, 20), 10, fx_ratio(1, 2), 7, None),
            Self::Seraph => profile(85, fx_ratio(1, 15), 16, fx_ratio(3, 5), 12, None),
            Self::Titan => profile(260, fx_ratio(1, 40), 40, fx_ratio(6, 5), 24, None),
            Self::Kingpin => profile(
                1500,
                fx_ratio(1, 40),
                80,
                fx_ratio(3, 2),
                150,
                Some(summon(Self::Thug, 2)),
            ),
            Self::Overmind => profile(1400, fx_ratio(1, 40), 70, fx_ratio(3, 2), 150, Some(STUN)),
            Self::HiveQueen => profile(
                1800,
                fx_ratio(1, 50),
                90,
                fx(2),
                170,
                Some(summon(Self::Crawler, 3)),
            ),
            Self::StarDevourer => profile(1700, fx_ratio(1, 40), 100, fx(2), 170, Some(SHIELD)),
            Self::Archlich => profile(1600, fx_ratio(1, 40), 80, fx_ratio(3, 2), 160, Some(HEAL)),
            Self::Avatar => profile(2000, fx_ratio(1, 45), 110, fx(2), 180, Some(STUN)),
            Self::Overlord => profile(3000, fx_ratio(1, 50), 150, fx_ratio(5, 2), 300, Some(STUN)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_26_commons_and_7_bosses() {
        let mut kinds = Vec::new();
        for pillar in PILLAR_ROTATION {
            for i in 0..pillar.pool_len() {
                kinds.push(pillar.pool_kind(i));
            }
            kinds.push(pillar.boss());
        }
        kinds.push(EnemyKind::Overlord);
        kinds.sort();
        kinds.dedup();
        let commons = kinds.iter().filter(|k| !k.is_boss()).count();
        let bosses = kinds.iter().filter(|k| k.is_boss()).count();
        assert_eq!(commons, 26);
        assert_eq!(bosses, 7);
    }

    #[test]
    fn test_pool_wraps_and_puts_natives_first() {
        assert_eq!(Pillar::Streets.pool_kind(0), EnemyKind::Thug);
        assert_eq!(Pillar::Streets.pool_kind(4), EnemyKind::Grunt);
        assert_eq!(Pillar::Magic.pool_len(), 7);
        assert_eq!(Pillar::Magic.pool_kind(7), EnemyKind::Imp);
    }

    #[test]
    fn test_summoners_never_summon_bosses() {
        for code in 0..=EnemyKind::Overlord.code() {
            let kind = PILLAR_ROTATION
                .iter()
                .flat_map(|p| (0..p.pool_len()).map(|i| p.pool_kind(i)))
                .chain(PILLAR_ROTATION.iter().map(|p| p.boss()))
                .find(|k| k.code() == code);
            if let Some(kind) = kind {
                if let Some(EnemyAbility::Summon { minion, .. }) = kind.profile().ability {
                    assert!(!minion.is_boss());
                }
            }
        }
    }
}
