//! Status effects on enemies.
//!
//! Each kind has its own stacking rule:
//!
//! | kind        | on reapply                                     |
//! |-------------|------------------------------------------------|
//! | slow        | factors multiply (floor 20%), duration = max   |
//! | burn        | per-tick = max, duration = max                 |
//! | poison      | +1 stack up to 5, duration refreshed           |
//! | freeze      | duration = max                                 |
//! | stun        | duration = max                                 |
//! | armor break | duration = max                                 |

use serde::{Deserialize, Serialize};

use crate::math::{mult_mul, mult_pct, mult_serde, scale_fixed, scale_u32, Fixed, Multiplier, MULT_ONE};

/// Strongest combined slow factor.
pub const MIN_SLOW_FACTOR: Multiplier = mult_pct(20);

/// Poison stack cap.
pub const MAX_POISON_STACKS: u8 = 5;

/// Damage taken multiplier while armor is broken.
pub const ARMOR_BREAK_MULTIPLIER: Multiplier = mult_pct(125);

/// A status carried by a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusApplication {
    /// Multiply movement speed by `factor`.
    Slow {
        /// Speed factor (1.0 = no slow).
        #[serde(with = "mult_serde")]
        factor: Multiplier,
        /// Ticks.
        duration: u32,
    },
    /// Fire damage every tick.
    Burn {
        /// Damage per tick.
        per_tick: u32,
        /// Ticks.
        duration: u32,
    },
    /// Stacking damage every tick.
    Poison {
        /// Damage per tick per stack.
        per_stack: u32,
        /// Ticks.
        duration: u32,
    },
    /// Cannot move.
    Freeze {
        /// Ticks.
        duration: u32,
    },
    /// Cannot move or use abilities.
    Stun {
        /// Ticks.
        duration: u32,
    },
    /// Takes extra damage.
    ArmorBreak {
        /// Ticks.
        duration: u32,
    },
}

impl StatusApplication {
    /// Duration in ticks.
    #[must_use]
    pub const fn duration(self) -> u32 {
        match self {
            Self::Slow { duration, .. }
            | Self::Burn { duration, .. }
            | Self::Poison { duration, .. }
            | Self::Freeze { duration }
            | Self::Stun { duration }
            | Self::ArmorBreak { duration } => duration,
        }
    }

    /// Scale the duration and, for slows, the slow strength.
    ///
    /// Slow strength scales the missing fraction: a 30% slow at 125% strength
    /// becomes a 37.5% slow.
    #[must_use]
    pub fn scaled(self, duration_mult: Multiplier, slow_strength: Multiplier) -> Self {
        let duration = scale_u32(self.duration(), duration_mult);
        match self {
            Self::Slow { factor, .. } => {
                let missing = MULT_ONE - factor;
                let stronger = mult_mul(missing, slow_strength);
                let factor = (MULT_ONE - stronger).max(MIN_SLOW_FACTOR);
                Self::Slow { factor, duration }
            }
            Self::Burn { per_tick, .. } => Self::Burn { per_tick, duration },
            Self::Poison { per_stack, .. } => Self::Poison {
                per_stack,
                duration,
            },
            Self::Freeze { .. } => Self::Freeze { duration },
            Self::Stun { .. } => Self::Stun { duration },
            Self::ArmorBreak { .. } => Self::ArmorBreak { duration },
        }
    }
}

/// Active slow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlowEffect {
    /// Combined speed factor.
    #[serde(with = "mult_serde")]
    pub factor: Multiplier,
    /// Ticks left.
    pub remaining: u32,
}

/// Active burn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BurnEffect {
    /// Damage per tick.
    pub per_tick: u32,
    /// Ticks left.
    pub remaining: u32,
}

/// Active poison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoisonEffect {
    /// Damage per tick per stack.
    pub per_stack: u32,
    /// Stack count (1..=5).
    pub stacks: u8,
    /// Ticks left.
    pub remaining: u32,
}

/// Every status currently on an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StatusEffects {
    /// Slow.
    pub slow: Option<SlowEffect>,
    /// Burn.
    pub burn: Option<BurnEffect>,
    /// Poison.
    pub poison: Option<PoisonEffect>,
    /// Freeze ticks left.
    pub freeze: u32,
    /// Stun ticks left.
    pub stun: u32,
    /// Armor break ticks left.
    pub armor_break: u32,
}

impl StatusEffects {
    /// Apply a status using its stacking rule.
    pub fn apply(&mut self, application: StatusApplication) {
        match application {
            StatusApplication::Slow { factor, duration } => {
                self.slow = Some(match self.slow {
                    Some(current) => SlowEffect {
                        factor: mult_mul(current.factor, factor).max(MIN_SLOW_FACTOR),
                        remaining: current.remaining.max(duration),
                    },
                    None => SlowEffect {
                        factor: factor.max(MIN_SLOW_FACTOR),
                        remaining: duration,
                    },
                });
            }
            StatusApplication::Burn { per_tick, duration } => {
                self.burn = Some(match self.burn {
                    Some(current) => BurnEffect {
                        per_tick: current.per_tick.max(per_tick),
                        remaining: current.remaining.max(duration),
                    },
                    None => BurnEffect {
                        per_tick,
                        remaining: duration,
                    },
                });
            }
            StatusApplication::Poison {
                per_stack,
                duration,
            } => {
                self.poison = Some(match self.poison {
                    Some(current) => PoisonEffect {
                        per_stack: current.per_stack.max(per_stack),
                        stacks: (current.stacks + 1).min(MAX_POISON_STACKS),
                        remaining: duration,
                    },
                    None => PoisonEffect {
                        per_stack,
                        stacks: 1,
                        remaining: duration,
                    },
                });
            }
            StatusApplication::Freeze { duration } => self.freeze = self.freeze.max(duration),
            StatusApplication::Stun { duration } => self.stun = self.stun.max(duration),
            StatusApplication::ArmorBreak { duration } => {
                self.armor_break = self.armor_break.max(duration);
            }
        }
    }

    /// Frozen or stunned.
    #[must_use]
    pub const fn is_immobilized(&self) -> bool {
        self.freeze > 0 || self.stun > 0
    }

    /// Stunned enemies cannot cast abilities.
    #[must_use]
    pub const fn is_stunned(&self) -> bool {
        self.stun > 0
    }

    /// Speed after the active slow.
    #[must_use]
    pub fn apply_slow(&self, speed: Fixed) -> Fixed {
        match self.slow {
            Some(slow) => scale_fixed(speed, slow.factor),
            None => speed,
        }
    }

    /// Multiplier on incoming hit damage.
    #[must_use]
    pub const fn damage_taken_multiplier(&self) -> Multiplier {
        if self.armor_break > 0 {
            ARMOR_BREAK_MULTIPLIER
        } else {
            MULT_ONE
        }
    }

    /// Damage-over-time due this tick; then advance every timer by one tick.
    pub fn tick(&mut self) -> u32 {
        let mut damage = 0u32;
        if let Some(burn) = self.burn.as_mut() {
            damage = damage.saturating_add(burn.per_tick);
            burn.remaining -= 1;
            if burn.remaining == 0 {
                self.burn = None;
            }
        }
        if let Some(poison) = self.poison.as_mut() {
            damage = damage.saturating_add(poison.per_stack * u32::from(poison.stacks));
            poison.remaining -= 1;
            if poison.remaining == 0 {
                self.poison = None;
            }
        }
        if let Some(slow) = self.slow.as_mut() {
            slow.remaining -= 1;
            if slow.remaining == 0 {
                self.slow = None;
            }
        }
        self.freeze = self.freeze.saturating_sub(1);
        self.stun = self.stun.saturating_sub(1);
        self.armor_break = self.armor_break.saturating_sub(1);
        damage
    }

    /// Bitmask of active kinds for the checkpoint codec.
    #[must_use]
    pub const fn active_mask(&self) -> u8 {
        (self.slow.is_some() as u8)
            | ((self.burn.is_some() as u8) << 1)
            | ((self.poison.is_some() as u8) << 2)
            | (((self.freeze > 0) as u8) << 3)
            | (((self.stun > 0) as u8) << 4)
            | (((self.armor_break > 0) as u8) << 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::fx;

    #[test]
    fn test_slows_multiply_and_floor() {
        let mut status = StatusEffects::default();
        let slow = StatusApplication::Slow {
            factor: mult_pct(50),
            duration: 10,
        };
        status.apply(slow);
        status.apply(StatusApplication::Slow {
            factor: mult_pct(50),
            duration: 30,
        });
        let current = status.slow.unwrap();
        assert_eq!(current.factor, mult_pct(25));
        assert_eq!(current.remaining, 30);

        status.apply(slow);
        assert_eq!(status.slow.unwrap().factor, MIN_SLOW_FACTOR);
        assert_eq!(status.slow.unwrap().remaining, 30);
    }

    #[test]
    fn test_stun_refreshes_instead_of_stacking() {
        let mut status = StatusEffects::default();
        status.apply(StatusApplication::Stun { duration: 20 });
        status.apply(StatusApplication::Stun { duration: 10 });
        assert_eq!(status.stun, 20);
        assert!(status.is_immobilized());
        assert_eq!(status.apply_slow(fx(1)), fx(1));
    }

    #[test]
    fn test_poison_caps_at_five_stacks() {
        let mut status = StatusEffects::default();
        for _ in 0..8 {
            status.apply(StatusApplication::Poison {
                per_stack: 2,
                duration: 5,
            });
        }
        assert_eq!(status.poison.unwrap().stacks, MAX_POISON_STACKS);
        assert_eq!(status.tick(), 10);
    }

    #[test]
    fn test_tick_expires_effects() {
        let mut status = StatusEffects::default();
        status.apply(StatusApplication::Burn {
            per_tick: 3,
            duration: 2,
        });
        status.apply(StatusApplication::Freeze { duration: 1 });
        assert_eq!(status.tick(), 3);
        assert!(!status.is_immobilized());
        assert_eq!(status.tick(), 3);
        assert_eq!(status.tick(), 0);
        assert_eq!(status.active_mask(), 0);
    }

    #[test]
    fn test_armor_break_raises_damage_taken() {
        let mut status = StatusEffects::default();
        assert_eq!(status.damage_taken_multiplier(), MULT_ONE);
        status.apply(StatusApplication::ArmorBreak { duration: 3 });
        assert_eq!(scale_u32(100, status.damage_taken_multiplier()), 125);
    }

    #[test]
    fn test_scaled_strengthens_slow() {
        let slow = StatusApplication::Slow {
            factor: mult_pct(60),
            duration: 40,
        };
        let scaled = slow.scaled(mult_pct(150), mult_pct(125));
        match scaled {
            StatusApplication::Slow { factor, duration } => {
                assert_eq!(duration, 60);
                assert_eq!(factor, mult_pct(50));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
