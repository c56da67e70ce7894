//! Seeded xorshift32 generator.
//!
//! This is the only source of randomness in the engine. It is owned by the
//! simulation state and passed by `&mut` into every subsystem that draws
//! from it, so the draw order is fixed by the tick phase order:
//! AI → Turret → Physics → Projectiles → Damage → Cleanup.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Replacement for a zero seed; xorshift never leaves the all-zero state.
pub const ZERO_SEED_REPLACEMENT: u32 = 0x9E37_79B9;

/// Deterministic xorshift32 pseudo-random number generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: u32,
}

impl DeterministicRng {
    /// Create a generator from a session seed.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        let state = if seed == 0 {
            ZERO_SEED_REPLACEMENT
        } else {
            seed
        };
        Self { state }
    }

    /// Current internal state (serialized into checkpoints).
    #[must_use]
    pub const fn state(&self) -> u32 {
        self.state
    }

    /// Advance the generator and return the new state.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform value in `[0, 1)` as Q16.16 (the draw divided by 2^32).
    pub fn next_float01(&mut self) -> Fixed {
        Fixed::from_bits((self.next_u32() >> 16) as i32)
    }

    /// Uniform integer in `[lo, hi)`. Returns `lo` for an empty range.
    pub fn next_range(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_u32() % (hi - lo)
    }

    /// Returns `true` with probability `p`, consuming one draw.
    pub fn chance(&mut self, p: Fixed) -> bool {
        self.next_float01() < p
    }
}
