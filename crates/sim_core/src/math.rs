//! Fixed-point math utilities for deterministic simulation.
//!
//! All gameplay math uses integer-only fixed-point arithmetic so that the
//! client and the verification server produce bit-identical results.
//! Floating-point operations can round differently between CPUs and
//! compilers, so they never appear in a gameplay path.
//!
//! Two scales are used:
//! - [`Fixed`] (Q16.16, scale 65536) for positions, speeds, radii and ranges.
//! - [`Multiplier`] (scale 16384) for turret, crystal, relic and buff
//!   multipliers and for the damage chain.
//!
//! Multiplication, division and square root go through [`fx_mul`],
//! [`fx_div`] and [`fx_sqrt`], which pin the rounding behaviour down to
//! explicit shifts on 64-bit intermediates.

use fixed::types::{I16F16, I18F14};
use serde::{Deserialize, Serialize};

/// Fixed-point number type for positions and physics (Q16.16).
///
/// Range: approximately -32768 to 32767
/// Precision: 1/65536
pub type Fixed = I16F16;

/// Fixed-point multiplier type (scale 16384).
pub type Multiplier = I18F14;

/// Number of fractional bits in [`Fixed`].
pub const FIXED_FRAC_BITS: u32 = 16;

/// Number of fractional bits in [`Multiplier`].
pub const MULT_FRAC_BITS: u32 = 14;

/// Raw representation of 1.0 as a [`Multiplier`].
pub const MULT_ONE_BITS: i32 = 1 << MULT_FRAC_BITS;

/// Build a [`Fixed`] from an integer.
#[must_use]
pub const fn fx(n: i32) -> Fixed {
    Fixed::from_bits(n << FIXED_FRAC_BITS)
}

/// Build a [`Fixed`] from an exact ratio, truncating toward zero.
#[must_use]
pub const fn fx_ratio(num: i32, den: i32) -> Fixed {
    Fixed::from_bits((((num as i64) << FIXED_FRAC_BITS) / den as i64) as i32)
}

/// Build a [`Multiplier`] from a percentage (`125` is ×1.25).
#[must_use]
pub const fn mult_pct(pct: i32) -> Multiplier {
    Multiplier::from_bits(pct * MULT_ONE_BITS / 100)
}

/// The identity multiplier.
pub const MULT_ONE: Multiplier = Multiplier::from_bits(MULT_ONE_BITS);

/// Multiply two Q16.16 numbers.
///
/// `(a * b) >> 16` on a 64-bit intermediate, then truncated to 32 bits.
#[must_use]
pub fn fx_mul(a: Fixed, b: Fixed) -> Fixed {
    let product = (i64::from(a.to_bits()) * i64::from(b.to_bits())) >> FIXED_FRAC_BITS;
    Fixed::from_bits(product as i32)
}

/// Divide two Q16.16 numbers.
///
/// `(a << 16) / b` on a 64-bit intermediate. Division by zero saturates to
/// the extreme of the numerator's sign instead of panicking.
#[must_use]
pub fn fx_div(a: Fixed, b: Fixed) -> Fixed {
    let b64 = i64::from(b.to_bits());
    if b64 == 0 {
        return if a.to_bits() >= 0 {
            Fixed::MAX
        } else {
            Fixed::MIN
        };
    }
    let quotient = (i64::from(a.to_bits()) << FIXED_FRAC_BITS) / b64;
    Fixed::from_bits(quotient as i32)
}

/// Square root of a Q16.16 number using integer Newton iteration.
///
/// The integer square root of the raw bits is shifted left by 8, which
/// keeps the result in Q16.16. Non-positive input yields zero.
#[must_use]
pub fn fx_sqrt(value: Fixed) -> Fixed {
    let bits = i64::from(value.to_bits());
    if bits <= 0 {
        return Fixed::ZERO;
    }

    let mut x = bits;
    let mut y = (x + 1) >> 1;
    while y < x {
        x = y;
        y = (x + bits / x) >> 1;
    }

    Fixed::from_bits((x << 8) as i32)
}

/// Scale an integer amount by a [`Multiplier`], flooring the result.
#[must_use]
pub fn scale_u32(amount: u32, factor: Multiplier) -> u32 {
    let scaled = (i64::from(amount) * i64::from(factor.to_bits())) >> MULT_FRAC_BITS;
    scaled.clamp(0, i64::from(u32::MAX)) as u32
}

/// Scale a [`Fixed`] value by a [`Multiplier`].
#[must_use]
pub fn scale_fixed(value: Fixed, factor: Multiplier) -> Fixed {
    let scaled = (i64::from(value.to_bits()) * i64::from(factor.to_bits())) >> MULT_FRAC_BITS;
    Fixed::from_bits(scaled as i32)
}

/// Multiply two [`Multiplier`]s.
#[must_use]
pub fn mult_mul(a: Multiplier, b: Multiplier) -> Multiplier {
    let product = (i64::from(a.to_bits()) * i64::from(b.to_bits())) >> MULT_FRAC_BITS;
    Multiplier::from_bits(product as i32)
}

/// Quarter-wave sine table, 64 steps from 0 to π/2 inclusive, in Q16.16.
const SINE_QUARTER: [i32; 65] = [
    0, 1608, 3216, 4821, 6424, 8022, 9616, 11204, 12785, 14359, 15924, 17479, 19024, 20557, 22078,
    23586, 25080, 26558, 28020, 29466, 30893, 32303, 33692, 35062, 36410, 37736, 39040, 40320,
    41576, 42806, 44011, 45190, 46341, 47464, 48559, 49624, 50660, 51665, 52639, 53581, 54491,
    55368, 56212, 57022, 57798, 58538, 59244, 59914, 60547, 61145, 61705, 62228, 62714, 63162,
    63572, 63944, 64277, 64571, 64827, 65043, 65220, 65358, 65457, 65516, 65536,
];

/// Sine of a binary angle (256 steps per full turn).
#[must_use]
pub fn sin_lookup(angle: u8) -> Fixed {
    let index = usize::from(angle & 63);
    let raw = match angle >> 6 {
        0 => SINE_QUARTER[index],
        1 => SINE_QUARTER[64 - index],
        2 => -SINE_QUARTER[index],
        _ => -SINE_QUARTER[64 - index],
    };
    Fixed::from_bits(raw)
}

/// Cosine of a binary angle (256 steps per full turn).
#[must_use]
pub fn cos_lookup(angle: u8) -> Fixed {
    sin_lookup(angle.wrapping_add(64))
}

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for [`Fixed`].
///
/// Serializes fixed-point numbers as their raw bit representation (i32)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i32::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for [`Multiplier`], via its raw bits.
pub mod mult_serde {
    use super::Multiplier;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a multiplier as its raw bit representation.
    pub fn serialize<S>(value: &Multiplier, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a multiplier from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Multiplier, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i32::deserialize(deserializer)?;
        Ok(Multiplier::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from whole-unit coordinates.
    #[must_use]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self { x: fx(x), y: fx(y) }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        fx_mul(dx, dx) + fx_mul(dy, dy)
    }

    /// Whether `other` lies within `radius` of this point (inclusive).
    #[must_use]
    pub fn within(self, other: Self, radius: Fixed) -> bool {
        self.distance_squared(other) <= fx_mul(radius, radius)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        fx_mul(self.x, other.x) + fx_mul(self.y, other.y)
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fx_sqrt(self.dot(self))
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(fx_mul(self.x, factor), fx_mul(self.y, factor))
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + fx_mul(other.x - self.x, t),
            y: self.y + fx_mul(other.y - self.y, t),
        }
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }
        Self::new(fx_div(self.x, len), fx_div(self.y, len))
    }

    /// Step from `self` toward `target` by at most `step`, without overshooting.
    #[must_use]
    pub fn step_toward(self, target: Self, step: Fixed) -> Self {
        let diff = target - self;
        if diff.dot(diff) <= fx_mul(step, step) {
            return target;
        }
        self + diff.normalize().scale(step)
    }

    /// Unit vector for a binary angle (256 steps per turn).
    #[must_use]
    pub fn from_angle(angle: u8) -> Self {
        Self::new(cos_lookup(angle), sin_lookup(angle))
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}
