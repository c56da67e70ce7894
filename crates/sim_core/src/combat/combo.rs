//! Elemental combo detection.
//!
//! Two hits of a matching element pair on the same enemy within
//! [`COMBO_WINDOW_TICKS`] (inclusive) trigger a combo. The earliest
//! qualifying earlier hit is the one consumed. After a combo the enemy
//! ignores elemental hits for another window.

use serde::{Deserialize, Serialize};

use crate::components::Element;
use crate::config::COMBO_WINDOW_TICKS;
use crate::math::{fx, Fixed};

/// Most hits remembered per enemy.
const MAX_TRACKED_HITS: usize = 8;

/// Steam Burst damage to every enemy in its radius.
pub const STEAM_BURST_DAMAGE: u32 = 40;
/// Steam Burst radius around the target.
pub const STEAM_BURST_RADIUS: Fixed = fx(2);
/// Shatter damage as percent of the target's max health.
pub const SHATTER_PERCENT: u32 = 15;
/// Overload stun duration.
pub const OVERLOAD_STUN_TICKS: u32 = 45;
/// Toxic Blaze burst damage.
pub const TOXIC_BLAZE_DAMAGE: u32 = 25;
/// Armor break left by Toxic Blaze.
pub const TOXIC_BLAZE_ARMOR_BREAK_TICKS: u32 = 90;

/// Combo produced by an element pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Combo {
    /// Fire + Ice: area damage around the target.
    SteamBurst,
    /// Ice + Lightning: percent max-health damage.
    Shatter,
    /// Fire + Lightning: stun.
    Overload,
    /// Poison + Fire: burst damage plus armor break.
    ToxicBlaze,
}

impl Combo {
    /// Combo for an unordered element pair.
    #[must_use]
    pub const fn from_pair(a: Element, b: Element) -> Option<Self> {
        use Element::{Fire, Ice, Lightning, Poison};
        match (a, b) {
            (Fire, Ice) | (Ice, Fire) => Some(Self::SteamBurst),
            (Ice, Lightning) | (Lightning, Ice) => Some(Self::Shatter),
            (Fire, Lightning) | (Lightning, Fire) => Some(Self::Overload),
            (Poison, Fire) | (Fire, Poison) => Some(Self::ToxicBlaze),
            _ => None,
        }
    }

    /// Stable byte code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// One remembered elemental hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHit {
    /// Element.
    pub element: Element,
    /// Tick it landed on.
    pub tick: u64,
}

/// Per-enemy hit history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ComboTracker {
    /// Unconsumed hits, oldest first.
    pub hits: Vec<ElementHit>,
    /// No combo may trigger before this tick.
    pub locked_until: u64,
}

impl ComboTracker {
    /// Record a hit landing on `tick` and return a triggered combo, if any.
    pub fn record(&mut self, element: Element, tick: u64) -> Option<Combo> {
        if element == Element::Physical || tick < self.locked_until {
            return None;
        }

        self.hits
            .retain(|hit| tick.saturating_sub(hit.tick) <= COMBO_WINDOW_TICKS);

        let partner = self
            .hits
            .iter()
            .find_map(|hit| Combo::from_pair(hit.element, element));

        if let Some(combo) = partner {
            self.hits.clear();
            self.locked_until = tick + COMBO_WINDOW_TICKS;
            return Some(combo);
        }

        if self.hits.len() == MAX_TRACKED_HITS {
            self.hits.remove(0);
        }
        self.hits.push(ElementHit { element, tick });
        None
    }
}
