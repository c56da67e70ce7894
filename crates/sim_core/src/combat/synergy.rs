//! Loadout-wide modifiers: crystals, relics, auras and synergies.
//!
//! [`Bonuses`] is derived data. It is rebuilt from the state at the start
//! of every tick so relic picks and placements take effect immediately.

use serde::{Deserialize, Serialize};

use crate::components::{AuraKind, Element, HeroClass, TurretKind};
use crate::config::{Crystal, Relic, MIGHT_BUFF};
use crate::math::{mult_mul, mult_pct, mult_serde, Multiplier, MULT_ONE};
use crate::state::SimulationState;

/// A hero/turret pairing that unlocks a bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Synergy {
    /// Pyromancer + Artillery: +15% buff on artillery shots.
    Wildfire,
    /// Frostweaver + Cryo: cryo slows last 50% longer.
    Permafrost,
    /// Stormcaller + Arc: arc shots chain once more.
    Conduction,
    /// Fire, ice and lightning heroes together: +10% buff on everything.
    Trinity,
}

/// Wildfire buff.
pub const WILDFIRE_BUFF_PCT: u32 = 15;
/// Trinity buff.
pub const TRINITY_BUFF_PCT: u32 = 10;

/// Multipliers derived from the loadout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bonuses {
    /// `stoneBonus` term of the damage chain.
    #[serde(with = "mult_serde")]
    pub stone: Multiplier,
    /// `globalBonus` term of the damage chain.
    #[serde(with = "mult_serde")]
    pub global: Multiplier,
    /// Cooldown factor for every attacker.
    #[serde(with = "mult_serde")]
    pub cooldown: Multiplier,
    /// Range factor for every attacker.
    #[serde(with = "mult_serde")]
    pub range: Multiplier,
    /// Status duration factor.
    #[serde(with = "mult_serde")]
    pub status_duration: Multiplier,
    /// Kill gold factor.
    #[serde(with = "mult_serde")]
    pub gold: Multiplier,
    /// Wall health factor.
    #[serde(with = "mult_serde")]
    pub wall_hp: Multiplier,
    /// Slow strength factor.
    #[serde(with = "mult_serde")]
    pub slow_strength: Multiplier,
    /// Overcharge duration factor.
    #[serde(with = "mult_serde")]
    pub overcharge_duration: Multiplier,
    /// Buff percent from auras, added to every attacker's buff sum.
    pub aura_buff_pct: u32,
    /// Active synergies in declaration order.
    pub synergies: Vec<Synergy>,
}

impl Default for Bonuses {
    fn default() -> Self {
        Self {
            stone: MULT_ONE,
            global: MULT_ONE,
            cooldown: MULT_ONE,
            range: MULT_ONE,
            status_duration: MULT_ONE,
            gold: MULT_ONE,
            wall_hp: MULT_ONE,
            slow_strength: MULT_ONE,
            overcharge_duration: MULT_ONE,
            aura_buff_pct: 0,
            synergies: Vec::new(),
        }
    }
}

impl Bonuses {
    /// Derive bonuses from the current state.
    #[must_use]
    pub fn compute(state: &SimulationState) -> Self {
        let loadout = &state.loadout;
        let mut bonuses = Self::default();

        for crystal in &loadout.crystals {
            match crystal {
                Crystal::Power => bonuses.stone = mult_mul(bonuses.stone, mult_pct(125)),
                Crystal::Time => bonuses.cooldown = mult_mul(bonuses.cooldown, mult_pct(85)),
                Crystal::Space => bonuses.range = mult_mul(bonuses.range, mult_pct(110)),
                Crystal::Reality => {
                    bonuses.status_duration = mult_mul(bonuses.status_duration, mult_pct(120));
                }
                Crystal::Soul => bonuses.gold = mult_mul(bonuses.gold, mult_pct(110)),
                Crystal::Mind => {}
            }
        }

        for relic in &loadout.relics {
            bonuses.global = mult_mul(bonuses.global, relic.global_damage());
            match relic {
                Relic::Bounty => bonuses.gold = mult_mul(bonuses.gold, mult_pct(125)),
                Relic::IronWalls => bonuses.wall_hp = mult_mul(bonuses.wall_hp, mult_pct(150)),
                Relic::ColdCore => {
                    bonuses.slow_strength = mult_mul(bonuses.slow_strength, mult_pct(125));
                }
                Relic::Overclock => {
                    bonuses.overcharge_duration =
                        mult_mul(bonuses.overcharge_duration, mult_pct(150));
                }
                Relic::SharpenedRounds | Relic::GlassCannon => {}
            }
        }

        let fortress = &state.store.fortress;
        if fortress.has_aura(AuraKind::Might) {
            let strength = mult_mul(MIGHT_BUFF, fortress.class.aura_multiplier());
            bonuses.aura_buff_pct = (strength.to_bits() * 100 / crate::math::MULT_ONE_BITS) as u32;
        }

        bonuses.synergies = detect_synergies(state);
        bonuses
    }

    /// Whether a synergy is active.
    #[must_use]
    pub fn has(&self, synergy: Synergy) -> bool {
        self.synergies.contains(&synergy)
    }

    /// Buff percent shared by every attacker (auras and Trinity).
    #[must_use]
    pub fn shared_buff_pct(&self) -> u32 {
        let trinity = if self.has(Synergy::Trinity) {
            TRINITY_BUFF_PCT
        } else {
            0
        };
        self.aura_buff_pct + trinity
    }
}

fn detect_synergies(state: &SimulationState) -> Vec<Synergy> {
    let has_hero = |class: HeroClass| state.store.heroes.iter().any(|h| h.class == class);
    let has_turret = |kind: TurretKind| state.store.turrets.iter().any(|t| t.kind == kind);
    let has_element = |element: Element| {
        state
            .store
            .heroes
            .iter()
            .any(|h| h.class.stats().element == element)
    };

    let mut synergies = Vec::new();
    if has_hero(HeroClass::Pyromancer) && has_turret(TurretKind::Artillery) {
        synergies.push(Synergy::Wildfire);
    }
    if has_hero(HeroClass::Frostweaver) && has_turret(TurretKind::Cryo) {
        synergies.push(Synergy::Permafrost);
    }
    if has_hero(HeroClass::Stormcaller) && has_turret(TurretKind::Arc) {
        synergies.push(Synergy::Conduction);
    }
    if has_element(Element::Fire) && has_element(Element::Ice) && has_element(Element::Lightning) {
        synergies.push(Synergy::Trinity);
    }
    synergies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HeroLoadout, SimConfig, TurretLoadout};

    fn state_with(config: &SimConfig) -> SimulationState {
        SimulationState::new(1, config)
    }

    #[test]
    fn test_default_loadout_has_might_only() {
        let state = state_with(&SimConfig::default());
        let bonuses = &state.bonuses;
        assert_eq!(bonuses.stone, MULT_ONE);
        // Balanced aura strength is 110% of 10%
        assert_eq!(bonuses.aura_buff_pct, 10);
        assert!(bonuses.synergies.is_empty());
    }

    #[test]
    fn test_crystals_and_relics_fold_in() {
        let config = SimConfig {
            crystals: vec![Crystal::Power, Crystal::Soul],
            relics: vec![Relic::Bounty, Relic::SharpenedRounds],
            ..SimConfig::default()
        };
        let bonuses = state_with(&config).bonuses;
        assert_eq!(bonuses.stone, mult_pct(125));
        assert_eq!(bonuses.global, mult_pct(110));
        assert!(bonuses.gold > mult_pct(137));
        assert!(bonuses.gold <= mult_pct(138));
    }

    #[test]
    fn test_synergies_detected() {
        let config = SimConfig {
            heroes: vec![
                HeroLoadout::basic(HeroClass::Pyromancer),
                HeroLoadout::basic(HeroClass::Frostweaver),
                HeroLoadout::basic(HeroClass::Stormcaller),
            ],
            turrets: vec![
                TurretLoadout {
                    slot: 0,
                    kind: TurretKind::Artillery,
                },
                TurretLoadout {
                    slot: 1,
                    kind: TurretKind::Arc,
                },
            ],
            ..SimConfig::default()
        };
        let bonuses = state_with(&config).bonuses;
        assert_eq!(
            bonuses.synergies,
            vec![Synergy::Wildfire, Synergy::Conduction, Synergy::Trinity]
        );
        assert_eq!(bonuses.shared_buff_pct(), 20);
    }
}
