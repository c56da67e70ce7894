//! Test fixtures and helpers.
//!
//! Pre-built loadouts, scripted event streams and session setups
//! for consistent testing.

use sim_core::components::{FortressSkill, TargetingMode, TurretKind};
use sim_core::config::{Relic, SimConfig};
use sim_core::events::{GameEvent, PlayerEvent};
use sim_core::math::fx;
use sim_core::simulation::Simulation;

/// A late-game loadout with every slot filled, as written in a config file.
pub const FULL_LOADOUT_RON: &str = r"(
    fortress_class: Defender,
    commander_level: 25,
    auras: [Might, Haste, Renewal],
    heroes: [
        (class: Vanguard, tier: Epic, passive: Veteran, artifact: Some(Warblade)),
        (class: Pyromancer, tier: Legendary, passive: Elementalist, artifact: Some(EmberSigil)),
        (class: Frostweaver, artifact: Some(FrostSigil)),
        (class: Stormcaller, passive: Sharpshooter),
    ],
    turrets: [
        (slot: 0, kind: Railgun),
        (slot: 1, kind: Cryo),
        (slot: 2, kind: Artillery),
        (slot: 3, kind: Arc),
    ],
    crystals: [Power, Time, Reality],
    relics: [SharpenedRounds],
    starting_gold: 400,
    final_wave: 50,
)";

/// The default playable loadout.
#[must_use]
pub fn default_config() -> SimConfig {
    SimConfig::default()
}

/// [`FULL_LOADOUT_RON`], parsed.
///
/// # Panics
///
/// Panics if the fixture no longer parses.
#[must_use]
pub fn full_loadout_config() -> SimConfig {
    SimConfig::from_ron_str(FULL_LOADOUT_RON).expect("full loadout fixture parses")
}

/// A loadout with no defenders that loses within a few waves.
#[must_use]
pub fn defenseless_config() -> SimConfig {
    SimConfig {
        heroes: Vec::new(),
        turrets: Vec::new(),
        auras: Vec::new(),
        relics: vec![Relic::GlassCannon],
        starting_gold: 0,
        ..SimConfig::default()
    }
}

/// Serialize a config to pretty RON.
///
/// # Panics
///
/// Panics if the config cannot be serialized.
#[must_use]
pub fn config_to_ron(config: &SimConfig) -> String {
    ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::default())
        .expect("config serializes to RON")
}

/// A short scripted opening touching every economy path, in tick order.
///
/// Ids assume the default loadout: its two turrets are 1 and 2, so the
/// first purchased turret is 3.
#[must_use]
pub fn scripted_events() -> Vec<PlayerEvent> {
    let at = |tick: u64, event: GameEvent| PlayerEvent { tick, event };
    vec![
        at(
            10,
            GameEvent::PlaceTurret {
                slot: 2,
                kind: TurretKind::Artillery,
            },
        ),
        at(
            12,
            GameEvent::SetTargeting {
                turret: 1,
                mode: TargetingMode::Strongest,
            },
        ),
        at(95, GameEvent::PlaceWall { x: fx(18) }),
        at(
            120,
            GameEvent::MoveHero {
                slot: 0,
                x: fx(12),
                y: fx(1),
            },
        ),
        at(150, GameEvent::HeroSkill { slot: 1 }),
        at(
            160,
            GameEvent::FortressSkill {
                skill: FortressSkill::Barrage,
            },
        ),
        at(200, GameEvent::ReleaseHero { slot: 0 }),
        at(240, GameEvent::Overcharge { turret: 1 }),
        at(300, GameEvent::DeployMilitia { count: 2 }),
        at(330, GameEvent::UpgradeTurret { turret: 2 }),
    ]
}

/// Create a session and queue `events`.
///
/// # Panics
///
/// Panics if the config is invalid or an event targets a past tick.
#[must_use]
pub fn simulation_with_events(seed: u32, config: &SimConfig, events: &[PlayerEvent]) -> Simulation {
    let mut sim = Simulation::create(seed, config).expect("fixture config is valid");
    for event in events {
        sim.submit_event(event.event, event.tick)
            .expect("fixture events target future ticks");
    }
    sim
}
