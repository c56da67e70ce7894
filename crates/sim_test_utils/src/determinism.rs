//! Determinism testing utilities.
//!
//! The server replays every submitted segment and compares chained
//! checkpoint hashes, so client and server must agree bit for bit. The
//! harness here runs a [`SessionSetup`] more than once and compares the
//! resulting checkpoint chains, reporting the first checkpoint where two
//! runs part ways.
//!
//! Divergence usually means one of:
//!
//! - float math slipping into a gameplay path instead of
//!   [`sim_core::math::Fixed`]
//! - iteration over an unordered collection
//! - an RNG draw outside the documented phase order

use std::thread;

use sim_core::checkpoint::{hash_hex, Checkpoint, HashChain};
use sim_core::config::{SimConfig, CHECKPOINT_INTERVAL_TICKS};
use sim_core::events::PlayerEvent;
use sim_core::segment::SegmentRecorder;
use sim_core::simulation::Simulation;

// =============================================================================
// Session setups
// =============================================================================

/// Everything a session is a pure function of: seed, loadout and events.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSetup {
    /// Session seed.
    pub seed: u32,
    /// Starting loadout.
    pub config: SimConfig,
    /// Scripted events, in tick order.
    pub events: Vec<PlayerEvent>,
}

impl SessionSetup {
    /// Setup with no scripted events.
    #[must_use]
    pub fn new(seed: u32, config: SimConfig) -> Self {
        Self {
            seed,
            config,
            events: Vec::new(),
        }
    }

    /// Same setup with `events` queued.
    #[must_use]
    pub fn with_events(mut self, events: Vec<PlayerEvent>) -> Self {
        self.events = events;
        self
    }

    /// Fresh session with every event queued.
    ///
    /// # Panics
    ///
    /// Panics if the config is invalid or an event targets a past tick.
    #[must_use]
    pub fn start(&self) -> Simulation {
        crate::fixtures::simulation_with_events(self.seed, &self.config, &self.events)
    }

    /// Play a fresh session for `ticks` and return its checkpoint chain.
    #[must_use]
    pub fn checkpoint_chain(&self, ticks: u64) -> Vec<Checkpoint> {
        checkpoint_chain(self.start(), ticks)
    }
}

/// Step `sim` up to `ticks`, appending a chained checkpoint on every grid
/// tick and on the tick the session ends.
#[must_use]
pub fn checkpoint_chain(mut sim: Simulation, ticks: u64) -> Vec<Checkpoint> {
    let mut chain = HashChain::new();
    let mut checkpoints = Vec::new();
    while sim.tick() < ticks && !sim.is_ended() {
        sim.step();
        if sim.tick() % CHECKPOINT_INTERVAL_TICKS == 0 || sim.is_ended() {
            checkpoints.push(chain.append(sim.snapshot()));
        }
    }
    checkpoints
}

// =============================================================================
// Reports
// =============================================================================

/// First checkpoint where a rerun disagreed with the reference run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainDivergence {
    /// Seed of the diverging session.
    pub seed: u32,
    /// Which rerun diverged (the reference run is 0).
    pub run: usize,
    /// Tick of the first mismatching checkpoint.
    pub tick: u64,
    /// Reference chain hash at that tick, if the reference got that far.
    pub expected: Option<u32>,
    /// Rerun chain hash at that tick, if the rerun got that far.
    pub actual: Option<u32>,
}

/// Outcome of rerunning one or more setups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeterminismReport {
    /// Setups checked.
    pub sessions: usize,
    /// Checkpoints compared per run, summed over setups.
    pub checkpoints: usize,
    /// Every rerun that disagreed.
    pub divergences: Vec<ChainDivergence>,
}

impl DeterminismReport {
    /// Whether every rerun reproduced its reference chain.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.divergences.is_empty()
    }

    /// Fail the test with the first divergence spelled out.
    ///
    /// # Panics
    ///
    /// Panics if any rerun diverged.
    pub fn assert_deterministic(&self) {
        if let Some(first) = self.divergences.first() {
            let show = |hash: Option<u32>| hash.map_or_else(|| "<none>".to_string(), hash_hex);
            panic!(
                "Checkpoint chains diverged in {} of {} sessions\n\
                 First: seed {} run {} at tick {} (expected {}, got {})",
                self.divergences.len(),
                self.sessions,
                first.seed,
                first.run,
                first.tick,
                show(first.expected),
                show(first.actual),
            );
        }
    }

    fn compare(&mut self, seed: u32, reference: &[Checkpoint], reruns: &[Vec<Checkpoint>]) {
        self.sessions += 1;
        self.checkpoints += reference.len();
        for (offset, rerun) in reruns.iter().enumerate() {
            if let Some(divergence) = first_mismatch(seed, offset + 1, reference, rerun) {
                self.divergences.push(divergence);
            }
        }
    }
}

fn first_mismatch(
    seed: u32,
    run: usize,
    reference: &[Checkpoint],
    rerun: &[Checkpoint],
) -> Option<ChainDivergence> {
    let len = reference.len().max(rerun.len());
    (0..len).find_map(|i| {
        let expected = reference.get(i);
        let actual = rerun.get(i);
        if expected == actual {
            return None;
        }
        Some(ChainDivergence {
            seed,
            run,
            tick: expected.or(actual).map_or(0, |c| c.tick),
            expected: expected.map(|c| c.hash),
            actual: actual.map(|c| c.hash),
        })
    })
}

// =============================================================================
// Harness
// =============================================================================

/// Run every setup twice and compare the checkpoint chains.
#[must_use]
pub fn verify_sessions(setups: &[SessionSetup], ticks: u64) -> DeterminismReport {
    let mut report = DeterminismReport::default();
    for setup in setups {
        let reference = setup.checkpoint_chain(ticks);
        let rerun = setup.checkpoint_chain(ticks);
        report.compare(setup.seed, &reference, &[rerun]);
    }
    report
}

/// Run one setup twice; true if the chains match.
#[must_use]
pub fn verify_simulation_determinism(setup: &SessionSetup, ticks: u64) -> bool {
    verify_sessions(std::slice::from_ref(setup), ticks).is_deterministic()
}

/// Run `threads` copies of a setup on scoped threads and compare their
/// chains against the first.
///
/// # Panics
///
/// Panics if a worker thread panics.
#[must_use]
pub fn run_parallel_sessions(setup: &SessionSetup, threads: usize, ticks: u64) -> DeterminismReport {
    let mut chains: Vec<Vec<Checkpoint>> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| s.spawn(|| setup.checkpoint_chain(ticks)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("session thread panicked"))
            .collect()
    });

    let mut report = DeterminismReport::default();
    if !chains.is_empty() {
        let reference = chains.remove(0);
        report.compare(setup.seed, &reference, &chains);
    }
    report
}

/// Step two sessions side by side and return the first tick after which
/// their snapshot hashes differ, or `None` if they agree for `ticks`.
///
/// Tick-level resolution, for narrowing down a checkpoint divergence.
#[must_use]
pub fn find_first_divergence(mut a: Simulation, mut b: Simulation, ticks: u64) -> Option<u64> {
    if a.state_hash() != b.state_hash() {
        return Some(a.tick());
    }
    for _ in 0..ticks {
        a.step();
        b.step();
        if a.state_hash() != b.state_hash() {
            return Some(a.tick());
        }
    }
    None
}

/// Serialize a session after `ticks`, restore it, and check the restored
/// copy continues with the same checkpoint chain as the original.
#[must_use]
pub fn verify_serialization_determinism(setup: &SessionSetup, ticks: u64) -> bool {
    let mut sim = setup.start();
    sim.run_until(ticks);

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(restored) = Simulation::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != sim.state_hash() {
        return false;
    }
    let horizon = ticks + 4 * CHECKPOINT_INTERVAL_TICKS;
    checkpoint_chain(restored, horizon) == checkpoint_chain(sim, horizon)
}

/// Record the first segment of a session and return its checkpoints.
///
/// # Panics
///
/// Panics if the config is invalid or an event is out of order.
#[must_use]
pub fn record_checkpoints(setup: &SessionSetup) -> Vec<Checkpoint> {
    let mut recorder = SegmentRecorder::new(setup.seed, &setup.config).expect("valid config");
    for event in &setup.events {
        recorder
            .submit(event.event, event.tick)
            .expect("events in tick order");
    }
    recorder
        .finish_segment()
        .map(|segment| segment.checkpoints)
        .unwrap_or_default()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use proptest::prelude::*;
    use sim_core::components::{FortressSkill, TargetingMode, TurretKind};
    use sim_core::config::Relic;
    use sim_core::events::{GameEvent, PlayerEvent};
    use sim_core::math::Fixed;

    /// Any session seed.
    pub fn arb_seed() -> impl Strategy<Value = u32> {
        any::<u32>()
    }

    /// Raw Q16.16 value of moderate magnitude for arithmetic properties.
    pub fn arb_fixed() -> impl Strategy<Value = Fixed> {
        (-(1i32 << 24)..(1i32 << 24)).prop_map(Fixed::from_bits)
    }

    /// A lane coordinate, sometimes outside the playfield.
    pub fn arb_field_x() -> impl Strategy<Value = Fixed> {
        (-8i32..50i32).prop_map(Fixed::from_num)
    }

    /// A cross-lane coordinate, sometimes outside the playfield.
    pub fn arb_field_y() -> impl Strategy<Value = Fixed> {
        (-15i32..15i32).prop_map(Fixed::from_num)
    }

    /// Turret type.
    pub fn arb_turret_kind() -> impl Strategy<Value = TurretKind> {
        prop_oneof![
            Just(TurretKind::Railgun),
            Just(TurretKind::Artillery),
            Just(TurretKind::Arc),
            Just(TurretKind::Cryo),
        ]
    }

    /// Targeting rule.
    pub fn arb_targeting_mode() -> impl Strategy<Value = TargetingMode> {
        prop_oneof![
            Just(TargetingMode::ClosestToFortress),
            Just(TargetingMode::Weakest),
            Just(TargetingMode::Strongest),
            Just(TargetingMode::NearestToTurret),
            Just(TargetingMode::Fastest),
        ]
    }

    /// Any player command, including invalid ones (bad slots, unknown ids).
    pub fn arb_game_event() -> impl Strategy<Value = GameEvent> {
        prop_oneof![
            (0u8..5, arb_field_x(), arb_field_y())
                .prop_map(|(slot, x, y)| GameEvent::MoveHero { slot, x, y }),
            (0u8..5, 0u32..200).prop_map(|(slot, enemy)| GameEvent::AttackTarget { slot, enemy }),
            (0u8..5).prop_map(|slot| GameEvent::ReleaseHero { slot }),
            (0u8..8, arb_turret_kind()).prop_map(|(slot, kind)| GameEvent::PlaceTurret { slot, kind }),
            (0u32..12).prop_map(|turret| GameEvent::RemoveTurret { turret }),
            (0u32..12).prop_map(|turret| GameEvent::UpgradeTurret { turret }),
            (0u32..12, arb_targeting_mode())
                .prop_map(|(turret, mode)| GameEvent::SetTargeting { turret, mode }),
            (0u32..12).prop_map(|turret| GameEvent::Overcharge { turret }),
            arb_field_x().prop_map(|x| GameEvent::PlaceWall { x }),
            (0u32..200).prop_map(|wall| GameEvent::RemoveWall { wall }),
            (0u8..4).prop_map(|count| GameEvent::DeployMilitia { count }),
            (0u8..5).prop_map(|slot| GameEvent::HeroSkill { slot }),
            prop_oneof![
                Just(FortressSkill::Barrage),
                Just(FortressSkill::Bulwark),
                Just(FortressSkill::CryoPulse),
            ]
            .prop_map(|skill| GameEvent::FortressSkill { skill }),
            proptest::sample::select(Relic::ALL.to_vec())
                .prop_map(|relic| GameEvent::ChooseRelic { relic }),
        ]
    }

    /// Events spread over `0..horizon`, sorted by tick.
    pub fn arb_event_stream(
        max_len: usize,
        horizon: u64,
    ) -> impl Strategy<Value = Vec<PlayerEvent>> {
        proptest::collection::vec((0..horizon, arb_game_event()), 0..max_len).prop_map(
            |mut events| {
                events.sort_by_key(|(tick, _)| *tick);
                events
                    .into_iter()
                    .map(|(tick, event)| PlayerEvent { tick, event })
                    .collect()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{default_config, full_loadout_config, scripted_events};
    use proptest::prelude::*;
    use sim_core::components::FortressSkill;
    use sim_core::events::GameEvent;

    fn scripted(seed: u32) -> SessionSetup {
        SessionSetup::new(seed, default_config()).with_events(scripted_events())
    }

    // =========================================================================
    // Checkpoint chains
    // =========================================================================

    #[test]
    fn test_chain_lands_on_grid_ticks() {
        let chain = scripted(4).checkpoint_chain(300);
        assert_eq!(chain.len(), 10);
        assert!(chain.iter().all(|c| c.tick % CHECKPOINT_INTERVAL_TICKS == 0));
        assert_eq!(chain.last().map(|c| c.tick), Some(300));
    }

    #[test]
    fn test_mismatch_reports_first_bad_checkpoint() {
        let reference = scripted(4).checkpoint_chain(150);
        let mut tampered = reference.clone();
        tampered[2].hash ^= 1;
        tampered[3].hash ^= 1;

        let divergence = first_mismatch(4, 1, &reference, &tampered).unwrap();
        assert_eq!(divergence.tick, reference[2].tick);
        assert_eq!(divergence.expected, Some(reference[2].hash));
        assert_eq!(divergence.actual, Some(tampered[2].hash));
        assert_eq!(first_mismatch(4, 1, &reference, &reference), None);
    }

    #[test]
    fn test_short_rerun_is_a_divergence() {
        let reference = scripted(4).checkpoint_chain(150);
        let short = &reference[..3];
        let divergence = first_mismatch(4, 1, &reference, short).unwrap();
        assert_eq!(divergence.tick, reference[3].tick);
        assert_eq!(divergence.actual, None);
    }

    #[test]
    #[should_panic(expected = "Checkpoint chains diverged")]
    fn test_report_panics_on_divergence() {
        let reference = scripted(4).checkpoint_chain(90);
        let mut other = reference.clone();
        other[0].hash ^= 1;
        let mut report = DeterminismReport::default();
        report.compare(4, &reference, &[other]);
        report.assert_deterministic();
    }

    // =========================================================================
    // Harness
    // =========================================================================

    #[test]
    fn test_loadouts_are_deterministic() {
        let setups = [
            SessionSetup::new(42, default_config()),
            SessionSetup::new(42, full_loadout_config()),
            scripted(9),
        ];
        let report = verify_sessions(&setups, 400);
        report.assert_deterministic();
        assert_eq!(report.sessions, 3);
        assert!(report.checkpoints >= 3 * 13);
    }

    #[test]
    fn test_divergence_found_at_the_differing_event() {
        let quiet = SessionSetup::new(3, default_config()).start();
        let loud = SessionSetup::new(3, default_config())
            .with_events(vec![PlayerEvent {
                tick: 120,
                event: GameEvent::FortressSkill {
                    skill: FortressSkill::Bulwark,
                },
            }])
            .start();
        assert_eq!(find_first_divergence(quiet, loud, 400), Some(121));

        assert_eq!(
            find_first_divergence(scripted(3).start(), scripted(3).start(), 400),
            None
        );
    }

    #[test]
    fn test_serialization_determinism() {
        assert!(verify_serialization_determinism(&scripted(5), 250));
    }

    #[test]
    fn test_parallel_sessions() {
        let report = run_parallel_sessions(&scripted(11), 4, 300);
        assert_eq!(report.sessions, 1);
        report.assert_deterministic();
    }

    #[test]
    fn test_recorded_checkpoints_match_the_chain() {
        let setup = scripted(21);
        let recorded = record_checkpoints(&setup);
        assert!(!recorded.is_empty());
        let last_tick = recorded.last().map_or(0, |c| c.tick);
        assert_eq!(recorded, setup.checkpoint_chain(last_tick));
    }

    // =========================================================================
    // Property-based tests using proptest
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Random event streams, valid or not, replay identically.
        #[test]
        fn prop_event_streams_are_replayable(
            seed in strategies::arb_seed(),
            events in strategies::arb_event_stream(24, 300),
        ) {
            let setup = SessionSetup::new(seed, default_config()).with_events(events);
            prop_assert!(verify_simulation_determinism(&setup, 300));
        }

        /// Serialization round-trip should always preserve state exactly.
        #[test]
        fn prop_serialization_roundtrip_is_exact(
            seed in strategies::arb_seed(),
            num_ticks in 0u64..200,
        ) {
            let setup = SessionSetup::new(seed, default_config());
            prop_assert!(verify_serialization_determinism(&setup, num_ticks));
        }
    }

    // =========================================================================
    // Stress tests (only run explicitly with --ignored)
    // =========================================================================

    #[test]
    #[ignore = "Long-running stress test"]
    fn stress_test_long_session() {
        let setup = SessionSetup::new(77, full_loadout_config());
        verify_sessions(&[setup], 9000).assert_deterministic();
    }

    #[test]
    #[ignore = "Long-running stress test"]
    fn stress_test_parallel_many_sessions() {
        let setup = SessionSetup::new(5, full_loadout_config());
        run_parallel_sessions(&setup, 16, 3000).assert_deterministic();
    }
}
