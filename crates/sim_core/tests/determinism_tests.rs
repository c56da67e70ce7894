//! End-to-end determinism tests.
//!
//! Two sessions built from the same seed, loadout and event stream must
//! agree on every snapshot hash, whether they run side by side, on other
//! threads, or through a replay file.

use sim_core::replay::{Replay, ReplayPlayer};
use sim_core::simulation::Simulation;
use sim_test_utils::determinism::{
    find_first_divergence, record_checkpoints, run_parallel_sessions,
    verify_serialization_determinism, verify_sessions, verify_simulation_determinism,
    SessionSetup,
};
use sim_test_utils::fixtures::{default_config, full_loadout_config, scripted_events};

fn scripted(seed: u32) -> SessionSetup {
    SessionSetup::new(seed, default_config()).with_events(scripted_events())
}

// =============================================================================
// Side-by-side runs
// =============================================================================

#[test]
fn test_scripted_session_is_deterministic() {
    assert!(verify_simulation_determinism(&scripted(2024), 900));
}

#[test]
fn test_many_seeds_reproduce_their_chains() {
    let setups: Vec<_> = (1..=6)
        .map(|seed| SessionSetup::new(seed, full_loadout_config()).with_events(scripted_events()))
        .collect();
    let report = verify_sessions(&setups, 600);
    report.assert_deterministic();
    assert_eq!(report.sessions, 6);
}

#[test]
fn test_full_loadout_never_diverges() {
    let setup = SessionSetup::new(9, full_loadout_config());
    assert_eq!(find_first_divergence(setup.start(), setup.start(), 1200), None);
}

#[test]
fn test_parallel_sessions_agree() {
    let setup = SessionSetup::new(31, full_loadout_config()).with_events(scripted_events());
    run_parallel_sessions(&setup, 4, 600).assert_deterministic();
}

#[test]
fn test_restored_session_continues_identically() {
    assert!(verify_serialization_determinism(&scripted(5), 200));
}

#[test]
fn test_checkpoints_repeat_exactly() {
    let first = record_checkpoints(&scripted(77));
    let second = record_checkpoints(&scripted(77));
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_seed_changes_checkpoints() {
    let a = record_checkpoints(&SessionSetup::new(1, default_config()));
    let b = record_checkpoints(&SessionSetup::new(2, default_config()));
    assert_ne!(a.last(), b.last());
}

// =============================================================================
// Replays
// =============================================================================

fn recorded_replay(seed: u32, ticks: u64) -> Replay {
    let config = full_loadout_config();
    let mut replay = Replay::new(seed, config.clone());
    let mut sim = Simulation::create(seed, &config).unwrap();
    for event in scripted_events() {
        replay.record_event(event.tick, event.event);
        sim.submit_event(event.event, event.tick).unwrap();
    }
    sim.run_until(ticks);
    replay.finalize(&sim);
    replay
}

#[test]
fn test_two_replays_reach_the_same_hash() {
    let replay = recorded_replay(404, 900);

    let mut first = replay.start().unwrap();
    let mut second = replay.start().unwrap();
    first.run_until(replay.final_tick);
    second.run_until(replay.final_tick);

    assert_eq!(first.state_hash(), second.state_hash());
    assert_eq!(first.state_hash(), replay.final_hash);
}

#[test]
fn test_replay_survives_disk_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.replay");
    let replay = recorded_replay(12, 600);
    replay.save(&path).unwrap();

    let mut player = ReplayPlayer::new(Replay::load(&path).unwrap()).unwrap();
    assert!(player.verify().unwrap());
}

#[test]
fn test_seeking_backwards_matches_fresh_playback() {
    let replay = recorded_replay(88, 600);
    let mut player = ReplayPlayer::new(replay.clone()).unwrap();
    player.seek(500).unwrap();
    player.seek(250).unwrap();

    let mut fresh = replay.start().unwrap();
    fresh.run_until(250);
    assert_eq!(player.current_tick(), 250);
    assert_eq!(player.simulation().state_hash(), fresh.state_hash());
}
