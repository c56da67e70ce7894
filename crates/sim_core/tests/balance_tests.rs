//! Balance tests across seeds.
//!
//! Coarse guard rails: a fortress with nothing defending it must fall, a
//! full loadout must hold out at least as long, and sweeps must repeat
//! exactly so balance numbers can be compared between builds.

use sim_test_utils::balance::{sweep_seeds, OutcomeStats};
use sim_test_utils::fixtures::{defenseless_config, full_loadout_config};

const LONG_RUN: u64 = 20_000;

// =============================================================================
// Outcomes
// =============================================================================

mod outcomes {
    use super::*;

    #[test]
    fn test_defenseless_fortress_falls_on_every_seed() {
        let outcomes = sweep_seeds(1..=4, &defenseless_config(), LONG_RUN);
        let stats = OutcomeStats::from_outcomes(&outcomes);

        assert_eq!(stats.total_sessions, 4);
        assert_eq!(stats.losses, 4, "outcomes: {outcomes:?}");
        assert_eq!(stats.wins, 0);
        assert_eq!(stats.win_rate(), 0.0);
        assert!(stats.avg_leaks > 0.0);
        assert!(outcomes.iter().all(|o| o.fortress_hp == 0));
    }

    #[test]
    fn test_full_loadout_outlasts_no_defense() {
        let weak = OutcomeStats::from_outcomes(&sweep_seeds(1..=4, &defenseless_config(), LONG_RUN));
        let strong =
            OutcomeStats::from_outcomes(&sweep_seeds(1..=4, &full_loadout_config(), LONG_RUN));

        assert!(
            strong.min_wave >= weak.max_wave,
            "full loadout min wave {} vs defenseless max wave {}",
            strong.min_wave,
            weak.max_wave
        );
        assert!(strong.is_within(weak.avg_wave, f64::from(u32::MAX)));
    }
}

// =============================================================================
// Reproducibility
// =============================================================================

mod reproducibility {
    use super::*;

    #[test]
    fn test_sweeps_repeat_exactly() {
        let first = sweep_seeds(10..14, &full_loadout_config(), 1_500);
        let second = sweep_seeds(10..14, &full_loadout_config(), 1_500);
        assert_eq!(first, second);
    }

    #[test]
    fn test_seeds_change_outcomes() {
        let outcomes = sweep_seeds(10..14, &full_loadout_config(), 1_500);
        let mut hashes: Vec<u32> = outcomes.iter().map(|o| o.final_hash).collect();
        hashes.sort_unstable();
        hashes.dedup();
        assert_eq!(hashes.len(), outcomes.len());
    }
}
