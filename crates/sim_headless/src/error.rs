//! Errors for the headless runner.

use sim_core::error::SimError;
use sim_core::segment::Rejection;
use thiserror::Error;

use crate::strategies::StrategyError;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Headless runner error.
#[derive(Debug, Error)]
pub enum HeadlessError {
    /// Engine failure (bad loadout, out-of-order event, corrupt replay).
    #[error(transparent)]
    Sim(#[from] SimError),

    /// Strategy could not be loaded.
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    /// Recording file is not valid JSON.
    #[error("Invalid recording: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A recorded segment failed local verification.
    #[error("Segment {index} rejected: {rejection}")]
    Rejected {
        /// Segment index.
        index: u32,
        /// Why.
        rejection: Rejection,
    },

    /// Two runs of the same seed disagreed.
    #[error("{count} of {checked} seeds diverged (first: {first_seed})")]
    NonDeterministic {
        /// Seeds checked.
        checked: usize,
        /// Seeds that diverged.
        count: usize,
        /// Lowest diverging seed.
        first_seed: u32,
    },

    /// Thread pool could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
