//! # Sim Core
//!
//! Deterministic tower-defense simulation for Bastion Defense.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO outside explicit replay and config helpers
//! - No system randomness or wall-clock time
//! - No floating-point gameplay math (uses fixed-point)
//!
//! The same build runs on the client and on the verification server, which
//! replays submitted segments and compares chained checkpoint hashes.
//!
//! ## Crate Structure
//!
//! - [`math`] - Q16.16 fixed-point arithmetic
//! - [`rng`] - seeded xorshift32
//! - [`components`] - entity definitions
//! - [`waves`] - wave generation
//! - [`combat`] - targeting, damage chain, attackers and effects
//! - [`systems`] - enemy movement and blocking
//! - [`events`] - player commands
//! - [`simulation`] - the tick scheduler
//! - [`checkpoint`] - canonical snapshot hashing
//! - [`segment`] - segment recording and verification
//! - [`replay`] - session replay files

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod checkpoint;
pub mod combat;
pub mod components;
pub mod config;
pub mod enemy_kind;
pub mod error;
pub mod events;
pub mod math;
pub mod replay;
pub mod rng;
pub mod segment;
pub mod simulation;
pub mod state;
pub mod systems;
pub mod waves;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::checkpoint::{hash_hex, snapshot_hash, Checkpoint, HashChain};
    pub use crate::components::*;
    pub use crate::config::{SimConfig, SIM_VERSION};
    pub use crate::enemy_kind::EnemyKind;
    pub use crate::error::{Result, SimError};
    pub use crate::events::{GameEvent, PlayerEvent};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::replay::{Replay, ReplayPlayer};
    pub use crate::rng::DeterministicRng;
    pub use crate::segment::{
        RejectionCode, Segment, SegmentRecorder, SegmentResponse, SegmentSubmission,
        SegmentVerifier, SecretAuditSelector, VerifierSession,
    };
    pub use crate::simulation::Simulation;
    pub use crate::state::SimulationState;
}
