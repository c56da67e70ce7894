//! Error types for the simulation.
//!
//! Gameplay never fails a tick: every [`SimError`] raised while applying a
//! player event is logged and the event is dropped. The remaining variants
//! cover configuration and persistence helpers outside the tick loop.

use thiserror::Error;

use crate::components::EntityId;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for the simulation crate.
#[derive(Debug, Error)]
pub enum SimError {
    /// Event targets a tick that has already been simulated.
    #[error("Event for tick {target_tick} arrived at tick {current_tick}")]
    StaleEvent {
        /// Tick the event was meant for.
        target_tick: u64,
        /// Tick the simulation is about to run.
        current_tick: u64,
    },

    /// Session has already ended.
    #[error("Session has ended")]
    SessionEnded,

    /// No hero in the given loadout slot.
    #[error("Unknown hero slot: {0}")]
    UnknownHero(u8),

    /// Hero is disabled and cannot take commands.
    #[error("Hero in slot {0} is disabled")]
    HeroDisabled(u8),

    /// No live turret with the given id.
    #[error("Unknown turret: {0}")]
    UnknownTurret(EntityId),

    /// No live wall with the given id.
    #[error("Unknown wall: {0}")]
    UnknownWall(EntityId),

    /// No live enemy with the given id.
    #[error("Unknown enemy: {0}")]
    UnknownEnemy(EntityId),

    /// Turret slot index is outside the slot table.
    #[error("Invalid turret slot: {0}")]
    InvalidSlot(u8),

    /// Turret slot already holds a turret.
    #[error("Turret slot {0} is occupied")]
    SlotOccupied(u8),

    /// Turret cannot be upgraded further.
    #[error("Turret {0} is at max level")]
    MaxLevel(EntityId),

    /// Not enough gold.
    #[error("Insufficient gold: need {needed}, have {available}")]
    InsufficientGold {
        /// Amount required.
        needed: u32,
        /// Amount available.
        available: u32,
    },

    /// Skill is still cooling down.
    #[error("Skill on cooldown for {remaining} more ticks")]
    SkillOnCooldown {
        /// Ticks remaining.
        remaining: u32,
    },

    /// Overcharge is active or cooling down.
    #[error("Overcharge unavailable for turret {0}")]
    OverchargeUnavailable(EntityId),

    /// Relic pick not available (none pending or already owned).
    #[error("Relic unavailable: {0}")]
    RelicUnavailable(String),

    /// Position is outside the playfield.
    #[error("Position outside the playfield")]
    InvalidPosition,

    /// A limit on entity counts would be exceeded.
    #[error("Limit reached: {0}")]
    LimitReached(&'static str),

    /// Starting configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to parse a configuration file.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Binary or JSON (de)serialization failure.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Replay written by an incompatible format or engine build.
    #[error("Incompatible replay: {0}")]
    IncompatibleReplay(String),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
