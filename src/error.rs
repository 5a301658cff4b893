//! Error types for the edges of the simulation.
//!
//! The tick itself is infallible; errors only surface when loading
//! configuration, talking to storage, or when a player action is refused.

use thiserror::Error;

use crate::sim::progression::UpgradeKind;
use crate::sim::GamePhase;

/// Result type alias using [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Problems with externally supplied configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Document is not valid JSON for the expected shape.
    #[error("Failed to parse {what}: {source}")]
    Parse {
        /// Which document failed.
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Override table key is not a level number.
    #[error("Invalid level key '{0}' in override table")]
    InvalidLevelKey(String),

    /// Override asks for more of something than a level can hold.
    #[error("Level {level}: override {field}={value} exceeds the limit of {max}")]
    OverrideOutOfRange {
        level: u32,
        field: &'static str,
        value: u32,
        max: u32,
    },
}

/// Persistence back-end failures. Always logged, never fatal.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record serialization failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A player action that the state machine refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    /// The action is not available in the current phase.
    #[error("Action not allowed in phase {0:?}")]
    WrongPhase(GamePhase),

    /// Upgrade is already at its maximum level.
    #[error("{0:?} is already at max level")]
    MaxLevel(UpgradeKind),

    /// Not enough lifetime XP for the purchase.
    #[error("Insufficient XP: need {required}, have {available}")]
    InsufficientXp {
        /// Price of the next level.
        required: u64,
        /// Lifetime XP on hand.
        available: u64,
    },
}
