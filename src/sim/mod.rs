//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (list order breaks ties)
//! - No rendering or platform dependencies beyond `InputIntent`

pub mod collision;
pub mod combat;
pub mod enemy;
pub mod entity;
pub mod hazards;
pub mod level;
pub mod progression;
pub mod snapshot;
pub mod spawn;
pub mod state;
pub mod structure;
pub mod tick;

pub use combat::{fire_player_volley, player_fire_cooldown_ms};
pub use level::{LevelOverrides, LevelParams, resolve_level_params};
pub use progression::{DamageSource, Progress, UpgradeKind, UpgradeLevels};
pub use snapshot::{RenderSink, WorldSnapshot};
pub use state::{GameEvent, GamePhase, World};
pub use tick::tick;
