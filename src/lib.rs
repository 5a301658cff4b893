//! Serpent Siege - simulation core for a top-down arcade snake shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, spawning, per-tick update, progression)
//! - `scheduler`: Fixed-step tick driver and the player's fire timer
//! - `game`: Top-level driver wiring the state machine to external sinks
//! - `platform`: Input intent and clock abstraction
//! - `persistence`: Progress/session records and storage sinks
//! - `telemetry`: Fire-and-forget analytics events

pub mod error;
pub mod game;
pub mod persistence;
pub mod platform;
pub mod scheduler;
pub mod settings;
pub mod sim;
pub mod telemetry;

pub use error::{ActionError, ConfigError, StoreError};
pub use game::Game;
pub use scheduler::TickScheduler;
pub use settings::{Settings, SkinId};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Logical simulation rate
    pub const TICK_HZ: u32 = 60;
    /// Logical milliseconds per tick
    pub const TICK_MS: f64 = 1000.0 / TICK_HZ as f64;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 5;
    /// Frame gaps longer than this are clamped (tab switch, debugger)
    pub const MAX_FRAME_MS: f64 = 250.0;

    /// World side = BASE_UNIT * map_size
    pub const BASE_UNIT: f32 = 100.0;
    /// Width of the damaging/reflective band along each world edge
    pub const BORDER_WIDTH: f32 = 40.0;
    /// Highest level in the campaign
    pub const MAX_LEVEL: u32 = 25;

    /// Snake geometry
    pub const HEAD_RADIUS: f32 = 15.0;
    pub const BODY_RADIUS: f32 = 12.0;

    /// Pickup radii
    pub const FOOD_PICKUP_RADIUS: f32 = 18.0;
    pub const STAR_PICKUP_RADIUS: f32 = 20.0;
    pub const HEALTH_BOX_RADIUS: f32 = 20.0;

    /// Player defaults
    pub const PLAYER_START_LENGTH: usize = 12;
    pub const PLAYER_BASE_HEALTH: i32 = 5;
    pub const PLAYER_HEALTH_PER_LEVEL: i32 = 2;
    pub const BORDER_DAMAGE: i32 = 1;
    pub const INVULNERABLE_TICKS: u32 = 45;
    pub const FLASH_TICKS: u32 = 12;
    /// Segments added (net) per food eaten
    pub const FOOD_GROWTH: usize = 4;
    /// Steering blend factors
    pub const POINTER_BLEND: f32 = 0.15;
    pub const JOYSTICK_BLEND: f32 = 0.5;
    /// Camera follow smoothing
    pub const CAMERA_SMOOTHING: f32 = 0.12;
    /// Magnet reach per level and peak pull (units/tick)
    pub const MAGNET_RANGE_PER_LEVEL: f32 = 25.0;
    pub const MAGNET_PULL: f32 = 6.0;

    /// Player bullets
    pub const PLAYER_BULLET_BASE_SPEED: f32 = 8.0;
    pub const PLAYER_BULLET_SPEED_PER_LEVEL: f32 = 0.8;
    pub const PLAYER_BULLET_LIFETIME: u32 = 80;
    pub const PLAYER_FIRE_BASE_MS: f64 = 500.0;
    pub const PLAYER_FIRE_MIN_MS: f64 = 120.0;

    /// Enemy bullets
    pub const ENEMY_BULLET_BASE_SPEED: f32 = 5.0;
    pub const ENEMY_BULLET_SPEED_PER_LEVEL: f32 = 0.5;
    pub const ENEMY_BULLET_LIFETIME: u32 = 110;
    pub const ENEMY_FIRE_MIN_RANGE: f32 = 50.0;
    pub const ENEMY_FIRE_MAX_RANGE: f32 = 500.0;
    /// Sideways offset between the two barrels of a "double" shot
    pub const DOUBLE_SHOT_OFFSET: f32 = 6.0;

    /// Bullet hit tests
    pub const BULLET_HEAD_RADIUS: f32 = 15.0;
    pub const BULLET_BODY_RADIUS: f32 = 12.0;
    pub const PLAYER_BULLET_HEAD_DAMAGE: i32 = 2;
    pub const PLAYER_BULLET_BODY_DAMAGE: i32 = 1;
    pub const RESENTFUL_HEAD_DAMAGE: i32 = 3;
    pub const RESENTFUL_BODY_DAMAGE: i32 = 1;
    pub const ENEMY_BULLET_DAMAGE: i32 = 1;

    /// Enemy AI
    pub const ENEMY_FLEE_RANGE: f32 = 150.0;
    pub const ENEMY_PANIC_RANGE: f32 = 80.0;
    pub const ENEMY_STAR_SEEK_RANGE: f32 = 600.0;
    pub const ENEMY_SEPARATION_RANGE: f32 = 60.0;
    pub const ENEMY_WANDER_CHANCE: f64 = 0.01;
    pub const ENEMY_CONTACT_DAMAGE: i32 = 1;
    pub const ENEMY_PUSH_BACK: f32 = 30.0;
    pub const ENEMY_MIN_LENGTH: usize = 15;
    pub const ENEMY_MAX_LENGTH: usize = 35;

    /// Resentful snake (elite)
    pub const RESENTFUL_SPEED: f32 = 4.5;
    pub const RESENTFUL_HEALTH: i32 = 10;
    pub const RESENTFUL_CHASE_RANGE: f32 = 700.0;
    pub const RESENTFUL_FIRE_MS: f64 = 900.0;
    pub const RESENTFUL_SPREAD: f32 = 0.12;
    pub const RESENTFUL_LENGTH: usize = 30;
    pub const RESENTFUL_EDGE_MARGIN: f32 = 200.0;
    pub const RESENTFUL_RESPAWN_MIN: f32 = 500.0;
    pub const RESENTFUL_RESPAWN_MAX: f32 = 600.0;
    pub const RESENTFUL_RESPAWN_ATTEMPTS: u32 = 20;
    pub const RESENTFUL_BASE_TURN: f32 = 0.05;

    /// Hazards
    pub const SAW_KNOCKBACK: f32 = 45.0;
    pub const CANNON_RANGE: f32 = 550.0;
    pub const CANNON_BULLET_SPEED: f32 = 6.0;
    pub const CANNON_FIRE_MS: f64 = 1800.0;
    pub const CANNON_TURN_RATE: f32 = 0.06;
    pub const CANNON_SPREAD: f32 = 0.15;
    pub const CANNON_TARGET_SEGMENTS: usize = 6;

    /// Central cell
    pub const CELL_SIZE: f32 = 600.0;
    pub const WALL_THICKNESS: f32 = 20.0;
    /// Gap left between a pushed-out body and the wall face
    pub const WALL_CLEARANCE: f32 = 0.5;
    pub const OPENING_GAP_FRACTION: f32 = 0.22;
    pub const OPENING_SPEED: f32 = 0.004;

    /// Level intro countdown
    pub const INTRO_TICKS: u32 = 90;

    /// Maximum particles
    pub const MAX_PARTICLES: usize = 400;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn wrap_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector pointing along `angle`
#[inline]
pub fn from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Heading angle of a vector
#[inline]
pub fn angle_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

#[inline]
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Normalize `v`, or return `fallback` when `v` is too short (or not finite)
#[inline]
pub fn normalize_or(v: Vec2, fallback: Vec2) -> Vec2 {
    let len = v.length();
    if !len.is_finite() || len < 1e-6 {
        fallback
    } else {
        v / len
    }
}

/// Blend `current` toward `target` by `factor`, then re-normalize.
///
/// Shared by player steering and every AI rule. Degenerate blends (opposite
/// vectors cancelling out, zero targets) keep the current heading so the
/// direction never drifts to zero or NaN.
pub fn blend_direction(current: Vec2, target: Vec2, factor: f32) -> Vec2 {
    let current = normalize_or(current, Vec2::X);
    let target = normalize_or(target, current);
    let blended = current + (target - current) * factor.clamp(0.0, 1.0);
    normalize_or(blended, current)
}

/// Step an angle toward a target angle by at most `max_step` radians
pub fn rotate_toward_angle(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = wrap_angle(target - current);
    wrap_angle(current + delta.clamp(-max_step, max_step))
}
