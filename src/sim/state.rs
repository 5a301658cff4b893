//! Game state and core simulation types
//!
//! `World` owns every entity collection. It is owned by the tick scheduler
//! and handed by `&mut` to each update phase; nothing else mutates it.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::WorldBounds;
use super::entity::*;
use super::level::{LevelParams, resolve_level_params};
use super::progression::{DamageSource, Progress};
use super::spawn;
use super::structure::Structure;
use crate::consts::*;
use crate::from_angle;

/// Finite set of game states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, nothing simulated
    Menu,
    /// Level seeded, short countdown before control is handed over
    LevelIntro,
    /// Active gameplay
    Playing,
    /// Star quota reached on levels 1-24
    LevelComplete,
    /// Player died or hit a wall
    GameOver,
    /// Level 25 cleared
    GameComplete,
    /// Upgrade shop overlay; simulation suspended
    Shop,
}

impl GamePhase {
    /// Phases in which the tick does anything
    #[inline]
    pub fn is_simulating(self) -> bool {
        matches!(self, GamePhase::LevelIntro | GamePhase::Playing)
    }

    /// Phases where persistence calls are allowed
    #[inline]
    pub fn is_safe(self) -> bool {
        !self.is_simulating()
    }
}

/// Outcomes of a tick, drained by the driver afterwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    FoodEaten { xp: u64 },
    StarCollected { healed: bool },
    PlayerDamaged { amount: i32, source: DamageSource },
    PlayerDodged { source: DamageSource },
    PlayerHealed { amount: i32 },
    PlayerFired { bullets: usize },
    EnemyKilled { id: u32, by_player: bool },
    /// Elite touched the player and was sent away
    ResentfulDuel { id: u32 },
    ResentfulShotDown { id: u32 },
    LevelCleared { level: u32, xp: u64, stars: u32 },
    PlayerDied { cause: DamageSource },
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct World {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub phase: GamePhase,
    /// Ticks simulated since the level began
    pub time_ticks: u64,
    /// Countdown while in `LevelIntro`
    pub intro_ticks: u32,
    pub params: LevelParams,
    pub bounds: WorldBounds,
    pub progress: Progress,
    /// Explicit enemy upgrade tier from settings, if any
    pub admin_enemy_tier: Option<u8>,
    pub player: PlayerSnake,
    pub enemies: Vec<EnemySnake>,
    pub resentful: Vec<ResentfulSnake>,
    pub bullets: Vec<Bullet>,
    pub saws: Vec<KillerSaw>,
    pub cannons: Vec<FloatingCannon>,
    pub health_boxes: Vec<HealthBox>,
    pub foods: Vec<Food>,
    pub stars: Vec<Star>,
    /// Visual particles (not gameplay-affecting)
    pub particles: Vec<Particle>,
    pub structure: Option<Structure>,
    /// Smoothed camera centre
    pub camera: Vec2,
    pub events: Vec<GameEvent>,
    next_id: u32,
    next_group_id: u32,
}

impl World {
    /// Empty world sitting in the menu
    pub fn new(seed: u64, progress: Progress) -> Self {
        let params = resolve_level_params(progress.level, None);
        let bounds = WorldBounds::new(BASE_UNIT * params.map_size as f32, BORDER_WIDTH);
        let player = PlayerSnake::new(bounds.center(), Vec2::X, progress.upgrades, params.player_speed);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Menu,
            time_ticks: 0,
            intro_ticks: 0,
            params,
            bounds,
            progress,
            admin_enemy_tier: None,
            camera: player.head(),
            player,
            enemies: Vec::new(),
            resentful: Vec::new(),
            bullets: Vec::new(),
            saws: Vec::new(),
            cannons: Vec::new(),
            health_boxes: Vec::new(),
            foods: Vec::new(),
            stars: Vec::new(),
            particles: Vec::new(),
            structure: None,
            events: Vec::new(),
            next_id: 1,
            next_group_id: 1,
        }
    }

    /// Logical time since level start
    #[inline]
    pub fn now_ms(&self) -> f64 {
        self.time_ticks as f64 * TICK_MS
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Allocate a star group for one enemy death
    pub fn next_group_id(&mut self) -> u32 {
        let id = self.next_group_id;
        self.next_group_id += 1;
        id
    }

    /// Drop every transient collection
    pub fn clear_entities(&mut self) {
        self.enemies.clear();
        self.resentful.clear();
        self.bullets.clear();
        self.saws.clear();
        self.cannons.clear();
        self.health_boxes.clear();
        self.foods.clear();
        self.stars.clear();
        self.particles.clear();
        self.structure = None;
        self.events.clear();
    }

    /// Reset and seed a level from `params`, entering the intro
    pub fn begin_level(&mut self, params: LevelParams) {
        self.clear_entities();
        self.bounds = WorldBounds::new(BASE_UNIT * params.map_size as f32, BORDER_WIDTH);
        self.params = params;
        self.time_ticks = 0;
        spawn::populate_level(self);
        self.camera = self.player.head();
        self.phase = GamePhase::LevelIntro;
        self.intro_ticks = INTRO_TICKS;
        log::info!(
            "Level {} seeded: {} enemies, {} food, {} stars needed",
            self.params.level,
            self.enemies.len(),
            self.foods.len(),
            self.params.stars_needed
        );
    }

    /// Remove tomb-stoned entities. Runs once per tick, after every phase.
    pub fn compact(&mut self) {
        self.enemies.retain(|e| !e.marked_for_death);
        self.bullets.retain(|b| b.alive);
        self.health_boxes.retain(|b| b.alive);
        self.foods.retain(|f| f.alive);
        self.stars.retain(|s| s.alive);
        self.particles.retain(|p| p.life > 0.0);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Spray `count` particles from `pos`
    pub fn burst(&mut self, pos: Vec2, color: u32, count: usize) {
        let room = MAX_PARTICLES.saturating_sub(self.particles.len());
        for _ in 0..count.min(room) {
            let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
            let speed: f32 = self.rng.random_range(0.5..3.0);
            self.particles.push(Particle {
                pos,
                vel: from_angle(angle) * speed,
                color,
                life: self.rng.random_range(0.6..1.0),
                size: self.rng.random_range(2.0..5.0),
            });
        }
    }
}
