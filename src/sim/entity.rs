//! Entity records for every simulated actor
//!
//! Plain data plus small invariant-keeping helpers. Behaviour lives in the
//! tick phases; spawning lives in `spawn`.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::progression::UpgradeLevels;
use crate::consts::*;
use crate::normalize_or;

/// Segment chain shared by every snake. Head is index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub segments: VecDeque<Vec2>,
    /// Unit movement direction
    pub direction: Vec2,
}

impl Body {
    /// Lay out `length` segments trailing behind `head`, `spacing` apart
    pub fn new(head: Vec2, direction: Vec2, length: usize, spacing: f32) -> Self {
        let direction = normalize_or(direction, Vec2::X);
        let segments = (0..length.max(1))
            .map(|i| head - direction * spacing * i as f32)
            .collect();
        Self { segments, direction }
    }

    #[inline]
    pub fn head(&self) -> Vec2 {
        // Length >= 1 is an invariant of every body
        self.segments.front().copied().unwrap_or(Vec2::ZERO)
    }

    #[inline]
    pub fn tail(&self) -> Vec2 {
        self.segments.back().copied().unwrap_or(Vec2::ZERO)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Direction the tail is trailing off in (from its neighbour outward)
    pub fn tail_direction(&self) -> Vec2 {
        let n = self.segments.len();
        if n < 2 {
            return -self.direction;
        }
        normalize_or(self.segments[n - 1] - self.segments[n - 2], -self.direction)
    }

    /// Push a new head position
    pub fn push_head(&mut self, head: Vec2) {
        self.segments.push_front(head);
    }

    /// Drop the last segment, never below one
    pub fn trim_tail(&mut self) {
        if self.segments.len() > 1 {
            self.segments.pop_back();
        }
    }

    /// Duplicate the tail `count` times
    pub fn grow_tail(&mut self, count: usize) {
        let tail = self.tail();
        for _ in 0..count {
            self.segments.push_back(tail);
        }
    }

    /// Move the whole chain by `offset` (knockback, respawn)
    pub fn translate(&mut self, offset: Vec2) {
        for segment in self.segments.iter_mut() {
            *segment += offset;
        }
    }

    /// Body segments (everything after the head) with their indices
    pub fn body_segments(&self) -> impl Iterator<Item = (usize, Vec2)> + '_ {
        self.segments.iter().copied().enumerate().skip(1)
    }
}

/// Health pool clamped to `[0, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn full(max: i32) -> Self {
        let max = max.max(1);
        Self { current: max, max }
    }

    /// Subtract damage, clamped at zero. Returns true if this took the pool to zero.
    pub fn damage(&mut self, amount: i32) -> bool {
        let before = self.current;
        self.current = (self.current - amount.max(0)).max(0);
        before > 0 && self.current == 0
    }

    /// Restore up to `amount`, clamped at max. Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (self.current + amount.max(0)).min(self.max);
        self.current - before
    }

    pub fn refill(&mut self) {
        self.current = self.max;
    }

    /// Change max, keeping current within bounds
    pub fn set_max(&mut self, max: i32) {
        self.max = max.max(1);
        self.current = self.current.min(self.max);
    }

    #[inline]
    pub fn is_depleted(&self) -> bool {
        self.current <= 0
    }
}

/// The player's snake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnake {
    pub body: Body,
    pub health: Health,
    pub upgrades: UpgradeLevels,
    /// XP earned this level attempt
    pub session_xp: u64,
    /// Stars collected this level attempt
    pub session_stars: u32,
    pub damage_flash: u32,
    pub heal_flash: u32,
    /// Ticks of damage immunity left
    pub invulnerable: u32,
}

impl PlayerSnake {
    pub fn new(head: Vec2, direction: Vec2, upgrades: UpgradeLevels, speed: f32) -> Self {
        Self {
            body: Body::new(head, direction, PLAYER_START_LENGTH, speed),
            health: Health::full(player_max_health(&upgrades)),
            upgrades,
            session_xp: 0,
            session_stars: 0,
            damage_flash: 0,
            heal_flash: 0,
            invulnerable: 0,
        }
    }

    #[inline]
    pub fn head(&self) -> Vec2 {
        self.body.head()
    }

    /// Apply damage unless invulnerable. Returns true if damage landed.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if self.invulnerable > 0 || amount <= 0 {
            return false;
        }
        self.health.damage(amount);
        self.damage_flash = FLASH_TICKS;
        self.invulnerable = INVULNERABLE_TICKS;
        true
    }

    /// Heal and flash. Returns the amount restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let healed = self.health.heal(amount);
        if healed > 0 {
            self.heal_flash = FLASH_TICKS;
        }
        healed
    }

    /// Re-derive max health from the live upgrade levels
    pub fn sync_max_health(&mut self) {
        let max = player_max_health(&self.upgrades);
        let gained = max - self.health.max;
        self.health.set_max(max);
        if gained > 0 {
            self.health.heal(gained);
        }
    }
}

/// Max health granted by the health upgrade
pub fn player_max_health(upgrades: &UpgradeLevels) -> i32 {
    PLAYER_BASE_HEALTH + upgrades.health as i32 * PLAYER_HEALTH_PER_LEVEL
}

/// Autonomous hostile snake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySnake {
    pub id: u32,
    pub body: Body,
    pub health: Health,
    /// Rolled upgrade profile (head level unused)
    pub upgrades: UpgradeLevels,
    pub speed: f32,
    pub can_shoot: bool,
    pub shoot_cooldown_ms: f64,
    /// Logical time of the next allowed shot
    pub next_shot_ms: f64,
    /// XP eaten so far; drives the growth-based health path
    pub xp: u64,
    pub stars_eaten: u32,
    /// Tombstone; set once, processed once
    pub marked_for_death: bool,
}

/// Elite chaser that respawns instead of dying
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResentfulSnake {
    pub id: u32,
    pub body: Body,
    pub health: Health,
    pub speed: f32,
    pub chase_range: f32,
    pub next_shot_ms: f64,
    /// Number of times it has been relocated
    pub respawns: u32,
}

/// Who fired a bullet, which decides what it can hurt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletOwner {
    Player,
    Enemy,
    Cannon,
}

impl BulletOwner {
    /// Player bullets hurt hostiles; everything else hurts the player
    #[inline]
    pub fn hits_player(self) -> bool {
        !matches!(self, BulletOwner::Player)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Remaining lifetime in ticks
    pub life: u32,
    pub owner: BulletOwner,
    pub alive: bool,
}

impl Bullet {
    pub fn new(pos: Vec2, dir: Vec2, speed: f32, life: u32, owner: BulletOwner) -> Self {
        Self {
            pos,
            vel: normalize_or(dir, Vec2::X) * speed,
            life,
            owner,
            alive: true,
        }
    }
}

/// Saw color, one per size class (visual only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SawColor {
    Silver,
    Bronze,
    Copper,
    Crimson,
    Black,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillerSaw {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Contact damage (1-5), fixed by size
    pub damage: i32,
    pub color: SawColor,
    /// Visual spin state
    pub rotation: f32,
    pub spin: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingCannon {
    pub pos: Vec2,
    /// Current aim (radians)
    pub aim: f32,
    pub next_fire_ms: f64,
    pub range: f32,
    pub bullet_speed: f32,
    /// Player segment index currently being tracked
    pub target_segment: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthBox {
    pub pos: Vec2,
    /// Healing points (1, 3 or 5)
    pub heal: i32,
    /// Pulse animation phase
    pub pulse: f32,
    pub alive: bool,
}

/// Food color tier, ordered from least to most valuable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoodColor {
    Red,
    Orange,
    Yellow,
    Lime,
    Green,
    Cyan,
    Blue,
    Purple,
}

impl FoodColor {
    pub const ALL: [FoodColor; 8] = [
        FoodColor::Red,
        FoodColor::Orange,
        FoodColor::Yellow,
        FoodColor::Lime,
        FoodColor::Green,
        FoodColor::Cyan,
        FoodColor::Blue,
        FoodColor::Purple,
    ];

    /// XP of the smallest food of this color
    pub fn base_xp(self) -> u32 {
        match self {
            FoodColor::Red => 1,
            FoodColor::Orange => 2,
            FoodColor::Yellow => 3,
            FoodColor::Lime => 4,
            FoodColor::Green => 5,
            FoodColor::Cyan => 6,
            FoodColor::Blue => 7,
            FoodColor::Purple => 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub pos: Vec2,
    pub value: u32,
    pub color: FoodColor,
    /// Size index 0-4
    pub size_class: u8,
    pub radius: f32,
    pub alive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Star {
    pub pos: Vec2,
    /// Set only for stars dropped by a dead enemy
    pub group_id: Option<u32>,
    pub healed_already: bool,
    pub alive: bool,
}

impl Star {
    pub fn loose(pos: Vec2) -> Self {
        Self {
            pos,
            group_id: None,
            healed_already: false,
            alive: true,
        }
    }
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: u32,
    /// Seconds left
    pub life: f32,
    pub size: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_body_layout_trails_behind_head() {
        let body = Body::new(Vec2::new(100.0, 100.0), Vec2::X, 5, 3.0);
        assert_eq!(body.len(), 5);
        assert_eq!(body.head(), Vec2::new(100.0, 100.0));
        assert_eq!(body.tail(), Vec2::new(88.0, 100.0));
        assert_eq!(body.tail_direction(), -Vec2::X);
    }

    #[test]
    fn test_trim_never_empties() {
        let mut body = Body::new(Vec2::ZERO, Vec2::X, 1, 1.0);
        body.trim_tail();
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_health_clamps() {
        let mut hp = Health::full(5);
        assert_eq!(hp.heal(3), 0);
        assert!(!hp.damage(2));
        assert!(hp.damage(10));
        assert_eq!(hp.current, 0);
        // Already at zero: no second "depleted" edge
        assert!(!hp.damage(1));
    }

    #[test]
    fn test_player_invulnerability_blocks_damage() {
        let mut player = PlayerSnake::new(Vec2::ZERO, Vec2::X, UpgradeLevels::default(), 3.0);
        assert!(player.take_damage(1));
        assert!(!player.take_damage(1));
        assert_eq!(player.health.current, player.health.max - 1);
    }

    #[test]
    fn test_sync_max_health_grants_new_points() {
        let mut player = PlayerSnake::new(Vec2::ZERO, Vec2::X, UpgradeLevels::default(), 3.0);
        player.health.damage(2);
        player.upgrades.health = 1;
        player.sync_max_health();
        assert_eq!(player.health.max, PLAYER_BASE_HEALTH + PLAYER_HEALTH_PER_LEVEL);
        assert_eq!(player.health.current, player.health.max - 2);
    }

    proptest! {
        #[test]
        fn health_stays_in_bounds(
            max in 1i32..30,
            ops in prop::collection::vec((any::<bool>(), 0i32..8), 0..40),
        ) {
            let mut hp = Health::full(max);
            let mut depleted_edges = 0;
            for (is_damage, amount) in ops {
                if is_damage {
                    if hp.damage(amount) {
                        depleted_edges += 1;
                    }
                } else {
                    hp.heal(amount);
                }
                prop_assert!(hp.current >= 0 && hp.current <= hp.max);
                if hp.is_depleted() {
                    break;
                }
            }
            prop_assert!(depleted_edges <= 1);
        }
    }
}
