//! Upgrades, currency and the level-outcome transitions
//!
//! Session XP/stars live on the player snake and only become lifetime
//! currency when a level is cleared. Lifetime XP buys upgrades in the shop.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{GameEvent, GamePhase, World};
use crate::consts::MAX_LEVEL;
use crate::error::ActionError;

/// Every purchasable capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    Shield,
    Magnet,
    Cannon,
    Speed,
    BulletSpeed,
    Head,
    Health,
}

/// Per-kind limits and pricing
#[derive(Debug, Clone, Copy)]
struct UpgradeInfo {
    max_level: u8,
    base_price: u64,
}

/// Indexed by `UpgradeKind as usize`
const UPGRADE_TABLE: [UpgradeInfo; 7] = [
    UpgradeInfo { max_level: 10, base_price: 120 }, // Shield
    UpgradeInfo { max_level: 10, base_price: 60 },  // Magnet
    UpgradeInfo { max_level: 5, base_price: 250 },  // Cannon
    UpgradeInfo { max_level: 10, base_price: 80 },  // Speed
    UpgradeInfo { max_level: 10, base_price: 90 },  // BulletSpeed
    UpgradeInfo { max_level: 10, base_price: 150 }, // Head
    UpgradeInfo { max_level: 10, base_price: 100 }, // Health
];

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 7] = [
        UpgradeKind::Shield,
        UpgradeKind::Magnet,
        UpgradeKind::Cannon,
        UpgradeKind::Speed,
        UpgradeKind::BulletSpeed,
        UpgradeKind::Head,
        UpgradeKind::Health,
    ];

    #[inline]
    fn info(self) -> UpgradeInfo {
        UPGRADE_TABLE[self as usize]
    }

    pub fn max_level(self) -> u8 {
        self.info().max_level
    }

    /// Lifetime XP needed to go from `current` to `current + 1`
    pub fn price(self, current: u8) -> u64 {
        self.info().base_price * (current as u64 + 1)
    }
}

/// Upgrade levels for a snake (0-10, cannon 0-5)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeLevels {
    pub shield: u8,
    pub magnet: u8,
    pub cannon: u8,
    pub speed: u8,
    pub bullet_speed: u8,
    pub head: u8,
    pub health: u8,
}

impl UpgradeLevels {
    pub fn get(&self, kind: UpgradeKind) -> u8 {
        match kind {
            UpgradeKind::Shield => self.shield,
            UpgradeKind::Magnet => self.magnet,
            UpgradeKind::Cannon => self.cannon,
            UpgradeKind::Speed => self.speed,
            UpgradeKind::BulletSpeed => self.bullet_speed,
            UpgradeKind::Head => self.head,
            UpgradeKind::Health => self.health,
        }
    }

    fn slot_mut(&mut self, kind: UpgradeKind) -> &mut u8 {
        match kind {
            UpgradeKind::Shield => &mut self.shield,
            UpgradeKind::Magnet => &mut self.magnet,
            UpgradeKind::Cannon => &mut self.cannon,
            UpgradeKind::Speed => &mut self.speed,
            UpgradeKind::BulletSpeed => &mut self.bullet_speed,
            UpgradeKind::Head => &mut self.head,
            UpgradeKind::Health => &mut self.health,
        }
    }

    /// Set a level, clamped to the kind's max
    pub fn set(&mut self, kind: UpgradeKind, level: u8) {
        *self.slot_mut(kind) = level.min(kind.max_level());
    }

    /// Every level set to `floor` (clamped per kind)
    pub fn at_floor(floor: u8) -> Self {
        let mut levels = Self::default();
        for kind in UpgradeKind::ALL {
            levels.set(kind, floor);
        }
        levels
    }

    /// XP multiplier from the head upgrade
    pub fn xp_multiplier(&self) -> f64 {
        1.0 + self.head.saturating_sub(1) as f64 * 0.1
    }

    /// Magnet reach in world units (0 when not upgraded)
    pub fn magnet_range(&self) -> f32 {
        crate::consts::MAGNET_RANGE_PER_LEVEL * self.magnet as f32
    }
}

/// Persistent, cross-level progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Level the next `begin` will start (1-25)
    pub level: u32,
    pub lifetime_xp: u64,
    pub lifetime_stars: u64,
    pub upgrades: UpgradeLevels,
    /// Minimum level of every upgrade after rebirths
    pub upgrade_floor: u8,
    pub rebirths: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            level: 1,
            lifetime_xp: 0,
            lifetime_stars: 0,
            upgrades: UpgradeLevels::default(),
            upgrade_floor: 0,
            rebirths: 0,
        }
    }
}

impl Progress {
    /// Move session currency into lifetime totals and advance the level.
    /// Returns true when the final level was just cleared.
    pub fn bank(&mut self, session_xp: u64, session_stars: u32) -> bool {
        self.lifetime_xp += session_xp;
        self.lifetime_stars += session_stars as u64;
        let finished = self.level >= MAX_LEVEL;
        self.level = (self.level + 1).min(MAX_LEVEL);
        finished
    }

    /// Buy one level of `kind` with lifetime XP. Returns the new level.
    pub fn purchase(&mut self, kind: UpgradeKind) -> Result<u8, ActionError> {
        let current = self.upgrades.get(kind);
        if current >= kind.max_level() {
            return Err(ActionError::MaxLevel(kind));
        }
        let price = kind.price(current);
        if self.lifetime_xp < price {
            return Err(ActionError::InsufficientXp {
                required: price,
                available: self.lifetime_xp,
            });
        }
        self.lifetime_xp -= price;
        self.upgrades.set(kind, current + 1);
        Ok(current + 1)
    }

    /// Start over from level 1 with a higher upgrade floor
    pub fn rebirth(&mut self) {
        self.rebirths += 1;
        self.upgrade_floor = self.rebirths.min(10) as u8;
        self.upgrades = UpgradeLevels::at_floor(self.upgrade_floor);
        self.level = 1;
        self.lifetime_xp = 0;
        self.lifetime_stars = 0;
    }
}

/// Shield dodge roll: `(k-1)/k` for shield level k, zero without a shield
pub fn shield_dodge(shield_level: u8, roll: f64) -> bool {
    if shield_level == 0 {
        return false;
    }
    let k = shield_level as f64;
    roll < (k - 1.0) / k
}

/// Star quota reached: bank the session and leave `Playing`.
/// Returns true if the transition fired.
pub fn check_level_clear(world: &mut World) -> bool {
    if world.phase != GamePhase::Playing {
        return false;
    }
    let player = &world.player;
    if player.session_stars < world.params.stars_needed {
        return false;
    }

    let level = world.params.level;
    let session_xp = player.session_xp;
    let session_stars = player.session_stars;
    let finished = world.progress.bank(session_xp, session_stars);

    world.phase = if finished {
        GamePhase::GameComplete
    } else {
        GamePhase::LevelComplete
    };
    world.events.push(GameEvent::LevelCleared {
        level,
        xp: session_xp,
        stars: session_stars,
    });
    log::info!("Level {level} cleared ({session_stars} stars, {session_xp} xp) -> {:?}", world.phase);
    true
}

/// Fire the game-over transition exactly once
pub fn kill_player(world: &mut World, cause: DamageSource) {
    if world.phase != GamePhase::Playing {
        return;
    }
    world.player.health.current = 0;
    world.phase = GamePhase::GameOver;
    world.events.push(GameEvent::PlayerDied { cause });
    log::info!("Player died on level {} ({cause:?})", world.params.level);
}

/// Route a hit to the player: invulnerability, then the shield roll when
/// `dodgeable`, then damage and the death check. Returns true if it landed.
pub fn damage_player(world: &mut World, amount: i32, source: DamageSource, dodgeable: bool) -> bool {
    if world.phase != GamePhase::Playing || world.player.invulnerable > 0 {
        return false;
    }
    if dodgeable {
        let roll = world.rng.random::<f64>();
        if shield_dodge(world.player.upgrades.shield, roll) {
            world.events.push(GameEvent::PlayerDodged { source });
            return false;
        }
    }
    if !world.player.take_damage(amount) {
        return false;
    }
    world.events.push(GameEvent::PlayerDamaged { amount, source });
    check_player_death(world, source);
    true
}

/// If health ran out this step, transition to game over
pub fn check_player_death(world: &mut World, cause: DamageSource) -> bool {
    if world.player.health.is_depleted() {
        kill_player(world, cause);
        true
    } else {
        false
    }
}

/// What hurt (or killed) the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageSource {
    Border,
    Wall,
    Enemy,
    Bullet,
    Saw,
}
