//! Procedural factories and level seeding
//!
//! Every `roll_*`/`make_*` factory is pure given its inputs and an RNG and
//! never looks at other entities. Placement safety (distance from the player,
//! keeping out of the central cell) is handled by `populate_level`.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::collision::{Rect, WorldBounds};
use super::entity::*;
use super::level::LevelParams;
use super::progression::{UpgradeKind, UpgradeLevels};
use super::state::World;
use super::structure::{Opening, Structure};
use crate::consts::*;
use crate::from_angle;

/// Color draw weights (%), cheapest color first
pub const FOOD_COLOR_WEIGHTS: [u32; 8] = [25, 20, 15, 13, 10, 8, 6, 3];
/// Size draw weights (%), smallest first
pub const FOOD_SIZE_WEIGHTS: [u32; 5] = [33, 27, 20, 13, 7];
/// Visual radius per size class
pub const FOOD_SIZE_RADII: [f32; 5] = [5.0, 7.0, 9.0, 11.0, 13.0];
pub const FOOD_MAX_XP: u32 = 128;

/// Killer saw table: (radius, damage, color)
pub const SAW_SIZES: [(f32, i32, SawColor); 5] = [
    (18.0, 1, SawColor::Silver),
    (26.0, 2, SawColor::Bronze),
    (34.0, 3, SawColor::Copper),
    (42.0, 4, SawColor::Crimson),
    (50.0, 5, SawColor::Black),
];
const SAW_SIZE_WEIGHTS: [u32; 5] = [30, 25, 20, 15, 10];

/// Health box heal values and weights
const HEALTH_BOX_TABLE: [(i32, u32); 3] = [(1, 60), (3, 30), (5, 10)];

/// Minimum spawn distance from the player at level start
const ENEMY_SAFE_DISTANCE: f32 = 400.0;
const SAW_SAFE_DISTANCE: f32 = 300.0;
/// Keep pickups this far from the world edge
const ITEM_MARGIN: f32 = 20.0;
/// Keep spawns this far from the central cell
const CELL_CLEARANCE: f32 = 30.0;

/// Index into `weights` drawn proportionally to each weight
pub fn weighted_index<R: Rng + ?Sized>(rng: &mut R, weights: &[u32]) -> usize {
    let total: u32 = weights.iter().sum();
    if total == 0 {
        return 0;
    }
    let mut roll = rng.random_range(0..total);
    for (i, &w) in weights.iter().enumerate() {
        if roll < w {
            return i;
        }
        roll -= w;
    }
    weights.len() - 1
}

/// XP of a food item: `base_xp × 2^size_index`, clamped to 1..=128
pub fn food_value(color: FoodColor, size_index: u8) -> u32 {
    (color.base_xp() << size_index.min(7)).clamp(1, FOOD_MAX_XP)
}

pub fn make_food(pos: Vec2, color: FoodColor, size_index: u8) -> Food {
    let size_index = size_index.min(4);
    Food {
        pos,
        value: food_value(color, size_index),
        color,
        size_class: size_index,
        radius: FOOD_SIZE_RADII[size_index as usize],
        alive: true,
    }
}

/// Weighted color and size, uniform position
pub fn roll_food<R: Rng + ?Sized>(rng: &mut R, bounds: &WorldBounds) -> Food {
    let color = FoodColor::ALL[weighted_index(rng, &FOOD_COLOR_WEIGHTS)];
    let size = weighted_index(rng, &FOOD_SIZE_WEIGHTS) as u8;
    let pos = random_point(rng, bounds, ITEM_MARGIN);
    make_food(pos, color, size)
}

/// Uniform point inside the playable band, `margin` in from its edge
pub fn random_point<R: Rng + ?Sized>(rng: &mut R, bounds: &WorldBounds, margin: f32) -> Vec2 {
    let area = bounds.playable().expand(-margin);
    Vec2::new(
        rng.random_range(area.min.x..=area.max.x),
        rng.random_range(area.min.y..=area.max.y),
    )
}

/// Tier that enemy upgrade rolls centre on
pub fn enemy_upgrade_tier(params: &LevelParams, admin: Option<u8>) -> u8 {
    let derived = ((params.level as f32) / 2.5).ceil() as u8;
    admin
        .unwrap_or_else(|| derived.max(params.enemy_upgrade_level))
        .min(10)
}

/// Axes an enemy can roll (head is player-only)
const ENEMY_AXES: [UpgradeKind; 6] = [
    UpgradeKind::Shield,
    UpgradeKind::Cannon,
    UpgradeKind::Speed,
    UpgradeKind::BulletSpeed,
    UpgradeKind::Magnet,
    UpgradeKind::Health,
];

/// Roll an enemy's upgrade profile around `tier`
pub fn roll_enemy_upgrades<R: Rng + ?Sized>(rng: &mut R, tier: u8) -> UpgradeLevels {
    let chance = (0.2 + tier as f64 * 0.08).min(1.0);
    let mut upgrades = UpgradeLevels::default();
    for kind in ENEMY_AXES {
        if rng.random_bool(chance) {
            let magnitude = tier as i32 + rng.random_range(-4..=4);
            upgrades.set(kind, magnitude.clamp(0, kind.max_level() as i32) as u8);
        }
    }
    upgrades
}

/// Enemy health from its health level
#[inline]
pub fn enemy_max_health(upgrades: &UpgradeLevels) -> i32 {
    2 + upgrades.health as i32 * 2
}

/// Shot cooldown shortened by bullet-speed level, never below 500 ms
#[inline]
pub fn enemy_shoot_cooldown(base_ms: f64, upgrades: &UpgradeLevels) -> f64 {
    (base_ms * (1.0 - upgrades.bullet_speed as f64 * 0.1)).max(500.0)
}

pub fn roll_enemy<R: Rng + ?Sized>(
    rng: &mut R,
    params: &LevelParams,
    admin_tier: Option<u8>,
    id: u32,
    pos: Vec2,
    now_ms: f64,
) -> EnemySnake {
    let heading = from_angle(rng.random_range(0.0..TAU));
    let length = rng.random_range(ENEMY_MIN_LENGTH..=ENEMY_MAX_LENGTH);
    let tier = enemy_upgrade_tier(params, admin_tier);
    let mut upgrades = roll_enemy_upgrades(rng, tier);

    let can_shoot = rng.random_range(0..100) < params.enemy_shoot_percent;
    if rng.random_range(0..100) < params.enemy_shield_percent {
        upgrades.shield = upgrades.shield.max(2);
    }

    let max_health = enemy_max_health(&upgrades);
    let shoot_cooldown_ms = enemy_shoot_cooldown(params.enemy_shoot_cooldown_ms, &upgrades);
    let speed = params.enemy_speed * (1.0 + 0.05 * upgrades.speed as f32);

    EnemySnake {
        id,
        body: Body::new(pos, heading, length, speed),
        health: Health::full(max_health),
        upgrades,
        speed,
        can_shoot,
        shoot_cooldown_ms,
        // Stagger first volleys
        next_shot_ms: now_ms + shoot_cooldown_ms * rng.random_range(0.5f64..1.0),
        xp: max_health as u64 * 10,
        stars_eaten: 0,
        marked_for_death: false,
    }
}

pub fn roll_saw<R: Rng + ?Sized>(rng: &mut R, pos: Vec2) -> KillerSaw {
    let (radius, damage, color) = SAW_SIZES[weighted_index(rng, &SAW_SIZE_WEIGHTS)];
    let heading = from_angle(rng.random_range(0.0..TAU));
    let spin = rng.random_range(0.05f32..0.15) * if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    KillerSaw {
        pos,
        vel: heading * rng.random_range(1.2f32..2.8),
        radius,
        damage,
        color,
        rotation: 0.0,
        spin,
    }
}

pub fn make_cannon<R: Rng + ?Sized>(rng: &mut R, pos: Vec2, now_ms: f64) -> FloatingCannon {
    FloatingCannon {
        pos,
        aim: rng.random_range(-std::f32::consts::PI..std::f32::consts::PI),
        next_fire_ms: now_ms + CANNON_FIRE_MS * rng.random_range(0.5f64..1.0),
        range: CANNON_RANGE,
        bullet_speed: CANNON_BULLET_SPEED,
        target_segment: None,
    }
}

pub fn make_resentful(id: u32, pos: Vec2, heading: Vec2) -> ResentfulSnake {
    ResentfulSnake {
        id,
        body: Body::new(pos, heading, RESENTFUL_LENGTH, RESENTFUL_SPEED),
        health: Health::full(RESENTFUL_HEALTH),
        speed: RESENTFUL_SPEED,
        chase_range: RESENTFUL_CHASE_RANGE,
        next_shot_ms: 0.0,
        respawns: 0,
    }
}

pub fn roll_health_box<R: Rng + ?Sized>(rng: &mut R, pos: Vec2) -> HealthBox {
    let weights = HEALTH_BOX_TABLE.map(|(_, w)| w);
    HealthBox {
        pos,
        heal: HEALTH_BOX_TABLE[weighted_index(rng, &weights)].0,
        pulse: rng.random_range(0.0..TAU),
        alive: true,
    }
}

/// Central cell with 1-4 sliding openings
pub fn roll_structure<R: Rng + ?Sized>(rng: &mut R, bounds: &WorldBounds) -> Structure {
    let footprint = Rect::from_center_size(bounds.center(), Vec2::splat(CELL_SIZE));
    let mut openings = [None; 4];
    for slot in openings.iter_mut() {
        if rng.random_bool(0.75) {
            *slot = Some(roll_opening(rng));
        }
    }
    if openings.iter().all(Option::is_none) {
        openings[rng.random_range(0..4)] = Some(roll_opening(rng));
    }
    Structure::new(footprint, openings)
}

fn roll_opening<R: Rng + ?Sized>(rng: &mut R) -> Opening {
    let gap = OPENING_GAP_FRACTION;
    Opening {
        position: rng.random_range(0.0..=(1.0 - gap)),
        gap,
        direction: if rng.random_bool(0.5) { 1.0 } else { -1.0 },
        speed: OPENING_SPEED * rng.random_range(0.75f32..1.25),
    }
}

/// Relocation point for an elite: 500-600 units from the player, away from
/// the world edge and the cell. Falls back after 20 failed attempts.
pub fn resentful_respawn_point<R: Rng + ?Sized>(
    rng: &mut R,
    bounds: &WorldBounds,
    structure: Option<&Structure>,
    player_head: Vec2,
) -> Vec2 {
    let area = bounds.playable().expand(-RESENTFUL_EDGE_MARGIN);
    for _ in 0..RESENTFUL_RESPAWN_ATTEMPTS {
        let angle = rng.random_range(0.0..TAU);
        let dist = rng.random_range(RESENTFUL_RESPAWN_MIN..=RESENTFUL_RESPAWN_MAX);
        let candidate = player_head + from_angle(angle) * dist;
        let blocked = structure.is_some_and(|s| s.covers(candidate, CELL_CLEARANCE));
        if area.contains(candidate) && !blocked {
            return candidate;
        }
    }

    // Farthest corner of the allowed area
    let corners = [
        area.min,
        Vec2::new(area.max.x, area.min.y),
        Vec2::new(area.min.x, area.max.y),
        area.max,
    ];
    corners
        .into_iter()
        .max_by(|a, b| {
            a.distance_squared(player_head)
                .total_cmp(&b.distance_squared(player_head))
        })
        .unwrap_or(area.center())
}

/// Draw points until one is outside the cell and satisfies `accept`, sharing
/// a retry budget across one population pass. Once the budget is spent the
/// next draw is taken unconstrained.
fn place<R: Rng + ?Sized>(
    rng: &mut R,
    bounds: &WorldBounds,
    structure: Option<&Structure>,
    margin: f32,
    budget: &mut u32,
    accept: impl Fn(Vec2) -> bool,
) -> Vec2 {
    while *budget > 0 {
        *budget -= 1;
        let p = random_point(rng, bounds, margin);
        let blocked = structure.is_some_and(|s| s.covers(p, CELL_CLEARANCE));
        if !blocked && accept(p) {
            return p;
        }
    }
    random_point(rng, bounds, margin)
}

/// Replacement food somewhere outside the cell
pub fn spawn_food(world: &mut World) {
    let bounds = world.bounds;
    let mut budget = 10;
    let pos = place(&mut world.rng, &bounds, world.structure.as_ref(), ITEM_MARGIN, &mut budget, |_| true);
    let mut food = roll_food(&mut world.rng, &bounds);
    food.pos = pos;
    world.foods.push(food);
}

/// Player start: between the cell and the bottom edge, heading right
pub fn player_start(bounds: &WorldBounds, has_cell: bool) -> Vec2 {
    let center = bounds.center();
    if !has_cell {
        return center;
    }
    let cell_bottom = center.y + CELL_SIZE * 0.5;
    let edge = bounds.size - bounds.border;
    Vec2::new(center.x, cell_bottom + (edge - cell_bottom) * 0.5)
}

/// Seed every collection for `world.params`. Collections must be empty.
pub fn populate_level(world: &mut World) {
    let params = world.params.clone();
    let bounds = world.bounds;
    let now = world.now_ms();

    world.structure = if params.central_cell {
        Some(roll_structure(&mut world.rng, &bounds))
    } else {
        None
    };

    let start = player_start(&bounds, world.structure.is_some());
    world.player = PlayerSnake::new(start, Vec2::X, world.progress.upgrades, params.player_speed);

    // Pickups just need to avoid the cell
    for _ in 0..params.xp_points {
        spawn_food(world);
    }
    for _ in 0..params.stars_needed.saturating_mul(2) {
        let mut budget = 10;
        let pos = place(&mut world.rng, &bounds, world.structure.as_ref(), ITEM_MARGIN, &mut budget, |_| true);
        world.stars.push(Star::loose(pos));
    }

    let mut budget = params.enemy_count.saturating_mul(10);
    for _ in 0..params.enemy_count {
        let id = world.next_entity_id();
        let pos = place(
            &mut world.rng,
            &bounds,
            world.structure.as_ref(),
            ITEM_MARGIN + HEAD_RADIUS,
            &mut budget,
            |p| p.distance(start) >= ENEMY_SAFE_DISTANCE,
        );
        let enemy = roll_enemy(&mut world.rng, &params, world.admin_enemy_tier, id, pos, now);
        world.enemies.push(enemy);
    }

    let mut budget = params.killer_saw_count.saturating_mul(10);
    for _ in 0..params.killer_saw_count {
        let pos = place(
            &mut world.rng,
            &bounds,
            world.structure.as_ref(),
            SAW_SIZES[4].0,
            &mut budget,
            |p| p.distance(start) >= SAW_SAFE_DISTANCE,
        );
        let saw = roll_saw(&mut world.rng, pos);
        world.saws.push(saw);
    }

    let mut budget = params.floating_cannon_count.saturating_mul(10);
    for _ in 0..params.floating_cannon_count {
        let pos = place(&mut world.rng, &bounds, world.structure.as_ref(), ITEM_MARGIN, &mut budget, |_| true);
        let cannon = make_cannon(&mut world.rng, pos, now);
        world.cannons.push(cannon);
    }

    let mut budget = params.health_box_count.saturating_mul(10);
    for _ in 0..params.health_box_count {
        let pos = place(&mut world.rng, &bounds, world.structure.as_ref(), ITEM_MARGIN, &mut budget, |_| true);
        let health_box = roll_health_box(&mut world.rng, pos);
        world.health_boxes.push(health_box);
    }

    for _ in 0..params.resentful_snake_count {
        let id = world.next_entity_id();
        let pos = resentful_respawn_point(&mut world.rng, &bounds, world.structure.as_ref(), start);
        let heading = crate::normalize_or(start - pos, Vec2::X);
        world.resentful.push(make_resentful(id, pos, heading));
    }
}
