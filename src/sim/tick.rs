//! Fixed timestep simulation tick
//!
//! One call advances the world by one logical unit of motion. The player
//! phase lives here; enemies, combat and hazards have their own modules and
//! run afterwards in a fixed order. Any terminal transition (level clear,
//! game over) ends the tick early so the two can never both fire.

use glam::Vec2;
use rand::Rng;

use super::collision::{WorldBounds, reflect_in_rect};
use super::combat;
use super::enemy;
use super::entity::Body;
use super::hazards;
use super::progression::{DamageSource, check_level_clear, damage_player, kill_player};
use super::spawn;
use super::state::{GameEvent, GamePhase, World};
use super::structure::Structure;
use crate::blend_direction;
use crate::consts::*;
use crate::platform::InputIntent;

/// Particle life lost per tick (seconds)
const PARTICLE_DECAY: f32 = 1.0 / TICK_HZ as f32;
const PARTICLE_DRAG: f32 = 0.95;

/// Advance the world by one fixed tick
pub fn tick(world: &mut World, input: &InputIntent) {
    match world.phase {
        GamePhase::LevelIntro => {
            world.intro_ticks = world.intro_ticks.saturating_sub(1);
            if world.intro_ticks == 0 {
                world.phase = GamePhase::Playing;
                log::debug!("Level {} intro finished", world.params.level);
            }
            return;
        }
        GamePhase::Playing => {}
        _ => return,
    }

    update_player(world, input);

    if world.phase == GamePhase::Playing {
        enemy::update_enemies(world);
    }
    if world.phase == GamePhase::Playing {
        combat::update_bullets(world);
    }
    if world.phase == GamePhase::Playing {
        combat::update_enemy_fire(world);
    }
    if world.phase == GamePhase::Playing {
        hazards::update_hazards(world);
    }

    decay_effects(world);
    world.compact();
    world.time_ticks += 1;
}

/// Steps 1-8: openings, steering, border, walls, head, pickups, trim, clear
fn update_player(world: &mut World, input: &InputIntent) {
    // Openings stall while any player segment sits in the gap
    if let Some(structure) = world.structure.as_mut() {
        let segments = &world.player.body.segments;
        structure.update_openings(|gap| {
            segments
                .iter()
                .any(|&s| gap.intersects_circle(s, BODY_RADIUS))
        });
    }

    let player = &mut world.player;
    if !input.is_neutral() {
        player.body.direction =
            blend_direction(player.body.direction, input.direction, input.steering_blend());
    }
    let speed = world.params.player_speed * input.speed_factor(player.upgrades.speed);
    let mut head = player.head() + player.body.direction * speed;

    if world.bounds.in_border(head, HEAD_RADIUS) {
        damage_player(world, BORDER_DAMAGE, DamageSource::Border, true);
        if world.phase != GamePhase::Playing {
            return;
        }
        head = world.bounds.clamp_inside(head, HEAD_RADIUS);
    }

    let hits_wall = world
        .structure
        .as_ref()
        .is_some_and(|s| s.blocking_wall(head, HEAD_RADIUS).is_some());
    if hits_wall {
        kill_player(world, DamageSource::Wall);
        return;
    }

    world.player.body.push_head(head);
    world.camera += (head - world.camera) * CAMERA_SMOOTHING;
    apply_magnet(world, head);

    let ate = collect_food(world, head);
    collect_stars(world, head);

    if ate {
        world.player.body.grow_tail(FOOD_GROWTH - 1);
    } else {
        world.player.body.trim_tail();
    }

    check_level_clear(world);
}

/// Pull food and stars toward the head, stronger when closer
fn apply_magnet(world: &mut World, head: Vec2) {
    let range = world.player.upgrades.magnet_range();
    if range <= 0.0 {
        return;
    }
    let pull = |pos: &mut Vec2| {
        let d = pos.distance(head);
        if d > 0.0 && d < range {
            let step = (MAGNET_PULL * (1.0 - d / range)).min(d);
            *pos += (head - *pos) / d * step;
        }
    };
    world.foods.iter_mut().filter(|f| f.alive).for_each(|f| pull(&mut f.pos));
    world.stars.iter_mut().filter(|s| s.alive).for_each(|s| pull(&mut s.pos));
}

/// Eat every food under the head. Returns true if anything was eaten.
fn collect_food(world: &mut World, head: Vec2) -> bool {
    let multiplier = world.player.upgrades.xp_multiplier();
    let mut eaten = 0;
    for food in world.foods.iter_mut().filter(|f| f.alive) {
        if food.pos.distance(head) >= FOOD_PICKUP_RADIUS {
            continue;
        }
        food.alive = false;
        let xp = (food.value as f64 * multiplier).floor() as u64;
        world.player.session_xp += xp;
        world.events.push(GameEvent::FoodEaten { xp });
        eaten += 1;
    }
    for _ in 0..eaten {
        spawn::spawn_food(world);
    }
    eaten > 0
}

/// Only loose stars heal, and each at most once
fn collect_stars(world: &mut World, head: Vec2) {
    for star in world.stars.iter_mut().filter(|s| s.alive) {
        if star.pos.distance(head) >= STAR_PICKUP_RADIUS {
            continue;
        }
        star.alive = false;
        world.player.session_stars += 1;
        let mut healed = false;
        if star.group_id.is_none() && !star.healed_already {
            star.healed_already = true;
            healed = world.player.heal(1) > 0;
        }
        world.events.push(GameEvent::StarCollected { healed });
    }
}

/// Step 13: flash/invulnerability timers and particles
fn decay_effects(world: &mut World) {
    let player = &mut world.player;
    player.damage_flash = player.damage_flash.saturating_sub(1);
    player.heal_flash = player.heal_flash.saturating_sub(1);
    player.invulnerable = player.invulnerable.saturating_sub(1);

    for particle in &mut world.particles {
        particle.pos += particle.vel;
        particle.vel *= PARTICLE_DRAG;
        particle.life -= PARTICLE_DECAY;
    }
    for health_box in &mut world.health_boxes {
        health_box.pulse = (health_box.pulse + 0.1) % std::f32::consts::TAU;
    }
}

/// Move a snake body one step, reflecting off the world band and the cell.
/// Used by every non-player snake.
pub(crate) fn step_bouncing(
    bounds: &WorldBounds,
    structure: Option<&Structure>,
    body: &mut Body,
    speed: f32,
) {
    let mut dir = body.direction;
    let mut head = body.head() + dir * speed;
    reflect_in_rect(&mut head, &mut dir, &bounds.playable(), HEAD_RADIUS);
    if let Some(cell) = structure {
        cell.bounce_circle(&mut head, &mut dir, HEAD_RADIUS);
    }
    body.direction = dir;
    body.push_head(head);
    body.trim_tail();
}

/// Random heading, for wander rolls
pub(crate) fn random_heading(world: &mut World) -> Vec2 {
    crate::from_angle(world.rng.random_range(0.0..std::f32::consts::TAU))
}
