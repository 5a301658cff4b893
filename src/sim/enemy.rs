//! Enemy snakes: steering, growth, contact combat and death drops
//!
//! Steering is a strict priority list evaluated each tick. The first rule
//! that applies decides the desired heading, which is blended into the
//! current one through `blend_direction`.

use glam::Vec2;
use rand::Rng;

use super::collision::circles_overlap;
use super::entity::{HealthBox, Star};
use super::progression::{DamageSource, damage_player};
use super::spawn;
use super::state::{GameEvent, GamePhase, World};
use super::tick::{random_heading, step_bouncing};
use crate::consts::*;
use crate::{blend_direction, normalize_or};

/// Blend factors per rule
const FLEE_BLEND: f32 = 0.15;
const PANIC_BLEND: f32 = 0.5;
const SEEK_BLEND: f32 = 0.1;
const SEPARATE_BLEND: f32 = 0.1;
const WANDER_BLEND: f32 = 0.5;

/// Segments gained per item eaten
const ENEMY_FOOD_GROWTH: usize = 2;
const ENEMY_STAR_GROWTH: usize = 3;

/// Particle tint for enemy deaths
const DEATH_BURST_COLOR: u32 = 0xff5533;
const DEATH_BURST_COUNT: usize = 24;

/// Outcome of the priority rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Steering {
    /// Away from the player; `panic` when very close
    Flee { away: Vec2, panic: bool },
    SeekStar(Vec2),
    Separate(Vec2),
    Wander(Vec2),
    Hold,
}

impl Steering {
    /// New heading after applying this rule to `current`
    pub fn apply(self, current: Vec2) -> Vec2 {
        match self {
            Steering::Flee { away, panic } => {
                blend_direction(current, away, if panic { PANIC_BLEND } else { FLEE_BLEND })
            }
            Steering::SeekStar(toward) => blend_direction(current, toward, SEEK_BLEND),
            Steering::Separate(away) => blend_direction(current, away, SEPARATE_BLEND),
            Steering::Wander(heading) => blend_direction(current, heading, WANDER_BLEND),
            Steering::Hold => current,
        }
    }
}

/// Priority rules: flee > seek star > separate > wander
pub fn choose_steering(
    head: Vec2,
    player_head: Vec2,
    nearest_star: Option<Vec2>,
    nearest_neighbour: Option<Vec2>,
    wander: Option<Vec2>,
) -> Steering {
    let to_player = head.distance(player_head);
    if to_player < ENEMY_FLEE_RANGE {
        return Steering::Flee {
            away: normalize_or(head - player_head, Vec2::X),
            panic: to_player < ENEMY_PANIC_RANGE,
        };
    }
    if let Some(star) = nearest_star.filter(|s| s.distance(head) < ENEMY_STAR_SEEK_RANGE) {
        return Steering::SeekStar(star - head);
    }
    if let Some(other) = nearest_neighbour.filter(|o| o.distance(head) < ENEMY_SEPARATION_RANGE) {
        return Steering::Separate(head - other);
    }
    wander.map_or(Steering::Hold, Steering::Wander)
}

fn nearest(points: impl Iterator<Item = Vec2>, from: Vec2) -> Option<Vec2> {
    points.min_by(|a, b| a.distance_squared(from).total_cmp(&b.distance_squared(from)))
}

/// Step 9: every enemy steers, moves, eats and fights
pub fn update_enemies(world: &mut World) {
    let mut player_hit = false;

    for i in 0..world.enemies.len() {
        if world.enemies[i].marked_for_death {
            continue;
        }

        steer_and_move(world, i);
        feed(world, i);

        if world.phase != GamePhase::Playing {
            return;
        }
        if !player_hit {
            player_hit = player_head_contact(world, i);
            if world.phase != GamePhase::Playing {
                return;
            }
        }
        if bites_player_body(world, i) {
            kill_enemy(world, i, true);
            continue;
        }
        if bites_other_enemy(world, i) {
            kill_enemy(world, i, false);
        }
    }
}

fn steer_and_move(world: &mut World, i: usize) {
    let head = world.enemies[i].body.head();
    let player_head = world.player.head();
    let star = nearest(world.stars.iter().filter(|s| s.alive).map(|s| s.pos), head);
    let neighbour = nearest(
        world
            .enemies
            .iter()
            .enumerate()
            .filter(|(j, e)| *j != i && !e.marked_for_death)
            .map(|(_, e)| e.body.head()),
        head,
    );
    let wander = if world.rng.random_bool(ENEMY_WANDER_CHANCE) {
        Some(random_heading(world))
    } else {
        None
    };

    let steering = choose_steering(head, player_head, star, neighbour, wander);
    let enemy = &mut world.enemies[i];
    enemy.body.direction = steering.apply(enemy.body.direction);
    let speed = enemy.speed;
    step_bouncing(&world.bounds, world.structure.as_ref(), &mut enemy.body, speed);
}

/// Food feeds the XP health path, stars refill health
fn feed(world: &mut World, i: usize) {
    let head = world.enemies[i].body.head();
    let mut eaten_food = 0;

    for food in world.foods.iter_mut().filter(|f| f.alive) {
        if food.pos.distance(head) >= FOOD_PICKUP_RADIUS {
            continue;
        }
        food.alive = false;
        eaten_food += 1;
        let enemy = &mut world.enemies[i];
        enemy.xp += food.value as u64;
        enemy.body.grow_tail(ENEMY_FOOD_GROWTH);
        enemy.health.set_max(enemy.xp.div_ceil(10) as i32);
        enemy.health.heal(1);
    }
    for star in world.stars.iter_mut().filter(|s| s.alive) {
        if star.pos.distance(head) >= STAR_PICKUP_RADIUS {
            continue;
        }
        star.alive = false;
        let enemy = &mut world.enemies[i];
        enemy.stars_eaten += 1;
        enemy.body.grow_tail(ENEMY_STAR_GROWTH);
        enemy.health.refill();
    }
    for _ in 0..eaten_food {
        spawn::spawn_food(world);
    }
}

/// Player head running into any part of enemy `i`. Returns true on contact.
fn player_head_contact(world: &mut World, i: usize) -> bool {
    let player_head = world.player.head();
    let Some(touch) = world.enemies[i]
        .body
        .segments
        .iter()
        .copied()
        .find(|&s| circles_overlap(player_head, HEAD_RADIUS, s, BODY_RADIUS))
    else {
        return false;
    };

    damage_player(world, ENEMY_CONTACT_DAMAGE, DamageSource::Enemy, true);
    if world.phase != GamePhase::Playing {
        return true;
    }

    let push = normalize_or(player_head - touch, -world.player.body.direction) * ENEMY_PUSH_BACK;
    let target = world.bounds.clamp_inside(player_head + push, HEAD_RADIUS);
    let into_wall = world
        .structure
        .as_ref()
        .is_some_and(|s| s.blocking_wall(target, HEAD_RADIUS).is_some());
    if !into_wall {
        world.player.body.translate(target - player_head);
    }
    true
}

/// Enemy head against the player's body (not the head)
fn bites_player_body(world: &World, i: usize) -> bool {
    let head = world.enemies[i].body.head();
    world
        .player
        .body
        .body_segments()
        .any(|(_, s)| circles_overlap(head, HEAD_RADIUS, s, BODY_RADIUS))
}

/// Enemy head against another live enemy's body
fn bites_other_enemy(world: &World, i: usize) -> bool {
    let head = world.enemies[i].body.head();
    world
        .enemies
        .iter()
        .enumerate()
        .filter(|(j, e)| *j != i && !e.marked_for_death)
        .any(|(_, e)| {
            e.body
                .body_segments()
                .any(|(_, s)| circles_overlap(head, HEAD_RADIUS, s, BODY_RADIUS))
        })
}

/// Kill enemy `i` once: drop stars, food and a health box
pub fn kill_enemy(world: &mut World, i: usize, by_player: bool) {
    let Some(enemy) = world.enemies.get_mut(i) else {
        return;
    };
    if enemy.marked_for_death {
        return;
    }
    enemy.marked_for_death = true;
    enemy.health.current = 0;

    let id = enemy.id;
    let head = enemy.body.head();
    let star_count = enemy.stars_eaten.max(1);
    let segments: Vec<Vec2> = enemy.body.segments.iter().copied().collect();

    let group = world.next_group_id();
    for _ in 0..star_count {
        let jitter = Vec2::new(
            world.rng.random_range(-20.0f32..20.0),
            world.rng.random_range(-20.0f32..20.0),
        );
        let pos = world.bounds.clamp_inside(head + jitter, STAR_PICKUP_RADIUS);
        world.stars.push(Star {
            group_id: Some(group),
            ..Star::loose(pos)
        });
    }

    let food_count = (segments.len() / 4).min(8);
    if food_count > 0 {
        let stride = segments.len() / food_count;
        for k in 0..food_count {
            let pos = world.bounds.clamp_inside(segments[k * stride], FOOD_PICKUP_RADIUS);
            let mut food = spawn::roll_food(&mut world.rng, &world.bounds);
            food.pos = pos;
            world.foods.push(food);
        }
    }

    world.health_boxes.push(HealthBox {
        pos: head,
        heal: 1,
        pulse: 0.0,
        alive: true,
    });
    world.burst(head, DEATH_BURST_COLOR, DEATH_BURST_COUNT);
    world.events.push(GameEvent::EnemyKilled { id, by_player });
    log::debug!("Enemy {id} killed (by player: {by_player}), dropped {star_count} stars");
}
