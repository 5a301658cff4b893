//! Bullets and fire control
//!
//! Volley shape depends only on cannon level and is shared by the player and
//! enemies. Bullet hits are resolved in list order; the first target found
//! takes the bullet.

use glam::Vec2;
use rand::Rng;

use super::collision::circles_overlap;
use super::entity::{Bullet, BulletOwner};
use super::enemy::kill_enemy;
use super::hazards::respawn_resentful;
use super::progression::{DamageSource, UpgradeLevels, damage_player};
use super::state::{GameEvent, GamePhase, World};
use crate::consts::*;
use crate::normalize_or;

/// Barrel layout for a cannon level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volley {
    Head,
    DoubleHead,
    HeadAndTail,
    DoubleHeadAndTail,
}

impl Volley {
    pub fn for_cannon_level(level: u8) -> Self {
        match level {
            0 | 1 => Volley::Head,
            2 => Volley::DoubleHead,
            3 => Volley::HeadAndTail,
            _ => Volley::DoubleHeadAndTail,
        }
    }

    pub fn bullet_count(self) -> usize {
        match self {
            Volley::Head => 1,
            Volley::DoubleHead | Volley::HeadAndTail => 2,
            Volley::DoubleHeadAndTail => 4,
        }
    }

    /// (position, direction) of every bullet
    pub fn shots(self, head: Vec2, head_aim: Vec2, tail: Vec2, tail_aim: Vec2) -> Vec<(Vec2, Vec2)> {
        let mut shots = Vec::with_capacity(self.bullet_count());
        match self {
            Volley::Head => shots.push((head, head_aim)),
            Volley::DoubleHead => push_pair(&mut shots, head, head_aim),
            Volley::HeadAndTail => {
                shots.push((head, head_aim));
                shots.push((tail, tail_aim));
            }
            Volley::DoubleHeadAndTail => {
                push_pair(&mut shots, head, head_aim);
                push_pair(&mut shots, tail, tail_aim);
            }
        }
        shots
    }
}

/// Two parallel barrels either side of `origin`
fn push_pair(shots: &mut Vec<(Vec2, Vec2)>, origin: Vec2, aim: Vec2) {
    let side = aim.perp() * DOUBLE_SHOT_OFFSET;
    shots.push((origin + side, aim));
    shots.push((origin - side, aim));
}

/// Time between player volleys for the given upgrades
pub fn player_fire_cooldown_ms(upgrades: &UpgradeLevels) -> f64 {
    let reduction = 30.0 * upgrades.bullet_speed as f64 + 10.0 * upgrades.cannon as f64;
    (PLAYER_FIRE_BASE_MS - reduction).max(PLAYER_FIRE_MIN_MS)
}

#[inline]
pub fn player_bullet_speed(upgrades: &UpgradeLevels) -> f32 {
    PLAYER_BULLET_BASE_SPEED + upgrades.bullet_speed as f32 * PLAYER_BULLET_SPEED_PER_LEVEL
}

#[inline]
pub fn enemy_bullet_speed(upgrades: &UpgradeLevels) -> f32 {
    ENEMY_BULLET_BASE_SPEED + upgrades.bullet_speed as f32 * ENEMY_BULLET_SPEED_PER_LEVEL
}

/// Fire one player volley: forward from the head, backward from the tail.
/// Returns the number of bullets fired.
pub fn fire_player_volley(world: &mut World) -> usize {
    if world.phase != GamePhase::Playing {
        return 0;
    }
    let player = &world.player;
    let volley = Volley::for_cannon_level(player.upgrades.cannon);
    let speed = player_bullet_speed(&player.upgrades);
    let shots = volley.shots(
        player.head(),
        player.body.direction,
        player.body.tail(),
        player.body.tail_direction(),
    );
    let count = shots.len();
    for (pos, dir) in shots {
        world
            .bullets
            .push(Bullet::new(pos, dir, speed, PLAYER_BULLET_LIFETIME, BulletOwner::Player));
    }
    world.events.push(GameEvent::PlayerFired { bullets: count });
    count
}

/// Step 10: move bullets and resolve hits
pub fn update_bullets(world: &mut World) {
    for b in 0..world.bullets.len() {
        if !world.bullets[b].alive {
            continue;
        }
        let bullet = &mut world.bullets[b];
        bullet.pos += bullet.vel;
        bullet.life = bullet.life.saturating_sub(1);
        if bullet.life == 0 || world.bounds.out_of_world(bullet.pos) {
            bullet.alive = false;
            continue;
        }

        let (pos, owner) = (bullet.pos, bullet.owner);
        if owner.hits_player() {
            if hits_player(world, pos) {
                world.bullets[b].alive = false;
                damage_player(world, ENEMY_BULLET_DAMAGE, DamageSource::Bullet, true);
                if world.phase != GamePhase::Playing {
                    return;
                }
            }
        } else if player_bullet_hits(world, pos) {
            world.bullets[b].alive = false;
        }
    }
}

fn hits_player(world: &World, pos: Vec2) -> bool {
    world
        .player
        .body
        .segments
        .iter()
        .any(|&s| circles_overlap(pos, 0.0, s, BULLET_HEAD_RADIUS))
}

/// Damage depends on whether the head or the body was hit
fn hit_damage(
    head: Vec2,
    mut body: impl Iterator<Item = Vec2>,
    pos: Vec2,
    head_dmg: i32,
    body_dmg: i32,
) -> Option<i32> {
    if circles_overlap(pos, 0.0, head, BULLET_HEAD_RADIUS) {
        return Some(head_dmg);
    }
    body.any(|s| circles_overlap(pos, 0.0, s, BULLET_BODY_RADIUS))
        .then_some(body_dmg)
}

/// Test a player bullet against enemies, then elites. True if it hit.
fn player_bullet_hits(world: &mut World, pos: Vec2) -> bool {
    let enemy_hit = world.enemies.iter().enumerate().find_map(|(i, e)| {
        if e.marked_for_death {
            return None;
        }
        let body = e.body.body_segments().map(|(_, s)| s);
        hit_damage(e.body.head(), body, pos, PLAYER_BULLET_HEAD_DAMAGE, PLAYER_BULLET_BODY_DAMAGE)
            .map(|dmg| (i, dmg))
    });
    if let Some((i, dmg)) = enemy_hit {
        if world.enemies[i].health.damage(dmg) {
            kill_enemy(world, i, true);
        }
        return true;
    }

    let elite_hit = world.resentful.iter().enumerate().find_map(|(i, r)| {
        let body = r.body.body_segments().map(|(_, s)| s);
        hit_damage(r.body.head(), body, pos, RESENTFUL_HEAD_DAMAGE, RESENTFUL_BODY_DAMAGE)
            .map(|dmg| (i, dmg))
    });
    if let Some((i, dmg)) = elite_hit {
        if world.resentful[i].health.damage(dmg) {
            let id = world.resentful[i].id;
            world.events.push(GameEvent::ResentfulShotDown { id });
            respawn_resentful(world, i);
        }
        return true;
    }
    false
}

/// Step 11: enemies with a gun fire at the player when in range
pub fn update_enemy_fire(world: &mut World) {
    let now = world.now_ms();
    let target = world.player.head();

    for i in 0..world.enemies.len() {
        let enemy = &world.enemies[i];
        if enemy.marked_for_death || !enemy.can_shoot || now < enemy.next_shot_ms {
            continue;
        }
        let head = enemy.body.head();
        let dist = head.distance(target);
        if !(ENEMY_FIRE_MIN_RANGE..=ENEMY_FIRE_MAX_RANGE).contains(&dist) {
            continue;
        }

        let tail = enemy.body.tail();
        let volley = Volley::for_cannon_level(enemy.upgrades.cannon);
        let speed = enemy_bullet_speed(&enemy.upgrades);
        let shots = volley.shots(
            head,
            normalize_or(target - head, enemy.body.direction),
            tail,
            normalize_or(target - tail, enemy.body.tail_direction()),
        );
        let cooldown = enemy.shoot_cooldown_ms;

        for (pos, dir) in shots {
            world
                .bullets
                .push(Bullet::new(pos, dir, speed, ENEMY_BULLET_LIFETIME, BulletOwner::Enemy));
        }
        let jitter: f64 = world.rng.random_range(0.8..1.2);
        world.enemies[i].next_shot_ms = now + cooldown * jitter;
    }
}
