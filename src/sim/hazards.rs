//! Step 12: saws, floating cannons, resentful snakes and health boxes

use glam::Vec2;
use rand::Rng;

use super::collision::{circles_overlap, reflect_in_rect};
use super::entity::{Body, Bullet, BulletOwner};
use super::progression::{DamageSource, damage_player};
use super::spawn::resentful_respawn_point;
use super::state::{GameEvent, GamePhase, World};
use super::tick::step_bouncing;
use crate::consts::*;
use crate::{angle_of, blend_direction, from_angle, normalize_or, rotate_toward_angle};

const RESENTFUL_BULLET_SPEED: f32 = ENEMY_BULLET_BASE_SPEED + 2.0;
const RESPAWN_BURST_COLOR: u32 = 0xaa44ff;

pub fn update_hazards(world: &mut World) {
    update_saws(world);
    if world.phase != GamePhase::Playing {
        return;
    }
    update_cannons(world);
    update_resentful(world);
    if world.phase != GamePhase::Playing {
        return;
    }
    update_health_boxes(world);
}

/// Index of the first player segment a circle touches
fn touching_segment(world: &World, center: Vec2, radius: f32) -> Option<usize> {
    world
        .player
        .body
        .segments
        .iter()
        .position(|&s| circles_overlap(center, radius, s, BODY_RADIUS))
}

/// Shove the player away from `from`, unless that would land in a wall
fn knock_back(world: &mut World, from: Vec2, distance: f32) {
    let head = world.player.head();
    let push = normalize_or(head - from, -world.player.body.direction) * distance;
    let target = world.bounds.clamp_inside(head + push, HEAD_RADIUS);
    let into_wall = world
        .structure
        .as_ref()
        .is_some_and(|s| s.blocking_wall(target, HEAD_RADIUS).is_some());
    if !into_wall {
        world.player.body.translate(target - head);
    }
}

/// Saws bounce around and always hurt: no shield roll
fn update_saws(world: &mut World) {
    for i in 0..world.saws.len() {
        let saw = &mut world.saws[i];
        saw.pos += saw.vel;
        saw.rotation = (saw.rotation + saw.spin) % std::f32::consts::TAU;
        reflect_in_rect(&mut saw.pos, &mut saw.vel, &world.bounds.playable(), saw.radius);
        if let Some(cell) = world.structure.as_ref() {
            cell.bounce_circle(&mut saw.pos, &mut saw.vel, saw.radius);
        }

        let (pos, radius, damage) = (saw.pos, saw.radius, saw.damage);
        if touching_segment(world, pos, radius).is_some() {
            knock_back(world, pos, SAW_KNOCKBACK);
            damage_player(world, damage, DamageSource::Saw, false);
            if world.phase != GamePhase::Playing {
                return;
            }
        }
    }
}

/// Cannons track a segment near the player's head and fire twin shots
fn update_cannons(world: &mut World) {
    let now = world.now_ms();
    let head = world.player.head();
    let len = world.player.body.len();

    for i in 0..world.cannons.len() {
        let cannon = &world.cannons[i];
        if cannon.pos.distance(head) > cannon.range {
            world.cannons[i].target_segment = None;
            continue;
        }
        let target = match cannon.target_segment.filter(|&t| t < len) {
            Some(t) => t,
            None => {
                let t = world.rng.random_range(0..len.min(CANNON_TARGET_SEGMENTS));
                world.cannons[i].target_segment = Some(t);
                t
            }
        };
        let aim_at = world.player.body.segments[target];

        let cannon = &mut world.cannons[i];
        let desired = angle_of(aim_at - cannon.pos);
        cannon.aim = rotate_toward_angle(cannon.aim, desired, CANNON_TURN_RATE);
        if now < cannon.next_fire_ms {
            continue;
        }
        cannon.next_fire_ms = now + CANNON_FIRE_MS;
        cannon.target_segment = None;
        let (pos, aim, speed) = (cannon.pos, cannon.aim, cannon.bullet_speed);
        for offset in [-CANNON_SPREAD, CANNON_SPREAD] {
            world.bullets.push(Bullet::new(
                pos,
                from_angle(aim + offset),
                speed,
                ENEMY_BULLET_LIFETIME,
                BulletOwner::Cannon,
            ));
        }
    }
}

/// Chase, shoot, and lose every duel
fn update_resentful(world: &mut World) {
    let now = world.now_ms();
    let target = world.player.head();
    let base_speed = world.params.player_speed.max(0.1);

    for i in 0..world.resentful.len() {
        let elite = &mut world.resentful[i];
        let head = elite.body.head();
        let chasing = head.distance(target) < elite.chase_range;
        if chasing {
            let turn = (RESENTFUL_BASE_TURN * elite.speed / base_speed).clamp(0.0, 1.0);
            elite.body.direction = blend_direction(elite.body.direction, target - head, turn);
        }
        let speed = elite.speed;
        step_bouncing(&world.bounds, world.structure.as_ref(), &mut elite.body, speed);

        if chasing && now >= elite.next_shot_ms {
            elite.next_shot_ms = now + RESENTFUL_FIRE_MS;
            let origin = elite.body.head();
            let aim = angle_of(target - origin);
            for offset in [-RESENTFUL_SPREAD, RESENTFUL_SPREAD] {
                world.bullets.push(Bullet::new(
                    origin,
                    from_angle(aim + offset),
                    RESENTFUL_BULLET_SPEED,
                    ENEMY_BULLET_LIFETIME,
                    BulletOwner::Enemy,
                ));
            }
        }

        let head = world.resentful[i].body.head();
        if touching_segment(world, head, HEAD_RADIUS).is_some() {
            let id = world.resentful[i].id;
            world.events.push(GameEvent::ResentfulDuel { id });
            respawn_resentful(world, i);
        }
    }
}

/// Send elite `i` far from the player with full health
pub fn respawn_resentful(world: &mut World, i: usize) {
    let player_head = world.player.head();
    let pos = resentful_respawn_point(
        &mut world.rng,
        &world.bounds,
        world.structure.as_ref(),
        player_head,
    );
    let now = world.now_ms();
    let Some(elite) = world.resentful.get_mut(i) else {
        return;
    };
    let old = elite.body.head();
    let heading = normalize_or(player_head - pos, Vec2::X);
    elite.body = Body::new(pos, heading, elite.body.len(), elite.speed);
    elite.health.refill();
    elite.respawns += 1;
    elite.next_shot_ms = now + RESENTFUL_FIRE_MS;
    let (id, respawns) = (elite.id, elite.respawns);

    world.burst(old, RESPAWN_BURST_COLOR, 16);
    log::debug!("Resentful {id} relocated ({respawns} times) to {pos:?}");
}

fn update_health_boxes(world: &mut World) {
    let head = world.player.head();
    for i in 0..world.health_boxes.len() {
        let health_box = &mut world.health_boxes[i];
        if !health_box.alive || !circles_overlap(head, HEAD_RADIUS, health_box.pos, HEALTH_BOX_RADIUS) {
            continue;
        }
        health_box.alive = false;
        let amount = world.player.heal(health_box.heal);
        world.events.push(GameEvent::PlayerHealed { amount });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::HealthBox;
    use crate::sim::level::resolve_level_params;
    use crate::sim::progression::Progress;
    use crate::sim::collision::Rect;
    use crate::sim::spawn::{make_cannon, make_resentful, roll_saw};
    use crate::sim::structure::{Opening, Structure};
    use crate::wrap_angle;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn arena(seed: u64) -> World {
        let mut world = World::new(seed, Progress::default());
        world.begin_level(resolve_level_params(1, None));
        world.enemies.clear();
        world.health_boxes.clear();
        world.phase = GamePhase::Playing;
        world
    }

    #[test]
    fn test_saw_damage_ignores_shield() {
        let mut world = arena(1);
        world.player.upgrades.shield = 10;
        let mut rng = Pcg32::seed_from_u64(1);
        let mut saw = roll_saw(&mut rng, world.player.head());
        saw.vel = Vec2::ZERO;
        let damage = saw.damage;
        world.saws.push(saw);
        world.player.health = crate::sim::entity::Health::full(20);

        let head = world.player.head();
        update_hazards(&mut world);
        assert_eq!(world.player.health.current, 20 - damage);
        assert!(world.player.head().distance(head) > 1.0);
    }

    #[test]
    fn test_resentful_duel_relocates_without_damage() {
        let mut world = arena(2);
        let head = world.player.head();
        let mut elite = make_resentful(99, head, Vec2::X);
        elite.health.current = 3;
        elite.next_shot_ms = f64::MAX;
        world.resentful.push(elite);
        let hp = world.player.health.current;

        update_hazards(&mut world);
        let elite = &world.resentful[0];
        assert_eq!(world.player.health.current, hp);
        assert_eq!(elite.respawns, 1);
        assert_eq!(elite.health.current, RESENTFUL_HEALTH);
        assert!(elite.body.head().distance(head) >= RESENTFUL_RESPAWN_MIN - 1e-3);
        assert!(world.events.contains(&GameEvent::ResentfulDuel { id: 99 }));
    }

    #[test]
    fn test_resentful_fires_spread_pair_when_chasing() {
        let mut world = arena(3);
        let spot = world.player.head() + Vec2::new(300.0, 0.0);
        world.resentful.push(make_resentful(5, spot, -Vec2::X));
        update_hazards(&mut world);
        assert_eq!(world.bullets.len(), 2);
        assert!(world.bullets.iter().all(|b| b.owner == BulletOwner::Enemy));
        update_hazards(&mut world);
        assert_eq!(world.bullets.len(), 2);
    }

    #[test]
    fn test_cannon_fires_twin_shots_in_range() {
        let mut world = arena(4);
        let mut rng = Pcg32::seed_from_u64(4);
        let mut cannon = make_cannon(&mut rng, world.player.head() + Vec2::new(0.0, 200.0), 0.0);
        cannon.next_fire_ms = 0.0;
        world.cannons.push(cannon);
        update_hazards(&mut world);
        assert_eq!(world.bullets.len(), 2);
        assert!(world.cannons[0].next_fire_ms > 0.0);

        let mut far = make_cannon(&mut rng, world.player.head() + Vec2::new(0.0, 700.0), 0.0);
        far.next_fire_ms = 0.0;
        world.cannons = vec![far];
        world.bullets.clear();
        update_hazards(&mut world);
        assert!(world.bullets.is_empty());
    }

    /// Cell in the top-left corner, player parked in the opposite one
    fn fenced_arena(seed: u64) -> World {
        let mut world = arena(seed);
        world.player.body = Body::new(Vec2::splat(1300.0), Vec2::X, 5, 3.0);
        let opening = Opening {
            position: 0.4,
            gap: 0.2,
            direction: 1.0,
            speed: 0.05,
        };
        let rect = Rect::new(Vec2::splat(200.0), Vec2::splat(800.0));
        world.structure = Some(Structure::new(rect, [Some(opening), None, None, None]));
        world
    }

    fn test_saw(pos: Vec2, vel: Vec2) -> crate::sim::entity::KillerSaw {
        let mut rng = Pcg32::seed_from_u64(9);
        let mut saw = roll_saw(&mut rng, pos);
        saw.vel = vel;
        saw.radius = 15.0;
        saw
    }

    #[test]
    fn test_saw_deflects_off_cell_wall() {
        let mut world = fenced_arena(6);
        // Solid left wall, approached from outside
        let start = Vec2::new(200.0 - 16.0, 500.0);
        world.saws.push(test_saw(start, Vec2::new(2.0, 0.5)));
        update_hazards(&mut world);

        let saw = &world.saws[0];
        assert_eq!(saw.vel, Vec2::new(-2.0, 0.5));
        assert!(saw.pos.x < 200.0 - saw.radius);
        let cell = world.structure.as_ref().unwrap();
        assert_eq!(cell.blocking_wall(saw.pos, saw.radius), None);
    }

    #[test]
    fn test_saw_never_stuck_in_closing_gap() {
        let mut world = fenced_arena(7);
        // In the top gap (x 440..560), drifting inward
        world.saws.push(test_saw(Vec2::new(500.0, 205.0), Vec2::new(0.0, 1.0)));
        for _ in 0..600 {
            if let Some(cell) = world.structure.as_mut() {
                cell.update_openings(|_| false);
            }
            update_hazards(&mut world);
            let saw = &world.saws[0];
            let cell = world.structure.as_ref().unwrap();
            assert_eq!(cell.blocking_wall(saw.pos, saw.radius), None);
        }
    }

    #[test]
    fn test_resentful_never_stuck_in_closing_gap() {
        let mut world = fenced_arena(8);
        let mut elite = make_resentful(3, Vec2::new(500.0, 205.0), Vec2::Y);
        elite.speed = 1.0;
        elite.chase_range = 0.0;
        world.resentful.push(elite);
        for _ in 0..600 {
            if let Some(cell) = world.structure.as_mut() {
                cell.update_openings(|_| false);
            }
            update_hazards(&mut world);
            let head = world.resentful[0].body.head();
            let cell = world.structure.as_ref().unwrap();
            assert_eq!(cell.blocking_wall(head, HEAD_RADIUS), None);
        }
        assert_eq!(world.resentful[0].respawns, 0);
    }

    #[test]
    fn test_resentful_reflects_off_world_band() {
        let mut world = arena(9);
        let edge = world.bounds.playable().max.x - HEAD_RADIUS;
        let mut elite = make_resentful(4, Vec2::new(edge - 1.0, 300.0), Vec2::X);
        elite.chase_range = 0.0;
        world.resentful.push(elite);

        update_hazards(&mut world);
        let body = &world.resentful[0].body;
        assert_eq!(body.head().x, edge);
        assert!(body.direction.x < 0.0);
        assert!(!world.bounds.in_border(body.head(), HEAD_RADIUS - 1e-3));
    }

    #[test]
    fn test_cannon_turns_at_limited_rate() {
        let mut world = arena(10);
        let mut rng = Pcg32::seed_from_u64(10);
        let mut cannon = make_cannon(&mut rng, world.player.head() + Vec2::new(0.0, 200.0), 0.0);
        // Facing straight away from the player
        cannon.aim = std::f32::consts::FRAC_PI_2;
        cannon.next_fire_ms = f64::MAX;
        world.cannons.push(cannon);

        for _ in 0..10 {
            let before = world.cannons[0].aim;
            update_hazards(&mut world);
            let turned = wrap_angle(world.cannons[0].aim - before).abs();
            assert!(turned <= CANNON_TURN_RATE + 1e-5);
            assert!(turned >= CANNON_TURN_RATE - 1e-4);
        }
        assert!(world.bullets.is_empty());
    }

    #[test]
    fn test_health_box_heals_and_vanishes() {
        let mut world = arena(5);
        world.player.health.current = 1;
        world.health_boxes.push(HealthBox {
            pos: world.player.head(),
            heal: 3,
            pulse: 0.0,
            alive: true,
        });
        update_hazards(&mut world);
        assert_eq!(world.player.health.current, 4);
        assert!(!world.health_boxes[0].alive);
        assert!(world.events.contains(&GameEvent::PlayerHealed { amount: 3 }));
    }
}
