//! Read-only view of the world for renderers and HUDs
//!
//! A snapshot is a flat copy taken between ticks. Consumers can keep it,
//! serialize it or throw it away; none of it points back into `World`.

use glam::Vec2;
use serde::Serialize;

use super::entity::{BulletOwner, FoodColor, SawColor};
use super::progression::UpgradeLevels;
use super::state::{GamePhase, World};
use crate::settings::SkinId;
use crate::sim::collision::Rect;

#[derive(Debug, Clone, Serialize)]
pub struct SnakeView {
    pub segments: Vec<Vec2>,
    pub direction: Vec2,
    pub health: i32,
    pub max_health: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub snake: SnakeView,
    pub upgrades: UpgradeLevels,
    pub session_xp: u64,
    pub session_stars: u32,
    pub damage_flash: u32,
    pub heal_flash: u32,
    pub invulnerable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulletView {
    pub pos: Vec2,
    pub owner: BulletOwner,
}

#[derive(Debug, Clone, Serialize)]
pub struct SawView {
    pub pos: Vec2,
    pub radius: f32,
    pub rotation: f32,
    pub color: SawColor,
}

#[derive(Debug, Clone, Serialize)]
pub struct CannonView {
    pub pos: Vec2,
    pub aim: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodView {
    pub pos: Vec2,
    pub color: FoodColor,
    pub radius: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PickupView {
    pub pos: Vec2,
    /// Pulse phase for health boxes, 0 for stars
    pub pulse: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WallView {
    pub solid: Vec<Rect>,
    pub opening: Option<Rect>,
}

/// Everything a frame needs to draw
#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub phase: GamePhase,
    pub level: u32,
    pub stars_needed: u32,
    pub time_ticks: u64,
    pub world_size: f32,
    pub border: f32,
    pub camera: Vec2,
    pub player: PlayerView,
    pub enemies: Vec<SnakeView>,
    pub resentful: Vec<SnakeView>,
    pub bullets: Vec<BulletView>,
    pub saws: Vec<SawView>,
    pub cannons: Vec<CannonView>,
    pub foods: Vec<FoodView>,
    pub stars: Vec<PickupView>,
    pub health_boxes: Vec<PickupView>,
    pub walls: Vec<WallView>,
    pub particle_count: usize,
    /// Player head/body tint (0xRRGGBB)
    pub skin_colors: (u32, u32),
}

fn snake_view(body: &super::entity::Body, health: &super::entity::Health) -> SnakeView {
    SnakeView {
        segments: body.segments.iter().copied().collect(),
        direction: body.direction,
        health: health.current,
        max_health: health.max,
    }
}

impl WorldSnapshot {
    pub fn capture(world: &World) -> Self {
        let player = &world.player;
        Self {
            phase: world.phase,
            level: world.params.level,
            stars_needed: world.params.stars_needed,
            time_ticks: world.time_ticks,
            world_size: world.bounds.size,
            border: world.bounds.border,
            camera: world.camera,
            player: PlayerView {
                snake: snake_view(&player.body, &player.health),
                upgrades: player.upgrades,
                session_xp: player.session_xp,
                session_stars: player.session_stars,
                damage_flash: player.damage_flash,
                heal_flash: player.heal_flash,
                invulnerable: player.invulnerable > 0,
            },
            enemies: world
                .enemies
                .iter()
                .filter(|e| !e.marked_for_death)
                .map(|e| snake_view(&e.body, &e.health))
                .collect(),
            resentful: world
                .resentful
                .iter()
                .map(|r| snake_view(&r.body, &r.health))
                .collect(),
            bullets: world
                .bullets
                .iter()
                .filter(|b| b.alive)
                .map(|b| BulletView {
                    pos: b.pos,
                    owner: b.owner,
                })
                .collect(),
            saws: world
                .saws
                .iter()
                .map(|s| SawView {
                    pos: s.pos,
                    radius: s.radius,
                    rotation: s.rotation,
                    color: s.color,
                })
                .collect(),
            cannons: world
                .cannons
                .iter()
                .map(|c| CannonView { pos: c.pos, aim: c.aim })
                .collect(),
            foods: world
                .foods
                .iter()
                .filter(|f| f.alive)
                .map(|f| FoodView {
                    pos: f.pos,
                    color: f.color,
                    radius: f.radius,
                })
                .collect(),
            stars: world
                .stars
                .iter()
                .filter(|s| s.alive)
                .map(|s| PickupView { pos: s.pos, pulse: 0.0 })
                .collect(),
            health_boxes: world
                .health_boxes
                .iter()
                .filter(|b| b.alive)
                .map(|b| PickupView {
                    pos: b.pos,
                    pulse: b.pulse,
                })
                .collect(),
            walls: world
                .structure
                .iter()
                .flat_map(|s| s.walls.iter())
                .map(|w| WallView {
                    solid: w.solid_rects(),
                    opening: w.opening_rect(),
                })
                .collect(),
            particle_count: world.particles.len(),
            skin_colors: SkinId::default().colors(),
        }
    }

    /// Tint the player with a chosen skin
    pub fn with_skin(mut self, skin: SkinId) -> Self {
        self.skin_colors = skin.colors();
        self
    }
}

/// Anything that draws snapshots
pub trait RenderSink {
    fn present(&mut self, snapshot: &WorldSnapshot);
}

/// Keeps only the latest snapshot (headless runs, tests)
#[derive(Debug, Default)]
pub struct LatestFrame {
    pub frame: Option<WorldSnapshot>,
    pub presented: u64,
}

impl RenderSink for LatestFrame {
    fn present(&mut self, snapshot: &WorldSnapshot) {
        self.frame = Some(snapshot.clone());
        self.presented += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::resolve_level_params;
    use crate::sim::progression::Progress;

    #[test]
    fn test_snapshot_mirrors_world() {
        let mut world = World::new(21, Progress::default());
        world.begin_level(resolve_level_params(5, None));
        world.foods[0].alive = false;

        let snap = WorldSnapshot::capture(&world);
        assert_eq!(snap.level, 5);
        assert_eq!(snap.enemies.len(), world.enemies.len());
        assert_eq!(snap.foods.len(), world.foods.len() - 1);
        assert_eq!(snap.walls.len(), 4);
        assert_eq!(snap.player.snake.segments.len(), world.player.body.len());
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut world = World::new(22, Progress::default());
        world.begin_level(resolve_level_params(1, None));
        let json = serde_json::to_string(&WorldSnapshot::capture(&world)).unwrap();
        assert!(json.contains("\"phase\":\"LevelIntro\""));
    }

    #[test]
    fn test_skin_tints_player() {
        let mut world = World::new(23, Progress::default());
        world.begin_level(resolve_level_params(1, None));
        let plain = WorldSnapshot::capture(&world);
        assert_eq!(plain.skin_colors, SkinId::Classic.colors());
        let tinted = plain.with_skin(SkinId::Frost);
        assert_eq!(tinted.skin_colors, (0xbfefff, 0x4682b4));
    }
}
