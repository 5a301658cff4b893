//! Central cell: a walled rectangle with sliding openings
//!
//! Each wall may carry one opening, a gap that slides back and forth along
//! the wall and stops while the player occupies it. Touching solid wall is
//! lethal to the player and reflective to everything else.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use crate::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl WallSide {
    pub const ALL: [WallSide; 4] = [WallSide::Top, WallSide::Right, WallSide::Bottom, WallSide::Left];

    /// Walls along the x axis
    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, WallSide::Top | WallSide::Bottom)
    }
}

/// Sliding gap along a wall, in fractions of the wall's length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    /// Start of the gap (0 ..= 1 - gap)
    pub position: f32,
    /// Gap length as a fraction of the wall
    pub gap: f32,
    /// +1 or -1
    pub direction: f32,
    /// Fraction of wall length travelled per tick
    pub speed: f32,
}

impl Opening {
    #[inline]
    pub fn max_position(&self) -> f32 {
        (1.0 - self.gap).max(0.0)
    }

    /// Advance one tick, bouncing at 0 and `max_position`
    pub fn advance(&mut self) {
        let max = self.max_position();
        self.position += self.direction * self.speed;
        if self.position <= 0.0 {
            self.position = 0.0;
            self.direction = 1.0;
        } else if self.position >= max {
            self.position = max;
            self.direction = -1.0;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wall {
    pub side: WallSide,
    pub rect: Rect,
    pub opening: Option<Opening>,
    /// Set by the last update when something sat in the gap
    pub paused: bool,
}

impl Wall {
    /// (start, length) along the wall's long axis
    fn span(&self) -> (f32, f32) {
        if self.side.is_horizontal() {
            (self.rect.min.x, self.rect.size().x)
        } else {
            (self.rect.min.y, self.rect.size().y)
        }
    }

    /// Sub-rect of the wall between two along-axis coordinates
    fn slice(&self, from: f32, to: f32) -> Rect {
        if self.side.is_horizontal() {
            Rect::new(
                Vec2::new(from, self.rect.min.y),
                Vec2::new(to, self.rect.max.y),
            )
        } else {
            Rect::new(
                Vec2::new(self.rect.min.x, from),
                Vec2::new(self.rect.max.x, to),
            )
        }
    }

    /// Rectangle of the gap, if this wall has one
    pub fn opening_rect(&self) -> Option<Rect> {
        let opening = self.opening?;
        let (start, len) = self.span();
        let from = start + opening.position * len;
        Some(self.slice(from, from + opening.gap * len))
    }

    /// Solid pieces of the wall (one, or two around the gap)
    pub fn solid_rects(&self) -> Vec<Rect> {
        let Some(opening) = self.opening else {
            return vec![self.rect];
        };
        let (start, len) = self.span();
        let gap_from = start + opening.position * len;
        let gap_to = gap_from + opening.gap * len;
        let mut rects = Vec::with_capacity(2);
        if gap_from > start {
            rects.push(self.slice(start, gap_from));
        }
        if gap_to < start + len {
            rects.push(self.slice(gap_to, start + len));
        }
        rects
    }

    /// Move a circle just clear of this wall along its normal, toward
    /// whichever face its centre is nearer. Returns that outward normal.
    fn push_out(&self, center: &mut Vec2, radius: f32) -> Vec2 {
        let mid = self.rect.center();
        let clear = radius + WALL_CLEARANCE;
        if self.side.is_horizontal() {
            if center.y < mid.y {
                center.y = self.rect.min.y - clear;
                Vec2::NEG_Y
            } else {
                center.y = self.rect.max.y + clear;
                Vec2::Y
            }
        } else if center.x < mid.x {
            center.x = self.rect.min.x - clear;
            Vec2::NEG_X
        } else {
            center.x = self.rect.max.x + clear;
            Vec2::X
        }
    }

    /// True if a circle touches solid wall (not the gap)
    pub fn blocks_circle(&self, center: Vec2, radius: f32) -> bool {
        if !self.rect.intersects_circle(center, radius) {
            return false;
        }
        self.solid_rects()
            .iter()
            .any(|r| r.intersects_circle(center, radius))
    }
}

/// The walled central cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    /// Outer footprint including wall thickness
    pub bounds: Rect,
    pub walls: Vec<Wall>,
}

impl Structure {
    /// Four walls around `bounds`, openings supplied per side
    pub fn new(bounds: Rect, openings: [Option<Opening>; 4]) -> Self {
        let t = WALL_THICKNESS;
        let (min, max) = (bounds.min, bounds.max);
        let walls = WallSide::ALL
            .iter()
            .zip(openings)
            .map(|(&side, opening)| {
                let rect = match side {
                    WallSide::Top => Rect::new(min, Vec2::new(max.x, min.y + t)),
                    WallSide::Bottom => Rect::new(Vec2::new(min.x, max.y - t), max),
                    WallSide::Left => Rect::new(Vec2::new(min.x, min.y + t), Vec2::new(min.x + t, max.y - t)),
                    WallSide::Right => Rect::new(Vec2::new(max.x - t, min.y + t), Vec2::new(max.x, max.y - t)),
                };
                Wall {
                    side,
                    rect,
                    opening,
                    paused: false,
                }
            })
            .collect();
        Self { bounds, walls }
    }

    /// Advance every opening unless `is_occupied` reports something in its gap
    pub fn update_openings(&mut self, mut is_occupied: impl FnMut(&Rect) -> bool) {
        for wall in &mut self.walls {
            let Some(gap) = wall.opening_rect() else {
                continue;
            };
            wall.paused = is_occupied(&gap);
            if wall.paused {
                continue;
            }
            if let Some(opening) = wall.opening.as_mut() {
                opening.advance();
            }
        }
    }

    /// First wall whose solid part a circle touches
    pub fn blocking_wall(&self, center: Vec2, radius: f32) -> Option<WallSide> {
        if !self.bounds.intersects_circle(center, radius) {
            return None;
        }
        self.walls
            .iter()
            .find(|w| w.blocks_circle(center, radius))
            .map(|w| w.side)
    }

    /// Push a circle out of any solid wall it touches and mirror `vel` off
    /// each wall it was heading into. A sliding gap can close over a body
    /// sitting in it, so this resolves overlap rather than undoing a move.
    pub fn bounce_circle(&self, center: &mut Vec2, vel: &mut Vec2, radius: f32) -> bool {
        if !self.bounds.intersects_circle(*center, radius) {
            return false;
        }
        let mut hit = false;
        // Corners touch two walls; each push clears one
        for _ in 0..self.walls.len() {
            let Some(wall) = self.walls.iter().find(|w| w.blocks_circle(*center, radius)) else {
                break;
            };
            let normal = wall.push_out(center, radius);
            let into = vel.dot(normal);
            if into < 0.0 {
                *vel -= 2.0 * into * normal;
            }
            hit = true;
        }
        hit
    }

    /// True if `p` is on or inside the cell, with `margin` of slack
    pub fn covers(&self, p: Vec2, margin: f32) -> bool {
        self.bounds.expand(margin).contains(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_with_top_opening(position: f32) -> Structure {
        let bounds = Rect::new(Vec2::ZERO, Vec2::splat(600.0));
        let opening = Opening {
            position,
            gap: 0.2,
            direction: 1.0,
            speed: 0.01,
        };
        Structure::new(bounds, [Some(opening), None, None, None])
    }

    #[test]
    fn test_gap_is_passable() {
        let cell = cell_with_top_opening(0.4);
        // Gap spans x 240..360 on the top wall
        assert_eq!(cell.blocking_wall(Vec2::new(300.0, 10.0), 15.0), None);
        assert_eq!(
            cell.blocking_wall(Vec2::new(100.0, 10.0), 15.0),
            Some(WallSide::Top)
        );
        // Left wall has no gap
        assert_eq!(
            cell.blocking_wall(Vec2::new(10.0, 300.0), 15.0),
            Some(WallSide::Left)
        );
        // Centre of the cell is clear
        assert_eq!(cell.blocking_wall(Vec2::splat(300.0), 15.0), None);
    }

    #[test]
    fn test_opening_pauses_while_occupied() {
        let mut cell = cell_with_top_opening(0.4);
        let occupant = Vec2::new(300.0, 10.0);

        cell.update_openings(|gap| gap.intersects_circle(occupant, BODY_RADIUS));
        let opening = cell.walls[0].opening.unwrap();
        assert_eq!(opening.position, 0.4);
        assert!(cell.walls[0].paused);

        cell.update_openings(|_| false);
        let opening = cell.walls[0].opening.unwrap();
        assert!((opening.position - 0.41).abs() < 1e-6);
        assert!(!cell.walls[0].paused);
    }

    #[test]
    fn test_bounce_pushes_clear_of_closing_gap() {
        // Head sat in the gap at x=300; the gap has since slid past it
        let cell = cell_with_top_opening(0.7);
        let mut center = Vec2::new(300.0, 12.0);
        let mut vel = Vec2::new(0.0, 1.0);
        assert!(cell.bounce_circle(&mut center, &mut vel, 15.0));
        assert_eq!(cell.blocking_wall(center, 15.0), None);
        // Pushed to the inner face and still heading inward
        assert!(center.y > WALL_THICKNESS + 15.0);
        assert_eq!(vel, Vec2::new(0.0, 1.0));

        // Heading outward gets mirrored back
        let mut center = Vec2::new(300.0, 25.0);
        let mut vel = Vec2::new(0.5, -1.0);
        assert!(cell.bounce_circle(&mut center, &mut vel, 15.0));
        assert_eq!(vel, Vec2::new(0.5, 1.0));
    }

    #[test]
    fn test_bounce_clears_corners() {
        let cell = cell_with_top_opening(0.4);
        let mut center = Vec2::new(25.0, 25.0);
        let mut vel = Vec2::new(-1.0, -1.0);
        assert!(cell.bounce_circle(&mut center, &mut vel, 15.0));
        assert_eq!(cell.blocking_wall(center, 15.0), None);
        assert_eq!(vel, Vec2::new(1.0, 1.0));

        let mut free = Vec2::splat(300.0);
        let mut vel = Vec2::X;
        assert!(!cell.bounce_circle(&mut free, &mut vel, 15.0));
        assert_eq!(free, Vec2::splat(300.0));
    }

    #[test]
    fn test_opening_bounces_at_bounds() {
        let mut opening = Opening {
            position: 0.795,
            gap: 0.2,
            direction: 1.0,
            speed: 0.01,
        };
        opening.advance();
        assert_eq!(opening.position, opening.max_position());
        assert_eq!(opening.direction, -1.0);

        opening.position = 0.005;
        opening.advance();
        assert_eq!(opening.position, 0.0);
        assert_eq!(opening.direction, 1.0);
    }

    #[test]
    fn test_solid_rects_split_around_gap() {
        let cell = cell_with_top_opening(0.0);
        assert_eq!(cell.walls[0].solid_rects().len(), 1);
        let cell = cell_with_top_opening(0.4);
        assert_eq!(cell.walls[0].solid_rects().len(), 2);
        assert_eq!(cell.walls[1].solid_rects().len(), 1);
    }
}
