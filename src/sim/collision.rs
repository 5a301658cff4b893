//! Collision helpers for circles, axis-aligned rects and the world band
//!
//! Everything is approximate circle-distance work: good enough for an
//! arcade feel, no penetration solving.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        Self::new(center - size * 0.5, center + size * 0.5)
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Grow (or shrink, for negative margins) on every side
    pub fn expand(&self, margin: f32) -> Self {
        Self::new(self.min - Vec2::splat(margin), self.max + Vec2::splat(margin))
    }

    #[inline]
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        self.closest_point(center).distance_squared(center) <= radius * radius
    }
}

#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) < r * r
}

/// Square world with a border band along every edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    /// Side length
    pub size: f32,
    /// Width of the border band
    pub border: f32,
}

impl WorldBounds {
    pub fn new(size: f32, border: f32) -> Self {
        Self { size, border }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::splat(self.size * 0.5)
    }

    /// Whole world square
    pub fn outer(&self) -> Rect {
        Rect::new(Vec2::ZERO, Vec2::splat(self.size))
    }

    /// Area inside the border band
    pub fn playable(&self) -> Rect {
        Rect::new(Vec2::splat(self.border), Vec2::splat(self.size - self.border))
    }

    /// True if a circle pokes into the border band
    pub fn in_border(&self, p: Vec2, radius: f32) -> bool {
        !self.playable().expand(-radius).contains(p)
    }

    /// Clamp a circle back inside the playable band
    pub fn clamp_inside(&self, p: Vec2, radius: f32) -> Vec2 {
        self.playable().expand(-radius).closest_point(p)
    }

    /// True if a point is outside the world entirely
    pub fn out_of_world(&self, p: Vec2) -> bool {
        !self.outer().contains(p)
    }
}

/// Reflect `dir` off the sides of `area` that the circle at `pos` has crossed,
/// clamping `pos` back inside. Returns true if anything bounced.
pub fn reflect_in_rect(pos: &mut Vec2, dir: &mut Vec2, area: &Rect, radius: f32) -> bool {
    let inner = area.expand(-radius);
    let mut bounced = false;

    if pos.x < inner.min.x {
        pos.x = inner.min.x;
        dir.x = dir.x.abs();
        bounced = true;
    } else if pos.x > inner.max.x {
        pos.x = inner.max.x;
        dir.x = -dir.x.abs();
        bounced = true;
    }

    if pos.y < inner.min.y {
        pos.y = inner.min.y;
        dir.y = dir.y.abs();
        bounced = true;
    } else if pos.y > inner.max.y {
        pos.y = inner.max.y;
        dir.y = -dir.y.abs();
        bounced = true;
    }

    bounced
}
