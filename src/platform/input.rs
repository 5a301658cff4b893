//! Input intent: a heading, how hard it is pushed, and whether to fire
//!
//! Devices are reduced to one of two shapes. A pointer gives an offset from
//! the head on screen, a joystick gives an already-normalized stick vector.
//! The two are steered differently so they keep the source tag.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{JOYSTICK_BLEND, POINTER_BLEND};
use crate::{lerp, normalize_or};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputSource {
    #[default]
    Pointer,
    Joystick,
}

/// Per-tick steering intent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputIntent {
    /// Unit vector, or zero for "keep going"
    pub direction: Vec2,
    /// 0..=1
    pub intensity: f32,
    pub fire: bool,
    pub source: InputSource,
}

impl Default for InputIntent {
    fn default() -> Self {
        Self {
            direction: Vec2::ZERO,
            intensity: 0.0,
            fire: false,
            source: InputSource::Pointer,
        }
    }
}

impl InputIntent {
    /// Pointer offset from the head; `max_offset` maps to full intensity
    pub fn from_pointer(offset: Vec2, max_offset: f32) -> Self {
        if !offset.is_finite() || !max_offset.is_finite() || max_offset <= 0.0 {
            return Self::default();
        }
        Self {
            direction: normalize_or(offset, Vec2::ZERO),
            intensity: (offset.length() / max_offset).clamp(0.0, 1.0),
            fire: false,
            source: InputSource::Pointer,
        }
    }

    /// Stick deflection, magnitude treated as intensity
    pub fn from_joystick(stick: Vec2) -> Self {
        if !stick.is_finite() {
            return Self {
                source: InputSource::Joystick,
                ..Self::default()
            };
        }
        Self {
            direction: normalize_or(stick, Vec2::ZERO),
            intensity: stick.length().clamp(0.0, 1.0),
            fire: false,
            source: InputSource::Joystick,
        }
    }

    pub fn with_fire(mut self, fire: bool) -> Self {
        self.fire = fire;
        self
    }

    /// No heading requested
    #[inline]
    pub fn is_neutral(&self) -> bool {
        self.direction == Vec2::ZERO
    }

    /// How quickly the heading follows the intent
    pub fn steering_blend(&self) -> f32 {
        match self.source {
            InputSource::Pointer => POINTER_BLEND,
            InputSource::Joystick => JOYSTICK_BLEND,
        }
    }

    /// Multiplier on the level's base speed.
    ///
    /// Pointer: the speed upgrade pays out fully when the pointer sits on the
    /// head and fades as it moves away. Joystick: 30% at rest up to
    /// `100% + 10% per speed level` at full deflection.
    pub fn speed_factor(&self, speed_level: u8) -> f32 {
        let bonus = speed_level as f32 * 0.1;
        let intensity = self.intensity.clamp(0.0, 1.0);
        match self.source {
            InputSource::Pointer => 1.0 + bonus * (1.0 - intensity),
            InputSource::Joystick => lerp(0.3, 1.0 + bonus, intensity),
        }
    }
}
