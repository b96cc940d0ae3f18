// src/graph/position.rs

use crate::error::EnhancerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source position relative to a listener at the origin facing -z, +y up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn length(&self) -> f32 {
        self.dot(*self).sqrt()
    }

    pub fn dot(&self, o: Position) -> f32 {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    pub fn cross(&self, o: Position) -> Position {
        Position::new(
            self.y * o.z - self.z * o.y,
            self.z * o.x - self.x * o.z,
            self.x * o.y - self.y * o.x,
        )
    }

    pub fn scale(&self, k: f32) -> Position {
        Position::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn sub(&self, o: Position) -> Position {
        Position::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }

    /// Unit vector, or `None` for (near) zero length.
    pub fn normalized(&self) -> Option<Position> {
        let len = self.length();
        if len <= f32::EPSILON {
            None
        } else {
            Some(self.scale(1.0 / len))
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// The three fixed positions behind the 4D / 6D / 8D buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialPreset {
    FourD,
    SixD,
    EightD,
}

impl SpatialPreset {
    pub const ALL: [SpatialPreset; 3] = [SpatialPreset::FourD, SpatialPreset::SixD, SpatialPreset::EightD];

    pub fn position(self) -> Position {
        match self {
            SpatialPreset::FourD => Position::new(0.0, 0.0, 1.0),
            SpatialPreset::SixD => Position::new(1.0, 0.0, 0.0),
            SpatialPreset::EightD => Position::new(1.0, 1.0, 1.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpatialPreset::FourD => "4D",
            SpatialPreset::SixD => "6D",
            SpatialPreset::EightD => "8D",
        }
    }
}

impl FromStr for SpatialPreset {
    type Err = EnhancerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "4" | "4d" => Ok(SpatialPreset::FourD),
            "6" | "6d" => Ok(SpatialPreset::SixD),
            "8" | "8d" => Ok(SpatialPreset::EightD),
            _ => Err(EnhancerError::UnknownPreset(s.to_string())),
        }
    }
}
