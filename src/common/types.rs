//! Shared types used across the application.

use std::ops::{Add, Sub};

/// Server-assigned monster or NPC index.
pub type ObjectIndex = u16;

/// Item definition key: `category * 32 + index`, `-1` for zen.
pub type DefIndex = i16;

/// Size of one terrain grid cell in world units.
pub const GRID_UNIT: f32 = 100.0;

/// World-space position. `y` is height, the ground plane is `x`/`z`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Distance on the ground plane, ignoring height.
    pub fn flat_distance(&self, other: &Vec3) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn with_y(self, y: f32) -> Self {
        Self { y, ..self }
    }

    pub fn offset_y(self, dy: f32) -> Self {
        Self {
            y: self.y + dy,
            ..self
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Convert a server grid cell to the world position of its corner.
///
/// The grid's X axis runs along world Z.
pub fn grid_to_world(grid_x: u8, grid_y: u8) -> Vec3 {
    Vec3::new(grid_y as f32 * GRID_UNIT, 0.0, grid_x as f32 * GRID_UNIT)
}

/// Convert a server grid cell to the world position of its center.
pub fn grid_to_world_centered(grid_x: u8, grid_y: u8) -> Vec3 {
    Vec3::new(
        (grid_y as f32 + 0.5) * GRID_UNIT,
        0.0,
        (grid_x as f32 + 0.5) * GRID_UNIT,
    )
}

/// Kind of floating combat number shown above a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DamageKind {
    Normal = 0,
    Critical = 2,
    Excellent = 3,
    Miss = 7,
    HeroHit = 8,
    Experience = 9,
    Heal = 10,
}

impl DamageKind {
    /// Map the damage-type byte of a DAMAGE packet.
    pub fn from_damage_type(kind: u8) -> Self {
        match kind {
            0 => Self::Miss,
            2 => Self::Critical,
            3 => Self::Excellent,
            _ => Self::Normal,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}
