//! Shared geometric primitives used across J3D and BRRES model data.

pub use glam::{Mat4, Quat, Vec2, Vec3};

/// Translation / rotation (Euler degrees on read, stored as provided) /
/// scale triple used by joints and animation keys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Srt {
    pub scale: Vec3,
    pub rotation: Vec3,
    pub translation: Vec3,
}

impl Default for Srt {
    fn default() -> Self {
        Self {
            scale: Vec3::ONE,
            rotation: Vec3::ZERO,
            translation: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}
