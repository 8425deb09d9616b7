//! Oriented bounding boxes for placed modules.
//!
//! Module rotations are restricted to quarter turns about the vertical
//! axis, so a rotated box is always axis-aligned: 90° and 270° swap the
//! x/y extents, 0° and 180° leave them unchanged. All queries are pure
//! functions — identical inputs give byte-identical results.

use serde::{Deserialize, Serialize};

/// A point or displacement in 3D space, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Quarter-turn rotation about the vertical (z) axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Whether this rotation swaps the x/y footprint of a box.
    pub fn swaps_footprint(&self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }
}

/// Result of a penetration query between two overlapping boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Minimum per-axis overlap amount.
    pub depth: f32,
    /// Translation that separates the boxes along the minimum-overlap axis.
    pub resolution: Vec3,
}

/// Axis-aligned bounding box of a placed module.
///
/// `half` extents already account for the module's rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedBox {
    pub center: Vec3,
    pub half: Vec3,
}

impl PlacedBox {
    /// Build the box for a module with footprint `dims` (x,y,z full
    /// extents in meters) placed at `center` with the given rotation.
    pub fn new(center: Vec3, dims: Vec3, rotation: Rotation) -> Self {
        let (hx, hy) = if rotation.swaps_footprint() {
            (dims.y / 2.0, dims.x / 2.0)
        } else {
            (dims.x / 2.0, dims.y / 2.0)
        };
        Self {
            center,
            half: Vec3::new(hx, hy, dims.z / 2.0),
        }
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(
            self.center.x - self.half.x,
            self.center.y - self.half.y,
            self.center.z - self.half.z,
        )
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(
            self.center.x + self.half.x,
            self.center.y + self.half.y,
            self.center.z + self.half.z,
        )
    }

    pub fn volume(&self) -> f32 {
        8.0 * self.half.x * self.half.y * self.half.z
    }

    /// True if the boxes, each inflated by `clearance / 2` per side,
    /// overlap on all three axes. With `clearance = 0` this is a plain
    /// intersection test; touching surfaces do not count as overlap.
    pub fn intersects(&self, other: &PlacedBox, clearance: f32) -> bool {
        let dx = (self.center.x - other.center.x).abs();
        let dy = (self.center.y - other.center.y).abs();
        let dz = (self.center.z - other.center.z).abs();
        dx < self.half.x + other.half.x + clearance
            && dy < self.half.y + other.half.y + clearance
            && dz < self.half.z + other.half.z + clearance
    }

    /// Surface-to-surface gap between two boxes. Zero if they overlap
    /// or touch. When only one axis separates the boxes this equals the
    /// gap along that separating axis.
    pub fn distance_to(&self, other: &PlacedBox) -> f32 {
        let gx = ((self.center.x - other.center.x).abs() - self.half.x - other.half.x).max(0.0);
        let gy = ((self.center.y - other.center.y).abs() - self.half.y - other.half.y).max(0.0);
        let gz = ((self.center.z - other.center.z).abs() - self.half.z - other.half.z).max(0.0);
        (gx * gx + gy * gy + gz * gz).sqrt()
    }

    /// Distance from a point to the box surface (0 if inside).
    pub fn distance_to_point(&self, p: &Vec3) -> f32 {
        let gx = ((p.x - self.center.x).abs() - self.half.x).max(0.0);
        let gy = ((p.y - self.center.y).abs() - self.half.y).max(0.0);
        let gz = ((p.z - self.center.z).abs() - self.half.z).max(0.0);
        (gx * gx + gy * gy + gz * gz).sqrt()
    }

    pub fn contains_point(&self, p: &Vec3) -> bool {
        (p.x - self.center.x).abs() <= self.half.x
            && (p.y - self.center.y).abs() <= self.half.y
            && (p.z - self.center.z).abs() <= self.half.z
    }

    /// Penetration depth and resolution vector when boxes overlap.
    /// `None` when they don't (touching counts as not overlapping).
    pub fn penetration(&self, other: &PlacedBox) -> Option<Penetration> {
        let ox = self.half.x + other.half.x - (self.center.x - other.center.x).abs();
        let oy = self.half.y + other.half.y - (self.center.y - other.center.y).abs();
        let oz = self.half.z + other.half.z - (self.center.z - other.center.z).abs();
        if ox <= 0.0 || oy <= 0.0 || oz <= 0.0 {
            return None;
        }

        // Separate along the axis of minimum overlap.
        let (depth, resolution) = if ox <= oy && ox <= oz {
            let sign = if self.center.x >= other.center.x { 1.0 } else { -1.0 };
            (ox, Vec3::new(sign * ox, 0.0, 0.0))
        } else if oy <= oz {
            let sign = if self.center.y >= other.center.y { 1.0 } else { -1.0 };
            (oy, Vec3::new(0.0, sign * oy, 0.0))
        } else {
            let sign = if self.center.z >= other.center.z { 1.0 } else { -1.0 };
            (oz, Vec3::new(0.0, 0.0, sign * oz))
        };
        Some(Penetration { depth, resolution })
    }

    /// Center of the overlap region of two intersecting boxes.
    pub fn overlap_center(&self, other: &PlacedBox) -> Vec3 {
        let lo_x = self.min().x.max(other.min().x);
        let hi_x = self.max().x.min(other.max().x);
        let lo_y = self.min().y.max(other.min().y);
        let hi_y = self.max().y.min(other.max().y);
        let lo_z = self.min().z.max(other.min().z);
        let hi_z = self.max().z.min(other.max().z);
        Vec3::new((lo_x + hi_x) / 2.0, (lo_y + hi_y) / 2.0, (lo_z + hi_z) / 2.0)
    }
}
