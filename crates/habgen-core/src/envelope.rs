//! Habitat pressure-vessel envelopes.
//!
//! An envelope is the outer volume modules are placed inside. Shapes are
//! centered on the origin: cylinders lie along the x axis, boxes are
//! axis-aligned, tori lie in the xy plane. Containment tests are
//! conservative — a box is inside only if all of its corners are.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::error::{LayoutError, LayoutResult};
use crate::geometry::PlacedBox;

/// Envelope shape and its defining parameters, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EnvelopeShape {
    /// Cylinder along the x axis.
    Cylinder { radius_m: f32, length_m: f32 },
    /// Axis-aligned box (width = x, depth = y, height = z).
    Box {
        width_m: f32,
        depth_m: f32,
        height_m: f32,
    },
    /// Torus in the xy plane.
    Torus {
        major_radius_m: f32,
        minor_radius_m: f32,
    },
    /// Freeform hull approximated by its bounding box and a measured volume.
    Freeform {
        bounding_m: [f32; 3],
        volume_m3: f32,
    },
}

/// The outer pressure-vessel volume modules are placed inside.
/// Immutable once created; owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub shape: EnvelopeShape,
}

impl Envelope {
    pub fn cylinder(radius_m: f32, length_m: f32) -> Self {
        Self {
            shape: EnvelopeShape::Cylinder { radius_m, length_m },
        }
    }

    pub fn cuboid(width_m: f32, depth_m: f32, height_m: f32) -> Self {
        Self {
            shape: EnvelopeShape::Box {
                width_m,
                depth_m,
                height_m,
            },
        }
    }

    pub fn torus(major_radius_m: f32, minor_radius_m: f32) -> Self {
        Self {
            shape: EnvelopeShape::Torus {
                major_radius_m,
                minor_radius_m,
            },
        }
    }

    /// Check physical validity of the shape parameters.
    pub fn validate(&self) -> LayoutResult<()> {
        match self.shape {
            EnvelopeShape::Cylinder { radius_m, length_m } => {
                if radius_m <= 0.0 || length_m <= 0.0 {
                    return Err(LayoutError::InvalidEnvelope(format!(
                        "cylinder dimensions must be positive, got radius={radius_m}, length={length_m}"
                    )));
                }
            }
            EnvelopeShape::Box {
                width_m,
                depth_m,
                height_m,
            } => {
                if width_m <= 0.0 || depth_m <= 0.0 || height_m <= 0.0 {
                    return Err(LayoutError::InvalidEnvelope(format!(
                        "box dimensions must be positive, got {width_m}×{depth_m}×{height_m}"
                    )));
                }
            }
            EnvelopeShape::Torus {
                major_radius_m,
                minor_radius_m,
            } => {
                if major_radius_m <= 0.0 || minor_radius_m <= 0.0 {
                    return Err(LayoutError::InvalidEnvelope(
                        "torus radii must be positive".to_string(),
                    ));
                }
                if minor_radius_m >= major_radius_m {
                    return Err(LayoutError::InvalidEnvelope(format!(
                        "torus minor radius {minor_radius_m} must be smaller than major radius {major_radius_m}"
                    )));
                }
            }
            EnvelopeShape::Freeform {
                bounding_m,
                volume_m3,
            } => {
                if bounding_m.iter().any(|&d| d <= 0.0) || volume_m3 <= 0.0 {
                    return Err(LayoutError::InvalidEnvelope(
                        "freeform bounding dimensions and volume must be positive".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Interior volume in m³.
    pub fn volume_m3(&self) -> f32 {
        match self.shape {
            EnvelopeShape::Cylinder { radius_m, length_m } => PI * radius_m * radius_m * length_m,
            EnvelopeShape::Box {
                width_m,
                depth_m,
                height_m,
            } => width_m * depth_m * height_m,
            EnvelopeShape::Torus {
                major_radius_m,
                minor_radius_m,
            } => 2.0 * PI * PI * major_radius_m * minor_radius_m * minor_radius_m,
            EnvelopeShape::Freeform { volume_m3, .. } => volume_m3,
        }
    }

    /// True if the box lies entirely inside the envelope.
    pub fn contains_box(&self, b: &PlacedBox) -> bool {
        match self.shape {
            EnvelopeShape::Cylinder { radius_m, length_m } => {
                if b.center.x.abs() + b.half.x > length_m / 2.0 {
                    return false;
                }
                // Worst-case corner in the radial (yz) plane.
                let ry = b.center.y.abs() + b.half.y;
                let rz = b.center.z.abs() + b.half.z;
                (ry * ry + rz * rz).sqrt() <= radius_m
            }
            EnvelopeShape::Box {
                width_m,
                depth_m,
                height_m,
            } => {
                b.center.x.abs() + b.half.x <= width_m / 2.0
                    && b.center.y.abs() + b.half.y <= depth_m / 2.0
                    && b.center.z.abs() + b.half.z <= height_m / 2.0
            }
            EnvelopeShape::Torus {
                major_radius_m,
                minor_radius_m,
            } => {
                // Conservative: farthest footprint corner from the ring
                // center line must stay within the minor-radius tube.
                let rho = (b.center.x * b.center.x + b.center.y * b.center.y).sqrt();
                let planar = (rho - major_radius_m).abs() + b.half.x.max(b.half.y);
                let vertical = b.center.z.abs() + b.half.z;
                (planar * planar + vertical * vertical).sqrt() <= minor_radius_m
            }
            EnvelopeShape::Freeform { bounding_m, .. } => {
                b.center.x.abs() + b.half.x <= bounding_m[0] / 2.0
                    && b.center.y.abs() + b.half.y <= bounding_m[1] / 2.0
                    && b.center.z.abs() + b.half.z <= bounding_m[2] / 2.0
            }
        }
    }
}
