//! Collision checks between a candidate placement and an existing set.
//!
//! Pure functions over placement data — no randomness anywhere in this
//! module, so identical inputs always produce identical results.

use serde::{Deserialize, Serialize};

use crate::catalog::{ModuleCatalog, ModuleDefinition};
use crate::geometry::Vec3;
use crate::layout::ModulePlacement;
use crate::spatial::SpatialIndex;

/// What kind of conflict a collision check found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionKind {
    /// Boxes physically overlap.
    Penetration,
    /// Boxes are separated but closer than the required clearance.
    ClearanceViolation,
}

/// Result of checking one candidate placement against existing modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionResult {
    pub has_collision: bool,
    pub kind: Option<CollisionKind>,
    /// Minimum per-axis overlap amount; 0 when boxes don't overlap.
    pub penetration_depth: f32,
    /// Centers of overlap regions with each colliding module.
    pub contact_points: Vec<Vec3>,
    /// Translation that resolves the deepest penetration.
    pub resolution_vector: Option<Vec3>,
    /// IDs of modules in conflict with the candidate.
    pub colliding_modules: Vec<u32>,
}

impl CollisionResult {
    pub fn clear() -> Self {
        Self {
            has_collision: false,
            kind: None,
            penetration_depth: 0.0,
            contact_points: Vec::new(),
            resolution_vector: None,
            colliding_modules: Vec::new(),
        }
    }
}

/// Check a candidate placement against all existing placements.
///
/// Existing modules whose type has no catalog definition are skipped —
/// the generator never produces such placements.
pub fn check_module_collisions(
    candidate: &ModulePlacement,
    candidate_def: &ModuleDefinition,
    existing: &[ModulePlacement],
    catalog: &ModuleCatalog,
    min_clearance: f32,
) -> CollisionResult {
    let candidate_box = candidate.placed_box(candidate_def);
    let mut result = CollisionResult::clear();

    for other in existing {
        if other.module_id == candidate.module_id {
            continue;
        }
        let Some(other_def) = catalog.definition_for(other.module_type) else {
            continue;
        };
        let other_box = other.placed_box(other_def);

        if let Some(pen) = candidate_box.penetration(&other_box) {
            result.has_collision = true;
            result.kind = Some(CollisionKind::Penetration);
            result.contact_points.push(candidate_box.overlap_center(&other_box));
            result.colliding_modules.push(other.module_id);
            if pen.depth > result.penetration_depth {
                result.penetration_depth = pen.depth;
                result.resolution_vector = Some(pen.resolution);
            }
        } else if candidate_box.distance_to(&other_box) < min_clearance {
            result.has_collision = true;
            if result.kind != Some(CollisionKind::Penetration) {
                result.kind = Some(CollisionKind::ClearanceViolation);
            }
            result.colliding_modules.push(other.module_id);
        }
    }

    result
}

/// Symmetric matrix of surface-to-surface clearances for a placement
/// set, indexed by placement order. Diagonal entries are zero.
pub fn clearance_matrix(placements: &[ModulePlacement], catalog: &ModuleCatalog) -> Vec<Vec<f32>> {
    let boxes: Vec<_> = placements
        .iter()
        .map(|p| catalog.definition_for(p.module_type).map(|d| p.placed_box(d)))
        .collect();

    let n = placements.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let gap = match (&boxes[i], &boxes[j]) {
                (Some(a), Some(b)) => a.distance_to(b),
                _ => 0.0,
            };
            matrix[i][j] = gap;
            matrix[j][i] = gap;
        }
    }
    matrix
}

/// Validate that every inter-module gap that could serve as a walkway
/// is at least `min_walkway_m` wide. Gaps of zero (docked modules) are
/// not walkways and pass.
pub fn validate_walkway_clearance(
    placements: &[ModulePlacement],
    catalog: &ModuleCatalog,
    min_walkway_m: f32,
) -> (bool, Vec<String>) {
    let matrix = clearance_matrix(placements, catalog);
    let mut violations = Vec::new();
    for i in 0..placements.len() {
        for j in (i + 1)..placements.len() {
            let gap = matrix[i][j];
            if gap > 0.0 && gap < min_walkway_m {
                violations.push(format!(
                    "gap of {:.2} m between module {} and module {} is narrower than the {:.2} m walkway minimum",
                    gap, placements[i].module_id, placements[j].module_id, min_walkway_m
                ));
            }
        }
    }
    (violations.is_empty(), violations)
}

/// Check an explicit egress path polyline for clearance: no module box
/// may come within `required_width_m / 2` of any sampled path point,
/// except the modules the path starts or ends in.
pub fn check_egress_path_clearance(
    path: &[Vec3],
    placements: &[ModulePlacement],
    catalog: &ModuleCatalog,
    required_width_m: f32,
    exempt_modules: &[u32],
) -> (bool, Vec<String>) {
    const SAMPLE_STEP_M: f32 = 0.5;

    let mut index = SpatialIndex::new();
    for p in placements {
        if exempt_modules.contains(&p.module_id) {
            continue;
        }
        if let Some(def) = catalog.definition_for(p.module_type) {
            index.insert(p.module_id, p.placed_box(def));
        }
    }

    let mut violations = Vec::new();
    for pair in path.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let seg_len = a.distance(&b);
        let steps = (seg_len / SAMPLE_STEP_M).ceil().max(1.0) as u32;
        for s in 0..=steps {
            let t = s as f32 / steps as f32;
            let point = Vec3::new(
                a.x + (b.x - a.x) * t,
                a.y + (b.y - a.y) * t,
                a.z + (b.z - a.z) * t,
            );
            for id in index.query_nearby(&point, required_width_m / 2.0) {
                let msg = format!(
                    "module {id} obstructs the egress path near ({:.1}, {:.1}, {:.1})",
                    point.x, point.y, point.z
                );
                if !violations.contains(&msg) {
                    violations.push(msg);
                }
            }
        }
    }
    (violations.is_empty(), violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ModuleCatalog, ModuleType};
    use crate::geometry::Rotation;

    fn placement(id: u32, t: ModuleType, x: f32, y: f32) -> ModulePlacement {
        ModulePlacement::new(id, t, Vec3::new(x, y, 0.0), Rotation::R0)
    }

    #[test]
    fn test_no_collision_when_far_apart() {
        let catalog = ModuleCatalog::standard();
        let def = catalog.definition_for(ModuleType::SleepQuarter).unwrap();
        let candidate = placement(1, ModuleType::SleepQuarter, 0.0, 0.0);
        let existing = vec![placement(2, ModuleType::SleepQuarter, 10.0, 0.0)];
        let result = check_module_collisions(&candidate, def, &existing, &catalog, 0.6);
        assert!(!result.has_collision);
        assert_eq!(result.penetration_depth, 0.0);
        assert!(result.contact_points.is_empty());
        assert!(result.resolution_vector.is_none());
    }

    #[test]
    fn test_penetration_reported() {
        let catalog = ModuleCatalog::standard();
        let def = catalog.definition_for(ModuleType::SleepQuarter).unwrap();
        let candidate = placement(1, ModuleType::SleepQuarter, 0.0, 0.0);
        // Sleep quarters are 2m wide: centers 1m apart overlap by 1m on x.
        let existing = vec![placement(2, ModuleType::SleepQuarter, 1.0, 0.0)];
        let result = check_module_collisions(&candidate, def, &existing, &catalog, 0.6);
        assert!(result.has_collision);
        assert_eq!(result.kind, Some(CollisionKind::Penetration));
        assert!((result.penetration_depth - 1.0).abs() < 1e-6);
        assert_eq!(result.contact_points.len(), 1);
        assert!(result.resolution_vector.is_some());
        assert_eq!(result.colliding_modules, vec![2]);
    }

    #[test]
    fn test_clearance_violation_without_overlap() {
        let catalog = ModuleCatalog::standard();
        let def = catalog.definition_for(ModuleType::SleepQuarter).unwrap();
        let candidate = placement(1, ModuleType::SleepQuarter, 0.0, 0.0);
        // 0.3m gap, below the 0.6m minimum.
        let existing = vec![placement(2, ModuleType::SleepQuarter, 2.3, 0.0)];
        let result = check_module_collisions(&candidate, def, &existing, &catalog, 0.6);
        assert!(result.has_collision);
        assert_eq!(result.kind, Some(CollisionKind::ClearanceViolation));
        assert_eq!(result.penetration_depth, 0.0);
    }

    #[test]
    fn test_determinism_byte_identical() {
        let catalog = ModuleCatalog::standard();
        let def = catalog.definition_for(ModuleType::Galley).unwrap();
        let candidate = placement(1, ModuleType::Galley, 0.37, -1.21);
        let existing = vec![
            placement(2, ModuleType::Storage, 2.9, 0.4),
            placement(3, ModuleType::Mechanical, -3.3, 1.7),
        ];
        let a = check_module_collisions(&candidate, def, &existing, &catalog, 0.6);
        let b = check_module_collisions(&candidate, def, &existing, &catalog, 0.6);
        assert_eq!(a, b);
    }

    #[test]
    fn test_clearance_matrix_symmetric() {
        let catalog = ModuleCatalog::standard();
        let placements = vec![
            placement(1, ModuleType::SleepQuarter, 0.0, 0.0),
            placement(2, ModuleType::SleepQuarter, 5.0, 0.0),
            placement(3, ModuleType::Airlock, 0.0, 6.0),
        ];
        let m = clearance_matrix(&placements, &catalog);
        assert_eq!(m.len(), 3);
        for i in 0..3 {
            assert_eq!(m[i][i], 0.0);
            for j in 0..3 {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
        // Sleep quarters 2m wide, 5m apart → 3m gap.
        assert!((m[0][1] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_walkway_validation() {
        let catalog = ModuleCatalog::standard();
        // 0.4m gap between the two quarters: narrower than a 1.0m walkway.
        let placements = vec![
            placement(1, ModuleType::SleepQuarter, 0.0, 0.0),
            placement(2, ModuleType::SleepQuarter, 2.4, 0.0),
        ];
        let (ok, violations) = validate_walkway_clearance(&placements, &catalog, 1.0);
        assert!(!ok);
        assert_eq!(violations.len(), 1);

        let (ok, _) = validate_walkway_clearance(&placements, &catalog, 0.3);
        assert!(ok);
    }

    #[test]
    fn test_egress_path_clearance() {
        let catalog = ModuleCatalog::standard();
        let placements = vec![
            placement(1, ModuleType::Airlock, 0.0, 0.0),
            placement(2, ModuleType::Storage, 5.0, 0.2),
        ];
        let path = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)];
        // Storage module sits right on the path.
        let (ok, violations) =
            check_egress_path_clearance(&path, &placements, &catalog, 1.0, &[1]);
        assert!(!ok);
        assert!(violations[0].contains("module 2"));

        // Exempting it clears the path.
        let (ok, _) = check_egress_path_clearance(&path, &placements, &catalog, 1.0, &[1, 2]);
        assert!(ok);
    }
}
