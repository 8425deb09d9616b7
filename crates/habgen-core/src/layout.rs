//! Layout data model — placements and finished layout specs.

use serde::{Deserialize, Serialize};

use crate::catalog::{ModuleDefinition, ModuleType};
use crate::envelope::Envelope;
use crate::geometry::{PlacedBox, Rotation, Vec3};
use crate::mission::MissionParameters;
use crate::scoring::PerformanceMetrics;

/// A module instance embedded in one layout.
///
/// `module_id` is unique within the layout, not the catalog ID.
/// `connections` is populated by the connectivity engine once the
/// placement set is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulePlacement {
    pub module_id: u32,
    pub module_type: ModuleType,
    pub position: Vec3,
    pub rotation: Rotation,
    pub connections: Vec<u32>,
}

impl ModulePlacement {
    pub fn new(module_id: u32, module_type: ModuleType, position: Vec3, rotation: Rotation) -> Self {
        Self {
            module_id,
            module_type,
            position,
            rotation,
            connections: Vec::new(),
        }
    }

    /// Bounding box of this placement given its catalog definition.
    pub fn placed_box(&self, def: &ModuleDefinition) -> PlacedBox {
        PlacedBox::new(self.position, def.bbox.as_vec3(), self.rotation)
    }
}

/// Parameters that produced a generated layout, kept for reproducibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub seed: u64,
    pub min_clearance_m: f32,
    /// Which generation attempt produced this layout (1-based).
    pub attempt: u32,
}

/// A complete scored habitat layout.
///
/// Created by the generator or as one optimizer individual; immutable
/// once scored — edits replace the placement set and trigger rescoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub envelope: Envelope,
    pub placements: Vec<ModulePlacement>,
    pub metrics: PerformanceMetrics,
    /// Natural-language rationale for this layout.
    pub rationale: String,
    pub generation: Option<GenerationParams>,
}

impl LayoutSpec {
    pub fn module_count(&self) -> usize {
        self.placements.len()
    }

    pub fn count_of_type(&self, module_type: ModuleType) -> usize {
        self.placements
            .iter()
            .filter(|p| p.module_type == module_type)
            .count()
    }
}

/// Build the explainability string for a scored placement set.
pub fn build_rationale(
    placements: &[ModulePlacement],
    metrics: &PerformanceMetrics,
    mission: &MissionParameters,
) -> String {
    let mut counts: Vec<(ModuleType, usize)> = Vec::new();
    for p in placements {
        match counts.iter_mut().find(|(t, _)| *t == p.module_type) {
            Some((_, n)) => *n += 1,
            None => counts.push((p.module_type, 1)),
        }
    }
    let mix = counts
        .iter()
        .map(|(t, n)| format!("{n} {}", t.label()))
        .collect::<Vec<_>>()
        .join(", ");

    let airlocks = placements
        .iter()
        .filter(|p| p.module_type == ModuleType::Airlock)
        .count();
    let redundancy = if airlocks >= 2 {
        "redundant egress paths"
    } else {
        "a single egress path"
    };

    format!(
        "Layout for a crew of {} over {} days: {mix}. \
         All modules are connected with {redundancy}; worst-case egress takes {:.0} s \
         and the mean inter-module transit is {:.0} s. \
         Scores — connectivity {:.2}, safety {:.2}, efficiency {:.2}, overall {:.2}.",
        mission.crew_size,
        mission.duration_days,
        metrics.egress_time_s,
        metrics.mean_transit_time_s,
        metrics.connectivity_score,
        metrics.safety_score,
        metrics.efficiency_score,
        metrics.overall_score,
    )
}
