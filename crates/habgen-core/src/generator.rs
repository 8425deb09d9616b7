//! Constrained-random layout generation.
//!
//! One generation attempt runs SELECT_MODULES → PLACE_EACH_MODULE →
//! VALIDATE_CONNECTIVITY → SCORE. Placement samples envelope-specific
//! position distributions biased toward the envelope interior, then
//! falls back to anchored sampling around already-placed modules when
//! free sampling keeps missing. A module that exhausts its retry budget
//! fails the whole attempt; the batch keeps trying fresh attempts up to
//! an outer bound before declaring infeasibility.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::catalog::{ModuleCatalog, ModuleType};
use crate::connectivity::ConnectivityGraph;
use crate::envelope::{Envelope, EnvelopeShape};
use crate::error::{LayoutError, LayoutResult};
use crate::geometry::{PlacedBox, Rotation, Vec3};
use crate::layout::{build_rationale, GenerationParams, LayoutSpec, ModulePlacement};
use crate::mission::MissionParameters;
use crate::rules::RuleEngine;
use crate::scoring::score_layout;
use crate::spatial::SpatialIndex;

/// Tunable generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Minimum surface-to-surface clearance between modules.
    pub min_clearance_m: f32,
    /// Maximum gap at which two modules count as connected.
    pub connection_distance_m: f32,
    /// Position retries per module before the attempt fails.
    pub placement_retries: u32,
    /// Fraction of envelope volume modules may occupy.
    pub max_volume_fraction: f32,
    /// Outer attempts per requested layout before giving up.
    pub attempts_per_layout: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_clearance_m: 0.6,
            connection_distance_m: 1.2,
            placement_retries: 1000,
            max_volume_fraction: 0.7,
            attempts_per_layout: 10,
        }
    }
}

/// Module instance counts required for a mission, derived from crew
/// size and duration.
pub fn required_module_counts(mission: &MissionParameters) -> Vec<(ModuleType, u32)> {
    let crew = mission.crew_size;
    let days = mission.duration_days;
    vec![
        (ModuleType::Airlock, if crew <= 4 { 1 } else { 2 }),
        (ModuleType::Mechanical, crew.div_ceil(4)),
        (ModuleType::Galley, if crew <= 6 { 1 } else { 2 }),
        (
            ModuleType::Medical,
            if crew > 4 || days > 30 { 1 } else { 0 },
        ),
        (ModuleType::Laboratory, if days > 30 { 1 } else { 0 }),
        (ModuleType::Exercise, if days > 14 { 1 } else { 0 }),
        (ModuleType::Storage, (crew / 2).max(1)),
        (ModuleType::SleepQuarter, crew),
    ]
}

/// Flat placement roster in placement order: anchors (airlocks) first,
/// noisy infrastructure next, sleep quarters last.
fn placement_roster(mission: &MissionParameters) -> Vec<ModuleType> {
    let mut roster = Vec::new();
    for (module_type, count) in required_module_counts(mission) {
        for _ in 0..count {
            roster.push(module_type);
        }
    }
    roster
}

/// Sample a position inside the envelope, biased toward the interior.
///
/// Cylinder: polar with radius = min of two uniforms (center bias).
/// Box/freeform: triangular distribution per axis. Torus: uniform on
/// the major ring with small tube offsets.
fn sample_position(envelope: &Envelope, half: &Vec3, rng: &mut impl Rng) -> Vec3 {
    match envelope.shape {
        EnvelopeShape::Cylinder { radius_m, length_m } => {
            let x_max = (length_m / 2.0 - half.x).max(0.0);
            let x = if x_max > 0.0 {
                rng.gen_range(-x_max..=x_max)
            } else {
                0.0
            };
            let radial_extent = (half.y * half.y + half.z * half.z).sqrt();
            let r_max = (radius_m - radial_extent).max(0.0);
            let r = r_max * rng.gen::<f32>().min(rng.gen::<f32>());
            let theta = rng.gen_range(0.0..TAU);
            Vec3::new(x, r * theta.cos(), r * theta.sin())
        }
        EnvelopeShape::Box {
            width_m,
            depth_m,
            height_m,
        } => {
            let extents = [
                (width_m / 2.0 - half.x).max(0.0),
                (depth_m / 2.0 - half.y).max(0.0),
                (height_m / 2.0 - half.z).max(0.0),
            ];
            let mut coords = [0.0f32; 3];
            for (c, &e) in coords.iter_mut().zip(extents.iter()) {
                // Triangular: mean of two uniforms peaks at the center.
                let t = (rng.gen::<f32>() + rng.gen::<f32>()) / 2.0;
                *c = (t * 2.0 - 1.0) * e;
            }
            Vec3::new(coords[0], coords[1], coords[2])
        }
        EnvelopeShape::Torus {
            major_radius_m,
            minor_radius_m,
        } => {
            let theta = rng.gen_range(0.0..TAU);
            let tube_margin =
                (minor_radius_m - half.x.max(half.y).max(half.z) * 1.5).max(0.0);
            let r_off = if tube_margin > 0.0 {
                rng.gen_range(-tube_margin..=tube_margin) * 0.5
            } else {
                0.0
            };
            let z = if tube_margin > 0.0 {
                rng.gen_range(-tube_margin..=tube_margin) * 0.5
            } else {
                0.0
            };
            let rho = major_radius_m + r_off;
            Vec3::new(rho * theta.cos(), rho * theta.sin(), z)
        }
        EnvelopeShape::Freeform { bounding_m, .. } => {
            let extents = [
                (bounding_m[0] / 2.0 - half.x).max(0.0),
                (bounding_m[1] / 2.0 - half.y).max(0.0),
                (bounding_m[2] / 2.0 - half.z).max(0.0),
            ];
            let mut coords = [0.0f32; 3];
            for (c, &e) in coords.iter_mut().zip(extents.iter()) {
                let t = (rng.gen::<f32>() + rng.gen::<f32>()) / 2.0;
                *c = (t * 2.0 - 1.0) * e;
            }
            Vec3::new(coords[0], coords[1], coords[2])
        }
    }
}

/// Sample a position docked next to an already-placed module: offset
/// along a random horizontal axis with a gap inside the clearance /
/// connection band.
fn anchored_position(
    anchors: &SpatialIndex,
    half: &Vec3,
    config: &GeneratorConfig,
    rng: &mut impl Rng,
) -> Option<Vec3> {
    let count = anchors.len();
    if count == 0 {
        return None;
    }
    let (_, anchor) = anchors.iter().nth(rng.gen_range(0..count))?;
    let gap_hi = (config.connection_distance_m * 0.95).max(config.min_clearance_m + 0.05);
    let gap = rng.gen_range(config.min_clearance_m..gap_hi);
    let jitter = rng.gen_range(-0.5..0.5);
    let center = match rng.gen_range(0..4u32) {
        0 => Vec3::new(
            anchor.center.x + anchor.half.x + half.x + gap,
            anchor.center.y + jitter,
            anchor.center.z,
        ),
        1 => Vec3::new(
            anchor.center.x - anchor.half.x - half.x - gap,
            anchor.center.y + jitter,
            anchor.center.z,
        ),
        2 => Vec3::new(
            anchor.center.x + jitter,
            anchor.center.y + anchor.half.y + half.y + gap,
            anchor.center.z,
        ),
        _ => Vec3::new(
            anchor.center.x + jitter,
            anchor.center.y - anchor.half.y - half.y - gap,
            anchor.center.z,
        ),
    };
    Some(center)
}

/// Whether a candidate box is admissible against the placed set:
/// inside the envelope, clear of every module, and (after the first
/// module) adjacent to at least one.
fn candidate_ok(
    candidate: &PlacedBox,
    envelope: &Envelope,
    placed: &SpatialIndex,
    config: &GeneratorConfig,
) -> bool {
    if !envelope.contains_box(candidate) {
        return false;
    }
    let mut adjacent = placed.is_empty();
    for (_, other) in placed.iter() {
        if candidate.intersects(other, config.min_clearance_m) {
            return false;
        }
        if candidate.distance_to(other) <= config.connection_distance_m {
            adjacent = true;
        }
    }
    adjacent
}

/// Find an admissible (position, rotation) for a module with the given
/// footprint, within the retry budget. Free envelope sampling for the
/// first half of the budget, anchored sampling for the rest.
pub(crate) fn find_placement(
    envelope: &Envelope,
    dims: Vec3,
    placed: &SpatialIndex,
    config: &GeneratorConfig,
    rng: &mut impl Rng,
) -> Option<(Vec3, Rotation)> {
    let free_budget = config.placement_retries / 2;
    for retry in 0..config.placement_retries {
        let rotation = Rotation::ALL[rng.gen_range(0..4)];
        let half = PlacedBox::new(Vec3::ZERO, dims, rotation).half;
        let position = if placed.is_empty() || retry < free_budget {
            sample_position(envelope, &half, rng)
        } else {
            match anchored_position(placed, &half, config, rng) {
                Some(p) => p,
                None => sample_position(envelope, &half, rng),
            }
        };
        let candidate = PlacedBox { center: position, half };
        if candidate_ok(&candidate, envelope, placed, config) {
            return Some((position, rotation));
        }
    }
    None
}

/// Constrained-random layout generator.
///
/// Holds an explicit seeded RNG so that runs are reproducible; the
/// catalog and rule engine are borrowed, immutable, and shared.
pub struct LayoutGenerator<'a> {
    catalog: &'a ModuleCatalog,
    rules: &'a RuleEngine,
    config: GeneratorConfig,
    rng: ChaCha8Rng,
    seed: u64,
}

impl<'a> LayoutGenerator<'a> {
    pub fn new(
        catalog: &'a ModuleCatalog,
        rules: &'a RuleEngine,
        config: GeneratorConfig,
        seed: u64,
    ) -> Self {
        Self {
            catalog,
            rules,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate up to `count` valid layouts (1..=8).
    ///
    /// Individual attempt failures never abort the batch: the batch
    /// returns as many layouts as it produced, down to a minimum of
    /// one. Zero layouts is always an error, never an empty success.
    pub fn generate_layouts(
        &mut self,
        envelope: &Envelope,
        mission: &MissionParameters,
        count: usize,
    ) -> LayoutResult<Vec<LayoutSpec>> {
        if !(1..=8).contains(&count) {
            return Err(LayoutError::InvalidCount(count));
        }
        envelope.validate()?;
        mission.validate()?;

        let roster = placement_roster(mission);
        let mut required_m3 = 0.0f32;
        for &module_type in &roster {
            required_m3 += self.catalog.require_type(module_type)?.volume_m3();
        }
        let usable_m3 = envelope.volume_m3() * self.config.max_volume_fraction;
        if required_m3 > usable_m3 {
            log::warn!(
                "infeasible mission: {} modules need {:.1} m³, envelope offers {:.1} m³",
                roster.len(),
                required_m3,
                usable_m3
            );
            return Err(LayoutError::Infeasible {
                required_m3,
                usable_m3,
            });
        }

        let max_attempts = count as u32 * self.config.attempts_per_layout;
        let mut layouts = Vec::new();
        for attempt in 1..=max_attempts {
            if layouts.len() == count {
                break;
            }
            match self.generate_attempt(envelope, mission, &roster, attempt) {
                Some(layout) => layouts.push(layout),
                None => log::debug!("layout attempt {attempt} failed, retrying"),
            }
        }

        if layouts.is_empty() {
            return Err(LayoutError::GenerationExhausted {
                attempts: max_attempts,
            });
        }
        if layouts.len() < count {
            log::warn!(
                "produced {} of {} requested layouts before exhausting {} attempts",
                layouts.len(),
                count,
                max_attempts
            );
        } else {
            log::info!("generated {} layouts for crew of {}", layouts.len(), mission.crew_size);
        }
        Ok(layouts)
    }

    /// One full generation attempt. `None` when any module exhausts its
    /// placement budget or the finished set fails validation.
    fn generate_attempt(
        &mut self,
        envelope: &Envelope,
        mission: &MissionParameters,
        roster: &[ModuleType],
        attempt: u32,
    ) -> Option<LayoutSpec> {
        let mut placements: Vec<ModulePlacement> = Vec::with_capacity(roster.len());
        let mut placed = SpatialIndex::new();

        for (i, &module_type) in roster.iter().enumerate() {
            let def = self.catalog.definition_for(module_type)?;
            let dims = def.bbox.as_vec3();
            let (position, rotation) =
                find_placement(envelope, dims, &placed, &self.config, &mut self.rng)?;
            let module_id = i as u32 + 1;
            let placement = ModulePlacement::new(module_id, module_type, position, rotation);
            placed.insert(module_id, placement.placed_box(def));
            placements.push(placement);
        }

        let graph =
            ConnectivityGraph::build(&placements, self.catalog, self.config.connection_distance_m);
        if !graph.is_connected() {
            return None;
        }
        let (pressurized_ok, _) = graph.validate_pressurized_connectivity();
        if !pressurized_ok {
            return None;
        }
        for p in &mut placements {
            p.connections = graph.neighbors(p.module_id);
        }

        let metrics = score_layout(
            &placements,
            envelope,
            mission,
            self.catalog,
            self.rules,
            self.config.connection_distance_m,
        );
        let rationale = build_rationale(&placements, &metrics, mission);
        Some(LayoutSpec {
            envelope: *envelope,
            placements,
            metrics,
            rationale,
            generation: Some(GenerationParams {
                seed: self.seed,
                min_clearance_m: self.config.min_clearance_m,
                attempt,
            }),
        })
    }
}
