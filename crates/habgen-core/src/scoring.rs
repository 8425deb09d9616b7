//! Scoring — aggregates geometry, connectivity, and grammar signals
//! into one performance-metrics vector per layout.
//!
//! Every score is a pure function of the layout and mission: the same
//! placement set with the same mission always scores identically.
//! Margin and utilization fractions are unbounded by design — values
//! above 1 or below 0 signal constraint violations to the caller.
//! Derived scores are always in [0, 1].

use serde::{Deserialize, Serialize};

use crate::catalog::{ModuleCatalog, ModuleType};
use crate::connectivity::ConnectivityGraph;
use crate::envelope::Envelope;
use crate::layout::ModulePlacement;
use crate::mission::MissionParameters;
use crate::rules::RuleEngine;

/// Crew metabolic heat load, W per person.
pub const CREW_METABOLIC_HEAT_W: f64 = 100.0;

/// Heat-rejection capacity contributed by each mechanical/ECLSS module.
pub const THERMAL_REJECTION_PER_MECHANICAL_W: f64 = 12_000.0;

/// Passive hull heat rejection independent of mechanical modules.
pub const BASE_THERMAL_REJECTION_W: f64 = 2_000.0;

/// Crew members one mechanical/ECLSS module can sustain.
pub const LSS_CREW_PER_MECHANICAL: f64 = 4.0;

/// Consumables stowage demand, m³ per crew member per day.
pub const STOWAGE_M3_PER_CREW_DAY: f64 = 0.025;

const TRANSIT_HALF_TIME_S: f64 = 60.0;
const EGRESS_HALF_TIME_S: f64 = 120.0;
const REF_MASS_PER_CREW_KG: f64 = 2500.0;
const REF_POWER_PER_CREW_W: f64 = 1500.0;
/// Envelope fill fraction the volume score peaks at.
const TARGET_VOLUME_UTILIZATION: f64 = 0.45;

/// Full performance vector for one layout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub mean_transit_time_s: f64,
    /// Worst-case time to the nearest reachable airlock.
    pub egress_time_s: f64,
    pub total_mass_kg: f64,
    pub total_power_w: f64,
    /// Heat-rejection headroom as a fraction of the thermal load;
    /// negative means a deficit.
    pub thermal_margin: f64,
    /// Life-support headroom as a fraction of crew demand.
    pub lss_margin: f64,
    /// Consumables demand over available stowage; above 1 means the
    /// layout cannot stow the mission.
    pub stowage_utilization: f64,
    pub connectivity_score: f64,
    pub safety_score: f64,
    pub efficiency_score: f64,
    /// Module volume over envelope volume (raw fraction).
    pub volume_utilization: f64,
    /// Priority-weighted composite, in [0, 1].
    pub overall_score: f64,
}

fn inverse_time_score(time_s: f64, half_time_s: f64) -> f64 {
    if time_s.is_finite() {
        1.0 / (1.0 + time_s / half_time_s)
    } else {
        0.0
    }
}

/// Score a placement set against an envelope and mission.
pub fn score_layout(
    placements: &[ModulePlacement],
    envelope: &Envelope,
    mission: &MissionParameters,
    catalog: &ModuleCatalog,
    rules: &RuleEngine,
    connection_distance_m: f32,
) -> PerformanceMetrics {
    let graph = ConnectivityGraph::build(placements, catalog, connection_distance_m);
    let evaluation = rules.evaluate_layout(placements, catalog, mission, None);

    let crew = mission.crew_size as f64;
    let duration = mission.duration_days as f64;

    // Resource sums from the constituent definitions.
    let mut total_mass_kg = 0.0;
    let mut total_power_w = 0.0;
    let mut stowage_available_m3 = 0.0;
    let mut module_volume_m3 = 0.0;
    let mut mechanical_count = 0u32;
    let mut airlock_count = 0u32;
    for p in placements {
        let Some(def) = catalog.definition_for(p.module_type) else {
            continue;
        };
        total_mass_kg += def.mass_kg as f64;
        total_power_w += def.power_w as f64;
        stowage_available_m3 += def.stowage_m3 as f64;
        module_volume_m3 += def.volume_m3() as f64;
        match p.module_type {
            ModuleType::Mechanical => mechanical_count += 1,
            ModuleType::Airlock => airlock_count += 1,
            _ => {}
        }
    }

    // Thermal: module power plus crew metabolic heat against rejection capacity.
    let thermal_load_w = total_power_w + crew * CREW_METABOLIC_HEAT_W;
    let rejection_w =
        BASE_THERMAL_REJECTION_W + mechanical_count as f64 * THERMAL_REJECTION_PER_MECHANICAL_W;
    let thermal_margin = if thermal_load_w > 0.0 {
        (rejection_w - thermal_load_w) / thermal_load_w
    } else {
        1.0
    };

    // Life support: capacity in crew-equivalents, demand grows slightly
    // with mission length (filter and sorbent wear).
    let lss_capacity = mechanical_count as f64 * LSS_CREW_PER_MECHANICAL;
    let lss_demand = crew * (1.0 + 0.1 * duration / 365.0);
    let lss_margin = (lss_capacity - lss_demand) / lss_demand;

    let stowage_demand_m3 = crew * duration * STOWAGE_M3_PER_CREW_DAY;
    let stowage_utilization = if stowage_available_m3 > 0.0 {
        stowage_demand_m3 / stowage_available_m3
    } else if stowage_demand_m3 > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let mean_transit_time_s = graph.mean_transit_time_s() as f64;
    let egress_time_s = graph.worst_egress_time_s() as f64;

    let connectivity_score = inverse_time_score(mean_transit_time_s, TRANSIT_HALF_TIME_S);

    let safety_score = if evaluation.critical_violations > 0 {
        0.0
    } else {
        let egress_component = inverse_time_score(egress_time_s, EGRESS_HALF_TIME_S);
        let redundancy = match airlock_count {
            0 => 0.0,
            1 => 0.6,
            _ => 1.0,
        };
        0.5 * egress_component + 0.3 * redundancy + 0.2 * evaluation.rule_compliance_score
    };

    let mass_per_crew = total_mass_kg / crew;
    let power_per_crew = total_power_w / crew;
    let efficiency_score = 0.5 * (REF_MASS_PER_CREW_KG / (REF_MASS_PER_CREW_KG + mass_per_crew))
        + 0.5 * (REF_POWER_PER_CREW_W / (REF_POWER_PER_CREW_W + power_per_crew));

    let envelope_volume = envelope.volume_m3() as f64;
    let volume_utilization = if envelope_volume > 0.0 {
        module_volume_m3 / envelope_volume
    } else {
        0.0
    };
    let volume_score = (1.0
        - (volume_utilization - TARGET_VOLUME_UTILIZATION).abs() / TARGET_VOLUME_UTILIZATION)
        .clamp(0.0, 1.0);

    let w = &mission.priority_weights;
    let weight_sum = w.connectivity + w.safety + w.efficiency + w.volume;
    let overall_score = if weight_sum > 0.0 {
        ((w.connectivity * connectivity_score
            + w.safety * safety_score
            + w.efficiency * efficiency_score
            + w.volume * volume_score)
            / weight_sum)
            .clamp(0.0, 1.0)
    } else {
        0.0
    };

    PerformanceMetrics {
        mean_transit_time_s,
        egress_time_s,
        total_mass_kg,
        total_power_w,
        thermal_margin,
        lss_margin,
        stowage_utilization,
        connectivity_score,
        safety_score,
        efficiency_score,
        volume_utilization,
        overall_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::DEFAULT_CONNECTION_DISTANCE_M;
    use crate::geometry::{Rotation, Vec3};

    fn placement(id: u32, t: ModuleType, x: f32, y: f32) -> ModulePlacement {
        ModulePlacement::new(id, t, Vec3::new(x, y, 0.0), Rotation::R0)
    }

    /// Connected strip of modules inside a 5×20 cylinder.
    fn test_layout() -> (Vec<ModulePlacement>, Envelope, MissionParameters) {
        let placements = vec![
            placement(1, ModuleType::Airlock, -5.0, 0.0),
            placement(2, ModuleType::SleepQuarter, -2.5, 0.0),
            placement(3, ModuleType::SleepQuarter, 0.0, 0.0),
            placement(4, ModuleType::Galley, 3.0, 0.0),
            placement(5, ModuleType::Mechanical, 6.2, 0.0),
            placement(6, ModuleType::Storage, -5.0, 2.5),
        ];
        (
            placements,
            Envelope::cylinder(5.0, 20.0),
            MissionParameters::new(2, 30),
        )
    }

    #[test]
    fn test_mass_and_power_sum_from_definitions() {
        let (placements, envelope, mission) = test_layout();
        let catalog = ModuleCatalog::standard();
        let rules = RuleEngine::with_builtin_sets();
        let m = score_layout(
            &placements,
            &envelope,
            &mission,
            &catalog,
            &rules,
            DEFAULT_CONNECTION_DISTANCE_M,
        );
        // airlock 1200 + 2×sleep 800 + galley 1400 + mechanical 2200 + storage 600
        assert!((m.total_mass_kg - 7000.0).abs() < 1e-6);
        // 300 + 2×150 + 1800 + 900 + 100
        assert!((m.total_power_w - 3400.0).abs() < 1e-6);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let (placements, envelope, mission) = test_layout();
        let catalog = ModuleCatalog::standard();
        let rules = RuleEngine::with_builtin_sets();
        let a = score_layout(
            &placements,
            &envelope,
            &mission,
            &catalog,
            &rules,
            DEFAULT_CONNECTION_DISTANCE_M,
        );
        let b = score_layout(
            &placements,
            &envelope,
            &mission,
            &catalog,
            &rules,
            DEFAULT_CONNECTION_DISTANCE_M,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_scores_in_unit_interval() {
        let (placements, envelope, mission) = test_layout();
        let catalog = ModuleCatalog::standard();
        let rules = RuleEngine::with_builtin_sets();
        let m = score_layout(
            &placements,
            &envelope,
            &mission,
            &catalog,
            &rules,
            DEFAULT_CONNECTION_DISTANCE_M,
        );
        for (name, v) in [
            ("connectivity", m.connectivity_score),
            ("safety", m.safety_score),
            ("efficiency", m.efficiency_score),
            ("overall", m.overall_score),
        ] {
            assert!((0.0..=1.0).contains(&v), "{name} score {v} out of range");
        }
    }

    #[test]
    fn test_thermal_margin_sign() {
        let catalog = ModuleCatalog::standard();
        let rules = RuleEngine::with_builtin_sets();
        let envelope = Envelope::cylinder(5.0, 20.0);
        let mission = MissionParameters::new(2, 30);

        // With a mechanical module: plenty of rejection headroom.
        let with_mech = vec![
            placement(1, ModuleType::Airlock, 0.0, 0.0),
            placement(2, ModuleType::Mechanical, 3.0, 0.0),
        ];
        let m = score_layout(
            &with_mech,
            &envelope,
            &mission,
            &catalog,
            &rules,
            DEFAULT_CONNECTION_DISTANCE_M,
        );
        assert!(m.thermal_margin > 0.0);

        // Galley-heavy layout with no mechanical module runs a deficit.
        let no_mech = vec![
            placement(1, ModuleType::Airlock, 0.0, 0.0),
            placement(2, ModuleType::Galley, 3.2, 0.0),
        ];
        let m = score_layout(
            &no_mech,
            &envelope,
            &mission,
            &catalog,
            &rules,
            DEFAULT_CONNECTION_DISTANCE_M,
        );
        assert!(m.thermal_margin < 0.0);
        assert!(m.lss_margin < 0.0);
    }

    #[test]
    fn test_stowage_utilization_scales_with_duration() {
        let (placements, envelope, _) = test_layout();
        let catalog = ModuleCatalog::standard();
        let rules = RuleEngine::with_builtin_sets();
        let short = score_layout(
            &placements,
            &envelope,
            &MissionParameters::new(2, 30),
            &catalog,
            &rules,
            DEFAULT_CONNECTION_DISTANCE_M,
        );
        let long = score_layout(
            &placements,
            &envelope,
            &MissionParameters::new(2, 300),
            &catalog,
            &rules,
            DEFAULT_CONNECTION_DISTANCE_M,
        );
        assert!(long.stowage_utilization > short.stowage_utilization);
        assert!((long.stowage_utilization / short.stowage_utilization - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_disconnected_layout_zeroes_connectivity() {
        let catalog = ModuleCatalog::standard();
        let rules = RuleEngine::with_builtin_sets();
        let envelope = Envelope::cylinder(5.0, 40.0);
        let mission = MissionParameters::new(2, 30);
        let placements = vec![
            placement(1, ModuleType::Airlock, -15.0, 0.0),
            placement(2, ModuleType::SleepQuarter, 15.0, 0.0),
        ];
        let m = score_layout(
            &placements,
            &envelope,
            &mission,
            &catalog,
            &rules,
            DEFAULT_CONNECTION_DISTANCE_M,
        );
        assert_eq!(m.connectivity_score, 0.0);
        assert!(m.egress_time_s.is_infinite());
    }

    #[test]
    fn test_priority_weights_shift_overall() {
        let (placements, envelope, mut mission) = test_layout();
        let catalog = ModuleCatalog::standard();
        let rules = RuleEngine::with_builtin_sets();

        mission.priority_weights.safety = 0.0;
        mission.priority_weights.connectivity = 0.0;
        mission.priority_weights.volume = 0.0;
        mission.priority_weights.efficiency = 1.0;
        let eff_only = score_layout(
            &placements,
            &envelope,
            &mission,
            &catalog,
            &rules,
            DEFAULT_CONNECTION_DISTANCE_M,
        );
        // Overall now equals the efficiency score exactly.
        assert!((eff_only.overall_score - eff_only.efficiency_score).abs() < 1e-9);
    }
}
