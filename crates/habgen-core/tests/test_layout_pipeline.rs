//! Integration tests for the full layout pipeline.
//!
//! Exercises: Envelope + MissionParameters → LayoutGenerator →
//! ConnectivityGraph / RuleEngine / scoring → LayoutOptimizer.
//!
//! All tests are pure logic — no service layer, no persistence.

use habgen_core::collision::clearance_matrix;
use habgen_core::connectivity::{ConnectivityGraph, DEFAULT_CONNECTION_DISTANCE_M};
use habgen_core::generator::{GeneratorConfig, LayoutGenerator};
use habgen_core::geometry::{Rotation, Vec3};
use habgen_core::layout::ModulePlacement;
use habgen_core::mission::MissionParameters;
use habgen_core::optimizer::{LayoutOptimizer, OptimizationConfig};
use habgen_core::rules::RuleEngine;
use habgen_core::scoring::score_layout;
use habgen_core::{Envelope, LayoutError, ModuleCatalog, ModuleType};

// ── Helpers ────────────────────────────────────────────────────────────

fn setup() -> (ModuleCatalog, RuleEngine) {
    (ModuleCatalog::standard(), RuleEngine::with_builtin_sets())
}

fn reference_mission() -> MissionParameters {
    MissionParameters::new(2, 30)
}

fn reference_envelope() -> Envelope {
    Envelope::cylinder(5.0, 20.0)
}

// ── Generation scenarios ───────────────────────────────────────────────

#[test]
fn reference_scenario_single_layout() {
    // Cylinder radius 5, length 20, crew 2, 30 days → exactly one layout
    // with ≥1 airlock, all clearances ≥ 0.6 m, fully connected.
    let (catalog, rules) = setup();
    let mut generator = LayoutGenerator::new(&catalog, &rules, GeneratorConfig::default(), 42);

    let layouts = generator
        .generate_layouts(&reference_envelope(), &reference_mission(), 1)
        .expect("reference scenario must generate");
    assert_eq!(layouts.len(), 1);

    let layout = &layouts[0];
    assert!(layout.count_of_type(ModuleType::Airlock) >= 1);

    let matrix = clearance_matrix(&layout.placements, &catalog);
    for i in 0..layout.placements.len() {
        for j in (i + 1)..layout.placements.len() {
            assert!(
                matrix[i][j] >= 0.6 - 1e-4,
                "clearance {:.3} m between modules {} and {}",
                matrix[i][j],
                layout.placements[i].module_id,
                layout.placements[j].module_id
            );
        }
    }

    let graph =
        ConnectivityGraph::build(&layout.placements, &catalog, DEFAULT_CONNECTION_DISTANCE_M);
    assert!(graph.is_connected());
}

#[test]
fn infeasible_envelope_is_an_error_not_empty_success() {
    // Usable volume far below the required module volume: the call must
    // fail with an infeasibility error, never return an empty list.
    let (catalog, rules) = setup();
    let mut generator = LayoutGenerator::new(&catalog, &rules, GeneratorConfig::default(), 42);
    let envelope = Envelope::cylinder(0.5, 1.0);
    let mission = MissionParameters::new(8, 30);

    match generator.generate_layouts(&envelope, &mission, 1) {
        Err(LayoutError::Infeasible { required_m3, usable_m3 }) => {
            assert!(required_m3 > usable_m3);
        }
        other => panic!("expected infeasibility error, got {other:?}"),
    }
}

#[test]
fn batch_generation_returns_multiple_scored_layouts() {
    let (catalog, rules) = setup();
    let mut generator = LayoutGenerator::new(&catalog, &rules, GeneratorConfig::default(), 9);
    let layouts = generator
        .generate_layouts(&reference_envelope(), &reference_mission(), 3)
        .unwrap();
    assert!(!layouts.is_empty());
    for layout in &layouts {
        assert!(layout.metrics.overall_score > 0.0);
        assert!(layout.metrics.total_mass_kg > 0.0);
        assert!(!layout.rationale.is_empty());
    }
}

#[test]
fn generation_is_reproducible_per_seed() {
    let (catalog, rules) = setup();
    let mut g1 = LayoutGenerator::new(&catalog, &rules, GeneratorConfig::default(), 1234);
    let mut g2 = LayoutGenerator::new(&catalog, &rules, GeneratorConfig::default(), 1234);
    let a = g1
        .generate_layouts(&reference_envelope(), &reference_mission(), 2)
        .unwrap();
    let b = g2
        .generate_layouts(&reference_envelope(), &reference_mission(), 2)
        .unwrap();
    assert_eq!(a, b);
}

// ── Connectivity scenarios ─────────────────────────────────────────────

#[test]
fn disconnected_pair_reports_two_singleton_components() {
    // Two modules 20 m apart with no intermediate link.
    let (catalog, _) = setup();
    let placements = vec![
        ModulePlacement::new(1, ModuleType::Airlock, Vec3::new(0.0, 0.0, 0.0), Rotation::R0),
        ModulePlacement::new(
            2,
            ModuleType::SleepQuarter,
            Vec3::new(20.0, 0.0, 0.0),
            Rotation::R0,
        ),
    ];
    let graph = ConnectivityGraph::build(&placements, &catalog, DEFAULT_CONNECTION_DISTANCE_M);
    assert!(!graph.is_connected());
    let components = graph.connected_components();
    assert_eq!(components.len(), 2);
    assert_eq!(components[0].len(), 1);
    assert_eq!(components[1].len(), 1);
}

// ── Grammar scenarios ──────────────────────────────────────────────────

#[test]
fn sleep_mechanical_separation_violation_reported_once() {
    // Sleep quarter 1.5 m (surface gap) from a mechanical module against
    // the baseline 3 m separation rule.
    let (catalog, engine) = setup();
    let mission = reference_mission();
    let placements = vec![
        ModulePlacement::new(1, ModuleType::SleepQuarter, Vec3::ZERO, Rotation::R0),
        ModulePlacement::new(
            2,
            ModuleType::Mechanical,
            Vec3::new(3.75, 0.0, 0.0),
            Rotation::R0,
        ),
    ];
    let eval = engine
        .evaluate_layout_with_ids(
            &placements,
            &catalog,
            &mission,
            &["noise_sleep_mechanical".to_string()],
        )
        .unwrap();
    assert_eq!(eval.violations.len(), 1);
    let v = &eval.violations[0];
    assert!(v.module_ids.contains(&1));
    assert!(v.module_ids.contains(&2));
    assert!(v.penalty > 0.0);
    // Baseline severity is high, not critical → layout stays valid.
    assert!(eval.is_valid_layout);

    // Under the long-duration archetype the same geometry is critical.
    let long_mission = MissionParameters::new(2, 365);
    let eval = engine.evaluate_layout(&placements, &catalog, &long_mission, None);
    assert!(!eval.is_valid_layout);
}

// ── Scoring ────────────────────────────────────────────────────────────

#[test]
fn scoring_is_pure_and_idempotent() {
    let (catalog, rules) = setup();
    let mut generator = LayoutGenerator::new(&catalog, &rules, GeneratorConfig::default(), 5);
    let layout = generator
        .generate_layouts(&reference_envelope(), &reference_mission(), 1)
        .unwrap()
        .remove(0);

    let a = score_layout(
        &layout.placements,
        &layout.envelope,
        &reference_mission(),
        &catalog,
        &rules,
        DEFAULT_CONNECTION_DISTANCE_M,
    );
    let b = score_layout(
        &layout.placements,
        &layout.envelope,
        &reference_mission(),
        &catalog,
        &rules,
        DEFAULT_CONNECTION_DISTANCE_M,
    );
    assert_eq!(a, b);
    assert_eq!(a, layout.metrics);
}

// ── Serialization for downstream consumers ─────────────────────────────

#[test]
fn layout_spec_round_trips_through_json() {
    let (catalog, rules) = setup();
    let mut generator = LayoutGenerator::new(&catalog, &rules, GeneratorConfig::default(), 3);
    let layout = generator
        .generate_layouts(&reference_envelope(), &reference_mission(), 1)
        .unwrap()
        .remove(0);

    let json = serde_json::to_string(&layout).unwrap();
    let back: habgen_core::LayoutSpec = serde_json::from_str(&json).unwrap();
    assert_eq!(back, layout);
}

// ── Optimization ───────────────────────────────────────────────────────

#[test]
fn optimizer_returns_front_of_valid_layouts() {
    let (catalog, rules) = setup();
    let config = OptimizationConfig {
        population_size: 10,
        generations: 5,
        seed: 42,
        seeding_attempts: 80,
        ..OptimizationConfig::default()
    };
    let mut optimizer =
        LayoutOptimizer::new(&catalog, &rules, GeneratorConfig::default(), config.clone());
    let result = optimizer
        .optimize(&reference_envelope(), &reference_mission(), None)
        .unwrap();

    assert!(!result.pareto_front.is_empty());
    assert!(result.evaluations >= 10);
    assert!(result.wall_time_ms >= 0.0);
    assert!(result.convergence.len() <= config.generations);

    // Every front member satisfies the layout invariants.
    for layout in &result.pareto_front {
        let graph = ConnectivityGraph::build(
            &layout.placements,
            &catalog,
            DEFAULT_CONNECTION_DISTANCE_M,
        );
        assert!(graph.is_connected());
        let (pressurized_ok, errors) = graph.validate_pressurized_connectivity();
        assert!(pressurized_ok, "{errors:?}");
        let matrix = clearance_matrix(&layout.placements, &catalog);
        for i in 0..layout.placements.len() {
            for j in (i + 1)..layout.placements.len() {
                assert!(matrix[i][j] >= 0.6 - 1e-4);
            }
        }
    }

    // No front member dominates another.
    let vectors: Vec<Vec<f64>> = result
        .pareto_front
        .iter()
        .map(|l| config.objectives.iter().map(|o| o.value(&l.metrics)).collect())
        .collect();
    for i in 0..vectors.len() {
        for j in 0..vectors.len() {
            if i == j {
                continue;
            }
            let dominates = vectors[i]
                .iter()
                .zip(vectors[j].iter())
                .all(|(x, y)| x <= y)
                && vectors[i]
                    .iter()
                    .zip(vectors[j].iter())
                    .any(|(x, y)| x < y);
            assert!(!dominates, "front member {i} dominates {j}");
        }
    }
}

#[test]
fn optimizer_rejects_invalid_envelope() {
    let (catalog, rules) = setup();
    let mut optimizer = LayoutOptimizer::new(
        &catalog,
        &rules,
        GeneratorConfig::default(),
        OptimizationConfig {
            population_size: 6,
            generations: 2,
            ..OptimizationConfig::default()
        },
    );
    let bad = Envelope::cylinder(-1.0, 0.0);
    let result = optimizer.optimize(&bad, &reference_mission(), None);
    assert!(matches!(result, Err(LayoutError::InvalidEnvelope(_))));
}
