//! Habgen Headless Validation Harness
//!
//! Exercises the layout engine end to end without any service layer:
//! generation, connectivity, grammar evaluation, scoring, optimization.
//! Runs entirely in-process — no persistence, no networking.
//!
//! Usage:
//!   cargo run -p habgen-simtest
//!   cargo run -p habgen-simtest -- --verbose

use habgen_core::collision::clearance_matrix;
use habgen_core::connectivity::{ConnectivityGraph, DEFAULT_CONNECTION_DISTANCE_M};
use habgen_core::generator::{required_module_counts, GeneratorConfig, LayoutGenerator};
use habgen_core::mission::MissionParameters;
use habgen_core::optimizer::{LayoutOptimizer, OptimizationConfig};
use habgen_core::rules::RuleEngine;
use habgen_core::{Envelope, LayoutError, ModuleCatalog, ModuleType};

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: String) -> TestResult {
    TestResult {
        name: name.to_string(),
        passed,
        detail,
    }
}

fn main() {
    env_logger::init();
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Habgen Layout Engine Harness ===\n");

    let catalog = ModuleCatalog::standard();
    let rules = RuleEngine::with_builtin_sets();

    let mut results = Vec::new();
    results.extend(validate_module_scaling(&catalog, verbose));
    results.extend(validate_generation(&catalog, &rules, verbose));
    results.extend(validate_error_paths(&catalog, &rules, verbose));
    results.extend(validate_optimization(&catalog, &rules, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    for r in &results {
        if !r.passed {
            println!("FAIL  {} — {}", r.name, r.detail);
        } else if verbose {
            println!("ok    {} — {}", r.name, r.detail);
        }
    }
    println!("\n{passed} passed, {failed} failed, {} total", results.len());
    if failed > 0 {
        std::process::exit(1);
    }
}

// ── Module scaling ──────────────────────────────────────────────────────

fn validate_module_scaling(catalog: &ModuleCatalog, verbose: bool) -> Vec<TestResult> {
    println!("[1/4] Module scaling rules");
    let mut results = Vec::new();

    for (crew, days) in [(2u32, 30u32), (4, 14), (6, 90), (8, 180)] {
        let mission = MissionParameters::new(crew, days);
        let counts = required_module_counts(&mission);
        let total: u32 = counts.iter().map(|(_, n)| n).sum();
        let sleep = counts
            .iter()
            .find(|(t, _)| *t == ModuleType::SleepQuarter)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        results.push(check(
            &format!("scaling crew={crew} days={days}"),
            sleep == crew && total >= crew + 3,
            format!("{total} modules, {sleep} sleep quarters"),
        ));
        if verbose {
            for (t, n) in &counts {
                if *n > 0 {
                    println!("    crew={crew} days={days}: {n} × {t:?}");
                }
            }
        }
    }

    let all_defined = ModuleType::ALL
        .iter()
        .all(|&t| catalog.definition_for(t).is_some());
    results.push(check(
        "catalog covers all module types",
        all_defined,
        format!("{} definitions", catalog.all_modules().len()),
    ));
    results
}

// ── Generation ──────────────────────────────────────────────────────────

fn validate_generation(
    catalog: &ModuleCatalog,
    rules: &RuleEngine,
    verbose: bool,
) -> Vec<TestResult> {
    println!("[2/4] Constrained-random generation");
    let mut results = Vec::new();

    let scenarios: [(&str, Envelope, u32, u32); 3] = [
        ("cylinder 5×20", Envelope::cylinder(5.0, 20.0), 2, 30),
        ("box 14×12×4", Envelope::cuboid(14.0, 12.0, 4.0), 4, 20),
        ("torus 14/4", Envelope::torus(14.0, 4.0), 2, 20),
    ];

    for (name, envelope, crew, days) in scenarios {
        let mission = MissionParameters::new(crew, days);
        let mut generator = LayoutGenerator::new(catalog, rules, GeneratorConfig::default(), 42);
        match generator.generate_layouts(&envelope, &mission, 2) {
            Ok(layouts) => {
                let mut all_ok = true;
                let mut detail = format!("{} layouts", layouts.len());
                for layout in &layouts {
                    let graph = ConnectivityGraph::build(
                        &layout.placements,
                        catalog,
                        DEFAULT_CONNECTION_DISTANCE_M,
                    );
                    let matrix = clearance_matrix(&layout.placements, catalog);
                    let mut min_gap = f32::INFINITY;
                    for i in 0..layout.placements.len() {
                        for j in (i + 1)..layout.placements.len() {
                            min_gap = min_gap.min(matrix[i][j]);
                        }
                    }
                    if !graph.is_connected() || min_gap < 0.6 - 1e-4 {
                        all_ok = false;
                        detail = format!("connected={}, min gap {min_gap:.2}", graph.is_connected());
                    }
                    if verbose {
                        println!(
                            "    {name}: {} modules, overall {:.2}, egress {:.0}s",
                            layout.module_count(),
                            layout.metrics.overall_score,
                            layout.metrics.egress_time_s
                        );
                    }
                }
                if verbose {
                    if let Ok(json) = serde_json::to_string(&layouts[0].metrics) {
                        println!("    {name} metrics: {json}");
                    }
                }
                results.push(check(&format!("generate {name}"), all_ok, detail));
            }
            Err(e) => results.push(check(&format!("generate {name}"), false, e.to_string())),
        }
    }
    results
}

// ── Error paths ─────────────────────────────────────────────────────────

fn validate_error_paths(
    catalog: &ModuleCatalog,
    rules: &RuleEngine,
    _verbose: bool,
) -> Vec<TestResult> {
    println!("[3/4] Error taxonomy");
    let mut results = Vec::new();
    let mission = MissionParameters::new(8, 30);

    let mut generator = LayoutGenerator::new(catalog, rules, GeneratorConfig::default(), 42);
    let infeasible = generator.generate_layouts(&Envelope::cylinder(0.5, 1.0), &mission, 1);
    results.push(check(
        "tiny envelope is infeasible",
        matches!(infeasible, Err(LayoutError::Infeasible { .. })),
        format!("{infeasible:?}"),
    ));

    let bad_count = generator.generate_layouts(&Envelope::cylinder(5.0, 20.0), &mission, 9);
    results.push(check(
        "count out of range rejected",
        matches!(bad_count, Err(LayoutError::InvalidCount(9))),
        format!("{bad_count:?}"),
    ));

    let bad_envelope = generator.generate_layouts(&Envelope::cylinder(-1.0, 20.0), &mission, 1);
    results.push(check(
        "negative radius rejected",
        matches!(bad_envelope, Err(LayoutError::InvalidEnvelope(_))),
        format!("{bad_envelope:?}"),
    ));
    results
}

// ── Optimization ────────────────────────────────────────────────────────

fn validate_optimization(
    catalog: &ModuleCatalog,
    rules: &RuleEngine,
    verbose: bool,
) -> Vec<TestResult> {
    println!("[4/4] NSGA-II optimization");
    let mut results = Vec::new();

    let config = OptimizationConfig {
        population_size: 12,
        generations: 6,
        seed: 42,
        ..OptimizationConfig::default()
    };
    let mut optimizer = LayoutOptimizer::new(catalog, rules, GeneratorConfig::default(), config);
    let envelope = Envelope::cylinder(5.0, 20.0);
    let mission = MissionParameters::new(2, 30);

    match optimizer.optimize(&envelope, &mission, None) {
        Ok(result) => {
            results.push(check(
                "optimizer returns a front",
                !result.pareto_front.is_empty(),
                format!(
                    "{} members, {} evaluations, {:.0} ms",
                    result.pareto_front.len(),
                    result.evaluations,
                    result.wall_time_ms
                ),
            ));
            results.push(check(
                "best layout scored",
                result.best.metrics.overall_score > 0.0,
                format!("overall {:.3}", result.best.metrics.overall_score),
            ));
            if verbose {
                println!("    convergence: {:?}", result.convergence);
                println!("    best rationale: {}", result.best.rationale);
            }
        }
        Err(e) => results.push(check("optimizer run", false, e.to_string())),
    }
    results
}
