//! NSGA-II multi-objective layout optimization.
//!
//! Genome: one gene per required module instance (position + rotation).
//! The population is seeded through the constrained-random generator so
//! every starting individual is feasible, then evolved with
//! non-dominated sorting, crowding-distance selection, placement
//! crossover, and position/rotation mutation. Offspring that collide or
//! disconnect are repaired with the same bounded placement retries the
//! generator uses; unrepairable individuals are replaced by freshly
//! generated ones.
//!
//! The optimizer checks a cancellation token at generation boundaries
//! and returns its best-so-far front instead of raising, so partial
//! results are never lost.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::catalog::{ModuleCatalog, ModuleType};
use crate::connectivity::ConnectivityGraph;
use crate::envelope::Envelope;
use crate::error::{LayoutError, LayoutResult};
use crate::generator::{find_placement, GeneratorConfig, LayoutGenerator};
use crate::layout::{build_rationale, LayoutSpec, ModulePlacement};
use crate::mission::MissionParameters;
use crate::rules::RuleEngine;
use crate::scoring::{score_layout, PerformanceMetrics};
use crate::spatial::SpatialIndex;

/// Objectives the optimizer can minimize. All values are oriented so
/// that lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationObjective {
    MeanTransitTime,
    EgressTime,
    TotalMass,
    TotalPower,
    /// Minimizes `1 - safety_score`.
    Safety,
    /// Minimizes the negated life-support margin.
    LssMargin,
}

impl OptimizationObjective {
    pub fn value(&self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            OptimizationObjective::MeanTransitTime => metrics.mean_transit_time_s,
            OptimizationObjective::EgressTime => metrics.egress_time_s,
            OptimizationObjective::TotalMass => metrics.total_mass_kg,
            OptimizationObjective::TotalPower => metrics.total_power_w,
            OptimizationObjective::Safety => 1.0 - metrics.safety_score,
            OptimizationObjective::LssMargin => -metrics.lss_margin,
        }
    }
}

/// NSGA-II run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationConfig {
    pub population_size: usize,
    pub generations: usize,
    pub crossover_probability: f64,
    pub mutation_probability: f64,
    pub tournament_size: usize,
    pub objectives: Vec<OptimizationObjective>,
    pub seed: u64,
    /// Trailing window for hypervolume-based early stopping.
    pub early_stop_window: usize,
    /// Relative hypervolume improvement below which the run stops early.
    pub early_stop_threshold: f64,
    /// Generator attempts allowed while seeding the initial population.
    pub seeding_attempts: u32,
    /// Placement retries per module during offspring repair.
    pub repair_retries: u32,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            population_size: 24,
            generations: 40,
            crossover_probability: 0.9,
            mutation_probability: 0.2,
            tournament_size: 2,
            objectives: vec![
                OptimizationObjective::MeanTransitTime,
                OptimizationObjective::TotalMass,
                OptimizationObjective::Safety,
            ],
            seed: 42,
            early_stop_window: 8,
            early_stop_threshold: 1e-3,
            seeding_attempts: 200,
            repair_retries: 200,
        }
    }
}

impl OptimizationConfig {
    fn validate(&self) -> LayoutResult<()> {
        if self.population_size < 2 {
            return Err(LayoutError::InvalidConfig(
                "population size must be at least 2".to_string(),
            ));
        }
        if self.generations == 0 {
            return Err(LayoutError::InvalidConfig(
                "generation count must be at least 1".to_string(),
            ));
        }
        if self.objectives.is_empty() {
            return Err(LayoutError::InvalidConfig(
                "at least one objective is required".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.crossover_probability)
            || !(0.0..=1.0).contains(&self.mutation_probability)
        {
            return Err(LayoutError::InvalidConfig(
                "probabilities must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cooperative cancellation signal, checked between generations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Result of one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Non-dominated solutions of the final generation.
    pub pareto_front: Vec<LayoutSpec>,
    /// Front member with the highest overall composite score.
    pub best: LayoutSpec,
    pub evaluations: u64,
    pub wall_time_ms: f64,
    /// Front-0 hypervolume per generation.
    pub convergence: Vec<f64>,
}

#[derive(Debug, Clone)]
struct Individual {
    placements: Vec<ModulePlacement>,
    metrics: PerformanceMetrics,
    objectives: Vec<f64>,
    rank: usize,
    crowding: f64,
}

/// True when `a` Pareto-dominates `b`: no objective worse, at least one
/// strictly better.
fn dominates(a: &[f64], b: &[f64]) -> bool {
    let mut strictly_better = false;
    for (&x, &y) in a.iter().zip(b.iter()) {
        if x > y {
            return false;
        }
        if x < y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Non-dominated sorting: front 0 is the non-dominated set, front k is
/// non-dominated after removing fronts < k. Returns per-front index
/// lists and writes ranks into the individuals.
fn fast_non_dominated_sort(population: &mut [Individual]) -> Vec<Vec<usize>> {
    let n = population.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];
    let mut fronts: Vec<Vec<usize>> = vec![Vec::new()];

    for i in 0..n {
        for j in (i + 1)..n {
            if dominates(&population[i].objectives, &population[j].objectives) {
                dominated_by[i].push(j);
                domination_count[j] += 1;
            } else if dominates(&population[j].objectives, &population[i].objectives) {
                dominated_by[j].push(i);
                domination_count[i] += 1;
            }
        }
    }
    for (i, &count) in domination_count.iter().enumerate() {
        if count == 0 {
            population[i].rank = 0;
            fronts[0].push(i);
        }
    }

    let mut current = 0;
    while !fronts[current].is_empty() {
        let mut next = Vec::new();
        for &i in &fronts[current] {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    population[j].rank = current + 1;
                    next.push(j);
                }
            }
        }
        fronts.push(next);
        current += 1;
    }
    fronts.pop(); // last front is always empty
    fronts
}

/// Crowding distance within one front, for diversity preservation.
fn assign_crowding_distance(population: &mut [Individual], front: &[usize]) {
    for &i in front {
        population[i].crowding = 0.0;
    }
    if front.len() <= 2 {
        for &i in front {
            population[i].crowding = f64::INFINITY;
        }
        return;
    }
    let objective_count = population[front[0]].objectives.len();
    for m in 0..objective_count {
        let mut sorted: Vec<usize> = front.to_vec();
        sorted.sort_by(|&a, &b| {
            population[a].objectives[m]
                .partial_cmp(&population[b].objectives[m])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let lo = population[sorted[0]].objectives[m];
        let hi = population[sorted[sorted.len() - 1]].objectives[m];
        population[sorted[0]].crowding = f64::INFINITY;
        population[sorted[sorted.len() - 1]].crowding = f64::INFINITY;
        let span = hi - lo;
        if span <= 0.0 || !span.is_finite() {
            continue;
        }
        for w in 1..sorted.len() - 1 {
            let gain = (population[sorted[w + 1]].objectives[m]
                - population[sorted[w - 1]].objectives[m])
                / span;
            population[sorted[w]].crowding += gain;
        }
    }
}

/// 2D hypervolume of a minimization front against a reference point.
pub fn hypervolume_2d(points: &[(f64, f64)], ref_point: (f64, f64)) -> f64 {
    let mut pts: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|p| p.0 < ref_point.0 && p.1 < ref_point.1)
        .collect();
    pts.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let mut hv = 0.0;
    let mut prev_y = ref_point.1;
    for (x, y) in pts {
        if y < prev_y {
            hv += (ref_point.0 - x) * (prev_y - y);
            prev_y = y;
        }
    }
    hv
}

/// NSGA-II optimizer over habitat layouts.
pub struct LayoutOptimizer<'a> {
    catalog: &'a ModuleCatalog,
    rules: &'a RuleEngine,
    generator_config: GeneratorConfig,
    config: OptimizationConfig,
    rng: ChaCha8Rng,
}

impl<'a> LayoutOptimizer<'a> {
    pub fn new(
        catalog: &'a ModuleCatalog,
        rules: &'a RuleEngine,
        generator_config: GeneratorConfig,
        config: OptimizationConfig,
    ) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            catalog,
            rules,
            generator_config,
            config,
            rng,
        }
    }

    /// Run the full optimization. Fails fast on invalid configuration
    /// and surfaces seeding infeasibility only after the seeding budget
    /// is exhausted.
    pub fn optimize(
        &mut self,
        envelope: &Envelope,
        mission: &MissionParameters,
        cancel: Option<&CancelToken>,
    ) -> LayoutResult<OptimizationResult> {
        self.config.validate()?;
        envelope.validate()?;
        mission.validate()?;

        let start = Instant::now();
        let mut evaluations = 0u64;

        // INITIALIZED → EVALUATING: seed a feasible population.
        let mut population = self.seed_population(envelope, mission, &mut evaluations)?;

        // Fixed hypervolume reference from the first generation's worst
        // objective values, so the trace is comparable across generations.
        let ref_point = self.reference_point(&population);

        let mut convergence: Vec<f64> = Vec::new();
        let mut cancelled = false;

        for generation in 0..self.config.generations {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    log::info!("optimization cancelled at generation {generation}, returning best-so-far front");
                    cancelled = true;
                    break;
                }
            }

            // RANKING
            let fronts = fast_non_dominated_sort(&mut population);
            for front in &fronts {
                assign_crowding_distance(&mut population, front);
            }

            // SELECTING + VARYING + REPAIRING
            let mut offspring: Vec<Individual> = Vec::with_capacity(self.config.population_size);
            let mut variation_rounds = 0u32;
            let max_variation_rounds = self.config.population_size as u32 * 25;
            while offspring.len() < self.config.population_size {
                variation_rounds += 1;
                let a = self.tournament(&population);
                let b = self.tournament(&population);
                if variation_rounds > max_variation_rounds {
                    // Variation keeps failing: carry the parent forward
                    // unchanged so the population size is preserved.
                    offspring.push(population[a].clone());
                    continue;
                }
                let (mut genome_a, mut genome_b) = (
                    population[a].placements.clone(),
                    population[b].placements.clone(),
                );
                if self.rng.gen_bool(self.config.crossover_probability) {
                    self.crossover(&mut genome_a, &mut genome_b);
                }
                for genome in [genome_a, genome_b] {
                    if offspring.len() >= self.config.population_size {
                        break;
                    }
                    let mut genome = genome;
                    self.mutate(&mut genome);
                    if self.repair(envelope, &mut genome) {
                        offspring.push(self.evaluate(
                            envelope,
                            mission,
                            genome,
                            &mut evaluations,
                        ));
                    } else if let Some(fresh) =
                        self.fresh_individual(envelope, mission, &mut evaluations)
                    {
                        offspring.push(fresh);
                    }
                    // Otherwise the slot refills on the next loop pass.
                }
            }

            // Environmental selection over parents + offspring.
            population.extend(offspring);
            let fronts = fast_non_dominated_sort(&mut population);
            for front in &fronts {
                assign_crowding_distance(&mut population, front);
            }
            population = self.select_next(population, &fronts);

            // Convergence trace from the surviving front 0.
            let front0: Vec<&Individual> =
                population.iter().filter(|ind| ind.rank == 0).collect();
            let hv = self.front_hypervolume(&front0, ref_point);
            convergence.push(hv);
            log::debug!(
                "generation {generation}: front size {}, hypervolume {hv:.4}",
                front0.len()
            );

            if self.should_stop_early(&convergence) {
                log::info!(
                    "hypervolume stalled over {} generations, stopping early",
                    self.config.early_stop_window
                );
                break;
            }
        }

        // TERMINATED: extract front 0 of the final population.
        let fronts = fast_non_dominated_sort(&mut population);
        for front in &fronts {
            assign_crowding_distance(&mut population, front);
        }
        let mut front0: Vec<&Individual> =
            population.iter().filter(|ind| ind.rank == 0).collect();
        // Stable output order: by first objective.
        front0.sort_by(|a, b| {
            a.objectives[0]
                .partial_cmp(&b.objectives[0])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let pareto_front: Vec<LayoutSpec> = front0
            .iter()
            .map(|ind| self.to_layout_spec(envelope, mission, ind))
            .collect();
        let best = pareto_front
            .iter()
            .max_by(|a, b| {
                a.metrics
                    .overall_score
                    .partial_cmp(&b.metrics.overall_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
            .expect("front 0 is never empty");

        if !cancelled {
            log::info!(
                "optimization finished: {} front members, {} evaluations",
                pareto_front.len(),
                evaluations
            );
        }

        Ok(OptimizationResult {
            pareto_front,
            best,
            evaluations,
            wall_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            convergence,
        })
    }

    fn seed_population(
        &mut self,
        envelope: &Envelope,
        mission: &MissionParameters,
        evaluations: &mut u64,
    ) -> LayoutResult<Vec<Individual>> {
        let mut genomes: Vec<Vec<ModulePlacement>> = Vec::new();
        let mut attempts = 0u32;
        while genomes.len() < self.config.population_size && attempts < self.config.seeding_attempts
        {
            attempts += 1;
            let seed = self.rng.gen::<u64>();
            let mut generator =
                LayoutGenerator::new(self.catalog, self.rules, self.generator_config, seed);
            match generator.generate_layouts(envelope, mission, 1) {
                Ok(mut layouts) => genomes.push(layouts.remove(0).placements),
                // Exhaustion is retryable bad luck; anything else is
                // a configuration/infeasibility error to surface now.
                Err(LayoutError::GenerationExhausted { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if genomes.is_empty() {
            return Err(LayoutError::SeedingFailed { attempts });
        }
        // Pad a short seed set with mutated clones, keeping feasibility.
        let mut i = 0;
        while genomes.len() < self.config.population_size {
            let mut clone = genomes[i % genomes.len()].clone();
            self.mutate(&mut clone);
            if !self.repair(envelope, &mut clone) {
                clone = genomes[i % genomes.len()].clone();
            }
            genomes.push(clone);
            i += 1;
        }
        Ok(genomes
            .into_iter()
            .map(|g| self.evaluate(envelope, mission, g, evaluations))
            .collect())
    }

    fn evaluate(
        &self,
        envelope: &Envelope,
        mission: &MissionParameters,
        mut placements: Vec<ModulePlacement>,
        evaluations: &mut u64,
    ) -> Individual {
        let graph = ConnectivityGraph::build(
            &placements,
            self.catalog,
            self.generator_config.connection_distance_m,
        );
        for p in &mut placements {
            p.connections = graph.neighbors(p.module_id);
        }
        let metrics = score_layout(
            &placements,
            envelope,
            mission,
            self.catalog,
            self.rules,
            self.generator_config.connection_distance_m,
        );
        let objectives = self
            .config
            .objectives
            .iter()
            .map(|o| o.value(&metrics))
            .collect();
        *evaluations += 1;
        Individual {
            placements,
            metrics,
            objectives,
            rank: 0,
            crowding: 0.0,
        }
    }

    /// Tournament selection biased by (rank, crowding distance).
    fn tournament(&mut self, population: &[Individual]) -> usize {
        let mut best = self.rng.gen_range(0..population.len());
        for _ in 1..self.config.tournament_size.max(1) {
            let challenger = self.rng.gen_range(0..population.len());
            let better = population[challenger].rank < population[best].rank
                || (population[challenger].rank == population[best].rank
                    && population[challenger].crowding > population[best].crowding);
            if better {
                best = challenger;
            }
        }
        best
    }

    /// Uniform placement exchange between two parents.
    fn crossover(&mut self, a: &mut [ModulePlacement], b: &mut [ModulePlacement]) {
        for (ga, gb) in a.iter_mut().zip(b.iter_mut()) {
            if self.rng.gen_bool(0.5) {
                std::mem::swap(&mut ga.position, &mut gb.position);
                std::mem::swap(&mut ga.rotation, &mut gb.rotation);
            }
        }
    }

    /// Perturb a subset of genes: position jitter or rotation re-roll.
    /// Out-of-envelope results are brought back by repair.
    fn mutate(&mut self, genome: &mut [ModulePlacement]) {
        for gene in genome.iter_mut() {
            if !self.rng.gen_bool(self.config.mutation_probability) {
                continue;
            }
            if self.rng.gen_bool(0.3) {
                gene.rotation =
                    crate::geometry::Rotation::ALL[self.rng.gen_range(0..4)];
            } else {
                gene.position.x += self.rng.gen_range(-1.5..1.5);
                gene.position.y += self.rng.gen_range(-1.5..1.5);
                gene.position.z += self.rng.gen_range(-0.5..0.5);
            }
        }
    }

    /// Repair a genome in place: fix envelope and clearance violations
    /// first, then re-place modules stranded outside the main
    /// pressurized component. Returns false when unrepairable within
    /// the retry budget.
    fn repair(&mut self, envelope: &Envelope, genome: &mut Vec<ModulePlacement>) -> bool {
        let repair_config = GeneratorConfig {
            placement_retries: self.config.repair_retries,
            ..self.generator_config
        };

        // Pass 1: every module inside the envelope and clear of others.
        for i in 0..genome.len() {
            let Some(def) = self.catalog.definition_for(genome[i].module_type) else {
                return false;
            };
            let bbox = genome[i].placed_box(def);
            let mut others = SpatialIndex::new();
            for (j, other) in genome.iter().enumerate() {
                if i == j {
                    continue;
                }
                if let Some(other_def) = self.catalog.definition_for(other.module_type) {
                    others.insert(other.module_id, other.placed_box(other_def));
                }
            }
            let colliding = others
                .iter()
                .any(|(_, o)| bbox.intersects(o, repair_config.min_clearance_m));
            if !envelope.contains_box(&bbox) || colliding {
                match find_placement(
                    envelope,
                    def.bbox.as_vec3(),
                    &others,
                    &repair_config,
                    &mut self.rng,
                ) {
                    Some((position, rotation)) => {
                        genome[i].position = position;
                        genome[i].rotation = rotation;
                    }
                    None => return false,
                }
            }
        }

        // Pass 2: reconnect islands to the main component.
        let graph = ConnectivityGraph::build(
            genome,
            self.catalog,
            repair_config.connection_distance_m,
        );
        if graph.is_connected() && graph.validate_pressurized_connectivity().0 {
            return true;
        }
        let components = graph.connected_components();
        let airlock_ids: Vec<u32> = genome
            .iter()
            .filter(|p| p.module_type == ModuleType::Airlock)
            .map(|p| p.module_id)
            .collect();
        // Keep the largest component that holds an airlock, else the largest.
        let main = components
            .iter()
            .filter(|c| c.iter().any(|id| airlock_ids.contains(id)))
            .max_by_key(|c| c.len())
            .or_else(|| components.iter().max_by_key(|c| c.len()))
            .cloned()
            .unwrap_or_default();

        let mut anchored = SpatialIndex::new();
        for p in genome.iter() {
            if main.contains(&p.module_id) {
                if let Some(def) = self.catalog.definition_for(p.module_type) {
                    anchored.insert(p.module_id, p.placed_box(def));
                }
            }
        }
        for i in 0..genome.len() {
            if main.contains(&genome[i].module_id) {
                continue;
            }
            let Some(def) = self.catalog.definition_for(genome[i].module_type) else {
                return false;
            };
            match find_placement(
                envelope,
                def.bbox.as_vec3(),
                &anchored,
                &repair_config,
                &mut self.rng,
            ) {
                Some((position, rotation)) => {
                    genome[i].position = position;
                    genome[i].rotation = rotation;
                    anchored.insert(genome[i].module_id, genome[i].placed_box(def));
                }
                None => return false,
            }
        }

        let graph = ConnectivityGraph::build(
            genome,
            self.catalog,
            repair_config.connection_distance_m,
        );
        graph.is_connected() && graph.validate_pressurized_connectivity().0
    }

    /// Replacement individual straight from the generator.
    fn fresh_individual(
        &mut self,
        envelope: &Envelope,
        mission: &MissionParameters,
        evaluations: &mut u64,
    ) -> Option<Individual> {
        let seed = self.rng.gen::<u64>();
        let mut generator =
            LayoutGenerator::new(self.catalog, self.rules, self.generator_config, seed);
        let mut layouts = generator.generate_layouts(envelope, mission, 1).ok()?;
        Some(self.evaluate(envelope, mission, layouts.remove(0).placements, evaluations))
    }

    /// NSGA-II environmental selection: fill by front, truncate the
    /// boundary front by descending crowding distance.
    fn select_next(
        &self,
        population: Vec<Individual>,
        fronts: &[Vec<usize>],
    ) -> Vec<Individual> {
        let target = self.config.population_size;
        let mut chosen: Vec<usize> = Vec::with_capacity(target);
        for front in fronts {
            if chosen.len() + front.len() <= target {
                chosen.extend(front.iter().copied());
            } else {
                let mut boundary: Vec<usize> = front.clone();
                boundary.sort_by(|&a, &b| {
                    population[b]
                        .crowding
                        .partial_cmp(&population[a].crowding)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                boundary.truncate(target - chosen.len());
                chosen.extend(boundary);
            }
            if chosen.len() >= target {
                break;
            }
        }
        let mut keep: Vec<Option<Individual>> = population.into_iter().map(Some).collect();
        chosen
            .into_iter()
            .filter_map(|i| keep[i].take())
            .collect()
    }

    fn reference_point(&self, population: &[Individual]) -> (f64, f64) {
        let worst = |m: usize| {
            population
                .iter()
                .map(|ind| ind.objectives.get(m).copied().unwrap_or(0.0))
                .filter(|v| v.is_finite())
                .fold(f64::MIN, f64::max)
        };
        let r0 = worst(0);
        let r1 = if self.config.objectives.len() > 1 {
            worst(1)
        } else {
            1.0
        };
        (r0.abs().max(1e-6) * 0.1 + r0, r1.abs().max(1e-6) * 0.1 + r1)
    }

    /// Hypervolume of a front over the first two objectives (the first
    /// objective against 1 when only one is configured).
    fn front_hypervolume(&self, front: &[&Individual], ref_point: (f64, f64)) -> f64 {
        if self.config.objectives.len() >= 2 {
            let points: Vec<(f64, f64)> = front
                .iter()
                .map(|ind| (ind.objectives[0], ind.objectives[1]))
                .collect();
            hypervolume_2d(&points, ref_point)
        } else {
            let best = front
                .iter()
                .map(|ind| ind.objectives[0])
                .fold(f64::INFINITY, f64::min);
            (ref_point.0 - best).max(0.0)
        }
    }

    fn should_stop_early(&self, convergence: &[f64]) -> bool {
        let window = self.config.early_stop_window;
        if window == 0 || convergence.len() <= window {
            return false;
        }
        let now = convergence[convergence.len() - 1];
        let then = convergence[convergence.len() - 1 - window];
        let improvement = (now - then) / then.abs().max(1e-9);
        improvement < self.config.early_stop_threshold
    }

    fn to_layout_spec(
        &self,
        envelope: &Envelope,
        mission: &MissionParameters,
        individual: &Individual,
    ) -> LayoutSpec {
        LayoutSpec {
            envelope: *envelope,
            placements: individual.placements.clone(),
            metrics: individual.metrics,
            rationale: build_rationale(&individual.placements, &individual.metrics, mission),
            generation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::clearance_matrix;

    fn small_config(seed: u64) -> OptimizationConfig {
        OptimizationConfig {
            population_size: 8,
            generations: 4,
            seed,
            seeding_attempts: 60,
            ..OptimizationConfig::default()
        }
    }

    fn setup() -> (ModuleCatalog, RuleEngine) {
        (ModuleCatalog::standard(), RuleEngine::with_builtin_sets())
    }

    #[test]
    fn test_dominates() {
        assert!(dominates(&[1.0, 2.0], &[2.0, 3.0]));
        assert!(dominates(&[1.0, 3.0], &[2.0, 3.0]));
        assert!(!dominates(&[1.0, 4.0], &[2.0, 3.0]));
        assert!(!dominates(&[2.0, 3.0], &[2.0, 3.0])); // equal: no strict gain
    }

    #[test]
    fn test_hypervolume_2d() {
        // Single point (1,1) against ref (3,3) covers a 2×2 square.
        assert!((hypervolume_2d(&[(1.0, 1.0)], (3.0, 3.0)) - 4.0).abs() < 1e-9);
        // Adding a dominated point changes nothing.
        assert!(
            (hypervolume_2d(&[(1.0, 1.0), (2.0, 2.0)], (3.0, 3.0)) - 4.0).abs() < 1e-9
        );
        // Two trade-off points.
        let hv = hypervolume_2d(&[(1.0, 2.0), (2.0, 1.0)], (3.0, 3.0));
        assert!((hv - 3.0).abs() < 1e-9);
        // Points outside the reference contribute nothing.
        assert_eq!(hypervolume_2d(&[(4.0, 4.0)], (3.0, 3.0)), 0.0);
    }

    #[test]
    fn test_non_dominated_sort_ranks() {
        let mk = |objectives: Vec<f64>| Individual {
            placements: Vec::new(),
            metrics: PerformanceMetrics::default(),
            objectives,
            rank: usize::MAX,
            crowding: 0.0,
        };
        let mut pop = vec![
            mk(vec![1.0, 1.0]), // dominates everything
            mk(vec![2.0, 3.0]),
            mk(vec![3.0, 2.0]),
            mk(vec![4.0, 4.0]), // dominated by all
        ];
        let fronts = fast_non_dominated_sort(&mut pop);
        assert_eq!(fronts[0], vec![0]);
        assert_eq!(fronts[1], vec![1, 2]);
        assert_eq!(fronts[2], vec![3]);
        assert_eq!(pop[3].rank, 2);
    }

    #[test]
    fn test_crowding_boundary_infinite() {
        let mk = |objectives: Vec<f64>| Individual {
            placements: Vec::new(),
            metrics: PerformanceMetrics::default(),
            objectives,
            rank: 0,
            crowding: 0.0,
        };
        let mut pop = vec![
            mk(vec![1.0, 4.0]),
            mk(vec![2.0, 3.0]),
            mk(vec![3.0, 2.0]),
            mk(vec![4.0, 1.0]),
        ];
        let front: Vec<usize> = (0..4).collect();
        assign_crowding_distance(&mut pop, &front);
        assert!(pop[0].crowding.is_infinite());
        assert!(pop[3].crowding.is_infinite());
        assert!(pop[1].crowding.is_finite());
        assert!(pop[1].crowding > 0.0);
    }

    #[test]
    fn test_optimize_produces_non_dominated_front() {
        let (catalog, rules) = setup();
        let mut optimizer = LayoutOptimizer::new(
            &catalog,
            &rules,
            GeneratorConfig::default(),
            small_config(42),
        );
        let envelope = Envelope::cylinder(5.0, 20.0);
        let mission = MissionParameters::new(2, 30);
        let result = optimizer.optimize(&envelope, &mission, None).unwrap();

        assert!(!result.pareto_front.is_empty());
        assert!(result.evaluations > 0);
        assert!(!result.convergence.is_empty());
        assert!(result.convergence.len() <= 4);

        // Pareto non-domination between all returned pairs.
        let objectives = &optimizer.config.objectives;
        let vectors: Vec<Vec<f64>> = result
            .pareto_front
            .iter()
            .map(|l| objectives.iter().map(|o| o.value(&l.metrics)).collect())
            .collect();
        for i in 0..vectors.len() {
            for j in 0..vectors.len() {
                if i != j {
                    assert!(
                        !dominates(&vectors[i], &vectors[j]),
                        "front member {i} dominates {j}"
                    );
                }
            }
        }

        // Best layout is a front member with the top overall score.
        let best_score = result.best.metrics.overall_score;
        for l in &result.pareto_front {
            assert!(l.metrics.overall_score <= best_score + 1e-9);
        }
    }

    #[test]
    fn test_front_members_are_valid_layouts() {
        let (catalog, rules) = setup();
        let mut optimizer = LayoutOptimizer::new(
            &catalog,
            &rules,
            GeneratorConfig::default(),
            small_config(7),
        );
        let envelope = Envelope::cylinder(5.0, 20.0);
        let mission = MissionParameters::new(2, 30);
        let result = optimizer.optimize(&envelope, &mission, None).unwrap();

        for layout in &result.pareto_front {
            let graph = ConnectivityGraph::build(&layout.placements, &catalog, 1.2);
            assert!(graph.is_connected());
            assert!(graph.validate_pressurized_connectivity().0);
            let matrix = clearance_matrix(&layout.placements, &catalog);
            for i in 0..layout.placements.len() {
                for j in (i + 1)..layout.placements.len() {
                    assert!(matrix[i][j] >= 0.6 - 1e-4);
                }
            }
        }
    }

    #[test]
    fn test_optimize_deterministic_for_seed() {
        let (catalog, rules) = setup();
        let envelope = Envelope::cylinder(5.0, 20.0);
        let mission = MissionParameters::new(2, 30);

        let run = |seed: u64| {
            let mut optimizer = LayoutOptimizer::new(
                &catalog,
                &rules,
                GeneratorConfig::default(),
                small_config(seed),
            );
            optimizer.optimize(&envelope, &mission, None).unwrap()
        };
        let a = run(13);
        let b = run(13);
        assert_eq!(a.pareto_front.len(), b.pareto_front.len());
        assert_eq!(a.evaluations, b.evaluations);
        assert_eq!(a.convergence, b.convergence);
        assert_eq!(a.best.placements, b.best.placements);
    }

    #[test]
    fn test_cancellation_returns_partial_result() {
        let (catalog, rules) = setup();
        let mut optimizer = LayoutOptimizer::new(
            &catalog,
            &rules,
            GeneratorConfig::default(),
            small_config(42),
        );
        let envelope = Envelope::cylinder(5.0, 20.0);
        let mission = MissionParameters::new(2, 30);
        let token = CancelToken::new();
        token.cancel();
        // Cancelled before the first generation: still a populated result.
        let result = optimizer.optimize(&envelope, &mission, Some(&token)).unwrap();
        assert!(!result.pareto_front.is_empty());
        assert!(result.convergence.is_empty());
    }

    #[test]
    fn test_seeding_failure_on_infeasible_problem() {
        let (catalog, rules) = setup();
        let mut optimizer = LayoutOptimizer::new(
            &catalog,
            &rules,
            GeneratorConfig::default(),
            small_config(42),
        );
        let envelope = Envelope::cylinder(0.5, 1.0);
        let mission = MissionParameters::new(8, 30);
        let result = optimizer.optimize(&envelope, &mission, None);
        assert!(matches!(result, Err(LayoutError::Infeasible { .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (catalog, rules) = setup();
        let mut config = small_config(42);
        config.population_size = 1;
        let mut optimizer =
            LayoutOptimizer::new(&catalog, &rules, GeneratorConfig::default(), config);
        let envelope = Envelope::cylinder(5.0, 20.0);
        let mission = MissionParameters::new(2, 30);
        assert!(matches!(
            optimizer.optimize(&envelope, &mission, None),
            Err(LayoutError::InvalidConfig(_))
        ));
    }
}
