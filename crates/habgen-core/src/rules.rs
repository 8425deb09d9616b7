//! Layout grammar — declarative adjacency and zoning rules.
//!
//! A rule evaluates to zero or more violations against a placement set.
//! Distances are surface-to-surface gaps between module boxes, so a
//! "3 m separation" rule means 3 m of open space between hulls.
//!
//! Rule sets are static configuration grouped by mission archetype;
//! they are selected and combined at evaluation time, never mutated by
//! a layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{ModuleCatalog, ModuleType};
use crate::error::{LayoutError, LayoutResult};
use crate::layout::ModulePlacement;
use crate::mission::MissionParameters;

/// How bad a violated rule is. Weights are strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Low => 1.0,
            Severity::Medium => 2.5,
            Severity::High => 5.0,
            Severity::Critical => 10.0,
        }
    }
}

/// Kind of constraint a rule expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    /// Matched pairs should sit within `max_distance_m` (soft).
    AdjacencyPreference,
    /// Matched pairs must keep at least `min_distance_m` apart.
    AdjacencyRestriction,
    /// Zone separation — evaluated like a restriction, declared
    /// separately because it expresses area-level intent.
    Zoning,
    /// Matched pairs must fall inside [`min_distance_m`, `max_distance_m`].
    DistanceConstraint,
}

/// One declarative layout rule.
///
/// Empty `source_types` or `target_types` match any module type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRule {
    pub id: String,
    pub kind: RuleKind,
    pub severity: Severity,
    pub source_types: Vec<ModuleType>,
    pub target_types: Vec<ModuleType>,
    pub min_distance_m: Option<f32>,
    pub max_distance_m: Option<f32>,
    pub penalty_base: f64,
    pub description: String,
}

/// A single rule violation with its computed penalty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub severity: Severity,
    pub module_ids: Vec<u32>,
    pub description: String,
    pub penalty: f64,
}

/// Aggregated grammar evaluation of one placement set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub total_penalty: f64,
    /// 1.0 with no penalty, monotonically decreasing with total penalty:
    /// `1 / (1 + total_penalty / 100)`.
    pub rule_compliance_score: f64,
    pub violations: Vec<Violation>,
    pub critical_violations: usize,
    /// False when any critical violation is present.
    pub is_valid_layout: bool,
}

/// Penalty normalization constant for the compliance score.
const COMPLIANCE_HALF_PENALTY: f64 = 100.0;

fn matches_types(t: ModuleType, set: &[ModuleType]) -> bool {
    set.is_empty() || set.contains(&t)
}

/// Penalty for the `ordinal`-th violation (0-based) of a rule with
/// breach fraction `breach` in (0, 1].
fn calculate_penalty(rule: &LayoutRule, ordinal: usize, breach: f64) -> f64 {
    let count_factor = 1.0 + 0.2 * ordinal as f64;
    let severity_factor = 0.5 + breach.clamp(0.0, 1.0);
    rule.severity.weight() * rule.penalty_base * count_factor * severity_factor
}

/// Evaluate one rule against every matching module pair.
fn evaluate_rule(
    rule: &LayoutRule,
    placements: &[ModulePlacement],
    catalog: &ModuleCatalog,
) -> Vec<Violation> {
    let boxes: Vec<_> = placements
        .iter()
        .map(|p| catalog.definition_for(p.module_type).map(|d| p.placed_box(d)))
        .collect();

    let mut violations = Vec::new();
    for i in 0..placements.len() {
        for j in (i + 1)..placements.len() {
            let a = &placements[i];
            let b = &placements[j];
            let pair_matches = (matches_types(a.module_type, &rule.source_types)
                && matches_types(b.module_type, &rule.target_types))
                || (matches_types(b.module_type, &rule.source_types)
                    && matches_types(a.module_type, &rule.target_types));
            if !pair_matches {
                continue;
            }

            let gap = match (&boxes[i], &boxes[j]) {
                (Some(ba), Some(bb)) => ba.distance_to(bb),
                _ => continue,
            };

            let breach: Option<(f64, String)> = match rule.kind {
                RuleKind::AdjacencyRestriction | RuleKind::Zoning => {
                    rule.min_distance_m.and_then(|min| {
                        if gap < min {
                            Some((
                                ((min - gap) / min) as f64,
                                format!(
                                    "{} {} and {} {} are {:.1} m apart, required separation {:.1} m",
                                    a.module_type.label(),
                                    a.module_id,
                                    b.module_type.label(),
                                    b.module_id,
                                    gap,
                                    min
                                ),
                            ))
                        } else {
                            None
                        }
                    })
                }
                RuleKind::AdjacencyPreference => rule.max_distance_m.and_then(|max| {
                    if gap > max {
                        Some((
                            (((gap - max) / max) as f64).min(1.0),
                            format!(
                                "{} {} and {} {} are {:.1} m apart, preferred within {:.1} m",
                                a.module_type.label(),
                                a.module_id,
                                b.module_type.label(),
                                b.module_id,
                                gap,
                                max
                            ),
                        ))
                    } else {
                        None
                    }
                }),
                RuleKind::DistanceConstraint => {
                    let min = rule.min_distance_m.unwrap_or(0.0);
                    let max = rule.max_distance_m.unwrap_or(f32::INFINITY);
                    if gap < min {
                        Some((
                            ((min - gap) / min.max(1e-6)) as f64,
                            format!(
                                "modules {} and {} are {:.1} m apart, below the {:.1} m minimum",
                                a.module_id, b.module_id, gap, min
                            ),
                        ))
                    } else if gap > max {
                        Some((
                            (((gap - max) / max.max(1e-6)) as f64).min(1.0),
                            format!(
                                "modules {} and {} are {:.1} m apart, above the {:.1} m maximum",
                                a.module_id, b.module_id, gap, max
                            ),
                        ))
                    } else {
                        None
                    }
                }
            };

            if let Some((breach, description)) = breach {
                let penalty = calculate_penalty(rule, violations.len(), breach);
                violations.push(Violation {
                    rule_id: rule.id.clone(),
                    severity: rule.severity,
                    module_ids: vec![a.module_id, b.module_id],
                    description,
                    penalty,
                });
            }
        }
    }
    violations
}

/// Evaluate an explicit rule list against a placement set.
pub fn evaluate_rules(
    rules: &[LayoutRule],
    placements: &[ModulePlacement],
    catalog: &ModuleCatalog,
) -> Evaluation {
    let mut violations = Vec::new();
    for rule in rules {
        violations.extend(evaluate_rule(rule, placements, catalog));
    }
    let total_penalty: f64 = violations.iter().map(|v| v.penalty).sum();
    let critical_violations = violations
        .iter()
        .filter(|v| v.severity == Severity::Critical)
        .count();
    Evaluation {
        total_penalty,
        rule_compliance_score: 1.0 / (1.0 + total_penalty / COMPLIANCE_HALF_PENALTY),
        is_valid_layout: critical_violations == 0,
        critical_violations,
        violations,
    }
}

/// Named rule sets, selectable per mission archetype.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleEngine {
    sets: BTreeMap<String, Vec<LayoutRule>>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine preloaded with the built-in "baseline" and
    /// "long_duration" rule sets.
    pub fn with_builtin_sets() -> Self {
        let mut engine = Self::new();
        engine.define_set("baseline", baseline_rules());
        engine.define_set("long_duration", long_duration_rules());
        engine
    }

    /// Define or replace a named rule set.
    pub fn define_set(&mut self, name: &str, rules: Vec<LayoutRule>) {
        self.sets.insert(name.to_string(), rules);
    }

    pub fn add_rule(&mut self, set_name: &str, rule: LayoutRule) {
        self.sets.entry(set_name.to_string()).or_default().push(rule);
    }

    /// Remove a rule by ID from a set. Returns whether it was present.
    pub fn remove_rule(&mut self, set_name: &str, rule_id: &str) -> bool {
        match self.sets.get_mut(set_name) {
            Some(rules) => {
                let before = rules.len();
                rules.retain(|r| r.id != rule_id);
                rules.len() != before
            }
            None => false,
        }
    }

    pub fn rule_set(&self, name: &str) -> Option<&[LayoutRule]> {
        self.sets.get(name).map(Vec::as_slice)
    }

    pub fn set_names(&self) -> Vec<&str> {
        self.sets.keys().map(String::as_str).collect()
    }

    /// Evaluate a placement set against the mission's archetype rule
    /// set, or against `custom_rules` when supplied.
    pub fn evaluate_layout(
        &self,
        placements: &[ModulePlacement],
        catalog: &ModuleCatalog,
        mission: &MissionParameters,
        custom_rules: Option<&[LayoutRule]>,
    ) -> Evaluation {
        let rules: &[LayoutRule] = match custom_rules {
            Some(rules) => rules,
            None => self.rule_set(mission.rule_set_name()).unwrap_or(&[]),
        };
        evaluate_rules(rules, placements, catalog)
    }

    /// Evaluate only the rules with the given IDs from the mission's
    /// archetype set.
    pub fn evaluate_layout_with_ids(
        &self,
        placements: &[ModulePlacement],
        catalog: &ModuleCatalog,
        mission: &MissionParameters,
        rule_ids: &[String],
    ) -> LayoutResult<Evaluation> {
        let set_name = mission.rule_set_name();
        let all = self
            .rule_set(set_name)
            .ok_or_else(|| LayoutError::UnknownRuleSet(set_name.to_string()))?;
        let selected: Vec<LayoutRule> = all
            .iter()
            .filter(|r| rule_ids.contains(&r.id))
            .cloned()
            .collect();
        Ok(evaluate_rules(&selected, placements, catalog))
    }
}

fn rule(
    id: &str,
    kind: RuleKind,
    severity: Severity,
    source: &[ModuleType],
    target: &[ModuleType],
    min: Option<f32>,
    max: Option<f32>,
    penalty_base: f64,
    description: &str,
) -> LayoutRule {
    LayoutRule {
        id: id.to_string(),
        kind,
        severity,
        source_types: source.to_vec(),
        target_types: target.to_vec(),
        min_distance_m: min,
        max_distance_m: max,
        penalty_base,
        description: description.to_string(),
    }
}

/// Built-in rules for typical short-stay missions.
pub fn baseline_rules() -> Vec<LayoutRule> {
    use ModuleType::*;
    vec![
        rule(
            "noise_sleep_mechanical",
            RuleKind::AdjacencyRestriction,
            Severity::High,
            &[SleepQuarter],
            &[Mechanical],
            Some(3.0),
            None,
            10.0,
            "Sleep quarters must be separated from mechanical equipment noise",
        ),
        rule(
            "noise_sleep_exercise",
            RuleKind::AdjacencyRestriction,
            Severity::Medium,
            &[SleepQuarter],
            &[Exercise],
            Some(2.5),
            None,
            8.0,
            "Sleep quarters should not adjoin the exercise area",
        ),
        rule(
            "contamination_galley_medical",
            RuleKind::AdjacencyRestriction,
            Severity::High,
            &[Galley],
            &[Medical],
            Some(2.0),
            None,
            10.0,
            "Food preparation must stay clear of medical operations",
        ),
        rule(
            "contamination_lab_galley",
            RuleKind::AdjacencyRestriction,
            Severity::High,
            &[Laboratory],
            &[Galley],
            Some(2.0),
            None,
            10.0,
            "Laboratory samples must stay clear of food preparation",
        ),
        rule(
            "quiet_medical_zone",
            RuleKind::Zoning,
            Severity::Medium,
            &[Medical],
            &[Mechanical, Exercise],
            Some(2.5),
            None,
            8.0,
            "Medical bay belongs in the quiet zone",
        ),
        rule(
            "lab_sleep_zoning",
            RuleKind::Zoning,
            Severity::Medium,
            &[Laboratory],
            &[SleepQuarter],
            Some(2.0),
            None,
            6.0,
            "Work and rest zones should not interleave",
        ),
        rule(
            "egress_proximity",
            RuleKind::AdjacencyPreference,
            Severity::Medium,
            &[],
            &[Airlock],
            None,
            Some(18.0),
            5.0,
            "Every module should stay within emergency reach of an airlock",
        ),
        rule(
            "galley_storage_supply",
            RuleKind::AdjacencyPreference,
            Severity::Low,
            &[Galley],
            &[Storage],
            None,
            Some(8.0),
            4.0,
            "Galley wants its consumables stowage nearby",
        ),
        rule(
            "sleep_cluster",
            RuleKind::AdjacencyPreference,
            Severity::Low,
            &[SleepQuarter],
            &[SleepQuarter],
            None,
            Some(10.0),
            3.0,
            "Sleep quarters cluster into one habitation zone",
        ),
    ]
}

/// Stricter variant for missions beyond six months.
pub fn long_duration_rules() -> Vec<LayoutRule> {
    use ModuleType::*;
    let mut rules = baseline_rules();
    // Chronic noise exposure becomes a crew-health issue on long stays.
    if let Some(r) = rules.iter_mut().find(|r| r.id == "noise_sleep_mechanical") {
        r.severity = Severity::Critical;
        r.min_distance_m = Some(4.0);
    }
    if let Some(r) = rules.iter_mut().find(|r| r.id == "egress_proximity") {
        r.max_distance_m = Some(15.0);
    }
    rules.push(rule(
        "exercise_medical_separation",
        RuleKind::AdjacencyRestriction,
        Severity::Medium,
        &[Exercise],
        &[Medical],
        Some(2.5),
        None,
        6.0,
        "Daily exercise traffic should bypass the medical bay",
    ));
    rules
}
