//! Generative habitat layout engine.
//!
//! This crate contains the full layout core, independent of any
//! database, transport, or export concern. Callers hand in an envelope
//! and mission parameters and receive scored layouts back; persistence
//! and presentation live in downstream consumers.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Read-only module definitions (footprint, mass, power, adjacency) |
//! | [`collision`] | Candidate-vs-set collision checks, clearance matrix, walkways |
//! | [`connectivity`] | Module graph, shortest paths, egress and airlock validation |
//! | [`envelope`] | Pressure-vessel shapes, volumes, containment tests |
//! | [`error`] | Error taxonomy (configuration, infeasibility, exhaustion) |
//! | [`generator`] | Constrained-random layout generation with bounded retries |
//! | [`geometry`] | Rotation-aware bounding boxes and distance queries |
//! | [`layout`] | Placements, finished layout specs, rationale text |
//! | [`mission`] | Crew/duration parameters and priority weights |
//! | [`optimizer`] | NSGA-II multi-objective search over layouts |
//! | [`rules`] | Adjacency/zoning grammar with severity-weighted penalties |
//! | [`scoring`] | Performance metrics and composite scores |
//! | [`spatial`] | Module-ID → box index with nearby/range queries |

pub mod catalog;
pub mod collision;
pub mod connectivity;
pub mod envelope;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod layout;
pub mod mission;
pub mod optimizer;
pub mod rules;
pub mod scoring;
pub mod spatial;

pub use catalog::{ModuleCatalog, ModuleDefinition, ModuleType};
pub use envelope::{Envelope, EnvelopeShape};
pub use error::{LayoutError, LayoutResult};
pub use generator::{GeneratorConfig, LayoutGenerator};
pub use layout::{LayoutSpec, ModulePlacement};
pub use mission::MissionParameters;
pub use optimizer::{
    CancelToken, LayoutOptimizer, OptimizationConfig, OptimizationObjective, OptimizationResult,
};
pub use rules::RuleEngine;
pub use scoring::PerformanceMetrics;
