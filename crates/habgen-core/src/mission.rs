//! Mission parameters driving layout generation and scoring.

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};

/// Relative importance of scoring dimensions for a mission.
/// Weights are relative to each other; they do not need to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityWeights {
    /// Weight for low transit times between modules.
    pub connectivity: f64,
    /// Weight for egress performance and airlock redundancy.
    pub safety: f64,
    /// Weight for mass and power frugality.
    pub efficiency: f64,
    /// Weight for sensible envelope volume usage.
    pub volume: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            connectivity: 1.0,
            safety: 1.0,
            efficiency: 1.0,
            volume: 1.0,
        }
    }
}

/// Crew and duration parameters for one habitat mission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissionParameters {
    pub crew_size: u32,
    pub duration_days: u32,
    pub priority_weights: PriorityWeights,
}

impl MissionParameters {
    pub fn new(crew_size: u32, duration_days: u32) -> Self {
        Self {
            crew_size,
            duration_days,
            priority_weights: PriorityWeights::default(),
        }
    }

    pub fn validate(&self) -> LayoutResult<()> {
        if self.crew_size == 0 {
            return Err(LayoutError::InvalidMission(
                "crew size must be at least 1".to_string(),
            ));
        }
        if self.duration_days == 0 {
            return Err(LayoutError::InvalidMission(
                "mission duration must be at least 1 day".to_string(),
            ));
        }
        let w = &self.priority_weights;
        if w.connectivity < 0.0 || w.safety < 0.0 || w.efficiency < 0.0 || w.volume < 0.0 {
            return Err(LayoutError::InvalidMission(
                "priority weights must be non-negative".to_string(),
            ));
        }
        if w.connectivity + w.safety + w.efficiency + w.volume <= 0.0 {
            return Err(LayoutError::InvalidMission(
                "at least one priority weight must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Rule-set archetype for this mission: long expeditions use the
    /// stricter separation rules.
    pub fn rule_set_name(&self) -> &'static str {
        if self.duration_days > 180 {
            "long_duration"
        } else {
            "baseline"
        }
    }
}
