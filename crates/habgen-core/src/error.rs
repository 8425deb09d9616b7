//! Error taxonomy for the layout engine.
//!
//! Configuration errors surface immediately and are never retried.
//! Infeasibility errors surface only after the full bounded retry
//! policy has been exhausted.

use crate::catalog::ModuleType;

/// Result type for layout engine operations.
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Errors that can occur during layout generation and optimization.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("catalog has no module definition for type {0:?}")]
    EmptyCatalog(ModuleType),

    #[error("requested layout count {0} is outside 1..=8")]
    InvalidCount(usize),

    #[error("invalid mission parameters: {0}")]
    InvalidMission(String),

    #[error("invalid optimization config: {0}")]
    InvalidConfig(String),

    #[error(
        "required module volume {required_m3:.1} m³ exceeds usable envelope volume {usable_m3:.1} m³"
    )]
    Infeasible { required_m3: f32, usable_m3: f32 },

    #[error("no valid layout produced after {attempts} generation attempts")]
    GenerationExhausted { attempts: u32 },

    #[error("optimizer could not seed a feasible individual after {attempts} attempts")]
    SeedingFailed { attempts: u32 },

    #[error("unknown rule set '{0}'")]
    UnknownRuleSet(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = LayoutError::Infeasible {
            required_m3: 120.0,
            usable_m3: 48.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("120.0"));
        assert!(msg.contains("48.5"));

        let err = LayoutError::InvalidCount(12);
        assert!(err.to_string().contains("12"));
    }

    #[test]
    fn errors_are_comparable() {
        assert_eq!(
            LayoutError::InvalidCount(0),
            LayoutError::InvalidCount(0)
        );
        assert_ne!(
            LayoutError::InvalidCount(0),
            LayoutError::InvalidCount(9)
        );
    }
}
