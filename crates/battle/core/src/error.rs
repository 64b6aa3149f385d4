//! Error types for battle-core.
//!
//! Effect errors are per-stat and recoverable: a modifier that hits one of
//! them skips that stat and keeps going. Configuration errors are the only
//! fatal class and can only occur while building tables at startup.

use crate::stats::Stat;

/// Failure to apply or revert one stat contribution of an effect.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EffectError {
    #[error("unknown stat name `{name}`")]
    UnknownStat { name: String },

    #[error("combatant `{entity}` does not carry stat `{stat}`")]
    UnsupportedStat { entity: String, stat: Stat },

    #[error("combatant `{entity}` has no base value for `{stat}`, multiplier skipped")]
    MissingBaseStat { entity: String, stat: Stat },

    #[error("delta for `{stat}` is not finite ({value})")]
    NonFiniteDelta { stat: Stat, value: f64 },
}

impl EffectError {
    /// Stat the failure is attributed to, when known.
    pub fn stat(&self) -> Option<Stat> {
        match self {
            Self::UnknownStat { .. } => None,
            Self::UnsupportedStat { stat, .. }
            | Self::MissingBaseStat { stat, .. }
            | Self::NonFiniteDelta { stat, .. } => Some(*stat),
        }
    }
}

/// Invalid static configuration. Surfaced once, at startup.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("diminishing returns for `{stat}`: threshold must be positive and finite, got {value}")]
    InvalidThreshold { stat: Stat, value: f64 },

    #[error("diminishing returns for `{stat}`: scaling factor must be finite and >= 1, got {value}")]
    InvalidScalingFactor { stat: Stat, value: f64 },

    #[error("diminishing returns for `{stat}`: base offset must be finite, got {value}")]
    InvalidBaseOffset { stat: Stat, value: f64 },
}
