//! Error types for the Orrery engine
//!
//! ## Table of Contents
//! - **EngineError**: Every failure the engine can report
//! - **Result**: Type alias for `Result<T, EngineError>`

use thiserror::Error;

use crate::particle::ParticleRef;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// A particle name is already taken in this simulation
    #[error("particle '{0}' already exists")]
    DuplicateParticle(String),

    /// No particle matches the given index or name
    #[error("particle {0} not found")]
    ParticleNotFound(ParticleRef),

    /// A caller-supplied value is out of range or not finite
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// Integration target lies behind the current simulation time
    #[error("cannot integrate backwards from t={current} to t={target}")]
    TargetInPast { current: f64, target: f64 },

    /// Kepler's equation did not converge
    #[error("kepler solver did not converge for M={mean_anomaly}, e={eccentricity}")]
    KeplerNonConvergence { mean_anomaly: f64, eccentricity: f64 },

    /// State became NaN or infinite during a step
    #[error("non-finite state for particle {index} at t={time}")]
    NonFinite { index: usize, time: f64 },

    /// A particle left the simulation region
    #[error("particle {index} escaped beyond {limit} at t={time}")]
    Escape { index: usize, limit: f64, time: f64 },

    /// Two particles came closer than the configured minimum distance
    #[error("close encounter between particles {first} and {second} at t={time}")]
    Encounter {
        first: usize,
        second: usize,
        time: f64,
    },

    /// Snapshot bytes are not a valid engine snapshot
    #[error("snapshot decode error: {0}")]
    Decode(String),

    /// Snapshot encoding failure
    #[error("snapshot encode error: {0}")]
    Encode(String),

    /// Snapshot file I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create an invalid value error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    /// True when the error was caused by caller input rather than the numerics
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateParticle(_)
                | Self::ParticleNotFound(_)
                | Self::InvalidValue { .. }
                | Self::TargetInPast { .. }
        )
    }
}
