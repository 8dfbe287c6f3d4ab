//! Particle state and particle addressing.

use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

pub type Vec3 = Vector3<f64>;

/// A point mass taking part in the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Unique name within a simulation
    pub name: String,
    pub mass: f64,
    pub radius: f64,
    pub position: Vec3,
    pub velocity: Vec3,
}

impl Particle {
    /// Create a particle at rest at the origin.
    pub fn new(name: impl Into<String>, mass: f64) -> Self {
        Self {
            name: name.into(),
            mass,
            radius: 0.0,
            position: Vec3::zeros(),
            velocity: Vec3::zeros(),
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Check mass, radius and state vectors before the particle enters a simulation.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(EngineError::invalid("name", "must not be empty"));
        }
        if !self.mass.is_finite() || self.mass < 0.0 {
            return Err(EngineError::invalid(
                "mass",
                format!("must be finite and non-negative, got {}", self.mass),
            ));
        }
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(EngineError::invalid(
                "radius",
                format!("must be finite and non-negative, got {}", self.radius),
            ));
        }
        if !self.position.iter().all(|c| c.is_finite()) {
            return Err(EngineError::invalid("position", "components must be finite"));
        }
        if !self.velocity.iter().all(|c| c.is_finite()) {
            return Err(EngineError::invalid("velocity", "components must be finite"));
        }
        Ok(())
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.norm_squared()
    }
}

/// Addresses a particle either by insertion index or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParticleRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for ParticleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticleRef::Index(i) => write!(f, "#{}", i),
            ParticleRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

impl From<usize> for ParticleRef {
    fn from(index: usize) -> Self {
        ParticleRef::Index(index)
    }
}

impl From<&str> for ParticleRef {
    fn from(name: &str) -> Self {
        ParticleRef::Name(name.to_string())
    }
}

impl From<String> for ParticleRef {
    fn from(name: String) -> Self {
        ParticleRef::Name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_negative_mass() {
        let p = Particle::new("a", -1.0);
        assert!(matches!(
            p.validate(),
            Err(EngineError::InvalidValue { field: "mass", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_nan_velocity() {
        let p = Particle::new("a", 1.0).with_velocity(Vec3::new(f64::NAN, 0.0, 0.0));
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_ref_display() {
        assert_eq!(ParticleRef::from(3).to_string(), "#3");
        assert_eq!(ParticleRef::from("earth").to_string(), "'earth'");
    }
}
