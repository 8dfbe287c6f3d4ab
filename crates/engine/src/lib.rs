//! # Orrery Engine
//!
//! Gravitational N-body engine used by the Orrery service. It owns the
//! numerics the service only orchestrates:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Simulation                                                   │
//! │  ├── particles: ordered, uniquely named point masses          │
//! │  ├── integrate(t): fixed-step symplectic, exact finish time   │
//! │  ├── add_orbit / orbit: Keplerian elements <-> Cartesian      │
//! │  └── save / load: versioned bincode snapshots                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use orrery_engine::prelude::*;
//!
//! let mut sim = Simulation::new();
//! sim.add(Particle::new("sun", 1.0)).unwrap();
//! let spec = OrbitSpec::new(OrbitSize::SemiMajorAxis(1.0), 0.0, 0.0);
//! sim.add_orbit(&ParticleRef::from("sun"), "earth", 3e-6, 0.0, &spec).unwrap();
//! sim.integrate(1.0).unwrap();
//! assert_eq!(sim.t(), 1.0);
//! ```

pub mod error;
pub mod integrator;
pub mod orbit;
pub mod particle;
pub mod simulation;
pub mod snapshot;

pub use error::{EngineError, Result};
pub use integrator::IntegratorKind;
pub use orbit::{OrbitSize, OrbitSpec, OrbitalElements};
pub use particle::{Particle, ParticleRef, Vec3};
pub use simulation::{Simulation, SimulationConfig};

// ============================================================================
// Prelude
// ============================================================================

/// Convenient re-exports for common engine types.
pub mod prelude {
    pub use super::error::EngineError;
    pub use super::integrator::IntegratorKind;
    pub use super::orbit::{OrbitSize, OrbitSpec, OrbitalElements};
    pub use super::particle::{Particle, ParticleRef, Vec3};
    pub use super::simulation::{Simulation, SimulationConfig};
}
