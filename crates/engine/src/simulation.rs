//! The simulation object: particles, time, and the integrate loop.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{EngineError, Result};
use crate::integrator::{self, IntegratorKind};
use crate::orbit::{OrbitSpec, OrbitalElements};
use crate::particle::{Particle, ParticleRef};

/// Tunables fixed when a simulation is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Gravitational constant
    pub g: f64,
    /// Integrator step
    pub dt: f64,
    pub integrator: IntegratorKind,
    /// Fail integration if any particle gets further than this from the origin
    pub exit_max_distance: Option<f64>,
    /// Fail integration if any two particles get closer than this
    pub exit_min_distance: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            g: 1.0,
            dt: 1e-3,
            integrator: IntegratorKind::default(),
            exit_max_distance: None,
            exit_min_distance: None,
        }
    }
}

impl SimulationConfig {
    pub fn with_g(mut self, g: f64) -> Self {
        self.g = g;
        self
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_integrator(mut self, integrator: IntegratorKind) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn with_exit_max_distance(mut self, distance: f64) -> Self {
        self.exit_max_distance = Some(distance);
        self
    }

    pub fn with_exit_min_distance(mut self, distance: f64) -> Self {
        self.exit_min_distance = Some(distance);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.g.is_finite() && self.g > 0.0) {
            return Err(EngineError::invalid("G", format!("must be positive, got {}", self.g)));
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(EngineError::invalid("dt", format!("must be positive, got {}", self.dt)));
        }
        for (field, value) in [
            ("exit_max_distance", self.exit_max_distance),
            ("exit_min_distance", self.exit_min_distance),
        ] {
            if let Some(d) = value {
                if !(d.is_finite() && d > 0.0) {
                    return Err(EngineError::invalid(field, format!("must be positive, got {}", d)));
                }
            }
        }
        Ok(())
    }
}

/// A gravitational N-body simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    config: SimulationConfig,
    t: f64,
    particles: Vec<Particle>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// Empty simulation at t=0 with default settings.
    pub fn new() -> Self {
        Self {
            config: SimulationConfig::default(),
            t: 0.0,
            particles: Vec::new(),
        }
    }

    pub fn with_config(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            t: 0.0,
            particles: Vec::new(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current simulation time.
    pub fn t(&self) -> f64 {
        self.t
    }

    #[allow(non_snake_case)]
    pub fn G(&self) -> f64 {
        self.config.g
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Resolve a reference to an index.
    pub fn index_of(&self, reference: &ParticleRef) -> Result<usize> {
        match reference {
            ParticleRef::Index(i) if *i < self.particles.len() => Ok(*i),
            ParticleRef::Name(name) => self
                .particles
                .iter()
                .position(|p| &p.name == name)
                .ok_or_else(|| EngineError::ParticleNotFound(reference.clone())),
            _ => Err(EngineError::ParticleNotFound(reference.clone())),
        }
    }

    pub fn particle(&self, reference: &ParticleRef) -> Result<&Particle> {
        let index = self.index_of(reference)?;
        Ok(&self.particles[index])
    }

    pub fn particle_mut(&mut self, reference: &ParticleRef) -> Result<&mut Particle> {
        let index = self.index_of(reference)?;
        Ok(&mut self.particles[index])
    }

    /// Add a particle, returning its index.
    pub fn add(&mut self, particle: Particle) -> Result<usize> {
        particle.validate()?;
        if self.particles.iter().any(|p| p.name == particle.name) {
            return Err(EngineError::DuplicateParticle(particle.name));
        }
        debug!(name = %particle.name, mass = particle.mass, "particle added");
        self.particles.push(particle);
        Ok(self.particles.len() - 1)
    }

    /// Add a particle on an orbit around `primary`, returning its index.
    ///
    /// The new particle's state is the primary's state plus the two-body
    /// state for `mu = G (M_primary + m)`.
    pub fn add_orbit(
        &mut self,
        primary: &ParticleRef,
        name: impl Into<String>,
        mass: f64,
        radius: f64,
        orbit: &OrbitSpec,
    ) -> Result<usize> {
        let primary = self.particle(primary)?;
        let mu = self.config.g * (primary.mass + mass);
        let (position, velocity) = orbit.to_relative_state(mu)?;

        let particle = Particle::new(name, mass)
            .with_radius(radius)
            .with_position(primary.position + position)
            .with_velocity(primary.velocity + velocity);
        self.add(particle)
    }

    /// Orbital elements of `particle` relative to `primary`.
    pub fn orbit(&self, particle: &ParticleRef, primary: &ParticleRef) -> Result<OrbitalElements> {
        let body = self.particle(particle)?;
        let center = self.particle(primary)?;
        if body.name == center.name {
            return Err(EngineError::invalid("primary", "a particle cannot orbit itself"));
        }
        let mu = self.config.g * (body.mass + center.mass);
        OrbitalElements::from_relative_state(
            &(body.position - center.position),
            &(body.velocity - center.velocity),
            mu,
        )
    }

    /// Integrate forward so that the simulation lands exactly on `target`.
    pub fn integrate(&mut self, target: f64) -> Result<()> {
        if !target.is_finite() {
            return Err(EngineError::invalid("time", "must be finite"));
        }
        if target < self.t {
            return Err(EngineError::TargetInPast {
                current: self.t,
                target,
            });
        }

        let dt = self.config.dt;
        let mut steps = 0u64;
        while self.t < target {
            let remaining = target - self.t;
            // Shorten the last step instead of overshooting
            let (h, next) = if remaining <= dt {
                (remaining, target)
            } else {
                (dt, self.t + dt)
            };
            self.config
                .integrator
                .step(&mut self.particles, self.config.g, h, self.t)?;
            self.t = next;
            steps += 1;
            self.check_exit()?;
        }

        trace!(t = self.t, steps, "integration finished");
        Ok(())
    }

    fn check_exit(&self) -> Result<()> {
        if let Some(limit) = self.config.exit_max_distance {
            if let Some(index) = self
                .particles
                .iter()
                .position(|p| p.position.norm() > limit)
            {
                return Err(EngineError::Escape {
                    index,
                    limit,
                    time: self.t,
                });
            }
        }

        if let Some(limit) = self.config.exit_min_distance {
            for (i, a) in self.particles.iter().enumerate() {
                for (j, b) in self.particles.iter().enumerate().skip(i + 1) {
                    if (b.position - a.position).norm() < limit {
                        return Err(EngineError::Encounter {
                            first: i,
                            second: j,
                            time: self.t,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Total mechanical energy.
    pub fn energy(&self) -> f64 {
        integrator::total_energy(&self.particles, self.config.g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::OrbitSize;
    use crate::particle::Vec3;
    use approx::assert_relative_eq;

    fn sun_and_planet() -> Simulation {
        let mut sim = Simulation::new();
        sim.add(Particle::new("sun", 1.0)).unwrap();
        sim.add(
            Particle::new("planet", 1e-6)
                .with_position(Vec3::new(1.0, 0.0, 0.0))
                .with_velocity(Vec3::new(0.0, 1.0, 0.0)),
        )
        .unwrap();
        sim
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut sim = Simulation::new();
        sim.add(Particle::new("sun", 1.0)).unwrap();
        let err = sim.add(Particle::new("sun", 2.0)).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateParticle(name) if name == "sun"));
    }

    #[test]
    fn test_lookup_by_index_and_name() {
        let sim = sun_and_planet();
        assert_eq!(sim.index_of(&ParticleRef::from("planet")).unwrap(), 1);
        assert_eq!(sim.particle(&ParticleRef::from(0)).unwrap().name, "sun");
        assert!(sim.particle(&ParticleRef::from(2)).is_err());
        assert!(sim.particle(&ParticleRef::from("moon")).is_err());
    }

    #[test]
    fn test_integrate_lands_on_target() {
        let mut sim = sun_and_planet();
        sim.integrate(0.12345).unwrap();
        assert_eq!(sim.t(), 0.12345);
        sim.integrate(0.12345).unwrap();
        assert_eq!(sim.t(), 0.12345);
    }

    #[test]
    fn test_integrate_backwards_fails() {
        let mut sim = sun_and_planet();
        sim.integrate(1.0).unwrap();
        let err = sim.integrate(0.5).unwrap_err();
        assert!(matches!(err, EngineError::TargetInPast { .. }));
        assert!(err.is_caller_error());
        assert_eq!(sim.t(), 1.0);
    }

    #[test]
    fn test_circular_orbit_closes() {
        let mut sim = sun_and_planet();
        sim.integrate(std::f64::consts::TAU).unwrap();
        let planet = sim.particle(&ParticleRef::from("planet")).unwrap();
        assert_relative_eq!(planet.position, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-3);
    }

    #[test]
    fn test_energy_conserved_over_orbit() {
        let mut sim = sun_and_planet();
        let before = sim.energy();
        sim.integrate(std::f64::consts::TAU).unwrap();
        assert_relative_eq!(sim.energy(), before, max_relative = 1e-8);
    }

    #[test]
    fn test_escape_detected() {
        let config = SimulationConfig::default().with_exit_max_distance(2.0);
        let mut sim = Simulation::with_config(config).unwrap();
        sim.add(Particle::new("sun", 1.0)).unwrap();
        sim.add(
            Particle::new("comet", 0.0)
                .with_position(Vec3::new(1.0, 0.0, 0.0))
                .with_velocity(Vec3::new(3.0, 0.0, 0.0)),
        )
        .unwrap();
        let err = sim.integrate(10.0).unwrap_err();
        assert!(matches!(err, EngineError::Escape { index: 1, .. }));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_encounter_detected() {
        let config = SimulationConfig::default().with_exit_min_distance(0.5);
        let mut sim = Simulation::with_config(config).unwrap();
        sim.add(Particle::new("a", 1.0).with_position(Vec3::new(-1.0, 0.0, 0.0)))
            .unwrap();
        sim.add(Particle::new("b", 1.0).with_position(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let err = sim.integrate(5.0).unwrap_err();
        assert!(matches!(err, EngineError::Encounter { first: 0, second: 1, .. }));
    }

    #[test]
    fn test_add_orbit_relative_to_moving_primary() {
        let mut sim = Simulation::new();
        sim.add(
            Particle::new("star", 1.0)
                .with_position(Vec3::new(10.0, 0.0, 0.0))
                .with_velocity(Vec3::new(0.0, 0.5, 0.0)),
        )
        .unwrap();
        let spec = OrbitSpec::new(OrbitSize::SemiMajorAxis(1.0), 0.0, 0.0);
        let index = sim
            .add_orbit(&ParticleRef::from("star"), "planet", 0.0, 0.0, &spec)
            .unwrap();
        let planet = &sim.particles()[index];
        assert_relative_eq!(planet.position, Vec3::new(11.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(planet.velocity, Vec3::new(0.0, 1.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_add_orbit_unknown_primary() {
        let mut sim = Simulation::new();
        let spec = OrbitSpec::new(OrbitSize::SemiMajorAxis(1.0), 0.0, 0.0);
        let err = sim
            .add_orbit(&ParticleRef::from(0), "planet", 0.0, 0.0, &spec)
            .unwrap_err();
        assert!(matches!(err, EngineError::ParticleNotFound(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Simulation::with_config(SimulationConfig::default().with_dt(0.0)).is_err());
        assert!(Simulation::with_config(SimulationConfig::default().with_g(-1.0)).is_err());
    }
}
