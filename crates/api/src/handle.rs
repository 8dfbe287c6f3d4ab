// =============================================================================
// Orrery API - Simulation Handle
// =============================================================================
// The only view of an engine simulation the HTTP layer gets: an identifier
// plus read accessors shaped for responses. Mutation goes through the body
// builder, integrator and trajectory modules.
// =============================================================================

use orrery_engine::{IntegratorKind, Particle, ParticleRef, Simulation, Vec3};
use serde::Serialize;

use crate::error::ApiError;

/// A loaded simulation owned by one request.
#[derive(Debug, Clone)]
pub struct SimulationHandle {
    id: String,
    sim: Simulation,
}

/// Full state of one body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BodyState {
    pub index: usize,
    pub name: String,
    pub mass: f64,
    pub radius: f64,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

/// Returned when a body is added or updated.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BodyRef {
    pub index: usize,
    pub name: String,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

/// Whole-simulation snapshot returned by load and integrate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    pub id: String,
    pub time: f64,
    #[serde(rename = "G")]
    pub g: f64,
    pub dt: f64,
    pub integrator: IntegratorKind,
    pub bodies: Vec<BodyState>,
}

pub(crate) fn components(v: &Vec3) -> [f64; 3] {
    [v.x, v.y, v.z]
}

/// Query values are always strings; digits address a body by index.
pub fn parse_body_ref(raw: &str) -> ParticleRef {
    match raw.parse::<usize>() {
        Ok(index) => ParticleRef::Index(index),
        Err(_) => ParticleRef::Name(raw.to_string()),
    }
}

impl BodyState {
    fn from_particle(index: usize, p: &Particle) -> Self {
        Self {
            index,
            name: p.name.clone(),
            mass: p.mass,
            radius: p.radius,
            position: components(&p.position),
            velocity: components(&p.velocity),
        }
    }
}

impl SimulationHandle {
    pub(crate) fn new(id: impl Into<String>, sim: Simulation) -> Self {
        Self { id: id.into(), sim }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.sim.t()
    }

    pub fn body_count(&self) -> usize {
        self.sim.len()
    }

    pub fn state(&self) -> SystemState {
        SystemState {
            id: self.id.clone(),
            time: self.sim.t(),
            g: self.sim.G(),
            dt: self.sim.config().dt,
            integrator: self.sim.config().integrator,
            bodies: self
                .sim
                .particles()
                .iter()
                .enumerate()
                .map(|(i, p)| BodyState::from_particle(i, p))
                .collect(),
        }
    }

    /// Resolve a body reference, failing with InvalidParameter when it is unknown.
    pub fn resolve(&self, reference: &ParticleRef) -> Result<usize, ApiError> {
        self.sim
            .index_of(reference)
            .map_err(|_| ApiError::invalid(format!("body {} does not exist in simulation {}", reference, self.id)))
    }

    pub fn body(&self, reference: &ParticleRef) -> Result<BodyState, ApiError> {
        let index = self.resolve(reference)?;
        Ok(BodyState::from_particle(index, &self.sim.particles()[index]))
    }

    pub(crate) fn body_ref(&self, index: usize) -> BodyRef {
        let p = &self.sim.particles()[index];
        BodyRef {
            index,
            name: p.name.clone(),
            position: components(&p.position),
            velocity: components(&p.velocity),
        }
    }

    pub(crate) fn engine(&self) -> &Simulation {
        &self.sim
    }

    pub(crate) fn engine_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_ref() {
        assert_eq!(parse_body_ref("2"), ParticleRef::Index(2));
        assert_eq!(parse_body_ref("earth"), ParticleRef::Name("earth".into()));
        assert_eq!(parse_body_ref("-1"), ParticleRef::Name("-1".into()));
    }

    #[test]
    fn test_state_lists_bodies_in_order() {
        let mut sim = Simulation::new();
        sim.add(Particle::new("sun", 1.0)).unwrap();
        sim.add(Particle::new("earth", 3e-6).with_position(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let handle = SimulationHandle::new("demo", sim);

        let state = handle.state();
        assert_eq!(state.id, "demo");
        assert_eq!(state.bodies.len(), 2);
        assert_eq!(state.bodies[1].name, "earth");
        assert_eq!(state.bodies[1].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unknown_body_is_invalid_parameter() {
        let handle = SimulationHandle::new("demo", Simulation::new());
        let err = handle.body(&ParticleRef::from("ghost")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));
    }
}
