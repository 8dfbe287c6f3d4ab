// =============================================================================
// Orrery API - Body Builder
// =============================================================================
// Turns body descriptions (Cartesian state or orbital elements) into engine
// calls. All numeric conversion happens inside the engine.
// =============================================================================

use orrery_engine::{OrbitSize, OrbitSpec, Particle, ParticleRef, Vec3};
use serde::Deserialize;
use tracing::info;

use crate::error::ApiError;
use crate::handle::{BodyRef, SimulationHandle};

/// Orbital elements as they arrive over the wire. Missing required values
/// are reported as InvalidParameter rather than as a payload rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElementsInput {
    pub a: Option<f64>,
    #[serde(rename = "P")]
    pub period: Option<f64>,
    pub e: Option<f64>,
    pub inc: Option<f64>,
    pub omega: Option<f64>,
    #[serde(rename = "Omega")]
    pub node: Option<f64>,
    #[serde(rename = "M")]
    pub mean_anomaly: Option<f64>,
}

impl ElementsInput {
    pub fn to_spec(&self) -> Result<OrbitSpec, ApiError> {
        let size = match (self.a, self.period) {
            (Some(a), None) => OrbitSize::SemiMajorAxis(a),
            (None, Some(p)) => OrbitSize::Period(p),
            (Some(_), Some(_)) => {
                return Err(ApiError::invalid("give either 'a' or 'P', not both"));
            }
            (None, None) => {
                return Err(ApiError::invalid("missing orbital element 'a' (or 'P')"));
            }
        };
        let e = self
            .e
            .ok_or_else(|| ApiError::invalid("missing orbital element 'e'"))?;
        let mean_anomaly = self
            .mean_anomaly
            .ok_or_else(|| ApiError::invalid("missing orbital element 'M'"))?;

        Ok(OrbitSpec::new(size, e, mean_anomaly).with_orientation(
            self.inc.unwrap_or(0.0),
            self.omega.unwrap_or(0.0),
            self.node.unwrap_or(0.0),
        ))
    }
}

/// Caller's name, or the first free `body-<n>` with `n` at least the new body's index.
fn resolve_name(handle: &SimulationHandle, name: Option<String>) -> String {
    if let Some(name) = name {
        return name;
    }
    let taken = |candidate: &str| {
        handle
            .engine()
            .particles()
            .iter()
            .any(|p| p.name == candidate)
    };
    (handle.body_count()..)
        .map(|n| format!("body-{}", n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Add the primary: at rest at the origin, and always the first body.
pub fn add_primary(
    handle: &mut SimulationHandle,
    mass: f64,
    radius: Option<f64>,
    name: Option<String>,
) -> Result<BodyRef, ApiError> {
    if handle.body_count() > 0 {
        return Err(ApiError::invalid(format!(
            "simulation {} already has bodies; the primary must be added first",
            handle.id()
        )));
    }
    let name = name.unwrap_or_else(|| "primary".to_string());
    let particle = Particle::new(name, mass).with_radius(radius.unwrap_or(0.0));
    let index = handle.engine_mut().add(particle)?;

    info!(id = %handle.id(), mass, "Primary added");
    Ok(handle.body_ref(index))
}

/// Add a body from its Cartesian state.
pub fn add_body(
    handle: &mut SimulationHandle,
    mass: f64,
    position: [f64; 3],
    velocity: [f64; 3],
    radius: Option<f64>,
    name: Option<String>,
) -> Result<BodyRef, ApiError> {
    let name = resolve_name(handle, name);
    let particle = Particle::new(name, mass)
        .with_radius(radius.unwrap_or(0.0))
        .with_position(Vec3::from(position))
        .with_velocity(Vec3::from(velocity));
    let index = handle.engine_mut().add(particle)?;

    info!(id = %handle.id(), index, "Body added");
    Ok(handle.body_ref(index))
}

/// Add a body on an orbit around `primary` (defaults to the first body).
pub fn add_from_elements(
    handle: &mut SimulationHandle,
    primary: Option<ParticleRef>,
    mass: f64,
    elements: &ElementsInput,
    radius: Option<f64>,
    name: Option<String>,
) -> Result<BodyRef, ApiError> {
    let spec = elements.to_spec()?;
    let primary = primary.unwrap_or(ParticleRef::Index(0));
    if handle.body_count() == 0 {
        return Err(ApiError::invalid(
            "primary must be added before bodies given by orbital elements",
        ));
    }
    let primary_index = handle.resolve(&primary)?;

    let name = resolve_name(handle, name);
    let index = handle.engine_mut().add_orbit(
        &ParticleRef::Index(primary_index),
        name,
        mass,
        radius.unwrap_or(0.0),
        &spec,
    )?;

    info!(id = %handle.id(), index, primary = primary_index, "Body added from elements");
    Ok(handle.body_ref(index))
}

/// Replace any of mass, position and velocity of an existing body.
pub fn update_body(
    handle: &mut SimulationHandle,
    body: &ParticleRef,
    mass: Option<f64>,
    position: Option<[f64; 3]>,
    velocity: Option<[f64; 3]>,
) -> Result<BodyRef, ApiError> {
    let index = handle.resolve(body)?;
    let reference = ParticleRef::Index(index);

    let mut updated = handle.engine().particle(&reference)?.clone();
    if let Some(mass) = mass {
        updated.mass = mass;
    }
    if let Some(position) = position {
        updated.position = Vec3::from(position);
    }
    if let Some(velocity) = velocity {
        updated.velocity = Vec3::from(velocity);
    }
    updated.validate()?;

    *handle.engine_mut().particle_mut(&reference)? = updated;
    info!(id = %handle.id(), index, "Body updated");
    Ok(handle.body_ref(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use orrery_engine::Simulation;

    fn empty() -> SimulationHandle {
        SimulationHandle::new("test", Simulation::new())
    }

    fn circular(a: f64) -> ElementsInput {
        ElementsInput {
            a: Some(a),
            e: Some(0.0),
            mean_anomaly: Some(0.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_primary_must_come_first() {
        let mut h = empty();
        add_body(&mut h, 1.0, [0.0; 3], [0.0; 3], None, None).unwrap();
        let err = add_primary(&mut h, 1.0, None, None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));
    }

    #[test]
    fn test_default_names() {
        let mut h = empty();
        let p = add_primary(&mut h, 1.0, Some(0.1), None).unwrap();
        assert_eq!(p.name, "primary");
        let b = add_body(&mut h, 1e-6, [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], None, None).unwrap();
        assert_eq!(b.index, 1);
        assert_eq!(b.name, "body-1");
    }

    #[test]
    fn test_default_name_skips_taken_names() {
        let mut h = empty();
        add_primary(&mut h, 1.0, None, None).unwrap();
        add_body(&mut h, 1e-6, [1.0, 0.0, 0.0], [0.0; 3], None, Some("body-2".into())).unwrap();

        let b = add_body(&mut h, 1e-6, [2.0, 0.0, 0.0], [0.0; 3], None, None).unwrap();
        assert_eq!(b.index, 2);
        assert_eq!(b.name, "body-3");

        let c = add_from_elements(&mut h, None, 0.0, &circular(3.0), None, None).unwrap();
        assert_eq!(c.name, "body-4");
    }

    #[test]
    fn test_elements_relative_to_primary() {
        let mut h = empty();
        add_primary(&mut h, 1.0, None, Some("sun".into())).unwrap();
        let b = add_from_elements(&mut h, None, 0.0, &circular(2.0), None, None).unwrap();
        assert_relative_eq!(b.position[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(b.velocity[1], (0.5f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_elements_need_a_primary() {
        let mut h = empty();
        let err = add_from_elements(&mut h, None, 0.0, &circular(1.0), None, None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));

        add_primary(&mut h, 1.0, None, None).unwrap();
        let err = add_from_elements(
            &mut h,
            Some(ParticleRef::from("jupiter")),
            0.0,
            &circular(1.0),
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("jupiter"));
    }

    #[test]
    fn test_missing_elements() {
        let missing_e = ElementsInput {
            a: Some(1.0),
            mean_anomaly: Some(0.0),
            ..Default::default()
        };
        assert!(missing_e.to_spec().unwrap_err().to_string().contains("'e'"));

        let both = ElementsInput {
            a: Some(1.0),
            period: Some(1.0),
            e: Some(0.0),
            mean_anomaly: Some(0.0),
            ..Default::default()
        };
        assert!(both.to_spec().is_err());
        assert!(ElementsInput::default().to_spec().is_err());
    }

    #[test]
    fn test_out_of_range_eccentricity_is_invalid_parameter() {
        let mut h = empty();
        add_primary(&mut h, 1.0, None, None).unwrap();
        let hyperbolic = ElementsInput {
            e: Some(1.5),
            ..circular(1.0)
        };
        let err = add_from_elements(&mut h, None, 0.0, &hyperbolic, None, None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));
    }

    #[test]
    fn test_update_body() {
        let mut h = empty();
        add_primary(&mut h, 1.0, None, None).unwrap();
        add_body(&mut h, 1.0, [1.0, 0.0, 0.0], [0.0; 3], None, Some("moon".into())).unwrap();

        let r = update_body(&mut h, &ParticleRef::from("moon"), None, None, Some([0.0, 2.0, 0.0]))
            .unwrap();
        assert_eq!(r.position, [1.0, 0.0, 0.0]);
        assert_eq!(r.velocity, [0.0, 2.0, 0.0]);

        let err = update_body(&mut h, &ParticleRef::from(1), Some(-1.0), None, None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));
        assert_eq!(h.body(&ParticleRef::from(1)).unwrap().mass, 1.0);
    }
}
