// =============================================================================
// Orrery API - Integrator Facade
// =============================================================================
// Advances a simulation to a target time. Numerical failures are passed
// through as engine errors and never retried.
// =============================================================================

use orrery_engine::ParticleRef;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::handle::{BodyState, SimulationHandle, SystemState};

/// Result of a prediction: the whole system, or one body when a target was named.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    System(SystemState),
    Body { time: f64, body: BodyState },
}

fn check_target(handle: &SimulationHandle, target: f64) -> Result<(), ApiError> {
    if !target.is_finite() {
        return Err(ApiError::invalid(format!("time must be finite, got {}", target)));
    }
    if target < handle.time() {
        return Err(ApiError::invalid(format!(
            "cannot integrate backwards: current time is {}, requested {}",
            handle.time(),
            target
        )));
    }
    Ok(())
}

/// Integrate `handle` forward to exactly `target` and return the new state.
pub fn integrate(handle: &mut SimulationHandle, target: f64) -> Result<SystemState, ApiError> {
    check_target(handle, target)?;
    let from = handle.time();

    if let Err(e) = handle.engine_mut().integrate(target) {
        warn!(id = %handle.id(), from, target, error = %e, "Integration failed");
        return Err(e.into());
    }

    info!(id = %handle.id(), from, to = handle.time(), "Simulation integrated");
    Ok(handle.state())
}

/// Integrate a copy of `handle` to `time`; the caller's simulation is untouched.
pub fn predict(
    handle: &SimulationHandle,
    time: f64,
    target: Option<&ParticleRef>,
) -> Result<Prediction, ApiError> {
    // Resolve first so a bad reference fails before any integration work
    let index = target.map(|r| handle.resolve(r)).transpose()?;

    let mut copy = handle.clone();
    integrate(&mut copy, time)?;

    Ok(match index {
        Some(i) => Prediction::Body {
            time: copy.time(),
            body: copy.body(&ParticleRef::Index(i))?,
        },
        None => Prediction::System(copy.state()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use orrery_engine::{Particle, Simulation, SimulationConfig, Vec3};

    fn two_body(config: SimulationConfig) -> SimulationHandle {
        let mut sim = Simulation::with_config(config).unwrap();
        sim.add(Particle::new("sun", 1.0)).unwrap();
        sim.add(
            Particle::new("planet", 1e-6)
                .with_position(Vec3::new(1.0, 0.0, 0.0))
                .with_velocity(Vec3::new(0.0, 1.0, 0.0)),
        )
        .unwrap();
        SimulationHandle::new("test", sim)
    }

    #[test]
    fn test_integrate_lands_on_target() {
        let mut h = two_body(SimulationConfig::default());
        let state = integrate(&mut h, 0.5).unwrap();
        assert_eq!(state.time, 0.5);
        let state = integrate(&mut h, 0.5).unwrap();
        assert_eq!(state.time, 0.5);
    }

    #[test]
    fn test_backwards_is_invalid_parameter() {
        let mut h = two_body(SimulationConfig::default());
        integrate(&mut h, 1.0).unwrap();
        let err = integrate(&mut h, 0.5).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));
        assert_eq!(h.time(), 1.0);

        assert!(matches!(
            integrate(&mut h, f64::NAN),
            Err(ApiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_escape_is_engine_error() {
        let mut h = two_body(SimulationConfig::default().with_exit_max_distance(0.5));
        let err = integrate(&mut h, 0.1).unwrap_err();
        assert!(matches!(err, ApiError::Engine(_)));
    }

    #[test]
    fn test_predict_leaves_original_alone() {
        let h = two_body(SimulationConfig::default());
        let prediction = predict(&h, std::f64::consts::PI, Some(&ParticleRef::from("planet"))).unwrap();
        assert_eq!(h.time(), 0.0);

        match prediction {
            Prediction::Body { time, body } => {
                assert_eq!(time, std::f64::consts::PI);
                assert_relative_eq!(body.position[0], -1.0, epsilon = 1e-3);
            }
            other => panic!("expected a single body, got {:?}", other),
        }
    }

    #[test]
    fn test_predict_unknown_target() {
        let h = two_body(SimulationConfig::default());
        let err = predict(&h, 1.0, Some(&ParticleRef::from(7))).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));
    }
}
