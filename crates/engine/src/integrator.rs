//! Fixed-step symplectic integrators for the N-body system
//!
//! Provides a kick-drift-kick leapfrog (2nd order) and Yoshida's 4th order
//! composition of it. Both act on a particle slice in place and are driven by
//! direct pairwise Newtonian gravity.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::particle::{Particle, Vec3};

/// Which scheme advances the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegratorKind {
    Leapfrog,
    #[default]
    Yoshida4,
}

impl IntegratorKind {
    /// Advance `particles` by one step of length `dt`.
    ///
    /// `time` is only used to label errors.
    pub fn step(&self, particles: &mut [Particle], g: f64, dt: f64, time: f64) -> Result<()> {
        if particles.is_empty() {
            return Ok(());
        }
        match self {
            IntegratorKind::Leapfrog => leapfrog(particles, g, dt, time),
            IntegratorKind::Yoshida4 => {
                let cbrt2 = 2.0_f64.cbrt();
                let w1 = 1.0 / (2.0 - cbrt2);
                let w0 = -cbrt2 / (2.0 - cbrt2);
                leapfrog(particles, g, w1 * dt, time)?;
                leapfrog(particles, g, w0 * dt, time)?;
                leapfrog(particles, g, w1 * dt, time)
            }
        }
    }
}

impl std::fmt::Display for IntegratorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegratorKind::Leapfrog => write!(f, "leapfrog"),
            IntegratorKind::Yoshida4 => write!(f, "yoshida4"),
        }
    }
}

// Kick: v_n+1/2 = v_n + dt/2 a_n, drift: x_n+1 = x_n + dt v_n+1/2, kick again with a_n+1
fn leapfrog(particles: &mut [Particle], g: f64, dt: f64, time: f64) -> Result<()> {
    let half_dt = 0.5 * dt;

    let accel = accelerations(particles, g);
    kick(particles, &accel, half_dt, time)?;

    for p in particles.iter_mut() {
        p.position += dt * p.velocity;
    }

    let accel = accelerations(particles, g);
    kick(particles, &accel, half_dt, time)
}

fn kick(particles: &mut [Particle], accel: &[Vec3], dt: f64, time: f64) -> Result<()> {
    for (index, (p, a)) in particles.iter_mut().zip(accel).enumerate() {
        p.velocity += dt * a;
        if !p.velocity.iter().all(|c| c.is_finite()) {
            return Err(EngineError::NonFinite { index, time });
        }
    }
    Ok(())
}

/// Pairwise gravitational accelerations, one per particle.
pub fn accelerations(particles: &[Particle], g: f64) -> Vec<Vec3> {
    let n = particles.len();
    let mut accel = vec![Vec3::zeros(); n];

    for i in 0..n {
        for j in (i + 1)..n {
            let d = particles[j].position - particles[i].position;
            let r2 = d.norm_squared();
            let inv_r3 = 1.0 / (r2 * r2.sqrt());
            accel[i] += g * particles[j].mass * inv_r3 * d;
            accel[j] -= g * particles[i].mass * inv_r3 * d;
        }
    }

    accel
}

/// Kinetic plus potential energy of the system.
pub fn total_energy(particles: &[Particle], g: f64) -> f64 {
    let kinetic: f64 = particles.iter().map(Particle::kinetic_energy).sum();
    let mut potential = 0.0;
    for (i, a) in particles.iter().enumerate() {
        for b in &particles[i + 1..] {
            potential -= g * a.mass * b.mass / (b.position - a.position).norm();
        }
    }
    kinetic + potential
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_body(dist: f64, m1: f64, m2: f64) -> Vec<Particle> {
        vec![
            Particle::new("a", m1).with_position(Vec3::new(-dist / 2.0, 0.0, 0.0)),
            Particle::new("b", m2).with_position(Vec3::new(dist / 2.0, 0.0, 0.0)),
        ]
    }

    #[test]
    fn test_newton_third_law() {
        let ps = two_body(1.0, 2.0, 3.0);
        let acc = accelerations(&ps, 0.1);
        let net = ps[0].mass * acc[0] + ps[1].mass * acc[1];
        assert_relative_eq!(net.norm(), 0.0, epsilon = 1e-15);
        assert!(acc[0].x > 0.0);
        assert!(acc[1].x < 0.0);
    }

    #[test]
    fn test_inverse_square_magnitude() {
        let ps = two_body(2.0, 1.0, 5.0);
        let acc = accelerations(&ps, 1.0);
        assert_relative_eq!(acc[0].norm(), 5.0 / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_step_is_noop() {
        let mut ps: Vec<Particle> = Vec::new();
        IntegratorKind::Yoshida4.step(&mut ps, 1.0, 0.1, 0.0).unwrap();
    }

    #[test]
    fn test_coincident_particles_are_non_finite() {
        let mut ps = two_body(0.0, 1.0, 1.0);
        let err = IntegratorKind::Leapfrog.step(&mut ps, 1.0, 0.01, 0.0).unwrap_err();
        assert!(matches!(err, EngineError::NonFinite { .. }));
    }

    #[test]
    fn test_free_particle_drifts() {
        let mut ps = vec![Particle::new("a", 1.0).with_velocity(Vec3::new(1.0, 2.0, 0.0))];
        IntegratorKind::Yoshida4.step(&mut ps, 1.0, 0.5, 0.0).unwrap();
        assert_relative_eq!(ps[0].position, Vec3::new(0.5, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(IntegratorKind::default(), IntegratorKind::Yoshida4);
        assert_eq!(IntegratorKind::Leapfrog.to_string(), "leapfrog");
    }
}
