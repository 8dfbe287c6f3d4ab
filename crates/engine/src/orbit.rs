//! Keplerian orbital elements and conversions to and from Cartesian state.
//!
//! Only bound (elliptic, `0 <= e < 1`) orbits are supported. Angles are in
//! radians. The rotation from the perifocal frame to the simulation frame is
//! `Rz(Omega) * Rx(inc) * Rz(omega)`.

use std::f64::consts::{PI, TAU};

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::particle::Vec3;

const KEPLER_MAX_ITERATIONS: usize = 100;
const KEPLER_TOLERANCE: f64 = 1e-14;

// Below this, eccentricity and node vectors are treated as zero
const DEGENERACY_TOLERANCE: f64 = 1e-11;

/// Size of the orbit, given either directly or via the orbital period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrbitSize {
    SemiMajorAxis(f64),
    Period(f64),
}

/// Elements supplied when adding a particle relative to a primary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitSpec {
    pub size: OrbitSize,
    /// Eccentricity
    pub e: f64,
    /// Inclination
    pub inc: f64,
    /// Argument of periapsis
    pub omega: f64,
    /// Longitude of the ascending node
    pub node: f64,
    /// Mean anomaly
    pub mean_anomaly: f64,
}

impl OrbitSpec {
    /// Coplanar orbit with the given semi-major axis, eccentricity and mean anomaly.
    pub fn new(size: OrbitSize, e: f64, mean_anomaly: f64) -> Self {
        Self {
            size,
            e,
            inc: 0.0,
            omega: 0.0,
            node: 0.0,
            mean_anomaly,
        }
    }

    pub fn with_orientation(mut self, inc: f64, omega: f64, node: f64) -> Self {
        self.inc = inc;
        self.omega = omega;
        self.node = node;
        self
    }

    fn validate(&self) -> Result<()> {
        match self.size {
            OrbitSize::SemiMajorAxis(a) if !(a.is_finite() && a > 0.0) => {
                return Err(EngineError::invalid("a", format!("must be positive, got {}", a)));
            }
            OrbitSize::Period(p) if !(p.is_finite() && p > 0.0) => {
                return Err(EngineError::invalid("P", format!("must be positive, got {}", p)));
            }
            _ => {}
        }
        if !(self.e.is_finite() && (0.0..1.0).contains(&self.e)) {
            return Err(EngineError::invalid(
                "e",
                format!("only bound orbits with 0 <= e < 1 are supported, got {}", self.e),
            ));
        }
        for (field, value) in [
            ("inc", self.inc),
            ("omega", self.omega),
            ("Omega", self.node),
            ("M", self.mean_anomaly),
        ] {
            if !value.is_finite() {
                return Err(EngineError::invalid(field, "must be finite"));
            }
        }
        Ok(())
    }

    /// Semi-major axis for the gravitational parameter `mu`.
    pub fn semi_major_axis(&self, mu: f64) -> f64 {
        match self.size {
            OrbitSize::SemiMajorAxis(a) => a,
            // Kepler's third law: P^2 = 4 pi^2 a^3 / mu
            OrbitSize::Period(p) => (mu * p * p / (4.0 * PI * PI)).cbrt(),
        }
    }

    /// Position and velocity relative to the primary.
    pub fn to_relative_state(&self, mu: f64) -> Result<(Vec3, Vec3)> {
        self.validate()?;
        if !(mu.is_finite() && mu > 0.0) {
            return Err(EngineError::invalid(
                "mass",
                format!("primary and particle must have positive total mass, got mu={}", mu),
            ));
        }

        let a = self.semi_major_axis(mu);
        let e = self.e;
        let ecc_anomaly = solve_kepler(self.mean_anomaly, e)?;
        let true_anomaly = eccentric_to_true(ecc_anomaly, e);

        let r = a * (1.0 - e * ecc_anomaly.cos());
        let p = a * (1.0 - e * e);
        let speed_scale = (mu / p).sqrt();

        let position = Vector3::new(r * true_anomaly.cos(), r * true_anomaly.sin(), 0.0);
        let velocity = Vector3::new(
            -speed_scale * true_anomaly.sin(),
            speed_scale * (e + true_anomaly.cos()),
            0.0,
        );

        let rotation = perifocal_rotation(self.inc, self.omega, self.node);
        Ok((rotation * position, rotation * velocity))
    }
}

/// Elements recovered from a Cartesian state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    pub a: f64,
    pub e: f64,
    pub inc: f64,
    pub omega: f64,
    pub node: f64,
    pub mean_anomaly: f64,
    pub true_anomaly: f64,
    pub period: f64,
}

impl OrbitalElements {
    /// Compute elements from position and velocity relative to the primary.
    pub fn from_relative_state(position: &Vec3, velocity: &Vec3, mu: f64) -> Result<Self> {
        let r = position.norm();
        if r == 0.0 {
            return Err(EngineError::invalid("position", "particle coincides with its primary"));
        }

        let energy = velocity.norm_squared() / 2.0 - mu / r;
        if energy >= 0.0 {
            return Err(EngineError::invalid(
                "orbit",
                format!("state is not bound to the primary (specific energy {})", energy),
            ));
        }
        let a = -mu / (2.0 * energy);

        let ang_mom = position.cross(velocity);
        let h = ang_mom.norm();
        if h < DEGENERACY_TOLERANCE {
            return Err(EngineError::invalid("orbit", "radial orbits have no orientation"));
        }
        let h_hat = ang_mom / h;

        // LRL vector = v x h / mu - r/|r|
        let ecc_vec = velocity.cross(&ang_mom) / mu - position / r;
        let e = ecc_vec.norm();

        let inc = ang_mom.x.hypot(ang_mom.y).atan2(ang_mom.z);

        let node_vec = Vector3::z().cross(&ang_mom);
        let (node, node_dir) = if node_vec.norm() > DEGENERACY_TOLERANCE * h {
            (normalize_angle(node_vec.y.atan2(node_vec.x)), node_vec.normalize())
        } else {
            (0.0, Vector3::x())
        };

        let r_hat = position / r;
        let (omega, true_anomaly) = if e > DEGENERACY_TOLERANCE {
            let e_hat = ecc_vec / e;
            (
                signed_angle(&node_dir, &e_hat, &h_hat),
                signed_angle(&e_hat, &r_hat, &h_hat),
            )
        } else {
            (0.0, signed_angle(&node_dir, &r_hat, &h_hat))
        };

        let ecc_anomaly = true_to_eccentric(true_anomaly, e);
        let mean_anomaly = normalize_angle(ecc_anomaly - e * ecc_anomaly.sin());

        Ok(Self {
            a,
            e,
            inc,
            omega: normalize_angle(omega),
            node,
            mean_anomaly,
            true_anomaly: normalize_angle(true_anomaly),
            period: TAU * (a.powi(3) / mu).sqrt(),
        })
    }
}

/// Solve Kepler's equation `M = E - e sin E` for the eccentric anomaly.
pub fn solve_kepler(mean_anomaly: f64, e: f64) -> Result<f64> {
    let m = normalize_angle(mean_anomaly);
    let mut ecc = if e < 0.8 { m } else { PI };

    for _ in 0..KEPLER_MAX_ITERATIONS {
        let f = ecc - e * ecc.sin() - m;
        let fp = 1.0 - e * ecc.cos();
        let delta = f / fp;
        ecc -= delta;
        if delta.abs() <= KEPLER_TOLERANCE * (1.0 + ecc.abs()) {
            return Ok(ecc);
        }
    }

    Err(EngineError::KeplerNonConvergence {
        mean_anomaly,
        eccentricity: e,
    })
}

fn eccentric_to_true(ecc_anomaly: f64, e: f64) -> f64 {
    let half = ecc_anomaly / 2.0;
    2.0 * ((1.0 + e).sqrt() * half.sin()).atan2((1.0 - e).sqrt() * half.cos())
}

fn true_to_eccentric(true_anomaly: f64, e: f64) -> f64 {
    let half = true_anomaly / 2.0;
    2.0 * ((1.0 - e).sqrt() * half.sin()).atan2((1.0 + e).sqrt() * half.cos())
}

fn perifocal_rotation(inc: f64, omega: f64, node: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), node)
        * Rotation3::from_axis_angle(&Vector3::x_axis(), inc)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), omega)
}

// Angle from `from` to `to`, measured counter-clockwise about `axis`
fn signed_angle(from: &Vec3, to: &Vec3, axis: &Vec3) -> f64 {
    axis.dot(&from.cross(to)).atan2(from.dot(to))
}

/// Wrap an angle into `[0, 2pi)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn angle_eq(a: f64, b: f64) {
        let diff = normalize_angle(a - b);
        assert!(diff.min(TAU - diff) < 1e-9, "angles differ: {} vs {}", a, b);
    }

    #[test]
    fn test_kepler_circular_is_identity() {
        let ecc = solve_kepler(1.3, 0.0).unwrap();
        assert_relative_eq!(ecc, 1.3, epsilon = 1e-14);
    }

    #[test]
    fn test_kepler_high_eccentricity() {
        let e = 0.97;
        let ecc = solve_kepler(0.1, e).unwrap();
        assert_relative_eq!(ecc - e * ecc.sin(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_circular_orbit_state() {
        let spec = OrbitSpec::new(OrbitSize::SemiMajorAxis(1.0), 0.0, 0.0);
        let (r, v) = spec.to_relative_state(1.0).unwrap();
        assert_relative_eq!(r, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(v, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_period_gives_semi_major_axis() {
        let spec = OrbitSpec::new(OrbitSize::Period(TAU), 0.0, 0.0);
        assert_relative_eq!(spec.semi_major_axis(1.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_elements_round_trip() {
        let mu = 1.0 + 1e-3;
        let spec = OrbitSpec::new(OrbitSize::SemiMajorAxis(1.5), 0.2, 2.0)
            .with_orientation(0.3, 0.7, 1.1);
        let (r, v) = spec.to_relative_state(mu).unwrap();
        let el = OrbitalElements::from_relative_state(&r, &v, mu).unwrap();

        assert_relative_eq!(el.a, 1.5, epsilon = 1e-10);
        assert_relative_eq!(el.e, 0.2, epsilon = 1e-10);
        assert_relative_eq!(el.inc, 0.3, epsilon = 1e-10);
        angle_eq(el.omega, 0.7);
        angle_eq(el.node, 1.1);
        angle_eq(el.mean_anomaly, 2.0);
    }

    #[test]
    fn test_retrograde_equatorial_round_trip() {
        let spec = OrbitSpec::new(OrbitSize::SemiMajorAxis(2.0), 0.1, 0.5)
            .with_orientation(PI, 0.4, 0.0);
        let (r, v) = spec.to_relative_state(1.0).unwrap();
        let el = OrbitalElements::from_relative_state(&r, &v, 1.0).unwrap();
        assert_relative_eq!(el.inc, PI, epsilon = 1e-9);
        angle_eq(el.omega, 0.4);
        angle_eq(el.mean_anomaly, 0.5);
    }

    #[test]
    fn test_rejects_unbound_eccentricity() {
        let spec = OrbitSpec::new(OrbitSize::SemiMajorAxis(1.0), 1.2, 0.0);
        assert!(matches!(
            spec.to_relative_state(1.0),
            Err(EngineError::InvalidValue { field: "e", .. })
        ));
    }

    #[test]
    fn test_unbound_state_is_rejected() {
        let r = Vector3::new(1.0, 0.0, 0.0);
        let v = Vector3::new(0.0, 2.0, 0.0);
        assert!(OrbitalElements::from_relative_state(&r, &v, 1.0).is_err());
    }
}
