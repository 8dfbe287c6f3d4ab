// =============================================================================
// Orrery API - Configuration
// =============================================================================

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "127.0.0.1:4242")
    pub bind_address: String,

    /// Directory holding one sub-directory per simulation
    pub data_dir: PathBuf,

    /// Integrator step for simulations created without an explicit `dt`
    pub default_timestep: f64,

    /// Gravitational constant for simulations created without an explicit `G`
    pub gravitational_constant: f64,

    /// Upper bound on `steps` for trajectory requests
    pub max_trajectory_steps: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:4242".into(),
            data_dir: PathBuf::from("simulations"),
            default_timestep: 1e-3,
            gravitational_constant: 1.0,
            max_trajectory_steps: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            default_timestep: parse_var("DEFAULT_TIMESTEP", defaults.default_timestep)?,
            gravitational_constant: parse_var(
                "GRAVITATIONAL_CONSTANT",
                defaults.gravitational_constant,
            )?,
            max_trajectory_steps: parse_var("MAX_TRAJECTORY_STEPS", defaults.max_trajectory_steps)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Config rooted at `data_dir`, everything else default. Used by tests and embedders.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_timestep.is_finite() && self.default_timestep > 0.0) {
            return Err(ConfigError::Invalid("DEFAULT_TIMESTEP", "must be positive".into()));
        }
        if !(self.gravitational_constant.is_finite() && self.gravitational_constant > 0.0) {
            return Err(ConfigError::Invalid("GRAVITATIONAL_CONSTANT", "must be positive".into()));
        }
        if self.max_trajectory_steps == 0 {
            return Err(ConfigError::Invalid("MAX_TRAJECTORY_STEPS", "must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, format!("cannot parse '{}'", raw))),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address, "127.0.0.1:4242");
    }

    #[test]
    fn test_zero_steps_rejected() {
        let config = Config {
            max_trajectory_steps: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid("MAX_TRAJECTORY_STEPS", _))
        ));
    }

    #[test]
    fn test_with_data_dir() {
        let config = Config::with_data_dir("/tmp/orrery");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/orrery"));
        assert_eq!(config.max_trajectory_steps, 10_000);
    }
}
