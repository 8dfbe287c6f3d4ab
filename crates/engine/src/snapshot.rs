//! Binary snapshots of a simulation
//!
//! Layout: 4 magic bytes `ORRY`, a little-endian `u16` format version, then
//! the bincode encoding of [`Simulation`]. Files are written to a sibling
//! temporary path and renamed into place so readers never see a partial
//! snapshot.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::simulation::Simulation;

const MAGIC: &[u8; 4] = b"ORRY";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = MAGIC.len() + 2;

impl Simulation {
    /// Encode into snapshot bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self).map_err(|e| EngineError::Encode(e.to_string()))?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decode snapshot bytes produced by [`Simulation::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(EngineError::Decode("not an orrery snapshot".into()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(EngineError::Decode(format!(
                "unsupported snapshot version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }
        let sim: Simulation = bincode::deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| EngineError::Decode(e.to_string()))?;
        sim.config()
            .validate()
            .map_err(|e| EngineError::Decode(format!("invalid configuration: {}", e)))?;
        for (index, particle) in sim.particles().iter().enumerate() {
            particle
                .validate()
                .map_err(|e| EngineError::Decode(format!("invalid particle #{}: {}", index, e)))?;
            if sim.particles()[..index].iter().any(|p| p.name == particle.name) {
                return Err(EngineError::Decode(format!(
                    "duplicate particle name '{}'",
                    particle.name
                )));
            }
        }
        Ok(sim)
    }

    /// Write a snapshot to `path`, replacing any previous one.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;

        debug!(path = %path.display(), bytes = bytes.len(), t = self.t(), "snapshot saved");
        Ok(())
    }

    /// Read a snapshot from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let sim = Self::from_bytes(&bytes)?;
        debug!(path = %path.display(), particles = sim.len(), t = sim.t(), "snapshot loaded");
        Ok(sim)
    }
}
