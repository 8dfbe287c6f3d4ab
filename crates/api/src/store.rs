//! Simulation store: one snapshot file per simulation identifier
//!
//! ## Table of Contents
//! - **SimulationStore**: create / load / save, keyed by identifier
//! - **Per-identifier locking**: `lock`, `release` and `with_simulation`
//! - **SimulationSummary**: listing entry
//!
//! Layout on disk is `<root>/<id>/sim.bin`. Snapshots are replaced by
//! rename, so a lock-free `load` never observes a half-written file; every
//! read-modify-write goes through `with_simulation`, which holds the
//! identifier's lock from load until the new snapshot is in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use orrery_engine::{EngineError, Simulation, SimulationConfig};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::handle::SimulationHandle;

const SNAPSHOT_FILE: &str = "sim.bin";
const MAX_ID_LEN: usize = 64;

/// Listing entry for a stored simulation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub id: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// File-backed simulation store with one async lock per identifier.
pub struct SimulationStore {
    root: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SimulationStore {
    /// Open or create a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, ApiError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        info!(path = %root.display(), "Simulation store opened");
        Ok(Self {
            root,
            locks: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot_path(&self, id: &str) -> PathBuf {
        self.root.join(id).join(SNAPSHOT_FILE)
    }

    /// Take the exclusive lock for `id`. Held across load, mutate and save.
    ///
    /// Pair with [`SimulationStore::release`] once the guard is dropped.
    pub async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry for `id` if no guard or waiter still refers to it.
    pub fn release(&self, id: &str) {
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub async fn exists(&self, id: &str) -> bool {
        is_valid_id(id) && tokio::fs::try_exists(self.snapshot_path(id)).await.unwrap_or(false)
    }

    /// Create and persist an empty simulation.
    ///
    /// `name` becomes the identifier when given; otherwise a UUID is assigned.
    pub async fn create(
        &self,
        name: Option<String>,
        config: SimulationConfig,
    ) -> Result<SimulationHandle, ApiError> {
        let id = match name {
            Some(name) if is_valid_id(&name) => name,
            Some(name) => {
                return Err(ApiError::invalid(format!(
                    "simulation name '{}' must be 1-{} characters of [A-Za-z0-9_-]",
                    name, MAX_ID_LEN
                )))
            }
            None => uuid::Uuid::new_v4().to_string(),
        };

        let sim = Simulation::with_config(config)?;
        let guard = self.lock(&id).await;
        let created = self.create_locked(id.clone(), sim).await;
        drop(guard);
        self.release(&id);
        created
    }

    async fn create_locked(&self, id: String, sim: Simulation) -> Result<SimulationHandle, ApiError> {
        if self.exists(&id).await {
            return Err(ApiError::invalid(format!("simulation '{}' already exists", id)));
        }
        let handle = SimulationHandle::new(id, sim);
        self.save(&handle).await?;
        info!(id = %handle.id(), "Simulation created");
        Ok(handle)
    }

    /// Load the last saved state of `id`.
    pub async fn load(&self, id: &str) -> Result<SimulationHandle, ApiError> {
        if !is_valid_id(id) {
            return Err(ApiError::NotFound(id.to_string()));
        }
        let id = id.to_string();
        let path = self.snapshot_path(&id);
        tokio::task::spawn_blocking(move || load_blocking(&id, &path)).await?
    }

    /// Persist `handle`, replacing its previous snapshot.
    pub async fn save(&self, handle: &SimulationHandle) -> Result<(), ApiError> {
        let handle = handle.clone();
        let path = self.snapshot_path(handle.id());
        tokio::task::spawn_blocking(move || save_blocking(&handle, &path)).await?
    }

    /// Run `f` against the simulation under its lock, saving the result if `f` succeeds.
    ///
    /// `f` runs on the blocking pool; a failed `f` leaves the stored snapshot untouched.
    pub async fn with_simulation<T, F>(&self, id: &str, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut SimulationHandle) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        // Unknown ids never get a lock entry
        if !self.exists(id).await {
            return Err(ApiError::NotFound(id.to_string()));
        }
        let guard = self.lock(id).await;
        let owned_id = id.to_string();
        let path = self.snapshot_path(id);

        // Guard lives in the worker: the lock outlasts a dropped request.
        let result = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let mut handle = load_blocking(&owned_id, &path)?;
            let out = f(&mut handle)?;
            save_blocking(&handle, &path)?;
            Ok(out)
        })
        .await;
        self.release(id);
        result?
    }

    /// Run `f` against a lock-free copy of the simulation. Nothing is saved.
    pub async fn read_simulation<T, F>(&self, id: &str, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut SimulationHandle) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        if !is_valid_id(id) {
            return Err(ApiError::NotFound(id.to_string()));
        }
        let id = id.to_string();
        let path = self.snapshot_path(&id);
        tokio::task::spawn_blocking(move || {
            let mut handle = load_blocking(&id, &path)?;
            f(&mut handle)
        })
        .await?
    }

    /// All stored simulations, sorted by identifier.
    pub async fn list(&self) -> Result<Vec<SimulationSummary>, ApiError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut summaries = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_valid_id(&id) {
                continue;
            }
            let Ok(meta) = tokio::fs::metadata(self.snapshot_path(&id)).await else {
                continue;
            };
            let updated_at = meta.modified().ok().map(DateTime::<Utc>::from);
            summaries.push(SimulationSummary { id, updated_at });
        }

        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }
}

fn load_blocking(id: &str, path: &Path) -> Result<SimulationHandle, ApiError> {
    match Simulation::load(path) {
        Ok(sim) => {
            debug!(id, t = sim.t(), bodies = sim.len(), "Simulation loaded");
            Ok(SimulationHandle::new(id, sim))
        }
        Err(EngineError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::NotFound(id.to_string()))
        }
        Err(EngineError::Decode(reason)) => {
            warn!(id, %reason, "Unreadable snapshot");
            Err(ApiError::NotFound(format!("{} (snapshot is corrupt)", id)))
        }
        Err(e) => Err(e.into()),
    }
}

fn save_blocking(handle: &SimulationHandle, path: &Path) -> Result<(), ApiError> {
    handle.engine().save(path)?;
    debug!(id = handle.id(), t = handle.time(), "Simulation saved");
    Ok(())
}

/// Identifiers double as directory names, so only a safe alphabet is allowed.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
