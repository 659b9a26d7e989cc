//! JSON-snapshot resource store.
//!
//! The authoritative resource collection lives in memory behind a single
//! mutex; the JSON files on disk are only a durable snapshot. Every mutation
//! runs its whole read-modify-write-persist cycle under the lock, so
//! concurrent updates from different resource timers can never interleave or
//! lose writes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;

use super::models::{MonitoredResource, NotifySettings};

const RESOURCES_FILE: &str = "resources.json";
const SETTINGS_FILE: &str = "settings.json";

/// Store error types.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("resource not found")]
    NotFound,
}

/// Result of an atomic update: the record before and after mutation, both
/// captured inside the same critical section.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub previous: MonitoredResource,
    pub current: MonitoredResource,
}

struct Inner {
    resources: Vec<MonitoredResource>,
    settings: NotifySettings,
    resources_path: PathBuf,
    settings_path: PathBuf,
}

/// Thread-safe resource store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
}

impl Store {
    /// Open (or initialize) the store under the given data directory.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;

        let resources_path = data_dir.join(RESOURCES_FILE);
        let settings_path = data_dir.join(SETTINGS_FILE);

        let resources: Vec<MonitoredResource> = if resources_path.exists() {
            serde_json::from_str(&fs::read_to_string(&resources_path)?)?
        } else {
            Vec::new()
        };
        let settings: NotifySettings = if settings_path.exists() {
            serde_json::from_str(&fs::read_to_string(&settings_path)?)?
        } else {
            NotifySettings::default()
        };

        let store = Self {
            inner: Arc::new(Mutex::new(Inner {
                resources,
                settings,
                resources_path,
                settings_path,
            })),
        };

        // Make sure both snapshot files exist from the start.
        {
            let inner = store.inner.lock().unwrap();
            if !inner.resources_path.exists() {
                write_snapshot(&inner.resources_path, &inner.resources)?;
            }
            if !inner.settings_path.exists() {
                write_snapshot(&inner.settings_path, &inner.settings)?;
            }
        }

        Ok(store)
    }

    /// Snapshot of all resources.
    pub fn get_resources(&self) -> Vec<MonitoredResource> {
        self.inner.lock().unwrap().resources.clone()
    }

    /// Snapshot of one resource by id.
    pub fn get_resource(&self, id: &str) -> Result<MonitoredResource, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .resources
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// Add a new resource and persist the collection.
    pub fn add_resource(&self, resource: MonitoredResource) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.resources.push(resource);
        write_snapshot(&inner.resources_path, &inner.resources)
    }

    /// Remove a resource by id and persist the collection.
    pub fn delete_resource(&self, id: &str) -> Result<MonitoredResource, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let idx = inner
            .resources
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        let removed = inner.resources.remove(idx);
        write_snapshot(&inner.resources_path, &inner.resources)?;
        Ok(removed)
    }

    /// Apply a mutation to exactly one record and persist the full
    /// collection, all under the store lock.
    ///
    /// Returns the pre- and post-mutation snapshots so callers can derive
    /// the previous status without a separate racy read.
    pub fn atomic_update<F>(&self, id: &str, mutate: F) -> Result<UpdateOutcome, StoreError>
    where
        F: FnOnce(&mut MonitoredResource),
    {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .resources
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;

        let previous = record.clone();
        mutate(record);
        let current = record.clone();

        write_snapshot(&inner.resources_path, &inner.resources)?;
        Ok(UpdateOutcome { previous, current })
    }

    /// Current notification settings.
    pub fn settings(&self) -> NotifySettings {
        self.inner.lock().unwrap().settings.clone()
    }

    /// Replace notification settings and persist them.
    pub fn set_settings(&self, settings: NotifySettings) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.settings = settings;
        write_snapshot(&inner.settings_path, &inner.settings)
    }
}

/// Write a JSON snapshot atomically (temp file + rename).
fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
