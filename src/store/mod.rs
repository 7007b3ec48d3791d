pub mod disk;
pub mod memory;

use crate::core::QuoteSeries;
use crate::core::cache::{KeyValueCollection, Store};
use anyhow::{Context, Result, anyhow};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions, PersistMode};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::{debug, warn};

const SNAPSHOTS: &str = "snapshots";

/// A thread-safe key-value store that can hold multiple collections.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Keyspace>,
}

impl KeyValueStore {
    /// Opens a store persisting under `data_path/cache`. Without a path, or
    /// if the keyspace cannot be opened, every collection lives in memory.
    pub fn new(data_path: Option<&Path>) -> Self {
        let keyspace = data_path.and_then(|path| {
            let cache_dir = path.join("cache");
            fjall::Config::new(&cache_dir)
                .open()
                .inspect_err(|e| warn!("Could not open cache at {}: {}", cache_dir.display(), e))
                .ok()
        });

        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    pub fn is_persistent(&self) -> bool {
        self.keyspace.is_some()
    }

    fn open_collection(&self, name: &str, persist: bool) -> Option<Arc<dyn KeyValueCollection>> {
        match (&self.keyspace, persist) {
            (Some(keyspace), true) => keyspace
                .open_partition(name, PartitionCreateOptions::default())
                .inspect_err(|e| warn!("Could not open partition {}: {}", name, e))
                .ok()
                .map(|partition| {
                    Arc::new(DiskCollection::new(partition)) as Arc<dyn KeyValueCollection>
                }),
            _ => Some(Arc::new(MemoryCollection::new())),
        }
    }

    /// Saves the most recent series of a pair.
    pub async fn save_snapshot(&self, series: &QuoteSeries) -> Result<()> {
        let collection = self
            .get_collection(SNAPSHOTS, true, true)
            .ok_or_else(|| anyhow!("Snapshot storage is not available"))?;
        let key = snapshot_key(&series.currency, &series.reference);
        collection
            .put(key.as_bytes(), &serde_json::to_vec(series)?, None)
            .await;
        if let Some(keyspace) = &self.keyspace {
            keyspace
                .persist(PersistMode::SyncAll)
                .context("Failed to persist snapshot")?;
        }
        debug!("Saved snapshot {} with {} quotes", key, series.len());
        Ok(())
    }

    pub async fn load_snapshot(&self, currency: &str, reference: &str) -> Result<Option<QuoteSeries>> {
        let Some(collection) = self.get_collection(SNAPSHOTS, true, true) else {
            return Ok(None);
        };
        let key = snapshot_key(currency, reference);
        match collection.get(key.as_bytes()).await {
            Some(bytes) => {
                let series = serde_json::from_slice(&bytes)
                    .with_context(|| format!("Failed to decode snapshot for {key}"))?;
                Ok(Some(series))
            }
            None => Ok(None),
        }
    }
}

fn snapshot_key(currency: &str, reference: &str) -> String {
    format!("{currency}-{reference}")
}

impl Default for KeyValueStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Store for KeyValueStore {
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>> {
        if let Some(collection) = self.collections.read().ok()?.get(name) {
            return Some(Arc::clone(collection));
        }
        if !create_if_missing {
            return None;
        }

        let mut collections = self.collections.write().ok()?;
        if let Some(collection) = collections.get(name) {
            return Some(Arc::clone(collection));
        }
        let collection = self.open_collection(name, persist)?;
        collections.insert(name.to_string(), Arc::clone(&collection));
        Some(collection)
    }

    fn remove_collection(&self, name: &str) -> bool {
        self.collections
            .write()
            .map(|mut collections| collections.remove(name).is_some())
            .unwrap_or(false)
    }
}
