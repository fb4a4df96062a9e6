//! Shared, versioned schema registry.

use super::schema::SchemaMetadata;
use crate::error::{Result, SchemaError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::info;

/// Concurrent holder of the current schema.
///
/// Readers take cheap `Arc` snapshots and compile against an immutable
/// schema; writers mutate a copy under a serialization lock and swap it
/// in atomically, so a failed change never becomes visible.
#[derive(Debug)]
pub struct SchemaRegistry {
    current: RwLock<Arc<SchemaMetadata>>,
    write_lock: Mutex<()>,
    version: RwLock<u64>,
}

impl SchemaRegistry {
    /// Create a registry holding the given schema at version 0.
    pub fn new(schema: SchemaMetadata) -> Self {
        Self {
            current: RwLock::new(Arc::new(schema)),
            write_lock: Mutex::new(()),
            version: RwLock::new(0),
        }
    }

    /// Snapshot of the current schema. The snapshot stays valid for the
    /// life of a compilation even if the schema changes concurrently.
    pub fn snapshot(&self) -> Arc<SchemaMetadata> {
        self.current.read().clone()
    }

    /// Version of the current schema, incremented on each change.
    pub fn version(&self) -> u64 {
        *self.version.read()
    }

    /// Apply a schema change. Changes run one at a time; the mutation
    /// works on a private copy, and only a successful result replaces
    /// the visible schema.
    pub fn update<T>(
        &self,
        change: impl FnOnce(&mut SchemaMetadata) -> Result<T, SchemaError>,
    ) -> Result<T> {
        let _guard = self.write_lock.lock();
        let mut draft = (*self.snapshot()).clone();
        let out = change(&mut draft)?;
        let mut version = self.version.write();
        *version += 1;
        *self.current.write() = Arc::new(draft);
        info!(schema = %self.current.read().name, version = *version, "schema updated");
        Ok(out)
    }
}
